//! Shared DTOs (schemas-as-code) for the depbridge workspace.
//!
//! # Design constraints
//! - These types are intended to be serialized to disk.
//! - Be conservative with breaking changes.
//! - Prefer adding optional fields over changing semantics.

pub mod config;
pub mod graph;
pub mod patch;
pub mod plan;
pub mod platform;
pub mod policy;
pub mod report;
pub mod tool;

/// Schema identifiers.
pub mod schema {
    pub const DEPBRIDGE_GRAPH_V1: &str = "depbridge.graph.v1";
    pub const DEPBRIDGE_POLICY_V1: &str = "depbridge.policy.v1";
    pub const DEPBRIDGE_PLAN_V1: &str = "depbridge.plan.v1";
    pub const DEPBRIDGE_CONFIGURE_V1: &str = "depbridge.configure.v1";
    pub const DEPBRIDGE_PACKAGE_V1: &str = "depbridge.package.v1";
}
