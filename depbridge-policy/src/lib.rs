//! Policy tables: which legacy-build-system features are sourced externally,
//! which use the bundled copy, and which are switched off.
//!
//! Tables are data (TOML), versioned against the upstream release they were
//! written for, and validated before any translation runs.

mod builtin;
mod error;
mod load;
mod validate;

pub use builtin::{builtin, builtin_names, root_v6_22_02, BUILTIN_POLICIES};
pub use error::PolicyError;
pub use load::{load_policy, parse_policy, render_policy};
pub use validate::{find_feature, validate};
