//! Embeddable core library for depbridge.
//!
//! Provides a clap-free, I/O-abstracted entry point suitable for linking
//! into a package-manager plugin or other host process.
//!
//! # Port traits
//!
//! All I/O the pipelines depend on is abstracted behind port traits in [`ports`]:
//! - [`GraphSource`](ports::GraphSource): load the resolved dependency graph
//! - [`WritePort`](ports::WritePort): write files and create directories
//! - [`CMakeRunner`](ports::CMakeRunner): run the CMake executable
//!
//! The [`adapters`] module provides default filesystem/process-backed implementations.
//!
//! # Entry points
//!
//! - [`run_translate`](pipeline::run_translate): graph + policy to a plan and patch preview
//! - [`run_configure`](pipeline::run_configure): apply a plan's patches and invoke CMake
//! - [`run_package`](layout::run_package): relocate an install tree into the artifact layout
//! - [`search_cmake_scripts`](search::search_cmake_scripts): grep the build scripts

pub mod adapters;
pub mod layout;
pub mod pipeline;
pub mod ports;
pub mod search;
pub mod settings;

// Re-export the scanner port so callers don't need depbridge-domain directly.
pub use depbridge_domain::{FsLibraryScanner, InMemoryLibraryScanner, LibraryScanner};
