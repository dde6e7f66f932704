//! Domain logic: turn a dependency graph plus a policy table into CMake
//! definitions and the alias patches the legacy discovery macros need.
//!
//! This crate owns *what* gets configured. It never touches the source tree;
//! applying patches is the `depbridge-edit` crate's job.

mod error;
mod ports;
mod translator;

pub use error::TranslateError;
pub use ports::{FsLibraryScanner, InMemoryLibraryScanner, LibraryScanner};
pub use translator::{
    DEFAULT_CXX_STANDARD, FeatureOutcome, TranslateContext, Translation, Translator,
};
