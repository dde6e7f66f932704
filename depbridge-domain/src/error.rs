use camino::Utf8PathBuf;
use depbridge_policy::PolicyError;
use thiserror::Error;

/// Fatal translation failures. Each one names the dependency or feature at fault.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TranslateError {
    #[error("invalid policy table: {0}")]
    Policy(#[from] PolicyError),

    #[error("feature '{feature}' requires dependency '{dependency}', which is not in the dependency graph")]
    MissingDependency { feature: String, dependency: String },

    #[error("feature '{feature}' needs {key} but dependency '{dependency}' has no such directories")]
    EmptyPathList {
        feature: String,
        dependency: String,
        key: String,
    },

    #[error("no library files for dependency '{dependency}' (feature '{feature}') in: {dirs}")]
    UnresolvableArtifact {
        feature: String,
        dependency: String,
        dirs: String,
    },

    #[error("failed to scan {dir} for dependency '{dependency}': {message}")]
    ScanFailed {
        dependency: String,
        dir: Utf8PathBuf,
        message: String,
    },

    #[error("runtime rename for '{library}' matched no library emitted for dependency '{dependency}'")]
    RenameUnmatched { dependency: String, library: String },

    #[error("alias for dependency '{dependency}' has no legacy name in the policy or the graph")]
    MissingLegacyName { dependency: String },

    #[error("feature '{feature}' is both bundled and externally sourced ({key})")]
    MutualExclusion { feature: String, key: String },
}
