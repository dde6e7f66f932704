//! Error types for depbridge-edit.
//!
//! Patch errors are tool failures (exit code 1). A precondition mismatch is a
//! policy block (exit code 2): the tree changed since the plan was made.

use camino::Utf8PathBuf;
use thiserror::Error;

/// A patch could not be placed. Every variant names the patch and its target.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum PatchError {
    #[error("patch '{id}': anchor '{anchor}' not found in {path}")]
    AnchorNotFound {
        id: String,
        path: Utf8PathBuf,
        anchor: String,
    },

    #[error("patch '{id}': anchor '{anchor}' occurs {count} times in {path}")]
    AmbiguousAnchor {
        id: String,
        path: Utf8PathBuf,
        anchor: String,
        count: usize,
    },

    #[error("patch '{id}': {path} carries a different version of this patch")]
    Drifted { id: String, path: Utf8PathBuf },

    #[error("unterminated depbridge block '{block}' in {path}")]
    UnterminatedBlock { block: String, path: Utf8PathBuf },
}

/// Policy block errors that should result in exit code 2.
#[derive(Debug, Error)]
pub enum PolicyBlockError {
    /// One or more target files no longer match the plan's sha256.
    #[error("precondition mismatch: {message}")]
    PreconditionMismatch { message: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn patch_errors_name_the_target() {
        let err = PatchError::AnchorNotFound {
            id: "guard-lz4-search".to_string(),
            path: Utf8PathBuf::from("cmake/modules/SearchInstalledSoftware.cmake"),
            anchor: "find_package(LZ4)".to_string(),
        };
        let msg = err.to_string();
        assert!(msg.contains("guard-lz4-search"));
        assert!(msg.contains("cmake/modules/SearchInstalledSoftware.cmake"));
    }

    #[test]
    fn policy_block_display_includes_variant() {
        let err = PolicyBlockError::PreconditionMismatch {
            message: "CMakeLists.txt".to_string(),
        };
        assert!(err.to_string().contains("precondition mismatch"));
    }
}
