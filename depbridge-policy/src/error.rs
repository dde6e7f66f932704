use depbridge_types::policy::Strategy;
use thiserror::Error;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum PolicyError {
    #[error("invalid policy TOML: {message}")]
    Toml { message: String },

    #[error("unsupported policy schema '{schema}'")]
    UnsupportedSchema { schema: String },

    #[error("unknown builtin policy '{name}' (available: {available})")]
    UnknownBuiltin { name: String, available: String },

    #[error("feature '{name}' is declared more than once")]
    DuplicateFeature { name: String },

    #[error("feature '{feature}' prefers an external library but names no dependency")]
    MissingDependencyField { feature: String },

    #[error("feature '{feature}' ({strategy}) declares no toggle key it could emit")]
    NoToggle { feature: String, strategy: Strategy },

    #[error(
        "dependency '{dependency}' is shared by features '{first}' ({first_strategy}) and \
         '{second}' ({second_strategy}) with conflicting strategies"
    )]
    ConflictingStrategy {
        dependency: String,
        first: String,
        first_strategy: Strategy,
        second: String,
        second_strategy: Strategy,
    },

    #[error("aliases are declared but the table has no [project] declaration to anchor them")]
    MissingProjectDecl,

    #[error("alias for legacy name '{legacy}' is declared more than once")]
    DuplicateAlias { legacy: String },

    #[error("runtime rename for '{dependency}/{library}' has an empty version")]
    EmptyRenameVersion { dependency: String, library: String },

    #[error("patch id '{id}' is declared more than once")]
    DuplicatePatch { id: String },

    #[error("patch '{id}' has an empty anchor")]
    EmptyAnchor { id: String },
}
