//! Error kinds for schema loading and translation.

use std::path::PathBuf;

use thiserror::Error;

pub type Result<T, E = ProtomeError> = std::result::Result<T, E>;

#[derive(Debug, Error)]
pub enum ProtomeError {
    /// Root schema file does not exist (checked before the compiler runs).
    #[error("schema file not found: {}", path.display())]
    SchemaNotFound { path: PathBuf },

    /// The external compiler could not be run, exited non-zero, timed out, or
    /// produced no readable artifact. `diagnostics` is the compiler's
    /// stdout+stderr, verbatim.
    #[error("schema compiler `{program}` failed ({status}):\n{diagnostics}")]
    CompilerInvocationFailed {
        program: String,
        status: String,
        diagnostics: String,
    },

    #[error("failed to parse descriptor set: {message}")]
    DescriptorParseError { message: String },

    /// Only an error under [`crate::DependencyPolicy::Strict`]; lenient loads
    /// report it as a [`crate::LoadWarning`].
    #[error("dependency `{dependency}` of `{file}` was not resolved")]
    DependencyUnresolved { file: String, dependency: String },

    #[error("no schema loaded")]
    NoSchemaLoaded,

    #[error("unknown message type: {requested}. Available: [{}]", available.join(", "))]
    UnknownType {
        requested: String,
        available: Vec<String>,
    },

    #[error("malformed JSON: {message}")]
    MalformedJson { message: String },

    #[error("JSON value does not fit `{type_name}`: {message}")]
    FieldTypeMismatch { type_name: String, message: String },

    #[error("config error: {message}")]
    Config { message: String },
}

impl ProtomeError {
    /// Short, stable name of the error kind (used in structured logs).
    pub fn kind(&self) -> &'static str {
        match self {
            Self::SchemaNotFound { .. } => "SchemaNotFound",
            Self::CompilerInvocationFailed { .. } => "CompilerInvocationFailed",
            Self::DescriptorParseError { .. } => "DescriptorParseError",
            Self::DependencyUnresolved { .. } => "DependencyUnresolved",
            Self::NoSchemaLoaded => "NoSchemaLoaded",
            Self::UnknownType { .. } => "UnknownType",
            Self::MalformedJson { .. } => "MalformedJson",
            Self::FieldTypeMismatch { .. } => "FieldTypeMismatch",
            Self::Config { .. } => "Config",
        }
    }
}
