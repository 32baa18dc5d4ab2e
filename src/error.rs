//! Error types for the Swift ring supervisor

use std::path::PathBuf;

use thiserror::Error;

/// Result type alias using our Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while reconciling and building rings
#[derive(Error, Debug)]
pub enum Error {
    // =========================================================================
    // Model Errors
    // =========================================================================
    /// Malformed declarative model (bad ring specification, disk model, etc.)
    #[error("{0}")]
    ModelValidation(String),

    /// Irreconcilable differences between the model and the rings, collected
    /// over a whole reconciliation pass
    #[error(
        "{}\nThere are errors or mismatches between the input model and the \
         configuration of server(s).\nCannot proceed. Correct the errors and try again",
        .errors.join("\n")
    )]
    ModelMismatch { errors: Vec<String> },

    /// Warning-level mismatches, fatal only with --stop-on-warnings
    #[error(
        "{}\nThere are minor mismatches between the input model and the \
         configuration of servers. These are warning severity. We recommend \
         you correct the errors.",
        .warnings.join("\n")
    )]
    ModelMismatchWarnings { warnings: Vec<String> },

    // =========================================================================
    // I/O and Parsing Errors
    // =========================================================================
    /// A required input file could not be read
    #[error("Cannot read {path}: {source}")]
    ReadFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A file was read but its content is not valid
    #[error("ERROR reading/parsing {path}: {reason}")]
    Parse { path: PathBuf, reason: String },

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// YAML (de)serialization error
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// JSON (de)serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Configuration error (layout, flags)
    #[error("Configuration error: {0}")]
    Config(String),

    // =========================================================================
    // Ring Builder Errors
    // =========================================================================
    /// A builder file could not be inspected
    #[error("swift-ring-builder problem occurred while reading builder file {path}: {reason}")]
    BuilderRead { path: PathBuf, reason: String },

    /// The external ring tool failed hard
    #[error("'{command}' failed with status {status}: {output}")]
    CommandFailed {
        command: String,
        status: i32,
        output: String,
    },

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Build a validation error
    pub fn validation(message: impl Into<String>) -> Self {
        Error::ModelValidation(message.into())
    }

    /// Attach a file path to an I/O failure
    pub fn read_file(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Error::ReadFile {
            path: path.into(),
            source,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_model_mismatch_lists_every_error() {
        let err = Error::ModelMismatch {
            errors: vec!["first problem".to_string(), "second problem".to_string()],
        };
        let text = err.to_string();
        assert!(text.starts_with("first problem\nsecond problem\n"));
        assert!(text.contains("Cannot proceed"));
    }

    #[test]
    fn test_validation_message_is_verbatim() {
        let err = Error::validation("Ring: account is missing a policy");
        assert_eq!(err.to_string(), "Ring: account is missing a policy");
    }
}
