use std::path::PathBuf;

use thiserror::Error;

/// Exit code for CLI misuse, missing inputs and fatal start-up failures
pub const EXIT_USAGE: i32 = 1;

/// Run-level error type: anything that aborts the whole batch
#[derive(Error, Debug)]
pub enum ValidationError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Usage error: {0}")]
    Usage(String),

    #[error("Schema not found: {}", path.display())]
    SchemaNotFound { path: PathBuf },

    #[error("Input path not found: {}", path.display())]
    InputNotFound { path: PathBuf },

    #[error("Schema loading failed: {} - {details}", path.display())]
    SchemaLoad { path: PathBuf, details: String },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Concurrent operation error: {details}")]
    Concurrency { details: String },
}

impl ValidationError {
    /// Process exit code for an error that aborted the run.
    ///
    /// Every run-level failure happens before or instead of validation, so
    /// none of them may be confused with the "some files failed" status.
    pub fn exit_code(&self) -> i32 {
        EXIT_USAGE
    }

    /// True for errors caused by how the tool was invoked.
    pub fn is_usage(&self) -> bool {
        matches!(
            self,
            ValidationError::Usage(_)
                | ValidationError::SchemaNotFound { .. }
                | ValidationError::InputNotFound { .. }
                | ValidationError::Config(_)
        )
    }
}

/// Errors raised by the schema engine while loading a schema or running a
/// validation session
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EngineError {
    #[error("{details}")]
    SchemaParseFailed { details: String },

    #[error("Validation context creation failed")]
    ValidationContextCreationFailed,

    #[error("Memory allocation failed in libxml2")]
    MemoryAllocation,

    #[error("{message}")]
    Malformed { message: String },

    #[error("Validation internal error (code {code})")]
    Internal { code: i32 },

    #[error("Unsupported file path: {}", path.display())]
    InvalidPath { path: PathBuf },

    #[error("Document too large: {size} bytes")]
    TooLarge { size: usize },
}

/// Result type alias for convenience
pub type Result<T> = std::result::Result<T, ValidationError>;

/// Engine result type alias
pub type EngineResult<T> = std::result::Result<T, EngineError>;
