//! Error types for jh-core.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum CoreError {
    /// Requested toolset mode does not exist.
    #[error("Mode '{mode}' is not supported. Available modes: {available}")]
    UnknownMode { mode: String, available: String },

    #[error("Tool with name \"{0}\" not found in the toolset.")]
    ToolNotFound(String),

    #[error("{tool} is not available in mode {mode}.")]
    ToolNotAvailable { tool: String, mode: String },

    /// Model output that failed to parse or validate.
    #[error("invalid model output: {0}")]
    InvalidOutput(String),

    #[error("no answer after {0} steps")]
    StepLimit(usize),

    #[error("backend error: {0}")]
    Backend(#[from] jh_backend::BackendError),

    #[error("service error: {0}")]
    Service(#[from] jh_services::ServiceError),

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, CoreError>;
