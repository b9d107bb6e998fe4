//! Errors surfaced by worker handles and the manager

use crate::codegen::GenerateError;

/// What a lookup failed to find
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Missing {
    #[error("\"{0}\" was not found in available images")]
    Image(String),
    #[error("\"{0}\" is not a running worker")]
    Worker(String),
}

/// Handle and registry errors
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum WorkerError {
    /// The initialiser is not a worker script blob
    #[error("worker initialiser must be a worker script blob: {0}")]
    Construction(String),
    #[error(transparent)]
    NotFound(#[from] Missing),
    #[error("could not create worker \"{name}\" from image: {reason}")]
    Spawn { name: String, reason: String },
    #[error("worker {0} is not running")]
    NotRunning(u64),
    #[error("channels are not enabled for worker \"{0}\"")]
    ChannelsDisabled(String),
    #[error("unknown event '{0}', expected 'message' or 'error'")]
    UnknownEvent(String),
    #[error(transparent)]
    Generate(#[from] GenerateError),
}

impl WorkerError {
    pub fn image_not_found(name: impl Into<String>) -> Self {
        WorkerError::NotFound(Missing::Image(name.into()))
    }

    pub fn not_running(name: impl Into<String>) -> Self {
        WorkerError::NotFound(Missing::Worker(name.into()))
    }

    /// Whether this is a lookup failure
    pub fn is_not_found(&self) -> bool {
        matches!(self, WorkerError::NotFound(_))
    }
}
