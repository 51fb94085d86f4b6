//! services/video_search/src/error.rs
//!
//! Defines the primary error type for the client service.

use crate::config::ConfigError;
use video_search_core::ports::PortError;

/// The primary error type for the `video_search` service.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// Represents an error that occurred during configuration loading.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Represents an error that propagated up from one of the core service ports.
    #[error("{0}")]
    Port(#[from] PortError),

    /// Represents a standard Input/Output error (e.g., reading a file to upload).
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// A catch-all for any other unexpected errors.
    #[error("An unexpected internal error occurred: {0}")]
    Internal(String),
}

impl ClientError {
    /// The HTTP status behind the failure, when the remote API produced it.
    pub fn status(&self) -> Option<u16> {
        match self {
            ClientError::Port(e) => e.status(),
            _ => None,
        }
    }
}
