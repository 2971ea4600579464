//! Error types for the pipe.

use thiserror::Error;

/// Result type for pipe operations.
pub type Result<T> = std::result::Result<T, PipeError>;

/// Errors that can end a turn.
///
/// Every variant is reported to the host as a text fragment; none of them
/// crash the host process.
#[derive(Debug, Error)]
pub enum PipeError {
    /// The requested model is not one of the supported Responses models.
    #[error("Model {0} not supported. Only o1-pro and o3-pro are available.")]
    UnsupportedModel(String),

    /// No API keys are configured.
    #[error("No API keys configured")]
    NoCredentials,

    /// Settings could not be loaded or failed validation.
    #[error("Configuration error: {0}")]
    Config(String),

    /// A host message could not be translated.
    #[error("Invalid message format: {message}")]
    InvalidMessage {
        /// The offending message, rendered as JSON.
        message: String,
    },

    /// The remote API answered with a non-200 status.
    #[error("{status} {body}")]
    Http {
        /// HTTP status code.
        status: u16,
        /// Raw response body.
        body: String,
    },

    /// The remote call exceeded the configured timeout.
    #[error("Request timed out after {seconds} seconds.")]
    Timeout {
        /// Configured timeout.
        seconds: u64,
    },

    /// The request could not be sent or the body could not be read.
    #[error("HTTP request failed: {0}")]
    Transport(#[from] reqwest::Error),

    /// The response body was not the JSON object we expect.
    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}

impl PipeError {
    /// Whether this error falls outside the expected taxonomy and should be
    /// logged with full detail before being reported.
    pub fn is_unexpected(&self) -> bool {
        matches!(self, PipeError::Transport(_) | PipeError::InvalidResponse(_))
    }

    /// Render the error as the fragment shown to the user.
    pub fn to_fragment(&self) -> String {
        format!("Error: {}", self)
    }
}

impl From<serde_json::Error> for PipeError {
    fn from(err: serde_json::Error) -> Self {
        PipeError::InvalidResponse(err.to_string())
    }
}
