//! Error types for the overlay core

use thiserror::Error;

/// Overlay error types
///
/// None of these are fatal to the event loop: decode and missing-target errors
/// are logged and the offending message or job is skipped, empty results are
/// turned into a user-facing notice, and connection errors are recorded in the
/// channel's connection state.
#[derive(Error, Debug)]
pub enum OverlayError {
    #[error("Decode error: {0}")]
    Decode(String),

    #[error("Container not found: {0}")]
    MissingTarget(String),

    #[error("Container already exists: {0}")]
    ContainerExists(String),

    #[error("No results for search: {0}")]
    EmptyResult(String),

    #[error("Connection error: {0}")]
    Connection(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Invalid search keyword")]
    InvalidKeyword,

    #[error("Render queue is closed")]
    QueueClosed,
}

impl From<serde_json::Error> for OverlayError {
    fn from(err: serde_json::Error) -> Self {
        Self::Decode(err.to_string())
    }
}

impl From<tokio_tungstenite::tungstenite::Error> for OverlayError {
    fn from(err: tokio_tungstenite::tungstenite::Error) -> Self {
        Self::Connection(err.to_string())
    }
}

/// Result type alias for overlay operations
pub type Result<T> = std::result::Result<T, OverlayError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_json_error_maps_to_decode() {
        let err = serde_json::from_str::<serde_json::Value>("not json").unwrap_err();
        let err: OverlayError = err.into();
        assert!(matches!(err, OverlayError::Decode(_)));
        assert!(err.to_string().starts_with("Decode error"));
    }

    #[test]
    fn test_missing_target_message() {
        let err = OverlayError::MissingTarget("analysis-7".to_string());
        assert_eq!(err.to_string(), "Container not found: analysis-7");
    }
}
