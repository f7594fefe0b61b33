//! Error types for the preview renderer and dev-server adapter

use thiserror::Error;

/// Result type alias for renderer operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in the preview renderer
#[derive(Error, Debug)]
pub enum Error {
    /// The component was not correctly tagged by the compile step. This is an
    /// integration defect and is allowed to propagate out of the render cycle.
    #[error("Configuration error: {0}")]
    Config(String),

    /// No live-reload channel is present (non-dev builds); requests fail
    /// synchronously without arming a timeout.
    #[error("Transport unavailable - cannot communicate with server")]
    TransportUnavailable,

    /// A render request got no response within the configured duration
    #[error("Render request timed out after {0}ms")]
    Timeout(u64),

    /// Server-side render failure (missing component, template threw, bad slots)
    #[error("{0}")]
    Render(String),

    /// Malformed wire payload
    #[error("Protocol error: {0}")]
    Protocol(String),

    /// Network error (toolbar config discovery)
    #[cfg(feature = "toolbar")]
    #[error("Network error: {0}")]
    Network(String),

    /// Generic error
    #[error("{0}")]
    Other(String),
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Protocol(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timeout_message_names_duration() {
        let err = Error::Timeout(10000);
        assert!(err.to_string().contains("timed out after 10000ms"));
    }

    #[test]
    fn config_error_is_descriptive() {
        let err = Error::Config("component is missing moduleId".to_string());
        assert!(err.to_string().contains("missing moduleId"));
    }
}
