//! Error types for Hearth gateway

use thiserror::Error;

/// Result type alias for Hearth operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in Hearth gateway
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration error
    #[error("configuration error: {0}")]
    Config(String),

    /// Command dispatch error
    #[error("dispatch error: {0}")]
    Dispatch(#[from] crate::dispatch::DispatchError),

    /// Capture session error
    #[error("capture error: {0}")]
    Capture(#[from] crate::capture::CaptureError),

    /// Speech synthesis error
    #[error("speech error: {0}")]
    Speech(#[from] crate::speech::SpeechError),

    /// IO error
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// HTTP error
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    /// Serialization error
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// TOML parsing error
    #[error("toml error: {0}")]
    Toml(#[from] toml::de::Error),
}
