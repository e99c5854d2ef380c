//! Error types for the OnIt assistant

use thiserror::Error;

use crate::camera::CameraError;
use crate::voice::RecognitionError;

/// Result type alias for assistant operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in the assistant
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration error
    #[error("configuration error: {0}")]
    Config(String),

    /// Audio error
    #[error("audio error: {0}")]
    Audio(String),

    /// Speech-to-text error
    #[error("STT error: {0}")]
    Stt(String),

    /// Text-to-speech error
    #[error("TTS error: {0}")]
    Tts(String),

    /// Speech recognition session error
    #[error("recognition error: {0}")]
    Recognition(#[from] RecognitionError),

    /// Camera error
    #[error("camera error: {0}")]
    Camera(#[from] CameraError),

    /// Failed to open an external destination
    #[error("navigation error: {0}")]
    Navigation(String),

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
