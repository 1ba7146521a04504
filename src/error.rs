//! Error types for text2audio

use thiserror::Error;

/// Main error type for text2audio
#[derive(Error, Debug)]
pub enum Error {
    #[error("No text provided")]
    EmptyText,

    #[error("Text rejected: {0}")]
    InvalidText(String),

    #[error("Text processing produced no chunks")]
    NoChunks,

    #[error("No audio generated from any text chunk")]
    NoAudio,

    #[error("No audio data provided")]
    EmptyAudio,

    #[error("Audio processing error: {0}")]
    Audio(String),

    #[error("Unsupported audio format '{0}' (only wav is written)")]
    UnsupportedFormat(String),

    #[error("Audio playback not available (build with the `playback` feature)")]
    PlaybackUnavailable,

    #[error("Unsupported model: {0}")]
    Unsupported(String),

    #[error("Model error: {0:#}")]
    Model(#[from] anyhow::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Unknown config parameter: {0}")]
    UnknownConfigKey(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for text2audio operations
pub type Result<T> = std::result::Result<T, Error>;

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Config(err.to_string())
    }
}

impl From<hound::Error> for Error {
    fn from(err: hound::Error) -> Self {
        Error::Audio(err.to_string())
    }
}
