//! Error types for TinySound.
//!
//! Admission failures (muted bus, cooldown, concurrency cap, exhausted pool)
//! are not errors and never show up here; they surface as invalid handles.
//! These variants cover the fallible setup paths only.

use std::path::PathBuf;

use thiserror::Error;

/// Top-level error type for TinySound operations.
#[derive(Debug, Error)]
pub enum AudioError {
    /// Failed to initialize the output device.
    #[error("Failed to initialize audio device: {0}")]
    DeviceInitFailed(String),

    /// The backend could not create another voice.
    #[error("Failed to create voice: {0}")]
    VoiceCreationFailed(String),

    /// Failed to load an audio file.
    #[error("Failed to load audio file '{path}': {message}")]
    LoadFailed {
        /// Path to the file that failed to load.
        path: PathBuf,
        /// Error message.
        message: String,
    },

    /// Failed to decode audio data.
    #[error("Failed to decode audio: {0}")]
    DecodeFailed(String),

    /// Configuration could not be parsed or written.
    #[error("Configuration error: {0}")]
    Config(String),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for TinySound operations.
pub type AudioResult<T> = Result<T, AudioError>;
