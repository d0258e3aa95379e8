//! Error types for the mimic bot

use thiserror::Error;

/// Result type alias for mimic operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in the mimic bot
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration error (missing credential, bad value) - fatal at startup
    #[error("configuration error: {0}")]
    Config(String),

    /// Command issued outside a voice session - reported to the user
    #[error("not connected: {0}")]
    NotConnected(String),

    /// No recording exists for the speaker
    #[error("no recording found for {0}")]
    NoRecording(String),

    /// Accumulated audio is below the training threshold
    #[error("insufficient audio: {have_secs:.1}s recorded, {need_secs:.0}s required")]
    InsufficientAudio {
        /// Seconds of audio currently on disk
        have_secs: f64,
        /// Seconds required before training is allowed
        need_secs: f64,
    },

    /// Audio encoding/decoding error
    #[error("audio error: {0}")]
    Audio(String),

    /// Speech-to-text error
    #[error("STT error: {0}")]
    Stt(String),

    /// Voice-cloning service error
    #[error("cloning error: {0}")]
    Cloning(String),

    /// Completion API error
    #[error("completion error: {0}")]
    Completion(String),

    /// Channel (Discord) error
    #[error("channel error: {0}")]
    Channel(String),

    /// IO error
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// HTTP error
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),
}

impl Error {
    /// Whether this error should be surfaced to the user verbatim rather
    /// than as a generic failure message
    #[must_use]
    pub const fn is_user_facing(&self) -> bool {
        matches!(
            self,
            Self::NotConnected(_) | Self::NoRecording(_) | Self::InsufficientAudio { .. }
        )
    }
}
