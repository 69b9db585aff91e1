use keytime::KeytimeError;
use thiserror::Error;

/// Error types for keyboard capture
#[derive(Debug, Error)]
pub enum CaptureError {
    /// Error when starting the keyboard hook or output device
    #[error("Failed to initialize capture: {0}")]
    InitializationError(String),

    /// The keyboard hook stopped with an error
    #[error("Keyboard listener error: {0}")]
    ListenerError(String),

    /// Error from the keytime engine
    #[error(transparent)]
    Core(#[from] KeytimeError),

    /// Error when serializing or deserializing JSON
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    /// I/O error
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),
}

/// Result type for capture operations
pub type Result<T> = std::result::Result<T, CaptureError>;
