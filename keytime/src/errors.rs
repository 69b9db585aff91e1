use thiserror::Error;

/// Error types for the keytime engine
#[derive(Debug, Error)]
pub enum KeytimeError {
    /// A token string that does not parse as any known key
    #[error("Invalid key token: {0}")]
    InvalidToken(#[from] CodecError),

    /// A log that violates the well-formedness rules
    #[error("Invalid log: {0}")]
    InvalidLog(String),

    /// A keystroke sequence that violates the sentinel or delay invariants
    #[error("Malformed keystroke sequence: {0}")]
    MalformedSequence(String),

    /// Text produced no keystrokes at all
    #[error("No keystrokes could be generated from the given input")]
    EmptyGeneration,

    /// Error from the output device
    #[error("Device error: {0}")]
    Device(#[from] DeviceError),

    /// Error when serializing or deserializing JSON
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    /// I/O error
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),
}

/// Errors raised while parsing a token string
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CodecError {
    #[error("empty token")]
    Empty,

    #[error("unknown named key: {0}")]
    UnknownNamedKey(String),

    #[error("malformed token: {0}")]
    Malformed(String),
}

/// Why the codec refused to encode a character or admit a token
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Rejection {
    #[error("non-printable character {0:?}")]
    NonPrintable(char),

    #[error("character {0:?} is outside the allowed character set")]
    OutsideCharset(char),

    #[error("newlines and tabs are disabled: {0:?}")]
    WhitespaceDisabled(char),

    #[error("token {0} is on the deny-list")]
    Denied(String),
}

/// Errors reported by a keyboard output device
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DeviceError {
    /// The device cannot produce this key; playback skips it
    #[error("unsupported key: {0}")]
    Unsupported(String),

    /// The underlying input transport failed; playback aborts
    #[error("transport failure: {0}")]
    Transport(String),
}

impl DeviceError {
    pub fn is_fatal(&self) -> bool {
        matches!(self, DeviceError::Transport(_))
    }
}

/// Result type for keytime operations
pub type Result<T> = std::result::Result<T, KeytimeError>;
