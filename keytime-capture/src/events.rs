use chrono::{DateTime, Utc};
use keytime::{KeyEvent, KeyToken, StopReason};
use serde::{Deserialize, Serialize};

/// A raw notification from the keyboard hook
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HookEvent {
    Press(KeyEvent),
    Release(KeyEvent),
}

/// Why a capture session ended
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum CaptureEnd {
    /// Escape was released
    Escape,
    /// The stop character was released
    StopKey,
    /// The recorder's word limit was reached
    WordCap,
    /// The listen timeout elapsed
    TimedOut,
    /// The hook went away before any stop condition
    HookClosed,
}

impl From<StopReason> for CaptureEnd {
    fn from(reason: StopReason) -> Self {
        match reason {
            StopReason::Escape => CaptureEnd::Escape,
            StopReason::StopKey => CaptureEnd::StopKey,
            StopReason::WordCap => CaptureEnd::WordCap,
        }
    }
}

/// What a capture session broadcasts to its subscribers
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum CaptureEvent {
    /// A key press was recorded
    Recorded {
        token: KeyToken,
        /// Seconds since the previous recorded key, `None` for the first
        delay: Option<f64>,
        word_count: usize,
        timestamp: DateTime<Utc>,
    },

    /// A key press was not recorded
    Ignored {
        key: String,
        timestamp: DateTime<Utc>,
    },

    /// The session stopped listening
    Finished {
        reason: CaptureEnd,
        word_count: usize,
        timestamp: DateTime<Utc>,
    },
}

impl CaptureEvent {
    pub fn timestamp(&self) -> DateTime<Utc> {
        match self {
            CaptureEvent::Recorded { timestamp, .. }
            | CaptureEvent::Ignored { timestamp, .. }
            | CaptureEvent::Finished { timestamp, .. } => *timestamp,
        }
    }
}
