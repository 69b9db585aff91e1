use crate::codec::{KeyCodec, KeyToken, NamedKey};
use crate::config::KeytimeConfig;
use crate::errors::{KeytimeError, Result};
use crate::keystroke::{Keystroke, KeystrokeSequence, Log};
use crate::player::compress_long_pause;
use std::time::Instant;
use tracing::{debug, info, warn};

/// A raw key notification from the keyboard hook
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeyEvent {
    /// A key that produced a character
    Char(char),
    /// A key from the named registry
    Named(NamedKey),
    /// The escape key, which always ends a recording
    Escape,
    /// Any other key the hook reports (arrows, function keys, ...)
    Unmapped(String),
}

/// Why a recording stopped
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    Escape,
    StopKey,
    WordCap,
}

/// The recorder's view of what has been typed so far
#[derive(Debug, Clone, PartialEq)]
pub struct RecorderSnapshot {
    pub keystrokes: KeystrokeSequence,
    pub string: String,
    pub word_count: usize,
}

/// Turns live key events into a keystroke sequence with real timing, while
/// mirroring the typed text and counting words.
pub struct Recorder {
    codec: KeyCodec,
    config: KeytimeConfig,
    keystrokes: KeystrokeSequence,
    typed: String,
    word_count: usize,
    prev_time: Instant,
}

impl Recorder {
    pub fn new(config: KeytimeConfig) -> Self {
        Self {
            codec: KeyCodec::new(config.clone()),
            config,
            keystrokes: KeystrokeSequence::new(),
            typed: String::new(),
            word_count: 0,
            prev_time: Instant::now(),
        }
    }

    /// Clear keystrokes, typed text and word count.
    pub fn reset(&mut self) {
        self.keystrokes = KeystrokeSequence::new();
        self.typed.clear();
        self.word_count = 0;
        self.prev_time = Instant::now();
    }

    pub fn word_count(&self) -> usize {
        self.word_count
    }

    pub fn typed(&self) -> &str {
        &self.typed
    }

    pub fn word_cap_reached(&self) -> bool {
        self.word_count >= self.config.recorder_max_words
    }

    pub fn last_keystroke(&self) -> Option<&Keystroke> {
        self.keystrokes.last()
    }

    pub fn current_log(&self) -> RecorderSnapshot {
        RecorderSnapshot {
            keystrokes: self.keystrokes.clone(),
            string: self.typed.clone(),
            word_count: self.word_count,
        }
    }

    /// Handle a key press. Returns whether the key was recorded.
    pub fn on_key_event(&mut self, event: &KeyEvent) -> bool {
        self.on_key_event_at(event, Instant::now())
    }

    /// Handle a key press that happened at `now`.
    pub fn on_key_event_at(&mut self, event: &KeyEvent, now: Instant) -> bool {
        let token = match event {
            KeyEvent::Char(c) => self.codec.token_for_typed(*c),
            KeyEvent::Named(key) => Ok(KeyToken::Named(*key)),
            KeyEvent::Escape | KeyEvent::Unmapped(_) => {
                debug!(?event, "Ignoring key outside the registry");
                return false;
            }
        };
        let token = match token.and_then(|token| self.codec.admits(&token).map(|_| token)) {
            Ok(token) => token,
            Err(rejection) => {
                warn!(?event, "Key not recorded: {rejection}");
                return false;
            }
        };

        let elapsed = now.saturating_duration_since(self.prev_time).as_secs_f64();
        let delay = self.config.round_delay(compress_long_pause(elapsed));
        self.keystrokes.push(token, Some(delay));
        self.prev_time = now;

        match token {
            KeyToken::Printable(c) => self.typed.push(c),
            KeyToken::Escaped(escaped) => self.typed.push(escaped.char()),
            KeyToken::Stop => self.typed.push(self.config.stop_char),
            KeyToken::Named(NamedKey::Space) => {
                self.typed.push(' ');
                self.word_count += 1;
            }
            KeyToken::Named(NamedKey::Enter) => self.typed.push('\n'),
            KeyToken::Named(NamedKey::Tab) => self.typed.push('\t'),
            KeyToken::Named(NamedKey::Backspace) => {
                if self.typed.pop() == Some(' ') {
                    self.word_count = self.word_count.saturating_sub(1);
                }
            }
            KeyToken::Named(NamedKey::Shift | NamedKey::CapsLock) => {}
        }
        true
    }

    /// Handle a key release. Returns the reason to stop listening, if any.
    pub fn on_key_release(&self, event: &KeyEvent) -> Option<StopReason> {
        let reason = match event {
            KeyEvent::Escape => Some(StopReason::Escape),
            _ if self.word_cap_reached() => Some(StopReason::WordCap),
            KeyEvent::Char(c) if *c == self.config.stop_char => Some(StopReason::StopKey),
            _ => None,
        };
        if let Some(reason) = reason {
            info!(?reason, words = self.word_count, "Recording stop condition met");
        }
        reason
    }

    /// Build a log from what has been recorded so far.
    pub fn to_log(&self) -> Result<Log> {
        if self.typed.is_empty() {
            return Err(KeytimeError::InvalidLog("no keystrokes to save".to_string()));
        }
        Log::new(self.typed.clone(), self.keystrokes.clone())
    }

    /// Replace the recorded state with an existing log.
    pub fn replace_with(&mut self, log: &Log) -> Result<()> {
        log.validate()?;
        self.keystrokes = log.keystrokes.clone();
        self.typed = log.string.clone();
        self.word_count = log.string.matches(' ').count();
        Ok(())
    }
}
