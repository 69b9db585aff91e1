//! Canonical textual encoding of keys.
//!
//! A [`KeyToken`] is the string form a key takes inside a keystroke log:
//! printable characters are wrapped in apostrophes (`'a'`), control and
//! whitespace keys use a fixed registry (`Key.space`), and the two
//! characters that collide with the quoting syntax get escaped forms.

use crate::config::KeytimeConfig;
use crate::errors::{CodecError, Rejection};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;
use tracing::error;

/// Quoting sentinel around printable characters
pub const QUOTE: char = '\'';
/// Token of the reserved stop key
pub const STOP_TOKEN: &str = "Key.stop";

const BACKSLASH_TOKEN: &str = r"'\\'";
const APOSTROPHE_TOKEN: &str = "\"'\"";

/// The registry of control and whitespace keys
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NamedKey {
    Space,
    Tab,
    Enter,
    Shift,
    Backspace,
    CapsLock,
}

impl NamedKey {
    pub const ALL: [NamedKey; 6] = [
        NamedKey::Space,
        NamedKey::Tab,
        NamedKey::Enter,
        NamedKey::Shift,
        NamedKey::Backspace,
        NamedKey::CapsLock,
    ];

    pub fn token_name(&self) -> &'static str {
        match self {
            NamedKey::Space => "Key.space",
            NamedKey::Tab => "Key.tab",
            NamedKey::Enter => "Key.enter",
            NamedKey::Shift => "Key.shift",
            NamedKey::Backspace => "Key.backspace",
            NamedKey::CapsLock => "Key.caps_lock",
        }
    }

    pub fn from_token_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|key| key.token_name() == name)
    }
}

/// A single logical key, as typed or as sent to a device
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Key {
    Char(char),
    Named(NamedKey),
}

/// A character that collides with the quoting syntax
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EscapedChar {
    Backslash,
    Quote,
}

impl EscapedChar {
    pub fn from_char(c: char) -> Option<Self> {
        match c {
            '\\' => Some(EscapedChar::Backslash),
            QUOTE => Some(EscapedChar::Quote),
            _ => None,
        }
    }

    pub fn char(&self) -> char {
        match self {
            EscapedChar::Backslash => '\\',
            EscapedChar::Quote => QUOTE,
        }
    }
}

/// The canonical string form of one key
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KeyToken {
    /// A character wrapped in the quoting sentinel
    Printable(char),
    /// A control or whitespace key from the registry
    Named(NamedKey),
    /// Backslash or the quote character itself
    Escaped(EscapedChar),
    /// The reserved stop key
    Stop,
}

impl KeyToken {
    pub fn is_named(&self) -> bool {
        matches!(self, KeyToken::Named(_))
    }

    /// The character carried by a printable or escaped token
    pub fn char(&self) -> Option<char> {
        match self {
            KeyToken::Printable(c) => Some(*c),
            KeyToken::Escaped(escaped) => Some(escaped.char()),
            KeyToken::Named(_) | KeyToken::Stop => None,
        }
    }
}

impl fmt::Display for KeyToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KeyToken::Printable(c) => write!(f, "{QUOTE}{c}{QUOTE}"),
            KeyToken::Named(key) => f.write_str(key.token_name()),
            KeyToken::Escaped(EscapedChar::Backslash) => f.write_str(BACKSLASH_TOKEN),
            KeyToken::Escaped(EscapedChar::Quote) => f.write_str(APOSTROPHE_TOKEN),
            KeyToken::Stop => f.write_str(STOP_TOKEN),
        }
    }
}

impl FromStr for KeyToken {
    type Err = CodecError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.is_empty() {
            return Err(CodecError::Empty);
        }
        // Escaped forms first, they would otherwise unwrap to the wrong character
        match s {
            BACKSLASH_TOKEN => return Ok(KeyToken::Escaped(EscapedChar::Backslash)),
            APOSTROPHE_TOKEN => return Ok(KeyToken::Escaped(EscapedChar::Quote)),
            STOP_TOKEN => return Ok(KeyToken::Stop),
            _ => {}
        }
        if s.starts_with("Key.") {
            return NamedKey::from_token_name(s)
                .map(KeyToken::Named)
                .ok_or_else(|| CodecError::UnknownNamedKey(s.to_string()));
        }

        let inner = s
            .strip_prefix(QUOTE)
            .and_then(|rest| rest.strip_suffix(QUOTE))
            .ok_or_else(|| CodecError::Malformed(s.to_string()))?;
        let mut chars = inner.chars();
        match (chars.next(), chars.next()) {
            (Some(c), None) if EscapedChar::from_char(c).is_some() => {
                Err(CodecError::Malformed(s.to_string()))
            }
            (Some(c), None) => Ok(KeyToken::Printable(c)),
            _ => Err(CodecError::Malformed(s.to_string())),
        }
    }
}

impl Serialize for KeyToken {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for KeyToken {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// Encodes characters into tokens and decodes tokens back into keys,
/// applying the admission policy of the configuration it was built with.
#[derive(Debug, Clone)]
pub struct KeyCodec {
    config: KeytimeConfig,
}

impl KeyCodec {
    pub fn new(config: KeytimeConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &KeytimeConfig {
        &self.config
    }

    /// Encode a character from input text.
    pub fn encode(&self, c: char) -> Result<KeyToken, Rejection> {
        let token = match c {
            ' ' => KeyToken::Named(NamedKey::Space),
            '\n' | '\t' if !self.config.allow_newlines => {
                return Err(Rejection::WhitespaceDisabled(c));
            }
            '\n' => KeyToken::Named(NamedKey::Enter),
            '\t' => KeyToken::Named(NamedKey::Tab),
            c if c.is_control() => return Err(Rejection::NonPrintable(c)),
            c if c == self.config.stop_char => KeyToken::Stop,
            c if !self.config.allow_wide_character_set && !self.config.allowed_chars.contains(c) => {
                return Err(Rejection::OutsideCharset(c));
            }
            c => Self::wrap(c),
        };
        self.check_denied(token)
    }

    /// Encode a character observed by the live keyboard hook. The allowed
    /// character set and whitespace options only govern synthesized text.
    pub fn token_for_typed(&self, c: char) -> Result<KeyToken, Rejection> {
        let token = match c {
            ' ' => KeyToken::Named(NamedKey::Space),
            c if c.is_control() => return Err(Rejection::NonPrintable(c)),
            c if c == self.config.stop_char => KeyToken::Stop,
            c => Self::wrap(c),
        };
        self.check_denied(token)
    }

    /// Decode a token back into the logical key it stands for.
    pub fn decode(&self, token: &KeyToken) -> Key {
        match token {
            KeyToken::Printable(c) => Key::Char(*c),
            KeyToken::Escaped(escaped) => Key::Char(escaped.char()),
            KeyToken::Named(key) => Key::Named(*key),
            KeyToken::Stop => Key::Char(self.config.stop_char),
        }
    }

    /// The admission rule applied on recording and replay: a well-formed
    /// token that is not on the deny-list and carries no control character.
    pub fn admits(&self, token: &KeyToken) -> Result<(), Rejection> {
        if let Some(c) = token.char() {
            if c.is_control() {
                return Err(Rejection::NonPrintable(c));
            }
        }
        self.check_denied(*token).map(|_| ())
    }

    fn wrap(c: char) -> KeyToken {
        match EscapedChar::from_char(c) {
            Some(escaped) => KeyToken::Escaped(escaped),
            None => KeyToken::Printable(c),
        }
    }

    fn check_denied(&self, token: KeyToken) -> Result<KeyToken, Rejection> {
        let text = token.to_string();
        if self.config.denied_tokens.contains(&text) {
            error!(token = %text, "Rejected denied token");
            return Err(Rejection::Denied(text));
        }
        Ok(token)
    }
}
