use crate::codec::KeyToken;
use crate::errors::{KeytimeError, Result};
use serde::de::{self, SeqAccess, Visitor};
use serde::ser::SerializeTuple;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

/// One key together with the time that elapsed before it (seconds).
///
/// `delay == None` is the "no preceding timing" sentinel and is only valid on
/// the first keystroke of a sequence. It is not the same thing as a zero delay.
#[derive(Debug, Clone, PartialEq)]
pub struct Keystroke {
    pub key: KeyToken,
    pub delay: Option<f64>,
}

impl Keystroke {
    pub fn new(key: KeyToken, delay: Option<f64>) -> Self {
        Self { key, delay }
    }
}

// Persisted as a two element array: [token, delay | null]
impl Serialize for Keystroke {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut tuple = serializer.serialize_tuple(2)?;
        tuple.serialize_element(&self.key)?;
        tuple.serialize_element(&self.delay)?;
        tuple.end()
    }
}

impl<'de> Deserialize<'de> for Keystroke {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        struct KeystrokeVisitor;

        impl<'de> Visitor<'de> for KeystrokeVisitor {
            type Value = Keystroke;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("a [token, delay] pair")
            }

            fn visit_seq<A: SeqAccess<'de>>(self, mut seq: A) -> std::result::Result<Keystroke, A::Error> {
                let key: KeyToken = seq
                    .next_element()?
                    .ok_or_else(|| de::Error::invalid_length(0, &self))?;
                let delay: Option<f64> = seq
                    .next_element()?
                    .ok_or_else(|| de::Error::invalid_length(1, &self))?;
                if seq.next_element::<de::IgnoredAny>()?.is_some() {
                    return Err(de::Error::invalid_length(3, &self));
                }
                Ok(Keystroke { key, delay })
            }
        }

        deserializer.deserialize_tuple(2, KeystrokeVisitor)
    }
}

/// An ordered, append-only list of keystrokes.
///
/// Producers go through [`KeystrokeSequence::push`], which assigns the
/// sentinel to the first keystroke. Sequences read from elsewhere are not
/// trusted: call [`KeystrokeSequence::validate`] before relying on them.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct KeystrokeSequence(Vec<Keystroke>);

impl KeystrokeSequence {
    pub fn new() -> Self {
        Self(Vec::new())
    }

    /// Append a keystroke. The first keystroke always carries the sentinel,
    /// whatever delay was passed in.
    pub fn push(&mut self, key: KeyToken, delay: Option<f64>) {
        let delay = if self.0.is_empty() { None } else { delay };
        self.0.push(Keystroke { key, delay });
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn last(&self) -> Option<&Keystroke> {
        self.0.last()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Keystroke> {
        self.0.iter()
    }

    pub fn as_slice(&self) -> &[Keystroke] {
        &self.0
    }

    /// Check the sentinel invariant and that every delay is a finite,
    /// non-negative number.
    pub fn validate(&self) -> Result<()> {
        for (index, keystroke) in self.0.iter().enumerate() {
            match keystroke.delay {
                None if index > 0 => {
                    return Err(KeytimeError::MalformedSequence(format!(
                        "sentinel delay at position {index}, only the first keystroke may omit its delay"
                    )));
                }
                None => {}
                Some(delay) if !delay.is_finite() || delay < 0.0 => {
                    return Err(KeytimeError::MalformedSequence(format!(
                        "invalid delay {delay} at position {index}"
                    )));
                }
                Some(_) => {}
            }
        }
        Ok(())
    }
}

impl From<Vec<Keystroke>> for KeystrokeSequence {
    fn from(keystrokes: Vec<Keystroke>) -> Self {
        Self(keystrokes)
    }
}

impl<'a> IntoIterator for &'a KeystrokeSequence {
    type Item = &'a Keystroke;
    type IntoIter = std::slice::Iter<'a, Keystroke>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

/// A saved keystroke log: the typed text and the keystrokes that produced it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Log {
    /// Unique identifier (UUID v4)
    pub id: String,

    /// The original / typed text
    pub string: String,

    /// The keystrokes, with timing
    pub keystrokes: KeystrokeSequence,
}

impl Log {
    /// Create a log with a fresh identifier, refusing anything malformed.
    pub fn new(string: String, keystrokes: KeystrokeSequence) -> Result<Self> {
        let log = Self {
            id: uuid::Uuid::new_v4().to_string(),
            string,
            keystrokes,
        };
        log.validate()?;
        Ok(log)
    }

    pub fn validate(&self) -> Result<()> {
        if self.string.is_empty() {
            return Err(KeytimeError::InvalidLog("typed string is empty".to_string()));
        }
        self.keystrokes
            .validate()
            .map_err(|e| KeytimeError::InvalidLog(e.to_string()))
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }
}
