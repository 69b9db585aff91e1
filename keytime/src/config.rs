use crate::errors::Result;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::path::Path;
use std::time::Duration;
use tracing::{info, warn};

/// Configuration shared by the codec, delay model, generator, recorder and player.
///
/// Every component receives its own copy at construction; nothing reads
/// configuration from global state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct KeytimeConfig {
    /// Refuse to drive the output device at all
    pub disable_simulation: bool,

    /// Playback is cut off after this many seconds
    pub max_duration_seconds: f64,

    /// Maximum number of words the generator emits
    pub max_words: usize,

    /// Maximum number of words recorded before the recorder stops
    pub recorder_max_words: usize,

    /// Divides every delay during playback
    pub speed_multiplier: f64,

    /// Ceiling for the speed multiplier
    pub max_speed_multiplier: f64,

    /// Whether newline and tab are encoded (as enter / tab)
    pub allow_newlines: bool,

    /// Whether printable characters outside `allowed_chars` are encoded
    pub allow_wide_character_set: bool,

    /// Decimal digits kept on stored delays
    pub round_digits: u32,

    /// Token strings that are always rejected
    pub denied_tokens: BTreeSet<String>,

    /// The configured keyboard character set
    pub allowed_chars: String,

    /// Characters that need the shift modifier on the configured layout
    pub shifted_chars: String,

    /// Typing this character ends generation, recording and playback
    pub stop_char: char,

    /// Mean of the delay distribution (seconds)
    pub delay_mean: f64,

    /// Standard deviation of the delay distribution (seconds)
    pub delay_std_dev: f64,

    /// Delay floor (seconds)
    pub min_delay: f64,

    /// Speed used when sampling the delay of an inserted shift
    pub shift_speed: f64,

    /// Log every shift insertion at debug level
    pub show_shift_insertions: bool,

    /// How long a live capture session listens before giving up (seconds)
    pub listen_timeout_seconds: f64,
}

impl Default for KeytimeConfig {
    fn default() -> Self {
        Self {
            disable_simulation: false,
            max_duration_seconds: 30.0,
            max_words: 300,
            recorder_max_words: 50,
            speed_multiplier: 5.0,
            max_speed_multiplier: 20.0,
            allow_newlines: true,
            allow_wide_character_set: false,
            round_digits: 4,
            denied_tokens: BTreeSet::from(["'√'".to_string()]),
            allowed_chars: (' '..='~').collect(),
            shifted_chars: r#"~!@#$%^&*()_+{}|:"<>?"#.to_string(),
            stop_char: '*',
            delay_mean: 0.06,
            delay_std_dev: 0.015,
            min_delay: 0.03,
            shift_speed: 0.2222,
            show_shift_insertions: false,
            listen_timeout_seconds: 30.0,
        }
    }
}

impl KeytimeConfig {
    /// Load a configuration from a JSON file. Missing keys take their defaults
    /// and invalid values are corrected.
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        info!("Loading configuration from {:?}", path.as_ref());
        let json = std::fs::read_to_string(path)?;
        let config: KeytimeConfig = serde_json::from_str(&json)?;
        Ok(config.normalized())
    }

    /// Correct invalid values to safe defaults, warning about each correction.
    pub fn normalized(mut self) -> Self {
        let defaults = Self::default();

        if !(self.max_speed_multiplier.is_finite() && self.max_speed_multiplier > 0.0) {
            warn!(
                value = self.max_speed_multiplier,
                "Invalid max speed multiplier, using {}", defaults.max_speed_multiplier
            );
            self.max_speed_multiplier = defaults.max_speed_multiplier;
        }
        self.speed_multiplier = self.clamp_speed(self.speed_multiplier);

        if !(self.max_duration_seconds.is_finite() && self.max_duration_seconds >= 0.0) {
            warn!(
                value = self.max_duration_seconds,
                "Invalid max duration, using {}s", defaults.max_duration_seconds
            );
            self.max_duration_seconds = defaults.max_duration_seconds;
        }
        if !(self.listen_timeout_seconds.is_finite() && self.listen_timeout_seconds >= 0.0) {
            warn!(
                value = self.listen_timeout_seconds,
                "Invalid listen timeout, using {}s", defaults.listen_timeout_seconds
            );
            self.listen_timeout_seconds = defaults.listen_timeout_seconds;
        }
        if !(self.delay_mean.is_finite() && self.delay_mean > 0.0)
            || !(self.delay_std_dev.is_finite() && self.delay_std_dev >= 0.0)
        {
            warn!(
                mean = self.delay_mean,
                std_dev = self.delay_std_dev,
                "Invalid delay distribution, using defaults"
            );
            self.delay_mean = defaults.delay_mean;
            self.delay_std_dev = defaults.delay_std_dev;
        }
        if !(self.min_delay.is_finite() && self.min_delay >= 0.0) {
            warn!(value = self.min_delay, "Invalid minimum delay, using {}", defaults.min_delay);
            self.min_delay = defaults.min_delay;
        }
        if !(self.shift_speed.is_finite() && self.shift_speed > 0.0) {
            warn!(value = self.shift_speed, "Invalid shift speed, using {}", defaults.shift_speed);
            self.shift_speed = defaults.shift_speed;
        }
        self
    }

    /// Bring a speed multiplier into `(0, max_speed_multiplier]`.
    pub fn clamp_speed(&self, speed: f64) -> f64 {
        if !speed.is_finite() || speed <= 0.0 {
            warn!(speed, "Invalid speed multiplier, setting to 1");
            1.0
        } else if speed > self.max_speed_multiplier {
            warn!(
                speed,
                max = self.max_speed_multiplier,
                "Speed multiplier above ceiling, clamping"
            );
            self.max_speed_multiplier
        } else {
            speed
        }
    }

    pub fn max_duration(&self) -> Duration {
        Duration::from_secs_f64(self.max_duration_seconds)
    }

    pub fn listen_timeout(&self) -> Duration {
        Duration::from_secs_f64(self.listen_timeout_seconds)
    }

    /// Round a delay to `round_digits` decimal digits.
    pub fn round_delay(&self, delay: f64) -> f64 {
        let factor = 10f64.powi(self.round_digits.min(15) as i32);
        (delay * factor).round() / factor
    }

    pub fn is_shifted(&self, c: char) -> bool {
        c.is_uppercase() || self.shifted_chars.contains(c)
    }
}
