use crate::codec::{KeyCodec, KeyToken, NamedKey};
use crate::config::KeytimeConfig;
use crate::delay::DelayModel;
use crate::keystroke::KeystrokeSequence;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::time::Instant;
use tracing::{debug, error, info, instrument, warn};

// Reference speeds of the two draws summed into one keystroke delay
const FIRST_DRAW_SPEED: f64 = 1.0;
const SECOND_DRAW_SPEED: f64 = 1.5;

/// Synthesizes a human-looking keystroke sequence from text
pub struct Generator<R: Rng = StdRng> {
    codec: KeyCodec,
    delay_model: DelayModel,
    config: KeytimeConfig,
    rng: R,
}

impl Generator<StdRng> {
    pub fn new(config: KeytimeConfig) -> Self {
        Self::with_rng(config, StdRng::from_entropy())
    }
}

impl<R: Rng> Generator<R> {
    /// Create a generator drawing delays from the given random source
    pub fn with_rng(config: KeytimeConfig, rng: R) -> Self {
        Self {
            codec: KeyCodec::new(config.clone()),
            delay_model: DelayModel::from_config(&config),
            config,
            rng,
        }
    }

    pub fn config(&self) -> &KeytimeConfig {
        &self.config
    }

    /// Generate keystrokes for `text`, stopping after `max_words` spaces or at
    /// the stop character. Characters the codec rejects are skipped.
    #[instrument(level = "debug", skip(self, text), fields(text_len = text.len()))]
    pub fn generate(&mut self, text: &str) -> KeystrokeSequence {
        let start = Instant::now();
        let mut keystrokes = KeystrokeSequence::new();
        if text.is_empty() {
            warn!("No input string provided");
            return keystrokes;
        }

        let mut word_count = 0usize;
        for (index, c) in text.chars().enumerate() {
            if word_count >= self.config.max_words {
                info!(max_words = self.config.max_words, "Reached max words");
                break;
            }

            let token = match self.codec.encode(c) {
                Ok(token) => token,
                Err(rejection) => {
                    error!(index, "Skipping character: {rejection}");
                    continue;
                }
            };
            if c == ' ' {
                word_count += 1;
            }

            if self.config.is_shifted(c) && self.shift_eligible(keystrokes.last().map(|k| &k.key)) {
                if self.config.show_shift_insertions {
                    debug!(index, character = %c, "Inserting shift");
                }
                let delay = self.sample_shift_delay();
                keystrokes.push(KeyToken::Named(NamedKey::Shift), Some(delay));
            }

            let delay = self.sample_key_delay();
            keystrokes.push(token, Some(delay));

            if token == KeyToken::Stop {
                warn!(index, "Stop key found, halting keystroke generation");
                break;
            }
        }

        debug!(
            duration_ms = start.elapsed().as_millis(),
            keystrokes = keystrokes.len(),
            words = word_count,
            "Keystrokes generated"
        );
        keystrokes
    }

    /// A shift may go in front of a shifted character only when the previous
    /// key is the start of the sequence, a space, or an unshifted key.
    fn shift_eligible(&self, previous: Option<&KeyToken>) -> bool {
        match previous {
            None => true,
            Some(KeyToken::Named(_)) => true,
            Some(token @ (KeyToken::Printable(_) | KeyToken::Escaped(_))) => {
                token.char().map_or(true, |c| !self.config.is_shifted(c))
            }
            Some(KeyToken::Stop) => !self.config.is_shifted(self.config.stop_char),
        }
    }

    fn sample_shift_delay(&mut self) -> f64 {
        let delay = self.delay_model.sample(&mut self.rng, self.config.shift_speed);
        self.config.round_delay(delay)
    }

    fn sample_key_delay(&mut self) -> f64 {
        let first = self.delay_model.sample(&mut self.rng, FIRST_DRAW_SPEED);
        let second = self.delay_model.sample(&mut self.rng, SECOND_DRAW_SPEED);
        self.config.round_delay(first + second)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn generator(config: KeytimeConfig) -> Generator<StdRng> {
        Generator::with_rng(config, StdRng::seed_from_u64(1234))
    }

    fn tokens(keystrokes: &KeystrokeSequence) -> Vec<String> {
        keystrokes.iter().map(|k| k.key.to_string()).collect()
    }

    #[test]
    fn test_empty_input() {
        let mut generator = generator(KeytimeConfig::default());
        assert!(generator.generate("").is_empty());
    }

    #[test]
    fn test_all_rejected_input() {
        let mut generator = generator(KeytimeConfig::default());
        assert!(generator.generate("\u{1}\u{2}éü").is_empty());
    }

    #[test]
    fn test_shift_inserted_before_capital() {
        let mut generator = generator(KeytimeConfig::default());
        let keystrokes = generator.generate("Hi");

        assert_eq!(tokens(&keystrokes), vec!["Key.shift", "'H'", "'i'"]);
        let slice = keystrokes.as_slice();
        assert_eq!(slice[0].delay, None);
        assert!(slice[1].delay.is_some());
        assert!(slice[2].delay.is_some());
        assert!(keystrokes.validate().is_ok());
    }

    #[test]
    fn test_no_shift_between_consecutive_shifted_chars() {
        let mut generator = generator(KeytimeConfig::default());
        let keystrokes = generator.generate("a HEY!");
        assert_eq!(
            tokens(&keystrokes),
            vec!["'a'", "Key.space", "Key.shift", "'H'", "'E'", "'Y'", "'!'"]
        );
    }

    #[test]
    fn test_shift_after_space_and_unshifted_key() {
        let mut generator = generator(KeytimeConfig::default());
        let keystrokes = generator.generate("a?b ?");
        assert_eq!(
            tokens(&keystrokes),
            vec!["'a'", "Key.shift", "'?'", "'b'", "Key.space", "Key.shift", "'?'"]
        );
    }

    #[test]
    fn test_max_words_stops_after_space() {
        let config = KeytimeConfig {
            max_words: 1,
            ..Default::default()
        };
        let mut generator = generator(config);
        let keystrokes = generator.generate("ab cd ef");
        assert_eq!(tokens(&keystrokes), vec!["'a'", "'b'", "Key.space"]);
    }

    #[test]
    fn test_stop_character_halts_generation() {
        let mut generator = generator(KeytimeConfig::default());
        let keystrokes = generator.generate("ok*never typed");
        assert_eq!(
            tokens(&keystrokes),
            vec!["'o'", "'k'", "Key.shift", "Key.stop"]
        );
    }

    #[test]
    fn test_rejected_characters_are_skipped() {
        let mut generator = generator(KeytimeConfig::default());
        let keystrokes = generator.generate("aéb\u{7}c");
        assert_eq!(tokens(&keystrokes), vec!["'a'", "'b'", "'c'"]);
        assert_eq!(keystrokes.as_slice()[0].delay, None);
    }

    #[test]
    fn test_first_key_carries_sentinel_even_after_rejections() {
        let mut generator = generator(KeytimeConfig::default());
        let keystrokes = generator.generate("éx");
        assert_eq!(tokens(&keystrokes), vec!["'x'"]);
        assert_eq!(keystrokes.as_slice()[0].delay, None);
    }

    #[test]
    fn test_delays_are_rounded_and_bounded() {
        let config = KeytimeConfig {
            round_digits: 2,
            ..Default::default()
        };
        let mut generator = generator(config);
        let keystrokes = generator.generate("the quick brown fox jumps over the lazy dog");
        assert!(keystrokes.validate().is_ok());
        for keystroke in keystrokes.iter().skip(1) {
            let delay = keystroke.delay.unwrap();
            // Two floored draws summed
            assert!(delay >= 0.05, "delay {delay}");
            assert!(((delay * 100.0).round() - delay * 100.0).abs() < 1e-9);
        }
    }

    #[test]
    fn test_newlines_and_tabs_follow_config() {
        let mut generator = generator(KeytimeConfig::default());
        assert_eq!(
            tokens(&generator.generate("a\n\tb")),
            vec!["'a'", "Key.enter", "Key.tab", "'b'"]
        );

        let mut generator = self::generator(KeytimeConfig {
            allow_newlines: false,
            ..Default::default()
        });
        assert_eq!(tokens(&generator.generate("a\n\tb")), vec!["'a'", "'b'"]);
    }

    #[test]
    fn test_seeded_generation_is_reproducible() {
        let mut a = generator(KeytimeConfig::default());
        let mut b = generator(KeytimeConfig::default());
        assert_eq!(a.generate("Same Text"), b.generate("Same Text"));
    }
}
