//! Human-like keystroke synthesis and replay
//!
//! This crate turns text into keystroke sequences with realistic inter-key
//! timing, records real typing into the same format, stores the results as
//! JSON logs, and replays them onto a keyboard device under a time limit.

use std::path::Path;
use std::time::Instant;
use tracing::{error, info, instrument};

pub mod codec;
pub mod config;
pub mod delay;
pub mod device;
pub mod errors;
pub mod generator;
pub mod keystroke;
pub mod player;
pub mod recorder;
pub mod store;
#[cfg(test)]
mod tests;

pub use codec::{EscapedChar, Key, KeyCodec, KeyToken, NamedKey};
pub use config::KeytimeConfig;
pub use delay::DelayModel;
pub use device::KeyboardDevice;
pub use errors::{CodecError, DeviceError, KeytimeError, Rejection, Result};
pub use generator::Generator;
pub use keystroke::{Keystroke, KeystrokeSequence, Log};
pub use player::{AbortReason, PlaybackOutcome, PlaybackReport, PlaybackState, Player};
pub use recorder::{KeyEvent, Recorder, RecorderSnapshot, StopReason};
pub use store::LogStore;

/// The main entry point: generation, persistence and playback behind one
/// configuration.
pub struct Keytime<D: KeyboardDevice> {
    config: KeytimeConfig,
    generator: Generator,
    player: Player<D>,
    store: LogStore,
}

impl<D: KeyboardDevice> Keytime<D> {
    #[instrument(skip(config, device, log_path))]
    pub fn new(config: KeytimeConfig, device: D, log_path: impl AsRef<Path>) -> Self {
        let start = Instant::now();
        let config = config.normalized();
        let keytime = Self {
            generator: Generator::new(config.clone()),
            player: Player::new(config.clone(), device),
            store: LogStore::new(log_path),
            config,
        };
        info!(
            duration_ms = start.elapsed().as_millis(),
            log_path = %keytime.store.path().display(),
            "Keytime engine initialized"
        );
        keytime
    }

    pub fn config(&self) -> &KeytimeConfig {
        &self.config
    }

    pub fn player(&self) -> &Player<D> {
        &self.player
    }

    pub fn store(&self) -> &LogStore {
        &self.store
    }

    pub fn generate(&mut self, text: &str) -> KeystrokeSequence {
        self.generator.generate(text)
    }

    /// Generate keystrokes for `text` and type them.
    pub async fn type_text(&mut self, text: &str) -> Result<PlaybackReport> {
        let (_, report) = self.player.play_text(&mut self.generator, text).await?;
        Ok(report)
    }

    /// Generate keystrokes for `text` and save them as a new log.
    #[instrument(skip(self, text))]
    pub fn generate_and_save(&mut self, text: &str) -> Result<Log> {
        let keystrokes = self.generator.generate(text);
        if keystrokes.is_empty() {
            return Err(KeytimeError::EmptyGeneration);
        }
        let log = Log::new(text.to_string(), keystrokes)?;
        self.store.append(log.clone())?;
        Ok(log)
    }

    /// Replay the saved log whose id or text equals `identifier`.
    #[instrument(skip(self))]
    pub async fn simulate_from_id(&self, identifier: &str) -> Result<Option<PlaybackReport>> {
        let Some(log) = self.store.find(identifier)? else {
            error!("Log not found");
            return Ok(None);
        };
        info!(id = %log.id, keystrokes = log.keystrokes.len(), "Replaying saved log");
        Ok(Some(self.player.replay(&log.keystrokes).await))
    }
}
