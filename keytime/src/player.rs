//! Cancellable, time-bounded replay of keystroke sequences.

use crate::codec::{KeyCodec, KeyToken};
use crate::config::KeytimeConfig;
use crate::device::KeyboardDevice;
use crate::errors::{DeviceError, KeytimeError, Result};
use crate::generator::Generator;
use crate::keystroke::KeystrokeSequence;
use rand::Rng;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;
use std::time::Duration;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, instrument, warn};

// Scaled delays above this many seconds are compressed
const LONG_PAUSE_SECS: f64 = 3.0;

// Stand-in for "no deadline" when the requested duration overflows Instant
const FAR_FUTURE: Duration = Duration::from_secs(86_400 * 365 * 30);

/// Compress long pauses to `3 + delay / 1000` seconds, keeping them ordered
/// relative to each other without letting them dominate the replay.
pub fn compress_long_pause(delay: f64) -> f64 {
    if delay > LONG_PAUSE_SECS {
        LONG_PAUSE_SECS + delay / 1000.0
    } else {
        delay
    }
}

/// Where the player is in its lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaybackState {
    Idle,
    Running,
    Completed,
    Cancelled,
    Aborted,
}

/// Why a playback was aborted
#[derive(Debug, Clone, PartialEq)]
pub enum AbortReason {
    /// A second "no previous delay" sentinel: the sequence is corrupted
    DuplicateSentinel { position: usize },
    /// The device transport failed
    Device(DeviceError),
}

/// How a playback ended
#[derive(Debug, Clone, PartialEq)]
pub enum PlaybackOutcome {
    /// Every keystroke was handled, or the stop key was reached
    Completed,
    /// The deadline expired or the session was cancelled
    Cancelled,
    /// Playback stopped on a fatal defect
    Aborted(AbortReason),
    /// Simulation is disabled in the configuration; nothing was sent
    Disabled,
}

impl PlaybackOutcome {
    fn state(&self) -> PlaybackState {
        match self {
            PlaybackOutcome::Completed => PlaybackState::Completed,
            PlaybackOutcome::Cancelled => PlaybackState::Cancelled,
            PlaybackOutcome::Aborted(_) => PlaybackState::Aborted,
            PlaybackOutcome::Disabled => PlaybackState::Idle,
        }
    }
}

/// Summary of one playback
#[derive(Debug, Clone, PartialEq)]
pub struct PlaybackReport {
    pub outcome: PlaybackOutcome,
    /// Keystrokes sent to the device
    pub dispatched: usize,
    /// Keystrokes skipped as invalid or refused by the device
    pub skipped: usize,
    pub elapsed: Duration,
}

/// Replays keystroke sequences onto a [`KeyboardDevice`].
///
/// Only one session runs at a time: starting a playback cancels the one in
/// flight and waits for it to release the device.
pub struct Player<D: KeyboardDevice> {
    codec: KeyCodec,
    config: KeytimeConfig,
    device: tokio::sync::Mutex<D>,
    session: Mutex<Option<(u64, CancellationToken)>>,
    next_session: AtomicU64,
    state: Mutex<PlaybackState>,
}

impl<D: KeyboardDevice> Player<D> {
    pub fn new(config: KeytimeConfig, device: D) -> Self {
        Self {
            codec: KeyCodec::new(config.clone()),
            config,
            device: tokio::sync::Mutex::new(device),
            session: Mutex::new(None),
            next_session: AtomicU64::new(0),
            state: Mutex::new(PlaybackState::Idle),
        }
    }

    pub fn state(&self) -> PlaybackState {
        *self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Cancel the running session, if any.
    pub fn cancel(&self) {
        let session = self.session.lock().unwrap_or_else(|e| e.into_inner());
        if let Some((id, token)) = session.as_ref() {
            info!(session = id, "Cancelling playback");
            token.cancel();
        }
    }

    /// Replay using the configured speed multiplier and duration limit.
    pub async fn replay(&self, sequence: &KeystrokeSequence) -> PlaybackReport {
        self.play(sequence, self.config.speed_multiplier, self.config.max_duration())
            .await
    }

    /// Generate keystrokes for `text` and replay them with the configured
    /// speed and duration limit.
    pub async fn play_text<R: Rng>(
        &self,
        generator: &mut Generator<R>,
        text: &str,
    ) -> Result<(KeystrokeSequence, PlaybackReport)> {
        let keystrokes = generator.generate(text);
        if keystrokes.is_empty() {
            error!("Given input was not simulated");
            return Err(KeytimeError::EmptyGeneration);
        }
        let report = self.replay(&keystrokes).await;
        Ok((keystrokes, report))
    }

    /// Replay `sequence` with delays divided by `speed_multiplier`, giving up
    /// once `max_duration` has elapsed.
    #[instrument(skip(self, sequence), fields(keystrokes = sequence.len()))]
    pub async fn play(
        &self,
        sequence: &KeystrokeSequence,
        speed_multiplier: f64,
        max_duration: Duration,
    ) -> PlaybackReport {
        let start = Instant::now();
        // A disabled player never starts a session, so nothing can be in flight
        if self.config.disable_simulation {
            error!("Simulation disabled");
            return build_report(PlaybackOutcome::Disabled, 0, 0, start);
        }

        let id = self.next_session.fetch_add(1, Ordering::SeqCst);
        let token = CancellationToken::new();
        {
            let mut session = self.session.lock().unwrap_or_else(|e| e.into_inner());
            if let Some((previous, previous_token)) = session.replace((id, token.clone())) {
                info!(previous, "Cancelling playback already in progress");
                previous_token.cancel();
            }
        }
        let mut guard = SessionGuard {
            player: self,
            id,
            finished: None,
            device: None,
        };

        // Waits for a cancelled predecessor to hand the device back
        let device = guard.device.insert(self.device.lock().await);
        self.set_state(PlaybackState::Running);

        if sequence.is_empty() {
            warn!("No keystrokes found");
        }
        let speed = self.config.clamp_speed(speed_multiplier);
        let now = Instant::now();
        let deadline = now
            .checked_add(max_duration)
            .unwrap_or_else(|| now + FAR_FUTURE);
        info!(session = id, speed, ?max_duration, "Playback started");

        let mut dispatched = 0;
        let mut skipped = 0;
        let outcome = self
            .run(
                &mut **device,
                sequence,
                speed,
                deadline,
                &token,
                &mut dispatched,
                &mut skipped,
            )
            .await;

        guard.finished = Some(outcome.state());
        drop(guard);

        let report = build_report(outcome, dispatched, skipped, start);
        info!(
            session = id,
            outcome = ?report.outcome,
            dispatched,
            skipped,
            duration_ms = report.elapsed.as_millis(),
            "Playback finished"
        );
        report
    }

    #[allow(clippy::too_many_arguments)]
    async fn run(
        &self,
        device: &mut D,
        sequence: &KeystrokeSequence,
        speed: f64,
        deadline: Instant,
        token: &CancellationToken,
        dispatched: &mut usize,
        skipped: &mut usize,
    ) -> PlaybackOutcome {
        let mut sentinels = 0;
        for (position, keystroke) in sequence.iter().enumerate() {
            if token.is_cancelled() {
                info!(position, "Playback cancelled");
                return PlaybackOutcome::Cancelled;
            }
            if Instant::now() >= deadline {
                info!(position, "Duration elapsed, stopping playback");
                return PlaybackOutcome::Cancelled;
            }
            if let Err(rejection) = self.codec.admits(&keystroke.key) {
                warn!(position, "Invalid key {}: {rejection}", keystroke.key);
                *skipped += 1;
                continue;
            }

            let wait = match keystroke.delay {
                None => {
                    sentinels += 1;
                    if sentinels > 1 {
                        error!(
                            position,
                            "Critical error: sentinel delay marks the first keystroke only"
                        );
                        return PlaybackOutcome::Aborted(AbortReason::DuplicateSentinel { position });
                    }
                    Duration::ZERO
                }
                Some(delay) if !delay.is_finite() || delay < 0.0 => {
                    warn!(position, delay, "Invalid delay, skipping keystroke");
                    *skipped += 1;
                    continue;
                }
                Some(delay) => {
                    let scaled = compress_long_pause(delay / speed);
                    Duration::try_from_secs_f64(scaled).unwrap_or(FAR_FUTURE)
                }
            };

            if !wait.is_zero() {
                tokio::select! {
                    _ = tokio::time::sleep(wait) => {}
                    _ = tokio::time::sleep_until(deadline) => {
                        info!(position, "Duration elapsed, stopping playback");
                        return PlaybackOutcome::Cancelled;
                    }
                    _ = token.cancelled() => {
                        info!(position, "Playback cancelled");
                        return PlaybackOutcome::Cancelled;
                    }
                }
            }

            match self.dispatch(device, keystroke.key) {
                Ok(()) => {
                    debug!(position, key = %keystroke.key, ?wait, "Key sent");
                    *dispatched += 1;
                }
                Err(e) if e.is_fatal() => {
                    error!(position, "An error occurred: {e}");
                    return PlaybackOutcome::Aborted(AbortReason::Device(e));
                }
                Err(e) => {
                    error!(position, "Could not send key {}: {e}", keystroke.key);
                    *skipped += 1;
                    continue;
                }
            }

            if keystroke.key == KeyToken::Stop {
                warn!(position, "Stop key found, stopping playback");
                return PlaybackOutcome::Completed;
            }
        }
        PlaybackOutcome::Completed
    }

    fn dispatch(&self, device: &mut D, token: KeyToken) -> std::result::Result<(), DeviceError> {
        let key = self.codec.decode(&token);
        match token {
            KeyToken::Named(_) => {
                device.press(key)?;
                device.release(key)
            }
            KeyToken::Printable(_) | KeyToken::Escaped(_) | KeyToken::Stop => device.tap(key),
        }
    }

    fn set_state(&self, state: PlaybackState) {
        *self.state.lock().unwrap_or_else(|e| e.into_inner()) = state;
    }
}

/// Disarms a session however `play` exits, including when its future is
/// dropped mid-wait. The device is released only after the state is final.
struct SessionGuard<'a, D: KeyboardDevice> {
    player: &'a Player<D>,
    id: u64,
    finished: Option<PlaybackState>,
    device: Option<tokio::sync::MutexGuard<'a, D>>,
}

impl<D: KeyboardDevice> Drop for SessionGuard<'_, D> {
    fn drop(&mut self) {
        let mut session = self.player.session.lock().unwrap_or_else(|e| e.into_inner());
        if matches!(session.as_ref(), Some((current, _)) if *current == self.id) {
            if let Some((_, token)) = session.take() {
                token.cancel();
            }
        }
        drop(session);

        // Without the device this session never ran, so the state is not ours
        if self.device.is_some() {
            let state = self.finished.unwrap_or_else(|| {
                warn!(session = self.id, "Playback dropped before finishing");
                PlaybackState::Cancelled
            });
            self.player.set_state(state);
        }
        self.device.take();
    }
}

fn build_report(outcome: PlaybackOutcome, dispatched: usize, skipped: usize, start: Instant) -> PlaybackReport {
    PlaybackReport {
        outcome,
        dispatched,
        skipped,
        elapsed: start.elapsed(),
    }
}
