use crate::{CaptureEnd, CaptureEvent, HookEvent, Result};
use chrono::Utc;
use keytime::{KeytimeConfig, Log, LogStore, Recorder, RecorderSnapshot};
use tokio::sync::{broadcast, mpsc};
use tokio::time::Instant;
use tokio_stream::Stream;
use tracing::{debug, info, instrument, warn};

#[cfg(feature = "native")]
mod native;

#[cfg(feature = "native")]
pub use self::native::*;

/// Result of one capture session
#[derive(Debug, Clone, PartialEq)]
pub struct CaptureSummary {
    pub end: CaptureEnd,
    pub snapshot: RecorderSnapshot,
}

/// Drives a [`Recorder`] from a stream of hook events until a stop condition
/// or the listen timeout.
pub struct CaptureSession {
    recorder: Recorder,

    event_tx: broadcast::Sender<CaptureEvent>,

    config: KeytimeConfig,
}

impl CaptureSession {
    pub fn new(config: KeytimeConfig) -> Self {
        let (event_tx, _) = broadcast::channel(100);
        Self {
            recorder: Recorder::new(config.clone()),
            event_tx,
            config,
        }
    }

    /// Get a stream of events
    pub fn event_stream(&self) -> impl Stream<Item = CaptureEvent> {
        let mut rx = self.event_tx.subscribe();
        Box::pin(async_stream::stream! {
            while let Ok(event) = rx.recv().await {
                yield event;
            }
        })
    }

    pub fn recorder(&self) -> &Recorder {
        &self.recorder
    }

    pub fn snapshot(&self) -> RecorderSnapshot {
        self.recorder.current_log()
    }

    /// Start over with an empty recording.
    pub fn reset(&mut self) {
        self.recorder.reset();
    }

    /// Replace the recording with a saved log, e.g. to edit it.
    pub fn load(&mut self, log: &Log) -> Result<()> {
        self.recorder.replace_with(log)?;
        Ok(())
    }

    /// Consume hook events until a stop condition, the listen timeout, or the
    /// sender side closing.
    #[instrument(skip(self, hook_rx))]
    pub async fn run(&mut self, mut hook_rx: mpsc::UnboundedReceiver<HookEvent>) -> CaptureSummary {
        let timeout = self.config.listen_timeout();
        let deadline = Instant::now() + timeout;
        info!(?timeout, "Listening for keystrokes");

        let end = loop {
            let event = match tokio::time::timeout_at(deadline, hook_rx.recv()).await {
                Ok(Some(event)) => event,
                Ok(None) => {
                    warn!("Keyboard hook closed");
                    break CaptureEnd::HookClosed;
                }
                Err(_) => {
                    info!("Listen timeout elapsed");
                    break CaptureEnd::TimedOut;
                }
            };

            match event {
                HookEvent::Press(key) => self.on_press(key),
                HookEvent::Release(key) => {
                    if let Some(reason) = self.recorder.on_key_release(&key) {
                        break CaptureEnd::from(reason);
                    }
                }
            }
        };

        let snapshot = self.recorder.current_log();
        let _ = self.event_tx.send(CaptureEvent::Finished {
            reason: end,
            word_count: snapshot.word_count,
            timestamp: Utc::now(),
        });
        info!(
            ?end,
            keystrokes = snapshot.keystrokes.len(),
            words = snapshot.word_count,
            "Capture finished"
        );
        CaptureSummary { end, snapshot }
    }

    fn on_press(&mut self, key: keytime::KeyEvent) {
        let event = if self.recorder.on_key_event(&key) {
            let Some(last) = self.recorder.last_keystroke() else {
                return;
            };
            debug!(token = %last.key, delay = ?last.delay, "Key recorded");
            CaptureEvent::Recorded {
                token: last.key,
                delay: last.delay,
                word_count: self.recorder.word_count(),
                timestamp: Utc::now(),
            }
        } else {
            CaptureEvent::Ignored {
                key: format!("{key:?}"),
                timestamp: Utc::now(),
            }
        };
        // No subscribers is fine
        let _ = self.event_tx.send(event);
    }

    /// Save the recording as a new log in `store`.
    pub fn save(&self, store: &LogStore) -> Result<Log> {
        info!("Saving recording to {:?}", store.path());
        let log = self.recorder.to_log()?;
        store.append(log.clone())?;
        Ok(log)
    }
}
