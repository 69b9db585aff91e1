use crate::{CaptureError, CaptureSession, CaptureSummary, HookEvent, Result};
use enigo::{Direction, Enigo, InputError, Keyboard, Settings};
use keytime::{DeviceError, Key, KeyEvent, KeyboardDevice, NamedKey};
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};
use tokio::sync::mpsc;
use tracing::{debug, error, info};

/// Global keyboard hook running on its own thread
pub struct NativeListener {
    /// Signal to stop forwarding events
    stop_indicator: Arc<AtomicBool>,
}

impl NativeListener {
    /// Start the hook thread. Events arrive on the returned receiver until
    /// [`NativeListener::stop`] is called or the hook fails.
    pub fn spawn() -> Result<(Self, mpsc::UnboundedReceiver<HookEvent>)> {
        let (hook_tx, hook_rx) = mpsc::unbounded_channel();
        let stop_indicator = Arc::new(AtomicBool::new(false));
        let callback_stop_indicator = Arc::clone(&stop_indicator);

        std::thread::Builder::new()
            .name("keytime-hook".to_string())
            .spawn(move || {
                // Release events carry no text, so remember what each key produced
                let mut held: Vec<(rdev::Key, KeyEvent)> = Vec::new();
                if let Err(error) = rdev::listen(move |event| {
                    if callback_stop_indicator.load(Ordering::SeqCst) {
                        return;
                    }
                    let hook_event = match event.event_type {
                        rdev::EventType::KeyPress(key) => {
                            let mapped = map_key(key, event.name.as_deref());
                            held.retain(|(k, _)| *k != key);
                            held.push((key, mapped.clone()));
                            HookEvent::Press(mapped)
                        }
                        rdev::EventType::KeyRelease(key) => {
                            let mapped = match held.iter().position(|(k, _)| *k == key) {
                                Some(index) => held.remove(index).1,
                                None => map_key(key, None),
                            };
                            HookEvent::Release(mapped)
                        }
                        _ => return,
                    };
                    let _ = hook_tx.send(hook_event);
                }) {
                    error!("Failed to listen for events: {:?}", error);
                }
                info!("Keyboard hook thread has finished");
            })
            .map_err(|e| CaptureError::InitializationError(e.to_string()))?;

        Ok((Self { stop_indicator }, hook_rx))
    }

    /// Stop forwarding events. The OS hook itself stays installed until the
    /// process exits.
    pub fn stop(&self) {
        self.stop_indicator.store(true, Ordering::SeqCst);
        debug!("Keyboard hook stop signal sent");
    }
}

impl Drop for NativeListener {
    fn drop(&mut self) {
        self.stop();
    }
}

fn map_key(key: rdev::Key, name: Option<&str>) -> KeyEvent {
    match key {
        rdev::Key::Escape => return KeyEvent::Escape,
        rdev::Key::Space => return KeyEvent::Named(NamedKey::Space),
        rdev::Key::Tab => return KeyEvent::Named(NamedKey::Tab),
        rdev::Key::Return | rdev::Key::KpReturn => return KeyEvent::Named(NamedKey::Enter),
        rdev::Key::ShiftLeft | rdev::Key::ShiftRight => return KeyEvent::Named(NamedKey::Shift),
        rdev::Key::Backspace => return KeyEvent::Named(NamedKey::Backspace),
        rdev::Key::CapsLock => return KeyEvent::Named(NamedKey::CapsLock),
        _ => {}
    }
    let mut chars = name.unwrap_or_default().chars();
    match (chars.next(), chars.next()) {
        (Some(c), None) if !c.is_control() => KeyEvent::Char(c),
        _ => KeyEvent::Unmapped(format!("{key:?}")),
    }
}

impl CaptureSession {
    /// Record from the global keyboard hook until a stop condition or the
    /// listen timeout.
    pub async fn start(&mut self) -> Result<CaptureSummary> {
        info!("Starting keyboard capture");
        let (listener, hook_rx) = NativeListener::spawn()?;
        let summary = self.run(hook_rx).await;
        listener.stop();
        Ok(summary)
    }
}

/// Keyboard output through the OS input APIs
pub struct EnigoKeyboard {
    enigo: Enigo,
}

impl EnigoKeyboard {
    pub fn new() -> Result<Self> {
        let enigo = Enigo::new(&Settings::default())
            .map_err(|e| CaptureError::InitializationError(e.to_string()))?;
        Ok(Self { enigo })
    }

    fn send(&mut self, key: Key, direction: Direction) -> std::result::Result<(), DeviceError> {
        let key = match key {
            Key::Char(c) => enigo::Key::Unicode(c),
            Key::Named(NamedKey::Space) => enigo::Key::Space,
            Key::Named(NamedKey::Tab) => enigo::Key::Tab,
            Key::Named(NamedKey::Enter) => enigo::Key::Return,
            Key::Named(NamedKey::Shift) => enigo::Key::Shift,
            Key::Named(NamedKey::Backspace) => enigo::Key::Backspace,
            Key::Named(NamedKey::CapsLock) => enigo::Key::CapsLock,
        };
        self.enigo.key(key, direction).map_err(|e| match e {
            InputError::Mapping(_) | InputError::InvalidInput(_) => {
                DeviceError::Unsupported(e.to_string())
            }
            _ => DeviceError::Transport(e.to_string()),
        })
    }
}

impl KeyboardDevice for EnigoKeyboard {
    fn tap(&mut self, key: Key) -> std::result::Result<(), DeviceError> {
        self.send(key, Direction::Click)
    }

    fn press(&mut self, key: Key) -> std::result::Result<(), DeviceError> {
        self.send(key, Direction::Press)
    }

    fn release(&mut self, key: Key) -> std::result::Result<(), DeviceError> {
        self.send(key, Direction::Release)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_map_key() {
        assert_eq!(map_key(rdev::Key::Escape, None), KeyEvent::Escape);
        assert_eq!(map_key(rdev::Key::Space, Some(" ")), KeyEvent::Named(NamedKey::Space));
        assert_eq!(map_key(rdev::Key::KeyA, Some("A")), KeyEvent::Char('A'));
        assert_eq!(
            map_key(rdev::Key::UpArrow, None),
            KeyEvent::Unmapped("UpArrow".to_string())
        );
        assert_eq!(
            map_key(rdev::Key::KeyA, Some("\u{1}")),
            KeyEvent::Unmapped("KeyA".to_string())
        );
    }
}
