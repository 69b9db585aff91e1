use crate::codec::Key;
use crate::device::KeyboardDevice;
use crate::errors::DeviceError;
use std::sync::{Arc, Mutex};


// Initialize tracing for tests
pub fn init_tracing() {
    use tracing_subscriber::{fmt, EnvFilter};
    let _ = fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive(tracing::Level::DEBUG.into()))
        .with_target(true)
        .with_test_writer()
        .try_init();
}

/// Device that only remembers what it was asked to type
#[derive(Clone, Default)]
pub struct RecordingDevice {
    pub keys: Arc<Mutex<Vec<Key>>>,
}

impl RecordingDevice {
    pub fn typed(&self) -> Vec<Key> {
        self.keys.lock().unwrap().clone()
    }
}

impl KeyboardDevice for RecordingDevice {
    fn tap(&mut self, key: Key) -> Result<(), DeviceError> {
        self.keys.lock().unwrap().push(key);
        Ok(())
    }

    fn press(&mut self, key: Key) -> Result<(), DeviceError> {
        self.keys.lock().unwrap().push(key);
        Ok(())
    }

    fn release(&mut self, _key: Key) -> Result<(), DeviceError> {
        Ok(())
    }
}
