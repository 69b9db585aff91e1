use crate::codec::Key;
use crate::errors::DeviceError;

/// The output side of playback: something that can press keys.
///
/// Implementations report keys they cannot produce with
/// [`DeviceError::Unsupported`] and broken input transports with
/// [`DeviceError::Transport`].
pub trait KeyboardDevice: Send {
    /// Press and release a key
    fn tap(&mut self, key: Key) -> Result<(), DeviceError>;

    /// Press a key and keep it down
    fn press(&mut self, key: Key) -> Result<(), DeviceError>;

    /// Release a previously pressed key
    fn release(&mut self, key: Key) -> Result<(), DeviceError>;
}

impl<D: KeyboardDevice + ?Sized> KeyboardDevice for Box<D> {
    fn tap(&mut self, key: Key) -> Result<(), DeviceError> {
        (**self).tap(key)
    }

    fn press(&mut self, key: Key) -> Result<(), DeviceError> {
        (**self).press(key)
    }

    fn release(&mut self, key: Key) -> Result<(), DeviceError> {
        (**self).release(key)
    }
}
