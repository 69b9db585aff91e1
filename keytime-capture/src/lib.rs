//! Live keyboard capture for keytime
//!
//! This crate feeds real key presses into a [`keytime::Recorder`], broadcasts
//! what was captured as a stream of events, and saves the result as a log.
//! With the `native` feature it also provides the OS keyboard hook and a
//! keyboard output device for playback.

pub mod error;
pub mod events;
pub mod recorder;

pub use error::*;
pub use events::*;
pub use recorder::*;
