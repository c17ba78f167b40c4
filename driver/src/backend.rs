//! The seam between a [`DriverHandle`](crate::DriverHandle) and whatever
//! produces audio behind it.

use crate::abi::VoiceInfo;
use crate::error::DriverError;

/// Result of one `speak` call.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Spoken {
    /// Bytes written into the caller's buffer.
    pub written: usize,
    /// Duration of the written audio in seconds.
    pub duration: f32,
}

/// A ready voice backend.
///
/// Implemented by [`NativeBackend`](crate::NativeBackend) for dynamically
/// loaded plugins, and directly by voices compiled into the process.
/// Dropping a backend tears it down; teardown must not panic.
pub trait VoiceBackend: Send {
    /// Metadata reported by the voice.
    fn info(&self) -> VoiceInfo;

    /// Converts phonemes to PCM audio written into `buf`.
    fn speak(&mut self, phonemes: &str, buf: &mut [u8]) -> Result<Spoken, DriverError>;
}
