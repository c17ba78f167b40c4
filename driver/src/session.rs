//! Per-voice synthesis session over a ready driver handle.

use crate::abi::VoiceInfo;
use crate::error::DriverError;
use crate::handle::DriverHandle;

/// Default capacity of the synthesis output buffer (4 MiB).
pub const DEFAULT_BUFFER_SIZE: usize = 4 * 1024 * 1024;

/// Audio produced by one synthesis call.
#[derive(Debug, Clone, PartialEq)]
pub struct Synthesis {
    /// Raw PCM in the format described by the voice's [`VoiceInfo`].
    pub audio: Vec<u8>,
    /// Duration in seconds.
    pub duration: f32,
}

/// Synthesizes phonemes through a borrowed [`DriverHandle`].
///
/// The session holds the handle mutably for its whole lifetime, so the voice
/// behind it cannot be unregistered while a session is alive.
pub struct SynthesisSession<'a> {
    driver: &'a mut DriverHandle,
    buffer: Vec<u8>,
    last_duration: f32,
}

impl<'a> SynthesisSession<'a> {
    pub fn new(driver: &'a mut DriverHandle) -> Self {
        Self::with_buffer_size(driver, DEFAULT_BUFFER_SIZE)
    }

    pub fn with_buffer_size(driver: &'a mut DriverHandle, buffer_size: usize) -> Self {
        Self {
            driver,
            buffer: vec![0; buffer_size],
            last_duration: 0.0,
        }
    }

    /// Synthesizes `phonemes` and returns a copy of the produced audio.
    pub fn synthesize(&mut self, phonemes: &str) -> Result<Synthesis, DriverError> {
        let spoken = self.driver.synthesize(phonemes, &mut self.buffer)?;
        self.last_duration = spoken.duration;
        Ok(Synthesis {
            audio: self.buffer[..spoken.written].to_vec(),
            duration: spoken.duration,
        })
    }

    /// Duration in seconds of the last successful synthesis.
    pub fn last_duration(&self) -> f32 {
        self.last_duration
    }

    pub fn info(&self) -> &VoiceInfo {
        self.driver.info()
    }

    pub fn sample_rate(&self) -> u32 {
        self.driver.sample_rate()
    }

    pub fn bits_per_sample(&self) -> i32 {
        self.driver.info().bit_depth.bits()
    }

    /// Voice version as `major.minor.patch`.
    pub fn version(&self) -> String {
        self.driver.info().version.to_string()
    }

    pub fn buffer_size(&self) -> usize {
        self.buffer.len()
    }
}
