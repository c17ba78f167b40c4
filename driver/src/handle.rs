//! DriverHandle: ownership and lifecycle of one loaded voice driver.

use std::path::Path;

use tracing::{debug, error, info, warn};

use crate::abi::VoiceInfo;
use crate::backend::{Spoken, VoiceBackend};
use crate::error::DriverError;
use crate::native::NativeBackend;

/// Observable lifecycle state of a [`DriverHandle`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DriverState {
    /// Loaded and initialized; synthesis is possible.
    Ready,
    /// Loading failed; every operation is rejected.
    Zombie,
    /// Torn down after being ready.
    Released,
}

enum State {
    Ready(Box<dyn VoiceBackend>),
    Zombie(String),
    Released,
}

/// Owns one voice backend and guarantees its teardown.
///
/// A handle is either built from a successfully loaded backend or is a
/// zombie that remembers why loading failed. Teardown happens exactly once,
/// on [`release`](DriverHandle::release) or drop, whichever comes first.
pub struct DriverHandle {
    state: State,
    info: VoiceInfo,
}

impl DriverHandle {
    /// Loads a voice driver plugin, returning an error if any step fails.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, DriverError> {
        let backend = NativeBackend::open(path)?;
        Ok(Self::from_backend(Box::new(backend)))
    }

    /// Loads a voice driver plugin. A failure yields a zombie handle instead
    /// of an error; check [`is_zombie`](DriverHandle::is_zombie).
    pub fn load(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref();
        match Self::open(path) {
            Ok(handle) => handle,
            Err(e) => {
                error!(path = %path.display(), error = %e, "driver: load failed");
                Self::zombie(e.to_string())
            }
        }
    }

    /// Wraps a ready backend, e.g. a voice compiled into the process.
    pub fn from_backend(backend: Box<dyn VoiceBackend>) -> Self {
        let info = backend.info();
        Self {
            state: State::Ready(backend),
            info,
        }
    }

    /// Creates a handle that rejects all operations.
    pub fn zombie(reason: impl Into<String>) -> Self {
        Self {
            state: State::Zombie(reason.into()),
            info: VoiceInfo::default(),
        }
    }

    pub fn state(&self) -> DriverState {
        match self.state {
            State::Ready(_) => DriverState::Ready,
            State::Zombie(_) => DriverState::Zombie,
            State::Released => DriverState::Released,
        }
    }

    pub fn is_ready(&self) -> bool {
        self.state() == DriverState::Ready
    }

    pub fn is_zombie(&self) -> bool {
        self.state() == DriverState::Zombie
    }

    /// Why loading failed, for zombie handles.
    pub fn zombie_reason(&self) -> Option<&str> {
        match &self.state {
            State::Zombie(reason) => Some(reason),
            _ => None,
        }
    }

    /// Voice metadata captured at load time. Zeroed for zombies.
    pub fn info(&self) -> &VoiceInfo {
        &self.info
    }

    pub fn sample_rate(&self) -> u32 {
        self.info.sample_rate
    }

    /// Synthesizes `phonemes` into `buf`.
    ///
    /// A result of zero bytes is reported as [`DriverError::SynthesisFailed`];
    /// the call is not retried here.
    pub fn synthesize(&mut self, phonemes: &str, buf: &mut [u8]) -> Result<Spoken, DriverError> {
        let backend = match &mut self.state {
            State::Ready(backend) => backend,
            State::Zombie(_) => {
                error!("driver: synthesize called on a zombie object");
                return Err(DriverError::Zombie);
            }
            State::Released => return Err(DriverError::Released),
        };

        let spoken = backend.speak(phonemes, buf)?;
        if spoken.written == 0 {
            warn!(name = %self.info.name, "driver: synthesize phonemes ... FAIL");
            return Err(DriverError::SynthesisFailed);
        }
        debug!(
            bytes = spoken.written,
            seconds = spoken.duration,
            "driver: synthesize phonemes ... OK"
        );
        Ok(spoken)
    }

    /// Tears the backend down. Only a ready handle has anything to release;
    /// calling this again, or on a zombie, does nothing.
    pub fn release(&mut self) {
        if let State::Ready(_) = self.state {
            info!(name = %self.info.name, "driver: releasing voice");
            // Dropping the backend runs cleanup and unloads the library.
            self.state = State::Released;
        }
    }
}

impl Drop for DriverHandle {
    fn drop(&mut self) {
        self.release();
    }
}

impl std::fmt::Debug for DriverHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DriverHandle")
            .field("state", &self.state())
            .field("name", &self.info.name)
            .finish()
    }
}
