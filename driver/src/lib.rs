//! Dynamic loading of voice driver plugins.
//!
//! A voice driver is a shared library exporting four C entry points
//! (`voice_driver_init`, `voice_driver_cleanup`, `voice_driver_speak`,
//! `voice_driver_info`, see [`abi`]). This crate opens such a library,
//! validates that every entry point is present before exposing anything
//! callable, and guarantees that cleanup runs before the library is unloaded.
//!
//! # Usage
//!
//! ```no_run
//! use flitevox_driver::{DriverHandle, SynthesisSession};
//!
//! let mut driver = DriverHandle::open("/data/voices/cg/isl/ISL/alfur.cg.flitevox").unwrap();
//! let mut session = SynthesisSession::new(&mut driver);
//! let out = session.synthesize("h a l o").unwrap();
//! println!("{} bytes, {:.2}s at {} Hz", out.audio.len(), out.duration, session.sample_rate());
//! ```
//!
//! # Thread Safety
//!
//! Handles are `Send` but not `Sync`: one caller at a time. Loading and
//! unloading are serialized process-wide because the platform loader is
//! not guaranteed to be re-entrant.

pub mod abi;
mod backend;
mod error;
mod handle;
mod native;
pub mod plugin;
mod session;

pub use abi::{BitDepth, VoiceInfo, VoiceVersion, VOICE_DRV_VERSION};
pub use backend::{Spoken, VoiceBackend};
pub use error::DriverError;
pub use handle::{DriverHandle, DriverState};
pub use native::NativeBackend;
pub use plugin::VoicePlugin;
pub use session::{Synthesis, SynthesisSession, DEFAULT_BUFFER_SIZE};
