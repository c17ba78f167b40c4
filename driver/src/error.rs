use std::path::PathBuf;

use thiserror::Error;

/// Errors returned by voice driver operations.
#[derive(Debug, Error)]
pub enum DriverError {
    #[error("driver: failed to load {path:?}: {reason}")]
    PluginLoadFailed { path: PathBuf, reason: String },

    #[error("driver: voice_driver_init returned null for {0:?}")]
    BackendInitFailed(PathBuf),

    #[error("driver: synthesize called on a zombie driver")]
    Zombie,

    #[error("driver: driver already released")]
    Released,

    #[error("driver: synthesis produced no audio")]
    SynthesisFailed,

    #[error("driver: backend returned {0}")]
    Backend(isize),

    #[error("driver: invalid phonemes: {0}")]
    InvalidPhonemes(String),
}
