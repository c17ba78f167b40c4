use flitevox_driver::DriverError;
use thiserror::Error;

use crate::locale::Locale;

/// Errors returned by voice registry operations.
#[derive(Debug, Error)]
pub enum VoiceError {
    #[error("voices: no voice available for '{0}'")]
    NotAvailable(Locale),

    #[error("voices: cannot add linked voice '{locale}': all {capacity} slots are taken")]
    CapacityExceeded { locale: Locale, capacity: usize },

    #[error("voices: voice '{0}' is not registered")]
    NotRegistered(Locale),

    #[error(transparent)]
    Driver(#[from] DriverError),
}
