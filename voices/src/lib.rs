//! Voice registry with locale resolution.
//!
//! [`Voices`] holds a list of linked voices, searched in insertion order, and
//! one fallback voice backed by a [`VoiceCatalog`] of installed voice files.
//! A request for a `(language, country, variant)` [`Locale`] is matched
//! against both and the most specific voice becomes current:
//!
//! ```no_run
//! use flitevox_voices::{LibraryRegistrar, Locale, Voices, VoicesConfig};
//!
//! let mut voices = Voices::from_config(VoicesConfig::default());
//! voices
//!     .add_linked_voice(Locale::new("eng", "USA", "slt"), LibraryRegistrar::new("lib/slt.so"))
//!     .unwrap();
//!
//! let voice = voices.resolve(&Locale::new("eng", "GBR", "")).unwrap();
//! println!("{:?} voice at {} Hz", voice.kind(), voice.sample_rate());
//! ```
//!
//! A fallback hit may be approximate: the catalog's first country or variant
//! for the language is substituted. [`VoiceDescriptor::locale`] reports the
//! request, [`VoiceDescriptor::resolved_locale`] what was loaded.

mod catalog;
mod descriptor;
mod error;
mod locale;
mod voices;

pub use catalog::{DirCatalog, MemoryCatalog, VoiceCatalog, CATALOG_SUBDIR, DEFAULT_VOICE_SUFFIX};
pub use descriptor::{
    FallbackVoice, FnRegistrar, LibraryRegistrar, LinkedVoice, PluginLoader, VoiceDescriptor, VoiceKind,
    VoiceLoader, VoiceRegistrar, VoiceSummary, DEFAULT_SAMPLE_RATE,
};
pub use error::VoiceError;
pub use locale::{Locale, LocaleSupport};
pub use voices::{RegistrationMode, VoiceSlot, Voices, VoicesConfig, DEFAULT_CAPACITY, DEFAULT_VOXDIR};

#[cfg(test)]
mod tests;
