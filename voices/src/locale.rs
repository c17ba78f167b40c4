//! Locale triples and the support levels they are matched at.

use std::fmt;

use serde::{Deserialize, Serialize};

/// A `(language, country, variant)` triple, e.g. `("eng", "USA", "male,rms")`.
///
/// Fields are compared exactly; no case folding or normalization is done.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Locale {
    pub language: String,
    pub country: String,
    pub variant: String,
}

impl Locale {
    pub fn new(language: impl Into<String>, country: impl Into<String>, variant: impl Into<String>) -> Self {
        Self {
            language: language.into(),
            country: country.into(),
            variant: variant.into(),
        }
    }

    /// True when all three fields are empty.
    pub fn is_empty(&self) -> bool {
        self.language.is_empty() && self.country.is_empty() && self.variant.is_empty()
    }

    pub(crate) fn clear(&mut self) {
        self.language.clear();
        self.country.clear();
        self.variant.clear();
    }
}

impl fmt::Display for Locale {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts = [&self.language, &self.country, &self.variant];
        let mut first = true;
        for part in parts.into_iter().filter(|p| !p.is_empty()) {
            if !first {
                f.write_str("-")?;
            }
            f.write_str(part)?;
            first = false;
        }
        Ok(())
    }
}

/// How well a voice covers a requested locale. Higher levels dominate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LocaleSupport {
    #[default]
    NotSupported,
    LanguageAvailable,
    LanguageCountryAvailable,
    LanguageCountryVariantAvailable,
}

impl LocaleSupport {
    /// Tiered exact comparison of a voice's locale against a request.
    pub fn of(voice: &Locale, requested: &Locale) -> Self {
        if voice.language != requested.language {
            return LocaleSupport::NotSupported;
        }
        if voice.country != requested.country {
            return LocaleSupport::LanguageAvailable;
        }
        if voice.variant != requested.variant {
            return LocaleSupport::LanguageCountryAvailable;
        }
        LocaleSupport::LanguageCountryVariantAvailable
    }

    pub fn is_supported(self) -> bool {
        self > LocaleSupport::NotSupported
    }

    /// Nothing can do better than this level.
    pub fn is_exact(self) -> bool {
        self == LocaleSupport::LanguageCountryVariantAvailable
    }
}
