//! Voice catalog providers: where the fallback voice looks for voice files.

use std::fs;
use std::io;
use std::path::{Component, Path, PathBuf};

use tracing::{debug, warn};

use crate::locale::{Locale, LocaleSupport};

/// Subdirectory of the voice directory holding catalog voices.
pub const CATALOG_SUBDIR: &str = "cg";

/// Default file suffix of a catalog voice: `<variant>.cg.flitevox`.
pub const DEFAULT_VOICE_SUFFIX: &str = ".cg.flitevox";

/// Answers existence queries about installed voices.
///
/// "First" means first in the provider's own iteration order, which is not
/// required to be sorted.
pub trait VoiceCatalog: Send {
    /// First country of `language` that has at least one voice.
    fn first_country(&self, language: &str) -> Option<String>;

    /// First variant installed under `language`/`country`.
    fn first_variant(&self, language: &str, country: &str) -> Option<String>;

    /// Whether a voice exists for exactly this triple.
    fn contains(&self, locale: &Locale) -> bool;

    /// Where the voice for this triple lives.
    fn voice_path(&self, locale: &Locale) -> PathBuf;

    /// Probes language, then country, then variant; each probe only runs if
    /// the previous one succeeded.
    fn support(&self, locale: &Locale) -> LocaleSupport {
        if self.first_country(&locale.language).is_none() {
            return LocaleSupport::NotSupported;
        }
        if self.first_variant(&locale.language, &locale.country).is_none() {
            return LocaleSupport::LanguageAvailable;
        }
        if !self.contains(locale) {
            return LocaleSupport::LanguageCountryAvailable;
        }
        LocaleSupport::LanguageCountryVariantAvailable
    }
}

// ---------------------------------------------------------------------------
// DirCatalog
// ---------------------------------------------------------------------------

/// Catalog backed by a directory tree:
/// `<voxdir>/cg/<language>/<country>/<variant><suffix>`.
///
/// Entries are visited in name order so that "first" is reproducible. Locale
/// fields that are not a single plain path segment never match, so lookups
/// stay under the catalog root.
#[derive(Debug, Clone)]
pub struct DirCatalog {
    root: PathBuf,
    suffix: String,
}

impl DirCatalog {
    pub fn new(voxdir: impl AsRef<Path>) -> Self {
        Self {
            root: voxdir.as_ref().join(CATALOG_SUBDIR),
            suffix: DEFAULT_VOICE_SUFFIX.to_string(),
        }
    }

    pub fn with_suffix(mut self, suffix: impl Into<String>) -> Self {
        self.suffix = suffix.into();
        self
    }

    /// The `cg` directory this catalog scans.
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn sorted_entries(dir: &Path) -> Vec<PathBuf> {
        let entries = match fs::read_dir(dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                debug!(dir = %dir.display(), "catalog: directory does not exist");
                return Vec::new();
            }
            Err(e) => {
                warn!(dir = %dir.display(), error = %e, "catalog: directory could not be opened");
                return Vec::new();
            }
        };
        let mut paths: Vec<PathBuf> = entries.filter_map(|e| e.ok()).map(|e| e.path()).collect();
        paths.sort();
        paths
    }

    fn variant_of(&self, path: &Path) -> Option<String> {
        if !path.is_file() {
            return None;
        }
        let name = path.file_name()?.to_str()?;
        let variant = name.strip_suffix(self.suffix.as_str())?;
        if variant.is_empty() {
            return None;
        }
        Some(variant.to_string())
    }
}

/// Whether `field` names at most one ordinary path segment.
fn is_plain_segment(field: &str) -> bool {
    if field.is_empty() {
        return true;
    }
    if field.contains(['/', '\\']) {
        return false;
    }
    let mut components = Path::new(field).components();
    matches!(
        (components.next(), components.next()),
        (Some(Component::Normal(_)), None)
    )
}

impl VoiceCatalog for DirCatalog {
    fn first_country(&self, language: &str) -> Option<String> {
        if !is_plain_segment(language) {
            debug!(language, "catalog: rejected language");
            return None;
        }
        let dir = self.root.join(language);
        Self::sorted_entries(&dir)
            .into_iter()
            .filter(|p| p.is_dir())
            .filter_map(|p| p.file_name().and_then(|n| n.to_str()).map(str::to_string))
            .find(|country| self.first_variant(language, country).is_some())
    }

    fn first_variant(&self, language: &str, country: &str) -> Option<String> {
        if !is_plain_segment(language) || !is_plain_segment(country) {
            debug!(language, country, "catalog: rejected country");
            return None;
        }
        let dir = self.root.join(language).join(country);
        Self::sorted_entries(&dir).iter().find_map(|p| self.variant_of(p))
    }

    fn contains(&self, locale: &Locale) -> bool {
        let plain = [&locale.language, &locale.country, &locale.variant]
            .into_iter()
            .all(|field| is_plain_segment(field));
        plain && self.voice_path(locale).is_file()
    }

    fn voice_path(&self, locale: &Locale) -> PathBuf {
        self.root
            .join(&locale.language)
            .join(&locale.country)
            .join(format!("{}{}", locale.variant, self.suffix))
    }
}

// ---------------------------------------------------------------------------
// MemoryCatalog
// ---------------------------------------------------------------------------

/// In-memory catalog. "First" follows insertion order.
#[derive(Debug, Clone, Default)]
pub struct MemoryCatalog {
    root: PathBuf,
    voices: Vec<Locale>,
}

impl MemoryCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Paths returned by [`voice_path`](VoiceCatalog::voice_path) are rooted here.
    pub fn with_root(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            voices: Vec::new(),
        }
    }

    /// Adds a voice; duplicates are ignored.
    pub fn insert(&mut self, locale: Locale) -> &mut Self {
        if !self.voices.contains(&locale) {
            self.voices.push(locale);
        }
        self
    }

    pub fn len(&self) -> usize {
        self.voices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.voices.is_empty()
    }
}

impl FromIterator<Locale> for MemoryCatalog {
    fn from_iter<I: IntoIterator<Item = Locale>>(iter: I) -> Self {
        let mut catalog = MemoryCatalog::new();
        for locale in iter {
            catalog.insert(locale);
        }
        catalog
    }
}

impl VoiceCatalog for MemoryCatalog {
    fn first_country(&self, language: &str) -> Option<String> {
        self.voices
            .iter()
            .find(|l| l.language == language)
            .map(|l| l.country.clone())
    }

    fn first_variant(&self, language: &str, country: &str) -> Option<String> {
        self.voices
            .iter()
            .find(|l| l.language == language && l.country == country)
            .map(|l| l.variant.clone())
    }

    fn contains(&self, locale: &Locale) -> bool {
        self.voices.contains(locale)
    }

    fn voice_path(&self, locale: &Locale) -> PathBuf {
        self.root
            .join(&locale.language)
            .join(&locale.country)
            .join(&locale.variant)
    }
}
