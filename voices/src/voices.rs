//! The voice registry and its locale resolution.

use std::path::PathBuf;

use flitevox_driver::DEFAULT_BUFFER_SIZE;
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, warn};

use crate::catalog::{DirCatalog, VoiceCatalog, DEFAULT_VOICE_SUFFIX};
use crate::descriptor::{
    FallbackVoice, LinkedVoice, PluginLoader, VoiceDescriptor, VoiceLoader, VoiceRegistrar, VoiceSummary,
};
use crate::error::VoiceError;
use crate::locale::{Locale, LocaleSupport};

/// Default number of linked voices a registry accepts.
pub const DEFAULT_CAPACITY: usize = 8;

/// Default resource root for voices.
pub const DEFAULT_VOXDIR: &str = "/usr/share/flitevox";

/// When linked voices hold their resources.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RegistrationMode {
    /// Every linked voice is registered when added and stays registered.
    AllRegistered,
    /// Only the current voice holds resources.
    #[default]
    OnlyOneRegistered,
}

/// Registry configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VoicesConfig {
    /// Resource root handed to linked registrars and scanned by the
    /// directory catalog.
    pub voxdir: PathBuf,
    /// Maximum number of linked voices.
    pub capacity: usize,
    pub mode: RegistrationMode,
    /// Locale tried by [`Voices::set_default`].
    pub default_locale: Locale,
    /// Synthesis output buffer size in bytes.
    pub buffer_size: usize,
    /// File suffix of catalog voices; files are named `<variant><suffix>`.
    pub voice_suffix: String,
}

impl Default for VoicesConfig {
    fn default() -> Self {
        Self {
            voxdir: PathBuf::from(DEFAULT_VOXDIR),
            capacity: DEFAULT_CAPACITY,
            mode: RegistrationMode::default(),
            default_locale: Locale::new("eng", "USA", "male,rms"),
            buffer_size: DEFAULT_BUFFER_SIZE,
            voice_suffix: DEFAULT_VOICE_SUFFIX.to_string(),
        }
    }
}

/// Identifies a descriptor inside a [`Voices`] registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VoiceSlot {
    /// Index into [`Voices::linked_voices`].
    Linked(usize),
    Fallback,
}

/// A fixed-capacity set of linked voices plus one catalog-backed fallback
/// voice, with a single "current" voice.
///
/// Linked voices are searched in insertion order. Under
/// [`RegistrationMode::OnlyOneRegistered`] at most one voice holds resources
/// at any time.
///
/// The registry is not internally synchronized. Share it behind one mutex.
#[derive(Debug)]
pub struct Voices {
    config: VoicesConfig,
    linked: Vec<LinkedVoice>,
    fallback: FallbackVoice,
    current: Option<VoiceSlot>,
    // The request that selected `current`.
    request: Option<Selection>,
}

/// A resolved request and the fallback availability observed while
/// resolving it. The selection is stale once a better candidate exists.
#[derive(Debug, Clone)]
struct Selection {
    locale: Locale,
    fallback: LocaleSupport,
}

impl Voices {
    pub fn new(config: VoicesConfig, catalog: Box<dyn VoiceCatalog>, loader: Box<dyn VoiceLoader>) -> Self {
        Self {
            linked: Vec::with_capacity(config.capacity),
            fallback: FallbackVoice::new(catalog, loader),
            current: None,
            request: None,
            config,
        }
    }

    /// Registry whose fallback voices are loaded as driver plugins.
    pub fn with_catalog(config: VoicesConfig, catalog: Box<dyn VoiceCatalog>) -> Self {
        Self::new(config, catalog, Box::new(PluginLoader))
    }

    /// Registry over the directory catalog under `config.voxdir`.
    pub fn from_config(config: VoicesConfig) -> Self {
        let catalog = DirCatalog::new(&config.voxdir).with_suffix(config.voice_suffix.as_str());
        Self::with_catalog(config, Box::new(catalog))
    }

    /// Appends a linked voice. Voices added earlier win ties.
    ///
    /// Under [`RegistrationMode::AllRegistered`] the voice is registered right
    /// away; a registration failure is logged and the voice is kept, to be
    /// retried when it is selected.
    pub fn add_linked_voice(
        &mut self,
        locale: Locale,
        registrar: impl VoiceRegistrar + 'static,
    ) -> Result<(), VoiceError> {
        if self.linked.len() >= self.config.capacity {
            warn!(locale = %locale, capacity = self.config.capacity, "voices: linked voice rejected");
            return Err(VoiceError::CapacityExceeded {
                locale,
                capacity: self.config.capacity,
            });
        }

        let mut voice = LinkedVoice::new(locale, Box::new(registrar));
        if self.config.mode == RegistrationMode::AllRegistered {
            if let Err(e) = voice.register(&self.config.voxdir) {
                error!(locale = %voice.locale(), error = %e, "voices: linked voice registration failed");
            }
        }
        debug!(locale = %voice.locale(), index = self.linked.len(), "voices: linked voice added");
        self.linked.push(voice);
        // The new voice may match the last request better.
        self.request = None;
        Ok(())
    }

    /// Best support level any voice, loaded or not, offers for `requested`.
    pub fn query_support(&self, requested: &Locale) -> LocaleSupport {
        let mut best = LocaleSupport::NotSupported;
        for voice in &self.linked {
            best = best.max(voice.locale_support(requested));
            if best.is_exact() {
                return best;
            }
        }
        best.max(self.fallback.availability(requested))
    }

    /// Makes the best voice for `requested` current and returns it.
    ///
    /// Repeating the request of the current voice returns it untouched, unless
    /// a linked voice was added or the catalog gained a better match since. A
    /// fallback voice at least as specific as the best linked voice wins.
    /// When nothing matches, the registry is left without a current voice.
    pub fn resolve(&mut self, requested: &Locale) -> Result<VoiceDescriptor<'_>, VoiceError> {
        let slot = self.resolve_slot(requested)?;
        Ok(self.descriptor(slot))
    }

    fn resolve_slot(&mut self, requested: &Locale) -> Result<VoiceSlot, VoiceError> {
        if let Some(slot) = self.current {
            if self.slot_support(slot, requested).is_exact() || self.selection_holds(requested) {
                debug!(locale = %requested, "voices: current voice already matches");
                return Ok(slot);
            }
            if self.config.mode == RegistrationMode::OnlyOneRegistered {
                self.unregister_slot(slot);
            }
            self.current = None;
            self.request = None;
        }

        let mut best: Option<(usize, LocaleSupport)> = None;
        for (index, voice) in self.linked.iter().enumerate() {
            let level = voice.locale_support(requested);
            if level.is_supported() && best.is_none_or(|(_, b)| level > b) {
                best = Some((index, level));
                if level.is_exact() {
                    break;
                }
            }
        }
        let best_level = best.map(|(_, level)| level).unwrap_or_default();

        let mut available = LocaleSupport::NotSupported;
        if !best_level.is_exact() {
            available = self.fallback.availability(requested);
            if available.is_supported() && available >= best_level {
                match self.fallback.load(requested) {
                    Ok(()) => {
                        info!(locale = %requested, level = ?available, "voices: fallback voice selected");
                        return Ok(self.activate(VoiceSlot::Fallback, requested, available));
                    }
                    Err(e) => {
                        warn!(locale = %requested, error = %e, "voices: fallback voice failed to load");
                    }
                }
            }
        }

        // The fallback is not current past this point.
        self.fallback.unregister();

        let Some((index, level)) = best else {
            info!(locale = %requested, "voices: no voice available");
            return Err(VoiceError::NotAvailable(requested.clone()));
        };
        if let Err(e) = self.linked[index].register(&self.config.voxdir) {
            error!(locale = %requested, error = %e, "voices: linked voice registration failed");
            return Err(e.into());
        }
        info!(
            locale = %requested,
            voice = %self.linked[index].locale(),
            level = ?level,
            "voices: linked voice selected"
        );
        Ok(self.activate(VoiceSlot::Linked(index), requested, available))
    }

    /// Resolves the configured default locale, else activates the first
    /// linked voice.
    pub fn set_default(&mut self) -> Result<VoiceDescriptor<'_>, VoiceError> {
        let default = self.config.default_locale.clone();
        let err = match self.resolve_slot(&default) {
            Ok(slot) => return Ok(self.descriptor(slot)),
            Err(e) => e,
        };
        if self.linked.is_empty() {
            return Err(err);
        }

        debug!(locale = %default, "voices: default locale unavailable, using first linked voice");
        self.linked[0].register(&self.config.voxdir)?;
        self.current = Some(VoiceSlot::Linked(0));
        self.request = None;
        Ok(self.descriptor(VoiceSlot::Linked(0)))
    }

    /// Unregisters every voice and clears the current voice.
    pub fn unregister_all(&mut self) {
        for voice in &mut self.linked {
            voice.unregister();
        }
        self.fallback.unregister();
        self.current = None;
        self.request = None;
    }

    pub fn current(&self) -> Option<VoiceSlot> {
        self.current
    }

    pub fn current_mut(&mut self) -> Option<VoiceDescriptor<'_>> {
        let slot = self.current?;
        Some(self.descriptor(slot))
    }

    pub fn current_locale(&self) -> Option<&Locale> {
        match self.current? {
            VoiceSlot::Linked(index) => Some(self.linked[index].locale()),
            VoiceSlot::Fallback => Some(self.fallback.locale()),
        }
    }

    pub fn current_summary(&self) -> Option<VoiceSummary> {
        match self.current? {
            VoiceSlot::Linked(index) => Some(self.linked[index].summary()),
            VoiceSlot::Fallback => Some(self.fallback.summary()),
        }
    }

    pub fn linked_voices(&self) -> &[LinkedVoice] {
        &self.linked
    }

    pub fn fallback(&self) -> &FallbackVoice {
        &self.fallback
    }

    pub fn config(&self) -> &VoicesConfig {
        &self.config
    }

    pub fn mode(&self) -> RegistrationMode {
        self.config.mode
    }

    pub fn capacity(&self) -> usize {
        self.config.capacity
    }

    /// Number of linked voices.
    pub fn len(&self) -> usize {
        self.linked.len()
    }

    pub fn is_empty(&self) -> bool {
        self.linked.is_empty()
    }

    /// Number of voices currently holding resources, fallback included.
    pub fn registered_count(&self) -> usize {
        let linked = self.linked.iter().filter(|v| v.is_registered()).count();
        linked + usize::from(self.fallback.is_registered())
    }

    fn activate(&mut self, slot: VoiceSlot, requested: &Locale, fallback: LocaleSupport) -> VoiceSlot {
        self.current = Some(slot);
        self.request = Some(Selection {
            locale: requested.clone(),
            fallback,
        });
        slot
    }

    /// Whether `requested` repeats the last request and no linked voice was
    /// added and the catalog offers nothing better since.
    fn selection_holds(&self, requested: &Locale) -> bool {
        match &self.request {
            Some(selection) if &selection.locale == requested => {
                self.fallback.availability(requested) <= selection.fallback
            }
            _ => false,
        }
    }

    fn descriptor(&mut self, slot: VoiceSlot) -> VoiceDescriptor<'_> {
        match slot {
            VoiceSlot::Linked(index) => VoiceDescriptor::Linked(&mut self.linked[index]),
            VoiceSlot::Fallback => VoiceDescriptor::Fallback(&mut self.fallback),
        }
    }

    fn slot_support(&self, slot: VoiceSlot, requested: &Locale) -> LocaleSupport {
        match slot {
            VoiceSlot::Linked(index) => self.linked[index].locale_support(requested),
            VoiceSlot::Fallback => self.fallback.locale_support(requested),
        }
    }

    fn unregister_slot(&mut self, slot: VoiceSlot) {
        match slot {
            VoiceSlot::Linked(index) => self.linked[index].unregister(),
            VoiceSlot::Fallback => self.fallback.unregister(),
        }
    }
}

impl Drop for Voices {
    fn drop(&mut self) {
        let registered = self.registered_count();
        if registered > 0 {
            info!(registered, "voices: releasing registry");
        }
        self.unregister_all();
    }
}
