//! Voice descriptors: the two kinds of voice a registry can hand out.
//!
//! A [`LinkedVoice`] is compiled into the process (or shipped next to it) and
//! is brought up through an injected [`VoiceRegistrar`]. The single
//! [`FallbackVoice`] is resolved against a [`VoiceCatalog`] at request time
//! and loaded through a [`VoiceLoader`]. Both hold a [`DriverHandle`] exactly
//! while they are registered.

use std::path::{Path, PathBuf};

use flitevox_driver::{DriverError, DriverHandle, SynthesisSession, VoiceInfo};
use serde::Serialize;
use tracing::{debug, info};

use crate::catalog::VoiceCatalog;
use crate::error::VoiceError;
use crate::locale::{Locale, LocaleSupport};

/// Sample rate reported by a descriptor that holds no driver.
pub const DEFAULT_SAMPLE_RATE: u32 = 16000;

// ---------------------------------------------------------------------------
// Capabilities
// ---------------------------------------------------------------------------

/// Brings a linked voice up and down.
pub trait VoiceRegistrar: Send {
    /// Acquires the voice's resources. `voxdir` is the configured resource root.
    fn register(&self, voxdir: &Path) -> Result<DriverHandle, DriverError>;

    /// Releases what [`register`](VoiceRegistrar::register) returned.
    fn unregister(&self, handle: DriverHandle);
}

/// A registrar built from a pair of closures.
pub struct FnRegistrar<R, U> {
    register: R,
    unregister: U,
}

impl<R, U> FnRegistrar<R, U>
where
    R: Fn(&Path) -> Result<DriverHandle, DriverError> + Send,
    U: Fn(DriverHandle) + Send,
{
    pub fn new(register: R, unregister: U) -> Self {
        Self { register, unregister }
    }
}

impl<R, U> VoiceRegistrar for FnRegistrar<R, U>
where
    R: Fn(&Path) -> Result<DriverHandle, DriverError> + Send,
    U: Fn(DriverHandle) + Send,
{
    fn register(&self, voxdir: &Path) -> Result<DriverHandle, DriverError> {
        (self.register)(voxdir)
    }

    fn unregister(&self, handle: DriverHandle) {
        (self.unregister)(handle)
    }
}

/// Registers a voice by opening a driver plugin at a path relative to the
/// resource root. Absolute paths are used as is.
#[derive(Debug, Clone)]
pub struct LibraryRegistrar {
    library: PathBuf,
}

impl LibraryRegistrar {
    pub fn new(library: impl Into<PathBuf>) -> Self {
        Self { library: library.into() }
    }

    pub fn library(&self) -> &Path {
        &self.library
    }
}

impl VoiceRegistrar for LibraryRegistrar {
    fn register(&self, voxdir: &Path) -> Result<DriverHandle, DriverError> {
        DriverHandle::open(voxdir.join(&self.library))
    }

    fn unregister(&self, mut handle: DriverHandle) {
        handle.release();
    }
}

/// Loads the fallback voice from a catalog path.
pub trait VoiceLoader: Send {
    fn load(&self, path: &Path) -> Result<DriverHandle, DriverError>;

    fn unload(&self, mut handle: DriverHandle) {
        handle.release();
    }
}

/// Loads catalog voices as driver plugins.
#[derive(Debug, Clone, Copy, Default)]
pub struct PluginLoader;

impl VoiceLoader for PluginLoader {
    fn load(&self, path: &Path) -> Result<DriverHandle, DriverError> {
        DriverHandle::open(path)
    }
}

// A capability may hand back a handle that already failed to load.
fn ensure_ready(handle: DriverHandle) -> Result<DriverHandle, DriverError> {
    if handle.is_zombie() {
        return Err(DriverError::Zombie);
    }
    Ok(handle)
}

// ---------------------------------------------------------------------------
// LinkedVoice
// ---------------------------------------------------------------------------

/// A voice with a fixed locale, brought up through its registrar.
pub struct LinkedVoice {
    locale: Locale,
    registrar: Box<dyn VoiceRegistrar>,
    handle: Option<DriverHandle>,
}

impl LinkedVoice {
    pub fn new(locale: Locale, registrar: Box<dyn VoiceRegistrar>) -> Self {
        Self {
            locale,
            registrar,
            handle: None,
        }
    }

    pub fn locale(&self) -> &Locale {
        &self.locale
    }

    pub fn locale_support(&self, requested: &Locale) -> LocaleSupport {
        LocaleSupport::of(&self.locale, requested)
    }

    pub fn is_registered(&self) -> bool {
        self.handle.is_some()
    }

    /// Registers the voice. Does nothing if it is already registered.
    pub fn register(&mut self, voxdir: &Path) -> Result<(), DriverError> {
        if self.handle.is_some() {
            return Ok(());
        }
        let handle = self.registrar.register(voxdir).and_then(ensure_ready)?;
        info!(locale = %self.locale, name = %handle.info().name, "voices: linked voice registered");
        self.handle = Some(handle);
        Ok(())
    }

    /// Unregisters the voice. Does nothing if it is not registered.
    pub fn unregister(&mut self) {
        if let Some(handle) = self.handle.take() {
            debug!(locale = %self.locale, "voices: unregistering linked voice");
            self.registrar.unregister(handle);
        }
    }

    pub fn driver(&self) -> Option<&DriverHandle> {
        self.handle.as_ref()
    }

    pub fn driver_mut(&mut self) -> Option<&mut DriverHandle> {
        self.handle.as_mut()
    }

    pub fn summary(&self) -> VoiceSummary {
        VoiceSummary::new(VoiceKind::Linked, &self.locale, &self.locale, self.driver())
    }
}

impl Drop for LinkedVoice {
    fn drop(&mut self) {
        self.unregister();
    }
}

impl std::fmt::Debug for LinkedVoice {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LinkedVoice")
            .field("locale", &self.locale)
            .field("registered", &self.is_registered())
            .finish()
    }
}

// ---------------------------------------------------------------------------
// FallbackVoice
// ---------------------------------------------------------------------------

/// The catalog-backed voice slot.
///
/// Its locale is only meaningful while a voice is loaded: [`locale`] is the
/// triple that was asked for, [`resolved_locale`] the one actually loaded,
/// and both are cleared on unregister.
///
/// [`locale`]: FallbackVoice::locale
/// [`resolved_locale`]: FallbackVoice::resolved_locale
pub struct FallbackVoice {
    locale: Locale,
    resolved: Locale,
    catalog: Box<dyn VoiceCatalog>,
    loader: Box<dyn VoiceLoader>,
    handle: Option<DriverHandle>,
}

impl FallbackVoice {
    pub fn new(catalog: Box<dyn VoiceCatalog>, loader: Box<dyn VoiceLoader>) -> Self {
        Self {
            locale: Locale::default(),
            resolved: Locale::default(),
            catalog,
            loader,
            handle: None,
        }
    }

    /// The requested locale of the current load; empty when unloaded.
    pub fn locale(&self) -> &Locale {
        &self.locale
    }

    /// The locale actually loaded; empty when unloaded.
    pub fn resolved_locale(&self) -> &Locale {
        &self.resolved
    }

    /// Support of the loaded voice for `requested`.
    pub fn locale_support(&self, requested: &Locale) -> LocaleSupport {
        if self.handle.is_none() {
            return LocaleSupport::NotSupported;
        }
        LocaleSupport::of(&self.locale, requested)
    }

    /// What the catalog could offer for `requested`, loaded or not.
    pub fn availability(&self, requested: &Locale) -> LocaleSupport {
        self.catalog.support(requested)
    }

    pub fn is_registered(&self) -> bool {
        self.handle.is_some()
    }

    /// Picks the catalog voice for `requested`: the exact triple, else the
    /// first variant of the country, else the first variant of the
    /// language's first country.
    pub fn select(&self, requested: &Locale) -> Option<Locale> {
        let Locale { language, country, .. } = requested;
        if self.catalog.contains(requested) {
            debug!(locale = %requested, "voices: fallback exact match");
            return Some(requested.clone());
        }
        if let Some(first_variant) = self.catalog.first_variant(language, country) {
            debug!(locale = %requested, variant = %first_variant, "voices: fallback substituted variant");
            return Some(Locale::new(language.as_str(), country.as_str(), first_variant));
        }
        let first_country = self.catalog.first_country(language)?;
        let first_variant = self.catalog.first_variant(language, &first_country)?;
        debug!(
            locale = %requested,
            country = %first_country,
            variant = %first_variant,
            "voices: fallback substituted country"
        );
        Some(Locale::new(language.as_str(), first_country, first_variant))
    }

    /// Loads the catalog voice for `requested`.
    ///
    /// Asking again for the locale that is already loaded does nothing. When
    /// the catalog has nothing for the language the call fails with
    /// [`VoiceError::NotAvailable`] and the current load is kept.
    pub fn load(&mut self, requested: &Locale) -> Result<(), VoiceError> {
        if self.handle.is_some() && &self.locale == requested {
            return Ok(());
        }
        let selected = self
            .select(requested)
            .ok_or_else(|| VoiceError::NotAvailable(requested.clone()))?;

        self.unregister();
        let path = self.catalog.voice_path(&selected);
        let handle = self.loader.load(&path).and_then(ensure_ready)?;

        let info = handle.info();
        info!(
            path = %path.display(),
            requested = %requested,
            resolved = %selected,
            name = %info.name,
            version = %info.version,
            sample_rate = info.sample_rate,
            bits = info.bit_depth.bits(),
            channels = info.channels,
            "voices: fallback voice loaded"
        );
        self.handle = Some(handle);
        self.locale = requested.clone();
        self.resolved = selected;
        Ok(())
    }

    /// Releases the loaded voice and forgets its locale.
    pub fn unregister(&mut self) {
        if let Some(handle) = self.handle.take() {
            debug!(locale = %self.resolved, "voices: unloading fallback voice");
            self.loader.unload(handle);
        }
        self.locale.clear();
        self.resolved.clear();
    }

    pub fn driver(&self) -> Option<&DriverHandle> {
        self.handle.as_ref()
    }

    pub fn driver_mut(&mut self) -> Option<&mut DriverHandle> {
        self.handle.as_mut()
    }

    pub fn summary(&self) -> VoiceSummary {
        VoiceSummary::new(VoiceKind::Fallback, &self.locale, &self.resolved, self.driver())
    }
}

impl Drop for FallbackVoice {
    fn drop(&mut self) {
        self.unregister();
    }
}

impl std::fmt::Debug for FallbackVoice {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FallbackVoice")
            .field("locale", &self.locale)
            .field("resolved", &self.resolved)
            .field("registered", &self.is_registered())
            .finish()
    }
}

// ---------------------------------------------------------------------------
// VoiceDescriptor
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum VoiceKind {
    Linked,
    Fallback,
}

/// Printable snapshot of a descriptor.
#[derive(Debug, Clone, Serialize)]
pub struct VoiceSummary {
    pub kind: VoiceKind,
    pub locale: Locale,
    pub resolved_locale: Locale,
    pub registered: bool,
    pub sample_rate: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub info: Option<VoiceInfo>,
}

impl VoiceSummary {
    fn new(kind: VoiceKind, locale: &Locale, resolved: &Locale, driver: Option<&DriverHandle>) -> Self {
        Self {
            kind,
            locale: locale.clone(),
            resolved_locale: resolved.clone(),
            registered: driver.is_some(),
            sample_rate: driver.map(DriverHandle::sample_rate).unwrap_or(DEFAULT_SAMPLE_RATE),
            info: driver.map(|d| d.info().clone()),
        }
    }
}

/// A voice held by a registry, borrowed for the duration of a call.
#[derive(Debug)]
pub enum VoiceDescriptor<'a> {
    Linked(&'a mut LinkedVoice),
    Fallback(&'a mut FallbackVoice),
}

impl<'a> VoiceDescriptor<'a> {
    pub fn kind(&self) -> VoiceKind {
        match self {
            VoiceDescriptor::Linked(_) => VoiceKind::Linked,
            VoiceDescriptor::Fallback(_) => VoiceKind::Fallback,
        }
    }

    pub fn locale(&self) -> &Locale {
        match self {
            VoiceDescriptor::Linked(v) => v.locale(),
            VoiceDescriptor::Fallback(v) => v.locale(),
        }
    }

    /// The locale of the voice actually loaded. Differs from
    /// [`locale`](VoiceDescriptor::locale) only for an approximate fallback hit.
    pub fn resolved_locale(&self) -> &Locale {
        match self {
            VoiceDescriptor::Linked(v) => v.locale(),
            VoiceDescriptor::Fallback(v) => v.resolved_locale(),
        }
    }

    pub fn locale_support(&self, requested: &Locale) -> LocaleSupport {
        match self {
            VoiceDescriptor::Linked(v) => v.locale_support(requested),
            VoiceDescriptor::Fallback(v) => v.locale_support(requested),
        }
    }

    pub fn is_registered(&self) -> bool {
        self.driver().is_some()
    }

    pub fn unregister(&mut self) {
        match self {
            VoiceDescriptor::Linked(v) => v.unregister(),
            VoiceDescriptor::Fallback(v) => v.unregister(),
        }
    }

    pub fn driver(&self) -> Option<&DriverHandle> {
        match self {
            VoiceDescriptor::Linked(v) => v.driver(),
            VoiceDescriptor::Fallback(v) => v.driver(),
        }
    }

    pub fn driver_mut(&mut self) -> Option<&mut DriverHandle> {
        match self {
            VoiceDescriptor::Linked(v) => v.driver_mut(),
            VoiceDescriptor::Fallback(v) => v.driver_mut(),
        }
    }

    pub fn sample_rate(&self) -> u32 {
        self.driver()
            .map(DriverHandle::sample_rate)
            .unwrap_or(DEFAULT_SAMPLE_RATE)
    }

    pub fn info(&self) -> Option<&VoiceInfo> {
        self.driver().map(DriverHandle::info)
    }

    /// Opens a synthesis session on the registered driver.
    pub fn session(&mut self, buffer_size: usize) -> Result<SynthesisSession<'_>, VoiceError> {
        let locale = self.locale().clone();
        let driver = self.driver_mut().ok_or(VoiceError::NotRegistered(locale))?;
        Ok(SynthesisSession::with_buffer_size(driver, buffer_size))
    }

    /// Like [`session`](VoiceDescriptor::session), keeping the registry borrowed
    /// for as long as the session lives.
    pub fn into_session(self, buffer_size: usize) -> Result<SynthesisSession<'a>, VoiceError> {
        let locale = self.locale().clone();
        let driver = match self {
            VoiceDescriptor::Linked(v) => v.driver_mut(),
            VoiceDescriptor::Fallback(v) => v.driver_mut(),
        };
        let driver = driver.ok_or(VoiceError::NotRegistered(locale))?;
        Ok(SynthesisSession::with_buffer_size(driver, buffer_size))
    }

    pub fn summary(&self) -> VoiceSummary {
        match self {
            VoiceDescriptor::Linked(v) => v.summary(),
            VoiceDescriptor::Fallback(v) => v.summary(),
        }
    }
}
