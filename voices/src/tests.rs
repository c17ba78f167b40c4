//! End-to-end registry tests over counting registrars, an in-memory catalog
//! and a fake loader.

use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use flitevox_driver::{BitDepth, DriverError, DriverHandle, Spoken, VoiceBackend, VoiceInfo, VoiceVersion};

use crate::*;

// ---------------------------------------------------------------------------
// Fixtures
// ---------------------------------------------------------------------------

struct EchoBackend {
    name: String,
    sample_rate: u32,
}

impl VoiceBackend for EchoBackend {
    fn info(&self) -> VoiceInfo {
        VoiceInfo {
            version: VoiceVersion::new(1, 0, 1),
            sample_rate: self.sample_rate,
            bit_depth: BitDepth::Sixteen,
            channels: 1,
            name: self.name.clone(),
            description: "echo test voice".to_string(),
        }
    }

    fn speak(&mut self, phonemes: &str, buf: &mut [u8]) -> Result<Spoken, DriverError> {
        let n = phonemes.len().min(buf.len());
        buf[..n].copy_from_slice(&phonemes.as_bytes()[..n]);
        Ok(Spoken {
            written: n,
            duration: n as f32 / self.sample_rate as f32,
        })
    }
}

pub(crate) fn ready_handle(name: &str, sample_rate: u32) -> DriverHandle {
    DriverHandle::from_backend(Box::new(EchoBackend {
        name: name.to_string(),
        sample_rate,
    }))
}

/// Loader handing out in-process voices; fails for paths containing `fail_on`.
#[derive(Default)]
pub(crate) struct FakeLoader {
    pub loads: Arc<AtomicUsize>,
    pub unloads: Arc<AtomicUsize>,
    fail_on: Option<String>,
}

impl FakeLoader {
    pub fn failing_on(pattern: &str) -> Self {
        Self {
            fail_on: Some(pattern.to_string()),
            ..Self::default()
        }
    }
}

impl VoiceLoader for FakeLoader {
    fn load(&self, path: &Path) -> Result<DriverHandle, DriverError> {
        self.loads.fetch_add(1, Ordering::SeqCst);
        if let Some(pattern) = &self.fail_on {
            if path.to_string_lossy().contains(pattern.as_str()) {
                return Err(DriverError::BackendInitFailed(path.to_path_buf()));
            }
        }
        Ok(ready_handle(&path.to_string_lossy(), 16000))
    }

    fn unload(&self, mut handle: DriverHandle) {
        self.unloads.fetch_add(1, Ordering::SeqCst);
        handle.release();
    }
}

#[derive(Clone, Default)]
struct Counters {
    registers: Arc<AtomicUsize>,
    unregisters: Arc<AtomicUsize>,
}

impl Counters {
    fn registers(&self) -> usize {
        self.registers.load(Ordering::SeqCst)
    }

    fn unregisters(&self) -> usize {
        self.unregisters.load(Ordering::SeqCst)
    }

    fn registrar(&self, sample_rate: u32) -> impl VoiceRegistrar + 'static {
        let (r, u) = (self.registers.clone(), self.unregisters.clone());
        FnRegistrar::new(
            move |_: &Path| {
                r.fetch_add(1, Ordering::SeqCst);
                Ok(ready_handle("linked", sample_rate))
            },
            move |_handle| {
                u.fetch_add(1, Ordering::SeqCst);
            },
        )
    }
}

fn failing_registrar() -> impl VoiceRegistrar + 'static {
    FnRegistrar::new(
        |voxdir: &Path| Err(DriverError::BackendInitFailed(voxdir.join("broken"))),
        |_| {},
    )
}

fn catalog(locales: &[(&str, &str, &str)]) -> Box<MemoryCatalog> {
    Box::new(locales.iter().map(|(l, c, v)| Locale::new(*l, *c, *v)).collect())
}

fn registry(mode: RegistrationMode, locales: &[(&str, &str, &str)]) -> (Voices, Arc<AtomicUsize>, Arc<AtomicUsize>) {
    let loader = FakeLoader::default();
    let (loads, unloads) = (loader.loads.clone(), loader.unloads.clone());
    let config = VoicesConfig {
        voxdir: "/vox".into(),
        mode,
        ..VoicesConfig::default()
    };
    (Voices::new(config, catalog(locales), Box::new(loader)), loads, unloads)
}

fn eng_usa_male() -> Locale {
    Locale::new("eng", "USA", "male")
}

// ---------------------------------------------------------------------------
// Resolution
// ---------------------------------------------------------------------------

#[test]
fn test_exact_linked_voice_wins() {
    let (mut voices, loads, _) = registry(RegistrationMode::OnlyOneRegistered, &[("eng", "USA", "female")]);
    let counters = Counters::default();
    voices.add_linked_voice(eng_usa_male(), counters.registrar(8000)).unwrap();

    assert_eq!(
        voices.query_support(&eng_usa_male()),
        LocaleSupport::LanguageCountryVariantAvailable
    );
    let voice = voices.resolve(&eng_usa_male()).unwrap();
    assert_eq!(voice.kind(), VoiceKind::Linked);
    assert_eq!(voice.locale(), &eng_usa_male());
    assert!(voice.is_registered());
    assert_eq!(voice.sample_rate(), 8000);

    assert_eq!(voices.current(), Some(VoiceSlot::Linked(0)));
    assert_eq!(counters.registers(), 1);
    assert_eq!(loads.load(Ordering::SeqCst), 0);
}

#[test]
fn test_language_only_match_loads_fallback() {
    let (mut voices, loads, _) = registry(RegistrationMode::OnlyOneRegistered, &[("eng", "USA", "female")]);
    let counters = Counters::default();
    voices.add_linked_voice(eng_usa_male(), counters.registrar(8000)).unwrap();

    let requested = Locale::new("eng", "GBR", "");
    assert_eq!(voices.query_support(&requested), LocaleSupport::LanguageAvailable);

    let voice = voices.resolve(&requested).unwrap();
    assert_eq!(voice.kind(), VoiceKind::Fallback);
    assert_eq!(voice.locale(), &requested);
    assert_eq!(voice.resolved_locale(), &Locale::new("eng", "USA", "female"));
    assert!(voice.is_registered());

    assert_eq!(loads.load(Ordering::SeqCst), 1);
    assert_eq!(counters.registers(), 0);
}

#[test]
fn test_better_linked_voice_beats_fallback() {
    let (mut voices, loads, _) = registry(RegistrationMode::OnlyOneRegistered, &[("eng", "GBR", "rp")]);
    let counters = Counters::default();
    voices.add_linked_voice(eng_usa_male(), counters.registrar(8000)).unwrap();

    let voice = voices.resolve(&Locale::new("eng", "USA", "female")).unwrap();
    assert_eq!(voice.kind(), VoiceKind::Linked);
    assert_eq!(loads.load(Ordering::SeqCst), 0);
}

#[test]
fn test_earlier_linked_voice_wins_ties() {
    let (mut voices, _, _) = registry(RegistrationMode::OnlyOneRegistered, &[]);
    let first = Counters::default();
    let second = Counters::default();
    voices.add_linked_voice(eng_usa_male(), first.registrar(8000)).unwrap();
    voices
        .add_linked_voice(Locale::new("eng", "USA", "female"), second.registrar(16000))
        .unwrap();

    voices.resolve(&Locale::new("eng", "USA", "child")).unwrap();
    assert_eq!(voices.current(), Some(VoiceSlot::Linked(0)));

    voices.resolve(&Locale::new("eng", "USA", "female")).unwrap();
    assert_eq!(voices.current(), Some(VoiceSlot::Linked(1)));
    assert_eq!(first.unregisters(), 1);
}

#[test]
fn test_repeated_request_is_idempotent() {
    let (mut voices, loads, unloads) = registry(RegistrationMode::OnlyOneRegistered, &[("eng", "USA", "female")]);
    let counters = Counters::default();
    voices.add_linked_voice(eng_usa_male(), counters.registrar(8000)).unwrap();

    for _ in 0..3 {
        voices.resolve(&eng_usa_male()).unwrap();
    }
    assert_eq!(counters.registers(), 1);
    assert_eq!(counters.unregisters(), 0);

    let partial = Locale::new("eng", "CAN", "");
    for _ in 0..3 {
        voices.resolve(&partial).unwrap();
    }
    assert_eq!(voices.current(), Some(VoiceSlot::Fallback));
    assert_eq!(loads.load(Ordering::SeqCst), 1);
    assert_eq!(unloads.load(Ordering::SeqCst), 0);
}

#[test]
fn test_repeated_partial_request_keeps_linked_voice() {
    let (mut voices, loads, _) = registry(RegistrationMode::OnlyOneRegistered, &[]);
    let counters = Counters::default();
    voices.add_linked_voice(eng_usa_male(), counters.registrar(8000)).unwrap();

    let partial = Locale::new("eng", "CAN", "");
    for _ in 0..3 {
        voices.resolve(&partial).unwrap();
    }
    assert_eq!(voices.current(), Some(VoiceSlot::Linked(0)));
    assert_eq!(counters.registers(), 1);
    assert_eq!(counters.unregisters(), 0);
    assert_eq!(loads.load(Ordering::SeqCst), 0);
}

#[test]
fn test_added_linked_voice_replaces_partial_match() {
    let (mut voices, _, _) = registry(RegistrationMode::OnlyOneRegistered, &[]);
    let male = Counters::default();
    let canadian = Counters::default();
    voices.add_linked_voice(eng_usa_male(), male.registrar(8000)).unwrap();

    let requested = Locale::new("eng", "CAN", "");
    voices.resolve(&requested).unwrap();
    assert_eq!(voices.current(), Some(VoiceSlot::Linked(0)));

    voices.add_linked_voice(requested.clone(), canadian.registrar(16000)).unwrap();
    let voice = voices.resolve(&requested).unwrap();
    assert_eq!(voice.kind(), VoiceKind::Linked);
    assert_eq!(voice.locale(), &requested);
    assert_eq!(voices.current(), Some(VoiceSlot::Linked(1)));
    assert_eq!(male.unregisters(), 1);
    assert_eq!(canadian.registers(), 1);
}

#[test]
fn test_new_catalog_voice_replaces_partial_match() {
    let dir = tempfile::tempdir().unwrap();
    let loader = FakeLoader::default();
    let loads = loader.loads.clone();
    let config = VoicesConfig {
        voxdir: dir.path().to_path_buf(),
        ..VoicesConfig::default()
    };
    let catalog = DirCatalog::new(dir.path());
    let mut voices = Voices::new(config, Box::new(catalog), Box::new(loader));
    let counters = Counters::default();
    voices.add_linked_voice(eng_usa_male(), counters.registrar(8000)).unwrap();

    let requested = Locale::new("eng", "GBR", "rp");
    voices.resolve(&requested).unwrap();
    voices.resolve(&requested).unwrap();
    assert_eq!(voices.current(), Some(VoiceSlot::Linked(0)));
    assert_eq!(counters.registers(), 1);

    let installed = dir.path().join("cg/eng/GBR/rp.cg.flitevox");
    std::fs::create_dir_all(installed.parent().unwrap()).unwrap();
    std::fs::write(&installed, b"voice").unwrap();

    let voice = voices.resolve(&requested).unwrap();
    assert_eq!(voice.kind(), VoiceKind::Fallback);
    assert_eq!(voice.resolved_locale(), &requested);
    assert_eq!(loads.load(Ordering::SeqCst), 1);
    assert_eq!(counters.unregisters(), 1);
}

#[test]
fn test_only_one_voice_registered() {
    let (mut voices, _, _) = registry(
        RegistrationMode::OnlyOneRegistered,
        &[("eng", "USA", "female"), ("isl", "ISL", "alfur")],
    );
    let a = Counters::default();
    let b = Counters::default();
    voices.add_linked_voice(eng_usa_male(), a.registrar(8000)).unwrap();
    voices.add_linked_voice(Locale::new("deu", "DEU", "kerstin"), b.registrar(16000)).unwrap();
    assert_eq!(voices.registered_count(), 0);

    let requests = [
        eng_usa_male(),
        Locale::new("isl", "ISL", ""),
        Locale::new("deu", "DEU", "kerstin"),
        Locale::new("eng", "GBR", ""),
        eng_usa_male(),
        Locale::new("isl", "ISL", "alfur"),
    ];
    for requested in &requests {
        voices.resolve(requested).unwrap();
        assert_eq!(voices.registered_count(), 1, "after resolving {requested}");
    }
    assert_eq!(a.registers() - a.unregisters(), 0);
    assert_eq!(b.registers() - b.unregisters(), 0);
}

#[test]
fn test_query_support_is_monotonic() {
    let (mut voices, _, _) = registry(RegistrationMode::OnlyOneRegistered, &[("eng", "USA", "female")]);
    let requested = eng_usa_male();
    let before = voices.query_support(&requested);
    assert_eq!(before, LocaleSupport::LanguageCountryAvailable);

    voices
        .add_linked_voice(Locale::new("eng", "AUS", "male"), Counters::default().registrar(8000))
        .unwrap();
    let middle = voices.query_support(&requested);
    assert!(middle >= before);

    voices.add_linked_voice(requested.clone(), Counters::default().registrar(8000)).unwrap();
    let after = voices.query_support(&requested);
    assert!(after >= middle);
    assert!(after.is_exact());
}

#[test]
fn test_not_available_clears_current() {
    let (mut voices, _, unloads) = registry(RegistrationMode::OnlyOneRegistered, &[("isl", "ISL", "alfur")]);
    let counters = Counters::default();
    voices.add_linked_voice(eng_usa_male(), counters.registrar(8000)).unwrap();

    voices.resolve(&eng_usa_male()).unwrap();
    let result = voices.resolve(&Locale::new("fra", "FRA", ""));
    assert!(matches!(result, Err(VoiceError::NotAvailable(_))));
    assert_eq!(voices.current(), None);
    assert_eq!(voices.registered_count(), 0);
    assert_eq!(counters.unregisters(), 1);

    voices.resolve(&Locale::new("isl", "ISL", "")).unwrap();
    let result = voices.resolve(&Locale::new("fra", "FRA", ""));
    assert!(result.is_err());
    assert!(voices.current_locale().is_none());
    assert!(voices.fallback().locale().is_empty());
    assert_eq!(unloads.load(Ordering::SeqCst), 1);
}

#[test]
fn test_fallback_failure_falls_through_to_linked() {
    let loader = FakeLoader::failing_on("GBR");
    let loads = loader.loads.clone();
    let mut voices = Voices::new(VoicesConfig::default(), catalog(&[("eng", "GBR", "rp")]), Box::new(loader));
    let counters = Counters::default();
    voices.add_linked_voice(eng_usa_male(), counters.registrar(8000)).unwrap();

    let voice = voices.resolve(&Locale::new("eng", "GBR", "")).unwrap();
    assert_eq!(voice.kind(), VoiceKind::Linked);
    assert_eq!(loads.load(Ordering::SeqCst), 1);
    assert_eq!(counters.registers(), 1);
    assert!(!voices.fallback().is_registered());
}

#[test]
fn test_linked_registration_failure() {
    let (mut voices, _, _) = registry(RegistrationMode::OnlyOneRegistered, &[]);
    voices.add_linked_voice(eng_usa_male(), failing_registrar()).unwrap();

    let result = voices.resolve(&eng_usa_male());
    assert!(matches!(result, Err(VoiceError::Driver(DriverError::BackendInitFailed(_)))));
    assert_eq!(voices.current(), None);
    assert_eq!(voices.registered_count(), 0);
}

// ---------------------------------------------------------------------------
// Registration modes
// ---------------------------------------------------------------------------

#[test]
fn test_all_registered_up_front() {
    let (mut voices, _, _) = registry(RegistrationMode::AllRegistered, &[]);
    let a = Counters::default();
    let b = Counters::default();
    voices.add_linked_voice(eng_usa_male(), a.registrar(8000)).unwrap();
    voices.add_linked_voice(Locale::new("isl", "ISL", "alfur"), b.registrar(16000)).unwrap();
    assert_eq!(voices.registered_count(), 2);

    voices.resolve(&eng_usa_male()).unwrap();
    voices.resolve(&Locale::new("isl", "ISL", "alfur")).unwrap();
    assert!(voices.resolve(&Locale::new("fra", "FRA", "")).is_err());

    assert_eq!(voices.registered_count(), 2);
    assert_eq!(a.registers(), 1);
    assert_eq!(a.unregisters(), 0);
}

#[test]
fn test_all_registered_keeps_failed_voice() {
    let (mut voices, _, _) = registry(RegistrationMode::AllRegistered, &[]);
    voices.add_linked_voice(eng_usa_male(), failing_registrar()).unwrap();
    assert_eq!(voices.len(), 1);
    assert_eq!(voices.registered_count(), 0);
}

#[test]
fn test_all_registered_releases_fallback_when_linked_wins() {
    let (mut voices, loads, unloads) = registry(RegistrationMode::AllRegistered, &[("eng", "GBR", "rp")]);
    let counters = Counters::default();
    voices.add_linked_voice(eng_usa_male(), counters.registrar(8000)).unwrap();

    voices.resolve(&Locale::new("eng", "GBR", "")).unwrap();
    assert_eq!(voices.current(), Some(VoiceSlot::Fallback));
    assert_eq!(voices.registered_count(), 2);

    voices.resolve(&eng_usa_male()).unwrap();
    assert_eq!(voices.current(), Some(VoiceSlot::Linked(0)));
    assert_eq!(voices.registered_count(), 1);
    assert_eq!(loads.load(Ordering::SeqCst), 1);
    assert_eq!(unloads.load(Ordering::SeqCst), 1);
}

#[test]
fn test_drop_unregisters_each_voice_once() {
    for mode in [RegistrationMode::AllRegistered, RegistrationMode::OnlyOneRegistered] {
        let (mut voices, _, _) = registry(mode, &[]);
        let counters: Vec<Counters> = (0..3).map(|_| Counters::default()).collect();
        for (i, c) in counters.iter().enumerate() {
            voices
                .add_linked_voice(Locale::new("eng", format!("C{i}"), ""), c.registrar(8000))
                .unwrap();
        }
        voices.resolve(&Locale::new("eng", "C2", "")).unwrap();
        let registered = voices.registered_count();
        drop(voices);

        let total_unregisters: usize = counters.iter().map(Counters::unregisters).sum();
        assert_eq!(total_unregisters, registered, "mode {mode:?}");
        for c in &counters {
            assert_eq!(c.registers(), c.unregisters());
        }
    }
}

// ---------------------------------------------------------------------------
// Capacity and defaults
// ---------------------------------------------------------------------------

#[test]
fn test_capacity_exceeded() {
    let config = VoicesConfig {
        capacity: 1,
        ..VoicesConfig::default()
    };
    let mut voices = Voices::new(config, catalog(&[]), Box::new(FakeLoader::default()));
    voices.add_linked_voice(eng_usa_male(), Counters::default().registrar(8000)).unwrap();

    let result = voices.add_linked_voice(Locale::new("isl", "ISL", ""), Counters::default().registrar(8000));
    assert!(matches!(result, Err(VoiceError::CapacityExceeded { capacity: 1, .. })));
    assert_eq!(voices.len(), 1);
    assert_eq!(voices.capacity(), 1);
}

#[test]
fn test_set_default_prefers_default_locale() {
    let (mut voices, _, _) = registry(RegistrationMode::OnlyOneRegistered, &[("eng", "USA", "male,rms")]);
    voices.add_linked_voice(eng_usa_male(), Counters::default().registrar(8000)).unwrap();

    let voice = voices.set_default().unwrap();
    assert_eq!(voice.kind(), VoiceKind::Fallback);
    assert_eq!(voice.resolved_locale(), &Locale::new("eng", "USA", "male,rms"));
}

#[test]
fn test_set_default_uses_first_linked_voice() {
    let (mut voices, _, _) = registry(RegistrationMode::OnlyOneRegistered, &[]);
    let first = Counters::default();
    voices
        .add_linked_voice(Locale::new("isl", "ISL", "alfur"), first.registrar(8000))
        .unwrap();
    voices
        .add_linked_voice(Locale::new("deu", "DEU", ""), Counters::default().registrar(8000))
        .unwrap();

    let voice = voices.set_default().unwrap();
    assert_eq!(voice.locale(), &Locale::new("isl", "ISL", "alfur"));
    assert_eq!(voices.current(), Some(VoiceSlot::Linked(0)));
    assert_eq!(first.registers(), 1);
}

#[test]
fn test_set_default_without_voices() {
    let (mut voices, _, _) = registry(RegistrationMode::OnlyOneRegistered, &[]);
    assert!(matches!(voices.set_default(), Err(VoiceError::NotAvailable(_))));
    assert_eq!(voices.current(), None);
}

// ---------------------------------------------------------------------------
// Synthesis
// ---------------------------------------------------------------------------

#[test]
fn test_synthesize_through_resolved_voice() {
    let (mut voices, _, _) = registry(RegistrationMode::OnlyOneRegistered, &[]);
    voices.add_linked_voice(eng_usa_male(), Counters::default().registrar(8000)).unwrap();

    let mut session = voices.resolve(&eng_usa_male()).unwrap().into_session(64).unwrap();
    let out = session.synthesize("h e l o").unwrap();
    assert_eq!(out.audio, b"h e l o");
    assert_eq!(session.sample_rate(), 8000);
    assert!(session.last_duration() > 0.0);
}

#[test]
fn test_current_summary() {
    let (mut voices, _, _) = registry(RegistrationMode::OnlyOneRegistered, &[("eng", "USA", "female")]);
    assert!(voices.current_summary().is_none());

    voices.resolve(&Locale::new("eng", "", "")).unwrap();
    let summary = voices.current_summary().unwrap();
    assert_eq!(summary.kind, VoiceKind::Fallback);
    assert_eq!(summary.locale, Locale::new("eng", "", ""));
    assert_eq!(summary.resolved_locale, Locale::new("eng", "USA", "female"));
    assert_eq!(summary.info.unwrap().version.to_string(), "1.0.1");
}
