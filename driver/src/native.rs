//! Safe wrapper around a dynamically loaded voice driver library.

use std::ffi::{c_void, CString};
use std::os::raw::c_char;
use std::path::{Path, PathBuf};
use std::{mem, ptr};

use libloading::Library;
use parking_lot::{const_mutex, Mutex};
use tracing::{debug, info, warn};

use crate::abi::{self, CleanupFn, InfoFn, InitFn, SpeakFn, VoiceInfo};
use crate::backend::{Spoken, VoiceBackend};
use crate::error::DriverError;

// The platform loader is not guaranteed to be re-entrant: every open, init,
// cleanup and close in the process goes through this lock.
static LOADER_LOCK: Mutex<()> = const_mutex(());

// ---------------------------------------------------------------------------
// DriverTable
// ---------------------------------------------------------------------------

/// The four resolved entry points of a voice driver.
#[derive(Clone, Copy)]
pub(crate) struct DriverTable {
    pub(crate) init: InitFn,
    pub(crate) cleanup: CleanupFn,
    pub(crate) speak: SpeakFn,
    pub(crate) info: InfoFn,
}

impl DriverTable {
    /// Resolves all symbols or none.
    ///
    /// # Safety
    ///
    /// The library must export the symbols with the signatures from `abi`.
    unsafe fn resolve(library: &Library) -> Result<Self, String> {
        debug!("driver: resolving voice_driver_* symbols");
        unsafe {
            Self::resolve_with(|name| {
                library
                    .get::<*mut c_void>(name)
                    .map(|sym| *sym)
                    .map_err(|e| e.to_string())
            })
        }
    }

    /// Looks up the four entry points through `lookup`. Nothing is kept
    /// unless every lookup succeeds with a non-null address.
    ///
    /// # Safety
    ///
    /// Every address `lookup` returns must be a function with the matching
    /// signature from `abi`.
    pub(crate) unsafe fn resolve_with(
        mut lookup: impl FnMut(&[u8]) -> Result<*mut c_void, String>,
    ) -> Result<Self, String> {
        let mut get = |name: &[u8]| {
            let printable = String::from_utf8_lossy(name.strip_suffix(b"\0").unwrap_or(name)).into_owned();
            match lookup(name) {
                Ok(addr) if !addr.is_null() => Ok(addr),
                Ok(_) => Err(format!("missing symbol {printable}: null address")),
                Err(e) => Err(format!("missing symbol {printable}: {e}")),
            }
        };

        let init = get(abi::SYM_INIT)?;
        let cleanup = get(abi::SYM_CLEANUP)?;
        let speak = get(abi::SYM_SPEAK)?;
        let info = get(abi::SYM_INFO)?;

        unsafe {
            Ok(Self {
                init: mem::transmute::<*mut c_void, InitFn>(init),
                cleanup: mem::transmute::<*mut c_void, CleanupFn>(cleanup),
                speak: mem::transmute::<*mut c_void, SpeakFn>(speak),
                info: mem::transmute::<*mut c_void, InfoFn>(info),
            })
        }
    }
}

// ---------------------------------------------------------------------------
// NativeBackend
// ---------------------------------------------------------------------------

/// A voice driver plugin that has been loaded, resolved and initialized.
///
/// Dropping it calls `voice_driver_cleanup` and then closes the library.
pub struct NativeBackend {
    table: DriverTable,
    instance: *mut c_void,
    info: VoiceInfo,
    path: PathBuf,
    // None for tables that live in the current image.
    library: Option<Library>,
}

// The instance pointer is only touched through &mut self or in Drop.
unsafe impl Send for NativeBackend {}

impl NativeBackend {
    /// Loads the voice driver library at `path`.
    ///
    /// Fails with [`DriverError::PluginLoadFailed`] if the library cannot be
    /// opened or any of the four entry points is missing, and with
    /// [`DriverError::BackendInitFailed`] if `voice_driver_init` returns null.
    /// The library is closed again on every failure path.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, DriverError> {
        let path = path.as_ref();
        let _guard = LOADER_LOCK.lock();

        debug!(path = %path.display(), "driver: opening voice library");
        let library = unsafe { Library::new(path) }.map_err(|e| DriverError::PluginLoadFailed {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        let table = match unsafe { DriverTable::resolve(&library) } {
            Ok(table) => table,
            Err(reason) => {
                close_library(library, path);
                return Err(DriverError::PluginLoadFailed {
                    path: path.to_path_buf(),
                    reason,
                });
            }
        };

        unsafe { Self::start(table, Some(library), path) }
    }

    /// Initializes a backend from an already resolved table.
    pub(crate) fn from_table(table: DriverTable, path: impl AsRef<Path>) -> Result<Self, DriverError> {
        let _guard = LOADER_LOCK.lock();
        unsafe { Self::start(table, None, path.as_ref()) }
    }

    /// Calls `init` and `info`. Must run under `LOADER_LOCK`.
    unsafe fn start(table: DriverTable, library: Option<Library>, path: &Path) -> Result<Self, DriverError> {
        debug!(path = %path.display(), "driver: calling voice_driver_init");
        let instance = unsafe { (table.init)() };
        if instance.is_null() {
            if let Some(library) = library {
                close_library(library, path);
            }
            return Err(DriverError::BackendInitFailed(path.to_path_buf()));
        }

        let raw = unsafe { (table.info)(instance) };
        let info = VoiceInfo::from_raw(&raw);
        info!(
            name = %info.name,
            description = %info.description,
            version = %info.version,
            bits = info.bit_depth.bits(),
            sample_rate = info.sample_rate,
            "driver: loaded voice"
        );

        Ok(Self {
            table,
            instance,
            info,
            path: path.to_path_buf(),
            library,
        })
    }

    /// Path the backend was loaded from.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl VoiceBackend for NativeBackend {
    fn info(&self) -> VoiceInfo {
        self.info.clone()
    }

    fn speak(&mut self, phonemes: &str, buf: &mut [u8]) -> Result<Spoken, DriverError> {
        let c_phonemes = CString::new(phonemes).map_err(|e| DriverError::InvalidPhonemes(e.to_string()))?;
        let mut duration = 0.0f32;
        let ret = unsafe {
            (self.table.speak)(
                self.instance,
                c_phonemes.as_ptr(),
                &mut duration,
                buf.as_mut_ptr() as *mut c_char,
                buf.len(),
            )
        };
        if ret < 0 {
            return Err(DriverError::Backend(ret));
        }
        Ok(Spoken {
            written: (ret as usize).min(buf.len()),
            duration,
        })
    }
}

impl Drop for NativeBackend {
    fn drop(&mut self) {
        let _guard = LOADER_LOCK.lock();
        debug!(name = %self.info.name, "driver: unloading voice");
        if !self.instance.is_null() {
            unsafe { (self.table.cleanup)(self.instance) };
            self.instance = ptr::null_mut();
        }
        if let Some(library) = self.library.take() {
            close_library(library, &self.path);
        }
        debug!(name = %self.info.name, "driver: unloading voice finished");
    }
}

fn close_library(library: Library, path: &Path) {
    if let Err(e) = library.close() {
        warn!(path = %path.display(), error = %e, "driver: closing voice library failed");
    }
}
