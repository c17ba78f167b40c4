//! Plugin side of the voice driver ABI.
//!
//! A `cdylib` crate implements [`VoicePlugin`] and invokes
//! [`export_voice_driver!`](crate::export_voice_driver) once; the resulting
//! library can then be opened with [`DriverHandle::open`](crate::DriverHandle::open).
//!
//! ```ignore
//! struct Silence;
//!
//! impl flitevox_driver::VoicePlugin for Silence {
//!     fn init() -> Option<Self> { Some(Silence) }
//!     fn info(&self) -> flitevox_driver::VoiceInfo { Default::default() }
//!     fn speak(&mut self, _phonemes: &str, buf: &mut [u8]) -> Option<(usize, f32)> {
//!         buf.fill(0);
//!         Some((buf.len(), 0.0))
//!     }
//! }
//!
//! flitevox_driver::export_voice_driver!(Silence);
//! ```

use crate::abi::VoiceInfo;

/// A voice implementation exported through the C ABI.
pub trait VoicePlugin: Sized + 'static {
    /// Creates the voice. `None` makes `voice_driver_init` return null.
    fn init() -> Option<Self>;

    fn info(&self) -> VoiceInfo;

    /// Writes PCM for `phonemes` into `buf`, returning the bytes written and
    /// the duration in seconds. `None` is reported to the caller as -1.
    fn speak(&mut self, phonemes: &str, buf: &mut [u8]) -> Option<(usize, f32)>;
}

/// Generic entry points behind [`export_voice_driver!`](crate::export_voice_driver).
/// Panics are caught here and never unwind into the caller.
#[doc(hidden)]
pub mod __export {
    use std::ffi::{c_void, CStr};
    use std::os::raw::c_char;
    use std::panic::{catch_unwind, AssertUnwindSafe};
    use std::ptr;

    use super::VoicePlugin;
    use crate::abi::RawVoiceInfo;

    pub unsafe extern "C" fn init<P: VoicePlugin>() -> *mut c_void {
        match catch_unwind(P::init) {
            Ok(Some(plugin)) => Box::into_raw(Box::new(plugin)) as *mut c_void,
            _ => ptr::null_mut(),
        }
    }

    pub unsafe extern "C" fn cleanup<P: VoicePlugin>(handle: *mut c_void) {
        if handle.is_null() {
            return;
        }
        let plugin = unsafe { Box::from_raw(handle as *mut P) };
        let _ = catch_unwind(AssertUnwindSafe(move || drop(plugin)));
    }

    pub unsafe extern "C" fn speak<P: VoicePlugin>(
        handle: *mut c_void,
        phonemes: *const c_char,
        duration: *mut f32,
        buf: *mut c_char,
        buf_size: usize,
    ) -> isize {
        if handle.is_null() || phonemes.is_null() || (buf.is_null() && buf_size > 0) {
            return -1;
        }
        let plugin = unsafe { &mut *(handle as *mut P) };
        let Ok(phonemes) = unsafe { CStr::from_ptr(phonemes) }.to_str() else {
            return -1;
        };
        let out: &mut [u8] = if buf_size == 0 {
            &mut []
        } else {
            unsafe { std::slice::from_raw_parts_mut(buf as *mut u8, buf_size) }
        };

        match catch_unwind(AssertUnwindSafe(|| plugin.speak(phonemes, out))) {
            Ok(Some((written, seconds))) => {
                if !duration.is_null() {
                    unsafe { *duration = seconds };
                }
                written.min(buf_size) as isize
            }
            _ => -1,
        }
    }

    pub unsafe extern "C" fn info<P: VoicePlugin>(handle: *mut c_void) -> RawVoiceInfo {
        if handle.is_null() {
            return RawVoiceInfo::zeroed();
        }
        let plugin = unsafe { &*(handle as *const P) };
        catch_unwind(AssertUnwindSafe(|| plugin.info().to_raw())).unwrap_or_else(|_| RawVoiceInfo::zeroed())
    }
}

/// Exports `voice_driver_init`, `voice_driver_cleanup`, `voice_driver_speak`
/// and `voice_driver_info` for the given [`VoicePlugin`] type.
///
/// Invoke at most once per library.
#[macro_export]
macro_rules! export_voice_driver {
    ($plugin:ty) => {
        #[unsafe(no_mangle)]
        pub unsafe extern "C" fn voice_driver_init() -> *mut ::std::ffi::c_void {
            unsafe { $crate::plugin::__export::init::<$plugin>() }
        }

        #[unsafe(no_mangle)]
        pub unsafe extern "C" fn voice_driver_cleanup(handle: *mut ::std::ffi::c_void) {
            unsafe { $crate::plugin::__export::cleanup::<$plugin>(handle) }
        }

        #[unsafe(no_mangle)]
        pub unsafe extern "C" fn voice_driver_speak(
            handle: *mut ::std::ffi::c_void,
            phonemes: *const ::std::os::raw::c_char,
            duration: *mut f32,
            buf: *mut ::std::os::raw::c_char,
            buf_size: usize,
        ) -> isize {
            unsafe { $crate::plugin::__export::speak::<$plugin>(handle, phonemes, duration, buf, buf_size) }
        }

        #[unsafe(no_mangle)]
        pub unsafe extern "C" fn voice_driver_info(handle: *mut ::std::ffi::c_void) -> $crate::abi::RawVoiceInfo {
            unsafe { $crate::plugin::__export::info::<$plugin>(handle) }
        }
    };
}
