//! C ABI shared by the loader and voice driver plugins.
//!
//! These declarations match `voice_driver.h`. Every plugin exports the four
//! entry points below; the layout of [`RawVoiceInfo`] is part of that
//! contract and must never change between plugin versions.

use std::ffi::c_void;
use std::fmt;
use std::os::raw::{c_char, c_int};

use serde::{Serialize, Serializer};

/// ABI version implemented by this crate (v1.0.1).
pub const VOICE_DRV_VERSION: u32 = 0x010001;

/// Capacity of [`RawVoiceInfo::name`], including the terminating NUL.
pub const NAME_LEN: usize = 64;
/// Capacity of [`RawVoiceInfo::description`], including the terminating NUL.
pub const DESCRIPTION_LEN: usize = 256;

pub const SYM_INIT: &[u8] = b"voice_driver_init\0";
pub const SYM_CLEANUP: &[u8] = b"voice_driver_cleanup\0";
pub const SYM_SPEAK: &[u8] = b"voice_driver_speak\0";
pub const SYM_INFO: &[u8] = b"voice_driver_info\0";

/// `void* voice_driver_init()`
pub type InitFn = unsafe extern "C" fn() -> *mut c_void;
/// `void voice_driver_cleanup(void* handle)`
pub type CleanupFn = unsafe extern "C" fn(*mut c_void);
/// `ssize_t voice_driver_speak(void* handle, const char* phonemes, float* duration, char* buf, size_t buf_size)`
pub type SpeakFn =
    unsafe extern "C" fn(*mut c_void, *const c_char, *mut f32, *mut c_char, usize) -> isize;
/// `struct voice_drv_info_t voice_driver_info(void* handle)`
pub type InfoFn = unsafe extern "C" fn(*mut c_void) -> RawVoiceInfo;

/// Mirror of `struct voice_drv_info_t`.
#[repr(C, align(8))]
#[derive(Clone, Copy)]
pub struct RawVoiceInfo {
    /// Packed as `0x00MMmmpp` (major, minor, patch).
    pub voice_version: u32,
    /// Sample rate in Hz.
    pub sample_rate: u32,
    /// One of 8, 16 or 32.
    pub bit_depth: c_int,
    pub channels: u8,
    pub name: [c_char; NAME_LEN],
    pub description: [c_char; DESCRIPTION_LEN],
}

impl RawVoiceInfo {
    pub fn zeroed() -> Self {
        Self {
            voice_version: 0,
            sample_rate: 0,
            bit_depth: 0,
            channels: 0,
            name: [0; NAME_LEN],
            description: [0; DESCRIPTION_LEN],
        }
    }
}

// ---------------------------------------------------------------------------
// VoiceVersion
// ---------------------------------------------------------------------------

/// Voice version unpacked from the 3 low bytes of `voice_version`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
pub struct VoiceVersion {
    pub major: u8,
    pub minor: u8,
    pub patch: u8,
}

impl VoiceVersion {
    pub const fn new(major: u8, minor: u8, patch: u8) -> Self {
        Self { major, minor, patch }
    }

    /// Unpacks `0x010203` into `1.2.3`. The top byte is never set and is ignored.
    pub const fn unpack(packed: u32) -> Self {
        Self {
            major: ((packed >> 16) & 0xFF) as u8,
            minor: ((packed >> 8) & 0xFF) as u8,
            patch: (packed & 0xFF) as u8,
        }
    }

    pub const fn pack(self) -> u32 {
        ((self.major as u32) << 16) | ((self.minor as u32) << 8) | self.patch as u32
    }
}

impl fmt::Display for VoiceVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)
    }
}

impl Serialize for VoiceVersion {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

// ---------------------------------------------------------------------------
// BitDepth
// ---------------------------------------------------------------------------

/// Sample bit depth reported by a voice.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BitDepth {
    Eight,
    Sixteen,
    ThirtyTwo,
    /// Anything a plugin reports outside the enumerated values.
    Other(i32),
}

impl BitDepth {
    pub fn from_raw(raw: c_int) -> Self {
        match raw {
            8 => BitDepth::Eight,
            16 => BitDepth::Sixteen,
            32 => BitDepth::ThirtyTwo,
            other => BitDepth::Other(other),
        }
    }

    pub fn bits(self) -> i32 {
        match self {
            BitDepth::Eight => 8,
            BitDepth::Sixteen => 16,
            BitDepth::ThirtyTwo => 32,
            BitDepth::Other(n) => n,
        }
    }
}

impl Serialize for BitDepth {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_i32(self.bits())
    }
}

// ---------------------------------------------------------------------------
// VoiceInfo
// ---------------------------------------------------------------------------

/// Owned view of the metadata a voice driver reports about itself.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VoiceInfo {
    pub version: VoiceVersion,
    pub sample_rate: u32,
    pub bit_depth: BitDepth,
    pub channels: u8,
    pub name: String,
    pub description: String,
}

impl Default for VoiceInfo {
    fn default() -> Self {
        Self::from_raw(&RawVoiceInfo::zeroed())
    }
}

impl VoiceInfo {
    pub fn from_raw(raw: &RawVoiceInfo) -> Self {
        Self {
            version: VoiceVersion::unpack(raw.voice_version),
            sample_rate: raw.sample_rate,
            bit_depth: BitDepth::from_raw(raw.bit_depth),
            channels: raw.channels,
            name: read_c_array(&raw.name),
            description: read_c_array(&raw.description),
        }
    }

    /// Converts to the wire struct. Name and description are truncated on a
    /// character boundary so that they always end with a NUL.
    pub fn to_raw(&self) -> RawVoiceInfo {
        let mut raw = RawVoiceInfo::zeroed();
        raw.voice_version = self.version.pack();
        raw.sample_rate = self.sample_rate;
        raw.bit_depth = self.bit_depth.bits();
        raw.channels = self.channels;
        write_c_array(&mut raw.name, &self.name);
        write_c_array(&mut raw.description, &self.description);
        raw
    }
}

fn read_c_array(src: &[c_char]) -> String {
    let bytes: Vec<u8> = src.iter().take_while(|&&c| c != 0).map(|&c| c as u8).collect();
    String::from_utf8_lossy(&bytes).into_owned()
}

fn write_c_array(dst: &mut [c_char], s: &str) {
    let Some(max) = dst.len().checked_sub(1) else {
        return;
    };
    let mut end = s.len().min(max);
    while !s.is_char_boundary(end) {
        end -= 1;
    }
    for (d, &b) in dst.iter_mut().zip(&s.as_bytes()[..end]) {
        *d = b as c_char;
    }
    dst[end] = 0;
}
