//! Public entry points.
//!
//! Every hashing entry point funnels into one routine that writes the
//! failure token, validates the phrase and setting, dispatches on the
//! setting prefix, and wipes the private scratch area on the way out. The
//! variants differ only in who owns the memory.

use std::cell::RefCell;

use serde::Serialize;
use tracing::debug;
use zeroize::{Zeroize, ZeroizeOnDrop, Zeroizing};

use crate::error::{CryptError, Result};
use crate::failure::make_failure_token;
use crate::random::get_random_bytes;
use crate::registry::{default_method, get_hashfn};
use crate::scratch::{c_str, Output, Scratch};

// ── Wire constants ──────────────────────────────────────────────────────────

/// Largest hash string, terminator included.
pub const CRYPT_OUTPUT_SIZE: usize = 384;
/// Passphrases must be strictly shorter than this.
pub const CRYPT_MAX_PASSPHRASE_SIZE: usize = 512;
/// Largest setting string `crypt_gensalt` produces, terminator included.
pub const CRYPT_GENSALT_OUTPUT_SIZE: usize = 192;
/// Working memory available to a single hash method.
pub const ALG_SPECIFIC_SIZE: usize = 8192;
/// Size of [`CryptData`], and the minimum buffer `crypt_rn` accepts.
pub const CRYPT_DATA_SIZE: usize = 32768;

const CRYPT_DATA_RESERVED_SIZE: usize = 767;
const CRYPT_DATA_INTERNAL_SIZE: usize = 30720;

// ── CryptData ───────────────────────────────────────────────────────────────

/// Caller-owned state for the reentrant entry points.
///
/// `setting` and `input` are for the caller's own bookkeeping; the library
/// never reads them. `internal` is private working memory and is wiped after
/// every call.
#[repr(C)]
#[derive(Zeroize, ZeroizeOnDrop)]
pub struct CryptData {
    pub output: [u8; CRYPT_OUTPUT_SIZE],
    pub setting: [u8; CRYPT_OUTPUT_SIZE],
    pub input: [u8; CRYPT_MAX_PASSPHRASE_SIZE],
    pub reserved: [u8; CRYPT_DATA_RESERVED_SIZE],
    pub initialized: u8,
    pub internal: [u8; CRYPT_DATA_INTERNAL_SIZE],
}

const _: () = assert!(std::mem::size_of::<CryptData>() == CRYPT_DATA_SIZE);
const _: () = assert!(ALG_SPECIFIC_SIZE <= CRYPT_DATA_INTERNAL_SIZE);

impl CryptData {
    pub const fn zeroed() -> Self {
        Self {
            output: [0; CRYPT_OUTPUT_SIZE],
            setting: [0; CRYPT_OUTPUT_SIZE],
            input: [0; CRYPT_MAX_PASSPHRASE_SIZE],
            reserved: [0; CRYPT_DATA_RESERVED_SIZE],
            initialized: 0,
            internal: [0; CRYPT_DATA_INTERNAL_SIZE],
        }
    }

    /// Heap-allocated and zeroed.
    pub fn boxed() -> Box<Self> {
        Box::new(Self::zeroed())
    }

    /// The NUL-terminated contents of `output`.
    pub fn output_str(&self) -> &str {
        std::str::from_utf8(c_str(&self.output)).unwrap_or("*")
    }

    fn views(&mut self) -> DataViews<'_> {
        DataViews {
            output: &mut self.output,
            reserved: &mut self.reserved,
            initialized: &mut self.initialized,
            internal: &mut self.internal,
        }
    }
}

impl Default for CryptData {
    fn default() -> Self {
        Self::zeroed()
    }
}

/// The parts of a `CryptData` the library touches, borrowed either from the
/// struct or from a raw byte buffer laid out the same way.
struct DataViews<'a> {
    output: &'a mut [u8],
    reserved: &'a mut [u8],
    initialized: &'a mut u8,
    internal: &'a mut [u8],
}

impl<'a> DataViews<'a> {
    /// Carve a buffer of at least [`CRYPT_DATA_SIZE`] bytes.
    fn from_bytes(buf: &'a mut [u8]) -> Self {
        let (output, rest) = buf.split_at_mut(CRYPT_OUTPUT_SIZE);
        let (_setting, rest) = rest.split_at_mut(CRYPT_OUTPUT_SIZE);
        let (_input, rest) = rest.split_at_mut(CRYPT_MAX_PASSPHRASE_SIZE);
        let (reserved, rest) = rest.split_at_mut(CRYPT_DATA_RESERVED_SIZE);
        let (initialized, internal) = rest.split_at_mut(1);
        Self {
            output,
            reserved,
            initialized: &mut initialized[0],
            internal: &mut internal[..CRYPT_DATA_INTERNAL_SIZE],
        }
    }
}

// ── Hashing ─────────────────────────────────────────────────────────────────

/// Control characters, space, DEL and above, and `! * : ; \` never appear in
/// a valid setting.
fn has_forbidden_chars(setting: &[u8]) -> bool {
    setting
        .iter()
        .any(|&c| c <= 0x20 || c >= 0x7f || b"!*:;\\".contains(&c))
}

fn as_str(output: &[u8]) -> Result<&str> {
    std::str::from_utf8(c_str(output)).map_err(|_| CryptError::Invalid)
}

fn hash_into(phrase: &[u8], setting: &[u8], output: &mut [u8], internal: &mut [u8]) -> Result<()> {
    if phrase.len() >= CRYPT_MAX_PASSPHRASE_SIZE {
        return Err(CryptError::Range);
    }
    if has_forbidden_chars(setting) {
        return Err(CryptError::Invalid);
    }
    let method = get_hashfn(setting).ok_or(CryptError::Invalid)?;
    debug!(method = method.name(), "hashing");

    let mut out = Output::new(output);
    let mut scratch = Scratch::new(&mut internal[..ALG_SPECIFIC_SIZE]);
    method.crypt(phrase, setting, &mut out, &mut scratch)
}

fn do_crypt<'a>(phrase: &[u8], setting: &[u8], views: DataViews<'a>) -> Result<&'a str> {
    let DataViews {
        output,
        reserved,
        initialized,
        internal,
    } = views;
    let phrase = c_str(phrase);
    let setting = c_str(setting);

    make_failure_token(setting, output);
    let result = hash_into(phrase, setting, output, internal);

    internal.zeroize();
    reserved.zeroize();
    *initialized = 0;

    if let Err(e) = result {
        debug!(error = %e, "crypt failed");
        return Err(e);
    }
    as_str(output)
}

/// Hash `phrase` under `setting` using `data` for all working memory.
///
/// On failure the error is returned and `data.output` keeps the failure
/// token.
pub fn crypt_r<'a>(
    phrase: impl AsRef<[u8]>,
    setting: impl AsRef<[u8]>,
    data: &'a mut CryptData,
) -> Result<&'a str> {
    do_crypt(phrase.as_ref(), setting.as_ref(), data.views())
}

/// Like [`crypt_r`] over a raw buffer laid out as a [`CryptData`].
///
/// Buffers shorter than [`CRYPT_DATA_SIZE`] fail with `Range` after
/// receiving as much of the failure token as fits.
pub fn crypt_rn<'a>(
    phrase: impl AsRef<[u8]>,
    setting: impl AsRef<[u8]>,
    buf: &'a mut [u8],
) -> Result<&'a str> {
    if buf.len() < CRYPT_DATA_SIZE {
        let n = buf.len().min(CRYPT_OUTPUT_SIZE);
        make_failure_token(c_str(setting.as_ref()), &mut buf[..n]);
        return Err(CryptError::Range);
    }
    do_crypt(phrase.as_ref(), setting.as_ref(), DataViews::from_bytes(buf))
}

/// Like [`crypt_rn`], growing `buf` to [`CRYPT_DATA_SIZE`] first if needed.
pub fn crypt_ra<'a>(
    phrase: impl AsRef<[u8]>,
    setting: impl AsRef<[u8]>,
    buf: &'a mut Vec<u8>,
) -> Result<&'a str> {
    if buf.len() < CRYPT_DATA_SIZE {
        buf.zeroize();
        buf.try_reserve_exact(CRYPT_DATA_SIZE)
            .map_err(|_| CryptError::NoMemory)?;
        buf.resize(CRYPT_DATA_SIZE, 0);
    }
    crypt_rn(phrase, setting, buf.as_mut_slice())
}

thread_local! {
    static CRYPT_STATE: RefCell<Box<CryptData>> = RefCell::new(CryptData::boxed());
}

/// Hash with per-thread storage. Never fails outright: on error the failure
/// token is returned in place of a hash.
pub fn crypt(phrase: impl AsRef<[u8]>, setting: impl AsRef<[u8]>) -> String {
    CRYPT_STATE.with(|state| {
        let mut data = state.borrow_mut();
        let hashed = crypt_r(phrase, setting, &mut data).map(str::to_owned);
        hashed.unwrap_or_else(|_| data.output_str().to_owned())
    })
}

// ── Setting generation ──────────────────────────────────────────────────────

/// Build a setting string for `prefix` (or the preferred method) into
/// `output`.
///
/// `count` selects the method's cost, zero meaning its default. Without
/// `rbytes`, the method's required number of bytes is drawn from the OS.
pub fn crypt_gensalt_rn<'a>(
    prefix: Option<&str>,
    count: u64,
    rbytes: Option<&[u8]>,
    output: &'a mut [u8],
) -> Result<&'a str> {
    make_failure_token(b"", output);
    if output.len() < 3 {
        return Err(CryptError::Range);
    }

    let method = match prefix {
        Some(p) => get_hashfn(c_str(p.as_bytes())).ok_or(CryptError::Invalid)?,
        None => default_method(),
    };

    let mut os_bytes = Zeroizing::new(Vec::new());
    let rbytes = match rbytes {
        Some(rb) => rb,
        None => {
            os_bytes.resize(method.random_bytes(), 0);
            get_random_bytes(&mut os_bytes)?;
            os_bytes.as_slice()
        }
    };

    let mut out = Output::new(output);
    if let Err(e) = method.gensalt(count, rbytes, &mut out) {
        debug!(method = method.name(), error = %e, "gensalt failed");
        return Err(e);
    }
    as_str(output)
}

/// [`crypt_gensalt_rn`] into a fresh [`CRYPT_GENSALT_OUTPUT_SIZE`] buffer.
pub fn crypt_gensalt(prefix: Option<&str>, count: u64, rbytes: Option<&[u8]>) -> Result<String> {
    let mut output = [0u8; CRYPT_GENSALT_OUTPUT_SIZE];
    crypt_gensalt_rn(prefix, count, rbytes, &mut output).map(str::to_owned)
}

/// [`crypt_gensalt`] whose buffer allocation may fail with `NoMemory`.
pub fn crypt_gensalt_ra(prefix: Option<&str>, count: u64, rbytes: Option<&[u8]>) -> Result<String> {
    let mut output = Vec::new();
    output
        .try_reserve_exact(CRYPT_GENSALT_OUTPUT_SIZE)
        .map_err(|_| CryptError::NoMemory)?;
    output.resize(CRYPT_GENSALT_OUTPUT_SIZE, 0);
    let len = crypt_gensalt_rn(prefix, count, rbytes, &mut output)?.len();
    output.truncate(len);
    String::from_utf8(output).map_err(|_| CryptError::Invalid)
}

// ── Classification ──────────────────────────────────────────────────────────

/// Verdict of [`crypt_checksalt`]. Discriminants match the C constants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
#[repr(i32)]
pub enum SaltCheck {
    Ok = 0,
    Invalid = 1,
    MethodDisabled = 2,
    MethodLegacy = 3,
    TooCheap = 4,
}

impl SaltCheck {
    pub fn code(self) -> i32 {
        self as i32
    }
}

/// Classify `setting` without hashing anything.
pub fn crypt_checksalt(setting: impl AsRef<[u8]>) -> SaltCheck {
    let setting = c_str(setting.as_ref());
    if setting.is_empty() || has_forbidden_chars(setting) {
        return SaltCheck::Invalid;
    }
    match get_hashfn(setting) {
        Some(m) if m.is_strong() => SaltCheck::Ok,
        Some(_) => SaltCheck::MethodLegacy,
        None => SaltCheck::Invalid,
    }
}

/// Prefix of the method `crypt_gensalt` uses when given none.
pub fn crypt_preferred_method() -> &'static str {
    default_method().prefix()
}
