//! Prefix dispatch over the compiled-in hash methods.
//!
//! The table is ordered from the preferred method down to the weakest, and
//! its first entry is the default for `crypt_gensalt` with no prefix. No
//! prefix may be a leading substring of a prefix listed after it.

use tracing::trace;

use crate::error::Result;
use crate::methods::{
    argon2::{ARGON2D, ARGON2I, ARGON2ID},
    bcrypt::{BCRYPT_A, BCRYPT_B, BCRYPT_X, BCRYPT_Y},
    des::{BSDI_DES, TRADITIONAL_DES},
    md5crypt::MD5_CRYPT,
    nthash::NT_HASH,
    scrypt::SCRYPT,
    sha1crypt::SHA1_CRYPT,
    sha2crypt::{SHA256_CRYPT, SHA512_CRYPT},
    sm3crypt::SM3_CRYPT,
    sunmd5::SUN_MD5,
    yescrypt::{GOST_YESCRYPT, SM3_YESCRYPT, YESCRYPT},
};
use crate::scratch::{Output, Scratch};

/// One hashing scheme, selected by the prefix of a setting string.
pub trait HashMethod: Sync {
    /// Leading characters that select this method. Empty for traditional DES.
    fn prefix(&self) -> &'static str;

    /// Short human name, used by the CLI and in logs.
    fn name(&self) -> &'static str;

    /// Random bytes `crypt_gensalt` requests from the OS for this method.
    fn random_bytes(&self) -> usize;

    /// Whether settings for this method are acceptable for new hashes.
    fn is_strong(&self) -> bool;

    /// Hash `phrase` under `setting`. Writes to `out` only on success.
    fn crypt(
        &self,
        phrase: &[u8],
        setting: &[u8],
        out: &mut Output<'_>,
        scratch: &mut Scratch<'_>,
    ) -> Result<()>;

    /// Build a fresh setting string from `count` and `rbytes`.
    fn gensalt(&self, count: u64, rbytes: &[u8], out: &mut Output<'_>) -> Result<()>;
}

static REGISTRY: [&dyn HashMethod; 20] = [
    &YESCRYPT,
    &GOST_YESCRYPT,
    &SM3_YESCRYPT,
    &BCRYPT_B,
    &BCRYPT_A,
    &BCRYPT_X,
    &BCRYPT_Y,
    &ARGON2ID,
    &ARGON2I,
    &ARGON2D,
    &SCRYPT,
    &SHA512_CRYPT,
    &SM3_CRYPT,
    &SHA256_CRYPT,
    &SHA1_CRYPT,
    &SUN_MD5,
    &MD5_CRYPT,
    &NT_HASH,
    &BSDI_DES,
    &TRADITIONAL_DES,
];

/// All methods in dispatch order.
pub fn methods() -> &'static [&'static dyn HashMethod] {
    &REGISTRY
}

/// The method used when no prefix is requested.
pub fn default_method() -> &'static dyn HashMethod {
    REGISTRY[0]
}

fn is_des_salt_char(c: u8) -> bool {
    c.is_ascii_alphanumeric() || c == b'.' || c == b'/'
}

fn matches(method: &dyn HashMethod, setting: &[u8]) -> bool {
    let prefix = method.prefix().as_bytes();
    if !prefix.is_empty() {
        return setting.starts_with(prefix);
    }
    match setting {
        [] => true,
        [a, b, ..] => is_des_salt_char(*a) && is_des_salt_char(*b),
        [_] => false,
    }
}

/// First method whose prefix matches `setting`.
pub fn get_hashfn(setting: &[u8]) -> Option<&'static dyn HashMethod> {
    let found = REGISTRY.iter().copied().find(|m| matches(*m, setting));
    match found {
        Some(m) => trace!(method = m.name(), "dispatch"),
        None => trace!("dispatch: no method for setting"),
    }
    found
}
