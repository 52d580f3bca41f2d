//! OS random bytes for `crypt_gensalt` when the caller supplies none.
//!
//! Two sources are tried in order: the platform RNG through `OsRng`, then a
//! direct read of `/dev/urandom`. A source that fails once is never retried
//! for the rest of the process.

use std::fs::File;
use std::io::Read;
use std::sync::atomic::{AtomicBool, Ordering};

use rand::rngs::OsRng;
use rand::RngCore;
use tracing::debug;
use zeroize::Zeroize;

use crate::error::{CryptError, Result};

/// Largest single request, matching `getentropy`.
pub const MAX_RANDOM_REQUEST: usize = 256;

static OS_RNG_BROKEN: AtomicBool = AtomicBool::new(false);
static DEV_URANDOM_BROKEN: AtomicBool = AtomicBool::new(false);

fn from_os_rng(buf: &mut [u8]) -> bool {
    if OS_RNG_BROKEN.load(Ordering::Relaxed) {
        return false;
    }
    match OsRng.try_fill_bytes(buf) {
        Ok(()) => true,
        Err(e) => {
            debug!(error = %e, "OS RNG unavailable, falling back");
            OS_RNG_BROKEN.store(true, Ordering::Relaxed);
            false
        }
    }
}

fn from_dev_urandom(buf: &mut [u8]) -> bool {
    if DEV_URANDOM_BROKEN.load(Ordering::Relaxed) {
        return false;
    }
    let ok = File::open("/dev/urandom")
        .and_then(|mut f| f.read_exact(buf))
        .map_err(|e| debug!(error = %e, "/dev/urandom unavailable"))
        .is_ok();
    if !ok {
        DEV_URANDOM_BROKEN.store(true, Ordering::Relaxed);
    }
    ok
}

/// Fill `buf` with cryptographically strong random bytes.
///
/// Requests larger than [`MAX_RANDOM_REQUEST`] and total source failure both
/// report `NoEntropy`. On failure `buf` is zeroed.
pub fn get_random_bytes(buf: &mut [u8]) -> Result<()> {
    if buf.is_empty() {
        return Ok(());
    }
    if buf.len() > MAX_RANDOM_REQUEST {
        return Err(CryptError::NoEntropy);
    }
    if from_os_rng(buf) || from_dev_urandom(buf) {
        return Ok(());
    }
    buf.zeroize();
    Err(CryptError::NoEntropy)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_request_succeeds() {
        let mut buf: [u8; 0] = [];
        assert!(get_random_bytes(&mut buf).is_ok());
    }

    #[test]
    fn oversized_request_rejected() {
        let mut buf = vec![0u8; MAX_RANDOM_REQUEST + 1];
        assert_eq!(get_random_bytes(&mut buf), Err(CryptError::NoEntropy));
    }

    #[test]
    fn fills_buffer() {
        let mut a = [0u8; 32];
        let mut b = [0u8; 32];
        get_random_bytes(&mut a).unwrap();
        get_random_bytes(&mut b).unwrap();
        assert_ne!(a, b);
    }
}
