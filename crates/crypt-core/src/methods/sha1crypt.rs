//! NetBSD `$sha1$<iterations>$<salt>$<digest>`: PBKDF1 built on HMAC-SHA1,
//! keyed with the passphrase.

use hmac::{Hmac, Mac};
use sha1::Sha1;

use crate::b64::{push_b64_from_24bit, span_ascii64};
use crate::error::{CryptError, Result};
use crate::registry::HashMethod;
use crate::scratch::{Output, Scratch};

type HmacSha1 = Hmac<Sha1>;

const MAGIC: &[u8] = b"$sha1$";
const DEFAULT_ITERATIONS: u64 = 262_144;
const SALT_LENGTH: usize = 64;
const SHA1_SIZE: usize = 20;
const SHA1_OUTPUT_SIZE: usize = 28;
const MIN_OUTPUT: usize = MAGIC.len() + 2 + 10 + SALT_LENGTH + SHA1_OUTPUT_SIZE;

/// Leading decimal digits as an iteration count, saturating. An empty run
/// is zero.
fn parse_iterations(s: &[u8]) -> (u64, usize) {
    let digits = s.iter().take_while(|c| c.is_ascii_digit()).count();
    let value = s[..digits].iter().fold(0u64, |acc, &c| {
        acc.saturating_mul(10).saturating_add(u64::from(c - b'0'))
    });
    (value, digits)
}

fn hmac_into(key: &HmacSha1, data: &[u8], out: &mut [u8]) {
    let mut mac = key.clone();
    mac.update(data);
    out.copy_from_slice(&mac.finalize().into_bytes());
}

pub struct Sha1Crypt;

pub static SHA1_CRYPT: Sha1Crypt = Sha1Crypt;

impl HashMethod for Sha1Crypt {
    fn prefix(&self) -> &'static str {
        "$sha1"
    }

    fn name(&self) -> &'static str {
        "sha1crypt"
    }

    fn random_bytes(&self) -> usize {
        20
    }

    fn is_strong(&self) -> bool {
        false
    }

    fn crypt(&self, phrase: &[u8], setting: &[u8], out: &mut Output<'_>, scratch: &mut Scratch<'_>) -> Result<()> {
        out.require(MIN_OUTPUT)?;
        let work = scratch.claim(2 * SHA1_SIZE)?;

        let rest = setting.strip_prefix(MAGIC).ok_or(CryptError::Invalid)?;
        let (iterations, digits) = parse_iterations(rest);
        if rest.get(digits) != Some(&b'$') {
            return Err(CryptError::Invalid);
        }
        let rest = &rest[digits + 1..];
        let salt_len = span_ascii64(rest);
        if salt_len == 0 || (salt_len < rest.len() && rest[salt_len] != b'$') {
            return Err(CryptError::Invalid);
        }
        let salt = &rest[..salt_len];

        let key = HmacSha1::new_from_slice(phrase).map_err(|_| CryptError::Invalid)?;
        let (digest, prev) = work.split_at_mut(SHA1_SIZE);

        // Prime with <salt>$sha1$<iterations>, then iterate on the digest.
        let mut primer = salt.to_vec();
        primer.extend_from_slice(MAGIC);
        primer.extend_from_slice(iterations.to_string().as_bytes());
        hmac_into(&key, &primer, digest);
        for _ in 1..iterations {
            prev.copy_from_slice(digest);
            hmac_into(&key, prev, digest);
        }

        let mut text = Vec::with_capacity(MIN_OUTPUT);
        text.extend_from_slice(MAGIC);
        text.extend_from_slice(iterations.to_string().as_bytes());
        text.push(b'$');
        text.extend_from_slice(salt);
        text.push(b'$');
        for i in (0..SHA1_SIZE - 3).step_by(3) {
            push_b64_from_24bit(&mut text, digest[i], digest[i + 1], digest[i + 2], 4);
        }
        push_b64_from_24bit(&mut text, digest[SHA1_SIZE - 2], digest[SHA1_SIZE - 1], digest[0], 4);
        out.commit(&text)
    }

    fn gensalt(&self, count: u64, rbytes: &[u8], out: &mut Output<'_>) -> Result<()> {
        // Twelve bytes of salt plus four to perturb the iteration count.
        if rbytes.len() < 12 + 4 {
            return Err(CryptError::Invalid);
        }
        // "$sha1$" + 10 digits + "$" + salt + "$" + NUL
        out.require((rbytes.len() - 4) * 4 / 3 + 9 + 10)?;

        let count = match count {
            0 => DEFAULT_ITERATIONS,
            c => c.clamp(4, u64::from(u32::MAX)),
        };
        let random = u64::from(u32::from_le_bytes([rbytes[0], rbytes[1], rbytes[2], rbytes[3]]));
        let rounds = count - random % (count / 4);

        let mut text = format!("$sha1${rounds}$").into_bytes();
        let olim = (text.len() + SALT_LENGTH).min(out.capacity() - 2);
        let mut r = 4;
        while r + 3 < rbytes.len() && text.len() + 4 < olim {
            push_b64_from_24bit(&mut text, rbytes[r], rbytes[r + 1], rbytes[r + 2], 4);
            r += 3;
        }
        text.push(b'$');
        out.commit(&text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scratch::c_str;

    fn hash(phrase: &[u8], setting: &[u8]) -> Result<String> {
        let mut obuf = [0u8; 384];
        let mut sbuf = [0u8; 64];
        {
            let mut out = Output::new(&mut obuf);
            let mut scratch = Scratch::new(&mut sbuf);
            SHA1_CRYPT.crypt(phrase, setting, &mut out, &mut scratch)?;
        }
        Ok(String::from_utf8(c_str(&obuf).to_vec()).unwrap())
    }

    #[test]
    fn output_shape_and_stability() {
        let h = hash(b"password", b"$sha1$123$GGXpNqoJvglVTkGU$").unwrap();
        assert!(h.starts_with("$sha1$123$GGXpNqoJvglVTkGU$"));
        assert_eq!(h.len(), "$sha1$123$GGXpNqoJvglVTkGU$".len() + SHA1_OUTPUT_SIZE);
        assert_eq!(hash(b"password", h.as_bytes()).unwrap(), h);
        assert_ne!(hash(b"passwore", h.as_bytes()).unwrap(), h);
    }

    #[test]
    fn setting_errors() {
        assert_eq!(hash(b"x", b"$sha1$12"), Err(CryptError::Invalid));
        assert_eq!(hash(b"x", b"$sha1$12$"), Err(CryptError::Invalid));
        assert_eq!(hash(b"x", b"$sha1$12$ab:c"), Err(CryptError::Invalid));
        assert_eq!(hash(b"x", b"$sha1x12$abc"), Err(CryptError::Invalid));
        assert!(hash(b"x", b"$sha1$$abc$").is_ok());
    }

    #[test]
    fn iterations_saturate() {
        assert_eq!(parse_iterations(b"99999999999999999999999$"), (u64::MAX, 23));
        assert_eq!(parse_iterations(b"$"), (0, 0));
    }
}
