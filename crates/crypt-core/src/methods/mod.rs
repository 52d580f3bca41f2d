//! Hash schemes behind the prefix registry.
//!
//! - `yescrypt`   `$y$`, and `$gy$` / `$sm3y$` layered on it
//! - `bcrypt`     `$2a$` / `$2b$` / `$2x$` / `$2y$`, Blowfish-based
//! - `argon2`     `$argon2d$` / `$argon2i$` / `$argon2id$`
//! - `scrypt`     `$7$`
//! - `sha2crypt`  `$5$` / `$6$`
//! - `sm3crypt`   `$sm3$`, the SHA-256 construction over SM3
//! - `sha1crypt`  `$sha1`, iterated HMAC-SHA1
//! - `sunmd5`     `$md5`
//! - `md5crypt`   `$1$`
//! - `nthash`     `$3$`
//! - `des`        traditional DES, bigcrypt and BSDi `_`

pub mod argon2;
pub mod bcrypt;
pub mod des;
pub mod md5crypt;
pub mod nthash;
pub mod scrypt;
pub mod sha1crypt;
pub mod sha2crypt;
pub mod sm3crypt;
pub mod sunmd5;
pub mod yescrypt;

use sha2::digest::generic_array::GenericArray;
use sha2::Digest;

use crate::b64::ASCII64;
use crate::error::{CryptError, Result};
use crate::scratch::Output;

/// Parameters of a `$tag$[rounds=N$]salt` setting generator.
pub(crate) struct ShaStyleSalt {
    pub tag: &'static str,
    pub max_salt: usize,
    pub default_rounds: u64,
    pub min_rounds: u64,
    pub max_rounds: u64,
}

impl ShaStyleSalt {
    /// Shared by md5crypt and the SHA-2 schemes. The rounds field is only
    /// written when it differs from the default; salt length grows with the
    /// supplied random bytes up to `max_salt`.
    pub fn generate(&self, count: u64, rbytes: &[u8], out: &mut Output<'_>) -> Result<()> {
        if rbytes.len() < 3 {
            return Err(CryptError::Invalid);
        }

        let mut count = if count == 0 { self.default_rounds } else { count };
        count = count.clamp(self.min_rounds, self.max_rounds);

        // "$tag$ssss" plus NUL, and "rounds=N$" when non-default.
        let mut needed = self.tag.len() + 7;
        if count != self.default_rounds {
            needed += 9;
            let mut ceiling = 10u64;
            while ceiling < count {
                needed += 1;
                ceiling = ceiling.saturating_mul(10);
            }
        }
        out.require(needed)?;

        let mut text = if count == self.default_rounds {
            format!("${}$", self.tag).into_bytes()
        } else {
            format!("${}$rounds={}$", self.tag, count).into_bytes()
        };

        let osize = out.capacity();
        let mut used = 0;
        while text.len() + 5 < osize && used + 3 < rbytes.len() && used * 4 / 3 < self.max_salt {
            let value = u32::from(rbytes[used])
                | (u32::from(rbytes[used + 1]) << 8)
                | (u32::from(rbytes[used + 2]) << 16);
            for shift in [0, 6, 12, 18] {
                text.push(ASCII64[((value >> shift) & 0x3f) as usize]);
            }
            used += 3;
        }

        out.commit(&text)
    }
}

/// Finish `ctx` straight into a scratch region sized to the digest.
pub(crate) fn finalize_into<D: Digest>(ctx: D, out: &mut [u8]) {
    ctx.finalize_into(GenericArray::from_mut_slice(out));
}

/// Parse a run of decimal digits with no leading zero, stopping at the
/// first non-digit. Returns the value and the number of bytes consumed, or
/// `None` when the run is empty, starts with `0`, or exceeds `max`.
pub(crate) fn parse_rounds(s: &[u8], max: u64) -> Option<(u64, usize)> {
    match s.first() {
        Some(b'1'..=b'9') => {}
        _ => return None,
    }
    let mut value: u64 = 0;
    let mut len = 0;
    for &c in s.iter().take_while(|c| c.is_ascii_digit()) {
        value = value.checked_mul(10)?.checked_add(u64::from(c - b'0'))?;
        if value > max {
            return None;
        }
        len += 1;
    }
    Some((value, len))
}

#[cfg(test)]
mod tests {
    use super::*;

    const SHA256_SALT: ShaStyleSalt = ShaStyleSalt {
        tag: "5",
        max_salt: 16,
        default_rounds: 5000,
        min_rounds: 1000,
        max_rounds: 999_999_999,
    };

    fn generate(count: u64, rbytes: &[u8], osize: usize) -> Result<String> {
        let mut buf = vec![0u8; osize];
        let mut out = Output::new(&mut buf);
        SHA256_SALT.generate(count, rbytes, &mut out)?;
        let end = buf.iter().position(|&b| b == 0).unwrap();
        Ok(String::from_utf8(buf[..end].to_vec()).unwrap())
    }

    #[test]
    fn default_rounds_are_omitted() {
        let rb = [0u8; 15];
        assert_eq!(generate(0, &rb, 64).unwrap(), "$5$................");
        assert_eq!(generate(5000, &rb, 64).unwrap(), "$5$................");
    }

    #[test]
    fn rounds_are_clamped() {
        let rb = [0u8; 4];
        assert_eq!(generate(10, &rb, 64).unwrap(), "$5$rounds=1000$....");
        assert_eq!(generate(u64::MAX, &rb, 64).unwrap(), "$5$rounds=999999999$....");
    }

    #[test]
    fn too_few_random_bytes() {
        assert_eq!(generate(0, &[1, 2], 64), Err(CryptError::Invalid));
    }

    #[test]
    fn salt_shrinks_to_fit_output() {
        let rb = [0u8; 15];
        assert_eq!(generate(0, &rb, 7), Err(CryptError::Range));
        assert_eq!(generate(0, &rb, 8).unwrap(), "$5$");
        assert_eq!(generate(0, &rb, 12).unwrap(), "$5$....");
    }

    #[test]
    fn parse_rounds_rules() {
        assert_eq!(parse_rounds(b"1000$", 999_999_999), Some((1000, 4)));
        assert_eq!(parse_rounds(b"0100$", 999_999_999), None);
        assert_eq!(parse_rounds(b"$", 999_999_999), None);
        assert_eq!(parse_rounds(b"4294967296$", 0xffff_ffff), None);
        assert_eq!(parse_rounds(b"4294967295", 0xffff_ffff), Some((0xffff_ffff, 10)));
    }
}
