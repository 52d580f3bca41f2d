//! Argon2 in PHC string form:
//! `$argon2{d,i,id}$v=V$m=M,t=T,p=P$<salt>[$<hash>]`, salt and hash in
//! unpadded standard base64.

use argon2::{Algorithm, Argon2, Params, Version};
use base64::{engine::general_purpose::STANDARD_NO_PAD, Engine};
use tracing::debug;

use crate::error::{CryptError, Result};
use crate::registry::HashMethod;
use crate::scratch::{Output, Scratch};

const HASH_LEN: usize = 32;
const MIN_SETTING_LEN: usize = 26;
const DEFAULT_TIME_COST: u64 = 3;
const GENSALT_MEMORY_KIB: u32 = 4096;
const MIN_SALT_LEN: usize = 8;
const MAX_SALT_LEN: usize = 64;
// 2 GiB, in KiB
const MAX_MEMORY_KIB: u32 = 2 * 1024 * 1024;

/// Parse `<name><value><end>` where value is a decimal u32 without a leading
/// zero. Returns the value and the text after `end`.
fn get_value<'a>(s: &'a [u8], name: &[u8], end: u8) -> Option<(u32, &'a [u8])> {
    let rest = s.strip_prefix(name)?;
    if !matches!(rest.first(), Some(b'1'..=b'9')) {
        return None;
    }
    let digits = rest.iter().take_while(|c| c.is_ascii_digit()).count();
    let mut value: u32 = 0;
    for &c in &rest[..digits] {
        value = value.checked_mul(10)?.checked_add(u32::from(c - b'0'))?;
    }
    if rest.get(digits) != Some(&end) {
        return None;
    }
    Some((value, &rest[digits + 1..]))
}

struct Argon2Setting {
    version: u32,
    m_cost: u32,
    t_cost: u32,
    p_cost: u32,
    salt: Vec<u8>,
}

fn parse_setting(tag: &str, setting: &[u8]) -> Result<Argon2Setting> {
    if setting.len() < MIN_SETTING_LEN {
        return Err(CryptError::Invalid);
    }
    let s = setting
        .strip_prefix(tag.as_bytes())
        .ok_or(CryptError::Invalid)?;
    let (version, s) = get_value(s, b"v=", b'$').ok_or(CryptError::Invalid)?;
    let (m_cost, s) = get_value(s, b"m=", b',').ok_or(CryptError::Invalid)?;
    let (t_cost, s) = get_value(s, b"t=", b',').ok_or(CryptError::Invalid)?;
    let (p_cost, s) = get_value(s, b"p=", b'$').ok_or(CryptError::Invalid)?;

    let end = s.iter().position(|&c| c == b'$').unwrap_or(s.len());
    let salt = STANDARD_NO_PAD
        .decode(&s[..end])
        .map_err(|_| CryptError::Invalid)?;
    Ok(Argon2Setting {
        version,
        m_cost,
        t_cost,
        p_cost,
        salt,
    })
}

/// One registry entry per Argon2 variant.
pub struct Argon2Crypt {
    tag: &'static str,
    algorithm: Algorithm,
}

pub static ARGON2ID: Argon2Crypt = Argon2Crypt {
    tag: "$argon2id$",
    algorithm: Algorithm::Argon2id,
};
pub static ARGON2I: Argon2Crypt = Argon2Crypt {
    tag: "$argon2i$",
    algorithm: Algorithm::Argon2i,
};
pub static ARGON2D: Argon2Crypt = Argon2Crypt {
    tag: "$argon2d$",
    algorithm: Algorithm::Argon2d,
};

impl HashMethod for Argon2Crypt {
    fn prefix(&self) -> &'static str {
        self.tag
    }

    fn name(&self) -> &'static str {
        self.algorithm.as_str()
    }

    fn random_bytes(&self) -> usize {
        16
    }

    fn is_strong(&self) -> bool {
        true
    }

    fn crypt(&self, phrase: &[u8], setting: &[u8], out: &mut Output<'_>, scratch: &mut Scratch<'_>) -> Result<()> {
        let parsed = parse_setting(self.tag, setting)?;
        if parsed.m_cost > MAX_MEMORY_KIB {
            debug!(m_cost = parsed.m_cost, "argon2 memory cost exceeds limit");
            return Err(CryptError::NoMemory);
        }
        let version = Version::try_from(parsed.version).map_err(|_| CryptError::Invalid)?;
        let params = Params::new(parsed.m_cost, parsed.t_cost, parsed.p_cost, Some(HASH_LEN))
            .map_err(|_| CryptError::Invalid)?;

        let hash = scratch.claim(HASH_LEN)?;
        Argon2::new(self.algorithm, version, params)
            .hash_password_into(phrase, &parsed.salt, hash)
            .map_err(|e| {
                debug!(error = %e, "argon2 rejected parameters");
                CryptError::Invalid
            })?;

        let text = format!(
            "{}v={}$m={},t={},p={}${}${}",
            self.tag,
            parsed.version,
            parsed.m_cost,
            parsed.t_cost,
            parsed.p_cost,
            STANDARD_NO_PAD.encode(&parsed.salt),
            STANDARD_NO_PAD.encode(&*hash),
        );
        out.commit(text.as_bytes())
    }

    fn gensalt(&self, count: u64, rbytes: &[u8], out: &mut Output<'_>) -> Result<()> {
        let count = if count == 0 { DEFAULT_TIME_COST } else { count };
        if count > u64::from(u32::MAX) || !(MIN_SALT_LEN..=MAX_SALT_LEN).contains(&rbytes.len()) {
            return Err(CryptError::Invalid);
        }
        let text = format!(
            "{}v=19$m={},t={},p=1${}$",
            self.tag,
            GENSALT_MEMORY_KIB,
            count,
            STANDARD_NO_PAD.encode(rbytes),
        );
        out.commit(text.as_bytes())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scratch::c_str;

    fn hash(m: &Argon2Crypt, phrase: &[u8], setting: &[u8]) -> Result<String> {
        let mut obuf = [0u8; 384];
        let mut sbuf = [0u8; 64];
        {
            let mut out = Output::new(&mut obuf);
            let mut scratch = Scratch::new(&mut sbuf);
            m.crypt(phrase, setting, &mut out, &mut scratch)?;
        }
        Ok(String::from_utf8(c_str(&obuf).to_vec()).unwrap())
    }

    #[test]
    fn reference_vector() {
        assert_eq!(
            hash(&ARGON2I, b"password", b"$argon2i$v=19$m=256,t=2,p=1$c29tZXNhbHQ").unwrap(),
            "$argon2i$v=19$m=256,t=2,p=1$c29tZXNhbHQ$iekCn0Y3spW+sCcFanM2xBT63UP2sghkUoHLIUpWRS8"
        );
    }

    #[test]
    fn hash_verifies_against_itself() {
        let h = hash(&ARGON2ID, b"hunter2", b"$argon2id$v=19$m=64,t=1,p=1$c29tZXNhbHQ$").unwrap();
        assert!(h.starts_with("$argon2id$v=19$m=64,t=1,p=1$c29tZXNhbHQ$"));
        assert_eq!(hash(&ARGON2ID, b"hunter2", h.as_bytes()).unwrap(), h);
    }

    #[test]
    fn rejects_malformed_parameters() {
        for bad in [
            &b"$argon2id$v=19$m=64,t=1,p=1"[..],
            b"$argon2id$v=19$m=064,t=1,p=1$c29tZXNhbHQ",
            b"$argon2id$v=19$m=64;t=1,p=1$c29tZXNhbHQ",
            b"$argon2id$v=0$m=64,t=1,p=1$c29tZXNhbHQ",
            b"$argon2id$v=18$m=64,t=1,p=1$c29tZXNhbHQ",
            b"$argon2id$v=19$m=64,t=1,p=1$c29tZX!hbHQ",
            b"$argon2id$v=19$m=64,t=1,p=1$c2FsdA",
            b"$argon2id$v=19$m=64,t=1,p=99999999999$c29tZXNhbHQ",
            b"$argon2i$v=19$m=64,t=1,p=1$c29tZXNhbHQ",
        ] {
            assert_eq!(
                hash(&ARGON2ID, b"x", bad),
                Err(CryptError::Invalid),
                "{:?}",
                String::from_utf8_lossy(bad)
            );
        }
    }

    #[test]
    fn oversized_memory_is_refused() {
        assert_eq!(
            hash(&ARGON2D, b"x", b"$argon2d$v=19$m=4000000000,t=1,p=1$c29tZXNhbHQ"),
            Err(CryptError::NoMemory)
        );
    }

    #[test]
    fn gensalt_defaults() {
        let mut buf = [0u8; 128];
        let mut out = Output::new(&mut buf);
        ARGON2ID.gensalt(0, b"somesalt", &mut out).unwrap();
        assert_eq!(c_str(&buf), b"$argon2id$v=19$m=4096,t=3,p=1$c29tZXNhbHQ$");

        let mut out = Output::new(&mut buf);
        assert_eq!(ARGON2ID.gensalt(0, b"short", &mut out), Err(CryptError::Invalid));

        let mut small = [0u8; 20];
        let mut out = Output::new(&mut small);
        assert_eq!(ARGON2I.gensalt(1, b"somesalt", &mut out), Err(CryptError::Range));
    }
}
