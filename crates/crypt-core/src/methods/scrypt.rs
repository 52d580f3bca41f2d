//! scrypt in the `$7$` encoding: `$7$` + log2(N) + r (5 chars) + p (5 chars)
//! + raw salt, optionally closed by `$`. Parameters are little-endian 6-bit
//! groups over the crypt alphabet; the salt is used as text, not decoded.

use tracing::debug;

use crate::b64::{ascii_to_bin, encode_lsb_first, push_to64, ASCII64};
use crate::error::{CryptError, Result};
use crate::registry::HashMethod;
use crate::scratch::{Output, Scratch};

const MAGIC: &[u8] = b"$7$";
const PARAMS_LEN: usize = MAGIC.len() + 1 + 5 * 2;
const HASH_LEN: usize = 32;
const HASH_CHARS: usize = 43;
const MAX_MEMORY: u64 = 1 << 30;

fn salt_char_ok(ch: u8) -> bool {
    ch.is_ascii_alphabetic() || (b'.'..=b'9').contains(&ch) || ch == b'$'
}

/// The salt may run into arbitrary bytes only after a `$`.
fn verify_salt(setting: &[u8]) -> bool {
    for i in PARAMS_LEN..setting.len() {
        if !salt_char_ok(setting[i]) {
            return setting[i - 1] == b'$';
        }
    }
    true
}

fn decode_u30(src: &[u8]) -> Option<u32> {
    src.iter()
        .take(5)
        .enumerate()
        .try_fold(0u32, |acc, (i, &c)| Some(acc | (ascii_to_bin(c)? << (6 * i))))
}

struct ScryptSetting<'a> {
    log_n: u8,
    r: u32,
    p: u32,
    salt: &'a [u8],
}

fn parse_setting(setting: &[u8]) -> Result<ScryptSetting<'_>> {
    if !setting.starts_with(MAGIC) || !verify_salt(setting) || setting.len() < PARAMS_LEN {
        return Err(CryptError::Invalid);
    }
    let log_n = ascii_to_bin(setting[3]).ok_or(CryptError::Invalid)?;
    if log_n == 0 {
        return Err(CryptError::Invalid);
    }
    let r = decode_u30(&setting[4..9]).ok_or(CryptError::Invalid)?;
    let p = decode_u30(&setting[9..14]).ok_or(CryptError::Invalid)?;

    let rest = &setting[PARAMS_LEN..];
    let salt_len = rest.iter().rposition(|&c| c == b'$').unwrap_or(rest.len());
    Ok(ScryptSetting {
        log_n: log_n as u8,
        r,
        p,
        salt: &rest[..salt_len],
    })
}

pub struct Scrypt;

pub static SCRYPT: Scrypt = Scrypt;

impl HashMethod for Scrypt {
    fn prefix(&self) -> &'static str {
        "$7$"
    }

    fn name(&self) -> &'static str {
        "scrypt"
    }

    fn random_bytes(&self) -> usize {
        16
    }

    fn is_strong(&self) -> bool {
        true
    }

    fn crypt(&self, phrase: &[u8], setting: &[u8], out: &mut Output<'_>, scratch: &mut Scratch<'_>) -> Result<()> {
        out.require(setting.len() + 1 + HASH_CHARS + 1)?;
        let parsed = parse_setting(setting)?;

        let memory = 128u64
            .checked_mul(u64::from(parsed.r))
            .and_then(|m| m.checked_shl(u32::from(parsed.log_n)))
            .filter(|&m| m >> parsed.log_n == 128 * u64::from(parsed.r));
        match memory {
            Some(m) if m <= MAX_MEMORY => {}
            _ => {
                debug!(log_n = parsed.log_n, r = parsed.r, "scrypt parameters exceed memory limit");
                return Err(CryptError::NoMemory);
            }
        }
        let params = scrypt::Params::new(parsed.log_n, parsed.r, parsed.p, HASH_LEN)
            .map_err(|_| CryptError::Invalid)?;

        let hash = scratch.claim(HASH_LEN)?;
        scrypt::scrypt(phrase, parsed.salt, &params, hash).map_err(|_| CryptError::Invalid)?;

        let mut text = Vec::with_capacity(PARAMS_LEN + parsed.salt.len() + 1 + HASH_CHARS);
        text.extend_from_slice(&setting[..PARAMS_LEN + parsed.salt.len()]);
        text.push(b'$');
        encode_lsb_first(hash, &mut text);
        out.commit(&text)
    }

    fn gensalt(&self, count: u64, rbytes: &[u8], out: &mut Output<'_>) -> Result<()> {
        out.require(PARAMS_LEN + (rbytes.len() * 4 + 2) / 3 + 1)?;
        if (1..6).contains(&count) || count > 11 || rbytes.len() < 16 {
            return Err(CryptError::Invalid);
        }
        let count = if count == 0 { 7 } else { count };

        // N = 2^(count + 7) blocks of r * 128 bytes.
        let (r, p) = (32u32, 1u32);
        let mut text = MAGIC.to_vec();
        text.push(ASCII64[(count + 7) as usize]);
        push_to64(&mut text, r, 5);
        push_to64(&mut text, p, 5);
        encode_lsb_first(rbytes, &mut text);
        out.commit(&text)
    }
}
