//! yescrypt, `$y$`, and the schemes that wrap its output in a keyed hash:
//! `$gy$` with GOST R 34.11-2012 (Streebog-256) and `$sm3y$` with SM3.
//!
//! Setting: `$y$` + flavor + log2(N) + r [+ have + optional p, t, g,
//! log2(NROM)] + `$` + salt. Parameters use the variable-length code in
//! [`encoding`]; the salt is base-64 of up to 64 raw bytes and runs to the
//! last `$`.

mod encoding;
mod kdf;

use std::marker::PhantomData;

use hmac::{Mac, SimpleHmac};
use sha2::digest::core_api::BlockSizeUser;
use sha2::Digest;
use sm3::Sm3;
use streebog::Streebog256;
use zeroize::Zeroizing;

use self::encoding::{decode64, decode_u32, encode_u32};
use self::kdf::{Params, DEFAULTS, RW, RW_FLAVOR_MASK};
use crate::b64::encode_lsb_first;
use crate::error::{CryptError, Result};
use crate::registry::HashMethod;
use crate::scratch::{Output, Scratch};

const Y_PREFIX: &[u8] = b"$y$";
const HASH_LEN: usize = 32;
const HASH_CHARS: usize = 43;
const SALT_MAX: usize = 64;

/// Cursor over the parameter characters of a setting.
struct Fields<'a> {
    src: &'a [u8],
    pos: usize,
}

impl Fields<'_> {
    fn next(&mut self, min: u32) -> Result<u32> {
        let (value, used) = decode_u32(&self.src[self.pos..], min).ok_or(CryptError::Invalid)?;
        self.pos += used;
        Ok(value)
    }

    fn at_dollar(&self) -> bool {
        self.src.get(self.pos) == Some(&b'$')
    }
}

struct YSetting {
    params: Params,
    /// Length of `$y$params$salt`, the part copied into the result.
    head: usize,
    salt: Zeroizing<Vec<u8>>,
}

fn parse_setting(setting: &[u8]) -> Result<YSetting> {
    let body = setting.strip_prefix(Y_PREFIX).ok_or(CryptError::Invalid)?;
    let mut fields = Fields { src: body, pos: 0 };

    let flavor = fields.next(0)?;
    let flags = if flavor < RW {
        flavor
    } else if flavor <= RW + (RW_FLAVOR_MASK >> 2) {
        RW + ((flavor - RW) << 2)
    } else {
        return Err(CryptError::Invalid);
    };

    let n_log2 = fields.next(1)?;
    if n_log2 > 63 {
        return Err(CryptError::Invalid);
    }
    let r = fields.next(1)?;
    let mut params = Params::new(flags, 1 << n_log2, r);

    if !fields.at_dollar() {
        let have = fields.next(1)?;
        if have & 1 != 0 {
            params.p = fields.next(2)?;
        }
        if have & 2 != 0 {
            params.t = fields.next(1)?;
        }
        if have & 4 != 0 {
            params.g = fields.next(1)?;
        }
        if have & 8 != 0 {
            let nrom_log2 = fields.next(1)?;
            if nrom_log2 > 63 {
                return Err(CryptError::Invalid);
            }
            params.nrom = 1 << nrom_log2;
        }
    }
    if !fields.at_dollar() {
        return Err(CryptError::Invalid);
    }

    let salt_start = Y_PREFIX.len() + fields.pos + 1;
    let salt_field = &setting[salt_start..];
    let salt_len = salt_field.iter().rposition(|&c| c == b'$').unwrap_or(salt_field.len());
    let salt = decode64(&salt_field[..salt_len], SALT_MAX).ok_or(CryptError::Invalid)?;

    Ok(YSetting {
        params,
        head: salt_start + salt_len,
        salt: Zeroizing::new(salt),
    })
}

/// Hash `phrase` under a `$y$` setting into `hash`. Returns the length of
/// the setting text that precedes the hash in the result.
fn derive(phrase: &[u8], setting: &[u8], hash: &mut [u8; HASH_LEN]) -> Result<usize> {
    let parsed = parse_setting(setting)?;
    kdf::yescrypt(phrase, &parsed.salt, &parsed.params, hash)?;
    Ok(parsed.head)
}

fn claim_hash<'s>(scratch: &'s mut Scratch<'_>) -> Result<&'s mut [u8; HASH_LEN]> {
    <&mut [u8; HASH_LEN]>::try_from(scratch.claim(HASH_LEN)?).map_err(|_| CryptError::Range)
}

/// Shared by the three prefixes: the marker differs, the parameters do not.
fn gensalt_with(prefix: &[u8], count: u64, rbytes: &[u8], out: &mut Output<'_>) -> Result<()> {
    out.require(prefix.len() + 8 * 6 + (rbytes.len() * 4 + 2) / 3 + 1)?;
    if count > 11 || rbytes.len() < 16 {
        return Err(CryptError::Invalid);
    }

    // 1 KiB blocks up to 2 MiB in total, 4 KiB blocks above that.
    let count = if count == 0 { 5 } else { count as u32 };
    let (r, n_log2) = if count < 3 { (8, count + 9) } else { (32, count + 7) };

    let mut text = prefix.to_vec();
    encode_u32(&mut text, RW + (DEFAULTS >> 2), 0).ok_or(CryptError::Range)?;
    encode_u32(&mut text, n_log2, 1).ok_or(CryptError::Range)?;
    encode_u32(&mut text, r, 1).ok_or(CryptError::Range)?;
    text.push(b'$');
    encode_lsb_first(rbytes, &mut text);
    out.commit(&text)
}

pub struct Yescrypt;

pub static YESCRYPT: Yescrypt = Yescrypt;

impl HashMethod for Yescrypt {
    fn prefix(&self) -> &'static str {
        "$y$"
    }

    fn name(&self) -> &'static str {
        "yescrypt"
    }

    fn random_bytes(&self) -> usize {
        16
    }

    fn is_strong(&self) -> bool {
        true
    }

    fn crypt(&self, phrase: &[u8], setting: &[u8], out: &mut Output<'_>, scratch: &mut Scratch<'_>) -> Result<()> {
        out.require(setting.len() + 1 + HASH_CHARS + 1)?;
        let hash = claim_hash(scratch)?;
        let head = derive(phrase, setting, hash)?;

        let mut text = Vec::with_capacity(head + 1 + HASH_CHARS);
        text.extend_from_slice(&setting[..head]);
        text.push(b'$');
        encode_lsb_first(&hash[..], &mut text);
        out.commit(&text)
    }

    fn gensalt(&self, count: u64, rbytes: &[u8], out: &mut Output<'_>) -> Result<()> {
        gensalt_with(Y_PREFIX, count, rbytes, out)
    }
}

fn keyed<D: Digest + BlockSizeUser>(key: &[u8], msg: &[u8]) -> Result<Zeroizing<Vec<u8>>> {
    let mut mac = <SimpleHmac<D> as Mac>::new_from_slice(key).map_err(|_| CryptError::Invalid)?;
    mac.update(msg);
    Ok(Zeroizing::new(mac.finalize().into_bytes().to_vec()))
}

/// yescrypt with its output re-keyed by a national-standard hash:
/// `HMAC(HMAC(H(phrase), setting), yescrypt(phrase, setting))`.
pub struct KeyedYescrypt<D> {
    prefix: &'static str,
    name: &'static str,
    /// Random bytes beyond this are not used for the salt.
    max_rbytes: usize,
    digest: PhantomData<fn() -> D>,
}

pub static GOST_YESCRYPT: KeyedYescrypt<Streebog256> = KeyedYescrypt {
    prefix: "$gy$",
    name: "gost-yescrypt",
    max_rbytes: usize::MAX,
    digest: PhantomData,
};

pub static SM3_YESCRYPT: KeyedYescrypt<Sm3> = KeyedYescrypt {
    prefix: "$sm3y$",
    name: "sm3-yescrypt",
    max_rbytes: SALT_MAX,
    digest: PhantomData,
};

impl<D: Digest + BlockSizeUser> HashMethod for KeyedYescrypt<D> {
    fn prefix(&self) -> &'static str {
        self.prefix
    }

    fn name(&self) -> &'static str {
        self.name
    }

    fn random_bytes(&self) -> usize {
        16
    }

    fn is_strong(&self) -> bool {
        true
    }

    fn crypt(&self, phrase: &[u8], setting: &[u8], out: &mut Output<'_>, scratch: &mut Scratch<'_>) -> Result<()> {
        out.require(setting.len() + 1 + HASH_CHARS + 1)?;
        let rest = setting
            .strip_prefix(self.prefix.as_bytes())
            .ok_or(CryptError::Invalid)?;
        let mut y_setting = Vec::with_capacity(Y_PREFIX.len() + rest.len());
        y_setting.extend_from_slice(Y_PREFIX);
        y_setting.extend_from_slice(rest);

        let hash = claim_hash(scratch)?;
        let head = derive(phrase, &y_setting, hash)?;

        // The inner key covers as many bytes of this setting as the `$y$`
        // form has ahead of its hash, closing `$` included.
        let covered = setting.get(..head + 1).ok_or(CryptError::Invalid)?;
        let phrase_digest = Zeroizing::new(D::digest(phrase).to_vec());
        let inner = keyed::<D>(&phrase_digest, covered)?;
        let outer = keyed::<D>(&inner, &hash[..])?;

        let mut text = Vec::with_capacity(setting.len() + 1 + HASH_CHARS);
        text.extend_from_slice(self.prefix.as_bytes());
        text.extend_from_slice(&y_setting[Y_PREFIX.len()..head]);
        text.push(b'$');
        encode_lsb_first(&outer, &mut text);
        out.commit(&text)
    }

    fn gensalt(&self, count: u64, rbytes: &[u8], out: &mut Output<'_>) -> Result<()> {
        let rbytes = &rbytes[..rbytes.len().min(self.max_rbytes)];
        gensalt_with(self.prefix.as_bytes(), count, rbytes, out)
    }
}
