//! FreeBSD MD5-based crypt, `$1$<salt>$<22 chars>`. Fixed 1000 rounds.

use md5::{Digest, Md5};

use super::{finalize_into, ShaStyleSalt};
use crate::b64::push_b64_from_24bit;
use crate::error::{CryptError, Result};
use crate::registry::HashMethod;
use crate::scratch::{Output, Scratch};

const MD5_PREFIX: &[u8] = b"$1$";
const SALT_LEN_MAX: usize = 8;
// "$1$" + salt + "$" + 22 chars + NUL
const MD5_HASH_LENGTH: usize = 4 + SALT_LEN_MAX + 1 + 22;

const GENSALT: ShaStyleSalt = ShaStyleSalt {
    tag: "1",
    max_salt: SALT_LEN_MAX,
    default_rounds: 1000,
    min_rounds: 1000,
    max_rounds: 1000,
};

/// Salt portion of `setting`: after the optional `$1$`, up to the first `$`,
/// `:` or newline, truncated to eight characters.
fn parse_salt(setting: &[u8]) -> Result<&[u8]> {
    let rest = setting.strip_prefix(MD5_PREFIX).unwrap_or(setting);
    let end = rest
        .iter()
        .position(|c| matches!(c, b'$' | b':' | b'\n'))
        .unwrap_or(rest.len());
    if end < rest.len() && rest[end] != b'$' {
        return Err(CryptError::Invalid);
    }
    Ok(&rest[..end.min(SALT_LEN_MAX)])
}

fn md5crypt_digest(phrase: &[u8], salt: &[u8], result: &mut [u8]) {
    let mut ctx = Md5::new();
    ctx.update(phrase);
    ctx.update(salt);
    ctx.update(phrase);
    finalize_into(ctx, result);

    let mut ctx = Md5::new();
    ctx.update(phrase);
    ctx.update(MD5_PREFIX);
    ctx.update(salt);
    let mut cnt = phrase.len();
    while cnt > 16 {
        ctx.update(&result[..16]);
        cnt -= 16;
    }
    ctx.update(&result[..cnt]);

    // One byte per bit of the phrase length: NUL for a set bit, the first
    // phrase byte for a clear one.
    result[0] = 0;
    let first = phrase.first().copied().unwrap_or(0);
    let mut cnt = phrase.len();
    while cnt > 0 {
        ctx.update([if cnt & 1 != 0 { 0 } else { first }]);
        cnt >>= 1;
    }
    finalize_into(ctx, result);

    for round in 0..1000 {
        let mut ctx = Md5::new();
        if round & 1 != 0 {
            ctx.update(phrase);
        } else {
            ctx.update(&result[..16]);
        }
        if round % 3 != 0 {
            ctx.update(salt);
        }
        if round % 7 != 0 {
            ctx.update(phrase);
        }
        if round & 1 != 0 {
            ctx.update(&result[..16]);
        } else {
            ctx.update(phrase);
        }
        finalize_into(ctx, result);
    }
}

pub struct Md5Crypt;

pub static MD5_CRYPT: Md5Crypt = Md5Crypt;

impl HashMethod for Md5Crypt {
    fn prefix(&self) -> &'static str {
        "$1$"
    }

    fn name(&self) -> &'static str {
        "md5crypt"
    }

    fn random_bytes(&self) -> usize {
        9
    }

    fn is_strong(&self) -> bool {
        false
    }

    fn crypt(&self, phrase: &[u8], setting: &[u8], out: &mut Output<'_>, scratch: &mut Scratch<'_>) -> Result<()> {
        out.require(MD5_HASH_LENGTH)?;
        let result = scratch.claim(16)?;
        let salt = parse_salt(setting)?;

        md5crypt_digest(phrase, salt, result);

        let mut text = Vec::with_capacity(MD5_HASH_LENGTH);
        text.extend_from_slice(MD5_PREFIX);
        text.extend_from_slice(salt);
        text.push(b'$');
        let r = &*result;
        push_b64_from_24bit(&mut text, r[0], r[6], r[12], 4);
        push_b64_from_24bit(&mut text, r[1], r[7], r[13], 4);
        push_b64_from_24bit(&mut text, r[2], r[8], r[14], 4);
        push_b64_from_24bit(&mut text, r[3], r[9], r[15], 4);
        push_b64_from_24bit(&mut text, r[4], r[10], r[5], 4);
        push_b64_from_24bit(&mut text, 0, 0, r[11], 2);
        out.commit(&text)
    }

    fn gensalt(&self, count: u64, rbytes: &[u8], out: &mut Output<'_>) -> Result<()> {
        if count != 0 {
            return Err(CryptError::Invalid);
        }
        GENSALT.generate(1000, rbytes, out)
    }
}
