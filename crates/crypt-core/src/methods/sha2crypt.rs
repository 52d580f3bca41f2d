//! Drepper's SHA-256 and SHA-512 crypt, `$5$` and `$6$`.
//!
//! Setting: `$N$[rounds=R$]salt`, salt up to 16 characters of the crypt
//! alphabet, R in 1000..=999999999 (default 5000, omitted from output unless
//! given explicitly).

use sha2::{Digest, Sha256, Sha512};

use super::{finalize_into, parse_rounds, ShaStyleSalt};
use crate::b64::{push_b64_from_24bit, span_ascii64};
use crate::error::{CryptError, Result};
use crate::registry::HashMethod;
use crate::scratch::{Output, Scratch};

const ROUNDS_PREFIX: &[u8] = b"rounds=";
const SALT_LEN_MAX: usize = 16;
const ROUNDS_DEFAULT: u64 = 5000;
const ROUNDS_MIN: u64 = 1000;
const ROUNDS_MAX: u64 = 999_999_999;

/// What differs between the schemes sharing this construction.
pub(super) struct ShaScheme {
    pub prefix: &'static [u8],
    pub digest_chars: usize,
    pub encode: fn(&[u8], &mut Vec<u8>),
    /// Length of the salt at the start of its field.
    pub salt_end: fn(&[u8]) -> usize,
}

impl ShaScheme {
    // prefix + "rounds=" + 9 digits + "$" + salt + "$" + digest chars + NUL
    fn hash_length(&self) -> usize {
        self.prefix.len() + 7 + 9 + 1 + SALT_LEN_MAX + 1 + self.digest_chars + 1
    }
}

const SHA256_SCHEME: ShaScheme = ShaScheme {
    prefix: b"$5$",
    digest_chars: 43,
    encode: encode_sha256,
    salt_end: span_ascii64,
};

const SHA512_SCHEME: ShaScheme = ShaScheme {
    prefix: b"$6$",
    digest_chars: 86,
    encode: encode_sha512,
    salt_end: span_ascii64,
};

struct ShaSetting<'a> {
    rounds: u64,
    rounds_custom: bool,
    salt: &'a [u8],
}

fn parse_setting<'a>(scheme: &ShaScheme, setting: &'a [u8]) -> Result<ShaSetting<'a>> {
    let mut rest = setting.strip_prefix(scheme.prefix).unwrap_or(setting);
    let mut rounds = ROUNDS_DEFAULT;
    let mut rounds_custom = false;

    if let Some(num) = rest.strip_prefix(ROUNDS_PREFIX) {
        let (value, len) = parse_rounds(num, ROUNDS_MAX).ok_or(CryptError::Invalid)?;
        if num.get(len) != Some(&b'$') || value < ROUNDS_MIN {
            return Err(CryptError::Invalid);
        }
        rounds = value;
        rounds_custom = true;
        rest = &num[len + 1..];
    }

    let salt_len = (scheme.salt_end)(rest);
    if salt_len < rest.len() && rest[salt_len] != b'$' {
        return Err(CryptError::Invalid);
    }
    Ok(ShaSetting {
        rounds,
        rounds_custom,
        salt: &rest[..salt_len.min(SALT_LEN_MAX)],
    })
}

/// Feed `len` bytes of `block` repeated end to end.
fn update_recycled<D: Digest>(ctx: &mut D, block: &[u8], len: usize) {
    let mut cnt = len;
    while cnt >= block.len() {
        ctx.update(block);
        cnt -= block.len();
    }
    ctx.update(&block[..cnt]);
}

/// The digest loop, generic over the SHA-2 width. `work` holds the running
/// result followed by the P and S sequences, each one digest long.
fn sha_crypt_digest<D: Digest>(phrase: &[u8], salt: &[u8], rounds: u64, work: &mut [u8]) {
    let n = <D as Digest>::output_size();
    let (result, rest) = work.split_at_mut(n);
    let (p_bytes, s_bytes) = rest.split_at_mut(n);

    let mut ctx = D::new();
    ctx.update(phrase);
    ctx.update(salt);
    ctx.update(phrase);
    finalize_into(ctx, result);

    let mut ctx = D::new();
    ctx.update(phrase);
    ctx.update(salt);
    let mut cnt = phrase.len();
    while cnt > n {
        ctx.update(&*result);
        cnt -= n;
    }
    ctx.update(&result[..cnt]);

    let mut cnt = phrase.len();
    while cnt > 0 {
        if cnt & 1 != 0 {
            ctx.update(&*result);
        } else {
            ctx.update(phrase);
        }
        cnt >>= 1;
    }
    finalize_into(ctx, result);

    let mut ctx = D::new();
    for _ in 0..phrase.len() {
        ctx.update(phrase);
    }
    finalize_into(ctx, p_bytes);

    let mut ctx = D::new();
    for _ in 0..16 + usize::from(result[0]) {
        ctx.update(salt);
    }
    finalize_into(ctx, s_bytes);

    for round in 0..rounds {
        let mut ctx = D::new();
        if round & 1 != 0 {
            update_recycled(&mut ctx, p_bytes, phrase.len());
        } else {
            ctx.update(&*result);
        }
        if round % 3 != 0 {
            update_recycled(&mut ctx, s_bytes, salt.len());
        }
        if round % 7 != 0 {
            update_recycled(&mut ctx, p_bytes, phrase.len());
        }
        if round & 1 != 0 {
            ctx.update(&*result);
        } else {
            update_recycled(&mut ctx, p_bytes, phrase.len());
        }
        finalize_into(ctx, result);
    }
}

pub(super) fn encode_sha256(r: &[u8], text: &mut Vec<u8>) {
    const ORDER: [(usize, usize, usize); 10] = [
        (0, 10, 20),
        (21, 1, 11),
        (12, 22, 2),
        (3, 13, 23),
        (24, 4, 14),
        (15, 25, 5),
        (6, 16, 26),
        (27, 7, 17),
        (18, 28, 8),
        (9, 19, 29),
    ];
    for (a, b, c) in ORDER {
        push_b64_from_24bit(text, r[a], r[b], r[c], 4);
    }
    push_b64_from_24bit(text, 0, r[31], r[30], 3);
}

fn encode_sha512(r: &[u8], text: &mut Vec<u8>) {
    const ORDER: [(usize, usize, usize); 21] = [
        (0, 21, 42),
        (22, 43, 1),
        (44, 2, 23),
        (3, 24, 45),
        (25, 46, 4),
        (47, 5, 26),
        (6, 27, 48),
        (28, 49, 7),
        (50, 8, 29),
        (9, 30, 51),
        (31, 52, 10),
        (53, 11, 32),
        (12, 33, 54),
        (34, 55, 13),
        (56, 14, 35),
        (15, 36, 57),
        (37, 58, 16),
        (59, 17, 38),
        (18, 39, 60),
        (40, 61, 19),
        (62, 20, 41),
    ];
    for (a, b, c) in ORDER {
        push_b64_from_24bit(text, r[a], r[b], r[c], 4);
    }
    push_b64_from_24bit(text, 0, 0, r[63], 2);
}

pub(super) fn sha_crypt<D: Digest>(
    scheme: &ShaScheme,
    phrase: &[u8],
    setting: &[u8],
    out: &mut Output<'_>,
    scratch: &mut Scratch<'_>,
) -> Result<()> {
    let hash_len = scheme.hash_length();
    out.require(hash_len)?;
    let n = <D as Digest>::output_size();
    let work = scratch.claim(3 * n)?;
    let parsed = parse_setting(scheme, setting)?;

    sha_crypt_digest::<D>(phrase, parsed.salt, parsed.rounds, work);

    let mut text = Vec::with_capacity(hash_len);
    text.extend_from_slice(scheme.prefix);
    if parsed.rounds_custom {
        text.extend_from_slice(format!("rounds={}$", parsed.rounds).as_bytes());
    }
    text.extend_from_slice(parsed.salt);
    text.push(b'$');
    (scheme.encode)(&work[..n], &mut text);
    out.commit(&text)
}

pub(super) fn gensalt_params(tag: &'static str) -> ShaStyleSalt {
    ShaStyleSalt {
        tag,
        max_salt: SALT_LEN_MAX,
        default_rounds: ROUNDS_DEFAULT,
        min_rounds: ROUNDS_MIN,
        max_rounds: ROUNDS_MAX,
    }
}

pub struct Sha256Crypt;

pub static SHA256_CRYPT: Sha256Crypt = Sha256Crypt;

impl HashMethod for Sha256Crypt {
    fn prefix(&self) -> &'static str {
        "$5$"
    }

    fn name(&self) -> &'static str {
        "sha256crypt"
    }

    fn random_bytes(&self) -> usize {
        15
    }

    fn is_strong(&self) -> bool {
        false
    }

    fn crypt(&self, phrase: &[u8], setting: &[u8], out: &mut Output<'_>, scratch: &mut Scratch<'_>) -> Result<()> {
        sha_crypt::<Sha256>(&SHA256_SCHEME, phrase, setting, out, scratch)
    }

    fn gensalt(&self, count: u64, rbytes: &[u8], out: &mut Output<'_>) -> Result<()> {
        gensalt_params("5").generate(count, rbytes, out)
    }
}

pub struct Sha512Crypt;

pub static SHA512_CRYPT: Sha512Crypt = Sha512Crypt;

impl HashMethod for Sha512Crypt {
    fn prefix(&self) -> &'static str {
        "$6$"
    }

    fn name(&self) -> &'static str {
        "sha512crypt"
    }

    fn random_bytes(&self) -> usize {
        15
    }

    fn is_strong(&self) -> bool {
        true
    }

    fn crypt(&self, phrase: &[u8], setting: &[u8], out: &mut Output<'_>, scratch: &mut Scratch<'_>) -> Result<()> {
        sha_crypt::<Sha512>(&SHA512_SCHEME, phrase, setting, out, scratch)
    }

    fn gensalt(&self, count: u64, rbytes: &[u8], out: &mut Output<'_>) -> Result<()> {
        gensalt_params("6").generate(count, rbytes, out)
    }
}
