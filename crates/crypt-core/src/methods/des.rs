//! DES-based password hashes: traditional two-character-salt DES, its
//! multi-block bigcrypt extension, and BSDi extended DES (`_`).

use crate::b64::{ascii_to_bin, encode_msb_first, ASCII64};
use crate::des::DesCtx;
use crate::error::{CryptError, Result};
use crate::registry::HashMethod;
use crate::scratch::{Output, Scratch};

// SShhhhhhhhhhh plus NUL
const DES_TRD_OUTPUT_LEN: usize = 14;
// _CCCCSSSShhhhhhhhhhh plus NUL
const DES_EXT_OUTPUT_LEN: usize = 21;
// SS (hhhhhhhhhhh){1,16} plus NUL
const DES_BIG_OUTPUT_LEN: usize = 16 * 11 + 2 + 1;

const MAX_SEGMENTS: usize = 16;

/// Key buffer plus previous-block buffer.
const DES_BUFFER_SIZE: usize = 16;

fn des_buffers<'s>(scratch: &'s mut Scratch<'_>) -> Result<(&'s mut [u8; 8], &'s mut [u8; 8])> {
    let work = scratch.claim(DES_BUFFER_SIZE)?;
    let (keybuf, pkbuf) = work.split_at_mut(8);
    let keybuf = <&mut [u8; 8]>::try_from(keybuf).map_err(|_| CryptError::Range)?;
    let pkbuf = <&mut [u8; 8]>::try_from(pkbuf).map_err(|_| CryptError::Range)?;
    Ok((keybuf, pkbuf))
}

/// Consume up to eight bytes of `phrase` starting at `*pos`, shifting each
/// up one bit, and XOR them into `keybuf`. Short blocks are zero-padded.
fn load_key_block(keybuf: &mut [u8; 8], mask: &[u8; 8], phrase: &[u8], pos: &mut usize) {
    for (k, m) in keybuf.iter_mut().zip(mask) {
        let c = phrase.get(*pos).copied().unwrap_or(0);
        *k = m ^ (c << 1);
        if *pos < phrase.len() {
            *pos += 1;
        }
    }
}

/// Encrypt a zero block `count` times and append the 11-character encoding.
fn gen_hash(ctx: &DesCtx, count: u32, cbuf: &mut [u8; 8], text: &mut Vec<u8>) {
    ctx.crypt_block(cbuf, &[0u8; 8], count, false);
    encode_msb_first(ASCII64, cbuf, text);
}

/// Twelve-bit salt from the first two setting characters.
fn two_char_salt(setting: &[u8]) -> Result<u32> {
    let lo = setting.first().and_then(|&c| ascii_to_bin(c)).ok_or(CryptError::Invalid)?;
    let hi = setting.get(1).and_then(|&c| ascii_to_bin(c)).ok_or(CryptError::Invalid)?;
    Ok(lo | (hi << 6))
}

fn push_salt_chars(text: &mut Vec<u8>, salt: u32) {
    text.push(ASCII64[(salt & 0x3f) as usize]);
    text.push(ASCII64[((salt >> 6) & 0x3f) as usize]);
}

fn descrypt(phrase: &[u8], setting: &[u8], out: &mut Output<'_>, scratch: &mut Scratch<'_>) -> Result<()> {
    out.require(DES_TRD_OUTPUT_LEN)?;
    let (keybuf, pkbuf) = des_buffers(scratch)?;
    let salt = two_char_salt(setting)?;

    // Canonical salt, not a copy of the setting: the setting may be shorter
    // than two bytes in principle.
    let mut text = Vec::with_capacity(DES_TRD_OUTPUT_LEN);
    push_salt_chars(&mut text, salt);

    let mut pos = 0;
    load_key_block(keybuf, &[0u8; 8], phrase, &mut pos);
    let mut ctx = DesCtx::new();
    ctx.set_key(keybuf);
    ctx.set_salt(salt);
    gen_hash(&ctx, 25, pkbuf, &mut text);
    out.commit(&text)
}

fn bigcrypt(phrase: &[u8], setting: &[u8], out: &mut Output<'_>, scratch: &mut Scratch<'_>) -> Result<()> {
    // A long phrase with a short setting is plain DES, which truncates.
    if phrase.len() > 8 && setting.len() <= 13 {
        return descrypt(phrase, setting, out, scratch);
    }

    out.require(DES_BIG_OUTPUT_LEN)?;
    let (keybuf, pkbuf) = des_buffers(scratch)?;
    let mut salt = two_char_salt(setting)?;

    let mut text = Vec::with_capacity(DES_BIG_OUTPUT_LEN);
    push_salt_chars(&mut text, salt);

    let mut ctx = DesCtx::new();
    let mut pos = 0;
    for _ in 0..MAX_SEGMENTS {
        let seg_start = text.len();
        load_key_block(keybuf, &[0u8; 8], phrase, &mut pos);
        ctx.set_key(keybuf);
        ctx.set_salt(salt);
        gen_hash(&ctx, 25, pkbuf, &mut text);
        if pos >= phrase.len() {
            break;
        }
        // Next salt is the first two characters of this block's hash.
        salt = ascii_to_bin(text[seg_start]).unwrap_or(0)
            | (ascii_to_bin(text[seg_start + 1]).unwrap_or(0) << 6);
    }
    out.commit(&text)
}

fn bsdicrypt(phrase: &[u8], setting: &[u8], out: &mut Output<'_>, scratch: &mut Scratch<'_>) -> Result<()> {
    out.require(DES_EXT_OUTPUT_LEN)?;
    let (keybuf, pkbuf) = des_buffers(scratch)?;

    if setting.first() != Some(&b'_') || setting.len() < 9 {
        return Err(CryptError::Invalid);
    }

    let mut count = 0u32;
    for (i, &c) in setting[1..5].iter().enumerate() {
        count |= ascii_to_bin(c).ok_or(CryptError::Invalid)? << (i * 6);
    }
    let mut salt = 0u32;
    for (i, &c) in setting[5..9].iter().enumerate() {
        salt |= ascii_to_bin(c).ok_or(CryptError::Invalid)? << (i * 6);
    }

    let mut text = Vec::with_capacity(DES_EXT_OUTPUT_LEN);
    text.extend_from_slice(&setting[..9]);

    // Fold long phrases into one key: each 8-byte block is XORed with the
    // encryption of the previous key under itself, salt zero.
    let mut ctx = DesCtx::new();
    ctx.set_salt(0);
    pkbuf.fill(0);
    let mut pos = 0;
    loop {
        let prev = *pkbuf;
        load_key_block(keybuf, &prev, phrase, &mut pos);
        ctx.set_key(keybuf);
        if pos >= phrase.len() {
            break;
        }
        ctx.crypt_block(pkbuf, keybuf, 1, false);
    }

    ctx.set_salt(salt);
    gen_hash(&ctx, count, pkbuf, &mut text);
    out.commit(&text)
}

/// Traditional DES (`""` prefix). Settings longer than 13 characters select
/// bigcrypt.
pub struct TraditionalDes;

pub static TRADITIONAL_DES: TraditionalDes = TraditionalDes;

impl HashMethod for TraditionalDes {
    fn prefix(&self) -> &'static str {
        ""
    }

    fn name(&self) -> &'static str {
        "descrypt"
    }

    fn random_bytes(&self) -> usize {
        2
    }

    fn is_strong(&self) -> bool {
        false
    }

    fn crypt(&self, phrase: &[u8], setting: &[u8], out: &mut Output<'_>, scratch: &mut Scratch<'_>) -> Result<()> {
        bigcrypt(phrase, setting, out, scratch)
    }

    fn gensalt(&self, count: u64, rbytes: &[u8], out: &mut Output<'_>) -> Result<()> {
        out.require(3)?;
        if rbytes.len() < 2 || count != 0 {
            return Err(CryptError::Invalid);
        }
        let text = [
            ASCII64[usize::from(rbytes[0] & 0x3f)],
            ASCII64[usize::from(rbytes[1] & 0x3f)],
        ];
        out.commit(&text)
    }
}

/// BSDi extended DES: `_` + 24-bit count + 24-bit salt, unlimited phrase.
pub struct BsdiDes;

pub static BSDI_DES: BsdiDes = BsdiDes;

impl HashMethod for BsdiDes {
    fn prefix(&self) -> &'static str {
        "_"
    }

    fn name(&self) -> &'static str {
        "bsdicrypt"
    }

    fn random_bytes(&self) -> usize {
        3
    }

    fn is_strong(&self) -> bool {
        false
    }

    fn crypt(&self, phrase: &[u8], setting: &[u8], out: &mut Output<'_>, scratch: &mut Scratch<'_>) -> Result<()> {
        bsdicrypt(phrase, setting, out, scratch)
    }

    fn gensalt(&self, count: u64, rbytes: &[u8], out: &mut Output<'_>) -> Result<()> {
        out.require(1 + 4 + 4 + 1)?;
        if rbytes.len() < 3 {
            return Err(CryptError::Invalid);
        }
        // Odd counts keep weak DES keys from showing in the hash.
        let count = (match count {
            0 => 725,
            c => c.min(0xff_ffff),
        }) | 1;
        let value = u32::from(rbytes[0]) | (u32::from(rbytes[1]) << 8) | (u32::from(rbytes[2]) << 16);

        let mut text = Vec::with_capacity(9);
        text.push(b'_');
        for shift in [0, 6, 12, 18] {
            text.push(ASCII64[((count >> shift) & 0x3f) as usize]);
        }
        for shift in [0, 6, 12, 18] {
            text.push(ASCII64[((value >> shift) & 0x3f) as usize]);
        }
        out.commit(&text)
    }
}
