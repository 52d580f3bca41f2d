//! bcrypt, `$2{a,b,x,y}$NN$<22-char salt><31-char hash>`.
//!
//! The four variants differ only in how the key schedule treats bytes with
//! the high bit set: `$2x$` reproduces the old sign-extension bug, `$2a$`
//! applies the countermeasure for phrases the bug would have weakened, and
//! `$2b$` / `$2y$` are correct.

use blowfish::Blowfish;
use zeroize::Zeroize;

use crate::b64::{bcrypt_canonical_tail, decode_bcrypt, encode_msb_first, BCRYPT64};
use crate::error::{CryptError, Result};
use crate::registry::HashMethod;
use crate::scratch::{Output, Scratch};

const BF_N: usize = 16;
const KEY_WORDS: usize = BF_N + 2;
const SALT_CHARS: usize = 22;
const SETTING_LEN: usize = 7 + SALT_CHARS;
const HASH_LEN: usize = SETTING_LEN + 31;
const MIN_COST: u32 = 4;
const MAX_COST: u32 = 31;

// "OrpheanBeholderScryDoubt"
const MAGIC_WORDS: [u32; 6] = [
    0x4f72_7068,
    0x6561_6e42,
    0x6568_6f6c,
    0x6465_7253,
    0x6372_7944,
    0x6f75_6274,
];

const FLAG_BUG: u8 = 1;
const FLAG_SAFETY: u8 = 2;

fn flags_for(subtype: u8) -> Option<u8> {
    match subtype {
        b'a' => Some(FLAG_SAFETY),
        b'b' | b'y' => Some(4),
        b'x' => Some(FLAG_BUG),
        _ => None,
    }
}

struct BcryptSetting {
    flags: u8,
    cost: u32,
    salt: [u8; 16],
}

fn parse_setting(setting: &[u8]) -> Result<BcryptSetting> {
    if setting.len() < SETTING_LEN {
        return Err(CryptError::Invalid);
    }
    if &setting[..2] != b"$2" || setting[3] != b'$' || setting[6] != b'$' {
        return Err(CryptError::Invalid);
    }
    let flags = flags_for(setting[2]).ok_or(CryptError::Invalid)?;
    let (d1, d0) = (setting[4], setting[5]);
    if !d1.is_ascii_digit() || !d0.is_ascii_digit() {
        return Err(CryptError::Invalid);
    }
    let cost = u32::from(d1 - b'0') * 10 + u32::from(d0 - b'0');
    if !(MIN_COST..=MAX_COST).contains(&cost) {
        return Err(CryptError::Invalid);
    }
    let mut salt = [0u8; 16];
    decode_bcrypt(&setting[7..SETTING_LEN], &mut salt).ok_or(CryptError::Invalid)?;
    Ok(BcryptSetting { flags, cost, salt })
}

/// Derive the expanded and initial key words, each serialized big-endian
/// into a 72-byte buffer. The phrase plus its NUL is cycled to fill 18 words.
fn set_key(phrase: &[u8], flags: u8, expanded: &mut [u8], initial: &mut [u8]) {
    let bug = usize::from(flags & FLAG_BUG);
    let safety = u32::from(flags & FLAG_SAFETY) << 15;
    let mut sign = 0u32;
    let mut diff = 0u32;
    let mut pos = 0;

    for i in 0..KEY_WORDS {
        let mut tmp = [0u32; 2];
        for j in 0..4 {
            let c = phrase.get(pos).copied().unwrap_or(0);
            tmp[0] = (tmp[0] << 8) | u32::from(c);
            tmp[1] = (tmp[1] << 8) | (c as i8 as i32 as u32);
            if j != 0 {
                sign |= tmp[1] & 0x80;
            }
            pos = if pos >= phrase.len() { 0 } else { pos + 1 };
        }
        diff |= tmp[0] ^ tmp[1];
        expanded[i * 4..i * 4 + 4].copy_from_slice(&tmp[bug].to_be_bytes());
        initial[i * 4..i * 4 + 4].copy_from_slice(&tmp[bug].to_be_bytes());
    }

    // Bit 16 of diff is set iff any sign extension changed a word; the
    // safety flag then flips a bit of the first initial word.
    diff |= diff >> 16;
    diff &= 0xffff;
    diff += 0xffff;
    sign <<= 9;
    sign &= !diff & safety;

    let first = u32::from_be_bytes([initial[0], initial[1], initial[2], initial[3]]) ^ sign;
    initial[..4].copy_from_slice(&first.to_be_bytes());
}

fn bcrypt_hash(phrase: &[u8], parsed: &BcryptSetting, work: &mut [u8]) -> [u8; 24] {
    let (expanded, rest) = work.split_at_mut(KEY_WORDS * 4);
    let initial = &mut rest[..KEY_WORDS * 4];
    set_key(phrase, parsed.flags, expanded, initial);

    let mut state: Blowfish = Blowfish::bc_init_state();
    state.salted_expand_key(&parsed.salt, initial);
    for _ in 0..1u64 << parsed.cost {
        state.bc_expand_key(expanded);
        state.bc_expand_key(&parsed.salt);
    }

    let mut ctext = MAGIC_WORDS;
    let mut hash = [0u8; 24];
    for (i, pair) in ctext.chunks_exact_mut(2).enumerate() {
        let mut lr = [pair[0], pair[1]];
        for _ in 0..64 {
            lr = state.bc_encrypt(lr);
        }
        hash[i * 8..i * 8 + 4].copy_from_slice(&lr[0].to_be_bytes());
        hash[i * 8 + 4..i * 8 + 8].copy_from_slice(&lr[1].to_be_bytes());
        pair.copy_from_slice(&lr);
        lr.zeroize();
    }
    ctext.zeroize();
    // `state` wipes its S-boxes and P-array when dropped here.
    hash
}

/// One registry entry per subtype letter; hashing is shared.
pub struct Bcrypt {
    prefix: &'static str,
    subtype: u8,
    strong: bool,
}

pub static BCRYPT_B: Bcrypt = Bcrypt { prefix: "$2b$", subtype: b'b', strong: true };
pub static BCRYPT_A: Bcrypt = Bcrypt { prefix: "$2a$", subtype: b'a', strong: true };
pub static BCRYPT_X: Bcrypt = Bcrypt { prefix: "$2x$", subtype: b'x', strong: false };
pub static BCRYPT_Y: Bcrypt = Bcrypt { prefix: "$2y$", subtype: b'y', strong: true };

impl HashMethod for Bcrypt {
    fn prefix(&self) -> &'static str {
        self.prefix
    }

    fn name(&self) -> &'static str {
        match self.subtype {
            b'a' => "bcrypt_a",
            b'x' => "bcrypt_x",
            b'y' => "bcrypt_y",
            _ => "bcrypt",
        }
    }

    fn random_bytes(&self) -> usize {
        16
    }

    fn is_strong(&self) -> bool {
        self.strong
    }

    fn crypt(&self, phrase: &[u8], setting: &[u8], out: &mut Output<'_>, scratch: &mut Scratch<'_>) -> Result<()> {
        out.require(HASH_LEN + 1)?;
        let work = scratch.claim(2 * KEY_WORDS * 4)?;
        let parsed = parse_setting(setting)?;

        let hash = bcrypt_hash(phrase, &parsed, work);

        let mut text = Vec::with_capacity(HASH_LEN);
        text.extend_from_slice(&setting[..SETTING_LEN - 1]);
        let tail = bcrypt_canonical_tail(setting[SETTING_LEN - 1]).ok_or(CryptError::Invalid)?;
        text.push(tail);
        encode_msb_first(BCRYPT64, &hash[..23], &mut text);
        out.commit(&text)
    }

    fn gensalt(&self, count: u64, rbytes: &[u8], out: &mut Output<'_>) -> Result<()> {
        out.require(SETTING_LEN + 1)?;
        let cost = match count {
            0 => 5,
            c if (u64::from(MIN_COST)..=u64::from(MAX_COST)).contains(&c) => c,
            _ => return Err(CryptError::Invalid),
        };
        // $2x$ exists for verifying old hashes only.
        if rbytes.len() < 16 || self.subtype == b'x' {
            return Err(CryptError::Invalid);
        }

        let mut text = format!("$2{}${:02}$", char::from(self.subtype), cost).into_bytes();
        encode_msb_first(BCRYPT64, &rbytes[..16], &mut text);
        out.commit(&text)
    }
}
