//! The yescrypt key derivation function.
//!
//! With no flags this is classic scrypt. In the read-write mode each lane
//! also fills a 12 KiB S-box and block mixing switches from Salsa20/8 to
//! pwxform rounds followed by Salsa20/2, and the second mixing loop writes
//! back into V.
//!
//! Blocks are held as words in the order the Salsa20 core shuffles them
//! into, so V and the S-boxes carry the same layout as every other
//! implementation of the algorithm.

use hmac::{Hmac, Mac};
use pbkdf2::pbkdf2_hmac;
use sha2::{Digest, Sha256};
use tracing::debug;
use zeroize::Zeroizing;

use crate::error::{CryptError, Result};

pub(crate) const WORM: u32 = 1;
pub(crate) const RW: u32 = 2;
const MODE_MASK: u32 = 3;
pub(crate) const RW_FLAVOR_MASK: u32 = 0x3fc;
// 6 pwxform rounds, 4-way gather, 2-way simple, 12 KiB S-box
const RW_FLAVOR: u32 = 0x004 | 0x010 | 0x020 | 0x080;
pub(crate) const DEFAULTS: u32 = RW | RW_FLAVOR;
const PREHASH: u32 = 0x1000_0000;

const PWX_SIMPLE: usize = 2;
const PWX_GATHER: usize = 4;
const PWX_ROUNDS: usize = 6;
const SWIDTH: usize = 8;
const PWX_WORDS: usize = PWX_GATHER * PWX_SIMPLE * 2;
const S_ENTRIES: usize = (1 << SWIDTH) * PWX_SIMPLE;
const S_WORDS: usize = 3 * S_ENTRIES * 2;
const S_BLOCKS: usize = S_WORDS * 4 / 128;
const SMASK: u32 = (((1 << SWIDTH) - 1) * PWX_SIMPLE * 8) as u32;

const MAX_MEMORY: u64 = 1 << 30;

/// Cost parameters decoded from a `$y$` setting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Params {
    pub flags: u32,
    pub n: u64,
    pub r: u32,
    pub p: u32,
    pub t: u32,
    pub g: u32,
    pub nrom: u64,
}

impl Params {
    pub fn new(flags: u32, n: u64, r: u32) -> Self {
        Self {
            flags,
            n,
            r,
            p: 1,
            t: 0,
            g: 0,
            nrom: 0,
        }
    }
}

fn hmac_sha256(key: &[u8], msg: &[u8]) -> Result<Zeroizing<[u8; 32]>> {
    let mut mac = <Hmac<Sha256> as Mac>::new_from_slice(key).map_err(|_| CryptError::Invalid)?;
    mac.update(msg);
    let mut tag = Zeroizing::new([0u8; 32]);
    tag.copy_from_slice(&mac.finalize().into_bytes());
    Ok(tag)
}

fn xor(dst: &mut [u32], src: &[u32]) {
    for (d, s) in dst.iter_mut().zip(src) {
        *d ^= s;
    }
}

/// Salsa20 core over a shuffled block, feed-forward included.
fn salsa20(b: &mut [u32], rounds: usize) {
    let mut x = [0u32; 16];
    for (i, &w) in b.iter().enumerate().take(16) {
        x[i * 5 % 16] = w;
    }

    fn quarter(x: &mut [u32; 16], a: usize, b: usize, c: usize, d: usize) {
        x[b] ^= x[a].wrapping_add(x[d]).rotate_left(7);
        x[c] ^= x[b].wrapping_add(x[a]).rotate_left(9);
        x[d] ^= x[c].wrapping_add(x[b]).rotate_left(13);
        x[a] ^= x[d].wrapping_add(x[c]).rotate_left(18);
    }

    for _ in (0..rounds).step_by(2) {
        quarter(&mut x, 0, 4, 8, 12);
        quarter(&mut x, 5, 9, 13, 1);
        quarter(&mut x, 10, 14, 2, 6);
        quarter(&mut x, 15, 3, 7, 11);

        quarter(&mut x, 0, 1, 2, 3);
        quarter(&mut x, 5, 6, 7, 4);
        quarter(&mut x, 10, 11, 8, 9);
        quarter(&mut x, 15, 12, 13, 14);
    }

    for (i, w) in b.iter_mut().enumerate().take(16) {
        *w = w.wrapping_add(x[i * 5 % 16]);
    }
}

fn blockmix_salsa8(b: &mut [u32], y: &mut [u32], r: usize) {
    let mut x = [0u32; 16];
    x.copy_from_slice(&b[(2 * r - 1) * 16..2 * r * 16]);
    for i in 0..2 * r {
        xor(&mut x, &b[i * 16..(i + 1) * 16]);
        salsa20(&mut x, 8);
        y[i * 16..(i + 1) * 16].copy_from_slice(&x);
    }
    for i in 0..r {
        b[i * 16..(i + 1) * 16].copy_from_slice(&y[2 * i * 16..(2 * i + 1) * 16]);
        b[(i + r) * 16..(i + r + 1) * 16].copy_from_slice(&y[(2 * i + 1) * 16..(2 * i + 2) * 16]);
    }
}

/// One lane's S-box: three rotating regions of 512 two-word entries and the
/// write cursor into the current S2.
struct SBoxes<'a> {
    s: &'a mut [u32],
    s0: usize,
    s1: usize,
    s2: usize,
    w: usize,
}

impl<'a> SBoxes<'a> {
    fn new(s: &'a mut [u32]) -> Self {
        Self { s, s0: 0, s1: 0, s2: 0, w: 0 }
    }

    fn reset(&mut self) {
        self.s2 = 0;
        self.s1 = S_ENTRIES * 2;
        self.s0 = S_ENTRIES * 4;
        self.w = 0;
    }

    fn entry(&self, at: usize) -> u64 {
        u64::from(self.s[at]) | (u64::from(self.s[at + 1]) << 32)
    }
}

fn pwxform(x: &mut [u32; PWX_WORDS], sbox: &mut SBoxes<'_>) {
    let (s0, s1, s2) = (sbox.s0, sbox.s1, sbox.s2);
    let mut w = sbox.w;

    for round in 0..PWX_ROUNDS {
        for j in 0..PWX_GATHER {
            let lane = j * PWX_SIMPLE * 2;
            let p0 = s0 + (x[lane] & SMASK) as usize / 4;
            let p1 = s1 + (x[lane + 1] & SMASK) as usize / 4;

            for k in 0..PWX_SIMPLE {
                let at = lane + 2 * k;
                let product = u64::from(x[at + 1]) * u64::from(x[at]);
                let v = product.wrapping_add(sbox.entry(p0 + 2 * k)) ^ sbox.entry(p1 + 2 * k);
                x[at] = v as u32;
                x[at + 1] = (v >> 32) as u32;
            }

            if round != 0 && round != PWX_ROUNDS - 1 {
                for k in 0..PWX_SIMPLE {
                    let at = lane + 2 * k;
                    sbox.s[s2 + 2 * w] = x[at];
                    sbox.s[s2 + 2 * w + 1] = x[at + 1];
                    w += 1;
                }
            }
        }
    }

    sbox.s0 = s2;
    sbox.s1 = s0;
    sbox.s2 = s1;
    sbox.w = w & (S_ENTRIES - 1);
}

fn blockmix_pwxform(b: &mut [u32], r: usize, sbox: &mut SBoxes<'_>) {
    let r1 = 2 * r;
    let mut x = [0u32; PWX_WORDS];
    x.copy_from_slice(&b[(r1 - 1) * PWX_WORDS..r1 * PWX_WORDS]);
    for i in 0..r1 {
        let block = &mut b[i * PWX_WORDS..(i + 1) * PWX_WORDS];
        if r1 > 1 {
            xor(&mut x, block);
        }
        pwxform(&mut x, sbox);
        block.copy_from_slice(&x);
    }
    // A pwxform block is 64 bytes, so only the last Salsa20 block is left.
    salsa20(&mut b[(r1 - 1) * 16..r1 * 16], 2);
}

fn mix(x: &mut [u32], y: &mut [u32], r: usize, sbox: Option<&mut SBoxes<'_>>) {
    match sbox {
        Some(sbox) => blockmix_pwxform(x, r, sbox),
        None => blockmix_salsa8(x, y, r),
    }
}

fn integerify(x: &[u32], r: usize) -> u64 {
    let last = &x[(2 * r - 1) * 16..];
    (u64::from(last[13]) << 32) + u64::from(last[0])
}

fn p2floor(mut x: u64) -> u64 {
    while x & (x - 1) != 0 {
        x &= x - 1;
    }
    x
}

fn wrap(x: u64, i: u64) -> u64 {
    let n = p2floor(i);
    (x & (n - 1)) + (i - n)
}

fn load(b: &[u8], x: &mut [u32], r: usize) {
    for k in 0..2 * r {
        for i in 0..16 {
            let at = (k * 16 + i * 5 % 16) * 4;
            x[k * 16 + i] = u32::from_le_bytes([b[at], b[at + 1], b[at + 2], b[at + 3]]);
        }
    }
}

fn store(x: &[u32], b: &mut [u8], r: usize) {
    for k in 0..2 * r {
        for i in 0..16 {
            let at = (k * 16 + i * 5 % 16) * 4;
            b[at..at + 4].copy_from_slice(&x[k * 16 + i].to_le_bytes());
        }
    }
}

/// Fill `v` with `n` successive states of `b`.
fn smix1(b: &mut [u8], r: usize, n: usize, flags: u32, v: &mut [u32], xy: &mut [u32], mut sbox: Option<&mut SBoxes<'_>>) {
    let s = 32 * r;
    let (x, y) = xy.split_at_mut(s);
    load(b, x, r);
    for i in 0..n {
        v[i * s..(i + 1) * s].copy_from_slice(x);
        if flags & RW != 0 && i > 1 {
            let j = wrap(integerify(x, r), i as u64) as usize;
            xor(x, &v[j * s..(j + 1) * s]);
        }
        mix(x, y, r, sbox.as_deref_mut());
    }
    store(x, b, r);
}

/// `nloop` data-dependent reads of `v`, written back in read-write mode.
#[allow(clippy::too_many_arguments)]
fn smix2(
    b: &mut [u8],
    r: usize,
    n: usize,
    nloop: usize,
    flags: u32,
    v: &mut [u32],
    xy: &mut [u32],
    mut sbox: Option<&mut SBoxes<'_>>,
) {
    if nloop == 0 {
        return;
    }
    let s = 32 * r;
    let (x, y) = xy.split_at_mut(s);
    load(b, x, r);
    for _ in 0..nloop {
        let j = (integerify(x, r) & (n as u64 - 1)) as usize;
        xor(x, &v[j * s..(j + 1) * s]);
        if flags & RW != 0 {
            v[j * s..(j + 1) * s].copy_from_slice(x);
        }
        mix(x, y, r, sbox.as_deref_mut());
    }
    store(x, b, r);
}

#[allow(clippy::too_many_arguments)]
fn smix(
    b: &mut [u8],
    r: usize,
    n: usize,
    p: usize,
    t: u32,
    flags: u32,
    v: &mut [u32],
    xy: &mut [u32],
    lanes: &mut [SBoxes<'_>],
    passwd: &mut [u8; 32],
) -> Result<()> {
    let s = 32 * r;
    let lane_bytes = 128 * r;

    let mut nchunk = n / p;
    let mut nloop_all = nchunk;
    if flags & RW != 0 {
        if t <= 1 {
            if t != 0 {
                nloop_all *= 2;
            }
            nloop_all = (nloop_all + 2) / 3;
        } else {
            nloop_all *= (t - 1) as usize;
        }
    } else if t != 0 {
        if t == 1 {
            nloop_all += (nloop_all + 1) / 2;
        }
        nloop_all *= t as usize;
    }
    let mut nloop_rw = if flags & RW != 0 { nloop_all / p } else { 0 };

    nchunk &= !1;
    nloop_all = (nloop_all + 1) & !1;
    nloop_rw = (nloop_rw + 1) & !1;

    let mut vchunk = 0;
    for i in 0..p {
        let np = if i < p - 1 { nchunk } else { n - vchunk };
        let bp = &mut b[i * lane_bytes..(i + 1) * lane_bytes];
        let vp = &mut v[vchunk * s..(vchunk + np) * s];

        let mut sbox = None;
        if flags & RW != 0 {
            let lane = &mut lanes[i];
            smix1(&mut bp[..128], 1, S_BLOCKS, 0, &mut *lane.s, xy, None);
            lane.reset();
            if i == 0 {
                let mac = hmac_sha256(&bp[lane_bytes - 64..], &passwd[..])?;
                passwd.copy_from_slice(&mac[..]);
            }
            sbox = Some(lane);
        }

        smix1(bp, r, np, flags, vp, xy, sbox.as_deref_mut());
        smix2(bp, r, p2floor(np as u64) as usize, nloop_rw, flags, vp, xy, sbox);
        vchunk += nchunk;
    }

    for i in 0..p {
        let bp = &mut b[i * lane_bytes..(i + 1) * lane_bytes];
        let sbox = if flags & RW != 0 { Some(&mut lanes[i]) } else { None };
        smix2(bp, r, n, nloop_all - nloop_rw, flags & !RW, v, xy, sbox);
    }
    Ok(())
}

fn zeroed_words(len: usize) -> Result<Zeroizing<Vec<u32>>> {
    let mut v = Vec::new();
    v.try_reserve_exact(len).map_err(|_| CryptError::NoMemory)?;
    v.resize(len, 0);
    Ok(Zeroizing::new(v))
}

fn kdf_body(passwd: &[u8], salt: &[u8], flags: u32, params: &Params, out: &mut [u8; 32]) -> Result<()> {
    let Params { n, r, p, t, .. } = *params;

    let mode_ok = match flags & MODE_MASK {
        0 => flags == 0 && t == 0,
        WORM => flags == WORM,
        RW => flags & !PREHASH == DEFAULTS,
        _ => false,
    };
    if !mode_ok
        || n < 2
        || !n.is_power_of_two()
        || r == 0
        || p == 0
        || u64::from(r) * u64::from(p) >= 1 << 30
        || (flags & RW != 0 && n / u64::from(p) <= 1)
    {
        return Err(CryptError::Invalid);
    }

    let v_bytes = n.checked_mul(128 * u64::from(r)).unwrap_or(u64::MAX);
    let b_bytes = 128 * u64::from(r) * u64::from(p);
    if v_bytes > MAX_MEMORY || b_bytes > MAX_MEMORY {
        debug!(n, r, p, "yescrypt parameters exceed memory limit");
        return Err(CryptError::NoMemory);
    }
    let (n, r, p) = (n as usize, r as usize, p as usize);

    let mut v = zeroed_words(v_bytes as usize / 4)?;
    let mut xy = zeroed_words(64 * r)?;
    let mut s_mem = zeroed_words(if flags & RW != 0 { p * S_WORDS } else { 0 })?;
    let mut b = Zeroizing::new(vec![0u8; 128 * r * p]);

    let prehashed;
    let pbkdf_pass: &[u8] = if flags != 0 {
        let label: &[u8] = if flags & PREHASH != 0 { b"yescrypt-prehash" } else { b"yescrypt" };
        prehashed = hmac_sha256(label, passwd)?;
        &prehashed[..]
    } else {
        passwd
    };
    pbkdf2_hmac::<Sha256>(pbkdf_pass, salt, 1, &mut b);

    let mut state = Zeroizing::new([0u8; 32]);
    if flags != 0 {
        state.copy_from_slice(&b[..32]);
    }

    if flags & RW != 0 {
        let mut lanes: Vec<SBoxes<'_>> = s_mem.chunks_mut(S_WORDS).map(SBoxes::new).collect();
        smix(&mut b, r, n, p, t, flags, &mut v, &mut xy, &mut lanes, &mut state)?;
    } else {
        for lane in b.chunks_mut(128 * r) {
            smix(lane, r, n, 1, t, flags, &mut v, &mut xy, &mut [], &mut state)?;
        }
    }

    let final_pass: &[u8] = if flags != 0 { &state[..] } else { passwd };
    pbkdf2_hmac::<Sha256>(final_pass, &b, 1, out);

    if flags != 0 && flags & PREHASH == 0 {
        let client_key = hmac_sha256(&out[..], b"Client Key")?;
        out.copy_from_slice(&Sha256::digest(&client_key[..]));
    }
    Ok(())
}

/// Derive the 32-byte yescrypt hash of `passwd` under `salt`.
pub(crate) fn yescrypt(passwd: &[u8], salt: &[u8], params: &Params, out: &mut [u8; 32]) -> Result<()> {
    if params.g != 0 || params.nrom != 0 {
        return Err(CryptError::Invalid);
    }

    let Params { flags, n, r, p, .. } = *params;
    let per_lane = if p >= 1 { n / u64::from(p) } else { 0 };
    if flags & RW != 0 && p >= 1 && per_lane >= 0x100 && per_lane.saturating_mul(u64::from(r)) >= 0x20000 {
        let mut dk = Zeroizing::new([0u8; 32]);
        let pre = Params {
            n: n >> 6,
            t: 0,
            ..*params
        };
        kdf_body(passwd, salt, flags | PREHASH, &pre, &mut dk)?;
        return kdf_body(&dk[..], salt, flags, params, out);
    }
    kdf_body(passwd, salt, flags, params, out)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn derive(passwd: &[u8], salt: &[u8], params: Params) -> Result<[u8; 32]> {
        let mut out = [0u8; 32];
        yescrypt(passwd, salt, &params, &mut out)?;
        Ok(out)
    }

    #[test]
    fn without_flags_is_scrypt() {
        for (passwd, salt, log_n, r, p) in [
            (&b""[..], &b""[..], 4u8, 1u32, 1u32),
            (b"password", b"NaCl", 10, 8, 16),
        ] {
            let params = Params {
                p,
                ..Params::new(0, 1 << log_n, r)
            };
            let mut expected = [0u8; 32];
            let sp = scrypt::Params::new(log_n, r, p, 32).unwrap();
            scrypt::scrypt(passwd, salt, &sp, &mut expected).unwrap();
            assert_eq!(derive(passwd, salt, params).unwrap(), expected);
        }
    }

    #[test]
    fn scrypt_reference_vector() {
        let params = Params::new(0, 16, 1);
        let out = derive(b"", b"", params).unwrap();
        assert_eq!(
            hex::encode(out),
            "77d6576238657b203b19ca42c18a0497f16b4844e3074ae8dfdffa3fede21442"
        );
    }

    #[test]
    fn modes_are_distinct() {
        let rw = derive(b"x", b"salt", Params::new(DEFAULTS, 64, 1)).unwrap();
        let worm = derive(b"x", b"salt", Params::new(WORM, 64, 1)).unwrap();
        let classic = derive(b"x", b"salt", Params::new(0, 64, 1)).unwrap();
        assert_ne!(rw, worm);
        assert_ne!(worm, classic);
        assert_eq!(rw, derive(b"x", b"salt", Params::new(DEFAULTS, 64, 1)).unwrap());
    }

    #[test]
    fn parameter_checks() {
        let bad = [
            Params::new(DEFAULTS ^ 0x004, 64, 1),
            Params::new(WORM | RW, 64, 1),
            Params::new(DEFAULTS, 1, 1),
            Params::new(DEFAULTS, 48, 1),
            Params::new(DEFAULTS, 64, 0),
            Params { t: 1, ..Params::new(0, 64, 1) },
            Params { g: 1, ..Params::new(DEFAULTS, 64, 1) },
            Params { nrom: 1 << 10, ..Params::new(DEFAULTS, 64, 1) },
            Params { p: 64, ..Params::new(DEFAULTS, 64, 1) },
        ];
        for params in bad {
            assert_eq!(derive(b"x", b"s", params), Err(CryptError::Invalid), "{params:?}");
        }
        assert_eq!(derive(b"x", b"s", Params::new(DEFAULTS, 1 << 40, 8)), Err(CryptError::NoMemory));
    }

    #[test]
    fn wrap_stays_below_index() {
        for i in 2u64..300 {
            for x in [0u64, 1, 0xdead_beef, u64::MAX] {
                assert!(wrap(x, i) < i);
            }
        }
        assert_eq!(p2floor(96), 64);
        assert_eq!(p2floor(64), 64);
    }
}
