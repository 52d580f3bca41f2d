//! The crypt(3) base-64 alphabets and their encoders.
//!
//! Two alphabets are in use: the traditional `./0-9A-Za-z` ordering shared by
//! almost every scheme, and bcrypt's `./A-Za-z0-9`. Neither is the RFC 4648
//! alphabet, so the `base64` crate only serves argon2.

pub const ASCII64: &[u8; 64] =
    b"./0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz";

pub const BCRYPT64: &[u8; 64] =
    b"./ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789";

/// Value of `ch` in the traditional alphabet, or `None` outside it.
pub fn ascii_to_bin(ch: u8) -> Option<u32> {
    match ch {
        b'.'..=b'9' => Some(u32::from(ch - b'.')),
        b'A'..=b'Z' => Some(u32::from(ch - b'A') + 12),
        b'a'..=b'z' => Some(u32::from(ch - b'a') + 38),
        _ => None,
    }
}

pub fn is_ascii64(ch: u8) -> bool {
    ascii_to_bin(ch).is_some()
}

/// Length of the leading run of traditional-alphabet characters (`strspn`).
pub fn span_ascii64(s: &[u8]) -> usize {
    s.iter().take_while(|&&c| is_ascii64(c)).count()
}

/// Emit `n` characters of `v`, least significant six bits first.
pub fn push_to64(out: &mut Vec<u8>, mut v: u32, n: usize) {
    for _ in 0..n {
        out.push(ASCII64[(v & 0x3f) as usize]);
        v >>= 6;
    }
}

/// Emit the 24-bit group `b2:b1:b0` as `n` characters, low bits first.
pub fn push_b64_from_24bit(out: &mut Vec<u8>, b2: u8, b1: u8, b0: u8, n: usize) {
    let w = (u32::from(b2) << 16) | (u32::from(b1) << 8) | u32::from(b0);
    push_to64(out, w, n);
}

/// Encode a byte string in little-endian groups of three bytes, each group
/// written as [`push_to64`] would. Used by scrypt and yescrypt.
pub fn encode_lsb_first(src: &[u8], out: &mut Vec<u8>) {
    for chunk in src.chunks(3) {
        let value = chunk.iter().rev().fold(0u32, |acc, &b| (acc << 8) | u32::from(b));
        push_to64(out, value, (chunk.len() * 8 + 5) / 6);
    }
}

/// Encode a byte string most-significant bit first, three bytes to four
/// characters, with a short final group. Used by DES and bcrypt.
pub fn encode_msb_first(alphabet: &[u8; 64], src: &[u8], out: &mut Vec<u8>) {
    let mut chunks = src.chunks(3);
    for chunk in chunks.by_ref() {
        let c0 = chunk[0];
        out.push(alphabet[usize::from(c0 >> 2)]);
        let mut c1 = (c0 & 0x03) << 4;
        let Some(&n1) = chunk.get(1) else {
            out.push(alphabet[usize::from(c1)]);
            break;
        };
        c1 |= n1 >> 4;
        out.push(alphabet[usize::from(c1)]);
        c1 = (n1 & 0x0f) << 2;
        let Some(&n2) = chunk.get(2) else {
            out.push(alphabet[usize::from(c1)]);
            break;
        };
        c1 |= n2 >> 6;
        out.push(alphabet[usize::from(c1)]);
        out.push(alphabet[usize::from(n2 & 0x3f)]);
    }
}

fn bcrypt_to_bin(ch: u8) -> Option<u8> {
    match ch {
        b'.' => Some(0),
        b'/' => Some(1),
        b'A'..=b'Z' => Some(ch - b'A' + 2),
        b'a'..=b'z' => Some(ch - b'a' + 28),
        b'0'..=b'9' => Some(ch - b'0' + 54),
        _ => None,
    }
}

/// Inverse of [`encode_msb_first`] over the bcrypt alphabet. Fills `dst`
/// completely or fails on the first character outside the alphabet or when
/// `src` runs out.
pub fn decode_bcrypt(src: &[u8], dst: &mut [u8]) -> Option<()> {
    let mut chars = src.iter().map(|&c| bcrypt_to_bin(c));
    let mut next = move || chars.next().flatten();
    let mut i = 0;
    while i < dst.len() {
        let c1 = next()?;
        let c2 = next()?;
        dst[i] = (c1 << 2) | ((c2 & 0x30) >> 4);
        i += 1;
        if i >= dst.len() {
            break;
        }
        let c3 = next()?;
        dst[i] = ((c2 & 0x0f) << 4) | ((c3 & 0x3c) >> 2);
        i += 1;
        if i >= dst.len() {
            break;
        }
        let c4 = next()?;
        dst[i] = ((c3 & 0x03) << 6) | c4;
        i += 1;
    }
    Some(())
}

/// Canonical form of a bcrypt character when only its top two value bits
/// are significant (the last character of a 22-character salt).
pub fn bcrypt_canonical_tail(ch: u8) -> Option<u8> {
    bcrypt_to_bin(ch).map(|v| BCRYPT64[usize::from(v & 0x30)])
}
