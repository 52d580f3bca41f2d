//! Parameter and salt encodings of the `$y$` setting.
//!
//! Parameters use a variable-length code over the crypt alphabet: the first
//! character selects a range (48 one-character values, then progressively
//! fewer lead characters for two- to six-character values) and the
//! remaining characters carry six bits each, most significant first. Salt
//! and hash bytes are little-endian groups of three bytes per four
//! characters.

use crate::b64::{ascii_to_bin, ASCII64};

/// Decode one parameter with offset `min`. Returns the value and the
/// number of characters consumed, or `None` on a character outside the
/// alphabet or when `src` ends early.
pub(crate) fn decode_u32(src: &[u8], min: u32) -> Option<(u32, usize)> {
    let mut chars = src.iter().map(|&c| ascii_to_bin(c));
    let mut c = chars.next()??;

    let (mut start, mut end, mut count, mut bits) = (0u32, 47u32, 1usize, 0u32);
    let mut value = min;
    while c > end {
        value = value.wrapping_add((end + 1 - start) << bits);
        start = end + 1;
        end = start + (62 - end) / 2;
        count += 1;
        bits += 6;
    }
    value = value.wrapping_add((c - start) << bits);

    for _ in 1..count {
        c = chars.next()??;
        bits -= 6;
        value = value.wrapping_add(c << bits);
    }
    Some((value, count))
}

/// Append `value` in the parameter code. Fails when `value < min` or the
/// value needs more than six characters.
pub(crate) fn encode_u32(text: &mut Vec<u8>, value: u32, min: u32) -> Option<()> {
    let mut src = value.checked_sub(min)?;
    let (mut start, mut end, mut count, mut bits) = (0u32, 47u32, 1usize, 0u32);
    loop {
        let span = (end + 1 - start) << bits;
        if src < span {
            break;
        }
        if start >= 63 {
            return None;
        }
        start = end + 1;
        end = start + (62 - end) / 2;
        src -= span;
        count += 1;
        bits += 6;
    }

    text.push(ASCII64[(start + (src >> bits)) as usize]);
    for _ in 1..count {
        bits -= 6;
        text.push(ASCII64[((src >> bits) & 0x3f) as usize]);
    }
    Some(())
}

/// Decode a salt or hash string. Every character must be consumed, each
/// group must carry at least one whole byte, and the unused high bits of a
/// short final group must be zero. Fails when the result exceeds `max`.
pub(crate) fn decode64(src: &[u8], max: usize) -> Option<Vec<u8>> {
    let mut out = Vec::with_capacity(src.len() * 3 / 4);
    for group in src.chunks(4) {
        let mut value = 0u32;
        let mut bits = 0;
        for &ch in group {
            value |= ascii_to_bin(ch)? << bits;
            bits += 6;
        }
        if bits < 12 {
            return None;
        }
        while bits >= 8 {
            out.push(value as u8);
            value >>= 8;
            bits -= 8;
        }
        if value != 0 || out.len() > max {
            return None;
        }
    }
    Some(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::b64::encode_lsb_first;

    #[test]
    fn default_parameters() {
        // flavor 47, log2(N) 12, r 32
        assert_eq!(decode_u32(b"j9T", 0), Some((47, 1)));
        assert_eq!(decode_u32(b"9T", 1), Some((12, 1)));
        assert_eq!(decode_u32(b"T$", 1), Some((32, 1)));

        let mut text = Vec::new();
        encode_u32(&mut text, 47, 0).unwrap();
        encode_u32(&mut text, 12, 1).unwrap();
        encode_u32(&mut text, 32, 1).unwrap();
        assert_eq!(text, b"j9T");
    }

    #[test]
    fn multi_character_values() {
        for value in [48u32, 49, 500, 4095, 70_000, 1 << 24, 0x3fff_ffff] {
            let mut text = Vec::new();
            encode_u32(&mut text, value, 0).unwrap();
            assert!(text.len() > 1);
            assert_eq!(decode_u32(&text, 0), Some((value, text.len())), "{value}");
        }
        assert_eq!(decode_u32(b"x", 0), None);
        assert_eq!(decode_u32(b"", 0), None);
        assert_eq!(decode_u32(b"$", 0), None);
    }

    #[test]
    fn encode_refuses_values_below_minimum() {
        let mut text = Vec::new();
        assert_eq!(encode_u32(&mut text, 1, 2), None);
        assert_eq!(encode_u32(&mut text, 0, 1), None);
        assert!(text.is_empty());
    }

    #[test]
    fn salt_decoding_rules() {
        let rb = hex::decode("5835cd2603ab2c1492131e59b0bcfed5").unwrap();
        let mut text = Vec::new();
        encode_lsb_first(&rb, &mut text);
        assert_eq!(text, b"MJHnaAkegEVYHsFKkmfzJ1");
        assert_eq!(decode64(&text, 64).unwrap(), rb);

        assert_eq!(decode64(b"", 64), Some(Vec::new()));
        // one character cannot hold a byte
        assert_eq!(decode64(b"MJHnM", 64), None);
        // 'z' leaves nonzero bits above the final byte
        assert_eq!(decode64(b"MJHn.z", 64), None);
        assert_eq!(decode64(b"MJHn.1", 64).map(|v| v.len()), Some(4));
        assert_eq!(decode64(b"MJH$", 64), None);
        assert_eq!(decode64(b"MJHnaAkegEVYHsFKkmfzJ1", 15), None);
    }
}
