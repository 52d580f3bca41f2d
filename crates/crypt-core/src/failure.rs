//! Failure tokens.
//!
//! Every entry point writes a token into the output buffer before anything
//! else runs. A successful hash overwrites it; on any failure it stays, so a
//! caller that compares the output against a stored hash sees a mismatch.

/// Write the failure token for `setting` into `output`.
///
/// The token is `*0`, or `*1` when the setting itself starts with `*0`, so
/// the token never equals the setting. Shorter buffers receive `*` or the
/// empty string.
pub fn make_failure_token(setting: &[u8], output: &mut [u8]) {
    match output.len() {
        0 => {}
        1 => output[0] = 0,
        2 => {
            output[0] = b'*';
            output[1] = 0;
        }
        _ => {
            output[0] = b'*';
            output[1] = if setting.starts_with(b"*0") { b'1' } else { b'0' };
            output[2] = 0;
        }
    }
}

/// True when `output` (NUL-terminated) holds a failure token rather than a
/// hash.
pub fn is_failure_token(output: &[u8]) -> bool {
    matches!(output.first(), Some(b'*') | Some(0) | None)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn token_avoids_setting() {
        let mut out = [0xffu8; 8];
        make_failure_token(b"$1$abc", &mut out);
        assert_eq!(&out[..3], b"*0\0");
        make_failure_token(b"*0", &mut out);
        assert_eq!(&out[..3], b"*1\0");
        make_failure_token(b"*1", &mut out);
        assert_eq!(&out[..3], b"*0\0");
    }

    #[test]
    fn token_shrinks_with_buffer() {
        let mut two = [0xffu8; 2];
        make_failure_token(b"xx", &mut two);
        assert_eq!(&two, b"*\0");

        let mut one = [0xffu8; 1];
        make_failure_token(b"xx", &mut one);
        assert_eq!(&one, b"\0");

        let mut none: [u8; 0] = [];
        make_failure_token(b"xx", &mut none);
    }

    #[test]
    fn only_first_three_bytes_touched() {
        let mut out = [b'Z'; 6];
        make_failure_token(b"", &mut out);
        assert_eq!(&out, b"*0\0ZZZ");
        assert!(is_failure_token(&out));
        assert!(!is_failure_token(b"$1$x"));
    }
}
