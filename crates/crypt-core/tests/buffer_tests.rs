use crypt_core::{
    crypt_checksalt, crypt_r, crypt_ra, crypt_rn, is_failure_token, CryptData, CryptError, SaltCheck,
    CRYPT_DATA_SIZE, CRYPT_MAX_PASSPHRASE_SIZE, CRYPT_OUTPUT_SIZE,
};

#[test]
fn short_buffers_get_what_fits_of_the_token() {
    for (size, expected) in [(1usize, &b""[..]), (2, b"*"), (3, b"*0")] {
        let mut buf = vec![0xffu8; size];
        assert_eq!(crypt_rn("@@", "@@", &mut buf), Err(CryptError::Range));
        let len = buf.iter().position(|&b| b == 0).unwrap();
        assert_eq!(&buf[..len], expected, "size {size}");
    }

    let mut buf = vec![0xffu8; CRYPT_OUTPUT_SIZE];
    assert_eq!(crypt_rn("@@", "*0", &mut buf), Err(CryptError::Range));
    assert_eq!(&buf[..3], b"*1\0");
    assert_eq!(buf[3], 0xff);
}

#[test]
fn empty_buffer_is_untouched() {
    let mut buf: [u8; 0] = [];
    assert_eq!(crypt_rn("@@", "@@", &mut buf), Err(CryptError::Range));
}

#[test]
fn growable_buffer_reports_the_token() {
    let mut buf = vec![0x55u8; 16];
    assert_eq!(crypt_ra("@@", "@@", &mut buf), Err(CryptError::Invalid));
    assert_eq!(buf.len(), CRYPT_DATA_SIZE);
    assert_eq!(&buf[..3], b"*0\0");
}

#[test]
fn failure_tokens_never_match_their_setting() {
    let mut data = CryptData::boxed();
    assert_eq!(crypt_r("x", "*0", &mut data), Err(CryptError::Invalid));
    let token = data.output_str().to_owned();
    assert_eq!(token, "*1");
    assert!(is_failure_token(token.as_bytes()));
    assert_eq!(crypt_checksalt(&token), SaltCheck::Invalid);

    assert_eq!(crypt_r("x", &token, &mut data), Err(CryptError::Invalid));
    assert_eq!(data.output_str(), "*0");
}

#[test]
fn failure_overwrites_an_earlier_hash() {
    let mut data = CryptData::boxed();
    let good = crypt_r("pw", "$1$abcdefgh", &mut data).unwrap().to_owned();
    assert!(!is_failure_token(good.as_bytes()));
    assert!(crypt_r("pw", "$1$abc:efgh", &mut data).is_err());
    assert_eq!(data.output_str(), "*0");
}

#[test]
fn phrase_length_limit() {
    let mut data = CryptData::boxed();
    let longest = "a".repeat(CRYPT_MAX_PASSPHRASE_SIZE - 1);
    assert!(crypt_r(&longest, "$5$salt", &mut data).is_ok());

    let too_long = "a".repeat(CRYPT_MAX_PASSPHRASE_SIZE);
    assert_eq!(crypt_r(&too_long, "$5$salt", &mut data), Err(CryptError::Range));
    assert_eq!(data.output_str(), "*0");
}

