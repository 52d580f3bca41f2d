//! SM3 crypt, `$sm3$`: the SHA-256 crypt construction with SM3 as the
//! digest. The salt field ends at the first `$`, `:` or newline rather than
//! at the first character outside the crypt alphabet.

use sm3::Sm3;

use super::sha2crypt::{encode_sha256, gensalt_params, sha_crypt, ShaScheme};
use crate::error::Result;
use crate::registry::HashMethod;
use crate::scratch::{Output, Scratch};

fn salt_end(field: &[u8]) -> usize {
    field
        .iter()
        .position(|&c| matches!(c, b'$' | b':' | b'\n'))
        .unwrap_or(field.len())
}

const SM3_SCHEME: ShaScheme = ShaScheme {
    prefix: b"$sm3$",
    digest_chars: 43,
    encode: encode_sha256,
    salt_end,
};

pub struct Sm3Crypt;

pub static SM3_CRYPT: Sm3Crypt = Sm3Crypt;

impl HashMethod for Sm3Crypt {
    fn prefix(&self) -> &'static str {
        "$sm3$"
    }

    fn name(&self) -> &'static str {
        "sm3crypt"
    }

    fn random_bytes(&self) -> usize {
        15
    }

    fn is_strong(&self) -> bool {
        false
    }

    fn crypt(&self, phrase: &[u8], setting: &[u8], out: &mut Output<'_>, scratch: &mut Scratch<'_>) -> Result<()> {
        sha_crypt::<Sm3>(&SM3_SCHEME, phrase, setting, out, scratch)
    }

    fn gensalt(&self, count: u64, rbytes: &[u8], out: &mut Output<'_>) -> Result<()> {
        gensalt_params("sm3").generate(count, rbytes, out)
    }
}
