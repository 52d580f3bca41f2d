//! Windows NT hash as a crypt scheme: `$3$$` + hex MD4 of the phrase widened
//! to UTF-16LE. There is no salt; anything after `$3$` is ignored.

use md4::{Digest, Md4};

use super::finalize_into;
use crate::api::CRYPT_MAX_PASSPHRASE_SIZE;
use crate::error::{CryptError, Result};
use crate::registry::HashMethod;
use crate::scratch::{Output, Scratch};

const MAGIC: &[u8] = b"$3$";
const MD4_HASHLEN: usize = 16;
const NT_OUTPUT_LEN: usize = MAGIC.len() + 1 + MD4_HASHLEN * 2 + 1;

pub struct NtHash;

pub static NT_HASH: NtHash = NtHash;

impl HashMethod for NtHash {
    fn prefix(&self) -> &'static str {
        "$3$"
    }

    fn name(&self) -> &'static str {
        "nthash"
    }

    fn random_bytes(&self) -> usize {
        16
    }

    fn is_strong(&self) -> bool {
        false
    }

    fn crypt(&self, phrase: &[u8], setting: &[u8], out: &mut Output<'_>, scratch: &mut Scratch<'_>) -> Result<()> {
        out.require(NT_OUTPUT_LEN)?;
        let work = scratch.claim(CRYPT_MAX_PASSPHRASE_SIZE * 2 + MD4_HASHLEN)?;
        if !setting.starts_with(MAGIC) {
            return Err(CryptError::Invalid);
        }
        if phrase.len() > CRYPT_MAX_PASSPHRASE_SIZE {
            return Err(CryptError::Range);
        }
        let (unipw, hash) = work.split_at_mut(CRYPT_MAX_PASSPHRASE_SIZE * 2);

        // Bytes are taken as Latin-1 code points.
        let wide = &mut unipw[..phrase.len() * 2];
        for (pair, &c) in wide.chunks_exact_mut(2).zip(phrase) {
            pair[0] = c;
            pair[1] = 0;
        }
        let mut ctx = Md4::new();
        ctx.update(&*wide);
        finalize_into(ctx, hash);

        let mut text = Vec::with_capacity(NT_OUTPUT_LEN);
        text.extend_from_slice(MAGIC);
        text.push(b'$');
        text.extend_from_slice(hex::encode(&*hash).as_bytes());
        out.commit(&text)
    }

    fn gensalt(&self, count: u64, _rbytes: &[u8], out: &mut Output<'_>) -> Result<()> {
        out.require(MAGIC.len() + 1)?;
        if count != 0 {
            return Err(CryptError::Invalid);
        }
        out.commit(MAGIC)
    }
}
