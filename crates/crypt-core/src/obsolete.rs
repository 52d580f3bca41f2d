//! The historical `setkey` / `encrypt` DES interface.
//!
//! Keys and blocks travel as 64 bytes holding one bit each (only the low bit
//! of every byte is read), most significant bit first. Plain DES with a zero
//! salt; do not use this for anything new.

use std::cell::RefCell;

use zeroize::Zeroizing;

use crate::api::CryptData;
use crate::des::{DesCtx, DES_CTX_SIZE};

fn pack_bits(bytes: &[u8; 64]) -> [u8; 8] {
    let mut packed = [0u8; 8];
    for (byte, bits) in packed.iter_mut().zip(bytes.chunks_exact(8)) {
        *byte = bits.iter().fold(0, |acc, &b| (acc << 1) | (b & 1));
    }
    packed
}

fn unpack_bits(bytes: &mut [u8; 64], packed: &[u8; 8]) {
    for (bits, &byte) in bytes.chunks_exact_mut(8).zip(packed) {
        for (j, bit) in bits.iter_mut().enumerate() {
            *bit = (byte >> (7 - j)) & 1;
        }
    }
}

/// Install `key` as the DES key for later [`encrypt_r`] calls on `data`.
///
/// The schedule lives in `data.internal`, so any hashing call on the same
/// `data` discards it.
pub fn setkey_r(key: &[u8; 64], data: &mut CryptData) {
    let packed = Zeroizing::new(pack_bits(key));
    let mut ctx = DesCtx::new();
    ctx.set_salt(0);
    ctx.set_key(&packed);
    ctx.store(&mut data.internal[..DES_CTX_SIZE]);
}

/// Encrypt (`edflag == 0`) or decrypt `block` in place with the key from
/// [`setkey_r`].
pub fn encrypt_r(block: &mut [u8; 64], edflag: i32, data: &mut CryptData) {
    let ctx = DesCtx::load(&data.internal[..DES_CTX_SIZE]);
    let input = pack_bits(block);
    let mut output = [0u8; 8];
    ctx.crypt_block(&mut output, &input, 1, edflag != 0);
    unpack_bits(block, &output);
}

thread_local! {
    static ENCRYPT_STATE: RefCell<Box<CryptData>> = RefCell::new(CryptData::boxed());
}

/// [`setkey_r`] on per-thread state shared with [`encrypt`].
pub fn setkey(key: &[u8; 64]) {
    ENCRYPT_STATE.with(|state| setkey_r(key, &mut state.borrow_mut()));
}

/// [`encrypt_r`] on per-thread state shared with [`setkey`].
pub fn encrypt(block: &mut [u8; 64], edflag: i32) {
    ENCRYPT_STATE.with(|state| encrypt_r(block, edflag, &mut state.borrow_mut()));
}

#[cfg(test)]
mod tests {
    use super::*;

    fn expand(packed: [u8; 8]) -> [u8; 64] {
        let mut bits = [0u8; 64];
        unpack_bits(&mut bits, &packed);
        bits
    }

    #[test]
    fn bit_packing_reads_low_bit_only() {
        let mut bytes = expand([0xa5, 0, 0xff, 1, 2, 3, 4, 0x80]);
        assert_eq!(pack_bits(&bytes), [0xa5, 0, 0xff, 1, 2, 3, 4, 0x80]);
        for b in bytes.iter_mut() {
            *b |= 0xfe;
        }
        assert_eq!(pack_bits(&bytes), [0xa5, 0, 0xff, 1, 2, 3, 4, 0x80]);
    }

    #[test]
    fn reentrant_round_trip() {
        let mut data = CryptData::boxed();
        setkey_r(&expand(*b"\x01\x23\x45\x67\x89\xab\xcd\xef"), &mut data);
        let plain = expand(*b"Now is t");
        let mut block = plain;
        encrypt_r(&mut block, 0, &mut data);
        assert_eq!(pack_bits(&block), [0x3f, 0xa4, 0x0e, 0x8a, 0x98, 0x4d, 0x48, 0x15]);
        encrypt_r(&mut block, 1, &mut data);
        assert_eq!(block, plain);
    }

    #[test]
    fn thread_local_variant() {
        setkey(&expand([0xff; 8]));
        let mut block = expand([0xff; 8]);
        encrypt(&mut block, 0);
        assert_eq!(pack_bits(&block), [0x73, 0x59, 0xb2, 0x16, 0x3e, 0x4e, 0xdc, 0x58]);
        encrypt(&mut block, 7);
        assert_eq!(block, expand([0xff; 8]));
    }
}
