//! DES block cipher with the crypt(3) salt perturbation.
//!
//! `set_key` derives the sixteen round keys, `set_salt` installs the 24-bit
//! E-box perturbation mask and `crypt_block` runs the cipher. None of these
//! can fail; all inputs are fixed-size arrays.

mod tables;

use zeroize::{Zeroize, ZeroizeOnDrop};

use tables::{
    COMP_MASKL, COMP_MASKR, FP_MASKL, FP_MASKR, IP_MASKL, IP_MASKR, KEY_PERM_MASKL,
    KEY_PERM_MASKR, M_SBOX, PSBOX,
};

const KEY_SHIFTS: [u32; 16] = [1, 1, 2, 2, 2, 2, 2, 2, 1, 2, 2, 2, 2, 2, 2, 1];

/// Serialized size of a [`DesCtx`] (two 16-word key arrays and the salt).
pub const DES_CTX_SIZE: usize = 33 * 4;

/// Key schedule plus salt mask. Erased on drop.
#[derive(Clone, Default, Zeroize, ZeroizeOnDrop)]
pub struct DesCtx {
    keysl: [u32; 16],
    keysr: [u32; 16],
    saltbits: u32,
}

#[inline]
fn idx7(x: u32) -> usize {
    (x & 0x7f) as usize
}

#[inline]
fn idx8(x: u32) -> usize {
    (x & 0xff) as usize
}

impl DesCtx {
    pub fn new() -> Self {
        Self::default()
    }

    /// Derive the round keys from eight key bytes. The low bit of each byte
    /// is parity and is ignored.
    pub fn set_key(&mut self, key: &[u8; 8]) {
        let [k0, k1, k2, k3, k4, k5, k6, k7] = *key;
        let rawkey0 = u32::from_be_bytes([k0, k1, k2, k3]);
        let rawkey1 = u32::from_be_bytes([k4, k5, k6, k7]);

        let k_idx = [
            idx7(rawkey0 >> 25),
            idx7(rawkey0 >> 17),
            idx7(rawkey0 >> 9),
            idx7(rawkey0 >> 1),
            idx7(rawkey1 >> 25),
            idx7(rawkey1 >> 17),
            idx7(rawkey1 >> 9),
            idx7(rawkey1 >> 1),
        ];
        let mut k0 = 0u32;
        let mut k1 = 0u32;
        for (t, &i) in k_idx.iter().enumerate() {
            k0 |= KEY_PERM_MASKL[t][i];
            k1 |= KEY_PERM_MASKR[t][i];
        }

        let mut shifts = 0;
        for round in 0..16 {
            shifts += KEY_SHIFTS[round];
            let t0 = (k0 << shifts) | (k0 >> (28 - shifts));
            let t1 = (k1 << shifts) | (k1 >> (28 - shifts));
            let c_idx = [
                idx7(t0 >> 21),
                idx7(t0 >> 14),
                idx7(t0 >> 7),
                idx7(t0),
                idx7(t1 >> 21),
                idx7(t1 >> 14),
                idx7(t1 >> 7),
                idx7(t1),
            ];
            let mut l = 0u32;
            let mut r = 0u32;
            for (t, &i) in c_idx.iter().enumerate() {
                l |= COMP_MASKL[t][i];
                r |= COMP_MASKR[t][i];
            }
            self.keysl[round] = l;
            self.keysr[round] = r;
        }
    }

    /// Install the salt. Bit `i` of `salt` selects bit `23 - i` of the mask.
    pub fn set_salt(&mut self, salt: u32) {
        let mut saltbits = 0u32;
        let mut saltbit = 1u32;
        let mut obit = 0x80_0000u32;
        for _ in 0..24 {
            if salt & saltbit != 0 {
                saltbits |= obit;
            }
            saltbit <<= 1;
            obit >>= 1;
        }
        self.saltbits = saltbits;
    }

    /// Encrypt (or decrypt) one block `count` times in a row. A count of
    /// zero is treated as one.
    pub fn crypt_block(&self, out: &mut [u8; 8], input: &[u8; 8], count: u32, decrypt: bool) {
        let count = count.max(1);
        let saltbits = self.saltbits;

        let [i0, i1, i2, i3, i4, i5, i6, i7] = *input;
        let l_in = u32::from_be_bytes([i0, i1, i2, i3]);
        let r_in = u32::from_be_bytes([i4, i5, i6, i7]);

        let ip_idx = [
            idx8(l_in >> 24),
            idx8(l_in >> 16),
            idx8(l_in >> 8),
            idx8(l_in),
            idx8(r_in >> 24),
            idx8(r_in >> 16),
            idx8(r_in >> 8),
            idx8(r_in),
        ];
        let mut l = 0u32;
        let mut r = 0u32;
        for (t, &i) in ip_idx.iter().enumerate() {
            l |= IP_MASKL[t][i];
            r |= IP_MASKR[t][i];
        }

        let mut f = 0u32;
        for _ in 0..count {
            for round in 0..16 {
                let k = if decrypt { 15 - round } else { round };

                // E-box expansion of R into two 24-bit halves.
                let mut r48l = ((r & 0x0000_0001) << 23)
                    | ((r & 0xf800_0000) >> 9)
                    | ((r & 0x1f80_0000) >> 11)
                    | ((r & 0x01f8_0000) >> 13)
                    | ((r & 0x001f_8000) >> 15);
                let mut r48r = ((r & 0x0001_f800) << 7)
                    | ((r & 0x0000_1f80) << 5)
                    | ((r & 0x0000_01f8) << 3)
                    | ((r & 0x0000_001f) << 1)
                    | ((r & 0x8000_0000) >> 31);

                f = (r48l ^ r48r) & saltbits;
                r48l ^= f ^ self.keysl[k];
                r48r ^= f ^ self.keysr[k];

                f = PSBOX[0][usize::from(M_SBOX[0][(r48l >> 12) as usize])]
                    | PSBOX[1][usize::from(M_SBOX[1][(r48l & 0xfff) as usize])]
                    | PSBOX[2][usize::from(M_SBOX[2][(r48r >> 12) as usize])]
                    | PSBOX[3][usize::from(M_SBOX[3][(r48r & 0xfff) as usize])];

                f ^= l;
                l = r;
                r = f;
            }
            r = l;
            l = f;
        }

        let fp_idx = [
            idx8(l >> 24),
            idx8(l >> 16),
            idx8(l >> 8),
            idx8(l),
            idx8(r >> 24),
            idx8(r >> 16),
            idx8(r >> 8),
            idx8(r),
        ];
        let mut l_out = 0u32;
        let mut r_out = 0u32;
        for (t, &i) in fp_idx.iter().enumerate() {
            l_out |= FP_MASKL[t][i];
            r_out |= FP_MASKR[t][i];
        }
        out[..4].copy_from_slice(&l_out.to_be_bytes());
        out[4..].copy_from_slice(&r_out.to_be_bytes());
    }

    /// Store the context into `buf`, which must hold [`DES_CTX_SIZE`] bytes.
    pub(crate) fn store(&self, buf: &mut [u8]) {
        let words = self.keysl.iter().chain(self.keysr.iter()).chain(std::iter::once(&self.saltbits));
        for (chunk, &w) in buf[..DES_CTX_SIZE].chunks_exact_mut(4).zip(words) {
            chunk.copy_from_slice(&w.to_le_bytes());
        }
    }

    /// Inverse of [`DesCtx::store`].
    pub(crate) fn load(buf: &[u8]) -> Self {
        let mut ctx = Self::default();
        let mut words = buf[..DES_CTX_SIZE]
            .chunks_exact(4)
            .map(|c| u32::from_le_bytes([c[0], c[1], c[2], c[3]]));
        for w in ctx.keysl.iter_mut().chain(ctx.keysr.iter_mut()) {
            *w = words.next().unwrap_or(0);
        }
        ctx.saltbits = words.next().unwrap_or(0);
        ctx
    }
}
