//! Precomputed DES permutation and substitution tables.
//!
//! Everything here is derived at compile time from the canonical tables in
//! FIPS 46-3. The derived forms let the block cipher do each permutation as
//! eight table lookups OR-ed together.

// ── Canonical tables ─────────────────────────────────────────────────────────

const IP: [u8; 64] = [
    58, 50, 42, 34, 26, 18, 10, 2, 60, 52, 44, 36, 28, 20, 12, 4, //
    62, 54, 46, 38, 30, 22, 14, 6, 64, 56, 48, 40, 32, 24, 16, 8, //
    57, 49, 41, 33, 25, 17, 9, 1, 59, 51, 43, 35, 27, 19, 11, 3, //
    61, 53, 45, 37, 29, 21, 13, 5, 63, 55, 47, 39, 31, 23, 15, 7,
];

const KEY_PERM: [u8; 56] = [
    57, 49, 41, 33, 25, 17, 9, 1, 58, 50, 42, 34, 26, 18, //
    10, 2, 59, 51, 43, 35, 27, 19, 11, 3, 60, 52, 44, 36, //
    63, 55, 47, 39, 31, 23, 15, 7, 62, 54, 46, 38, 30, 22, //
    14, 6, 61, 53, 45, 37, 29, 21, 13, 5, 28, 20, 12, 4,
];

const COMP_PERM: [u8; 48] = [
    14, 17, 11, 24, 1, 5, 3, 28, 15, 6, 21, 10, //
    23, 19, 12, 4, 26, 8, 16, 7, 27, 20, 13, 2, //
    41, 52, 31, 37, 47, 55, 30, 40, 51, 45, 33, 48, //
    44, 49, 39, 56, 34, 53, 46, 42, 50, 36, 29, 32,
];

const SBOX: [[u8; 64]; 8] = [
    [
        14, 4, 13, 1, 2, 15, 11, 8, 3, 10, 6, 12, 5, 9, 0, 7, //
        0, 15, 7, 4, 14, 2, 13, 1, 10, 6, 12, 11, 9, 5, 3, 8, //
        4, 1, 14, 8, 13, 6, 2, 11, 15, 12, 9, 7, 3, 10, 5, 0, //
        15, 12, 8, 2, 4, 9, 1, 7, 5, 11, 3, 14, 10, 0, 6, 13,
    ],
    [
        15, 1, 8, 14, 6, 11, 3, 4, 9, 7, 2, 13, 12, 0, 5, 10, //
        3, 13, 4, 7, 15, 2, 8, 14, 12, 0, 1, 10, 6, 9, 11, 5, //
        0, 14, 7, 11, 10, 4, 13, 1, 5, 8, 12, 6, 9, 3, 2, 15, //
        13, 8, 10, 1, 3, 15, 4, 2, 11, 6, 7, 12, 0, 5, 14, 9,
    ],
    [
        10, 0, 9, 14, 6, 3, 15, 5, 1, 13, 12, 7, 11, 4, 2, 8, //
        13, 7, 0, 9, 3, 4, 6, 10, 2, 8, 5, 14, 12, 11, 15, 1, //
        13, 6, 4, 9, 8, 15, 3, 0, 11, 1, 2, 12, 5, 10, 14, 7, //
        1, 10, 13, 0, 6, 9, 8, 7, 4, 15, 14, 3, 11, 5, 2, 12,
    ],
    [
        7, 13, 14, 3, 0, 6, 9, 10, 1, 2, 8, 5, 11, 12, 4, 15, //
        13, 8, 11, 5, 6, 15, 0, 3, 4, 7, 2, 12, 1, 10, 14, 9, //
        10, 6, 9, 0, 12, 11, 7, 13, 15, 1, 3, 14, 5, 2, 8, 4, //
        3, 15, 0, 6, 10, 1, 13, 8, 9, 4, 5, 11, 12, 7, 2, 14,
    ],
    [
        2, 12, 4, 1, 7, 10, 11, 6, 8, 5, 3, 15, 13, 0, 14, 9, //
        14, 11, 2, 12, 4, 7, 13, 1, 5, 0, 15, 10, 3, 9, 8, 6, //
        4, 2, 1, 11, 10, 13, 7, 8, 15, 9, 12, 5, 6, 3, 0, 14, //
        11, 8, 12, 7, 1, 14, 2, 13, 6, 15, 0, 9, 10, 4, 5, 3,
    ],
    [
        12, 1, 10, 15, 9, 2, 6, 8, 0, 13, 3, 4, 14, 7, 5, 11, //
        10, 15, 4, 2, 7, 12, 9, 5, 6, 1, 13, 14, 0, 11, 3, 8, //
        9, 14, 15, 5, 2, 8, 12, 3, 7, 0, 4, 10, 1, 13, 11, 6, //
        4, 3, 2, 12, 9, 5, 15, 10, 11, 14, 1, 7, 6, 0, 8, 13,
    ],
    [
        4, 11, 2, 14, 15, 0, 8, 13, 3, 12, 9, 7, 5, 10, 6, 1, //
        13, 0, 11, 7, 4, 9, 1, 10, 14, 3, 5, 12, 2, 15, 8, 6, //
        1, 4, 11, 13, 12, 3, 7, 14, 10, 15, 6, 8, 0, 5, 9, 2, //
        6, 11, 13, 8, 1, 4, 10, 7, 9, 5, 0, 15, 14, 2, 3, 12,
    ],
    [
        13, 2, 8, 4, 6, 15, 11, 1, 10, 9, 3, 14, 5, 0, 12, 7, //
        1, 15, 13, 8, 10, 3, 7, 4, 12, 5, 6, 11, 0, 14, 9, 2, //
        7, 11, 4, 1, 9, 12, 14, 2, 0, 6, 10, 13, 15, 3, 5, 8, //
        2, 1, 14, 7, 4, 10, 8, 13, 15, 12, 9, 0, 3, 5, 6, 11,
    ],
];

const PBOX: [u8; 32] = [
    16, 7, 20, 21, 29, 12, 28, 17, 1, 15, 23, 26, 5, 18, 31, 10, //
    2, 8, 24, 14, 32, 27, 3, 9, 19, 13, 30, 6, 22, 11, 4, 25,
];

const NONE: u8 = 255;

const fn bit32(i: usize) -> u32 {
    0x8000_0000 >> i
}

const fn bit28(i: usize) -> u32 {
    bit32(i + 4)
}

const fn bit24(i: usize) -> u32 {
    bit32(i + 8)
}

const fn bit8(i: usize) -> usize {
    0x80 >> i
}

// ── Derived permutations ─────────────────────────────────────────────────────

const fn final_perm() -> [u8; 64] {
    let mut fp = [0u8; 64];
    let mut i = 0;
    while i < 64 {
        fp[i] = IP[i] - 1;
        i += 1;
    }
    fp
}

const fn init_perm() -> [u8; 64] {
    let fp = final_perm();
    let mut ip = [0u8; 64];
    let mut i = 0;
    while i < 64 {
        ip[fp[i] as usize] = i as u8;
        i += 1;
    }
    ip
}

const fn inv_key_perm() -> [u8; 64] {
    let mut inv = [NONE; 64];
    let mut i = 0;
    while i < 56 {
        inv[(KEY_PERM[i] - 1) as usize] = i as u8;
        i += 1;
    }
    inv
}

const fn inv_comp_perm() -> [u8; 56] {
    let mut inv = [NONE; 56];
    let mut i = 0;
    while i < 48 {
        inv[(COMP_PERM[i] - 1) as usize] = i as u8;
        i += 1;
    }
    inv
}

// ── Lookup tables ────────────────────────────────────────────────────────────

/// S-box pairs merged into four 12-bit-input tables, with the row/column
/// input bits already reordered.
const fn build_m_sbox() -> [[u8; 4096]; 4] {
    let mut u_sbox = [[0u8; 64]; 8];
    let mut i = 0;
    while i < 8 {
        let mut j = 0;
        while j < 64 {
            let b = (j & 0x20) | ((j & 1) << 4) | ((j >> 1) & 0xf);
            u_sbox[i][j] = SBOX[i][b];
            j += 1;
        }
        i += 1;
    }

    let mut m = [[0u8; 4096]; 4];
    let mut b = 0;
    while b < 4 {
        let mut i = 0;
        while i < 64 {
            let mut j = 0;
            while j < 64 {
                m[b][(i << 6) | j] = (u_sbox[b << 1][i] << 4) | u_sbox[(b << 1) + 1][j];
                j += 1;
            }
            i += 1;
        }
        b += 1;
    }
    m
}

/// Initial (`final == false`) or final permutation as OR-masks, one table
/// per input byte, producing the left or right output word.
const fn build_block_mask(final_: bool, left: bool) -> [[u32; 256]; 8] {
    let perm = if final_ { final_perm() } else { init_perm() };
    let mut masks = [[0u32; 256]; 8];
    let mut k = 0;
    while k < 8 {
        let mut i = 0;
        while i < 256 {
            let mut acc = 0u32;
            let mut j = 0;
            while j < 8 {
                if i & bit8(j) != 0 {
                    let obit = perm[8 * k + j] as usize;
                    if left && obit < 32 {
                        acc |= bit32(obit);
                    } else if !left && obit >= 32 {
                        acc |= bit32(obit - 32);
                    }
                }
                j += 1;
            }
            masks[k][i] = acc;
            i += 1;
        }
        k += 1;
    }
    masks
}

/// Key permutation (PC-1) as OR-masks over the seven key bits of each byte.
const fn build_key_perm_mask(left: bool) -> [[u32; 128]; 8] {
    let inv = inv_key_perm();
    let mut masks = [[0u32; 128]; 8];
    let mut k = 0;
    while k < 8 {
        let mut i = 0;
        while i < 128 {
            let mut acc = 0u32;
            let mut j = 0;
            while j < 7 {
                if i & bit8(j + 1) != 0 {
                    let obit = inv[8 * k + j];
                    if obit != NONE {
                        let obit = obit as usize;
                        if left && obit < 28 {
                            acc |= bit28(obit);
                        } else if !left && obit >= 28 {
                            acc |= bit28(obit - 28);
                        }
                    }
                }
                j += 1;
            }
            masks[k][i] = acc;
            i += 1;
        }
        k += 1;
    }
    masks
}

/// Compression permutation (PC-2) as OR-masks over seven-bit slices of the
/// rotated 28-bit halves.
const fn build_comp_mask(left: bool) -> [[u32; 128]; 8] {
    let inv = inv_comp_perm();
    let mut masks = [[0u32; 128]; 8];
    let mut k = 0;
    while k < 8 {
        let mut i = 0;
        while i < 128 {
            let mut acc = 0u32;
            let mut j = 0;
            while j < 7 {
                if i & bit8(j + 1) != 0 {
                    let obit = inv[7 * k + j];
                    if obit != NONE {
                        let obit = obit as usize;
                        if left && obit < 24 {
                            acc |= bit24(obit);
                        } else if !left && obit >= 24 {
                            acc |= bit24(obit - 24);
                        }
                    }
                }
                j += 1;
            }
            masks[k][i] = acc;
            i += 1;
        }
        k += 1;
    }
    masks
}

/// P-box permutation applied to each byte of merged S-box output.
const fn build_psbox() -> [[u32; 256]; 4] {
    let mut un_pbox = [0u8; 32];
    let mut i = 0;
    while i < 32 {
        un_pbox[(PBOX[i] - 1) as usize] = i as u8;
        i += 1;
    }

    let mut ps = [[0u32; 256]; 4];
    let mut b = 0;
    while b < 4 {
        let mut i = 0;
        while i < 256 {
            let mut acc = 0u32;
            let mut j = 0;
            while j < 8 {
                if i & bit8(j) != 0 {
                    acc |= bit32(un_pbox[8 * b + j] as usize);
                }
                j += 1;
            }
            ps[b][i] = acc;
            i += 1;
        }
        b += 1;
    }
    ps
}

pub(super) static M_SBOX: [[u8; 4096]; 4] = build_m_sbox();
pub(super) static IP_MASKL: [[u32; 256]; 8] = build_block_mask(false, true);
pub(super) static IP_MASKR: [[u32; 256]; 8] = build_block_mask(false, false);
pub(super) static FP_MASKL: [[u32; 256]; 8] = build_block_mask(true, true);
pub(super) static FP_MASKR: [[u32; 256]; 8] = build_block_mask(true, false);
pub(super) static KEY_PERM_MASKL: [[u32; 128]; 8] = build_key_perm_mask(true);
pub(super) static KEY_PERM_MASKR: [[u32; 128]; 8] = build_key_perm_mask(false);
pub(super) static COMP_MASKL: [[u32; 128]; 8] = build_comp_mask(true);
pub(super) static COMP_MASKR: [[u32; 128]; 8] = build_comp_mask(false);
pub(super) static PSBOX: [[u32; 256]; 4] = build_psbox();

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn initial_and_final_permutations_are_inverse() {
        let ip = init_perm();
        let fp = final_perm();
        for i in 0..64 {
            assert_eq!(ip[fp[i] as usize] as usize, i);
        }
    }

    #[test]
    fn key_perm_skips_parity_bits() {
        let inv = inv_key_perm();
        for byte in 0..8 {
            assert_eq!(inv[8 * byte + 7], NONE);
        }
        assert_eq!(inv.iter().filter(|&&b| b != NONE).count(), 56);
    }

    #[test]
    fn merged_sbox_first_entries() {
        // u_sbox[0][0] = S1[0] = 14, u_sbox[1][0] = S2[0] = 15
        assert_eq!(M_SBOX[0][0], 0xef);
    }

    #[test]
    fn psbox_is_a_bit_permutation() {
        let mut all = 0u32;
        for b in 0..4 {
            for j in 0..8 {
                let m = PSBOX[b][0x80 >> j];
                assert_eq!(m.count_ones(), 1);
                all |= m;
            }
        }
        assert_eq!(all, u32::MAX);
    }

    #[test]
    fn comp_masks_produce_24_bits_each() {
        let mut l = 0u32;
        let mut r = 0u32;
        for k in 0..8 {
            l |= COMP_MASKL[k][0x7f];
            r |= COMP_MASKR[k][0x7f];
        }
        assert_eq!(l, 0x00ff_ffff);
        assert_eq!(r, 0x00ff_ffff);
    }
}
