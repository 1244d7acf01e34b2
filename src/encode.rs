//! Key codec: 2-bit nucleotide mapping, reverse complement, canonical form,
//! and a rolling k-mer iterator over a read.
//!
//! Keys are **LSB-aligned**: a k-mer occupies the lower `2k` bits of a `u64`,
//! first base in the most significant position. A=00, C=01, G=10, T=11.

use crate::error::{MirrorError, Result};

/// Longest k-mer representable in a `u64` key.
pub const MAX_K: usize = 32;

const BASES: [u8; 4] = *b"ACGT";
const NOT_A_BASE: u8 = 0xFF;

/// Byte -> 2-bit code, built from `BASES` in both cases.
static BASE_CODE: [u8; 256] = {
    let mut table = [NOT_A_BASE; 256];
    let mut code = 0;
    while code < BASES.len() {
        table[BASES[code] as usize] = code as u8;
        table[BASES[code].to_ascii_lowercase() as usize] = code as u8;
        code += 1;
    }
    table
};

/// 2-bit code of a base, `None` outside `{A,C,G,T}`.
#[inline]
pub fn base_code(b: u8) -> Option<u8> {
    match BASE_CODE[b as usize] {
        NOT_A_BASE => None,
        v => Some(v),
    }
}

/// Mask covering the lower `2k` bits.
#[inline]
pub fn key_mask(k: usize) -> u64 {
    if k >= MAX_K {
        u64::MAX
    } else {
        (1u64 << (2 * k)) - 1
    }
}

/// Encode a k-mer to an LSB-aligned key.
pub fn encode(seq: &[u8]) -> Result<u64> {
    if seq.is_empty() || seq.len() > MAX_K {
        return Err(MirrorError::InvalidConfig(format!(
            "k-mer length {} outside 1..={MAX_K}",
            seq.len()
        )));
    }
    let mut code: u64 = 0;
    for (position, &byte) in seq.iter().enumerate() {
        let v = base_code(byte).ok_or(MirrorError::InvalidNucleotide { byte, position })?;
        code = (code << 2) | v as u64;
    }
    Ok(code)
}

/// Decode the lower `2k` bits of `key` back to upper-case bases.
pub fn decode(key: u64, k: usize) -> String {
    debug_assert!(k <= MAX_K);
    (0..k)
        .map(|i| {
            let shift = 2 * (k - 1 - i);
            BASES[((key >> shift) & 0b11) as usize] as char
        })
        .collect()
}

/// Reverse-complement an LSB-aligned key of length `k`.
///
/// Complement is a bitwise NOT (A<->T is 00<->11, C<->G is 01<->10). The
/// 2-bit groups of the whole word are then reversed and the `k` bases of
/// interest, now in the top bits, shifted back down.
#[inline]
pub fn revcomp(key: u64, k: usize) -> u64 {
    debug_assert!(k <= MAX_K);
    if k == 0 {
        return 0;
    }
    let mut x = !key;
    x = ((x >> 2) & 0x3333_3333_3333_3333) | ((x & 0x3333_3333_3333_3333) << 2);
    x = ((x >> 4) & 0x0F0F_0F0F_0F0F_0F0F) | ((x & 0x0F0F_0F0F_0F0F_0F0F) << 4);
    x.swap_bytes() >> (64 - 2 * k)
}

/// Numerically smaller of `key` and its reverse complement.
#[inline]
pub fn canonical(key: u64, k: usize) -> u64 {
    key.min(revcomp(key, k))
}

/// Number of overlapping windows of length `k` in a read of length `len`.
#[inline]
pub fn windows(len: usize, k: usize) -> usize {
    if k == 0 || len < k { 0 } else { len - k + 1 }
}

/// Lazy iterator over the keys of every valid window of a read.
///
/// Forward and reverse-complement codes are rolled in O(1) per base. A base
/// outside the alphabet resets the window, so every window containing it is
/// skipped.
pub struct Kmers<'a> {
    seq: &'a [u8],
    pos: usize,
    k: usize,
    mask: u64,
    canonical: bool,
    fwd: u64,
    rc: u64,
    len: usize,
}

impl<'a> Kmers<'a> {
    pub fn new(seq: &'a [u8], k: usize, canonical: bool) -> Self {
        debug_assert!(k > 0 && k <= MAX_K);
        Kmers {
            seq,
            pos: 0,
            k,
            mask: key_mask(k),
            canonical,
            fwd: 0,
            rc: 0,
            len: 0,
        }
    }
}

impl Iterator for Kmers<'_> {
    type Item = u64;

    fn next(&mut self) -> Option<u64> {
        while self.pos < self.seq.len() {
            let base = base_code(self.seq[self.pos]);
            self.pos += 1;
            let Some(v) = base.map(u64::from) else {
                self.fwd = 0;
                self.rc = 0;
                self.len = 0;
                continue;
            };
            self.fwd = ((self.fwd << 2) | v) & self.mask;
            self.rc = (self.rc >> 2) | ((v ^ 0b11) << (2 * (self.k - 1)));
            self.len += 1;

            if self.len >= self.k {
                return Some(if self.canonical {
                    self.fwd.min(self.rc)
                } else {
                    self.fwd
                });
            }
        }
        None
    }
}
