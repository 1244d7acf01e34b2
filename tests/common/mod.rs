#![allow(dead_code)]

use kmer_mirror::*;
use std::io::Cursor;

/// Deterministic pseudo-random matrix rows (splitmix64).
pub fn matrix_rows(n: usize, cols: u32, seed: u64) -> Vec<u64> {
    let mask = if cols >= 64 { u64::MAX } else { (1u64 << cols) - 1 };
    let mut state = seed;
    (0..n)
        .map(|_| {
            state = state.wrapping_add(0x9E37_79B9_7F4A_7C15);
            let mut z = state;
            z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
            z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
            (z ^ (z >> 31)) & mask
        })
        .collect()
}

/// Header for `k`-mers with a matrix wide enough to address `capacity`.
pub fn header(k: usize, val_bits: u32, capacity: u64, max_reprobe: u32) -> Header {
    let key_bits = 2 * k as u32;
    let rows = (64 - (capacity.max(2) - 1).leading_zeros()) as usize;
    let matrix = Matrix::new(matrix_rows(rows, key_bits, 0x5EED), key_bits).unwrap();
    Header::new(key_bits, val_bits, capacity, max_reprobe, matrix).unwrap()
}

pub fn keys(seqs: &[&str]) -> Vec<u64> {
    seqs.iter().map(|s| encode(s.as_bytes()).unwrap()).collect()
}

/// Primed, sealed table holding `keys`.
pub fn primed(header: Header, keys: &[u64]) -> MirrorIndex<Counting> {
    let mut idx = MirrorIndex::new(header).unwrap();
    for &k in keys {
        idx.prime_key(k).unwrap();
    }
    idx.seal()
}

/// Serialized reference index holding `keys` with zero counts.
pub fn reference_bytes(header: Header, keys: &[u64], width: usize) -> Vec<u8> {
    let done = primed(header, keys).mark_done();
    let mut out = Cursor::new(Vec::new());
    Dumper::new(width).unwrap().dump(&done, &mut out).unwrap();
    out.into_inner()
}

pub fn reads(seqs: &[&str]) -> Vec<Result<Vec<u8>>> {
    seqs.iter().map(|s| Ok(s.as_bytes().to_vec())).collect()
}

/// Read a dumped index back into `(header, records)`.
pub fn parse(bytes: &[u8]) -> (Header, Vec<Record>) {
    let mut cursor = bytes;
    let header = Header::read(&mut cursor).unwrap();
    let records = RecordReader::new(cursor, &header)
        .collect::<Result<Vec<_>>>()
        .unwrap();
    (header, records)
}
