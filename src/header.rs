//! Index header: table geometry, hash matrix, and declared record count.
//!
//! Layout (all integers little-endian):
//!
//! ```text
//! magic u32 | version u32 | key_bits u32 | val_bits u32 | capacity u64
//! max_reprobe u32 | matrix_rows u32 | matrix_cols u32 | rows[matrix_rows] u64
//! record_count u64
//! ```
//!
//! `record_count == u64::MAX` marks a file whose body was never completed.

use byteorder::{LittleEndian as LE, ReadBytesExt, WriteBytesExt};
use std::io::{ErrorKind, Read, Write};

use crate::error::{MirrorError, Result};

pub const MIRROR_MAGIC: u32 = 0x4D_52_49_58; // "MRIX"
pub const MIRROR_VERSION: u32 = 1;
/// Record count written before the body is complete.
pub const INCOMPLETE: u64 = u64::MAX;

/// Bit-mixing matrix projecting a key onto a slot hash.
///
/// Output bit `i` is the parity of `rows[i] & key`. The rows are copied
/// verbatim between reference and output so both tables share a layout.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Matrix {
    rows: Vec<u64>,
    cols: u32,
}

impl Matrix {
    /// `cols` is the key width in bits; no row may set bits at or above it.
    pub fn new(rows: Vec<u64>, cols: u32) -> Result<Self> {
        if rows.is_empty() || rows.len() > 64 {
            return Err(MirrorError::CorruptHeader(format!(
                "matrix has {} rows, expected 1..=64",
                rows.len()
            )));
        }
        if cols == 0 || cols > 64 {
            return Err(MirrorError::CorruptHeader(format!(
                "matrix has {cols} columns, expected 1..=64"
            )));
        }
        if cols < 64 {
            let allowed = (1u64 << cols) - 1;
            if let Some(i) = rows.iter().position(|r| r & !allowed != 0) {
                return Err(MirrorError::CorruptHeader(format!(
                    "matrix row {i} has bits beyond column {cols}"
                )));
            }
        }
        Ok(Matrix { rows, cols })
    }

    #[inline]
    pub fn hash(&self, key: u64) -> u64 {
        self.rows
            .iter()
            .enumerate()
            .fold(0u64, |acc, (i, row)| acc | (((row & key).count_ones() as u64 & 1) << i))
    }

    pub fn rows(&self) -> &[u64] {
        &self.rows
    }

    pub fn cols(&self) -> u32 {
        self.cols
    }
}

/// Immutable metadata of a mirror index.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Header {
    key_bits: u32,
    val_bits: u32,
    capacity: u64,
    max_reprobe: u32,
    matrix: Matrix,
    record_count: u64,
}

impl Header {
    /// Build and validate a header with no declared records.
    pub fn new(
        key_bits: u32,
        val_bits: u32,
        capacity: u64,
        max_reprobe: u32,
        matrix: Matrix,
    ) -> Result<Self> {
        if key_bits == 0 || key_bits > 64 || key_bits % 2 != 0 {
            return Err(MirrorError::CorruptHeader(format!(
                "key length of {key_bits} bits is not an even value in 2..=64"
            )));
        }
        if val_bits == 0 || val_bits > 64 {
            return Err(MirrorError::CorruptHeader(format!(
                "value length of {val_bits} bits outside 1..=64"
            )));
        }
        if capacity == 0 {
            return Err(MirrorError::CorruptHeader("capacity is zero".into()));
        }
        if capacity > usize::MAX as u64 {
            return Err(MirrorError::CorruptHeader(format!(
                "capacity {capacity} not addressable on this platform"
            )));
        }
        if matrix.cols() != key_bits {
            return Err(MirrorError::CorruptHeader(format!(
                "matrix has {} columns for {key_bits}-bit keys",
                matrix.cols()
            )));
        }
        Ok(Header {
            key_bits,
            val_bits,
            capacity,
            max_reprobe,
            matrix,
            record_count: 0,
        })
    }

    /// Copy of this header with a different value width.
    pub fn with_val_bits(&self, val_bits: u32) -> Result<Self> {
        let mut h = Header::new(
            self.key_bits,
            val_bits,
            self.capacity,
            self.max_reprobe,
            self.matrix.clone(),
        )?;
        h.record_count = self.record_count;
        Ok(h)
    }

    /// Copy of this header declaring `n` body records.
    pub fn with_record_count(&self, n: u64) -> Self {
        Header {
            record_count: n,
            ..self.clone()
        }
    }

    pub fn write<W: Write>(&self, w: &mut W) -> std::io::Result<()> {
        w.write_u32::<LE>(MIRROR_MAGIC)?;
        w.write_u32::<LE>(MIRROR_VERSION)?;
        w.write_u32::<LE>(self.key_bits)?;
        w.write_u32::<LE>(self.val_bits)?;
        w.write_u64::<LE>(self.capacity)?;
        w.write_u32::<LE>(self.max_reprobe)?;
        w.write_u32::<LE>(self.matrix.rows.len() as u32)?;
        w.write_u32::<LE>(self.matrix.cols)?;
        for &row in &self.matrix.rows {
            w.write_u64::<LE>(row)?;
        }
        w.write_u64::<LE>(self.record_count)?;
        Ok(())
    }

    pub fn read<R: Read>(r: &mut R) -> Result<Self> {
        let magic = r.read_u32::<LE>().map_err(truncated)?;
        if magic != MIRROR_MAGIC {
            return Err(MirrorError::CorruptHeader(format!("bad magic {magic:#010x}")));
        }
        let version = r.read_u32::<LE>().map_err(truncated)?;
        if version != MIRROR_VERSION {
            return Err(MirrorError::CorruptHeader(format!(
                "unsupported version {version}"
            )));
        }
        let key_bits = r.read_u32::<LE>().map_err(truncated)?;
        let val_bits = r.read_u32::<LE>().map_err(truncated)?;
        let capacity = r.read_u64::<LE>().map_err(truncated)?;
        let max_reprobe = r.read_u32::<LE>().map_err(truncated)?;
        let n_rows = r.read_u32::<LE>().map_err(truncated)?;
        let cols = r.read_u32::<LE>().map_err(truncated)?;
        if n_rows == 0 || n_rows > 64 {
            return Err(MirrorError::CorruptHeader(format!(
                "matrix has {n_rows} rows, expected 1..=64"
            )));
        }
        let mut rows = Vec::with_capacity(n_rows as usize);
        for _ in 0..n_rows {
            rows.push(r.read_u64::<LE>().map_err(truncated)?);
        }
        let record_count = r.read_u64::<LE>().map_err(truncated)?;
        if record_count == INCOMPLETE {
            return Err(MirrorError::CorruptHeader(
                "index was not completely written".into(),
            ));
        }

        let matrix = Matrix::new(rows, cols)?;
        let header = Header::new(key_bits, val_bits, capacity, max_reprobe, matrix)?;
        Ok(header.with_record_count(record_count))
    }

    /// Serialized header size in bytes.
    pub fn encoded_len(&self) -> usize {
        4 * 4 + 8 + 4 * 3 + 8 * self.matrix.rows.len() + 8
    }

    pub fn key_bits(&self) -> u32 {
        self.key_bits
    }
    pub fn val_bits(&self) -> u32 {
        self.val_bits
    }
    /// k-mer length.
    pub fn k(&self) -> usize {
        (self.key_bits / 2) as usize
    }
    pub fn capacity(&self) -> u64 {
        self.capacity
    }
    pub fn max_reprobe(&self) -> u32 {
        self.max_reprobe
    }
    pub fn matrix(&self) -> &Matrix {
        &self.matrix
    }
    pub fn record_count(&self) -> u64 {
        self.record_count
    }
    pub fn key_bytes(&self) -> usize {
        self.key_bits.div_ceil(8) as usize
    }
    pub fn val_bytes(&self) -> usize {
        self.val_bits.div_ceil(8) as usize
    }
    pub fn record_bytes(&self) -> usize {
        self.key_bytes() + self.val_bytes()
    }
    /// Largest count representable in `val_bits`.
    pub fn max_value(&self) -> u64 {
        if self.val_bits >= 64 {
            u64::MAX
        } else {
            (1u64 << self.val_bits) - 1
        }
    }
}

fn truncated(e: std::io::Error) -> MirrorError {
    if e.kind() == ErrorKind::UnexpectedEof {
        MirrorError::CorruptHeader("truncated header".into())
    } else {
        MirrorError::Io(e)
    }
}
