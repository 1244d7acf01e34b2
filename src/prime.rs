//! Priming: load the key set of a reference index into a fresh table.

use byteorder::{LittleEndian as LE, ReadBytesExt};
use std::fs::File;
use std::io::{ErrorKind, Read};
use std::path::Path;
use std::time::Instant;
use tracing::{debug, info, warn};

use crate::encode::key_mask;
use crate::error::{MirrorError, Result};
use crate::header::Header;
use crate::mirror::{Counting, MirrorIndex, PrimeOutcome};

/// One `(key, count)` body record.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Record {
    pub key: u64,
    pub count: u64,
}

/// Sequential reader over exactly `record_count` body records.
pub struct RecordReader<R> {
    reader: R,
    key_bytes: usize,
    val_bytes: usize,
    key_mask: u64,
    index: u64,
    total: u64,
}

impl<R: Read> RecordReader<R> {
    /// `reader` must be positioned at the first record, right after the header.
    pub fn new(reader: R, header: &Header) -> Self {
        RecordReader {
            reader,
            key_bytes: header.key_bytes(),
            val_bytes: header.val_bytes(),
            key_mask: key_mask(header.k()),
            index: 0,
            total: header.record_count(),
        }
    }

    fn read_record(&mut self) -> Result<Record> {
        let index = self.index;
        let corrupt = |e: std::io::Error| {
            if e.kind() == ErrorKind::UnexpectedEof {
                MirrorError::CorruptRecord {
                    index,
                    reason: "unexpected end of file".into(),
                }
            } else {
                MirrorError::Io(e)
            }
        };
        let key = self.reader.read_uint::<LE>(self.key_bytes).map_err(corrupt)?;
        let count = self.reader.read_uint::<LE>(self.val_bytes).map_err(corrupt)?;
        if key & !self.key_mask != 0 {
            return Err(MirrorError::CorruptRecord {
                index,
                reason: format!("key {key:#x} wider than the header's key length"),
            });
        }
        Ok(Record { key, count })
    }
}

impl<R: Read> Iterator for RecordReader<R> {
    type Item = Result<Record>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.index >= self.total {
            return None;
        }
        let rec = self.read_record();
        // stop after the first failure
        self.index = if rec.is_ok() { self.index + 1 } else { self.total };
        Some(rec)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let left = (self.total - self.index) as usize;
        (0, Some(left))
    }
}

/// Memory-mapped reference index.
pub struct ReferenceIndex {
    map: memmap2::Mmap,
    header: Header,
    body_offset: usize,
}

impl ReferenceIndex {
    /// Map `path`, parse its header and check the body length.
    pub fn open(path: &Path) -> Result<Self> {
        let file = File::open(path)?;
        // SAFETY: the mapping is read-only and the file is not modified while mapped.
        let map = unsafe { memmap2::MmapOptions::new().map(&file)? };

        let mut cursor: &[u8] = &map[..];
        let header = Header::read(&mut cursor)?;
        let body_offset = header.encoded_len();
        if header.record_count() > header.capacity() {
            return Err(MirrorError::CorruptHeader(format!(
                "{} records cannot fit in {} slots",
                header.record_count(),
                header.capacity()
            )));
        }

        let body_len = (map.len() - body_offset) as u64;
        let expected = header
            .record_count()
            .checked_mul(header.record_bytes() as u64)
            .ok_or_else(|| MirrorError::CorruptHeader("record count overflows".into()))?;
        if body_len != expected {
            return Err(MirrorError::CorruptRecord {
                index: body_len / header.record_bytes() as u64,
                reason: format!(
                    "body holds {body_len} bytes, header declares {} records of {} bytes",
                    header.record_count(),
                    header.record_bytes()
                ),
            });
        }
        debug!(
            path = %path.display(),
            k = header.k(),
            capacity = header.capacity(),
            records = header.record_count(),
            "opened reference index"
        );

        Ok(ReferenceIndex {
            map,
            header,
            body_offset,
        })
    }

    pub fn header(&self) -> &Header {
        &self.header
    }

    pub fn records(&self) -> RecordReader<&[u8]> {
        RecordReader::new(&self.map[self.body_offset..], &self.header)
    }
}

/// Insert every key of `records` with a zero count, in order, and seal the
/// table for counting. Stored counts are ignored.
///
/// Placement does not depend on the order of `records`, so a reference
/// dumped in slot order comes back with the same slot layout.
pub fn prime<I>(header: Header, records: I) -> Result<MirrorIndex<Counting>>
where
    I: IntoIterator<Item = Result<Record>>,
{
    let started = Instant::now();
    let mut index = MirrorIndex::new(header)?;
    let mut duplicates = 0u64;
    for rec in records {
        if index.prime_key(rec?.key)? == PrimeOutcome::Present {
            duplicates += 1;
        }
    }
    if duplicates > 0 {
        warn!(duplicates, "reference index repeats keys; kept one slot each");
    }
    info!(
        keys = index.occupied(),
        elapsed = ?started.elapsed(),
        "primed mirror index"
    );
    Ok(index.seal())
}
