//! Binary dumper: header + occupied slots in slot order.
//!
//! The header is first written with an incomplete record count and patched
//! once the body is on disk, so a truncated dump is rejected on read.

use byteorder::{LittleEndian as LE, WriteBytesExt};
use std::fs::File;
use std::io::{BufWriter, Seek, SeekFrom, Write};
use std::path::Path;
use std::time::Instant;
use tracing::{info, warn};

use crate::error::{MirrorError, Result};
use crate::header::INCOMPLETE;
use crate::mirror::{Done, MirrorIndex};

/// Bytes per count in the output.
///
/// With a limit, the smallest width holding `limit` (`floor(log2(limit)) + 1`
/// bits, rounded up to bytes); otherwise `configured` unchanged.
pub fn byte_width(limit: u64, configured: usize) -> usize {
    if limit > 0 {
        let bits = 64 - limit.leading_zeros();
        bits.div_ceil(8) as usize
    } else {
        configured
    }
}

/// Summary of a dump.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct DumpStats {
    pub records: u64,
    /// Counts that did not fit the output width and were saturated.
    pub clamped: u64,
}

/// Serializes a finished [`MirrorIndex`].
pub struct Dumper {
    width: usize,
}

impl Dumper {
    /// `width` bytes per count, `1..=8`.
    pub fn new(width: usize) -> Result<Self> {
        if !(1..=8).contains(&width) {
            return Err(MirrorError::InvalidConfig(format!(
                "counter width of {width} bytes outside 1..=8"
            )));
        }
        Ok(Self { width })
    }

    pub fn width(&self) -> usize {
        self.width
    }

    /// Largest count the output width can hold.
    pub fn max_value(&self) -> u64 {
        if self.width >= 8 {
            u64::MAX
        } else {
            (1u64 << (8 * self.width)) - 1
        }
    }

    pub fn dump<W: Write + Seek>(&self, index: &MirrorIndex<Done>, w: &mut W) -> Result<DumpStats> {
        let started = Instant::now();
        let header = index
            .header()
            .with_val_bits(8 * self.width as u32)?
            .with_record_count(INCOMPLETE);
        let key_bytes = header.key_bytes();
        let max = header.max_value();

        let max_count = index.max_count();
        if max_count > max {
            warn!(
                max_count,
                width = self.width,
                "largest count exceeds the output width; such counts are saturated"
            );
        }

        let start = w.stream_position()?;
        header.write(w)?;

        let mut stats = DumpStats::default();
        for (_slot, key, count) in index.iter_occupied() {
            if count > max {
                stats.clamped += 1;
            }
            w.write_uint::<LE>(key, key_bytes)?;
            w.write_uint::<LE>(count.min(max), self.width)?;
            stats.records += 1;
        }

        // Patch the record count (last header field).
        let end = w.stream_position()?;
        w.seek(SeekFrom::Start(start + header.encoded_len() as u64 - 8))?;
        w.write_u64::<LE>(stats.records)?;
        w.seek(SeekFrom::Start(end))?;
        w.flush()?;

        info!(
            records = stats.records,
            width = self.width,
            elapsed = ?started.elapsed(),
            "dumped mirror index"
        );
        Ok(stats)
    }

    /// Dump to a newly created file at `path`.
    pub fn dump_to_path(&self, index: &MirrorIndex<Done>, path: &Path) -> Result<DumpStats> {
        let file = File::create(path)?;
        let mut w = BufWriter::new(file);
        let stats = self.dump(index, &mut w)?;
        let file = w.into_inner().map_err(|e| e.into_error())?;
        file.sync_all()?;
        Ok(stats)
    }
}
