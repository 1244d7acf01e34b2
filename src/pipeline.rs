//! End-to-end run: prime from a reference file, count reads, dump.

use std::path::{Path, PathBuf};
use tracing::warn;

use crate::counter::{CountConfig, CountStats, Counter};
use crate::dump::{DumpStats, Dumper, byte_width};
use crate::error::Result;
use crate::prime::{ReferenceIndex, prime};
use crate::sequence::FastxSource;

/// Totals of a complete run.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct MirrorSummary {
    pub primed_keys: usize,
    pub count: CountStats,
    pub dump: DumpStats,
}

/// Count the k-mers of `inputs` that appear in `reference` and write the
/// resulting index to `output`.
///
/// `counter_bytes` is the output count width used when no limit is set.
///
/// Counts never exceed the reference's own value width either: a reference
/// dumped with 1-byte counts saturates every key at 255, whatever
/// `counter_bytes` says. This is logged at `warn` when it narrows the output.
pub fn mirror_count_files(
    reference: &Path,
    inputs: Vec<PathBuf>,
    output: &Path,
    cfg: CountConfig,
    counter_bytes: usize,
) -> Result<MirrorSummary> {
    let dumper = Dumper::new(byte_width(cfg.limit_value(), counter_bytes))?;

    let reference = ReferenceIndex::open(reference)?;
    let ceiling = reference.header().max_value();
    let wanted = match cfg.limit_value() {
        0 => dumper.max_value(),
        limit => limit.min(dumper.max_value()),
    };
    if ceiling < wanted {
        warn!(
            val_bits = reference.header().val_bits(),
            ceiling, wanted, "reference value width caps counts below the output width"
        );
    }
    let index = prime(reference.header().clone(), reference.records())?;
    let primed_keys = index.occupied();

    let (done, count) = Counter::new(cfg).run(index, FastxSource::new(inputs))?;
    let dump = dumper.dump_to_path(&done, output)?;

    Ok(MirrorSummary {
        primed_keys,
        count,
        dump,
    })
}
