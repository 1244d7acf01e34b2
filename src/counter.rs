//! Streaming counter: one producer batching decoded reads into a bounded
//! queue, a fixed pool of workers extracting k-mers and bumping the shared
//! mirror index.

use crossbeam::channel::{Receiver, Sender, bounded};
use std::any::Any;
use std::thread;
use std::time::Instant;
use tracing::{debug, info, warn};

use crate::encode::{Kmers, windows};
use crate::error::{MirrorError, Result};
use crate::mirror::{Counting, Done, IncrementOutcome, MirrorIndex};

type Batch = Vec<Vec<u8>>;

/// Counting configuration.
#[derive(Clone, Debug)]
pub struct CountConfig {
    threads: usize,
    canonical: bool,
    limit: u64,
    batch_size: usize,
    queue_depth: Option<usize>,
}

impl Default for CountConfig {
    fn default() -> Self {
        Self {
            threads: 1,
            canonical: false,
            limit: 0,
            batch_size: 4096,
            queue_depth: None,
        }
    }
}

impl CountConfig {
    /// Number of counting workers (default 1).
    pub fn threads(mut self, n: usize) -> Self {
        self.threads = n;
        self
    }
    /// Count each k-mer as the smaller of itself and its reverse complement.
    pub fn canonical(mut self, yes: bool) -> Self {
        self.canonical = yes;
        self
    }
    /// Saturation limit; `0` leaves only the value-width maximum.
    pub fn limit(mut self, limit: u64) -> Self {
        self.limit = limit;
        self
    }
    /// Reads handed to a worker at a time.
    pub fn batch_size(mut self, n: usize) -> Self {
        self.batch_size = n.max(1);
        self
    }
    /// Batches buffered ahead of the workers (default `3 * threads`).
    pub fn queue_depth(mut self, n: usize) -> Self {
        self.queue_depth = Some(n.max(1));
        self
    }

    pub fn threads_count(&self) -> usize {
        self.threads
    }
    pub fn is_canonical(&self) -> bool {
        self.canonical
    }
    pub fn limit_value(&self) -> u64 {
        self.limit
    }

    pub(crate) fn queue_depth_effective(&self) -> usize {
        self.queue_depth.unwrap_or(3 * self.threads).max(1)
    }
}

/// Totals accumulated over a counting run.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct CountStats {
    /// Reads processed.
    pub records: u64,
    /// Valid k-mer windows extracted.
    pub kmers: u64,
    /// k-mers that incremented a primed key.
    pub hits: u64,
    /// k-mers of primed keys already at the bound.
    pub saturated: u64,
    /// k-mers not in the reference.
    pub absent: u64,
    /// Windows dropped because they contained a non-ACGT base.
    pub skipped_windows: u64,
    /// Input records the decoder rejected.
    pub skipped_records: u64,
}

impl CountStats {
    fn merge(&mut self, o: &CountStats) {
        self.records += o.records;
        self.kmers += o.kmers;
        self.hits += o.hits;
        self.saturated += o.saturated;
        self.absent += o.absent;
        self.skipped_windows += o.skipped_windows;
        self.skipped_records += o.skipped_records;
    }
}

/// Runs the counting phase on a primed index.
pub struct Counter {
    cfg: CountConfig,
}

impl Counter {
    pub fn new(cfg: CountConfig) -> Self {
        Self { cfg }
    }

    /// Count every k-mer of `records` into `index`, then mark it done.
    ///
    /// Records rejected by the decoder (`MirrorError::Decode`) are skipped and
    /// counted; any other source error aborts the run once the workers drain.
    pub fn run<I>(
        &self,
        index: MirrorIndex<Counting>,
        records: I,
    ) -> Result<(MirrorIndex<Done>, CountStats)>
    where
        I: IntoIterator<Item = Result<Vec<u8>>>,
        I::IntoIter: Send,
    {
        if self.cfg.threads == 0 {
            return Err(MirrorError::InvalidConfig("thread count must be at least 1".into()));
        }
        let started = Instant::now();
        let k = index.header().k();
        let canonical = self.cfg.canonical;
        let limit = self.cfg.limit;
        let batch_size = self.cfg.batch_size;
        let (tx, rx) = bounded::<Batch>(self.cfg.queue_depth_effective());
        let records = records.into_iter();

        let (mut stats, failure, fed) = thread::scope(|s| {
            let producer = s.spawn(move || feed(records, tx, batch_size));
            let shared = &index;
            let workers: Vec<_> = (0..self.cfg.threads)
                .map(|id| {
                    let rx = rx.clone();
                    s.spawn(move || count_worker(id, rx, shared, k, canonical, limit))
                })
                .collect();
            drop(rx);

            let mut stats = CountStats::default();
            let mut failure = None;
            for w in workers {
                match w.join() {
                    Ok(ws) => stats.merge(&ws),
                    Err(payload) => failure = Some(panic_message(payload)),
                }
            }
            let fed = producer.join().map_err(panic_message);
            (stats, failure, fed)
        });

        if let Some(msg) = failure {
            return Err(MirrorError::WorkerFailure(msg));
        }
        stats.skipped_records = fed.map_err(MirrorError::WorkerFailure)??;

        if stats.skipped_windows > 0 {
            warn!(
                skipped_windows = stats.skipped_windows,
                "k-mer windows with non-ACGT bases were skipped"
            );
        }
        info!(
            records = stats.records,
            kmers = stats.kmers,
            hits = stats.hits,
            saturated = stats.saturated,
            absent = stats.absent,
            elapsed = ?started.elapsed(),
            "counted k-mers"
        );
        Ok((index.mark_done(), stats))
    }
}

/// Producer: batch records into the queue. Returns the number of records the
/// decoder rejected.
fn feed<I>(records: I, tx: Sender<Batch>, batch_size: usize) -> Result<u64>
where
    I: Iterator<Item = Result<Vec<u8>>>,
{
    let mut skipped = 0u64;
    let mut batch: Batch = Vec::with_capacity(batch_size);
    for item in records {
        match item {
            Ok(seq) => batch.push(seq),
            Err(MirrorError::Decode(msg)) => {
                warn!(error = %msg, "skipping undecodable record");
                skipped += 1;
                continue;
            }
            Err(e) => return Err(e),
        }
        if batch.len() >= batch_size {
            let full = std::mem::replace(&mut batch, Vec::with_capacity(batch_size));
            if tx.send(full).is_err() {
                // every worker is gone; the join reports why
                return Ok(skipped);
            }
        }
    }
    if !batch.is_empty() {
        let _ = tx.send(batch);
    }
    Ok(skipped)
}

fn count_worker(
    id: usize,
    rx: Receiver<Batch>,
    index: &MirrorIndex<Counting>,
    k: usize,
    canonical: bool,
    limit: u64,
) -> CountStats {
    let mut st = CountStats::default();
    for batch in rx.iter() {
        for seq in &batch {
            st.records += 1;
            let mut emitted = 0u64;
            for kmer in Kmers::new(seq, k, canonical) {
                emitted += 1;
                match index.try_increment(kmer, 1, limit) {
                    IncrementOutcome::Added => st.hits += 1,
                    IncrementOutcome::Saturated => st.saturated += 1,
                    IncrementOutcome::Absent => st.absent += 1,
                }
            }
            st.kmers += emitted;
            st.skipped_windows += windows(seq.len(), k) as u64 - emitted;
        }
    }
    debug!(worker = id, records = st.records, "worker finished");
    st
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "worker panicked".to_string()
    }
}
