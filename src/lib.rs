//! Mirror k-mer counting: count the k-mers of a read set, restricted to the
//! key set of an existing binary k-mer index.
//!
//! A run has three phases:
//! - **prime**: every key of the reference index is inserted with a zero
//!   count into a [`MirrorIndex`] built with the reference's geometry
//!   (capacity, max reprobe, hash matrix), so slot placement is identical;
//! - **count**: a pool of workers streams reads, extracts overlapping k-mers
//!   and increments keys that are already present, up to an optional limit;
//!   unknown k-mers are dropped;
//! - **dump**: occupied slots are written in slot order, in the same format
//!   the reference was read from.
//!
//! The table's lifecycle is encoded in its type: `MirrorIndex<Priming>` ->
//! `MirrorIndex<Counting>` -> `MirrorIndex<Done>`.

pub mod counter;
pub mod dump;
pub mod encode;
mod error;
pub mod header;
pub mod mirror;
mod pipeline;
pub mod prime;
pub mod sequence;

pub use counter::{CountConfig, CountStats, Counter};
pub use dump::{DumpStats, Dumper, byte_width};
pub use encode::{Kmers, canonical, decode, encode, revcomp};
pub use error::{MirrorError, Result};
pub use header::{Header, Matrix};
pub use mirror::{Counting, Done, IncrementOutcome, MirrorIndex, PrimeOutcome, Priming};
pub use pipeline::{MirrorSummary, mirror_count_files};
pub use prime::{Record, RecordReader, ReferenceIndex, prime};
pub use sequence::FastxSource;
