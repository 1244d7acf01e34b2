//! Error type shared by every stage of a mirror run.

use thiserror::Error;

/// Errors returned by the priming, counting and dumping stages.
#[derive(Debug, Error)]
pub enum MirrorError {
    /// The index header is malformed, truncated, or incomplete.
    #[error("corrupt index header: {0}")]
    CorruptHeader(String),
    /// A record in the index body is malformed or missing.
    #[error("corrupt index record #{index}: {reason}")]
    CorruptRecord { index: u64, reason: String },
    /// No free or matching slot within `max_reprobe` probes.
    #[error("hash table full: no slot for key {key:#x} after {probes} probes")]
    TableFull { key: u64, probes: u32 },
    /// A character outside the nucleotide alphabet.
    #[error("invalid nucleotide {byte:#04x} at position {position}")]
    InvalidNucleotide { byte: u8, position: usize },
    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    /// The sequence decoder rejected an input record.
    #[error("sequence decode error: {0}")]
    Decode(String),
    /// A counting worker terminated abnormally.
    #[error("worker failure: {0}")]
    WorkerFailure(String),
    /// Parameters that cannot describe a valid run.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

pub type Result<T> = std::result::Result<T, MirrorError>;
