//! MirrorIndex: fixed-capacity open-addressing table of k-mer counts.
//!
//! Keys are placed by linear probing from `matrix.hash(key) mod capacity`.
//! Insertion keeps every run of occupied slots ordered by home slot, breaking
//! ties by key (Robin Hood displacement). The resulting layout depends only
//! on the key set and the header, never on insertion order, so priming from a
//! dump in slot order rebuilds the dumped layout even where runs wrap past
//! the end of the table. The table moves through three states:
//!
//! - [`Priming`]: single writer, keys inserted with [`MirrorIndex::prime_key`].
//! - [`Counting`]: keys frozen, counts bumped concurrently through
//!   [`MirrorIndex::try_increment`].
//! - [`Done`]: read-only, consumed by the dumper.

use rayon::prelude::*;
use std::collections::TryReserveError;
use std::marker::PhantomData;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::error::{MirrorError, Result};
use crate::header::Header;

/// Keys are being loaded; counts are all zero.
#[derive(Debug)]
pub struct Priming;
/// Key set is frozen; counts may be incremented from many threads.
#[derive(Debug)]
pub struct Counting;
/// Counting finished; the table is read-only.
#[derive(Debug)]
pub struct Done;

/// Result of [`MirrorIndex::prime_key`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PrimeOutcome {
    Inserted,
    /// The key already occupied a slot on its probe sequence.
    Present,
}

/// Result of [`MirrorIndex::try_increment`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum IncrementOutcome {
    Added,
    /// The count was already at the bound; nothing changed.
    Saturated,
    /// Key is not in the table; nothing changed.
    Absent,
}

pub struct MirrorIndex<S> {
    header: Header,
    keys: Vec<u64>,
    occupied: Vec<bool>,
    counts: Vec<AtomicU64>,
    len: usize,
    _state: PhantomData<S>,
}

impl MirrorIndex<Priming> {
    /// Allocate `capacity` empty slots with the header's geometry.
    ///
    /// A capacity the process cannot hold is reported as `CorruptHeader`
    /// rather than aborting on allocation failure.
    pub fn new(header: Header) -> Result<Self> {
        let cap = header.capacity() as usize;
        let too_large = |e: TryReserveError| {
            MirrorError::CorruptHeader(format!("capacity of {cap} slots cannot be allocated: {e}"))
        };

        let mut keys = Vec::new();
        keys.try_reserve_exact(cap).map_err(too_large)?;
        keys.resize(cap, 0u64);
        let mut occupied = Vec::new();
        occupied.try_reserve_exact(cap).map_err(too_large)?;
        occupied.resize(cap, false);
        let mut counts = Vec::new();
        counts.try_reserve_exact(cap).map_err(too_large)?;
        counts.extend((0..cap).map(|_| AtomicU64::new(0)));

        Ok(MirrorIndex {
            header,
            keys,
            occupied,
            counts,
            len: 0,
            _state: PhantomData,
        })
    }

    /// Insert `key` with a zero count.
    ///
    /// Walking from the key's home slot, a resident sitting closer to its own
    /// home (or equally close with a larger key) gives up its slot and the
    /// walk continues with the resident. On `TableFull` the table is left
    /// partially rearranged; the error is fatal to the run.
    pub fn prime_key(&mut self, key: u64) -> Result<PrimeOutcome> {
        if self.find(key).is_some() {
            return Ok(PrimeOutcome::Present);
        }
        let cap = self.header.capacity();
        let reach = self.reach();
        let mut carried = key;
        let mut slot = self.home(key);
        let mut distance = 0u64;
        loop {
            if distance > reach {
                return Err(MirrorError::TableFull {
                    key: carried,
                    probes: self.header.max_reprobe().saturating_add(1),
                });
            }
            let at = slot as usize;
            if !self.occupied[at] {
                self.keys[at] = carried;
                self.occupied[at] = true;
                self.len += 1;
                return Ok(PrimeOutcome::Inserted);
            }
            let resident = self.keys[at];
            let resident_home = self.home(resident);
            let resident_distance = if slot >= resident_home {
                slot - resident_home
            } else {
                slot + (cap - resident_home)
            };
            if resident_distance < distance || (resident_distance == distance && carried < resident) {
                self.keys[at] = carried;
                carried = resident;
                distance = resident_distance;
            }
            slot = (slot + 1) % cap;
            distance += 1;
        }
    }

    /// Freeze the key set and allow concurrent increments.
    pub fn seal(self) -> MirrorIndex<Counting> {
        self.transition()
    }
}

impl MirrorIndex<Counting> {
    /// Add `delta` to the count of `key` if present, never exceeding `limit`
    /// (`0` means the value-width maximum).
    pub fn try_increment(&self, key: u64, delta: u64, limit: u64) -> IncrementOutcome {
        let Some(slot) = self.find(key) else {
            return IncrementOutcome::Absent;
        };
        let bound = self.bound(limit);
        let cell = &self.counts[slot];
        let mut cur = cell.load(Ordering::Relaxed);
        loop {
            if cur >= bound {
                return IncrementOutcome::Saturated;
            }
            let next = cur.saturating_add(delta).min(bound);
            match cell.compare_exchange_weak(cur, next, Ordering::Relaxed, Ordering::Relaxed) {
                Ok(_) => return IncrementOutcome::Added,
                Err(actual) => cur = actual,
            }
        }
    }

    /// One-shot transition once every counting worker has finished.
    pub fn mark_done(self) -> MirrorIndex<Done> {
        self.transition()
    }
}

impl MirrorIndex<Done> {
    /// Occupied slots as `(slot, key, count)` in ascending slot order.
    pub fn iter_occupied(&self) -> impl Iterator<Item = (usize, u64, u64)> + '_ {
        self.occupied
            .iter()
            .enumerate()
            .filter(|&(_, &occ)| occ)
            .map(|(slot, _)| {
                (
                    slot,
                    self.keys[slot],
                    self.counts[slot].load(Ordering::Relaxed),
                )
            })
    }

    /// Largest count held by any slot.
    pub fn max_count(&self) -> u64 {
        self.counts
            .par_iter()
            .map(|c| c.load(Ordering::Relaxed))
            .max()
            .unwrap_or(0)
    }
}

impl<S> MirrorIndex<S> {
    pub fn header(&self) -> &Header {
        &self.header
    }

    /// Number of occupied slots.
    pub fn occupied(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Current count of `key`, `None` when the key was never primed.
    pub fn get(&self, key: u64) -> Option<u64> {
        self.find(key)
            .map(|slot| self.counts[slot].load(Ordering::Relaxed))
    }

    /// Effective saturation bound for a configured `limit`.
    #[inline]
    pub fn bound(&self, limit: u64) -> u64 {
        let max = self.header.max_value();
        if limit == 0 { max } else { limit.min(max) }
    }

    #[inline]
    fn home(&self, key: u64) -> u64 {
        self.header.matrix().hash(key) % self.header.capacity()
    }

    /// Largest distance from home a key may sit at. Steps past `capacity - 1`
    /// would only revisit slots.
    #[inline]
    fn reach(&self) -> u64 {
        (self.header.max_reprobe() as u64).min(self.header.capacity() - 1)
    }

    fn find(&self, key: u64) -> Option<usize> {
        let cap = self.header.capacity();
        let mut slot = self.home(key);
        for _ in 0..=self.reach() {
            let at = slot as usize;
            if !self.occupied[at] {
                return None;
            }
            if self.keys[at] == key {
                return Some(at);
            }
            slot = (slot + 1) % cap;
        }
        None
    }

    fn transition<T>(self) -> MirrorIndex<T> {
        MirrorIndex {
            header: self.header,
            keys: self.keys,
            occupied: self.occupied,
            counts: self.counts,
            len: self.len,
            _state: PhantomData,
        }
    }
}
