mod common;

use common::*;
use kmer_mirror::*;
use proptest::prelude::*;
use std::collections::HashMap;

/// Naive window scan as a baseline for the rolling iterator.
fn naive_scan(seq: &[u8], k: usize, canonical_mode: bool) -> Vec<u64> {
    if seq.len() < k {
        return Vec::new();
    }
    seq.windows(k)
        .filter_map(|w| encode(w).ok())
        .map(|code| if canonical_mode { canonical(code, k) } else { code })
        .collect()
}

proptest! {
    #[test]
    fn prop_rolling_matches_naive(
        k in 1usize..=32,
        canonical_mode in any::<bool>(),
        seq in prop::collection::vec(prop::sample::select(b"ACGTNacgt".to_vec()), 0..200)
    ) {
        let rolled: Vec<u64> = encode::Kmers::new(&seq, k, canonical_mode).collect();
        prop_assert_eq!(rolled, naive_scan(&seq, k, canonical_mode));
    }

    #[test]
    fn prop_revcomp_is_an_involution(
        seq in prop::collection::vec(prop::sample::select(b"ACGT".to_vec()), 1..=32)
    ) {
        let k = seq.len();
        let code = encode(&seq).unwrap();
        prop_assert_eq!(revcomp(revcomp(code, k), k), code);
        prop_assert_eq!(canonical(code, k), canonical(revcomp(code, k), k));
        let decoded = decode(code, k);
        prop_assert_eq!(decoded.as_bytes(), &seq[..]);
    }

    #[test]
    fn prop_revcomp_matches_reversed_complemented_string(
        seq in prop::collection::vec(prop::sample::select(b"ACGT".to_vec()), 1..=32)
    ) {
        let k = seq.len();
        let rc: Vec<u8> = seq
            .iter()
            .rev()
            .map(|&b| match b {
                b'A' => b'T',
                b'C' => b'G',
                b'G' => b'C',
                _ => b'A',
            })
            .collect();
        prop_assert_eq!(revcomp(encode(&seq).unwrap(), k), encode(&rc).unwrap());
    }

    #[test]
    fn prop_layout_is_independent_of_priming_order(
        raw in prop::collection::hash_set(0u64..256, 1..=24),
        rotation in 0usize..24,
    ) {
        // 4-mers into 32 slots, full reach so priming never runs out
        let mut ks: Vec<u64> = raw.into_iter().collect();
        ks.sort_unstable();
        let layout = |order: &[u64]| -> Vec<(usize, u64)> {
            primed(header(4, 8, 32, 32), order)
                .mark_done()
                .iter_occupied()
                .map(|(s, k, _)| (s, k))
                .collect()
        };
        let base = layout(&ks);
        let mut other = ks.clone();
        other.reverse();
        let len = other.len();
        other.rotate_left(rotation % len);
        prop_assert_eq!(layout(&other), base.clone());

        // priming again in dumped (slot) order gives the same slots
        let dumped: Vec<u64> = base.iter().map(|&(_, k)| k).collect();
        prop_assert_eq!(layout(&dumped), base);
    }

    #[test]
    fn prop_saturation_is_min_of_occurrences_and_limit(n in 0u64..64, limit in 0u64..32) {
        let key = encode(b"ACGTA").unwrap();
        let idx = primed(header(5, 16, 16, 8), &[key]);
        for _ in 0..n {
            idx.try_increment(key, 1, limit);
        }
        let expected = if limit == 0 { n } else { n.min(limit) };
        prop_assert_eq!(idx.get(key), Some(expected));
    }

    #[test]
    fn prop_counts_are_order_independent(
        reads in prop::collection::vec(
            prop::collection::vec(prop::sample::select(b"ACGT".to_vec()), 3..40),
            1..12
        ),
        threads in 1usize..4,
        limit in 0u64..6,
        canonical_mode in any::<bool>(),
    ) {
        let k = 3;
        // reference: every k-mer of the first read
        let mut ks: Vec<u64> = encode::Kmers::new(&reads[0], k, canonical_mode).collect();
        ks.sort_unstable();
        ks.dedup();

        let mut expected: HashMap<u64, u64> = ks.iter().map(|&key| (key, 0)).collect();
        for r in &reads {
            for code in naive_scan(r, k, canonical_mode) {
                if let Some(c) = expected.get_mut(&code) {
                    *c += 1;
                }
            }
        }

        let mut shuffled = reads.clone();
        shuffled.reverse();
        let source: Vec<Result<Vec<u8>>> = shuffled.into_iter().map(Ok).collect();
        let idx = primed(header(k, 16, 128, 64), &ks);
        let cfg = CountConfig::default()
            .threads(threads)
            .limit(limit)
            .canonical(canonical_mode)
            .batch_size(2);
        let (done, _) = Counter::new(cfg).run(idx, source).unwrap();

        prop_assert_eq!(done.occupied(), ks.len());
        for (key, n) in expected {
            let want = if limit == 0 { n } else { n.min(limit) };
            prop_assert_eq!(done.get(key), Some(want));
        }
    }
}
