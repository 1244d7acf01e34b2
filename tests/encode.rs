use kmer_mirror::encode::*;
use kmer_mirror::MirrorError;

#[test]
fn test_encode_revcomp_canonical() {
    let code = encode(b"AC").unwrap();
    assert_eq!(code, 0b0001);

    let rc = revcomp(code, 2);
    assert_eq!(rc, 0b1011); // GT

    assert_eq!(canonical(code, 2), 0b0001);
    assert_eq!(canonical(rc, 2), 0b0001);
}

#[test]
fn encode_is_case_insensitive_and_decodes_upper() {
    let lower = encode(b"gattaca").unwrap();
    assert_eq!(lower, encode(b"GATTACA").unwrap());
    assert_eq!(decode(lower, 7), "GATTACA");
}

#[test]
fn encode_rejects_non_nucleotides() {
    match encode(b"ACNT") {
        Err(MirrorError::InvalidNucleotide { byte, position }) => {
            assert_eq!(byte, b'N');
            assert_eq!(position, 2);
        }
        other => panic!("unexpected {other:?}"),
    }
    assert!(matches!(encode(b""), Err(MirrorError::InvalidConfig(_))));
    assert!(matches!(encode(&[b'A'; 33]), Err(MirrorError::InvalidConfig(_))));
}

#[test]
fn full_width_kmers_roundtrip() {
    let s = b"ACGTACGTACGTACGTACGTACGTACGTTTTT";
    let code = encode(s).unwrap();
    assert_eq!(decode(code, 32).as_bytes(), s);
    assert_eq!(revcomp(revcomp(code, 32), 32), code);
}

#[test]
fn kmers_slide_with_stride_one() {
    let got: Vec<String> = Kmers::new(b"ACGTA", 3, false).map(|c| decode(c, 3)).collect();
    assert_eq!(got, ["ACG", "CGT", "GTA"]);
    assert_eq!(windows(5, 3), 3);
    assert_eq!(windows(2, 3), 0);
}

#[test]
fn kmers_skip_windows_with_invalid_bases() {
    // 9 windows of length 3, the N at position 4 kills windows 2..=4
    let seq = b"ACGTNACGTAC";
    let got: Vec<String> = Kmers::new(seq, 3, false).map(|c| decode(c, 3)).collect();
    assert_eq!(got, ["ACG", "CGT", "ACG", "CGT", "GTA", "TAC"]);
    assert_eq!(windows(seq.len(), 3) - got.len(), 3);
}

#[test]
fn canonical_kmers_match_both_strands() {
    let fwd: Vec<u64> = Kmers::new(b"AAGGC", 4, true).collect();
    // reverse complement of AAGGC
    let mut rev: Vec<u64> = Kmers::new(b"GCCTT", 4, true).collect();
    rev.reverse();
    assert_eq!(fwd, rev);
    for (c, raw) in fwd.iter().zip(Kmers::new(b"AAGGC", 4, false)) {
        assert_eq!(*c, canonical(raw, 4));
    }
}
