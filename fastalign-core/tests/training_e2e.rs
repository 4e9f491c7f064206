use std::fs;

use fastalign_core::{align, grow_diag_final_and, write_moses_pairs, AlignError, AlignOptions, Aligner, Corpus, Interner, Pass};

const MONOTONE: &str = "a b c ||| x y z\n\
                        a b ||| x y\n\
                        b c ||| y z\n\
                        a c ||| x z\n\
                        a ||| x\n\
                        b ||| y\n\
                        c ||| z\n";

#[test]
fn two_by_two_rows_sum_to_one() {
    let opts = AlignOptions { iterations: 1, ..AlignOptions::default() };
    let mut aligner = Aligner::new(opts).unwrap();
    aligner.train(&Corpus::Text("a b ||| x y\n")).unwrap();

    let d = aligner.dict();
    let t = aligner.ttable();
    let id = |w: &str| d.get(w).unwrap();
    let (a, b, x, y) = (id("a"), id("b"), id("x"), id("y"));
    assert!((t.prob(a, x) + t.prob(a, y) - 1.0).abs() < 1e-9);
    assert!((t.prob(b, x) + t.prob(b, y) - 1.0).abs() < 1e-9);
    assert!((t.prob(a, x) - 0.5).abs() < 1e-9);
}

#[test]
fn likelihood_never_decreases_without_tension_updates() {
    let corpus = "the house ||| das haus\n\
                  the book ||| das buch\n\
                  a book ||| ein buch\n\
                  a small house ||| ein kleines haus\n\
                  the small book ||| das kleine buch\n";
    for favor_diagonal in [false, true] {
        let opts = AlignOptions { iterations: 5, favor_diagonal, ..AlignOptions::default() };
        let res = align(&Corpus::Text(corpus), &opts).unwrap();
        assert_eq!(res.reports.len(), 6);
        for w in res.reports.windows(2) {
            assert!(
                w[1].likelihood >= w[0].likelihood - 1e-9 * w[0].likelihood.abs(),
                "{:?} -> {:?}",
                w[0],
                w[1]
            );
        }
    }
}

#[test]
fn monotone_corpus_aligns_on_the_diagonal() {
    let opts = AlignOptions { favor_diagonal: true, optimize_tension: true, ..AlignOptions::default() };
    let res = align(&Corpus::Text(MONOTONE), &opts).unwrap();
    let out = res.to_moses();
    let lines: Vec<&str> = out.lines().collect();
    assert_eq!(lines.len(), 7);
    assert_eq!(lines[0], "0-0 1-1 2-2");
    assert_eq!(lines[3], "0-0 1-1");
}

#[test]
fn reverse_runs_report_original_orientation() {
    let corpus = Corpus::Text("a b ||| x\n");
    let fwd = AlignOptions { iterations: 2, no_null_word: true, ..AlignOptions::default() };
    assert_eq!(align(&corpus, &fwd).unwrap().to_moses(), "0-0\n");

    let rev = AlignOptions { reverse: true, ..fwd };
    let res = align(&corpus, &rev).unwrap();
    // conditioned on "x": both source words pick it
    assert_eq!(res.links, vec![vec![0, 0]]);
    assert_eq!(res.to_moses(), "0-0 1-0\n");
}

#[test]
fn null_wins_ties_and_produces_empty_lines() {
    // one source and one target word: null and "a" look identical to EM
    let res = align(&Corpus::Text("a ||| x\n"), &AlignOptions::default()).unwrap();
    assert_eq!(res.to_moses(), "\n");
}

#[test]
fn malformed_line_aborts_training() {
    let corpus = Corpus::Text("a b ||| x y\nthis line has no separator\n");

    let mut aligner = Aligner::new(AlignOptions::default()).unwrap();
    let err = aligner.train(&corpus).unwrap_err();
    assert!(matches!(err, AlignError::MalformedLine { line_no: 2, .. }));
    assert!(err.to_string().contains("this line has no separator"));
}

#[test]
fn file_corpus_and_table_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let bitext = dir.path().join("corpus.fr-en");
    fs::write(&bitext, MONOTONE).unwrap();
    let table = dir.path().join("s2t.ttable");

    let opts = AlignOptions { variational_bayes: true, favor_diagonal: true, ..AlignOptions::default() };
    let mut aligner = Aligner::new(opts.clone()).unwrap();
    let trained = aligner.train(&Corpus::File(bitext.clone())).unwrap();
    aligner.export_table(&table).unwrap();

    // seeding a decoding-only run with the exported table reproduces the alignment
    let mut seeded = Aligner::new(AlignOptions { iterations: 0, ..opts }).unwrap();
    seeded.import_table(&table).unwrap();
    let decoded = seeded.train(&Corpus::File(bitext)).unwrap();
    assert_eq!(decoded.reports.len(), 1);
    assert_eq!(decoded.reports[0].pass, Pass::Decoding);
    assert_eq!(decoded.to_moses(), trained.to_moses());

    let again = dir.path().join("again.ttable");
    seeded.export_table(&again).unwrap();
    assert_eq!(fs::read(&table).unwrap(), fs::read(&again).unwrap());
}

#[test]
fn missing_corpus_file_is_fatal() {
    let err = align(&Corpus::File("/nonexistent/corpus".into()), &AlignOptions::default()).unwrap_err();
    assert!(matches!(err, AlignError::CorpusRead { .. }));
}

#[test]
fn forward_and_reverse_symmetrize() {
    let opts = AlignOptions { favor_diagonal: true, ..AlignOptions::default() };
    let fwd = align(&Corpus::Text(MONOTONE), &opts).unwrap();
    let rev = align(&Corpus::Text(MONOTONE), &AlignOptions { reverse: true, ..opts }).unwrap();
    let merged = grow_diag_final_and(&fwd.links, &rev.links).unwrap();
    let out = write_moses_pairs(&merged);
    assert_eq!(out.lines().next(), Some("0-0 1-1 2-2"));
}

#[test]
fn custom_interner_is_used_for_export() {
    #[derive(Default)]
    struct Upper(fastalign_core::Dict);
    impl Interner for Upper {
        fn intern(&mut self, word: &str) -> u32 {
            self.0.intern(&word.to_uppercase())
        }
        fn lookup(&self, id: u32) -> Option<&str> {
            self.0.lookup(id)
        }
        fn len(&self) -> usize {
            self.0.len()
        }
    }

    let mut aligner = Aligner::with_dict(AlignOptions { iterations: 1, ..AlignOptions::default() }, Upper::default()).unwrap();
    aligner.train(&Corpus::Text("a ||| x\n")).unwrap();
    let mut buf = Vec::new();
    aligner.ttable().export_to_writer(&mut buf, aligner.dict()).unwrap();
    let text = String::from_utf8(buf).unwrap();
    assert!(text.contains("A\tX\t"));
    assert!(text.contains("<EPS>\tX\t"));
}
