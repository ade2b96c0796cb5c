#![no_main]

use arbitrary::Arbitrary;
use fsweep::matching::{damerau_levenshtein, jaccard_similarity};
use libfuzzer_sys::fuzz_target;

#[derive(Arbitrary, Debug)]
struct Pair<'a> {
    a: &'a str,
    b: &'a str,
    ngram: u8,
}

fuzz_target!(|pair: Pair| {
    let d = damerau_levenshtein(pair.a, pair.b);
    let a_len = pair.a.chars().count();
    let b_len = pair.b.chars().count();

    assert_eq!(damerau_levenshtein(pair.a, pair.a), 0);
    assert!(d <= a_len.max(b_len));
    assert!(d >= a_len.abs_diff(b_len));
    assert_eq!(d, damerau_levenshtein(pair.b, pair.a));

    let s = jaccard_similarity(pair.a, pair.b, usize::from(pair.ngram % 4) + 1);
    assert!((0.0..=1.0).contains(&s));
});
