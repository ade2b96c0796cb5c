//! Approximate string metrics used by the fuzzy strategies.

use rustc_hash::FxHashSet;

/// Damerau-Levenshtein distance.
///
/// Counts insertions, deletions, substitutions and transpositions of two
/// adjacent characters. Unlike optimal string alignment, a transposed pair
/// may be edited again. Works on Unicode scalar values, not bytes.
pub fn damerau_levenshtein(a: &str, b: &str) -> usize {
    strsim::damerau_levenshtein(a, b)
}

/// [`damerau_levenshtein`] over pre-split characters.
pub fn damerau_levenshtein_chars(a: &[char], b: &[char]) -> usize {
    strsim::generic_damerau_levenshtein(a, b)
}

/// Set of character n-grams of `s`.
///
/// A string shorter than `n` contributes itself as its only gram, so short
/// names still compare.
pub fn char_ngrams(s: &str, n: usize) -> FxHashSet<String> {
    let n = n.max(1);
    let chars: Vec<char> = s.chars().collect();
    if chars.is_empty() {
        return FxHashSet::default();
    }
    if chars.len() < n {
        return std::iter::once(s.to_string()).collect();
    }
    chars.windows(n).map(|w| w.iter().collect()).collect()
}

/// |A ∩ B| / |A ∪ B|; two empty sets have similarity 0.
pub fn jaccard_sets(a: &FxHashSet<String>, b: &FxHashSet<String>) -> f64 {
    let union = a.union(b).count();
    if union == 0 {
        return 0.0;
    }
    a.intersection(b).count() as f64 / union as f64
}

/// Jaccard similarity of the character n-gram sets of `a` and `b`.
pub fn jaccard_similarity(a: &str, b: &str, n: usize) -> f64 {
    jaccard_sets(&char_ngrams(a, n), &char_ngrams(b, n))
}
