//! Word counting and partial-count reduction
//!
//! A word is a maximal run of ASCII letters, folded to lowercase. Every other
//! byte (digits, punctuation, whitespace, non-ASCII) separates words.
//!
//! Merging is a per-key sum, so it is commutative and associative: the final
//! table does not depend on how the text was chunked or in which order the
//! partials arrive.

use std::collections::HashMap;

/// Word -> occurrence count
pub type CountMapping = HashMap<String, u64>;

/// Iterate the lowercase words of `text` in order
pub fn tokenize(text: &str) -> impl Iterator<Item = String> + '_ {
    text.split(|c: char| !c.is_ascii_alphabetic())
        .filter(|word| !word.is_empty())
        .map(|word| word.to_ascii_lowercase())
}

/// Count word occurrences in `text`
pub fn count_words(text: &str) -> CountMapping {
    let mut counts = CountMapping::new();
    for word in tokenize(text) {
        *counts.entry(word).or_insert(0) += 1;
    }
    counts
}

/// Add every count in `source` into `target`
pub fn merge_counts(target: &mut CountMapping, source: CountMapping) {
    if target.is_empty() {
        *target = source;
        return;
    }
    for (word, count) in source {
        *target.entry(word).or_insert(0) += count;
    }
}

/// Reduce any number of partials into one table
pub fn merge_all<I>(partials: I) -> CountMapping
where
    I: IntoIterator<Item = CountMapping>,
{
    partials.into_iter().fold(CountMapping::new(), |mut acc, partial| {
        merge_counts(&mut acc, partial);
        acc
    })
}

/// Total number of word occurrences in a table
pub fn total_words(counts: &CountMapping) -> u64 {
    counts.values().sum()
}
