//! Top-N selection over a merged count table

use crate::count::CountMapping;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

/// One row of the final ranking
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RankedEntry {
    pub word: String,
    pub count: u64,
}

/// Count descending, then word ascending
fn rank_order(a: &RankedEntry, b: &RankedEntry) -> Ordering {
    b.count.cmp(&a.count).then_with(|| a.word.cmp(&b.word))
}

/// The `n` most frequent words, ties broken lexicographically
///
/// Returns `min(n, counts.len())` entries.
pub fn top_n(counts: &CountMapping, n: usize) -> Vec<RankedEntry> {
    if n == 0 || counts.is_empty() {
        return Vec::new();
    }

    let mut entries: Vec<RankedEntry> = counts
        .iter()
        .map(|(word, &count)| RankedEntry {
            word: word.clone(),
            count,
        })
        .collect();

    if n < entries.len() {
        entries.select_nth_unstable_by(n - 1, rank_order);
        entries.truncate(n);
    }
    entries.sort_unstable_by(rank_order);
    entries
}
