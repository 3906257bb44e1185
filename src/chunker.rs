//! Splitting input text into bounded work units
//!
//! Each file becomes one or more [`WorkUnit`]s of roughly `target_size` bytes.
//! A split point is pushed forward past the target until it sits on a
//! character that is not alphabetic, so a word never straddles two units.
//! Concatenating the units of one file reproduces it exactly.

use serde::{Deserialize, Serialize};

/// Default chunk size in bytes
pub const DEFAULT_CHUNK_SIZE: usize = 200_000;

/// One piece of text handed to a single counter invocation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkUnit {
    /// File the text came from (traceability only)
    pub origin: String,
    pub text: String,
}

/// Split a single text into chunk slices
///
/// Texts at or below `target_size` are returned whole. A word longer than
/// `target_size` yields one oversized slice. `target_size` must be non-zero.
pub fn chunk_text(text: &str, target_size: usize) -> Vec<&str> {
    debug_assert!(target_size > 0);
    if text.len() <= target_size {
        return vec![text];
    }

    let mut chunks = Vec::with_capacity(text.len() / target_size + 1);
    let mut start = 0;
    while start < text.len() {
        let end = split_point(text, start, target_size.max(1));
        chunks.push(&text[start..end]);
        start = end;
    }
    chunks
}

/// First offset at or after `start + target_size` that is a char boundary not
/// followed by an alphabetic char
fn split_point(text: &str, start: usize, target_size: usize) -> usize {
    let mut end = start.saturating_add(target_size).min(text.len());
    while !text.is_char_boundary(end) {
        end += 1;
    }
    match text[end..].char_indices().find(|(_, c)| !c.is_alphabetic()) {
        Some((offset, _)) => end + offset,
        None => text.len(),
    }
}

/// Turn an ordered list of `(origin, content)` pairs into work units
///
/// Empty contents produce no units.
pub fn chunk_files<I, O>(files: I, target_size: usize) -> Vec<WorkUnit>
where
    I: IntoIterator<Item = (O, String)>,
    O: Into<String>,
{
    let mut units = Vec::new();
    for (origin, content) in files {
        if content.is_empty() {
            continue;
        }
        let origin = origin.into();
        if content.len() <= target_size {
            units.push(WorkUnit { origin, text: content });
            continue;
        }
        units.extend(chunk_text(&content, target_size).into_iter().map(|text| WorkUnit {
            origin: origin.clone(),
            text: text.to_string(),
        }));
    }
    units
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::count::{count_words, merge_all};

    fn assert_boundaries_safe(text: &str, chunks: &[&str]) {
        assert_eq!(chunks.concat(), text);
        for pair in chunks.windows(2) {
            let left = pair[0].chars().last().unwrap();
            let right = pair[1].chars().next().unwrap();
            assert!(
                !(left.is_alphabetic() && right.is_alphabetic()),
                "word split between {:?} and {:?}",
                pair[0],
                pair[1]
            );
        }
    }

    #[test]
    fn test_small_text_is_one_chunk() {
        assert_eq!(chunk_text("hello world", 100), vec!["hello world"]);
        assert_eq!(chunk_text("hello", 5), vec!["hello"]);
    }

    #[test]
    fn test_boundary_extends_past_word() {
        let chunks = chunk_text("abcdef ghi jkl", 3);
        assert_eq!(chunks, vec!["abcdef", " ghi", " jkl"]);
        assert_boundaries_safe("abcdef ghi jkl", &chunks);
    }

    #[test]
    fn test_oversized_word_stays_whole() {
        let word = "x".repeat(50);
        let text = format!("{} tail", word);
        let chunks = chunk_text(&text, 10);
        assert_eq!(chunks[0], word);
        assert_boundaries_safe(&text, &chunks);
    }

    #[test]
    fn test_boundaries_respect_utf8() {
        let text = "ééé ààà ééé ààà über straße";
        for size in 1..text.len() + 2 {
            let chunks = chunk_text(text, size);
            assert_boundaries_safe(text, &chunks);
        }
    }

    #[test]
    fn test_chunking_preserves_counts() {
        let text = "It was the best of times, it was the worst of times; \
                    it was the age of wisdom, it was the age of foolishness. "
            .repeat(20);
        let whole = count_words(&text);
        for size in [1, 7, 64, 500, 10_000] {
            let chunks = chunk_text(&text, size);
            assert_boundaries_safe(&text, &chunks);
            assert_eq!(merge_all(chunks.iter().map(|c| count_words(c))), whole);
        }
    }

    #[test]
    fn test_chunk_files_keeps_origin_and_order() {
        let files = vec![
            ("a.txt", "one two three four five six".to_string()),
            ("b.txt", String::new()),
            ("c.txt", "seven".to_string()),
        ];
        let units = chunk_files(files, 8);
        assert!(units.len() > 2);
        assert_eq!(units.last().unwrap(), &WorkUnit { origin: "c.txt".into(), text: "seven".into() });
        assert!(units.iter().all(|u| u.origin != "b.txt"));
        let a: String = units.iter().filter(|u| u.origin == "a.txt").map(|u| u.text.as_str()).collect();
        assert_eq!(a, "one two three four five six");
    }

    #[test]
    fn test_chunk_files_empty() {
        let none: Vec<(String, String)> = Vec::new();
        assert!(chunk_files(none, DEFAULT_CHUNK_SIZE).is_empty());
        assert!(chunk_files(vec![("x.txt", String::new())], DEFAULT_CHUNK_SIZE).is_empty());
    }
}
