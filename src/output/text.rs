//! Plain-text ranking output

use crate::count::CountMapping;
use crate::rank::{top_n, RankedEntry};
use anyhow::{Context, Result};
use std::io::Write;

/// Render the top `n` words of `counts`, one `word\tcount` line each
///
/// Lines are joined with `\n` and carry no trailing newline, so an empty
/// table renders as an empty string.
pub fn format_top_n(counts: &CountMapping, n: usize) -> String {
    top_n(counts, n)
        .iter()
        .map(|entry| format!("{}\t{}", entry.word, entry.count))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Write ranked entries as newline-terminated `word\tcount` lines
pub fn write_text_report<W: Write>(out: &mut W, entries: &[RankedEntry]) -> Result<()> {
    for entry in entries {
        writeln!(out, "{}\t{}", entry.word, entry.count).context("Failed to write report")?;
    }
    out.flush().context("Failed to flush report")?;
    Ok(())
}
