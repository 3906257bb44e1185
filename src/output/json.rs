//! JSON report output

use crate::rank::RankedEntry;
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::io::Write;

/// Complete JSON report for one run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JsonReport {
    pub generated_at: DateTime<Utc>,
    /// Dispatch strategy name
    pub strategy: String,
    /// Input files read
    pub files: usize,
    /// Work units dispatched
    pub units: usize,
    pub distinct_words: usize,
    pub total_words: u64,
    pub top: Vec<RankedEntry>,
}

impl JsonReport {
    /// Write the report as pretty-printed JSON followed by a newline
    pub fn write<W: Write>(&self, out: &mut W) -> Result<()> {
        serde_json::to_writer_pretty(&mut *out, self).context("Failed to serialize JSON report")?;
        writeln!(out).context("Failed to write report")?;
        out.flush().context("Failed to flush report")?;
        Ok(())
    }
}
