//! Coordinator module
//!
//! Runs one counting job end to end:
//! directory → file contents → work units → dispatcher → merged table.

use crate::chunker::chunk_files;
use crate::config::{Config, Strategy};
use crate::corpus;
use crate::count::{total_words, CountMapping};
use crate::dispatch::{Dispatcher, HybridPool, ProcessPool, RpcPool, WorkerCommand};
use crate::error::WordFreqError;
use crate::output::JsonReport;
use crate::rank::top_n;
use anyhow::{Context, Result};
use std::time::Instant;

/// Outcome of a run
#[derive(Debug, Clone)]
pub struct RunSummary {
    pub strategy: &'static str,
    pub files: usize,
    pub units: usize,
    pub counts: CountMapping,
}

impl RunSummary {
    pub fn json_report(&self, top: usize) -> JsonReport {
        JsonReport {
            generated_at: chrono::Utc::now(),
            strategy: self.strategy.to_string(),
            files: self.files,
            units: self.units,
            distinct_words: self.counts.len(),
            total_words: total_words(&self.counts),
            top: top_n(&self.counts, top),
        }
    }
}

/// Build the dispatcher for `strategy` from the configuration
///
/// `command` starts the child processes of the local strategies and is
/// unused for RPC.
pub fn build_dispatcher(
    config: &Config,
    strategy: Strategy,
    command: WorkerCommand,
) -> Result<Box<dyn Dispatcher>> {
    let dispatcher: Box<dyn Dispatcher> = match strategy {
        Strategy::Process => Box::new(ProcessPool::new(config.local.processes, command)?),
        Strategy::Hybrid => Box::new(HybridPool::new(
            config.hybrid.processes,
            config.hybrid.threads,
            command,
        )?),
        Strategy::Rpc => Box::new(RpcPool::new(&config.rpc.endpoints)?),
    };
    Ok(dispatcher)
}

/// Read, chunk, dispatch and reduce the configured input directory
pub fn run(config: &Config, dispatcher: &dyn Dispatcher) -> Result<RunSummary> {
    let dir = config
        .input
        .dir
        .as_deref()
        .ok_or_else(|| WordFreqError::config("input directory is required (--data)"))?;

    let start = Instant::now();
    let files = corpus::load_directory(dir)?;
    let file_count = files.len();
    tracing::info!(dir = %dir.display(), files = file_count, "input loaded");

    let units = chunk_files(files, config.input.chunk_size);
    let unit_count = units.len();
    tracing::info!(
        units = unit_count,
        chunk_size = config.input.chunk_size,
        strategy = dispatcher.name(),
        "input chunked"
    );

    let counts = dispatcher
        .distribute(units)
        .with_context(|| format!("{} dispatch failed", dispatcher.name()))?;

    tracing::info!(
        distinct_words = counts.len(),
        elapsed_ms = start.elapsed().as_millis() as u64,
        "run complete"
    );

    Ok(RunSummary {
        strategy: dispatcher.name(),
        files: file_count,
        units: unit_count,
        counts,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chunker::WorkUnit;
    use crate::count::{count_words, merge_all};
    use std::cell::Cell;
    use std::fs;
    use tempfile::TempDir;

    /// Counts in-process and records how many units it saw
    struct InlineDispatcher {
        seen: Cell<usize>,
    }

    impl Dispatcher for InlineDispatcher {
        fn name(&self) -> &'static str {
            "inline"
        }

        fn distribute(&self, units: Vec<WorkUnit>) -> Result<CountMapping> {
            self.seen.set(units.len());
            Ok(merge_all(units.iter().map(|u| count_words(&u.text))))
        }
    }

    fn config_for(dir: &TempDir, chunk_size: usize) -> Config {
        let mut config = Config::default();
        config.input.dir = Some(dir.path().to_path_buf());
        config.input.chunk_size = chunk_size;
        config
    }

    #[test]
    fn test_run_counts_directory() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("a.txt"), "The cat. The hat!").unwrap();
        fs::write(dir.path().join("b.TXT"), "the end").unwrap();
        fs::write(dir.path().join("skip.md"), "ignored ignored").unwrap();

        let dispatcher = InlineDispatcher { seen: Cell::new(0) };
        let summary = run(&config_for(&dir, 4), &dispatcher).unwrap();

        assert_eq!(summary.files, 2);
        assert_eq!(summary.units, dispatcher.seen.get());
        assert!(summary.units > 2);
        assert_eq!(summary.counts["the"], 3);
        assert!(!summary.counts.contains_key("ignored"));

        let report = summary.json_report(1);
        assert_eq!(report.strategy, "inline");
        assert_eq!(report.total_words, 6);
        assert_eq!(report.top[0].word, "the");
    }

    #[test]
    fn test_empty_directory() {
        let dir = TempDir::new().unwrap();
        let dispatcher = InlineDispatcher { seen: Cell::new(99) };
        let summary = run(&config_for(&dir, 100), &dispatcher).unwrap();
        assert_eq!(summary.files, 0);
        assert_eq!(dispatcher.seen.get(), 0);
        assert!(summary.counts.is_empty());
    }

    #[test]
    fn test_build_dispatcher_per_strategy() {
        let dir = TempDir::new().unwrap();
        let mut config = config_for(&dir, 100);
        let cmd = WorkerCommand::new("wordfreq");

        assert_eq!(build_dispatcher(&config, Strategy::Process, cmd.clone()).unwrap().name(), "process");
        assert_eq!(build_dispatcher(&config, Strategy::Hybrid, cmd.clone()).unwrap().name(), "hybrid");
        assert!(build_dispatcher(&config, Strategy::Rpc, cmd.clone()).is_err());

        config.rpc.endpoints = vec!["http://127.0.0.1:9001".into()];
        assert_eq!(build_dispatcher(&config, Strategy::Rpc, cmd).unwrap().name(), "rpc");
    }
}
