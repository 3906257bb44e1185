//! Hybrid process + thread pool
//!
//! Units are cut into contiguous, near-equal blocks, one per child process
//! (the last block may be smaller). Each child counts its block on a
//! fixed-size thread pool, merges the per-chunk partials itself and returns a
//! single partial. Process creation stays bounded while every process still
//! uses several cores.

use super::child::{ChildWorker, WorkerCommand};
use super::{collect_partials, Dispatcher};
use crate::chunker::WorkUnit;
use crate::count::CountMapping;
use crate::error::WordFreqError;
use anyhow::{Context, Result};
use crossbeam::channel::{self, Sender};
use std::sync::atomic::AtomicBool;
use std::thread;

pub struct HybridPool {
    processes: usize,
    threads: usize,
    command: WorkerCommand,
}

impl HybridPool {
    pub fn new(processes: usize, threads: usize, command: WorkerCommand) -> Result<Self> {
        if processes == 0 {
            return Err(WordFreqError::config("process count must be at least 1").into());
        }
        if threads == 0 {
            return Err(WordFreqError::config("thread count must be at least 1").into());
        }
        Ok(Self {
            processes,
            threads,
            command,
        })
    }
}

/// Split `units` into blocks of `ceil(len / processes)` texts
pub fn partition_blocks(units: Vec<WorkUnit>, processes: usize) -> Vec<Vec<String>> {
    if units.is_empty() {
        return Vec::new();
    }
    let per_block = units.len().div_ceil(processes.max(1));

    let mut blocks = Vec::with_capacity(processes);
    let mut texts = units.into_iter().map(|unit| unit.text).peekable();
    while texts.peek().is_some() {
        blocks.push(texts.by_ref().take(per_block).collect());
    }
    blocks
}

impl Dispatcher for HybridPool {
    fn name(&self) -> &'static str {
        "hybrid"
    }

    fn distribute(&self, units: Vec<WorkUnit>) -> Result<CountMapping> {
        if units.is_empty() {
            return Ok(CountMapping::new());
        }

        let total = units.len();
        let blocks = partition_blocks(units, self.processes);
        let block_count = blocks.len();
        tracing::info!(
            units = total,
            blocks = block_count,
            threads = self.threads,
            "dispatching to hybrid pool"
        );

        let (result_tx, result_rx) = channel::unbounded();
        let stop = AtomicBool::new(false);

        thread::scope(|scope| {
            for (id, block) in blocks.into_iter().enumerate() {
                let result_tx = result_tx.clone();
                let command = &self.command;
                let threads = self.threads;
                thread::Builder::new()
                    .name(format!("block-feeder-{}", id))
                    .spawn_scoped(scope, move || run_block(id, command, threads, block, result_tx))
                    .context("Failed to spawn feeder thread")?;
            }
            drop(result_tx);

            collect_partials(result_rx, block_count, &stop)
        })
    }
}

/// Count one block in its own child process
fn run_block(
    id: usize,
    command: &WorkerCommand,
    threads: usize,
    block: Vec<String>,
    results: Sender<Result<CountMapping>>,
) {
    let units = block.len();
    let partial = ChildWorker::spawn(id, command, threads).and_then(|mut child| {
        let partial = child
            .map_block(block)
            .with_context(|| format!("Failed to count block {} ({} units)", id, units))?;
        if let Err(e) = child.shutdown() {
            tracing::warn!(worker = id, "{:#}", e);
        }
        Ok(partial)
    });

    tracing::debug!(worker = id, units, ok = partial.is_ok(), "block done");
    let _ = results.send(partial);
}
