//! Local process pool
//!
//! A fixed number of child processes pull units one at a time from a shared
//! queue, so whichever process is idle takes the next unit. Each reply is a
//! partial table that goes straight to the coordinator's accumulator.

use super::child::{ChildWorker, WorkerCommand};
use super::{collect_partials, Dispatcher};
use crate::chunker::WorkUnit;
use crate::count::CountMapping;
use crate::error::WordFreqError;
use anyhow::{Context, Result};
use crossbeam::channel::{self, Receiver, Sender};
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;

pub struct ProcessPool {
    processes: usize,
    command: WorkerCommand,
}

impl ProcessPool {
    pub fn new(processes: usize, command: WorkerCommand) -> Result<Self> {
        if processes == 0 {
            return Err(WordFreqError::config("process count must be at least 1").into());
        }
        Ok(Self { processes, command })
    }
}

impl Dispatcher for ProcessPool {
    fn name(&self) -> &'static str {
        "process"
    }

    fn distribute(&self, units: Vec<WorkUnit>) -> Result<CountMapping> {
        if units.is_empty() {
            return Ok(CountMapping::new());
        }

        let total = units.len();
        let workers = self.processes.min(total);
        tracing::info!(units = total, processes = workers, "dispatching to process pool");

        let (unit_tx, unit_rx) = channel::bounded(total);
        for unit in units {
            unit_tx
                .send(unit)
                .map_err(|_| anyhow::anyhow!("work queue closed while filling"))?;
        }
        drop(unit_tx);

        let (result_tx, result_rx) = channel::unbounded();
        let stop = AtomicBool::new(false);

        thread::scope(|scope| {
            for id in 0..workers {
                let unit_rx = unit_rx.clone();
                let result_tx = result_tx.clone();
                let stop = &stop;
                let command = &self.command;
                thread::Builder::new()
                    .name(format!("pool-feeder-{}", id))
                    .spawn_scoped(scope, move || feed_child(id, command, unit_rx, result_tx, stop))
                    .context("Failed to spawn feeder thread")?;
            }
            drop(result_tx);

            collect_partials(result_rx, total, &stop)
        })
    }
}

/// Drive one child process: hand it units until the queue is empty or the
/// run is stopping
fn feed_child(
    id: usize,
    command: &WorkerCommand,
    units: Receiver<WorkUnit>,
    results: Sender<Result<CountMapping>>,
    stop: &AtomicBool,
) {
    let mut child = match ChildWorker::spawn(id, command, 1) {
        Ok(child) => child,
        Err(e) => {
            stop.store(true, Ordering::Relaxed);
            let _ = results.send(Err(e));
            return;
        }
    };

    let mut handled = 0usize;
    while !stop.load(Ordering::Relaxed) {
        let Ok(unit) = units.recv() else {
            break;
        };
        let origin = unit.origin;
        let partial = child
            .map_chunk(unit.text)
            .with_context(|| format!("Failed to count a chunk of {}", origin));

        let failed = partial.is_err();
        if failed {
            stop.store(true, Ordering::Relaxed);
        }
        if results.send(partial).is_err() || failed {
            break;
        }
        handled += 1;
    }

    tracing::debug!(worker = id, units = handled, "worker process done");
    if let Err(e) = child.shutdown() {
        tracing::warn!(worker = id, "{:#}", e);
    }
}
