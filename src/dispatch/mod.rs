//! Dispatch strategies
//!
//! A dispatcher takes the ordered work units of a run, has every unit counted
//! exactly once, and reduces the partial tables into one. Three strategies
//! share the [`Dispatcher`] contract:
//!
//! - [`ProcessPool`]: one unit per request, fed to a fixed pool of child processes
//! - [`HybridPool`]: one contiguous block per child process, counted on a
//!   thread pool inside the child
//! - [`RpcPool`]: units sent round-robin to remote word-count services
//!
//! In every strategy the partials flow back over a channel to a single
//! accumulator owned by the calling thread; nothing else touches the running
//! total. Any failure aborts the run and the partial total is discarded.

pub mod child;
pub mod hybrid;
pub mod process_pool;
pub mod rpc;

pub use child::{run_child_worker, ChildWorker, WorkerCommand};
pub use hybrid::HybridPool;
pub use process_pool::ProcessPool;
pub use rpc::RpcPool;

use crate::chunker::WorkUnit;
use crate::count::{merge_counts, CountMapping};
use crate::error::WordFreqError;
use anyhow::Result;
use crossbeam::channel::Receiver;
use std::sync::atomic::{AtomicBool, Ordering};

/// Distributes work units and collects the merged count table
pub trait Dispatcher {
    /// Strategy name for logs and reports
    fn name(&self) -> &'static str;

    /// Count every unit exactly once and merge the partials
    ///
    /// An empty input returns an empty table without starting any worker.
    fn distribute(&self, units: Vec<WorkUnit>) -> Result<CountMapping>;
}

/// Drain partials from local workers into one table
///
/// Sets `stop` and returns on the first failure. `expected` is the number of
/// partials the workers owe; a shortfall means a worker exited without
/// reporting, which is treated as a failure.
pub(crate) fn collect_partials(
    results: Receiver<Result<CountMapping>>,
    expected: usize,
    stop: &AtomicBool,
) -> Result<CountMapping> {
    let mut total = CountMapping::new();
    let mut received = 0;

    for result in results {
        match result {
            Ok(partial) => {
                merge_counts(&mut total, partial);
                received += 1;
            }
            Err(e) => {
                stop.store(true, Ordering::Relaxed);
                return Err(e);
            }
        }
    }

    if received != expected {
        return Err(WordFreqError::worker_failed(
            "pool",
            format!("received {} of {} partial results", received, expected),
        )
        .into());
    }

    Ok(total)
}
