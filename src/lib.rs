//! wordfreq - map-reduce word frequency counter
//!
//! Counts alphabetic words across a directory of `.txt` files. The input is
//! split into work units, counted by a pool of workers and merged into one
//! table, from which the top N words are reported.
//!
//! # Architecture
//!
//! - **Map**: [`count::count_words`] on one work unit
//! - **Reduce**: [`count::merge_counts`], associative and commutative
//! - **Dispatch strategies**: local process pool, hybrid process + thread pool,
//!   remote word-count services over TCP
//! - **Service mode**: the same binary serves map requests for remote dispatchers

pub mod chunker;
pub mod config;
pub mod coordinator;
pub mod corpus;
pub mod count;
pub mod dispatch;
pub mod distributed;
pub mod error;
pub mod output;
pub mod rank;
pub mod util;

// Re-export commonly used types
pub use chunker::WorkUnit;
pub use config::Config;
pub use count::CountMapping;
pub use dispatch::Dispatcher;
pub use error::WordFreqError;

/// Result type used throughout wordfreq
pub type Result<T> = anyhow::Result<T>;
