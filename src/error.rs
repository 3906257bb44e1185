//! Error types for wordfreq
//!
//! Library code returns `anyhow::Result` and attaches context as errors cross
//! module boundaries. The variants here are the root causes callers may want
//! to match on (via `downcast_ref`), for example to tell a configuration
//! mistake apart from an unreachable worker.

use thiserror::Error;

/// Root error kinds for a word-count run
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum WordFreqError {
    /// Invalid or incomplete configuration, detected before dispatch
    #[error("Configuration error: {0}")]
    Config(String),

    /// A remote worker failed its pre-flight health check
    #[error("Worker unhealthy/unreachable: {endpoint}: {reason}")]
    EndpointUnhealthy { endpoint: String, reason: String },

    /// A local worker process or a remote call failed mid-run
    #[error("Worker {worker} failed: {reason}")]
    WorkerFailed { worker: String, reason: String },

    /// Unexpected or malformed message on the worker protocol
    #[error("Protocol error: {0}")]
    Protocol(String),
}

impl WordFreqError {
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    pub fn worker_failed(worker: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::WorkerFailed {
            worker: worker.into(),
            reason: reason.into(),
        }
    }
}
