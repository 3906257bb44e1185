//! CLI argument parsing using clap

use clap::{Parser, ValueEnum};
use std::path::PathBuf;

/// Execution mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ExecutionMode {
    /// Local process pool (one chunk per task)
    Process,
    /// Process + thread pool (one block of chunks per process)
    Hybrid,
    /// Dispatch chunks to remote word-count services
    Rpc,
    /// Run a remote word-count service
    Service,
    /// Child process of the local strategies (framed stdin/stdout)
    #[value(hide = true)]
    MapWorker,
}

/// Report format
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

/// wordfreq - map-reduce word frequency counter
#[derive(Parser, Debug)]
#[command(name = "wordfreq")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Execution mode (defaults to the config file's strategy, else process)
    #[arg(long, value_enum)]
    pub mode: Option<ExecutionMode>,

    /// TOML configuration file
    #[arg(short = 'c', long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Directory with .txt files
    #[arg(long, value_name = "DIR")]
    pub data: Option<PathBuf>,

    /// Number of ranked words to report
    #[arg(long)]
    pub top: Option<usize>,

    /// Report format
    #[arg(long, value_enum)]
    pub format: Option<OutputFormat>,

    /// Target chunk size in bytes
    #[arg(long)]
    pub chunk_size: Option<usize>,

    // === Process pool ===
    /// Worker processes for process mode
    #[arg(long)]
    pub workers: Option<usize>,

    // === Hybrid pool ===
    /// Worker processes for hybrid mode
    #[arg(long)]
    pub proc_workers: Option<usize>,

    /// Threads per process for hybrid mode
    #[arg(long)]
    pub thread_workers: Option<usize>,

    // === RPC ===
    /// Worker URLs for rpc mode (e.g. http://localhost:9001), space or comma separated
    #[arg(long, num_args = 1.., value_delimiter = ',')]
    pub endpoints: Vec<String>,

    // === Service ===
    /// Bind host for service mode
    #[arg(long)]
    pub host: Option<String>,

    /// Bind port for service mode
    #[arg(long)]
    pub port: Option<u16>,

    /// Counting threads (map-worker mode)
    #[arg(long, default_value = "1", hide = true)]
    pub threads: usize,

    /// Enable debug logging
    #[arg(long)]
    pub debug: bool,
}

impl Cli {
    /// Parse CLI arguments
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Basic argument checks that do not need the merged configuration
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.mode == Some(ExecutionMode::MapWorker) && self.threads == 0 {
            anyhow::bail!("threads must be at least 1");
        }
        Ok(())
    }
}
