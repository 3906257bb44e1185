//! Configuration module
//!
//! Handles CLI argument parsing, TOML configuration files, and validation.
//! Precedence is CLI flag, then config file, then built-in default.

pub mod cli;
pub mod toml;
pub mod validator;

use crate::chunker::DEFAULT_CHUNK_SIZE;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

/// Complete run configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// Strategy used when `--mode` is not given
    #[serde(default)]
    pub strategy: Strategy,
    #[serde(default)]
    pub input: InputConfig,
    #[serde(default)]
    pub report: ReportConfig,
    #[serde(default)]
    pub local: LocalConfig,
    #[serde(default)]
    pub hybrid: HybridConfig,
    #[serde(default)]
    pub rpc: RpcConfig,
    #[serde(default)]
    pub service: ServiceConfig,
}

/// Dispatch strategy
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Strategy {
    /// Local process pool, one unit per task
    #[default]
    Process,
    /// One block per process, threads inside each process
    Hybrid,
    /// Remote word-count services
    Rpc,
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Strategy::Process => write!(f, "process"),
            Strategy::Hybrid => write!(f, "hybrid"),
            Strategy::Rpc => write!(f, "rpc"),
        }
    }
}

/// Input selection and chunking
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct InputConfig {
    /// Directory holding the `.txt` files
    pub dir: Option<PathBuf>,
    /// Target chunk size in bytes
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,
}

impl Default for InputConfig {
    fn default() -> Self {
        Self {
            dir: None,
            chunk_size: default_chunk_size(),
        }
    }
}

fn default_chunk_size() -> usize {
    DEFAULT_CHUNK_SIZE
}

/// Report shape
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ReportConfig {
    /// Number of ranked words to print
    #[serde(default = "default_top")]
    pub top: usize,
    #[serde(default)]
    pub format: ReportFormat,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            top: default_top(),
            format: ReportFormat::default(),
        }
    }
}

fn default_top() -> usize {
    20
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReportFormat {
    /// `word<TAB>count` lines
    #[default]
    Text,
    /// Single JSON document
    Json,
}

/// Local process pool
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LocalConfig {
    #[serde(default = "default_local_processes")]
    pub processes: usize,
}

impl Default for LocalConfig {
    fn default() -> Self {
        Self {
            processes: default_local_processes(),
        }
    }
}

fn default_local_processes() -> usize {
    4
}

/// Hybrid process + thread pool
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct HybridConfig {
    #[serde(default = "default_hybrid_processes")]
    pub processes: usize,
    /// Threads per process
    #[serde(default = "default_hybrid_threads")]
    pub threads: usize,
}

impl Default for HybridConfig {
    fn default() -> Self {
        Self {
            processes: default_hybrid_processes(),
            threads: default_hybrid_threads(),
        }
    }
}

fn default_hybrid_processes() -> usize {
    3
}

fn default_hybrid_threads() -> usize {
    4
}

/// Remote worker endpoints
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RpcConfig {
    /// Worker URLs, e.g. `http://10.0.1.10:9001`
    #[serde(default)]
    pub endpoints: Vec<String>,
}

/// Remote worker service bind address
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ServiceConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

impl ServiceConfig {
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    9001
}
