//! TOML configuration file parsing

use super::*;
use crate::config::cli::{Cli, ExecutionMode, OutputFormat};
use anyhow::{Context, Result};
use std::fs;
use std::path::Path;

/// Parse TOML configuration file
pub fn parse_toml_file(path: &Path) -> Result<Config> {
    let contents = fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    parse_toml_string(&contents)
        .with_context(|| format!("Failed to parse config file: {}", path.display()))
}

/// Parse TOML configuration from string
pub fn parse_toml_string(contents: &str) -> Result<Config> {
    let config: Config = ::toml::from_str(contents).context("Failed to parse TOML configuration")?;

    Ok(config)
}

/// Merge CLI arguments with a configuration (CLI takes precedence)
pub fn merge_cli_with_config(cli: &Cli, mut config: Config) -> Config {
    match cli.mode {
        Some(ExecutionMode::Process) => config.strategy = Strategy::Process,
        Some(ExecutionMode::Hybrid) => config.strategy = Strategy::Hybrid,
        Some(ExecutionMode::Rpc) => config.strategy = Strategy::Rpc,
        Some(ExecutionMode::Service) | Some(ExecutionMode::MapWorker) | None => {}
    }

    if let Some(ref dir) = cli.data {
        config.input.dir = Some(dir.clone());
    }
    if let Some(chunk_size) = cli.chunk_size {
        config.input.chunk_size = chunk_size;
    }

    if let Some(top) = cli.top {
        config.report.top = top;
    }
    if let Some(format) = cli.format {
        config.report.format = match format {
            OutputFormat::Text => ReportFormat::Text,
            OutputFormat::Json => ReportFormat::Json,
        };
    }

    if let Some(workers) = cli.workers {
        config.local.processes = workers;
    }
    if let Some(processes) = cli.proc_workers {
        config.hybrid.processes = processes;
    }
    if let Some(threads) = cli.thread_workers {
        config.hybrid.threads = threads;
    }

    if !cli.endpoints.is_empty() {
        config.rpc.endpoints = cli.endpoints.clone();
    }

    if let Some(ref host) = cli.host {
        config.service.host = host.clone();
    }
    if let Some(port) = cli.port {
        config.service.port = port;
    }

    config
}

/// Build the effective configuration: file (if given) overlaid by CLI flags
pub fn load_config(cli: &Cli) -> Result<Config> {
    let base = match cli.config {
        Some(ref path) => parse_toml_file(path)?,
        None => Config::default(),
    };
    Ok(merge_cli_with_config(cli, base))
}
