//! Configuration validation
//!
//! Every check here runs before any worker is started, so a bad
//! configuration never produces partial output.

use super::*;
use crate::distributed::client::Endpoint;
use crate::error::WordFreqError;
use anyhow::Result;

fn invalid(msg: impl Into<String>) -> anyhow::Error {
    WordFreqError::config(msg).into()
}

/// Validate the configuration for a counting run with `strategy`
pub fn validate_run_config(config: &Config, strategy: Strategy) -> Result<()> {
    validate_input(&config.input)?;

    match strategy {
        Strategy::Process => validate_local(&config.local),
        Strategy::Hybrid => validate_hybrid(&config.hybrid),
        Strategy::Rpc => validate_rpc(&config.rpc),
    }
}

/// Validate input configuration
pub fn validate_input(input: &InputConfig) -> Result<()> {
    let dir = input
        .dir
        .as_ref()
        .ok_or_else(|| invalid("input directory is required (--data)"))?;

    if !dir.exists() {
        return Err(invalid(format!("input directory does not exist: {}", dir.display())));
    }
    if !dir.is_dir() {
        return Err(invalid(format!("input path is not a directory: {}", dir.display())));
    }
    if input.chunk_size == 0 {
        return Err(invalid("chunk_size must be at least 1"));
    }

    Ok(())
}

/// Validate process pool configuration
pub fn validate_local(local: &LocalConfig) -> Result<()> {
    if local.processes == 0 {
        return Err(invalid("workers must be at least 1"));
    }
    Ok(())
}

/// Validate hybrid pool configuration
pub fn validate_hybrid(hybrid: &HybridConfig) -> Result<()> {
    if hybrid.processes == 0 {
        return Err(invalid("proc_workers must be at least 1"));
    }
    if hybrid.threads == 0 {
        return Err(invalid("thread_workers must be at least 1"));
    }
    Ok(())
}

/// Validate remote endpoints
pub fn validate_rpc(rpc: &RpcConfig) -> Result<()> {
    if rpc.endpoints.is_empty() {
        return Err(invalid("rpc mode requires at least one endpoint (--endpoints)"));
    }
    for url in &rpc.endpoints {
        Endpoint::parse(url)?;
    }
    Ok(())
}

/// Validate service bind settings
pub fn validate_service(service: &ServiceConfig) -> Result<()> {
    if service.host.trim().is_empty() {
        return Err(invalid("service host must not be empty"));
    }
    if service.port == 0 {
        return Err(invalid("service port must be between 1 and 65535"));
    }
    Ok(())
}
