//! Dispatcher-side connection to a remote word-count service

use crate::count::CountMapping;
use crate::distributed::protocol::*;
use crate::error::WordFreqError;
use anyhow::{Context, Result};
use std::fmt;
use tokio::net::TcpStream;

/// Address of one remote worker
///
/// Accepts `http://host:port`, `host:port` and `host:port/path`. Only
/// host:port is used for the connection; the original text is kept for
/// diagnostics.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoint {
    url: String,
    addr: String,
}

impl Endpoint {
    pub fn parse(url: &str) -> Result<Self> {
        let trimmed = url.trim();
        let without_scheme = match trimmed.find("://") {
            Some(idx) => &trimmed[idx + 3..],
            None => trimmed,
        };
        let authority = without_scheme.split('/').next().unwrap_or_default();

        let (host, port) = authority.rsplit_once(':').ok_or_else(|| {
            WordFreqError::config(format!("Endpoint '{}' is missing a port", url))
        })?;
        if host.is_empty() {
            return Err(WordFreqError::config(format!("Endpoint '{}' is missing a host", url)).into());
        }
        let port: u16 = port
            .parse()
            .map_err(|_| WordFreqError::config(format!("Endpoint '{}' has an invalid port", url)))?;
        if port == 0 {
            return Err(WordFreqError::config(format!("Endpoint '{}' has port 0", url)).into());
        }

        Ok(Self {
            url: trimmed.to_string(),
            addr: format!("{}:{}", host, port),
        })
    }

    /// Address used for the TCP connection
    pub fn addr(&self) -> &str {
        &self.addr
    }

    /// Address as configured
    pub fn url(&self) -> &str {
        &self.url
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.url)
    }
}

/// Open connection to one worker
pub struct NodeClient {
    endpoint: Endpoint,
    stream: TcpStream,
}

impl NodeClient {
    pub async fn connect(endpoint: &Endpoint) -> Result<Self> {
        let stream = TcpStream::connect(endpoint.addr())
            .await
            .with_context(|| format!("Failed to connect to worker {}", endpoint))?;
        stream.set_nodelay(true).ok();

        Ok(Self {
            endpoint: endpoint.clone(),
            stream,
        })
    }

    /// Liveness probe, returns the worker's node id
    pub async fn health(&mut self) -> Result<String> {
        match self.call(&Message::Health { protocol_version: PROTOCOL_VERSION }).await? {
            Message::HealthOk { node_id, status } if status == HEALTH_OK => Ok(node_id),
            Message::HealthOk { status, .. } => {
                Err(WordFreqError::Protocol(format!("unexpected health status '{}'", status)).into())
            }
            other => Err(self.unexpected(other)),
        }
    }

    /// Count the words of `text` on the worker
    pub async fn map_chunk(&mut self, text: String) -> Result<CountMapping> {
        match self.call(&Message::MapChunk { text }).await? {
            Message::MapResult { counts } => Ok(counts),
            other => Err(self.unexpected(other)),
        }
    }

    async fn call(&mut self, request: &Message) -> Result<Message> {
        write_message(&mut self.stream, request)
            .await
            .with_context(|| format!("Failed to send {} to {}", request.kind(), self.endpoint))?;

        read_message(&mut self.stream)
            .await
            .with_context(|| format!("Failed to read reply from {}", self.endpoint))?
            .ok_or_else(|| {
                WordFreqError::Protocol(format!("{} closed the connection", self.endpoint)).into()
            })
    }

    fn unexpected(&self, reply: Message) -> anyhow::Error {
        match reply {
            Message::Error { node_id, error } => {
                WordFreqError::worker_failed(format!("{} ({})", self.endpoint, node_id), error).into()
            }
            other => WordFreqError::Protocol(format!(
                "unexpected {} from {}",
                other.kind(),
                self.endpoint
            ))
            .into(),
        }
    }
}
