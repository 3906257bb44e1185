//! Remote word-count service
//!
//! This module implements the worker process that the RPC dispatcher talks
//! to. The service:
//! - Listens for dispatcher connections
//! - Answers `HEALTH` probes with `"ok"`
//! - Counts the words of each `MAP_CHUNK` and replies with the partial table
//!
//! Calls are stateless. A connection may carry any number of sequential
//! requests and connections are served concurrently.

use crate::count::count_words;
use crate::distributed::protocol::*;
use anyhow::{Context, Result};
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::net::{TcpListener, TcpStream};

/// Per-service call counters
#[derive(Debug, Default)]
pub struct ServiceStats {
    health_calls: AtomicU64,
    map_calls: AtomicU64,
}

impl ServiceStats {
    pub fn health_calls(&self) -> u64 {
        self.health_calls.load(Ordering::Relaxed)
    }

    pub fn map_calls(&self) -> u64 {
        self.map_calls.load(Ordering::Relaxed)
    }
}

/// Word-count service
///
/// Created bound to its address so callers can learn the port before serving.
pub struct WordCountService {
    listener: TcpListener,

    /// Node identifier (hostname)
    node_id: String,

    stats: Arc<ServiceStats>,
}

impl WordCountService {
    /// Bind the service to `addr` (host:port, port 0 picks a free port)
    pub async fn bind(addr: &str) -> Result<Self> {
        let listener = TcpListener::bind(addr)
            .await
            .with_context(|| format!("Failed to bind word-count service on {}", addr))?;

        Ok(Self {
            listener,
            node_id: get_node_id(),
            stats: Arc::new(ServiceStats::default()),
        })
    }

    pub fn local_addr(&self) -> Result<SocketAddr> {
        self.listener
            .local_addr()
            .context("Failed to read service address")
    }

    /// Shared handle to the call counters
    pub fn stats(&self) -> Arc<ServiceStats> {
        Arc::clone(&self.stats)
    }

    /// Serve until the process is terminated
    pub async fn run(self) -> Result<()> {
        tracing::info!(
            addr = %self.local_addr()?,
            node_id = %self.node_id,
            "RPC worker listening"
        );

        let node_id: Arc<str> = Arc::from(self.node_id.as_str());
        loop {
            let (stream, peer) = self
                .listener
                .accept()
                .await
                .context("Failed to accept connection")?;

            tracing::debug!(%peer, "dispatcher connected");

            let node_id = Arc::clone(&node_id);
            let stats = Arc::clone(&self.stats);
            tokio::spawn(async move {
                if let Err(e) = handle_connection(stream, &node_id, &stats).await {
                    tracing::warn!(%peer, "connection failed: {:#}", e);
                }
            });
        }
    }
}

/// Serve requests on one connection until the peer hangs up
async fn handle_connection(mut stream: TcpStream, node_id: &str, stats: &ServiceStats) -> Result<()> {
    stream.set_nodelay(true).ok();

    while let Some(request) = read_message(&mut stream).await? {
        tracing::debug!(request = request.kind(), "handling request");
        let reply = respond(request, node_id, stats).await;
        write_message(&mut stream, &reply).await?;
    }

    Ok(())
}

/// Produce the reply for a single request
pub(crate) async fn respond(request: Message, node_id: &str, stats: &ServiceStats) -> Message {
    match request {
        Message::Health { protocol_version } => {
            stats.health_calls.fetch_add(1, Ordering::Relaxed);
            if protocol_version != PROTOCOL_VERSION {
                return Message::Error {
                    node_id: node_id.to_string(),
                    error: format!(
                        "Protocol version mismatch: dispatcher={}, worker={}",
                        protocol_version, PROTOCOL_VERSION
                    ),
                };
            }
            Message::HealthOk {
                node_id: node_id.to_string(),
                status: HEALTH_OK.to_string(),
            }
        }
        Message::MapChunk { text } => {
            stats.map_calls.fetch_add(1, Ordering::Relaxed);
            match tokio::task::spawn_blocking(move || count_words(&text)).await {
                Ok(counts) => Message::MapResult { counts },
                Err(e) => Message::Error {
                    node_id: node_id.to_string(),
                    error: format!("map_chunk failed: {}", e),
                },
            }
        }
        other => Message::Error {
            node_id: node_id.to_string(),
            error: format!("Unsupported request: {}", other.kind()),
        },
    }
}

/// Get node identifier (hostname)
fn get_node_id() -> String {
    hostname::get()
        .ok()
        .and_then(|name| name.into_string().ok())
        .unwrap_or_else(|| "unknown".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_health_reply() {
        let stats = ServiceStats::default();
        let reply = respond(Message::Health { protocol_version: PROTOCOL_VERSION }, "n1", &stats).await;
        assert_eq!(
            reply,
            Message::HealthOk {
                node_id: "n1".into(),
                status: "ok".into()
            }
        );
        assert_eq!(stats.health_calls(), 1);
        assert_eq!(stats.map_calls(), 0);
    }

    #[tokio::test]
    async fn test_health_version_mismatch() {
        let stats = ServiceStats::default();
        let reply = respond(Message::Health { protocol_version: PROTOCOL_VERSION + 1 }, "n1", &stats).await;
        assert!(matches!(reply, Message::Error { .. }));
    }

    #[tokio::test]
    async fn test_map_chunk_counts() {
        let stats = ServiceStats::default();
        let reply = respond(Message::MapChunk { text: "To be, or not to be".into() }, "n1", &stats).await;
        match reply {
            Message::MapResult { counts } => {
                assert_eq!(counts["to"], 2);
                assert_eq!(counts["be"], 2);
                assert_eq!(counts["or"], 1);
            }
            other => panic!("unexpected reply: {:?}", other),
        }
        assert_eq!(stats.map_calls(), 1);
    }

    #[tokio::test]
    async fn test_block_requests_rejected() {
        let stats = ServiceStats::default();
        let reply = respond(Message::MapBlock { units: 0 }, "n1", &stats).await;
        assert!(matches!(reply, Message::Error { .. }));
    }

    #[tokio::test]
    async fn test_serves_sequential_requests_on_one_connection() {
        let service = WordCountService::bind("127.0.0.1:0").await.unwrap();
        let addr = service.local_addr().unwrap();
        let stats = service.stats();
        tokio::spawn(service.run());

        let mut stream = TcpStream::connect(addr).await.unwrap();
        write_message(&mut stream, &Message::Health { protocol_version: PROTOCOL_VERSION })
            .await
            .unwrap();
        assert!(matches!(
            read_message(&mut stream).await.unwrap(),
            Some(Message::HealthOk { .. })
        ));

        for _ in 0..3 {
            write_message(&mut stream, &Message::MapChunk { text: "a a b".into() })
                .await
                .unwrap();
            match read_message(&mut stream).await.unwrap() {
                Some(Message::MapResult { counts }) => assert_eq!(counts["a"], 2),
                other => panic!("unexpected reply: {:?}", other),
            }
        }
        assert_eq!(stats.health_calls(), 1);
        assert_eq!(stats.map_calls(), 3);
    }
}
