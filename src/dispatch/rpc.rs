//! Remote RPC pool
//!
//! Every endpoint is health-checked in order before any work is sent; one
//! unhealthy endpoint fails the run and names that endpoint. Units are then
//! assigned round-robin (`index mod endpoints`) and each endpoint works
//! through its share sequentially over one connection while all endpoints
//! run concurrently. Partials are merged in completion order.
//!
//! There are no retries and no timeouts beyond the transport's. In-flight
//! calls are not cancelled when another call fails: the run waits for every
//! endpoint task to finish before reporting the first failure.

use super::Dispatcher;
use crate::chunker::WorkUnit;
use crate::count::{merge_counts, CountMapping};
use crate::distributed::client::{Endpoint, NodeClient};
use crate::error::WordFreqError;
use anyhow::{Context, Result};
use tokio::sync::mpsc;

pub struct RpcPool {
    endpoints: Vec<Endpoint>,
}

impl RpcPool {
    /// Build from endpoint URLs, in the given order
    pub fn new<S: AsRef<str>>(urls: &[S]) -> Result<Self> {
        let endpoints = urls
            .iter()
            .map(|url| Endpoint::parse(url.as_ref()))
            .collect::<Result<Vec<_>>>()?;
        Self::from_endpoints(endpoints)
    }

    pub fn from_endpoints(endpoints: Vec<Endpoint>) -> Result<Self> {
        if endpoints.is_empty() {
            return Err(WordFreqError::config("at least one worker endpoint is required").into());
        }
        Ok(Self { endpoints })
    }

    pub fn endpoints(&self) -> &[Endpoint] {
        &self.endpoints
    }

    /// Probe every endpoint in order, failing on the first unhealthy one
    pub async fn health_check(&self) -> Result<()> {
        for endpoint in &self.endpoints {
            let probe = async {
                let mut client = NodeClient::connect(endpoint).await?;
                client.health().await
            };
            match probe.await {
                Ok(node_id) => {
                    tracing::info!(endpoint = %endpoint, node_id = %node_id, "worker healthy");
                }
                Err(e) => {
                    tracing::error!(endpoint = %endpoint, "health check failed: {:#}", e);
                    return Err(WordFreqError::EndpointUnhealthy {
                        endpoint: endpoint.to_string(),
                        reason: format!("{:#}", e),
                    }
                    .into());
                }
            }
        }
        Ok(())
    }

    /// Async form of [`Dispatcher::distribute`]
    pub async fn dispatch(&self, units: Vec<WorkUnit>) -> Result<CountMapping> {
        if units.is_empty() {
            return Ok(CountMapping::new());
        }

        self.health_check().await?;

        let total = units.len();
        let mut assignments: Vec<Vec<WorkUnit>> = vec![Vec::new(); self.endpoints.len()];
        for (idx, unit) in units.into_iter().enumerate() {
            assignments[idx % self.endpoints.len()].push(unit);
        }
        tracing::info!(
            units = total,
            endpoints = self.endpoints.len(),
            "dispatching to remote workers"
        );

        let (tx, mut rx) = mpsc::unbounded_channel();
        for (endpoint, batch) in self.endpoints.iter().zip(assignments) {
            if batch.is_empty() {
                continue;
            }
            let endpoint = endpoint.clone();
            let tx = tx.clone();
            tokio::spawn(run_endpoint(endpoint, batch, tx));
        }
        drop(tx);

        // Calls already sent run to completion; after the first failure their
        // results are drained and discarded.
        let mut counts = CountMapping::new();
        let mut received = 0;
        let mut failure: Option<anyhow::Error> = None;
        while let Some(result) = rx.recv().await {
            match result {
                Ok(partial) if failure.is_none() => {
                    merge_counts(&mut counts, partial);
                    received += 1;
                }
                Ok(_) => {}
                Err(e) if failure.is_none() => {
                    tracing::error!("{:#}", e);
                    failure = Some(e);
                }
                Err(e) => tracing::debug!("further failure: {:#}", e),
            }
        }

        if let Some(e) = failure {
            return Err(e);
        }

        if received != total {
            return Err(WordFreqError::worker_failed(
                "rpc pool",
                format!("received {} of {} partial results", received, total),
            )
            .into());
        }

        Ok(counts)
    }
}

/// Send one endpoint's share of units over a single connection
async fn run_endpoint(
    endpoint: Endpoint,
    batch: Vec<WorkUnit>,
    results: mpsc::UnboundedSender<Result<CountMapping>>,
) {
    let mut client = match NodeClient::connect(&endpoint).await {
        Ok(client) => client,
        Err(e) => {
            let _ = results.send(Err(WordFreqError::worker_failed(
                endpoint.to_string(),
                format!("{:#}", e),
            )
            .into()));
            return;
        }
    };

    for unit in batch {
        let origin = unit.origin;
        let result = client
            .map_chunk(unit.text)
            .await
            .with_context(|| format!("map_chunk on {} failed for a chunk of {}", endpoint, origin));

        let failed = result.is_err();
        if results.send(result).is_err() || failed {
            return;
        }
    }
}

impl Dispatcher for RpcPool {
    fn name(&self) -> &'static str {
        "rpc"
    }

    fn distribute(&self, units: Vec<WorkUnit>) -> Result<CountMapping> {
        if units.is_empty() {
            return Ok(CountMapping::new());
        }
        let runtime = tokio::runtime::Runtime::new().context("Failed to create tokio runtime")?;
        runtime.block_on(self.dispatch(units))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chunker::chunk_files;
    use crate::count::count_words;
    use crate::distributed::node_service::{ServiceStats, WordCountService};
    use crate::distributed::protocol::{read_message, write_message, Message, HEALTH_OK};
    use std::sync::Arc;

    async fn start_service() -> (String, Arc<ServiceStats>) {
        let service = WordCountService::bind("127.0.0.1:0").await.unwrap();
        let url = format!("http://{}", service.local_addr().unwrap());
        let stats = service.stats();
        tokio::spawn(service.run());
        (url, stats)
    }

    fn dead_endpoint() -> String {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);
        format!("http://{}", addr)
    }

    fn sample_units() -> Vec<WorkUnit> {
        let text = "the cat sat on the mat and the dog sat on the log ".repeat(40);
        chunk_files(vec![("a.txt", text.clone()), ("b.txt", text)], 64)
    }

    #[test]
    fn test_new_requires_endpoints() {
        let none: [&str; 0] = [];
        assert!(RpcPool::new(&none).is_err());
        assert!(RpcPool::new(&["not-an-endpoint"]).is_err());
        assert_eq!(RpcPool::new(&["h:1", "h:2"]).unwrap().endpoints().len(), 2);
    }

    #[tokio::test]
    async fn test_dispatch_matches_single_pass() {
        let (a, stats_a) = start_service().await;
        let (b, stats_b) = start_service().await;
        let pool = RpcPool::new(&[a, b]).unwrap();

        let units = sample_units();
        let expected = count_words(&units.iter().map(|u| u.text.as_str()).collect::<String>());
        let n = units.len() as u64;

        let counts = pool.dispatch(units).await.unwrap();
        assert_eq!(counts, expected);
        assert_eq!(stats_a.map_calls() + stats_b.map_calls(), n);
        assert_eq!(stats_a.map_calls(), n.div_ceil(2));
    }

    #[tokio::test]
    async fn test_empty_input_contacts_no_worker() {
        let (a, stats) = start_service().await;
        let pool = RpcPool::new(&[a, dead_endpoint()]).unwrap();

        assert!(pool.dispatch(Vec::new()).await.unwrap().is_empty());
        assert_eq!(stats.health_calls(), 0);
    }

    #[tokio::test]
    async fn test_unhealthy_endpoint_fails_before_any_map_call() {
        let (first, stats_first) = start_service().await;
        let dead = dead_endpoint();
        let (third, stats_third) = start_service().await;
        let pool = RpcPool::new(&[first, dead.clone(), third]).unwrap();

        let err = pool.dispatch(sample_units()).await.unwrap_err();
        match err.downcast_ref::<WordFreqError>() {
            Some(WordFreqError::EndpointUnhealthy { endpoint, .. }) => assert_eq!(endpoint, &dead),
            other => panic!("unexpected error: {:?}", other),
        }
        assert!(err.to_string().contains(&dead));

        assert_eq!(stats_first.health_calls(), 1);
        assert_eq!(stats_third.health_calls(), 0);
        assert_eq!(stats_first.map_calls(), 0);
        assert_eq!(stats_third.map_calls(), 0);
    }

    /// A worker that passes its health check but rejects every chunk
    async fn start_rejecting_worker() -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let url = format!("http://{}", listener.local_addr().unwrap());
        tokio::spawn(async move {
            loop {
                let (mut stream, _) = listener.accept().await.unwrap();
                tokio::spawn(async move {
                    while let Ok(Some(request)) = read_message(&mut stream).await {
                        let reply = match request {
                            Message::Health { .. } => Message::HealthOk {
                                node_id: "rejecting".into(),
                                status: HEALTH_OK.into(),
                            },
                            _ => Message::Error {
                                node_id: "rejecting".into(),
                                error: "boom".into(),
                            },
                        };
                        if write_message(&mut stream, &reply).await.is_err() {
                            break;
                        }
                    }
                });
            }
        });
        url
    }

    #[tokio::test]
    async fn test_failed_map_call_aborts_run() {
        let (good, good_stats) = start_service().await;
        let bad = start_rejecting_worker().await;
        let pool = RpcPool::new(&[good, bad.clone()]).unwrap();

        let units = sample_units();
        let good_share = (units.len() as u64).div_ceil(2);

        let err = pool.dispatch(units).await.unwrap_err();
        match err.downcast_ref::<WordFreqError>() {
            Some(WordFreqError::WorkerFailed { worker, reason }) => {
                assert!(worker.starts_with(&bad), "{}", worker);
                assert_eq!(reason, "boom");
            }
            other => panic!("unexpected error: {:?}", other),
        }
        assert!(err.to_string().contains(&bad));

        // The healthy endpoint was not cut off mid-run.
        assert_eq!(good_stats.health_calls(), 1);
        assert_eq!(good_stats.map_calls(), good_share);
    }

    #[test]
    fn test_failed_map_call_aborts_blocking_distribute() {
        let runtime = tokio::runtime::Runtime::new().unwrap();
        let (good, good_stats) = runtime.block_on(start_service());
        let bad = runtime.block_on(start_rejecting_worker());
        let pool = RpcPool::new(&[bad.clone(), good]).unwrap();

        let units = sample_units();
        let good_share = units.len() as u64 / 2;

        let err = pool.distribute(units).unwrap_err();
        assert!(err.to_string().contains(&bad));
        assert_eq!(good_stats.map_calls(), good_share);
    }
}
