//! Shard Health Probing
//!
//! Replays a diagnostic query against each candidate shard and keeps the shards
//! that answer with a parseable markup response. Probes are independent and run
//! with bounded concurrency; the monitor never writes the registry itself.

use super::parser;
use super::query::BackendRequest;
use super::registry::ShardSet;
use super::transport::Transport;
use crate::error::{Error, Result};

use futures::stream::{self, StreamExt};
use std::sync::Arc;
use std::time::Duration;
use url::Url;

pub const DEFAULT_PROBE_CONCURRENCY: usize = 8;

pub struct ShardMonitor {
    transport: Arc<dyn Transport>,
    concurrency: usize,
}

impl ShardMonitor {
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self {
            transport,
            concurrency: DEFAULT_PROBE_CONCURRENCY,
        }
    }

    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    /// The subset of `candidates` that answer `diagnostic_query` within
    /// `read_timeout`. An empty result means every shard failed.
    pub async fn prune(
        &self,
        candidates: &ShardSet,
        diagnostic_query: &str,
        read_timeout: Option<Duration>,
    ) -> ShardSet {
        let probes = stream::iter(candidates.iter().cloned())
            .map(|shard| async move {
                let healthy = self.probe(&shard, diagnostic_query, read_timeout).await;
                (shard, healthy)
            })
            .buffer_unordered(self.concurrency)
            .collect::<Vec<_>>()
            .await;

        let healthy: ShardSet = probes
            .into_iter()
            .filter_map(|(shard, healthy)| healthy.then_some(shard))
            .collect();

        tracing::info!(
            "Shard probe: {}/{} healthy",
            healthy.len(),
            candidates.len()
        );
        healthy
    }

    async fn probe(
        &self,
        shard: &str,
        diagnostic_query: &str,
        read_timeout: Option<Duration>,
    ) -> bool {
        let request = match probe_request(shard, diagnostic_query) {
            Ok(request) => request,
            Err(e) => {
                tracing::warn!("Cannot probe shard {}: {}", shard, e);
                return false;
            }
        };

        let outcome = match self.transport.post(&request, read_timeout).await {
            Ok(body) => parser::parse_xml(&body).map(|_| ()),
            Err(e) => Err(e),
        };

        match outcome {
            Ok(()) => {
                tracing::debug!("Shard {} is healthy", shard);
                true
            }
            Err(e) => {
                tracing::warn!("Shard {} failed the probe: {}", shard, e);
                false
            }
        }
    }
}

/// Shards are registered as `host:port/path`; a full URL is accepted as well.
pub fn probe_request(shard: &str, diagnostic_query: &str) -> Result<BackendRequest> {
    let base = if shard.contains("://") {
        shard.to_string()
    } else {
        format!("http://{}", shard)
    };
    let url = Url::parse(&format!("{}/select", base.trim_end_matches('/')))
        .map_err(|e| Error::Config(format!("invalid shard address '{}': {}", shard, e)))?;

    Ok(BackendRequest {
        url,
        query: diagnostic_query.to_string(),
    })
}
