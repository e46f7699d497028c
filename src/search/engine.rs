//! Federated Search Engine
//!
//! Runs one request through a fixed three-phase sequence, stopping at the first
//! success:
//!
//! 1. **`Distributed`**: the request as given, over the current shard set.
//! 2. **`Pruned`**: before this attempt every registered shard is probed with an
//!    XML diagnostic variant of the request and the registry is replaced with the
//!    shards that answered. The request itself is reissued unchanged.
//! 3. **`LocalOnly`**: the request with `distributed = false`.
//!
//! The error of the last attempt is returned to the caller together with the
//! trace of every attempt; earlier failures are only logged and traced. Without a
//! registry, pruning is skipped but the sequence still advances.

use super::monitor::ShardMonitor;
use super::parser;
use super::query::{QueryBuilder, build_query_string};
use super::registry::{ShardRegistry, ShardSet};
use super::transport::{TimeoutPolicy, Transport};
use super::types::{
    Attempt, AttemptOutcome, ReturnFormat, SearchInput, SearchOutput, TracedFailure,
    TracedResponse,
};
use crate::error::Result;

use std::sync::Arc;
use std::time::Instant;

pub struct FederatedSearchEngine {
    builder: QueryBuilder,
    transport: Arc<dyn Transport>,
    registry: Option<Arc<dyn ShardRegistry>>,
    monitor: ShardMonitor,
    timeouts: TimeoutPolicy,
}

impl FederatedSearchEngine {
    pub fn new(
        builder: QueryBuilder,
        transport: Arc<dyn Transport>,
        timeouts: TimeoutPolicy,
    ) -> Self {
        let monitor = ShardMonitor::new(transport.clone());

        tracing::info!(
            "Search engine on {}: connection timeout={:?} datasets read timeout={:?} files read timeout={:?}",
            builder.select_url(),
            timeouts.connection,
            timeouts.datasets_read,
            timeouts.files_read
        );

        Self {
            builder,
            transport,
            registry: None,
            monitor,
            timeouts,
        }
    }

    pub fn with_registry(mut self, registry: Arc<dyn ShardRegistry>) -> Self {
        self.registry = Some(registry);
        self
    }

    pub fn with_monitor(mut self, monitor: ShardMonitor) -> Self {
        self.monitor = monitor;
        self
    }

    pub fn registry(&self) -> Option<&Arc<dyn ShardRegistry>> {
        self.registry.as_ref()
    }

    pub fn timeouts(&self) -> &TimeoutPolicy {
        &self.timeouts
    }

    /// Queries the backend and parses the response in the requested format.
    pub async fn search(&self, input: &SearchInput) -> Result<SearchOutput> {
        let body = self.query(input).await?;
        parser::parse(&body, input.format)
    }

    /// The backend's response body, verbatim, in the requested format.
    pub async fn query(&self, input: &SearchInput) -> Result<String> {
        self.query_traced(input)
            .await
            .map(|traced| traced.body)
            .map_err(|failure| failure.error)
    }

    /// Like `query`, also reporting every attempt made, whether or not one succeeded.
    pub async fn query_traced(
        &self,
        input: &SearchInput,
    ) -> std::result::Result<TracedResponse, TracedFailure> {
        let mut attempts = Vec::with_capacity(Attempt::SEQUENCE.len());
        let mut attempt = Attempt::Distributed;

        loop {
            let request = match attempt {
                Attempt::Distributed | Attempt::Pruned => input.clone(),
                Attempt::LocalOnly => input.clone().with_distributed(false),
            };

            let started = Instant::now();
            let result = self.execute(&request).await;
            let elapsed_ms = started.elapsed().as_millis() as u64;

            match result {
                Ok(body) => {
                    tracing::info!("Query ({:?}) elapsed time={} ms", attempt, elapsed_ms);
                    attempts.push(AttemptOutcome {
                        attempt,
                        elapsed_ms,
                        error: None,
                    });
                    return Ok(TracedResponse { body, attempts });
                }
                Err(e) => {
                    tracing::warn!(
                        "Query failed {} time(s) ({:?}, {} ms): {}",
                        attempts.len() + 1,
                        attempt,
                        elapsed_ms,
                        e
                    );
                    attempts.push(AttemptOutcome {
                        attempt,
                        elapsed_ms,
                        error: Some(e.to_string()),
                    });

                    let Some(next) = attempt.next() else {
                        return Err(TracedFailure { error: e, attempts });
                    };
                    if attempt == Attempt::Distributed {
                        self.recover(input).await;
                    } else {
                        tracing::debug!("Executing a non-distributed query");
                    }
                    attempt = next;
                }
            }
        }
    }

    async fn execute(&self, input: &SearchInput) -> Result<String> {
        let shards = match &self.registry {
            Some(registry) => registry.get_shards().await,
            None => Arc::new(ShardSet::new()),
        };
        let request = self.builder.build(input, &shards);
        tracing::debug!("Backend request {} {}", request.url, request.query);

        self.transport
            .post(
                &request,
                self.timeouts.read_timeout(input.effective_result_type()),
            )
            .await
    }

    /// Probes the registered shards with an XML variant of `input` and replaces the
    /// registry with the ones that answered.
    async fn recover(&self, input: &SearchInput) {
        let Some(registry) = &self.registry else {
            tracing::info!("Shard registry not available, cannot prune shards");
            return;
        };
        if !input.distributed {
            tracing::debug!("Request is not distributed, nothing to prune");
            return;
        }

        tracing::info!("Pruning the shards list");
        let started = Instant::now();

        let diagnostic = input.clone().with_format(ReturnFormat::Xml);
        let query = build_query_string(&diagnostic, &ShardSet::new());
        let candidates = registry.get_shards().await;
        let timeout = self.timeouts.read_timeout(diagnostic.effective_result_type());
        let healthy = self.monitor.prune(&candidates, &query, timeout).await;
        registry.set_shards(healthy).await;

        tracing::info!("Pruning elapsed time={} ms", started.elapsed().as_millis());
    }
}
