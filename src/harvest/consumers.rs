//! Record Consumers
//!
//! The subscribers a crawler fans records out to:
//! - **`IndexWriter`**: pushes harvested records into the index backend.
//! - **`RecordRemover`**: removes every record it is shown from the index (unpublish flow).
//! - **`InMemoryStore`**: keeps records in memory, for tests and dry runs.

use super::producer::RecordConsumer;
use crate::record::Record;

use anyhow::Result;
use async_trait::async_trait;
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

/// Deletes records by identifier.
#[async_trait]
pub trait DeletionService: Send + Sync {
    async fn delete_ids(&self, ids: &[String]) -> Result<()>;
}

/// Client for the index backend's update endpoint.
pub struct IndexUpdateClient {
    http_client: reqwest::Client,
    update_url: String,
    timeout: Duration,
    attempts: usize,
}

impl IndexUpdateClient {
    pub fn new(backend_url: &str, timeout: Duration) -> Self {
        Self {
            http_client: reqwest::Client::new(),
            update_url: format!("{}/update?commit=true", backend_url.trim_end_matches('/')),
            timeout,
            attempts: 3,
        }
    }

    pub fn update_url(&self) -> &str {
        &self.update_url
    }

    pub async fn add(&self, records: &[Record]) -> Result<()> {
        if records.is_empty() {
            return Ok(());
        }
        let docs: Vec<serde_json::Value> = records.iter().map(Record::to_index_document).collect();
        self.update(&serde_json::Value::from(docs)).await
    }

    async fn update(&self, payload: &serde_json::Value) -> Result<()> {
        let response = self.post_with_retry(payload).await?;
        if !response.status().is_success() {
            return Err(anyhow::anyhow!(
                "Index update failed: {}",
                response.status()
            ));
        }
        Ok(())
    }

    async fn post_with_retry(&self, payload: &serde_json::Value) -> Result<reqwest::Response> {
        let mut delay_ms = 150u64;

        for attempt in 0..self.attempts {
            let response = self
                .http_client
                .post(&self.update_url)
                .json(payload)
                .timeout(self.timeout)
                .send()
                .await;

            match response {
                Ok(resp) => return Ok(resp),
                Err(e) => {
                    if attempt + 1 == self.attempts {
                        return Err(anyhow::anyhow!(e));
                    }
                    tracing::debug!("Index update attempt {} failed: {}", attempt + 1, e);
                    let jitter = rand::random::<u64>() % 50;
                    tokio::time::sleep(Duration::from_millis(delay_ms + jitter)).await;
                    delay_ms = (delay_ms * 2).min(1200);
                }
            }
        }

        Err(anyhow::anyhow!("Retry attempts exhausted"))
    }
}

#[async_trait]
impl DeletionService for IndexUpdateClient {
    async fn delete_ids(&self, ids: &[String]) -> Result<()> {
        if ids.is_empty() {
            return Ok(());
        }
        tracing::info!("Deleting {} record(s) from the index", ids.len());
        self.update(&serde_json::json!({ "delete": ids })).await
    }
}

pub struct IndexWriter {
    client: Arc<IndexUpdateClient>,
}

impl IndexWriter {
    pub fn new(client: Arc<IndexUpdateClient>) -> Self {
        Self { client }
    }
}

#[async_trait]
impl RecordConsumer for IndexWriter {
    fn name(&self) -> &str {
        "index-writer"
    }

    async fn add(&self, record: &Record) -> Result<()> {
        self.client.add(std::slice::from_ref(record)).await
    }

    async fn delete(&self, id: &str) -> Result<()> {
        self.client.delete_ids(&[id.to_string()]).await
    }
}

/// Removes every record it receives, live or tombstoned, from the index.
pub struct RecordRemover {
    deleter: Arc<dyn DeletionService>,
}

impl RecordRemover {
    pub fn new(deleter: Arc<dyn DeletionService>) -> Self {
        Self { deleter }
    }
}

#[async_trait]
impl RecordConsumer for RecordRemover {
    fn name(&self) -> &str {
        "record-remover"
    }

    async fn add(&self, record: &Record) -> Result<()> {
        self.deleter.delete_ids(&[record.id().to_string()]).await
    }

    async fn delete(&self, id: &str) -> Result<()> {
        self.deleter.delete_ids(&[id.to_string()]).await
    }
}

/// Keeps the latest version of every record, remembering first-seen order.
#[derive(Default)]
pub struct InMemoryStore {
    records: DashMap<String, (u64, Record)>,
    sequence: AtomicU64,
}

impl InMemoryStore {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn insert(&self, record: Record) {
        match self.records.entry(record.id().to_string()) {
            Entry::Occupied(mut entry) => entry.get_mut().1 = record,
            Entry::Vacant(entry) => {
                let seq = self.sequence.fetch_add(1, Ordering::SeqCst);
                entry.insert((seq, record));
            }
        }
    }

    pub fn remove(&self, id: &str) -> bool {
        self.records.remove(id).is_some()
    }

    pub fn get(&self, id: &str) -> Option<Record> {
        self.records.get(id).map(|entry| entry.1.clone())
    }

    /// All records in the order they were first added.
    pub fn records(&self) -> Vec<Record> {
        let mut entries: Vec<(u64, Record)> = self
            .records
            .iter()
            .map(|entry| entry.value().clone())
            .collect();
        entries.sort_by_key(|(seq, _)| *seq);
        entries.into_iter().map(|(_, record)| record).collect()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

#[async_trait]
impl RecordConsumer for InMemoryStore {
    fn name(&self) -> &str {
        "in-memory-store"
    }

    async fn add(&self, record: &Record) -> Result<()> {
        self.insert(record.clone());
        Ok(())
    }

    async fn delete(&self, id: &str) -> Result<()> {
        self.remove(id);
        Ok(())
    }
}

#[async_trait]
impl DeletionService for InMemoryStore {
    async fn delete_ids(&self, ids: &[String]) -> Result<()> {
        for id in ids {
            self.remove(id);
        }
        Ok(())
    }
}
