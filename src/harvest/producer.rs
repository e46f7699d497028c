//! Record Production & Consumption Contract
//!
//! Decouples "who finds records" (crawlers) from "who does something with them"
//! (index writers, deletion handlers, test sinks). A producer owns a fixed list of
//! subscribers; subscription takes `&mut self`, so the topology is frozen once the
//! producer is shared.

use crate::error::{Error, Result};
use crate::record::Record;

use async_trait::async_trait;
use std::sync::Arc;

/// Receives every record emitted by the producers it is subscribed to.
#[async_trait]
pub trait RecordConsumer: Send + Sync {
    /// Name used in logs and in `Error::Consumer`.
    fn name(&self) -> &str;

    async fn add(&self, record: &Record) -> anyhow::Result<()>;

    async fn delete(&self, id: &str) -> anyhow::Result<()>;
}

#[derive(Clone, Default)]
pub struct RecordProducer {
    subscribers: Vec<Arc<dyn RecordConsumer>>,
}

impl RecordProducer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&mut self, consumer: Arc<dyn RecordConsumer>) {
        tracing::debug!("Subscribed consumer '{}'", consumer.name());
        self.subscribers.push(consumer);
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers.len()
    }

    /// Delivers one record to every subscriber in subscription order.
    ///
    /// Tombstones go to `delete`, live records to `add`. A failing consumer does not
    /// stop delivery to the ones after it; the first failure of this invocation is
    /// returned once all subscribers have been tried.
    pub async fn notify(&self, record: &Record) -> Result<()> {
        let mut first_error: Option<Error> = None;

        for consumer in &self.subscribers {
            let outcome = if record.is_deleted() {
                consumer.delete(record.id()).await
            } else {
                consumer.add(record).await
            };

            if let Err(e) = outcome {
                tracing::warn!(
                    "Consumer '{}' failed on record {}: {:#}",
                    consumer.name(),
                    record.id(),
                    e
                );
                first_error.get_or_insert(Error::Consumer {
                    consumer: consumer.name().to_string(),
                    record_id: record.id().to_string(),
                    message: format!("{:#}", e),
                });
            }
        }

        match first_error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}
