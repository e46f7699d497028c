use crate::error::{Error, Result};
use crate::harvest::consumers::{DeletionService, RecordRemover};
use crate::harvest::dispatcher::{HarvestDispatcher, HarvestWiring};
use crate::harvest::generator::RecordGenerator;
use crate::harvest::producer::RecordConsumer;
use crate::harvest::source::ContentSource;
use crate::harvest::types::{HarvestReport, RepositoryType};

use std::sync::Arc;

pub struct PublishingService {
    publisher: Arc<HarvestDispatcher>,
    unpublisher: Arc<HarvestDispatcher>,
    remover: Arc<dyn DeletionService>,
}

impl PublishingService {
    pub fn new(
        publisher: Arc<HarvestDispatcher>,
        unpublisher: Arc<HarvestDispatcher>,
        remover: Arc<dyn DeletionService>,
    ) -> Self {
        Self {
            publisher,
            unpublisher,
            remover,
        }
    }

    /// Two dispatchers over the same repositories: one feeding `writer`, one
    /// feeding a `RecordRemover` backed by `remover`.
    pub fn wire(
        source: Arc<dyn ContentSource>,
        generator: RecordGenerator,
        writer: Arc<dyn RecordConsumer>,
        remover: Arc<dyn DeletionService>,
    ) -> Result<Self> {
        let publisher = HarvestWiring::with_all_repositories(source.clone(), generator.clone())?
            .consumer(writer)
            .build();
        let unpublisher = HarvestWiring::with_all_repositories(source, generator)?
            .consumer(Arc::new(RecordRemover::new(remover.clone())))
            .build();

        Ok(Self::new(Arc::new(publisher), Arc::new(unpublisher), remover))
    }

    pub fn publisher(&self) -> &Arc<HarvestDispatcher> {
        &self.publisher
    }

    pub async fn publish(
        &self,
        uri: &str,
        recursive: bool,
        kind: RepositoryType,
    ) -> Result<HarvestReport> {
        tracing::info!("Publishing {}", uri);
        self.publisher.harvest(uri, recursive, kind).await
    }

    /// Crawls the repository again and removes every record found there.
    pub async fn unpublish(
        &self,
        uri: &str,
        recursive: bool,
        kind: RepositoryType,
    ) -> Result<HarvestReport> {
        tracing::info!("Unpublishing {}", uri);
        self.unpublisher.harvest(uri, recursive, kind).await
    }

    /// Removes records by identifier, without crawling.
    pub async fn unpublish_ids(&self, ids: &[String]) -> Result<()> {
        if ids.is_empty() {
            return Ok(());
        }
        tracing::info!("Unpublishing {} record(s) by id", ids.len());

        self.remover
            .delete_ids(ids)
            .await
            .map_err(|e| Error::Consumer {
                consumer: "record-remover".to_string(),
                record_id: ids.join(","),
                message: e.to_string(),
            })
    }
}
