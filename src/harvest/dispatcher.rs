//! Harvest Dispatcher & Wiring
//!
//! `HarvestWiring` is built once at startup: it collects crawlers and consumers and,
//! on `build`, subscribes every consumer to every crawler. The resulting
//! `HarvestDispatcher` is immutable, so it can be shared behind an `Arc` and invoked
//! concurrently; each `harvest` call only reads the crawler table.

use super::crawler::Crawler;
use super::generator::RecordGenerator;
use super::producer::RecordConsumer;
use super::source::ContentSource;
use super::types::{CrawlTarget, HarvestReport, RepositoryType};
use crate::error::{Error, Result};

use std::collections::HashMap;
use std::sync::Arc;

#[derive(Default)]
pub struct HarvestWiring {
    crawlers: Vec<Crawler>,
    consumers: Vec<Arc<dyn RecordConsumer>>,
}

impl HarvestWiring {
    pub fn new() -> Self {
        Self::default()
    }

    /// One crawler per repository type, all reading through `source`.
    pub fn with_all_repositories(
        source: Arc<dyn ContentSource>,
        generator: RecordGenerator,
    ) -> Result<Self> {
        Ok(Self::new()
            .crawler(Crawler::generator(generator))
            .crawler(Crawler::repository(RepositoryType::Oai, source.clone())?)
            .crawler(Crawler::repository(RepositoryType::Catalog, source)?))
    }

    pub fn crawler(mut self, crawler: Crawler) -> Self {
        self.crawlers.push(crawler);
        self
    }

    pub fn consumer(mut self, consumer: Arc<dyn RecordConsumer>) -> Self {
        self.consumers.push(consumer);
        self
    }

    /// Subscribes every consumer to every crawler. A later crawler for the same
    /// repository type replaces an earlier one.
    pub fn build(self) -> HarvestDispatcher {
        let mut crawlers = HashMap::new();

        for mut crawler in self.crawlers {
            for consumer in &self.consumers {
                crawler.subscribe(consumer.clone());
            }
            if let Some(previous) = crawlers.insert(crawler.kind(), crawler) {
                tracing::warn!("Replacing crawler for {} repositories", previous.kind());
            }
        }

        tracing::info!(
            "Harvest wiring: {} crawler(s) x {} consumer(s)",
            crawlers.len(),
            self.consumers.len()
        );

        HarvestDispatcher { crawlers }
    }
}

pub struct HarvestDispatcher {
    crawlers: HashMap<RepositoryType, Crawler>,
}

impl HarvestDispatcher {
    /// Routes the request to the crawler for `kind`.
    ///
    /// The repository type and the target are validated before any I/O happens.
    pub async fn harvest(
        &self,
        uri: &str,
        recursive: bool,
        kind: RepositoryType,
    ) -> Result<HarvestReport> {
        tracing::info!("Harvest uri={} recursive={} type={}", uri, recursive, kind);

        let crawler = self
            .crawlers
            .get(&kind)
            .ok_or(Error::UnsupportedRepositoryType(kind))?;
        let target = CrawlTarget::parse(uri, recursive)?;

        crawler.crawl(&target).await
    }

    pub fn supports(&self, kind: RepositoryType) -> bool {
        self.crawlers.contains_key(&kind)
    }

    pub fn subscriber_count(&self, kind: RepositoryType) -> usize {
        self.crawlers
            .get(&kind)
            .map(Crawler::subscriber_count)
            .unwrap_or(0)
    }
}
