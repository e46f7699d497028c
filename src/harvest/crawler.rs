//! Repository Crawlers
//!
//! A crawler walks one crawl target, hands every content unit to its extractor and
//! notifies its subscribers of each resulting record before moving on to the next
//! unit. Slow consumers therefore slow the crawl, and consumers observe records in
//! discovery order.
//!
//! ## Traversal
//! - The root URI is always read; failing to read it fails the crawl.
//! - A root collection's direct children are always visited. Deeper collections,
//!   and child catalogs referenced from content, are visited only when the target
//!   is recursive.
//! - Paging continuations are followed until the listing is exhausted.
//! - Malformed units and unreadable non-root units are skipped and reported.

use super::extractor::Extractor;
use super::generator::RecordGenerator;
use super::producer::{RecordConsumer, RecordProducer};
use super::source::{Content, ContentSource};
use super::types::{CrawlTarget, HarvestReport, RepositoryType};
use crate::error::{Error, Result};
use crate::record::Record;

use std::collections::{HashSet, VecDeque};
use std::sync::Arc;
use url::Url;

enum Strategy {
    Generate(RecordGenerator),
    Walk {
        extractor: Extractor,
        source: Arc<dyn ContentSource>,
    },
}

pub struct Crawler {
    kind: RepositoryType,
    strategy: Strategy,
    producer: RecordProducer,
}

impl Crawler {
    pub fn generator(generator: RecordGenerator) -> Self {
        Self {
            kind: RepositoryType::Generator,
            strategy: Strategy::Generate(generator),
            producer: RecordProducer::new(),
        }
    }

    /// A crawler reading `kind` repositories through `source`.
    pub fn repository(kind: RepositoryType, source: Arc<dyn ContentSource>) -> Result<Self> {
        let extractor =
            Extractor::for_repository(kind).ok_or(Error::UnsupportedRepositoryType(kind))?;

        Ok(Self {
            kind,
            strategy: Strategy::Walk { extractor, source },
            producer: RecordProducer::new(),
        })
    }

    pub fn kind(&self) -> RepositoryType {
        self.kind
    }

    pub fn subscribe(&mut self, consumer: Arc<dyn RecordConsumer>) {
        self.producer.subscribe(consumer);
    }

    pub fn subscriber_count(&self) -> usize {
        self.producer.subscriber_count()
    }

    /// Traverses the target and notifies subscribers of every record found.
    ///
    /// Records delivered before a failure stay delivered. If any consumer failed
    /// along the way, the first such failure is returned after the traversal.
    pub async fn crawl(&self, target: &CrawlTarget) -> Result<HarvestReport> {
        tracing::info!(
            "Crawling {} repository at {} (recursive={})",
            self.kind,
            target.uri,
            target.recursive
        );

        let mut report = HarvestReport::default();
        let mut first_error: Option<Error> = None;

        match &self.strategy {
            Strategy::Generate(generator) => {
                for record in generator.records() {
                    self.deliver(&record, &mut report, &mut first_error).await;
                }
            }
            Strategy::Walk { extractor, source } => {
                self.walk(target, *extractor, source.as_ref(), &mut report, &mut first_error)
                    .await?;
            }
        }

        tracing::info!(
            "Crawl of {} finished: {} documents, {} harvested, {} deleted, {} skipped",
            target.uri,
            report.documents,
            report.harvested,
            report.deleted,
            report.skipped.len()
        );

        match first_error {
            Some(e) => Err(e),
            None => Ok(report),
        }
    }

    async fn walk(
        &self,
        target: &CrawlTarget,
        extractor: Extractor,
        source: &dyn ContentSource,
        report: &mut HarvestReport,
        first_error: &mut Option<Error>,
    ) -> Result<()> {
        let mut visited: HashSet<Url> = HashSet::new();
        let mut pending: VecDeque<(Url, usize)> = VecDeque::from([(target.uri.clone(), 0)]);

        while let Some((uri, depth)) = pending.pop_front() {
            if !visited.insert(uri.clone()) {
                tracing::debug!("Already visited {}", uri);
                continue;
            }

            let content = match source.read(&uri).await {
                Ok(content) => content,
                Err(e) if depth == 0 => return Err(e),
                Err(e) => {
                    tracing::warn!("Skipping unreadable {}: {}", uri, e);
                    report.skip(uri.as_str(), e.to_string());
                    continue;
                }
            };

            match content {
                Content::Collection(children) => {
                    if depth > 0 && !target.recursive {
                        tracing::debug!("Not descending into {} (non-recursive)", uri);
                        continue;
                    }
                    for child in children.into_iter().rev() {
                        pending.push_front((child, depth + 1));
                    }
                }
                Content::Document(text) => {
                    report.documents += 1;

                    let extraction = match extractor.extract(&uri, &text) {
                        Ok(extraction) => extraction,
                        Err(e) => {
                            tracing::warn!("Skipping malformed content: {}", e);
                            report.skip(uri.as_str(), e.to_string());
                            continue;
                        }
                    };

                    for reason in extraction.rejected {
                        tracing::warn!("Rejected item in {}: {}", uri, reason);
                        report.skip(uri.as_str(), reason);
                    }

                    for record in &extraction.records {
                        self.deliver(record, report, first_error).await;
                    }

                    if let Some(next) = extraction.next_page {
                        pending.push_front((next, depth));
                    }
                    if target.recursive {
                        for child in extraction.references.into_iter().rev() {
                            pending.push_front((child, depth + 1));
                        }
                    }
                }
            }
        }

        Ok(())
    }

    async fn deliver(
        &self,
        record: &Record,
        report: &mut HarvestReport,
        first_error: &mut Option<Error>,
    ) {
        if record.is_deleted() {
            report.deleted += 1;
        } else {
            report.harvested += 1;
        }

        if let Err(e) = self.producer.notify(record).await {
            first_error.get_or_insert(e);
        }
    }
}
