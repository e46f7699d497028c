//! Harvesting Pipeline Module
//!
//! Pulls descriptive records out of heterogeneous remote repositories and funnels
//! them into whatever consumers were wired at startup.
//!
//! ## Workflow
//! 1. **Dispatch**: `HarvestDispatcher` picks the crawler registered for the requested
//!    repository type (failing before any I/O if there is none).
//! 2. **Crawl**: the `Crawler` walks the target through a `ContentSource`, following
//!    paging tokens and, when recursive, child collections.
//! 3. **Extract**: the format-specific `Extractor` turns each content unit into records
//!    and tombstones.
//! 4. **Fan-out**: the crawler's `RecordProducer` hands every record to every subscribed
//!    `RecordConsumer`, synchronously and in discovery order.
//!
//! ## Submodules
//! - **`types`**: repository tags, crawl targets, harvest reports.
//! - **`producer`**: the producer/consumer contract.
//! - **`source`**: filesystem and HTTP content sources.
//! - **`extractor`**: OAI-PMH and catalog extraction.
//! - **`generator`**: synthetic records for smoke tests.
//! - **`crawler`**: traversal and notification.
//! - **`consumers`**: index writer, record remover, in-memory store.
//! - **`dispatcher`**: static wiring and request routing.
//! - **`handlers`**: HTTP entry point.

pub mod consumers;
pub mod crawler;
pub mod dispatcher;
pub mod extractor;
pub mod generator;
pub mod handlers;
pub mod producer;
pub mod source;
pub mod types;

#[cfg(test)]
mod tests;
