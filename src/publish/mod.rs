//! Publishing Module
//!
//! Publishing and unpublishing reuse the harvesting machinery unchanged; only the
//! consumers differ. `PublishingService` owns two independently wired dispatchers:
//!
//! - **publisher**: crawl, extract, fan out to the index writer.
//! - **unpublisher**: crawl the same repository, fan out to a record remover.
//!
//! A third path deletes records by known identifier without crawling.
//!
//! ## Submodules
//! - **`service`**: `PublishingService`.
//! - **`handlers`**: HTTP entry points.

pub mod handlers;
pub mod service;
