//! Federated Metadata Search Library
//!
//! Harvests descriptive records from remote repositories into a shared index and
//! answers search queries across the index's shards, degrading gracefully when
//! shards are unreachable. The binary (`main.rs`) wires these modules together and
//! serves them over HTTP.
//!
//! ## Architecture Modules
//! - **`record`**: The canonical metadata record.
//! - **`harvest`**: Crawlers, extractors and the producer/consumer fan-out that moves
//!   records from repositories to consumers such as the index writer.
//! - **`publish`**: Publish and unpublish flows, two independently wired harvesting
//!   pipelines plus delete-by-id.
//! - **`search`**: The federated query engine: query construction, shard registry,
//!   shard monitor and the three-attempt recovery sequence.
//! - **`config`**: Layered settings (defaults, TOML file, environment).
//! - **`error`**: The error taxonomy shared by all of the above.

pub mod config;
pub mod error;
pub mod harvest;
pub mod publish;
pub mod record;
pub mod search;

#[cfg(test)]
pub(crate) mod testing;
