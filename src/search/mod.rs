//! Federated Search Module
//!
//! Answers search requests by fanning them out across the index shards listed in the
//! shard registry, and keeps answering when some of those shards are down.
//!
//! ## Workflow
//! 1. **Build**: `QueryBuilder` turns a `SearchInput` into a backend request, listing
//!    the registry's current shards when the request is distributed.
//! 2. **Execute**: a `Transport` posts it with the read timeout chosen by the
//!    requested result type.
//! 3. **Recover**: on failure the engine prunes the registry through the
//!    `ShardMonitor`, retries, and finally falls back to the local index.
//! 4. **Parse**: the response is parsed from the format the caller asked for.
//!
//! ## Submodules
//! - **`types`**: request, response and attempt-trace types.
//! - **`query`**: backend request construction.
//! - **`transport`**: the transport trait, timeout policy and reqwest implementation.
//! - **`parser`**: XML and JSON response parsing.
//! - **`registry`**: the shared shard set.
//! - **`monitor`**: shard health probing.
//! - **`engine`**: the three-attempt recovery sequence.
//! - **`handlers`**: HTTP request handlers for the Axum web server.

pub mod engine;
pub mod handlers;
pub mod monitor;
pub mod parser;
pub mod query;
pub mod registry;
pub mod transport;
pub mod types;
