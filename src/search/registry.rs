//! Shard Registry
//!
//! The process-wide set of shard addresses believed healthy. Every query reads a
//! snapshot of it; the recovery path replaces it wholesale after pruning.

use async_trait::async_trait;
use std::collections::BTreeSet;
use std::sync::Arc;
use tokio::sync::RwLock;

pub type ShardSet = BTreeSet<String>;

#[async_trait]
pub trait ShardRegistry: Send + Sync {
    /// A consistent snapshot of the current shard set.
    async fn get_shards(&self) -> Arc<ShardSet>;

    /// Replaces the whole set.
    async fn set_shards(&self, shards: ShardSet);
}

/// Holds the shard set as an immutable `Arc` behind a lock; writers swap the
/// pointer, so readers always see either the old set or the new one.
#[derive(Debug, Default)]
pub struct InMemoryShardRegistry {
    shards: RwLock<Arc<ShardSet>>,
}

impl InMemoryShardRegistry {
    pub fn new<I, S>(shards: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let shards: ShardSet = shards
            .into_iter()
            .map(|shard| {
                let shard: String = shard.into();
                shard.trim().to_string()
            })
            .filter(|shard| !shard.is_empty())
            .collect();
        Self {
            shards: RwLock::new(Arc::new(shards)),
        }
    }
}

#[async_trait]
impl ShardRegistry for InMemoryShardRegistry {
    async fn get_shards(&self) -> Arc<ShardSet> {
        self.shards.read().await.clone()
    }

    async fn set_shards(&self, shards: ShardSet) {
        let shards = Arc::new(shards);
        let previous = std::mem::replace(&mut *self.shards.write().await, shards.clone());
        tracing::info!(
            "Shard registry updated: {} -> {} shard(s)",
            previous.len(),
            shards.len()
        );
    }
}
