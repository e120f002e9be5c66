use crate::cache::CacheSnapshot;
use crate::sources::FeedSource;
use crate::types::{RawEntry, Result};
use async_trait::async_trait;
use std::time::Duration;

/// Pulls raw entries for one source. Implementations return a typed
/// failure naming the source instead of panicking.
#[async_trait]
pub trait PullFeed: Send + Sync {
    async fn pull(&self, source: &FeedSource) -> Result<Vec<RawEntry>>;
}

/// Polarity scorer used by the enrichment stage.
pub trait SentimentModel: Send + Sync {
    fn name(&self) -> &str;

    /// Compound polarity score in `[-1, 1]`.
    fn compound(&self, text: &str) -> Result<f64>;
}

/// Best-effort write-through copy of a published snapshot.
#[async_trait]
pub trait SnapshotMirror: Send + Sync {
    async fn store(&self, key: &str, snapshot: &CacheSnapshot, ttl: Duration) -> Result<()>;
}
