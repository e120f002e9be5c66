use crate::traits::SnapshotMirror;
use crate::types::{Article, HealthStatus, SourceStats};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{watch, RwLock};
use tracing::{debug, info, warn};

/// One internally consistent set of read caches.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CacheSnapshot {
    /// Incremented on every swap.
    pub version: u64,
    /// Date-prioritized full list, breaking news first.
    pub articles: Vec<Article>,
    pub trending: Vec<Article>,
    pub categories: BTreeMap<String, Vec<Article>>,
    pub source_stats: BTreeMap<String, SourceStats>,
    pub health: HealthStatus,
}

impl CacheSnapshot {
    pub fn category(&self, name: &str) -> &[Article] {
        self.categories.get(name).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn breaking(&self) -> impl Iterator<Item = &Article> {
        self.articles.iter().filter(|a| a.breaking_news)
    }
}

/// Shared handle to the current snapshot. Readers clone the inner `Arc`;
/// the lock is only held for the pointer read or swap.
#[derive(Debug, Clone, Default)]
pub struct SharedCache {
    inner: Arc<RwLock<Arc<CacheSnapshot>>>,
}

impl SharedCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn snapshot(&self) -> Arc<CacheSnapshot> {
        self.inner.read().await.clone()
    }

    pub async fn articles(&self) -> Vec<Article> {
        self.snapshot().await.articles.clone()
    }

    pub async fn trending(&self) -> Vec<Article> {
        self.snapshot().await.trending.clone()
    }

    pub async fn categories(&self) -> BTreeMap<String, Vec<Article>> {
        self.snapshot().await.categories.clone()
    }

    pub async fn source_stats(&self) -> BTreeMap<String, SourceStats> {
        self.snapshot().await.source_stats.clone()
    }

    pub async fn health(&self) -> HealthStatus {
        self.snapshot().await.health.clone()
    }

    async fn swap(&self, next: Arc<CacheSnapshot>) -> Arc<CacheSnapshot> {
        let mut guard = self.inner.write().await;
        std::mem::replace(&mut *guard, next)
    }
}

/// Finished artifacts of one cycle, handed to the publisher.
#[derive(Debug, Clone, Default)]
pub struct CycleOutput {
    pub articles: Vec<Article>,
    pub trending: Vec<Article>,
    pub categories: BTreeMap<String, Vec<Article>>,
    pub stats_delta: BTreeMap<String, SourceStats>,
    pub duplicates: u64,
    pub succeeded_sources: Vec<String>,
    pub failed_sources: BTreeMap<String, String>,
    pub completed_at: DateTime<Utc>,
}

/// Sole writer of the shared cache. Owns the cumulative state (source stats,
/// duplicate counter, failed sources) that outlives a single cycle.
pub struct CachePublisher {
    cache: SharedCache,
    mirror: Option<Arc<dyn SnapshotMirror>>,
    mirror_key: String,
    mirror_ttl: Duration,
    /// Latest snapshot awaiting the mirror task. Started on first publish.
    mirror_tx: Option<watch::Sender<Option<Arc<CacheSnapshot>>>>,
    source_stats: BTreeMap<String, SourceStats>,
    failed_sources: BTreeMap<String, String>,
    duplicates_removed: u64,
    version: u64,
}

impl CachePublisher {
    pub fn new(cache: SharedCache) -> Self {
        Self {
            cache,
            mirror: None,
            mirror_key: "news:snapshot".to_string(),
            mirror_ttl: Duration::from_secs(300),
            mirror_tx: None,
            source_stats: BTreeMap::new(),
            failed_sources: BTreeMap::new(),
            duplicates_removed: 0,
            version: 0,
        }
    }

    pub fn with_mirror(mut self, mirror: Arc<dyn SnapshotMirror>, key: impl Into<String>, ttl: Duration) -> Self {
        self.mirror = Some(mirror);
        self.mirror_key = key.into();
        self.mirror_ttl = ttl;
        self
    }

    pub fn cache(&self) -> &SharedCache {
        &self.cache
    }

    /// Replace every cache artifact in one swap.
    pub async fn publish(&mut self, output: CycleOutput) -> Arc<CacheSnapshot> {
        for (source, delta) in &output.stats_delta {
            self.source_stats.entry(source.clone()).or_default().merge(delta);
        }
        self.duplicates_removed += output.duplicates;
        self.record_sources(&output.succeeded_sources, output.failed_sources);
        self.version += 1;

        let snapshot = Arc::new(CacheSnapshot {
            version: self.version,
            articles: output.articles,
            trending: output.trending,
            categories: output.categories,
            source_stats: self.source_stats.clone(),
            health: self.health(Some(output.completed_at)),
        });

        self.cache.swap(snapshot.clone()).await;
        info!(
            "Published snapshot v{}: {} articles, {} trending, {} categories",
            snapshot.version,
            snapshot.articles.len(),
            snapshot.trending.len(),
            snapshot.categories.len()
        );
        self.send_to_mirror(snapshot.clone());
        snapshot
    }

    /// Update only the health fields, keeping the previous article caches.
    /// Used when a cycle fetched nothing.
    pub async fn publish_health(
        &mut self,
        succeeded_sources: &[String],
        failed_sources: BTreeMap<String, String>,
    ) -> Arc<CacheSnapshot> {
        self.record_sources(succeeded_sources, failed_sources);
        self.version += 1;

        let previous = self.cache.snapshot().await;
        let snapshot = Arc::new(CacheSnapshot {
            version: self.version,
            articles: previous.articles.clone(),
            trending: previous.trending.clone(),
            categories: previous.categories.clone(),
            source_stats: self.source_stats.clone(),
            health: self.health(previous.health.last_update),
        });

        self.cache.swap(snapshot.clone()).await;
        warn!(
            "No articles fetched, published health-only snapshot v{} ({} failed sources)",
            snapshot.version,
            snapshot.health.failed_sources.len()
        );
        snapshot
    }

    fn record_sources(&mut self, succeeded: &[String], failed: BTreeMap<String, String>) {
        for source in succeeded {
            if self.failed_sources.remove(source).is_some() {
                info!("Source {} recovered", source);
            }
        }
        self.failed_sources.extend(failed);
    }

    fn health(&self, last_update: Option<DateTime<Utc>>) -> HealthStatus {
        HealthStatus {
            last_update,
            failed_sources: self.failed_sources.clone(),
            duplicates_removed: self.duplicates_removed,
        }
    }

    /// Hand the snapshot to the single mirror task. Writes happen one at a
    /// time in version order; a snapshot superseded before its write starts
    /// is skipped.
    fn send_to_mirror(&mut self, snapshot: Arc<CacheSnapshot>) {
        let Some(mirror) = self.mirror.clone() else {
            return;
        };
        let key = self.mirror_key.clone();
        let ttl = self.mirror_ttl;
        self.mirror_tx
            .get_or_insert_with(|| spawn_mirror_task(mirror, key, ttl))
            .send_replace(Some(snapshot));
    }
}

fn spawn_mirror_task(
    mirror: Arc<dyn SnapshotMirror>,
    key: String,
    ttl: Duration,
) -> watch::Sender<Option<Arc<CacheSnapshot>>> {
    let (tx, mut rx) = watch::channel(None::<Arc<CacheSnapshot>>);
    tokio::spawn(async move {
        while rx.changed().await.is_ok() {
            let Some(snapshot) = rx.borrow_and_update().clone() else {
                continue;
            };
            match mirror.store(&key, &snapshot, ttl).await {
                Ok(()) => debug!("Mirrored snapshot v{} to {}", snapshot.version, key),
                Err(e) => warn!("Failed to mirror snapshot v{}: {}", snapshot.version, e),
            }
        }
        debug!("Mirror task for {} stopped", key);
    });
    tx
}
