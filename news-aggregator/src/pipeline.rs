use crate::aggregation::{category_buckets, source_stats_delta};
use crate::cache::{CachePublisher, CycleOutput, SharedCache};
use crate::config::AggregatorConfig;
use crate::dedup::deduplicate;
use crate::enrichment::Enricher;
use crate::ranking::{date_prioritized, trending};
use crate::sentiment::LexiconSentiment;
use crate::sources::{FeedSource, RssPuller, SourceRegistry};
use crate::traits::{PullFeed, SnapshotMirror};
use crate::types::{Article, RawEntry, Result};
use chrono::Utc;
use futures::future::join_all;
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{info, info_span, warn, Instrument};
use uuid::Uuid;

/// Summary of one fetch-enrich-dedupe-rank-publish pass.
#[derive(Debug, Clone, Serialize)]
pub struct CycleReport {
    pub cycle_id: Uuid,
    pub sources_ok: usize,
    pub sources_failed: usize,
    pub fetched: usize,
    pub unique: usize,
    pub duplicates: u64,
    /// Version of the snapshot this cycle published.
    pub snapshot_version: u64,
    /// False when nothing was fetched and only health was updated.
    pub articles_published: bool,
}

struct FetchResults {
    entries: Vec<(String, Vec<RawEntry>)>,
    succeeded: Vec<String>,
    failed: BTreeMap<String, String>,
}

/// Runs one cycle at a time over every registered source and hands the
/// result to the cache publisher.
pub struct IngestionPipeline {
    registry: Arc<SourceRegistry>,
    puller: Arc<dyn PullFeed>,
    enricher: Enricher,
    cache: SharedCache,
    publisher: Mutex<CachePublisher>,
    config: AggregatorConfig,
}

impl IngestionPipeline {
    pub fn new(
        registry: SourceRegistry,
        puller: Arc<dyn PullFeed>,
        enricher: Enricher,
        publisher: CachePublisher,
        config: AggregatorConfig,
    ) -> Self {
        Self {
            registry: Arc::new(registry),
            puller,
            enricher,
            cache: publisher.cache().clone(),
            publisher: Mutex::new(publisher),
            config,
        }
    }

    /// Production wiring: HTTP puller, lexicon sentiment, optional mirror.
    pub fn from_config(
        config: AggregatorConfig,
        registry: SourceRegistry,
        cache: SharedCache,
        mirror: Option<Arc<dyn SnapshotMirror>>,
    ) -> Result<Self> {
        let puller = RssPuller::new(config.fetch.clone(), config.max_entries)?;
        let enricher = Enricher::new(Arc::new(LexiconSentiment::new()), config.summary_limit);
        let mut publisher = CachePublisher::new(cache);
        if let Some(mirror) = mirror {
            publisher = publisher.with_mirror(mirror, config.mirror_key.clone(), config.mirror_ttl());
        }
        Ok(Self::new(registry, Arc::new(puller), enricher, publisher, config))
    }

    pub fn cache(&self) -> &SharedCache {
        &self.cache
    }

    pub fn registry(&self) -> &SourceRegistry {
        &self.registry
    }

    pub async fn run_cycle(&self) -> Result<CycleReport> {
        let cycle_id = Uuid::new_v4();
        let span = info_span!("cycle", id = %cycle_id);
        self.run_cycle_inner(cycle_id).instrument(span).await
    }

    async fn run_cycle_inner(&self, cycle_id: Uuid) -> Result<CycleReport> {
        info!("Starting cycle over {} sources", self.registry.len());
        let fetched = self.fetch_all().await;
        let sources_ok = fetched.succeeded.len();
        let sources_failed = fetched.failed.len();

        // Serializes publishes if cycles are ever driven concurrently.
        let mut publisher = self.publisher.lock().await;

        if fetched.entries.is_empty() {
            let snapshot = publisher
                .publish_health(&fetched.succeeded, fetched.failed)
                .await;
            return Ok(CycleReport {
                cycle_id,
                sources_ok,
                sources_failed,
                fetched: 0,
                unique: 0,
                duplicates: 0,
                snapshot_version: snapshot.version,
                articles_published: false,
            });
        }

        let now = Utc::now();
        let enriched: Vec<Article> = fetched
            .entries
            .iter()
            .flat_map(|(source, entries)| self.enricher.enrich_all(source, entries, now))
            .collect();
        let fetched_count = enriched.len();

        let outcome = deduplicate(enriched, &self.registry);
        let unique = outcome.articles.len();
        let duplicates = outcome.duplicates;

        let output = CycleOutput {
            trending: trending(&outcome.articles, &self.registry, now, self.config.trending_limit),
            categories: category_buckets(&outcome.articles, self.config.category_limit),
            stats_delta: source_stats_delta(&outcome.articles),
            articles: date_prioritized(&outcome.articles),
            duplicates,
            succeeded_sources: fetched.succeeded,
            failed_sources: fetched.failed,
            completed_at: Utc::now(),
        };
        let snapshot = publisher.publish(output).await;

        info!(
            "Cycle complete: {} sources ok, {} failed, {} fetched, {} unique, {} duplicates",
            sources_ok, sources_failed, fetched_count, unique, duplicates
        );

        Ok(CycleReport {
            cycle_id,
            sources_ok,
            sources_failed,
            fetched: fetched_count,
            unique,
            duplicates,
            snapshot_version: snapshot.version,
            articles_published: true,
        })
    }

    /// Pull every source concurrently. A failing source is recorded and
    /// never affects the others.
    async fn fetch_all(&self) -> FetchResults {
        let pulls = self
            .registry
            .sources()
            .iter()
            .map(|source| async move { (source, self.pull_one(source).await) });
        let outcomes = join_all(pulls).await;

        let mut results = FetchResults {
            entries: Vec::new(),
            succeeded: Vec::new(),
            failed: BTreeMap::new(),
        };
        for (source, outcome) in outcomes {
            match outcome {
                Ok(entries) => {
                    results.succeeded.push(source.name.clone());
                    results.entries.push((source.name.clone(), entries));
                }
                Err(reason) => {
                    warn!("Source {} failed: {}", source.name, reason);
                    results.failed.insert(source.name.clone(), reason);
                }
            }
        }
        results
    }

    async fn pull_one(&self, source: &FeedSource) -> std::result::Result<Vec<RawEntry>, String> {
        match self.puller.pull(source).await {
            Ok(entries) if entries.is_empty() => Err("feed contains no usable entries".to_string()),
            Ok(entries) => Ok(entries),
            Err(e) => Err(e.to_string()),
        }
    }
}
