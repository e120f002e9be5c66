use crate::aggregation::DEFAULT_CATEGORY_LIMIT;
use crate::enrichment::DEFAULT_SUMMARY_LIMIT;
use crate::parser::DEFAULT_MAX_ENTRIES;
use crate::ranking::DEFAULT_TRENDING_LIMIT;
use crate::sources::SourceRegistry;
use crate::types::{FetchConfig, Result};
use clap::Parser;
use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_INTERVAL_SECS: u64 = 15;
pub const DEFAULT_MIRROR_KEY: &str = "news:snapshot";
pub const DEFAULT_MIRROR_TTL_SECS: u64 = 300;

/// Runtime knobs for the ingestion pipeline and scheduler.
#[derive(Debug, Clone)]
pub struct AggregatorConfig {
    pub interval_secs: u64,
    pub max_entries: usize,
    pub summary_limit: usize,
    pub trending_limit: usize,
    pub category_limit: usize,
    pub mirror_key: String,
    pub mirror_ttl_secs: u64,
    pub fetch: FetchConfig,
}

impl Default for AggregatorConfig {
    fn default() -> Self {
        Self {
            interval_secs: DEFAULT_INTERVAL_SECS,
            max_entries: DEFAULT_MAX_ENTRIES,
            summary_limit: DEFAULT_SUMMARY_LIMIT,
            trending_limit: DEFAULT_TRENDING_LIMIT,
            category_limit: DEFAULT_CATEGORY_LIMIT,
            mirror_key: DEFAULT_MIRROR_KEY.to_string(),
            mirror_ttl_secs: DEFAULT_MIRROR_TTL_SECS,
            fetch: FetchConfig::default(),
        }
    }
}

impl AggregatorConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }

    pub fn mirror_ttl(&self) -> Duration {
        Duration::from_secs(self.mirror_ttl_secs)
    }
}

#[derive(Debug, Parser)]
#[command(name = "news-aggregator", about = "Entertainment news ingestion pipeline")]
pub struct Cli {
    /// Seconds to sleep between cycles
    #[arg(long, default_value_t = DEFAULT_INTERVAL_SECS)]
    pub interval_secs: u64,

    /// Maximum entries taken from each feed per cycle
    #[arg(long, default_value_t = DEFAULT_MAX_ENTRIES)]
    pub max_entries: usize,

    /// JSON file with a list of {"name", "url", "high_trust"} sources
    #[arg(long)]
    pub sources: Option<PathBuf>,

    /// PostgreSQL URL for the snapshot mirror
    #[arg(long, env = "DATABASE_URL")]
    pub database_url: Option<String>,

    /// Per-request fetch timeout in seconds
    #[arg(long, default_value_t = 10)]
    pub timeout_secs: u64,

    /// Run a single cycle, print the snapshot and exit
    #[arg(long)]
    pub once: bool,
}

impl Cli {
    pub fn to_config(&self) -> AggregatorConfig {
        let mut config = AggregatorConfig {
            interval_secs: self.interval_secs,
            max_entries: self.max_entries,
            ..AggregatorConfig::default()
        };
        config.fetch.timeout_seconds = self.timeout_secs;
        config
    }

    pub fn registry(&self) -> Result<SourceRegistry> {
        match &self.sources {
            Some(path) => SourceRegistry::from_json_file(path),
            None => Ok(SourceRegistry::entertainment()),
        }
    }
}
