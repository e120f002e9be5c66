pub mod types;
pub mod sources;
pub mod traits;
pub mod fetcher;
pub mod parser;
pub mod sentiment;
pub mod enrichment;
pub mod dedup;
pub mod ranking;
pub mod aggregation;
pub mod cache;
pub mod mirror;
pub mod pipeline;
pub mod scheduler;
pub mod config;

pub use types::*;
pub use sources::{FeedSource, RssPuller, SourceRegistry};
pub use traits::{PullFeed, SentimentModel, SnapshotMirror};
pub use fetcher::Fetcher;
pub use parser::FeedParser;
pub use sentiment::LexiconSentiment;
pub use enrichment::{CategoryTable, Enricher};
pub use cache::{CachePublisher, CacheSnapshot, CycleOutput, SharedCache};
pub use mirror::PgSnapshotMirror;
pub use pipeline::{CycleReport, IngestionPipeline};
pub use scheduler::{Scheduler, SchedulerState};
pub use config::{AggregatorConfig, Cli};
