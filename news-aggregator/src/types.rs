use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Polarity label attached to every article.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sentiment {
    Positive,
    Negative,
    #[default]
    Neutral,
}

impl Sentiment {
    pub const POSITIVE_THRESHOLD: f64 = 0.05;
    pub const NEGATIVE_THRESHOLD: f64 = -0.05;

    /// Map a compound polarity score in `[-1, 1]` onto a label.
    pub fn from_compound(compound: f64) -> Self {
        if compound >= Self::POSITIVE_THRESHOLD {
            Sentiment::Positive
        } else if compound <= Self::NEGATIVE_THRESHOLD {
            Sentiment::Negative
        } else {
            Sentiment::Neutral
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Sentiment::Positive => "positive",
            Sentiment::Negative => "negative",
            Sentiment::Neutral => "neutral",
        }
    }
}

impl fmt::Display for Sentiment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A fully enriched article. Every field is populated, missing source data
/// is replaced with documented defaults during enrichment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Article {
    pub id: String,
    pub title: String,
    pub link: String,
    pub source: String,
    pub summary: String,
    pub published_at: DateTime<Utc>,
    pub sentiment: Sentiment,
    pub categories: Vec<String>,
    pub breaking_news: bool,
    pub image_url: Option<String>,
    #[serde(default)]
    pub trending_score: f64,
    #[serde(default)]
    pub popularity: u64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SentimentCounts {
    pub positive: u64,
    pub negative: u64,
    pub neutral: u64,
}

impl SentimentCounts {
    pub fn record(&mut self, sentiment: Sentiment) {
        match sentiment {
            Sentiment::Positive => self.positive += 1,
            Sentiment::Negative => self.negative += 1,
            Sentiment::Neutral => self.neutral += 1,
        }
    }

    pub fn total(&self) -> u64 {
        self.positive + self.negative + self.neutral
    }
}

/// Per-source counters. Accumulated across cycles for the life of the process.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceStats {
    pub total_articles: u64,
    pub breaking_news: u64,
    pub sentiment: SentimentCounts,
}

impl SourceStats {
    pub fn record(&mut self, article: &Article) {
        self.total_articles += 1;
        if article.breaking_news {
            self.breaking_news += 1;
        }
        self.sentiment.record(article.sentiment);
    }

    pub fn merge(&mut self, delta: &SourceStats) {
        self.total_articles += delta.total_articles;
        self.breaking_news += delta.breaking_news;
        self.sentiment.positive += delta.sentiment.positive;
        self.sentiment.negative += delta.sentiment.negative;
        self.sentiment.neutral += delta.sentiment.neutral;
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthStatus {
    pub last_update: Option<DateTime<Utc>>,
    /// Sources whose most recent fetch failed, with the error message.
    pub failed_sources: BTreeMap<String, String>,
    /// Cumulative count of collapsed duplicates since process start.
    pub duplicates_removed: u64,
}

/// Candidate text blocks of a raw entry, tried in declaration order when
/// building the summary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TextBlock {
    Summary(String),
    Description(String),
    Content(String),
}

impl TextBlock {
    pub fn rank(&self) -> u8 {
        match self {
            TextBlock::Summary(_) => 0,
            TextBlock::Description(_) => 1,
            TextBlock::Content(_) => 2,
        }
    }

    pub fn body(&self) -> &str {
        match self {
            TextBlock::Summary(s) | TextBlock::Description(s) | TextBlock::Content(s) => s,
        }
    }
}

/// Image hints found on a raw entry, tried in declaration order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImageHint {
    /// Media RSS attachment or thumbnail.
    Media(String),
    /// Enclosure with its declared MIME type.
    Enclosure { url: String, mime: String },
    /// HTML from the content body that may contain an `<img>`.
    ContentMarkup(String),
    /// HTML from the summary that may contain an `<img>`.
    SummaryMarkup(String),
}

impl ImageHint {
    pub fn rank(&self) -> u8 {
        match self {
            ImageHint::Media(_) => 0,
            ImageHint::Enclosure { .. } => 1,
            ImageHint::ContentMarkup(_) => 2,
            ImageHint::SummaryMarkup(_) => 3,
        }
    }
}

/// One entry as extracted from a feed document, before enrichment.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawEntry {
    pub title: String,
    pub link: String,
    pub published: Option<DateTime<Utc>>,
    pub updated: Option<DateTime<Utc>>,
    pub text_blocks: Vec<TextBlock>,
    pub image_hints: Vec<ImageHint>,
}

#[derive(Debug, Clone)]
pub struct FetchConfig {
    pub user_agent: String,
    pub timeout_seconds: u64,
    pub max_retries: u32,
    pub initial_backoff_ms: u64,
    pub backoff_multiplier: f64,
    pub max_redirects: usize,
    pub retry_statuses: Vec<u16>,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            user_agent: "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0.0.0 Safari/537.36".to_string(),
            timeout_seconds: 10,
            max_retries: 3,
            initial_backoff_ms: 500,
            backoff_multiplier: 2.0,
            max_redirects: 5,
            retry_statuses: vec![429, 500, 502, 503, 504],
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum AggregatorError {
    #[error("Failed to fetch {source_name}: {reason}")]
    Fetch { source_name: String, reason: String },

    #[error("Failed to parse feed from {source_name}: {reason}")]
    Parse { source_name: String, reason: String },

    #[error("Enrichment error: {0}")]
    Enrichment(String),

    #[error("Mirror error: {0}")]
    Mirror(String),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("General error: {0}")]
    General(String),
}

impl AggregatorError {
    /// The source a fetch or parse failure belongs to.
    pub fn source_name(&self) -> Option<&str> {
        match self {
            AggregatorError::Fetch { source_name, .. } | AggregatorError::Parse { source_name, .. } => {
                Some(source_name)
            }
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, AggregatorError>;
