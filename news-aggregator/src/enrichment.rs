use crate::traits::SentimentModel;
use crate::types::{Article, RawEntry, Sentiment};
use chrono::{DateTime, Utc};
use sha2::{Digest, Sha256};
use std::sync::Arc;
use tracing::{debug, warn};

pub const GENERAL_CATEGORY: &str = "General";
pub const DEFAULT_SUMMARY_LIMIT: usize = 250;
const ELLIPSIS: &str = "...";

pub const BREAKING_KEYWORDS: &[&str] = &["breaking", "urgent", "just in", "alert", "exclusive", "update"];

const ENTERTAINMENT_CATEGORIES: &[(&str, &[&str])] = &[
    ("Movies", &["movie", "film", "cinema", "box office", "hollywood", "director", "actor", "actress", "oscars", "academy awards"]),
    ("TV", &["tv", "television", "show", "series", "episode", "streaming", "netflix", "hulu", "disney+", "hbo", "amazon prime"]),
    ("Music", &["music", "song", "album", "artist", "concert", "tour", "singer", "band", "grammy", "billboard"]),
    ("Celebrity", &["celebrity", "star", "famous", "gossip", "divorce", "wedding", "relationship", "red carpet"]),
    ("Gaming", &["game", "gaming", "playstation", "xbox", "nintendo", "console", "pc gaming", "esports"]),
    ("Tech", &["tech", "technology", "gadget", "apple", "iphone", "android", "samsung", "device"]),
];

/// Ordered category → keyword table. Keywords are case-folded once.
#[derive(Debug, Clone)]
pub struct CategoryTable {
    entries: Vec<(String, Vec<String>)>,
}

impl CategoryTable {
    pub fn new<I, K>(entries: I) -> Self
    where
        I: IntoIterator<Item = (String, K)>,
        K: IntoIterator<Item = String>,
    {
        let entries = entries
            .into_iter()
            .map(|(name, keywords)| {
                let keywords = keywords.into_iter().map(|k| k.to_lowercase()).collect();
                (name, keywords)
            })
            .collect();
        Self { entries }
    }

    pub fn entertainment() -> Self {
        Self::new(ENTERTAINMENT_CATEGORIES.iter().map(|(name, keywords)| {
            (name.to_string(), keywords.iter().map(|k| k.to_string()))
        }))
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(name, _)| name.as_str())
    }

    /// Every category with at least one keyword contained in `text`, in table
    /// order. Never empty: falls back to `General`.
    pub fn classify(&self, text: &str) -> Vec<String> {
        let text = text.to_lowercase();
        let categories: Vec<String> = self
            .entries
            .iter()
            .filter(|(_, keywords)| keywords.iter().any(|k| text.contains(k.as_str())))
            .map(|(name, _)| name.clone())
            .collect();

        if categories.is_empty() {
            vec![GENERAL_CATEGORY.to_string()]
        } else {
            categories
        }
    }
}

impl Default for CategoryTable {
    fn default() -> Self {
        Self::entertainment()
    }
}

/// Stable dedup key: hex SHA-256 of title followed by link.
pub fn article_id(title: &str, link: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(title.as_bytes());
    hasher.update(link.as_bytes());
    hex::encode(hasher.finalize())
}

pub fn is_breaking_news(title: &str, summary: &str) -> bool {
    let combined = format!("{} {}", title, summary).to_lowercase();
    BREAKING_KEYWORDS.iter().any(|k| combined.contains(k))
}

/// Truncate to `limit` characters, appending an ellipsis when cut.
pub fn truncate_summary(text: &str, limit: usize) -> String {
    match text.char_indices().nth(limit) {
        Some((byte_index, _)) => format!("{}{}", &text[..byte_index], ELLIPSIS),
        None => text.to_string(),
    }
}

/// Pure per-article enrichment. Never drops an article: a failing sentiment
/// model degrades to neutral.
pub struct Enricher {
    categories: CategoryTable,
    sentiment: Arc<dyn SentimentModel>,
    summary_limit: usize,
}

impl Enricher {
    pub fn new(sentiment: Arc<dyn SentimentModel>, summary_limit: usize) -> Self {
        Self {
            categories: CategoryTable::entertainment(),
            sentiment,
            summary_limit,
        }
    }

    pub fn with_categories(mut self, categories: CategoryTable) -> Self {
        self.categories = categories;
        self
    }

    pub fn categories(&self) -> &CategoryTable {
        &self.categories
    }

    pub fn enrich(&self, source: &str, entry: &RawEntry, ingested_at: DateTime<Utc>) -> Article {
        let summary = truncate_summary(&entry.summary_text(), self.summary_limit);
        let full_text = format!("{} {}", entry.title, summary);

        Article {
            id: article_id(&entry.title, &entry.link),
            title: entry.title.clone(),
            link: entry.link.clone(),
            source: source.to_string(),
            published_at: entry.published_or(ingested_at),
            sentiment: self.classify_sentiment(&full_text),
            categories: self.categories.classify(&full_text),
            breaking_news: is_breaking_news(&entry.title, &summary),
            image_url: entry.image_url(),
            summary,
            trending_score: 0.0,
            popularity: 0,
        }
    }

    pub fn enrich_all(&self, source: &str, entries: &[RawEntry], ingested_at: DateTime<Utc>) -> Vec<Article> {
        let articles: Vec<Article> = entries
            .iter()
            .map(|entry| self.enrich(source, entry, ingested_at))
            .collect();
        debug!("Enriched {} articles from {}", articles.len(), source);
        articles
    }

    fn classify_sentiment(&self, text: &str) -> Sentiment {
        match self.sentiment.compound(text) {
            Ok(compound) => Sentiment::from_compound(compound),
            Err(e) => {
                warn!("Sentiment model {} failed, using neutral: {}", self.sentiment.name(), e);
                Sentiment::Neutral
            }
        }
    }
}
