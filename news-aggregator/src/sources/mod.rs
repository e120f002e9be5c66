pub mod rss_feed;

pub use rss_feed::RssPuller;

use crate::types::{AggregatorError, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;
use url::Url;

/// Built-in entertainment sources: (name, feed url, high trust).
const ENTERTAINMENT_SOURCES: &[(&str, &str, bool)] = &[
    ("New York Times", "https://rss.nytimes.com/services/xml/rss/nyt/Movies.xml", true),
    ("BBC", "http://feeds.bbci.co.uk/news/entertainment_and_arts/rss.xml", true),
    ("Hollywood Reporter", "https://www.hollywoodreporter.com/t/entertainment/feed/", false),
    ("Variety", "https://variety.com/feed/", false),
    ("TMZ", "https://www.tmz.com/rss.xml", false),
    ("Deadline", "https://deadline.com/feed/", false),
    ("People", "https://people.com/feed/", false),
    ("E! Online", "https://www.eonline.com/news/rss", false),
    ("Entertainment Weekly", "https://ew.com/feed/", false),
    ("IGN", "https://www.ign.com/articles?format=rss", false),
    ("CNET", "https://www.cnet.com/rss/news/", false),
];

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeedSource {
    pub name: String,
    pub url: String,
    /// High-trust sources win deduplication ties and get a ranking bonus.
    #[serde(default)]
    pub high_trust: bool,
}

impl FeedSource {
    pub fn new(name: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            url: url.into(),
            high_trust: false,
        }
    }

    pub fn high_trust(mut self) -> Self {
        self.high_trust = true;
        self
    }
}

/// Static mapping of source name to feed URL. This is the only place the
/// high-trust allowlist lives.
#[derive(Debug, Clone, Default)]
pub struct SourceRegistry {
    sources: Vec<FeedSource>,
}

impl SourceRegistry {
    /// Build a registry, rejecting duplicate names and non-http(s) URLs.
    pub fn new(sources: Vec<FeedSource>) -> Result<Self> {
        let mut seen = HashSet::new();
        for source in &sources {
            if !seen.insert(source.name.as_str()) {
                return Err(AggregatorError::Config(format!(
                    "duplicate source name: {}",
                    source.name
                )));
            }
            let url = Url::parse(&source.url)?;
            if url.scheme() != "http" && url.scheme() != "https" {
                return Err(AggregatorError::Config(format!(
                    "unsupported scheme for {}: {}",
                    source.name,
                    url.scheme()
                )));
            }
        }
        Ok(Self { sources })
    }

    pub fn entertainment() -> Self {
        let sources = ENTERTAINMENT_SOURCES
            .iter()
            .map(|(name, url, high_trust)| FeedSource {
                name: name.to_string(),
                url: url.to_string(),
                high_trust: *high_trust,
            })
            .collect();
        Self { sources }
    }

    /// Load a JSON array of `{ "name", "url", "high_trust" }` objects.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let sources: Vec<FeedSource> = serde_json::from_str(json)?;
        Self::new(sources)
    }

    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json_str(&json)
    }

    pub fn sources(&self) -> &[FeedSource] {
        &self.sources
    }

    pub fn get(&self, name: &str) -> Option<&FeedSource> {
        self.sources.iter().find(|s| s.name == name)
    }

    pub fn is_high_trust(&self, name: &str) -> bool {
        self.get(name).map(|s| s.high_trust).unwrap_or(false)
    }

    pub fn len(&self) -> usize {
        self.sources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }
}
