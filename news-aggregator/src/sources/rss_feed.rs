use crate::fetcher::Fetcher;
use crate::parser::FeedParser;
use crate::sources::FeedSource;
use crate::traits::PullFeed;
use crate::types::{FetchConfig, RawEntry, Result};
use async_trait::async_trait;
use tracing::{debug, info};

/// Pulls a syndication feed over HTTP and parses it into raw entries.
pub struct RssPuller {
    fetcher: Fetcher,
    parser: FeedParser,
}

impl RssPuller {
    pub fn new(fetch_config: FetchConfig, max_entries: usize) -> Result<Self> {
        Ok(Self {
            fetcher: Fetcher::new(fetch_config)?,
            parser: FeedParser::new(max_entries),
        })
    }

    pub fn from_parts(fetcher: Fetcher, parser: FeedParser) -> Self {
        Self { fetcher, parser }
    }
}

#[async_trait]
impl PullFeed for RssPuller {
    async fn pull(&self, source: &FeedSource) -> Result<Vec<RawEntry>> {
        debug!("Pulling {} from {}", source.name, source.url);
        let body = self.fetcher.fetch_feed(source).await?;
        let entries = self.parser.parse(&source.name, &body)?;
        info!("Pulled {} entries from {}", entries.len(), source.name);
        Ok(entries)
    }
}
