use crate::types::{Article, SourceStats};
use std::collections::BTreeMap;

pub const DEFAULT_CATEGORY_LIMIT: usize = 50;

/// Counts contributed by this cycle's articles, keyed by source. The
/// publisher adds these to its running totals.
pub fn source_stats_delta(articles: &[Article]) -> BTreeMap<String, SourceStats> {
    let mut stats: BTreeMap<String, SourceStats> = BTreeMap::new();
    for article in articles {
        stats.entry(article.source.clone()).or_default().record(article);
    }
    stats
}

/// Fan every article out to each of its categories, newest first, at most
/// `limit` per bucket.
pub fn category_buckets(articles: &[Article], limit: usize) -> BTreeMap<String, Vec<Article>> {
    let mut buckets: BTreeMap<String, Vec<Article>> = BTreeMap::new();
    for article in articles {
        for category in &article.categories {
            buckets.entry(category.clone()).or_default().push(article.clone());
        }
    }
    for bucket in buckets.values_mut() {
        bucket.sort_by(|a, b| b.published_at.cmp(&a.published_at));
        bucket.truncate(limit);
    }
    buckets
}
