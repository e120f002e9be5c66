use crate::sources::SourceRegistry;
use crate::types::Article;
use chrono::{DateTime, Duration, Utc};
use tracing::{debug, warn};

pub const DEFAULT_TRENDING_LIMIT: usize = 20;
pub const HIGH_TRUST_BONUS: f64 = 1.5;
pub const BREAKING_BONUS: f64 = 3.0;

/// (upper bound in hours, score) buckets for recency.
const TIME_BUCKETS: &[(f64, f64)] = &[(1.0, 10.0), (3.0, 8.0), (6.0, 6.0), (12.0, 4.0), (24.0, 2.0)];
const STALE_SCORE: f64 = 1.0;

/// Tolerated clock skew for timestamps that lie slightly in the future.
fn max_clock_skew() -> Duration {
    Duration::minutes(5)
}

/// All articles newest first, with breaking news hoisted to the front as a
/// block. Order within each block is stable.
pub fn date_prioritized(articles: &[Article]) -> Vec<Article> {
    let mut sorted = articles.to_vec();
    sorted.sort_by(|a, b| b.published_at.cmp(&a.published_at));
    let (mut breaking, rest): (Vec<Article>, Vec<Article>) =
        sorted.into_iter().partition(|a| a.breaking_news);
    breaking.extend(rest);
    breaking
}

pub fn time_score(hours_since_publication: f64) -> f64 {
    TIME_BUCKETS
        .iter()
        .find(|(limit, _)| hours_since_publication < *limit)
        .map(|(_, score)| *score)
        .unwrap_or(STALE_SCORE)
}

/// Age in hours, or `None` when the timestamp cannot be interpreted as a
/// past instant.
fn hours_since(published_at: DateTime<Utc>, now: DateTime<Utc>) -> Option<f64> {
    let age = now.signed_duration_since(published_at);
    if age < -max_clock_skew() {
        return None;
    }
    Some(age.num_seconds().max(0) as f64 / 3600.0)
}

pub fn trending_score(article: &Article, registry: &SourceRegistry, now: DateTime<Utc>) -> f64 {
    let Some(hours) = hours_since(article.published_at, now) else {
        warn!(
            "Unusable publication time {} for {}, scoring 0",
            article.published_at, article.id
        );
        return 0.0;
    };
    let source_bonus = if registry.is_high_trust(&article.source) {
        HIGH_TRUST_BONUS
    } else {
        1.0
    };
    let breaking_bonus = if article.breaking_news { BREAKING_BONUS } else { 1.0 };
    time_score(hours) * source_bonus * breaking_bonus
}

/// Top `limit` articles by descending trending score. Ties keep input order.
pub fn trending(
    articles: &[Article],
    registry: &SourceRegistry,
    now: DateTime<Utc>,
    limit: usize,
) -> Vec<Article> {
    let mut scored: Vec<Article> = articles
        .iter()
        .cloned()
        .map(|mut article| {
            article.trending_score = trending_score(&article, registry, now);
            article
        })
        .collect();
    scored.sort_by(|a, b| b.trending_score.total_cmp(&a.trending_score));
    scored.truncate(limit);
    debug!("Trending list holds {} of {} articles", scored.len(), articles.len());
    scored
}
