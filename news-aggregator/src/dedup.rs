use crate::sources::SourceRegistry;
use crate::types::Article;
use std::collections::HashMap;
use tracing::{debug, info};

#[derive(Debug, Clone, Default)]
pub struct DedupOutcome {
    /// Survivors, in order of first occurrence of each id.
    pub articles: Vec<Article>,
    /// Entries collapsed this cycle.
    pub duplicates: u64,
}

/// Collapse articles sharing an id. The first occurrence wins unless the
/// incoming duplicate is breaking news over a non-breaking stored copy, or
/// comes from a high-trust source.
pub fn deduplicate(articles: Vec<Article>, registry: &SourceRegistry) -> DedupOutcome {
    let mut positions: HashMap<String, usize> = HashMap::with_capacity(articles.len());
    let mut unique: Vec<Article> = Vec::with_capacity(articles.len());
    let mut duplicates = 0u64;

    for incoming in articles {
        let Some(&index) = positions.get(&incoming.id) else {
            positions.insert(incoming.id.clone(), unique.len());
            unique.push(incoming);
            continue;
        };

        duplicates += 1;
        let stored = &unique[index];
        if should_replace(stored, &incoming, registry) {
            debug!(
                "Replacing duplicate {} from {} with copy from {}",
                incoming.id, stored.source, incoming.source
            );
            unique[index] = incoming;
        } else {
            debug!("Dropping duplicate {} from {}", incoming.id, incoming.source);
        }
    }

    if duplicates > 0 {
        info!("Removed {} duplicate articles", duplicates);
    }

    DedupOutcome {
        articles: unique,
        duplicates,
    }
}

fn should_replace(stored: &Article, incoming: &Article, registry: &SourceRegistry) -> bool {
    if incoming.breaking_news && !stored.breaking_news {
        return true;
    }
    registry.is_high_trust(&incoming.source)
}
