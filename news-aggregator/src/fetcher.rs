use crate::sources::FeedSource;
use crate::types::{AggregatorError, FetchConfig, Result};
use backoff::{backoff::Backoff, exponential::ExponentialBackoff};
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, ACCEPT_LANGUAGE, CACHE_CONTROL};
use reqwest::{Client, StatusCode};
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Outcome of a single GET attempt.
enum AttemptError {
    Transient(String),
    Fatal(String),
}

pub struct Fetcher {
    client: Client,
    config: FetchConfig,
}

impl Fetcher {
    pub fn new(config: FetchConfig) -> Result<Self> {
        let client = Client::builder()
            .user_agent(&config.user_agent)
            .default_headers(browser_headers())
            .timeout(Duration::from_secs(config.timeout_seconds))
            .gzip(true)
            .deflate(true)
            .brotli(true)
            .redirect(reqwest::redirect::Policy::limited(config.max_redirects))
            .build()?;

        Ok(Self { client, config })
    }

    pub fn config(&self) -> &FetchConfig {
        &self.config
    }

    /// Fetch the raw document for one source, retrying transient failures
    /// with exponential backoff up to `max_retries` extra attempts.
    pub async fn fetch_feed(&self, source: &FeedSource) -> Result<Vec<u8>> {
        let start_time = Instant::now();
        let mut backoff = self.backoff();
        let max_attempts = self.config.max_retries + 1;
        let mut attempt = 0;

        debug!("Fetching feed: {} ({})", source.name, source.url);

        let reason = loop {
            attempt += 1;
            match self.attempt(&source.url).await {
                Ok(body) => {
                    info!(
                        "Fetched {} ({} bytes in {}ms)",
                        source.name,
                        body.len(),
                        start_time.elapsed().as_millis()
                    );
                    return Ok(body);
                }
                Err(AttemptError::Fatal(reason)) => break reason,
                Err(AttemptError::Transient(reason)) => {
                    if attempt >= max_attempts {
                        break format!("{} after {} attempts", reason, attempt);
                    }
                    match backoff.next_backoff() {
                        Some(delay) => {
                            warn!(
                                "Attempt {} failed for {}: {}, retrying in {:?}",
                                attempt, source.name, reason, delay
                            );
                            tokio::time::sleep(delay).await;
                        }
                        None => break reason,
                    }
                }
            }
        };

        Err(AggregatorError::Fetch {
            source_name: source.name.clone(),
            reason,
        })
    }

    async fn attempt(&self, url: &str) -> std::result::Result<Vec<u8>, AttemptError> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(classify_transport_error)?;

        let status = response.status();
        if !status.is_success() {
            let reason = format!(
                "HTTP {}: {}",
                status.as_u16(),
                status.canonical_reason().unwrap_or("Unknown")
            );
            return Err(if self.is_retryable_status(status) {
                AttemptError::Transient(reason)
            } else {
                AttemptError::Fatal(reason)
            });
        }

        let body = response
            .bytes()
            .await
            .map_err(classify_transport_error)?;
        Ok(body.to_vec())
    }

    fn is_retryable_status(&self, status: StatusCode) -> bool {
        self.config.retry_statuses.contains(&status.as_u16())
    }

    fn backoff(&self) -> ExponentialBackoff<backoff::SystemClock> {
        let initial = Duration::from_millis(self.config.initial_backoff_ms);
        let mut backoff = ExponentialBackoff {
            current_interval: initial,
            initial_interval: initial,
            randomization_factor: 0.0,
            multiplier: self.config.backoff_multiplier,
            max_interval: initial * 32,
            // Attempts are bounded by max_retries, not by elapsed time.
            max_elapsed_time: None,
            ..Default::default()
        };
        backoff.reset();
        backoff
    }
}

fn classify_transport_error(err: reqwest::Error) -> AttemptError {
    if err.is_connect() || err.is_timeout() || err.is_request() || err.is_body() {
        AttemptError::Transient(err.to_string())
    } else {
        AttemptError::Fatal(err.to_string())
    }
}

/// Header set that looks like a desktop browser so upstream CDNs do not
/// reject the request outright.
fn browser_headers() -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(
        ACCEPT,
        HeaderValue::from_static(
            "application/rss+xml, application/atom+xml, application/xml;q=0.9, text/xml;q=0.8, */*;q=0.7",
        ),
    );
    headers.insert(ACCEPT_LANGUAGE, HeaderValue::from_static("en-US,en;q=0.9"));
    headers.insert(CACHE_CONTROL, HeaderValue::from_static("no-cache"));
    headers
}
