use news_aggregator::types::{AggregatorError, FetchConfig, Result};
use news_aggregator::{
    AggregatorConfig, FeedSource, Fetcher, IngestionPipeline, PullFeed, RssPuller, SharedCache,
    SourceRegistry,
};
use wiremock::matchers::{header, header_exists, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const RSS: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<rss version="2.0">
  <channel>
    <title>Mock Entertainment</title>
    <link>http://mock.example/</link>
    <description>Mock feed</description>
    <item>
      <title>Breaking: Director Signs Sequel Deal</title>
      <link>http://mock.example/sequel</link>
      <description>&lt;p&gt;The film studio confirmed the deal.&lt;/p&gt;</description>
      <pubDate>Mon, 06 Sep 2021 16:45:00 GMT</pubDate>
      <enclosure url="http://mock.example/sequel.jpg" type="image/jpeg" length="1024"/>
    </item>
    <item>
      <title>Band Announces World Tour</title>
      <link>http://mock.example/tour</link>
      <description>Dates for the concert tour are out.</description>
    </item>
  </channel>
</rss>"#;

fn fast_config() -> FetchConfig {
    FetchConfig {
        timeout_seconds: 2,
        initial_backoff_ms: 10,
        ..FetchConfig::default()
    }
}

fn source(server: &MockServer, name: &str, route: &str) -> FeedSource {
    FeedSource::new(name, format!("{}{}", server.uri(), route))
}

#[tokio::test]
async fn retries_transient_status_then_succeeds() -> Result<()> {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/feed"))
        .respond_with(ResponseTemplate::new(503))
        .up_to_n_times(2)
        .expect(2)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/feed"))
        .respond_with(ResponseTemplate::new(200).set_body_string(RSS))
        .expect(1)
        .mount(&server)
        .await;

    let fetcher = Fetcher::new(fast_config())?;
    let body = fetcher.fetch_feed(&source(&server, "Mock", "/feed")).await?;
    assert_eq!(body, RSS.as_bytes());
    Ok(())
}

#[tokio::test]
async fn gives_up_after_retry_budget() -> Result<()> {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/feed"))
        .respond_with(ResponseTemplate::new(500))
        .expect(4)
        .mount(&server)
        .await;

    let fetcher = Fetcher::new(fast_config())?;
    let err = fetcher
        .fetch_feed(&source(&server, "Mock", "/feed"))
        .await
        .unwrap_err();
    assert_eq!(err.source_name(), Some("Mock"));
    assert!(err.to_string().contains("after 4 attempts"));
    Ok(())
}

#[tokio::test]
async fn does_not_retry_client_errors() -> Result<()> {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/missing"))
        .respond_with(ResponseTemplate::new(404))
        .expect(1)
        .mount(&server)
        .await;

    let fetcher = Fetcher::new(fast_config())?;
    let err = fetcher
        .fetch_feed(&source(&server, "Mock", "/missing"))
        .await
        .unwrap_err();
    match err {
        AggregatorError::Fetch { source_name, reason } => {
            assert_eq!(source_name, "Mock");
            assert!(reason.contains("404"));
        }
        other => panic!("unexpected error: {other}"),
    }
    Ok(())
}

#[tokio::test]
async fn connection_failure_is_a_fetch_error() -> Result<()> {
    let fetcher = Fetcher::new(fast_config())?;
    let err = fetcher
        .fetch_feed(&FeedSource::new("Offline", "http://127.0.0.1:1/rss"))
        .await
        .unwrap_err();
    assert!(matches!(err, AggregatorError::Fetch { .. }));
    assert_eq!(err.source_name(), Some("Offline"));
    Ok(())
}

#[tokio::test]
async fn sends_browser_headers() -> Result<()> {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(header_exists("user-agent"))
        .and(header_exists("accept-language"))
        .and(header("cache-control", "no-cache"))
        .respond_with(ResponseTemplate::new(200).set_body_string(RSS))
        .expect(1)
        .mount(&server)
        .await;

    let fetcher = Fetcher::new(fast_config())?;
    fetcher.fetch_feed(&source(&server, "Mock", "/feed")).await?;
    Ok(())
}

#[tokio::test]
async fn rss_puller_parses_served_feed() -> Result<()> {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/rss"))
        .respond_with(ResponseTemplate::new(200).set_body_string(RSS))
        .mount(&server)
        .await;

    let puller = RssPuller::new(fast_config(), 15)?;
    let entries = puller.pull(&source(&server, "Mock", "/rss")).await?;
    assert_eq!(entries.len(), 2);
    assert_eq!(entries[0].title, "Breaking: Director Signs Sequel Deal");
    assert_eq!(entries[0].summary_text(), "The film studio confirmed the deal.");
    assert_eq!(
        entries[0].image_url().as_deref(),
        Some("http://mock.example/sequel.jpg")
    );
    assert!(entries[1].published.is_none());
    Ok(())
}

#[tokio::test]
async fn full_cycle_against_mock_server() -> Result<()> {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/good"))
        .respond_with(ResponseTemplate::new(200).set_body_string(RSS))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/broken"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>not a feed</html>"))
        .mount(&server)
        .await;

    let registry = SourceRegistry::new(vec![
        source(&server, "Good", "/good"),
        source(&server, "Broken", "/broken"),
    ])?;
    let config = AggregatorConfig {
        fetch: fast_config(),
        ..AggregatorConfig::default()
    };
    let cache = SharedCache::new();
    let pipeline = IngestionPipeline::from_config(config, registry, cache.clone(), None)?;

    let report = pipeline.run_cycle().await?;
    assert_eq!(report.sources_ok, 1);
    assert_eq!(report.sources_failed, 1);
    assert_eq!(report.unique, 2);

    let snapshot = cache.snapshot().await;
    assert!(snapshot.articles[0].breaking_news);
    assert_eq!(snapshot.category("Movies").len(), 1);
    assert_eq!(snapshot.category("Music").len(), 1);
    assert!(snapshot.health.failed_sources["Broken"].starts_with("Failed to parse feed from Broken"));
    Ok(())
}
