use crate::types::{AggregatorError, ImageHint, RawEntry, Result, TextBlock};
use chrono::{DateTime, Utc};
use feed_rs::model::{Entry, FeedType, Link};
use feed_rs::parser;
use scraper::{Html, Selector};
use tracing::debug;
use url::Url;

pub const DEFAULT_MAX_ENTRIES: usize = 15;

/// Turns a fetched feed document into at most `max_entries` raw entries.
pub struct FeedParser {
    max_entries: usize,
}

impl FeedParser {
    pub fn new(max_entries: usize) -> Self {
        Self { max_entries }
    }

    pub fn max_entries(&self) -> usize {
        self.max_entries
    }

    /// Malformed and entry-less documents both come back as
    /// `AggregatorError::Parse` so the caller can report them per source.
    pub fn parse(&self, source_name: &str, content: &[u8]) -> Result<Vec<RawEntry>> {
        debug!("Parsing feed content for {} ({} bytes)", source_name, content.len());

        let feed = parser::parse(content).map_err(|e| AggregatorError::Parse {
            source_name: source_name.to_string(),
            reason: e.to_string(),
        })?;

        // RSS folds <description> into the summary slot.
        let summary_is_description = matches!(
            feed.feed_type,
            FeedType::RSS0 | FeedType::RSS1 | FeedType::RSS2
        );

        let entries: Vec<RawEntry> = feed
            .entries
            .into_iter()
            .map(|entry| convert_entry(entry, summary_is_description))
            .take(self.max_entries)
            .collect();

        if entries.is_empty() {
            return Err(AggregatorError::Parse {
                source_name: source_name.to_string(),
                reason: "feed contains no usable entries".to_string(),
            });
        }

        debug!("Parsed {} entries from {}", entries.len(), source_name);
        Ok(entries)
    }
}

impl Default for FeedParser {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_ENTRIES)
    }
}

fn convert_entry(entry: Entry, summary_is_description: bool) -> RawEntry {
    let link = primary_link(&entry.links).unwrap_or_default();
    let title = entry
        .title
        .map(|t| strip_markup(&t.content))
        .unwrap_or_default();

    let mut text_blocks = Vec::new();
    let mut image_hints = Vec::new();

    for media in &entry.media {
        for thumbnail in &media.thumbnails {
            image_hints.push(ImageHint::Media(thumbnail.image.uri.clone()));
        }
        for content in &media.content {
            let Some(url) = &content.url else { continue };
            let hint = match &content.content_type {
                Some(mime) => ImageHint::Enclosure {
                    url: url.to_string(),
                    mime: mime.essence_str().to_string(),
                },
                None => ImageHint::Media(url.to_string()),
            };
            image_hints.push(hint);
        }
    }

    if let Some(summary) = entry.summary {
        image_hints.push(ImageHint::SummaryMarkup(summary.content.clone()));
        text_blocks.push(if summary_is_description {
            TextBlock::Description(summary.content)
        } else {
            TextBlock::Summary(summary.content)
        });
    }

    if let Some(body) = entry.content.and_then(|c| c.body) {
        image_hints.push(ImageHint::ContentMarkup(body.clone()));
        text_blocks.push(TextBlock::Content(body));
    }

    RawEntry {
        title,
        link,
        published: entry.published,
        updated: entry.updated,
        text_blocks,
        image_hints,
    }
}

fn primary_link(links: &[Link]) -> Option<String> {
    links
        .iter()
        .find(|l| l.rel.as_deref().map_or(true, |rel| rel == "alternate"))
        .or_else(|| links.first())
        .map(|l| l.href.trim().to_string())
        .filter(|href| !href.is_empty())
}

impl RawEntry {
    /// published, then updated, then the supplied ingestion time.
    pub fn published_or(&self, ingested_at: DateTime<Utc>) -> DateTime<Utc> {
        self.published.or(self.updated).unwrap_or(ingested_at)
    }

    /// First non-empty text block in rank order, stripped of markup.
    pub fn summary_text(&self) -> String {
        let mut blocks: Vec<&TextBlock> = self.text_blocks.iter().collect();
        blocks.sort_by_key(|b| b.rank());
        blocks
            .into_iter()
            .map(|b| strip_markup(b.body()))
            .find(|text| !text.is_empty())
            .unwrap_or_default()
    }

    /// Best-effort image URL, resolved against the entry link when relative.
    pub fn image_url(&self) -> Option<String> {
        let mut hints: Vec<&ImageHint> = self.image_hints.iter().collect();
        hints.sort_by_key(|h| h.rank());
        let candidate = hints.into_iter().find_map(|hint| match hint {
            ImageHint::Media(url) => Some(url.clone()),
            ImageHint::Enclosure { url, mime } if mime.starts_with("image/") => Some(url.clone()),
            ImageHint::Enclosure { .. } => None,
            ImageHint::ContentMarkup(html) | ImageHint::SummaryMarkup(html) => first_image_src(html),
        })?;
        Some(resolve_url(&self.link, &candidate))
    }
}

fn resolve_url(base: &str, candidate: &str) -> String {
    if Url::parse(candidate).is_ok() {
        return candidate.to_string();
    }
    Url::parse(base)
        .and_then(|base| base.join(candidate))
        .map(|url| url.to_string())
        .unwrap_or_else(|_| candidate.to_string())
}

/// Text content of an HTML fragment with whitespace collapsed.
pub fn strip_markup(html: &str) -> String {
    if !html.contains('<') && !html.contains('&') {
        return collapse_whitespace(html);
    }
    let fragment = Html::parse_fragment(html);
    let text: String = fragment.root_element().text().collect();
    collapse_whitespace(&text)
}

fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// `src` of the first `<img>` in an HTML fragment.
pub fn first_image_src(html: &str) -> Option<String> {
    if !html.to_ascii_lowercase().contains("<img") {
        return None;
    }
    let selector = Selector::parse("img[src]").ok()?;
    let fragment = Html::parse_fragment(html);
    let src = fragment
        .select(&selector)
        .filter_map(|element| element.value().attr("src"))
        .map(str::trim)
        .find(|src| !src.is_empty())
        .map(str::to_string);
    src
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    const RSS: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<rss version="2.0">
  <channel>
    <title>Example Entertainment</title>
    <link>https://example.com</link>
    <description>Example feed</description>
    <item>
      <title>Film Wins Award</title>
      <link>https://example.com/film</link>
      <pubDate>Mon, 06 Jan 2025 10:00:00 GMT</pubDate>
      <description>A film &lt;b&gt;won&lt;/b&gt; the top prize.</description>
      <enclosure url="https://img.example.com/film.jpg" type="image/jpeg" length="1234"/>
    </item>
    <item>
      <title>Band Announces Tour</title>
      <link>https://example.com/tour</link>
      <description>&lt;p&gt;Hello &lt;img src="https://img.example.com/tour.png"/&gt; world&lt;/p&gt;</description>
    </item>
    <item>
      <title>No Link Here</title>
      <description>Kept with an empty link.</description>
    </item>
  </channel>
</rss>"#;

    const ATOM: &str = r#"<?xml version="1.0" encoding="utf-8"?>
<feed xmlns="http://www.w3.org/2005/Atom">
  <title>Atom Example</title>
  <id>urn:example</id>
  <updated>2025-01-06T10:00:00Z</updated>
  <entry>
    <title>Atom Entry</title>
    <link href="https://example.com/atom/1"/>
    <id>urn:example:1</id>
    <updated>2025-01-06T09:30:00Z</updated>
    <summary>Plain summary</summary>
  </entry>
</feed>"#;

    fn rss_with_items(count: usize) -> String {
        let items: String = (0..count)
            .map(|i| {
                format!(
                    "<item><title>Story {i}</title><link>https://example.com/{i}</link></item>"
                )
            })
            .collect();
        format!(
            r#"<?xml version="1.0"?><rss version="2.0"><channel><title>T</title><link>https://example.com</link><description>D</description>{items}</channel></rss>"#
        )
    }

    #[test]
    fn parses_rss_items_and_keeps_linkless_entries() {
        let parser = FeedParser::default();
        let entries = parser.parse("Example", RSS.as_bytes()).unwrap();

        assert_eq!(entries.len(), 3);
        assert_eq!(entries[2].title, "No Link Here");
        assert_eq!(entries[2].link, "");
        assert_eq!(entries[2].summary_text(), "Kept with an empty link.");
        assert_eq!(entries[0].title, "Film Wins Award");
        assert_eq!(entries[0].link, "https://example.com/film");
        assert_eq!(
            entries[0].published,
            Some(Utc.with_ymd_and_hms(2025, 1, 6, 10, 0, 0).unwrap())
        );
        assert_eq!(entries[0].summary_text(), "A film won the top prize.");
        assert!(entries[1].published.is_none());
    }

    #[test]
    fn extracts_images_from_enclosures_and_markup() {
        let parser = FeedParser::default();
        let entries = parser.parse("Example", RSS.as_bytes()).unwrap();

        assert_eq!(
            entries[0].image_url().as_deref(),
            Some("https://img.example.com/film.jpg")
        );
        assert_eq!(
            entries[1].image_url().as_deref(),
            Some("https://img.example.com/tour.png")
        );
        assert_eq!(entries[1].summary_text(), "Hello world");
    }

    #[test]
    fn caps_entries_per_source() {
        let parser = FeedParser::default();
        let entries = parser
            .parse("Busy", rss_with_items(40).as_bytes())
            .unwrap();
        assert_eq!(entries.len(), DEFAULT_MAX_ENTRIES);
        assert_eq!(entries[0].title, "Story 0");

        let small = FeedParser::new(3);
        assert_eq!(small.parse("Busy", rss_with_items(40).as_bytes()).unwrap().len(), 3);
    }

    #[test]
    fn atom_falls_back_to_updated_time() {
        let parser = FeedParser::default();
        let entries = parser.parse("Atom", ATOM.as_bytes()).unwrap();
        let now = Utc::now();

        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].summary_text(), "Plain summary");
        assert_eq!(
            entries[0].published_or(now),
            Utc.with_ymd_and_hms(2025, 1, 6, 9, 30, 0).unwrap()
        );
    }

    #[test]
    fn malformed_document_is_a_parse_error() {
        let parser = FeedParser::default();
        let err = parser.parse("Broken", b"this is not xml at all").unwrap_err();
        assert!(matches!(err, AggregatorError::Parse { .. }));
        assert_eq!(err.source_name(), Some("Broken"));
    }

    #[test]
    fn empty_channel_is_a_parse_error() {
        let parser = FeedParser::default();
        let err = parser.parse("Empty", rss_with_items(0).as_bytes()).unwrap_err();
        assert!(matches!(err, AggregatorError::Parse { .. }));
    }

    #[test]
    fn published_falls_back_to_ingestion_time() {
        let now = Utc::now();
        let entry = RawEntry {
            title: "t".into(),
            link: "https://example.com/t".into(),
            ..Default::default()
        };
        assert_eq!(entry.published_or(now), now);
        assert_eq!(entry.summary_text(), "");
        assert_eq!(entry.image_url(), None);
    }

    #[test]
    fn summary_prefers_summary_then_description_then_content() {
        let entry = RawEntry {
            link: "https://example.com/a".into(),
            text_blocks: vec![
                TextBlock::Content("<p>from content</p>".into()),
                TextBlock::Description("   ".into()),
                TextBlock::Summary("<i>from summary</i>".into()),
            ],
            ..Default::default()
        };
        assert_eq!(entry.summary_text(), "from summary");

        let entry = RawEntry {
            text_blocks: vec![
                TextBlock::Content("<p>from content</p>".into()),
                TextBlock::Description("<br/>".into()),
            ],
            ..Default::default()
        };
        assert_eq!(entry.summary_text(), "from content");
    }

    #[test]
    fn image_hints_follow_priority_order() {
        let entry = RawEntry {
            link: "https://example.com/news/story".into(),
            image_hints: vec![
                ImageHint::SummaryMarkup(r#"<img src="/summary.jpg">"#.into()),
                ImageHint::ContentMarkup(r#"<p><img src="content.jpg"></p>"#.into()),
                ImageHint::Enclosure {
                    url: "https://cdn.example.com/clip.mp4".into(),
                    mime: "video/mp4".into(),
                },
            ],
            ..Default::default()
        };
        // Video enclosures are not images; content markup wins over summary.
        assert_eq!(
            entry.image_url().as_deref(),
            Some("https://example.com/news/content.jpg")
        );

        let mut with_media = entry.clone();
        with_media
            .image_hints
            .push(ImageHint::Media("https://cdn.example.com/thumb.jpg".into()));
        assert_eq!(
            with_media.image_url().as_deref(),
            Some("https://cdn.example.com/thumb.jpg")
        );
    }

    #[test]
    fn strips_markup_and_collapses_whitespace() {
        assert_eq!(strip_markup("<p>Hello,\n  <b>world</b></p>"), "Hello, world");
        assert_eq!(strip_markup("  plain   text "), "plain text");
        assert_eq!(first_image_src("<p>no images</p>"), None);
    }

    #[test]
    fn inline_markup_does_not_split_words() {
        assert_eq!(strip_markup("The <b>film</b>, a hit."), "The film, a hit.");
        assert_eq!(strip_markup("<p><b>Holly</b>wood star</p>"), "Hollywood star");
        assert_eq!(strip_markup("Read <a href=\"x\">more</a>."), "Read more.");
    }

    #[test]
    fn keywords_split_by_markup_still_classify() {
        let entry = RawEntry {
            title: "Award season".to_string(),
            link: "https://example.com/a".to_string(),
            text_blocks: vec![TextBlock::Summary("<b>Holly</b>wood celebrates".to_string())],
            ..Default::default()
        };
        let summary = entry.summary_text();
        assert_eq!(summary, "Hollywood celebrates");
        let categories = crate::enrichment::CategoryTable::entertainment().classify(&summary);
        assert!(categories.contains(&"Movies".to_string()));
    }

    #[test]
    fn feed_of_linkless_items_still_yields_entries() {
        let rss = r#"<?xml version="1.0"?><rss version="2.0"><channel><title>T</title><link>https://example.com</link><description>D</description><item><title>Only Title Story</title><description>Body text</description></item></channel></rss>"#;
        let entries = FeedParser::default().parse("NoLinks", rss.as_bytes()).unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].title, "Only Title Story");
        assert_eq!(entries[0].link, "");
        assert_eq!(entries[0].summary_text(), "Body text");
    }
}
