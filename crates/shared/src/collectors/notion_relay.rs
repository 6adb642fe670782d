use async_trait::async_trait;
use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime, Utc};
use serde_json::{Map, Value};

use super::{field_text, CollectOptions, Collector};
use crate::error::Result;
use crate::models::CollectedRecord;

/// Which shape of relayed Notion page to expect.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelayKind {
    /// arXiv papers: `title`, `authors`, `abstract`, `category`, `url`, `saved_at`
    Paper,
    /// news items: `title`, `summary`, `url`, `saved_at`
    News,
}

impl RelayKind {
    pub fn source_tag(&self) -> &'static str {
        match self {
            RelayKind::Paper => "notion_paper",
            RelayKind::News => "notion_news",
        }
    }
}

/// Reshapes Notion pages fetched by an outer agent and passed in through
/// the `pages` option. Never touches the network.
pub struct NotionRelayCollector {
    kind: RelayKind,
}

impl NotionRelayCollector {
    pub fn new(kind: RelayKind) -> Self {
        Self { kind }
    }

    fn to_record(&self, page: &Map<String, Value>, query: &str) -> Option<CollectedRecord> {
        let text = |key: &str| field_text(page, key).unwrap_or_default();
        let title = field_text(page, "title").unwrap_or_else(|| "Untitled".to_string());
        let needle = query.to_lowercase();

        let content = match self.kind {
            RelayKind::Paper => {
                let authors = text("authors");
                let abstract_text = text("abstract");
                let category = text("category");

                if !query.is_empty() {
                    let searchable =
                        format!("{} {} {}", title, abstract_text, category).to_lowercase();
                    if !searchable.contains(&needle) {
                        return None;
                    }
                }

                let mut parts = Vec::new();
                if !authors.is_empty() {
                    parts.push(format!("Authors: {}", authors));
                }
                if !category.is_empty() {
                    parts.push(format!("Category: {}", category));
                }
                if !abstract_text.is_empty() {
                    parts.push(format!("\n{}", abstract_text));
                }
                parts.join("\n")
            }
            RelayKind::News => {
                let summary = text("summary");
                if !query.is_empty()
                    && !title.to_lowercase().contains(&needle)
                    && !summary.to_lowercase().contains(&needle)
                {
                    return None;
                }
                summary
            }
        };

        Some(CollectedRecord::new(self.kind.source_tag(), title, content).with_url(text("url")))
    }
}

/// Parse a relayed `saved_at`. Offsets are honored, naive values are UTC.
fn parse_saved_at(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    for format in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(raw, format) {
            return Some(naive.and_utc());
        }
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

#[async_trait]
impl Collector for NotionRelayCollector {
    fn source(&self) -> &'static str {
        self.kind.source_tag()
    }

    async fn collect(&self, query: &str, options: &CollectOptions) -> Result<Vec<CollectedRecord>> {
        let Some(pages) = options.list("pages") else {
            return Ok(Vec::new());
        };
        // a window too large to represent means no cutoff
        let cutoff = Duration::try_days(options.days())
            .and_then(|window| Utc::now().checked_sub_signed(window));

        Ok(pages
            .iter()
            .filter_map(Value::as_object)
            .filter(|page| {
                // unparseable timestamps are kept
                match (cutoff, field_text(page, "saved_at").as_deref().and_then(parse_saved_at)) {
                    (Some(cutoff), Some(saved_at)) => saved_at >= cutoff,
                    _ => true,
                }
            })
            .filter_map(|page| self.to_record(page, query))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn recent() -> String {
        (Utc::now() - Duration::days(1)).to_rfc3339()
    }

    fn stale() -> String {
        (Utc::now() - Duration::days(30)).to_rfc3339()
    }

    // ==================== Timestamp Tests ====================

    #[test]
    fn test_parse_saved_at_formats() {
        assert!(parse_saved_at("2026-02-10T09:00:00+09:00").is_some());
        assert!(parse_saved_at("2026-02-10T09:00:00Z").is_some());
        assert!(parse_saved_at("2026-02-10T09:00:00").is_some());
        assert!(parse_saved_at("2026-02-10T09:00:00.123456").is_some());
        assert!(parse_saved_at("2026-02-10").is_some());
        assert!(parse_saved_at("yesterday").is_none());
    }

    #[test]
    fn test_parse_saved_at_honors_offset() {
        let parsed = parse_saved_at("2026-02-10T09:00:00+09:00").unwrap();
        assert_eq!(parsed.to_rfc3339(), "2026-02-10T00:00:00+00:00");
    }

    // ==================== Paper Tests ====================

    #[tokio::test]
    async fn test_paper_pages_become_records() {
        let options = CollectOptions::new().with(
            "pages",
            json!([{
                "title": "Attention Is All You Need",
                "authors": "Vaswani et al.",
                "abstract": "We propose the Transformer.",
                "category": "cs.CL",
                "url": "https://arxiv.org/abs/1706.03762",
                "saved_at": recent(),
            }]),
        );

        let records = NotionRelayCollector::new(RelayKind::Paper)
            .collect("", &options)
            .await
            .unwrap();

        assert_eq!(records.len(), 1);
        assert_eq!(records[0].source, "notion_paper");
        assert_eq!(
            records[0].content,
            "Authors: Vaswani et al.\nCategory: cs.CL\n\nWe propose the Transformer."
        );
        assert_eq!(records[0].url.as_deref(), Some("https://arxiv.org/abs/1706.03762"));
    }

    #[tokio::test]
    async fn test_paper_keyword_searches_abstract_and_category() {
        let options = CollectOptions::new().with(
            "pages",
            json!([
                { "title": "A", "abstract": "diffusion models", "category": "cs.CV" },
                { "title": "B", "abstract": "graph networks", "category": "cs.LG" },
            ]),
        );
        let collector = NotionRelayCollector::new(RelayKind::Paper);

        let records = collector.collect("DIFFUSION", &options).await.unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].title, "A");

        let records = collector.collect("cs.lg", &options).await.unwrap();
        assert_eq!(records[0].title, "B");
    }

    // ==================== News Tests ====================

    #[tokio::test]
    async fn test_news_drops_stale_and_keeps_unparseable() {
        let options = CollectOptions::new().with(
            "pages",
            json!([
                { "title": "fresh", "summary": "s1", "saved_at": recent() },
                { "title": "old", "summary": "s2", "saved_at": stale() },
                { "title": "odd", "summary": "s3", "saved_at": "not a date" },
                { "title": "none", "summary": "s4" },
            ]),
        );

        let records = NotionRelayCollector::new(RelayKind::News)
            .collect("", &options)
            .await
            .unwrap();

        let titles: Vec<&str> = records.iter().map(|r| r.title.as_str()).collect();
        assert_eq!(titles, vec!["fresh", "odd", "none"]);
        assert_eq!(records[0].content, "s1");
        assert!(records[0].url.is_none());
    }

    #[tokio::test]
    async fn test_news_days_widens_window() {
        let options = CollectOptions::new()
            .with("days", "60")
            .with("pages", json!([{ "title": "old", "saved_at": stale() }]));

        let records = NotionRelayCollector::new(RelayKind::News)
            .collect("", &options)
            .await
            .unwrap();
        assert_eq!(records.len(), 1);
    }

    #[tokio::test]
    async fn test_huge_days_keeps_everything() {
        let options = CollectOptions::new()
            .with("days", 1_000_000_000_i64)
            .with("pages", json!([{ "title": "old", "saved_at": stale() }]));

        let records = NotionRelayCollector::new(RelayKind::News)
            .collect("", &options)
            .await
            .unwrap();
        assert_eq!(records.len(), 1);
    }

    #[tokio::test]
    async fn test_news_keyword_checks_title_then_summary() {
        let options = CollectOptions::new().with(
            "pages",
            json!([
                { "title": "OpenAI ships model", "summary": "" },
                { "title": "Market update", "summary": "openai revenue" },
                { "title": "Weather", "summary": "rain" },
            ]),
        );

        let records = NotionRelayCollector::new(RelayKind::News)
            .collect("OpenAI", &options)
            .await
            .unwrap();
        assert_eq!(records.len(), 2);
    }

    #[tokio::test]
    async fn test_missing_or_malformed_pages() {
        let collector = NotionRelayCollector::new(RelayKind::News);

        let records = collector.collect("", &CollectOptions::new()).await.unwrap();
        assert!(records.is_empty());

        let options = CollectOptions::new().with("pages", "not a list");
        assert!(collector.collect("", &options).await.unwrap().is_empty());

        let options = CollectOptions::new().with("pages", json!(["text", 42, { "url": "https://a.b" }]));
        let records = collector.collect("", &options).await.unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].title, "Untitled");
    }
}
