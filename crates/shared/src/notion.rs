use chrono::{DateTime, Duration, Utc};
use reqwest::Client;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::debug;

use crate::error::{Error, Result};

pub const NOTION_API_BASE: &str = "https://api.notion.com";
pub const NOTION_VERSION: &str = "2022-06-28";
const PAGE_SIZE: u32 = 100;

#[derive(Debug, Deserialize)]
struct QueryResponse {
    #[serde(default)]
    results: Vec<Value>,
    #[serde(default)]
    has_more: bool,
    next_cursor: Option<String>,
}

/// Thin client for the Notion database query endpoint.
///
/// Errors are reported as collection failures under the owning collector's
/// source tag.
pub struct NotionClient {
    client: Client,
    token: String,
    api_base: String,
    source_tag: &'static str,
}

impl NotionClient {
    pub fn new(token: String, source_tag: &'static str) -> Result<Self> {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(30))
            .user_agent(crate::USER_AGENT)
            .build()
            .map_err(|e| Error::collection(source_tag, format!("failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            token,
            api_base: NOTION_API_BASE.to_string(),
            source_tag,
        })
    }

    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = api_base.into().trim_end_matches('/').to_string();
        self
    }

    /// Fetch every page of a database query, following `next_cursor`.
    pub async fn query_database(
        &self,
        database_id: &str,
        filter: Value,
        sorts: Value,
    ) -> Result<Vec<Value>> {
        let url = format!("{}/v1/databases/{}/query", self.api_base, database_id);
        let mut all_pages = Vec::new();
        let mut cursor: Option<String> = None;

        loop {
            let mut body = json!({
                "filter": filter,
                "sorts": sorts,
                "page_size": PAGE_SIZE,
            });
            if let Some(c) = &cursor {
                body["start_cursor"] = json!(c);
            }

            let response = self
                .client
                .post(&url)
                .header("Authorization", format!("Bearer {}", self.token))
                .header("Notion-Version", NOTION_VERSION)
                .json(&body)
                .send()
                .await
                .map_err(|e| Error::collection(self.source_tag, format!("Notion request failed: {}", e)))?;

            let status = response.status();
            if !status.is_success() {
                let error_text = response
                    .text()
                    .await
                    .unwrap_or_else(|_| String::from("unknown error"));
                return Err(Error::collection(
                    self.source_tag,
                    format!("Notion API returned HTTP {}: {}", status.as_u16(), error_text),
                ));
            }

            let page = response.json::<QueryResponse>().await.map_err(|e| {
                Error::collection(self.source_tag, format!("failed to parse Notion response: {}", e))
            })?;

            debug!(
                database_id,
                fetched = page.results.len(),
                has_more = page.has_more,
                "Notion query page"
            );
            all_pages.extend(page.results);

            match page.next_cursor {
                Some(next) if page.has_more => cursor = Some(next),
                _ => break,
            }
        }

        Ok(all_pages)
    }
}

/// Filter on a date property: `on_or_after` the start, and `before` the end
/// when one is given.
///
/// The start is `date_from` or, without it, `days` before `now`. A `days`
/// window that runs off the calendar is a collection error under `source_tag`.
pub fn build_date_filter(
    source_tag: &str,
    property: &str,
    date_from: Option<&str>,
    date_to: Option<&str>,
    days: i64,
    now: DateTime<Utc>,
) -> Result<Value> {
    let start = match date_from {
        Some(from) if !from.is_empty() => from.to_string(),
        _ => Duration::try_days(days)
            .and_then(|window| now.checked_sub_signed(window))
            .ok_or_else(|| Error::collection(source_tag, format!("days out of range: {}", days)))?
            .format("%Y-%m-%d")
            .to_string(),
    };

    let on_or_after = json!({
        "property": property,
        "date": { "on_or_after": start },
    });

    Ok(match date_to {
        Some(to) if !to.is_empty() => json!({
            "and": [
                on_or_after,
                { "property": property, "date": { "before": to } },
            ]
        }),
        _ => on_or_after,
    })
}

fn concat_plain_text(runs: Option<&Value>) -> String {
    runs.and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .filter_map(|run| run.get("plain_text").and_then(Value::as_str))
                .collect::<String>()
        })
        .unwrap_or_default()
}

pub fn extract_title(properties: &Value, name: &str) -> String {
    concat_plain_text(properties.get(name).and_then(|p| p.get("title")))
}

pub fn extract_rich_text(properties: &Value, name: &str) -> String {
    concat_plain_text(properties.get(name).and_then(|p| p.get("rich_text")))
}

pub fn extract_url(properties: &Value, name: &str) -> String {
    properties
        .get(name)
        .and_then(|p| p.get("url"))
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string()
}

pub fn extract_multi_select(properties: &Value, name: &str) -> Vec<String> {
    properties
        .get(name)
        .and_then(|p| p.get("multi_select"))
        .and_then(Value::as_array)
        .map(|options| {
            options
                .iter()
                .filter_map(|o| o.get("name").and_then(Value::as_str))
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default()
}

/// `start` of a date property.
pub fn extract_date(properties: &Value, name: &str) -> String {
    properties
        .get(name)
        .and_then(|p| p.get("date"))
        .and_then(|d| d.get("start"))
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn sample_properties() -> Value {
        json!({
            "Title": {"title": [{"plain_text": "Hello "}, {"plain_text": "World"}]},
            "Summary": {"rich_text": [{"plain_text": "A summary"}]},
            "URL": {"url": "https://example.com/a"},
            "Keywords": {"multi_select": [{"name": "AI"}, {"name": "LLM"}]},
            "Date": {"date": {"start": "2026-02-10", "end": null}},
            "Empty URL": {"url": null},
        })
    }

    // ==================== Date Filter Tests ====================

    #[test]
    fn test_filter_uses_days_when_no_dates() {
        let now = Utc.with_ymd_and_hms(2026, 2, 15, 12, 0, 0).unwrap();
        let filter = build_date_filter("notion_alert", "Date", None, None, 7, now).unwrap();
        assert_eq!(
            filter,
            json!({"property": "Date", "date": {"on_or_after": "2026-02-08"}})
        );
    }

    #[test]
    fn test_filter_prefers_date_from() {
        let now = Utc.with_ymd_and_hms(2026, 2, 15, 12, 0, 0).unwrap();
        let filter = build_date_filter("notion_alert", "Date", Some("2026-01-01"), None, 7, now).unwrap();
        assert_eq!(filter["date"]["on_or_after"], "2026-01-01");
    }

    #[test]
    fn test_filter_with_end_date_is_conjunction() {
        let now = Utc.with_ymd_and_hms(2026, 2, 15, 12, 0, 0).unwrap();
        let filter =
            build_date_filter("notion_alert", "Date", Some("2026-01-01"), Some("2026-02-01"), 7, now)
                .unwrap();
        assert_eq!(
            filter,
            json!({
                "and": [
                    {"property": "Date", "date": {"on_or_after": "2026-01-01"}},
                    {"property": "Date", "date": {"before": "2026-02-01"}},
                ]
            })
        );
    }

    #[test]
    fn test_filter_ignores_empty_strings() {
        let now = Utc.with_ymd_and_hms(2026, 2, 15, 0, 0, 0).unwrap();
        let filter = build_date_filter("notion_alert", "Date", Some(""), Some(""), 1, now).unwrap();
        assert_eq!(filter["date"]["on_or_after"], "2026-02-14");
        assert!(filter.get("and").is_none());
    }

    #[test]
    fn test_filter_rejects_days_out_of_range() {
        let now = Utc.with_ymd_and_hms(2026, 2, 15, 0, 0, 0).unwrap();
        let err = build_date_filter("notion_alert", "Date", None, None, 1_000_000_000, now)
            .unwrap_err();
        assert_eq!(err.to_string(), "[notion_alert] days out of range: 1000000000");
    }

    #[test]
    fn test_filter_ignores_days_when_date_from_given() {
        let now = Utc.with_ymd_and_hms(2026, 2, 15, 0, 0, 0).unwrap();
        let filter =
            build_date_filter("notion_alert", "Date", Some("2026-01-01"), None, i64::MAX, now)
                .unwrap();
        assert_eq!(filter["date"]["on_or_after"], "2026-01-01");
    }

    // ==================== Property Extraction Tests ====================

    #[test]
    fn test_extract_known_properties() {
        let props = sample_properties();
        assert_eq!(extract_title(&props, "Title"), "Hello World");
        assert_eq!(extract_rich_text(&props, "Summary"), "A summary");
        assert_eq!(extract_url(&props, "URL"), "https://example.com/a");
        assert_eq!(extract_multi_select(&props, "Keywords"), vec!["AI", "LLM"]);
        assert_eq!(extract_date(&props, "Date"), "2026-02-10");
    }

    #[test]
    fn test_missing_or_mistyped_properties_are_empty() {
        let props = sample_properties();
        assert_eq!(extract_title(&props, "Missing"), "");
        assert_eq!(extract_rich_text(&props, "Title"), "");
        assert_eq!(extract_url(&props, "Empty URL"), "");
        assert!(extract_multi_select(&props, "Summary").is_empty());
        assert_eq!(extract_date(&props, "URL"), "");
    }
}
