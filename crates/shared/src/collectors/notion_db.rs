use async_trait::async_trait;
use chrono::Utc;
use serde_json::{json, Value};
use tracing::info;

use super::{CollectOptions, Collector};
use crate::config::Config;
use crate::error::{Error, Result};
use crate::models::CollectedRecord;
use crate::notion::{
    build_date_filter, extract_date, extract_multi_select, extract_rich_text, extract_title,
    extract_url, NotionClient,
};

const DATE_PROPERTY: &str = "Date";

/// The two Notion databases queried directly.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotionDatabase {
    /// Medium daily digest entries
    MediumDigest,
    /// Google Alert news entries
    GoogleAlert,
}

impl NotionDatabase {
    pub fn source_tag(&self) -> &'static str {
        match self {
            NotionDatabase::MediumDigest => "notion_medium",
            NotionDatabase::GoogleAlert => "notion_alert",
        }
    }

    pub fn database_env_var(&self) -> &'static str {
        match self {
            NotionDatabase::MediumDigest => "NOTION_MEDIUM_DB_ID",
            NotionDatabase::GoogleAlert => "NOTION_NEWS_DB_ID",
        }
    }

    /// Convert one page into a record, or `None` when the keyword filter rejects it.
    fn to_record(&self, page: &Value, query: &str) -> Option<CollectedRecord> {
        let empty = json!({});
        let props = page.get("properties").unwrap_or(&empty);

        let title = extract_title(props, "Title");
        let summary = extract_rich_text(props, "Summary");
        let url = extract_url(props, "URL");
        let published = extract_date(props, DATE_PROPERTY);

        let (translated, searchable, content) = match self {
            NotionDatabase::MediumDigest => {
                let japanese_title = extract_rich_text(props, "Japanese Title");
                let author = extract_rich_text(props, "Author");

                let searchable = format!("{} {} {} {}", title, japanese_title, summary, author);
                let mut parts = Vec::new();
                if !summary.is_empty() {
                    parts.push(summary.clone());
                }
                if !author.is_empty() {
                    parts.push(format!("Author: {}", author));
                }
                (japanese_title, searchable, parts.join("\n"))
            }
            NotionDatabase::GoogleAlert => {
                let translated_title = extract_rich_text(props, "Translated Title");
                let source = extract_rich_text(props, "Source");
                let keywords = extract_multi_select(props, "Keywords").join(", ");

                let searchable = format!(
                    "{} {} {} {} {}",
                    title, translated_title, summary, source, keywords
                );
                let mut parts = Vec::new();
                if !summary.is_empty() {
                    parts.push(summary.clone());
                }
                if !source.is_empty() {
                    parts.push(format!("Source: {}", source));
                }
                if !keywords.is_empty() {
                    parts.push(format!("Keywords: {}", keywords));
                }
                (translated_title, searchable, parts.join("\n"))
            }
        };

        if !query.is_empty() && !searchable.to_lowercase().contains(&query.to_lowercase()) {
            return None;
        }

        let display_title = [translated, title]
            .into_iter()
            .find(|t| !t.is_empty())
            .unwrap_or_else(|| "Untitled".to_string());

        Some(
            CollectedRecord::new(self.source_tag(), display_title, content)
                .with_url(url)
                .with_published_date(Some(published)),
        )
    }
}

/// Queries a Notion database for recent entries.
pub struct NotionDatabaseCollector {
    database: NotionDatabase,
    database_id: String,
    client: NotionClient,
}

impl NotionDatabaseCollector {
    /// Fails naming every missing environment variable.
    pub fn new(
        database: NotionDatabase,
        token: Option<String>,
        database_id: Option<String>,
    ) -> Result<Self> {
        let token = token.filter(|t| !t.is_empty());
        let database_id = database_id.filter(|d| !d.is_empty());

        let (token, database_id) = match (token, database_id) {
            (Some(t), Some(d)) => (t, d),
            (token, database_id) => {
                let mut missing = Vec::new();
                if token.is_none() {
                    missing.push("NOTION_TOKEN");
                }
                if database_id.is_none() {
                    missing.push(database.database_env_var());
                }
                return Err(Error::collection(
                    database.source_tag(),
                    format!("not configured, missing: {}", missing.join(", ")),
                ));
            }
        };

        let client = NotionClient::new(token, database.source_tag())?;
        Ok(Self {
            database,
            database_id,
            client,
        })
    }

    pub fn from_config(database: NotionDatabase, config: &Config) -> Result<Self> {
        let database_id = match database {
            NotionDatabase::MediumDigest => config.notion_medium_db_id.clone(),
            NotionDatabase::GoogleAlert => config.notion_alert_db_id.clone(),
        };
        Self::new(database, config.notion_token.clone(), database_id)
    }

    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.client = self.client.with_api_base(api_base);
        self
    }
}

#[async_trait]
impl Collector for NotionDatabaseCollector {
    fn source(&self) -> &'static str {
        self.database.source_tag()
    }

    async fn collect(&self, query: &str, options: &CollectOptions) -> Result<Vec<CollectedRecord>> {
        let filter = build_date_filter(
            self.source(),
            DATE_PROPERTY,
            options.str_value("date_from"),
            options.str_value("date_to"),
            options.days(),
            Utc::now(),
        )?;
        let sorts = json!([{ "property": DATE_PROPERTY, "direction": "descending" }]);

        let pages = self
            .client
            .query_database(&self.database_id, filter, sorts)
            .await?;
        info!(source = self.source(), pages = pages.len(), "queried Notion database");

        Ok(pages
            .iter()
            .filter_map(|page| self.database.to_record(page, query))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rich(text: &str) -> Value {
        json!({ "rich_text": [{ "plain_text": text }] })
    }

    fn medium_page() -> Value {
        json!({
            "properties": {
                "Title": { "title": [{ "plain_text": "Scaling Laws Revisited" }] },
                "Japanese Title": rich("スケーリング則再考"),
                "Author": rich("Jane Doe"),
                "Summary": rich("A look at compute-optimal training."),
                "URL": { "url": "https://medium.com/p/1" },
                "Date": { "date": { "start": "2026-02-10" } },
            }
        })
    }

    fn alert_page() -> Value {
        json!({
            "properties": {
                "Title": { "title": [{ "plain_text": "Chipmaker expands fab" }] },
                "Translated Title": rich(""),
                "Summary": rich("New capacity announced."),
                "Source": rich("Example News"),
                "URL": { "url": "https://news.example.com/a" },
                "Keywords": { "multi_select": [{ "name": "semiconductor" }, { "name": "AI" }] },
                "Date": { "date": { "start": "2026-02-11" } },
            }
        })
    }

    // ==================== Construction Tests ====================

    #[test]
    fn test_missing_settings_are_named() {
        let err = NotionDatabaseCollector::new(NotionDatabase::GoogleAlert, None, None)
            .err()
            .unwrap();
        assert_eq!(
            err.to_string(),
            "[notion_alert] not configured, missing: NOTION_TOKEN, NOTION_NEWS_DB_ID"
        );

        let err = NotionDatabaseCollector::new(
            NotionDatabase::MediumDigest,
            Some("secret".to_string()),
            Some(String::new()),
        )
        .err()
        .unwrap();
        assert!(err.to_string().ends_with("missing: NOTION_MEDIUM_DB_ID"));
    }

    // ==================== Page Conversion Tests ====================

    #[test]
    fn test_medium_page_prefers_japanese_title() {
        let record = NotionDatabase::MediumDigest
            .to_record(&medium_page(), "")
            .unwrap();
        assert_eq!(record.source, "notion_medium");
        assert_eq!(record.title, "スケーリング則再考");
        assert_eq!(record.url.as_deref(), Some("https://medium.com/p/1"));
        assert_eq!(
            record.content,
            "A look at compute-optimal training.\nAuthor: Jane Doe"
        );
        assert_eq!(record.published_date.as_deref(), Some("2026-02-10"));
    }

    #[test]
    fn test_alert_page_falls_back_to_title() {
        let record = NotionDatabase::GoogleAlert
            .to_record(&alert_page(), "")
            .unwrap();
        assert_eq!(record.title, "Chipmaker expands fab");
        assert_eq!(
            record.content,
            "New capacity announced.\nSource: Example News\nKeywords: semiconductor, AI"
        );
    }

    #[test]
    fn test_keyword_filter_is_case_insensitive() {
        assert!(NotionDatabase::MediumDigest
            .to_record(&medium_page(), "COMPUTE")
            .is_some());
        assert!(NotionDatabase::GoogleAlert
            .to_record(&alert_page(), "Semiconductor")
            .is_some());
        assert!(NotionDatabase::GoogleAlert
            .to_record(&alert_page(), "quantum")
            .is_none());
    }

    #[test]
    fn test_empty_page_becomes_untitled() {
        let record = NotionDatabase::MediumDigest
            .to_record(&json!({}), "")
            .unwrap();
        assert_eq!(record.title, "Untitled");
        assert!(record.url.is_none());
        assert!(record.published_date.is_none());
        assert_eq!(record.content, "");
    }
}
