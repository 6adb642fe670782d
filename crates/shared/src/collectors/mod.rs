use std::fmt;
use std::str::FromStr;

use async_trait::async_trait;
use serde_json::{Map, Value};

use crate::config::Config;
use crate::error::{Error, Result};
use crate::models::CollectedRecord;

pub mod cli_research;
pub mod github;
pub mod notion_db;
pub mod notion_relay;
pub mod url_fetcher;
pub mod web_search;

pub use cli_research::CliResearchCollector;
pub use github::GitHubCollector;
pub use notion_db::{NotionDatabase, NotionDatabaseCollector};
pub use notion_relay::{NotionRelayCollector, RelayKind};
pub use url_fetcher::UrlFetcherCollector;
pub use web_search::WebSearchCollector;

/// Default look-back window, in days, for date-bounded sources.
pub const DEFAULT_DAYS: i64 = 7;

/// Normalizes one external information source into `CollectedRecord`s.
#[async_trait]
pub trait Collector: Send + Sync {
    /// Source tag stamped on every record this collector produces.
    fn source(&self) -> &'static str;

    async fn collect(&self, query: &str, options: &CollectOptions) -> Result<Vec<CollectedRecord>>;
}

/// Source-specific parameters passed alongside the query.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CollectOptions(Map<String, Value>);

impl CollectOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Non-object values yield empty options.
    pub fn from_value(value: Value) -> Self {
        match value {
            Value::Object(map) => Self(map),
            _ => Self::default(),
        }
    }

    pub fn with(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.0.insert(key.to_string(), value.into());
        self
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    /// `days` as a number or numeric string, else `DEFAULT_DAYS`.
    pub fn days(&self) -> i64 {
        match self.0.get("days") {
            Some(Value::Number(n)) => n
                .as_i64()
                .or_else(|| n.as_f64().map(|f| f as i64))
                .unwrap_or(DEFAULT_DAYS),
            Some(Value::String(s)) => s.trim().parse().unwrap_or(DEFAULT_DAYS),
            _ => DEFAULT_DAYS,
        }
    }

    /// A non-empty string option.
    pub fn str_value(&self, key: &str) -> Option<&str> {
        self.0
            .get(key)
            .and_then(Value::as_str)
            .filter(|s| !s.is_empty())
    }

    /// A list option; `None` when missing or not a list.
    pub fn list(&self, key: &str) -> Option<&Vec<Value>> {
        self.0.get(key).and_then(Value::as_array)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CollectorKind {
    Gemini,
    GitHub,
    NotionMedium,
    NotionAlert,
    NotionPaper,
    NotionNews,
    UrlFetcher,
    WebSearch,
}

impl CollectorKind {
    pub const ALL: [CollectorKind; 8] = [
        CollectorKind::Gemini,
        CollectorKind::GitHub,
        CollectorKind::NotionMedium,
        CollectorKind::NotionAlert,
        CollectorKind::NotionPaper,
        CollectorKind::NotionNews,
        CollectorKind::UrlFetcher,
        CollectorKind::WebSearch,
    ];

    pub fn tag(&self) -> &'static str {
        match self {
            CollectorKind::Gemini => "gemini",
            CollectorKind::GitHub => "github",
            CollectorKind::NotionMedium => "notion_medium",
            CollectorKind::NotionAlert => "notion_alert",
            CollectorKind::NotionPaper => "notion_paper",
            CollectorKind::NotionNews => "notion_news",
            CollectorKind::UrlFetcher => "url_fetcher",
            CollectorKind::WebSearch => "web_search",
        }
    }

    /// Relay sources only reshape data handed in through options.
    pub fn is_relay(&self) -> bool {
        matches!(
            self,
            CollectorKind::NotionPaper | CollectorKind::NotionNews | CollectorKind::WebSearch
        )
    }
}

impl fmt::Display for CollectorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

impl FromStr for CollectorKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        CollectorKind::ALL
            .into_iter()
            .find(|k| k.tag() == s)
            .ok_or_else(|| {
                let known: Vec<&str> = CollectorKind::ALL.iter().map(|k| k.tag()).collect();
                Error::collection(s, format!("unknown source, expected one of: {}", known.join(", ")))
            })
    }
}

/// Construct the collector for `kind` from environment-backed settings.
pub fn build_collector(kind: CollectorKind, config: &Config) -> Result<Box<dyn Collector>> {
    let collector: Box<dyn Collector> = match kind {
        CollectorKind::Gemini => Box::new(CliResearchCollector::new()),
        CollectorKind::GitHub => Box::new(GitHubCollector::new(config.github_token.clone())?),
        CollectorKind::NotionMedium => Box::new(NotionDatabaseCollector::from_config(
            NotionDatabase::MediumDigest,
            config,
        )?),
        CollectorKind::NotionAlert => Box::new(NotionDatabaseCollector::from_config(
            NotionDatabase::GoogleAlert,
            config,
        )?),
        CollectorKind::NotionPaper => Box::new(NotionRelayCollector::new(RelayKind::Paper)),
        CollectorKind::NotionNews => Box::new(NotionRelayCollector::new(RelayKind::News)),
        CollectorKind::UrlFetcher => Box::new(UrlFetcherCollector::new()?),
        CollectorKind::WebSearch => Box::new(WebSearchCollector),
    };
    Ok(collector)
}

/// String form of a loosely typed JSON field. `null` and missing read as `None`.
pub(crate) fn field_text(object: &Map<String, Value>, key: &str) -> Option<String> {
    match object.get(key)? {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    // ==================== Options Tests ====================

    #[test]
    fn test_days_defaults_to_seven() {
        assert_eq!(CollectOptions::new().days(), 7);
        assert_eq!(CollectOptions::new().with("days", json!([1])).days(), 7);
    }

    #[test]
    fn test_days_accepts_number_or_numeric_string() {
        assert_eq!(CollectOptions::new().with("days", 3).days(), 3);
        assert_eq!(CollectOptions::new().with("days", "14").days(), 14);
        assert_eq!(CollectOptions::new().with("days", "soon").days(), 7);
    }

    #[test]
    fn test_list_requires_array() {
        let opts = CollectOptions::new()
            .with("pages", json!([{"title": "a"}]))
            .with("results", "not a list");
        assert_eq!(opts.list("pages").map(Vec::len), Some(1));
        assert!(opts.list("results").is_none());
        assert!(opts.list("missing").is_none());
    }

    #[test]
    fn test_from_value_ignores_non_objects() {
        assert_eq!(CollectOptions::from_value(json!([1, 2])), CollectOptions::new());
        let opts = CollectOptions::from_value(json!({"date_from": "2026-01-01", "date_to": ""}));
        assert_eq!(opts.str_value("date_from"), Some("2026-01-01"));
        assert_eq!(opts.str_value("date_to"), None);
    }

    // ==================== Registry Tests ====================

    #[test]
    fn test_kind_round_trips_through_tag() {
        for kind in CollectorKind::ALL {
            assert_eq!(kind.tag().parse::<CollectorKind>().unwrap(), kind);
        }
    }

    #[test]
    fn test_unknown_kind_is_rejected() {
        let err = "twitter".parse::<CollectorKind>().unwrap_err();
        assert!(err.to_string().starts_with("[twitter] unknown source"));
    }

    #[test]
    fn test_build_collector_stamps_matching_source() {
        let config = Config::default();
        for kind in [
            CollectorKind::Gemini,
            CollectorKind::GitHub,
            CollectorKind::NotionPaper,
            CollectorKind::NotionNews,
            CollectorKind::UrlFetcher,
            CollectorKind::WebSearch,
        ] {
            let collector = build_collector(kind, &config).unwrap();
            assert_eq!(collector.source(), kind.tag());
        }
    }

    #[test]
    fn test_build_notion_collector_requires_config() {
        let err = build_collector(CollectorKind::NotionMedium, &Config::default())
            .err()
            .unwrap();
        let message = err.to_string();
        assert!(message.contains("NOTION_TOKEN"));
        assert!(message.contains("NOTION_MEDIUM_DB_ID"));
    }

    #[test]
    fn test_field_text_stringifies_scalars() {
        let obj = json!({"a": "x", "b": 3, "c": null});
        let map = obj.as_object().unwrap();
        assert_eq!(field_text(map, "a").as_deref(), Some("x"));
        assert_eq!(field_text(map, "b").as_deref(), Some("3"));
        assert_eq!(field_text(map, "c"), None);
        assert_eq!(field_text(map, "d"), None);
    }
}
