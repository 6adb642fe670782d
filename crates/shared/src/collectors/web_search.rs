use async_trait::async_trait;
use serde_json::Value;

use super::{field_text, CollectOptions, Collector};
use crate::error::Result;
use crate::models::CollectedRecord;

const SOURCE: &str = "web_search";

/// Turns search results gathered by an outer agent (the `results` option)
/// into records. The query is informational only.
pub struct WebSearchCollector;

#[async_trait]
impl Collector for WebSearchCollector {
    fn source(&self) -> &'static str {
        SOURCE
    }

    async fn collect(&self, _query: &str, options: &CollectOptions) -> Result<Vec<CollectedRecord>> {
        let Some(results) = options.list("results") else {
            return Ok(Vec::new());
        };

        Ok(results
            .iter()
            .filter_map(Value::as_object)
            .map(|item| {
                let title = field_text(item, "title").unwrap_or_else(|| "Untitled".to_string());
                let content = field_text(item, "content").unwrap_or_default();
                CollectedRecord::new(SOURCE, title, content)
                    .with_url(field_text(item, "url").unwrap_or_default())
            })
            .collect())
    }
}
