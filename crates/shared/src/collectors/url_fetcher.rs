use std::sync::LazyLock;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use scraper::{Html, Node, Selector};
use tracing::debug;
use url::{Host, Url};

use super::{CollectOptions, Collector};
use crate::error::{Error, Result};
use crate::models::CollectedRecord;

const SOURCE: &str = "url_fetcher";

static TITLE: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("title").expect("valid title selector"));

/// Fetches one page and keeps its readable text.
pub struct UrlFetcherCollector {
    client: Client,
}

impl UrlFetcherCollector {
    pub fn new() -> Result<Self> {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(30))
            .user_agent(crate::USER_AGENT)
            .build()
            .map_err(|e| Error::collection(SOURCE, format!("failed to create HTTP client: {}", e)))?;

        Ok(Self { client })
    }
}

/// Accept only `http`/`https` URLs that do not point at the local machine.
pub fn validate_url(raw: &str) -> Result<Url> {
    let url = Url::parse(raw.trim())
        .map_err(|e| Error::collection(SOURCE, format!("invalid URL {:?}: {}", raw, e)))?;

    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(Error::collection(
            SOURCE,
            format!("unsupported scheme: {}", url.scheme()),
        ));
    }

    let is_loopback = match url.host() {
        Some(Host::Domain(domain)) => domain.eq_ignore_ascii_case("localhost"),
        Some(Host::Ipv4(ip)) => ip.is_loopback(),
        Some(Host::Ipv6(ip)) => {
            ip.is_loopback() || ip.to_ipv4_mapped().is_some_and(|v4| v4.is_loopback())
        }
        None => {
            return Err(Error::collection(SOURCE, format!("URL has no host: {}", raw)));
        }
    };
    if is_loopback {
        return Err(Error::collection(
            SOURCE,
            "access to localhost is not allowed",
        ));
    }

    Ok(url)
}

/// Visible text of an HTML document, `<script>`/`<style>` excluded and
/// whitespace collapsed to single spaces.
pub fn extract_text(html: &str) -> String {
    let document = Html::parse_document(html);

    let mut text = String::new();
    for node in document.root_element().descendants() {
        let Node::Text(chunk) = node.value() else {
            continue;
        };
        let hidden = node.ancestors().any(|a| {
            a.value()
                .as_element()
                .is_some_and(|e| matches!(e.name(), "script" | "style"))
        });
        if !hidden {
            text.push_str(chunk);
            text.push(' ');
        }
    }

    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// `<title>` text, or `Untitled`.
pub fn extract_title(html: &str) -> String {
    let document = Html::parse_document(html);
    document
        .select(&TITLE)
        .next()
        .map(|t| t.text().collect::<String>().trim().to_string())
        .filter(|t| !t.is_empty())
        .unwrap_or_else(|| "Untitled".to_string())
}

fn ensure_success(url: &Url, status: StatusCode) -> Result<()> {
    if status.is_success() {
        Ok(())
    } else {
        Err(Error::collection(
            SOURCE,
            format!("{} returned HTTP {}", url, status.as_u16()),
        ))
    }
}

/// HTML pages keep their title and visible text. Anything else is kept
/// verbatim under the URL as its title.
fn build_record(query: &str, content_type: &str, body: String) -> CollectedRecord {
    let (title, content) = if content_type.contains("html") {
        (extract_title(&body), extract_text(&body))
    } else {
        (query.to_string(), body)
    };
    CollectedRecord::new(SOURCE, title, content).with_url(query)
}

#[async_trait]
impl Collector for UrlFetcherCollector {
    fn source(&self) -> &'static str {
        SOURCE
    }

    async fn collect(&self, query: &str, _options: &CollectOptions) -> Result<Vec<CollectedRecord>> {
        let url = validate_url(query)?;

        let response = self
            .client
            .get(url.clone())
            .send()
            .await
            .map_err(|e| Error::collection(SOURCE, format!("failed to fetch {}: {}", url, e)))?;

        ensure_success(&url, response.status())?;

        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_string();
        let body = response
            .text()
            .await
            .map_err(|e| Error::collection(SOURCE, format!("failed to read body: {}", e)))?;
        debug!(%url, content_type = %content_type, bytes = body.len(), "fetched page");

        Ok(vec![build_record(query, &content_type, body)])
    }
}
