use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;
use reqwest::Client;
use serde_json::{json, Value};
use tracing::{info, warn};

use super::{error_field, OAuth1Signer, PublishOptions, Publisher};
use crate::config::Config;
use crate::error::{Error, PublishError, Result};
use crate::models::{Article, PublishOutcome, ThreadOutcome};
use crate::weighted;

pub const X_API_BASE: &str = "https://api.x.com";

const THREAD_DELAY: Duration = Duration::from_millis(100);
const MAX_ATTEMPTS: u32 = 2;

/// Posts to X through API v2, signing every request with OAuth 1.0a.
pub struct XPublisher {
    client: Client,
    signer: OAuth1Signer,
    api_base: String,
}

impl XPublisher {
    /// Fails listing every missing credential.
    pub fn new(
        api_key: Option<String>,
        api_secret: Option<String>,
        access_token: Option<String>,
        access_token_secret: Option<String>,
    ) -> Result<Self> {
        let credentials = [
            ("X_API_KEY", api_key),
            ("X_API_SECRET", api_secret),
            ("X_ACCESS_TOKEN", access_token),
            ("X_ACCESS_TOKEN_SECRET", access_token_secret),
        ]
        .map(|(name, value)| (name, value.filter(|v| !v.trim().is_empty())));

        let missing: Vec<String> = credentials
            .iter()
            .filter(|(_, value)| value.is_none())
            .map(|(name, _)| name.to_string())
            .collect();
        let [(_, Some(api_key)), (_, Some(api_secret)), (_, Some(access_token)), (_, Some(access_token_secret))] =
            credentials
        else {
            return Err(Error::Configuration {
                component: "X",
                missing,
            });
        };

        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .user_agent(crate::USER_AGENT)
            .build()
            .map_err(|e| PublishError::failed(format!("failed to create HTTP client: {}", e), None))?;

        Ok(Self {
            client,
            signer: OAuth1Signer::new(api_key, api_secret, access_token, access_token_secret),
            api_base: X_API_BASE.to_string(),
        })
    }

    pub fn from_config(config: &Config) -> Result<Self> {
        Self::new(
            config.x_api_key.clone(),
            config.x_api_secret.clone(),
            config.x_access_token.clone(),
            config.x_access_token_secret.clone(),
        )
    }

    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = api_base.into().trim_end_matches('/').to_string();
        self
    }

    /// `"{title} {cms url}"`, or just the title before the article is on the CMS.
    pub fn default_text(article: &Article) -> String {
        match article.external_url.as_deref().filter(|u| !u.is_empty()) {
            Some(url) => format!("{} {}", article.title, url),
            None => article.title.clone(),
        }
    }

    pub fn status_url(id: &str) -> Option<String> {
        (!id.is_empty()).then(|| format!("https://x.com/i/status/{}", id))
    }

    /// Post `texts` as a reply chain. Every text is validated before the
    /// first request, so a bad text means nothing is posted.
    pub async fn publish_thread(&self, _article: &Article, texts: &[String]) -> Result<ThreadOutcome> {
        for text in texts {
            weighted::validate(text)?;
        }

        let mut thread_ids: Vec<String> = Vec::with_capacity(texts.len());
        for (index, text) in texts.iter().enumerate() {
            let reply_to = thread_ids.last().map(String::as_str);
            let id = self.post_tweet(text, reply_to).await?;
            thread_ids.push(id);

            if index + 1 < texts.len() {
                tokio::time::sleep(THREAD_DELAY).await;
            }
        }

        let first = thread_ids.first().cloned().filter(|id| !id.is_empty());
        let url = first.as_deref().and_then(Self::status_url);
        Ok(ThreadOutcome {
            outcome: PublishOutcome::published(first, url),
            thread_ids,
        })
    }

    /// One `POST /2/tweets`, retried once on a server error or transport failure.
    async fn post_tweet(&self, text: &str, reply_to: Option<&str>) -> Result<String> {
        let mut payload = json!({ "text": text });
        if let Some(id) = reply_to.filter(|id| !id.is_empty()) {
            payload["reply"] = json!({ "in_reply_to_tweet_id": id });
        }
        let body = serde_json::to_vec(&payload)
            .map_err(|e| PublishError::failed(format!("failed to encode post: {}", e), None))?;
        let url = format!("{}/2/tweets", self.api_base);

        let mut last_error = PublishError::failed("post failed", None);
        for attempt in 1..=MAX_ATTEMPTS {
            let mut request = self
                .client
                .post(&url)
                .header(CONTENT_TYPE, "application/json")
                .body(body.clone())
                .build()
                .map_err(|e| PublishError::failed(format!("invalid request: {}", e), None))?;
            self.signer.sign(&mut request)?;

            let response = match self.client.execute(request).await {
                Ok(response) => response,
                Err(e) => {
                    warn!(attempt, error = %e, "X request failed");
                    last_error = PublishError::failed(format!("transport error: {}", e), None);
                    continue;
                }
            };

            let status = response.status().as_u16();
            let response_body = response.text().await.unwrap_or_default();
            info!(status, body = %response_body, "X API response");

            match status {
                401 | 403 => {
                    return Err(PublishError::Authentication {
                        status,
                        message: format!(
                            "check X_API_KEY, X_API_SECRET, X_ACCESS_TOKEN and X_ACCESS_TOKEN_SECRET (response: {})",
                            response_body
                        ),
                    }
                    .into())
                }
                402 => return Err(PublishError::CreditsDepleted.into()),
                429 => return Err(PublishError::RateLimited.into()),
                500..=599 => {
                    last_error = PublishError::Server { status };
                    continue;
                }
                400..=499 => {
                    let message = error_field(&response_body, "detail").unwrap_or_else(|| "post failed".to_string());
                    return Err(PublishError::failed(message, Some(status)).into());
                }
                _ => {}
            }

            let data: Value = serde_json::from_str(&response_body)
                .map_err(|e| PublishError::InvalidResponse(format!("post response: {}", e)))?;
            let id = match data.pointer("/data/id") {
                Some(Value::String(id)) => id.clone(),
                Some(Value::Number(id)) => id.to_string(),
                _ => String::new(),
            };
            return Ok(id);
        }

        Err(last_error.into())
    }
}

#[async_trait]
impl Publisher for XPublisher {
    fn destination(&self) -> &'static str {
        "x"
    }

    async fn publish(&self, article: &Article, options: &PublishOptions) -> Result<PublishOutcome> {
        let text = options
            .text
            .clone()
            .unwrap_or_else(|| Self::default_text(article));
        weighted::validate(&text)?;

        let id = self.post_tweet(&text, None).await?;
        let url = Self::status_url(&id);
        Ok(PublishOutcome::published(Some(id).filter(|i| !i.is_empty()), url))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ContentType, PostStatus};
    use chrono::Utc;

    fn article(external_url: Option<&str>) -> Article {
        Article {
            title: "Weekly AI news".to_string(),
            subtitle: None,
            content: String::new(),
            content_type: ContentType::WeeklyAiNews,
            status: PostStatus::Draft,
            slug: "weekly-ai-news".to_string(),
            categories: vec![],
            tags: vec![],
            created_at: Utc::now(),
            published_at: None,
            external_id: None,
            external_url: external_url.map(str::to_string),
        }
    }

    #[test]
    fn test_missing_credentials_are_all_listed() {
        let err = XPublisher::new(Some("key".to_string()), None, Some(String::new()), None)
            .err()
            .unwrap();
        assert_eq!(
            err.to_string(),
            "X is not configured, missing: X_API_SECRET, X_ACCESS_TOKEN, X_ACCESS_TOKEN_SECRET"
        );
    }

    #[test]
    fn test_default_text_uses_cms_url() {
        assert_eq!(
            XPublisher::default_text(&article(Some("https://blog.example.com/p/1"))),
            "Weekly AI news https://blog.example.com/p/1"
        );
        assert_eq!(XPublisher::default_text(&article(None)), "Weekly AI news");
    }

    #[test]
    fn test_status_url() {
        assert_eq!(
            XPublisher::status_url("123").as_deref(),
            Some("https://x.com/i/status/123")
        );
        assert_eq!(XPublisher::status_url(""), None);
    }
}
