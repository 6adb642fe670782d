use std::collections::HashMap;

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use reqwest::{Client, Response, StatusCode};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::{info, warn};

use super::{error_field, PublishOptions, Publisher};
use crate::config::Config;
use crate::error::{Error, PublishError, Result};
use crate::markdown::markdown_to_html;
use crate::models::{Article, PublishOutcome};

/// A category or tag as listed by the CMS.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Term {
    pub id: u64,
    pub name: String,
    #[serde(default)]
    pub slug: String,
    #[serde(default)]
    pub count: u64,
}

#[derive(Debug, Deserialize)]
struct CreatedPost {
    id: u64,
    #[serde(default)]
    link: String,
}

/// Publishes articles through the WordPress REST API (`/wp-json/wp/v2`).
pub struct WordPressPublisher {
    client: Client,
    base_url: String,
    username: String,
    app_password: String,
}

impl WordPressPublisher {
    /// Fails listing every missing setting.
    pub fn new(
        base_url: Option<String>,
        username: Option<String>,
        app_password: Option<String>,
    ) -> Result<Self> {
        let present = |v: Option<String>| v.filter(|s| !s.trim().is_empty());
        let base_url = present(base_url);
        let username = present(username);
        let app_password = present(app_password);

        let (Some(base_url), Some(username), Some(app_password)) =
            (base_url.clone(), username.clone(), app_password.clone())
        else {
            let missing = [
                ("WORDPRESS_URL", base_url.is_none()),
                ("WORDPRESS_USER", username.is_none()),
                ("WORDPRESS_APP_PASSWORD", app_password.is_none()),
            ]
            .into_iter()
            .filter(|(_, absent)| *absent)
            .map(|(name, _)| name.to_string())
            .collect();
            return Err(Error::Configuration {
                component: "WordPress",
                missing,
            });
        };

        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(30))
            .user_agent(crate::USER_AGENT)
            .build()
            .map_err(|e| PublishError::failed(format!("failed to create HTTP client: {}", e), None))?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            username,
            app_password,
        })
    }

    pub fn from_config(config: &Config) -> Result<Self> {
        Self::new(
            config.wordpress_url.clone(),
            config.wordpress_user.clone(),
            config.wordpress_app_password.clone(),
        )
    }

    pub fn api_base(&self) -> String {
        format!("{}/wp-json/wp/v2", self.base_url)
    }

    fn auth_header(&self) -> String {
        let credentials = format!("{}:{}", self.username, self.app_password);
        format!("Basic {}", STANDARD.encode(credentials))
    }

    async fn send_json(&self, url: &str, payload: &Value) -> Result<Response> {
        self.client
            .post(url)
            .header("Authorization", self.auth_header())
            .json(payload)
            .send()
            .await
            .map_err(|e| PublishError::failed(format!("transport error: {}", e), None).into())
    }

    async fn list_terms(&self, taxonomy: &str) -> Result<Vec<Term>> {
        let url = format!("{}/{}?per_page=100", self.api_base(), taxonomy);
        let response = self
            .client
            .get(&url)
            .header("Authorization", self.auth_header())
            .send()
            .await
            .map_err(|e| PublishError::failed(format!("transport error: {}", e), None))?;

        let status = response.status();
        if status == StatusCode::UNAUTHORIZED {
            return Err(PublishError::Authentication {
                status: 401,
                message: "check WORDPRESS_USER and WORDPRESS_APP_PASSWORD".to_string(),
            }
            .into());
        }
        if !status.is_success() {
            return Err(
                PublishError::failed(format!("{} lookup failed", taxonomy), Some(status.as_u16()))
                    .into(),
            );
        }

        let body = response
            .text()
            .await
            .map_err(|e| PublishError::failed(format!("transport error: {}", e), None))?;
        parse_terms(taxonomy, &body)
    }

    pub async fn list_categories(&self) -> Result<Vec<Term>> {
        self.list_terms("categories").await
    }

    pub async fn list_tags(&self) -> Result<Vec<Term>> {
        self.list_terms("tags").await
    }

    /// Map names to ids, case-insensitively. Unknown names are dropped.
    async fn resolve_terms(&self, taxonomy: &str, names: &[String]) -> Result<Vec<u64>> {
        if names.is_empty() {
            return Ok(Vec::new());
        }

        let terms = match self.list_terms(taxonomy).await {
            Ok(terms) => terms,
            Err(Error::Publish(PublishError::InvalidResponse(message))) => {
                warn!(taxonomy, %message, "could not read term list, skipping");
                return Ok(Vec::new());
            }
            Err(e) => return Err(e),
        };

        let by_name: HashMap<String, u64> = terms
            .into_iter()
            .filter(|t| !t.name.is_empty())
            .map(|t| (t.name.to_lowercase(), t.id))
            .collect();

        Ok(names
            .iter()
            .filter_map(|name| {
                let id = by_name.get(&name.to_lowercase()).copied();
                if id.is_none() {
                    warn!(taxonomy, name = %name, "unknown term, dropped");
                }
                id
            })
            .collect())
    }

    /// Point the excerpt at the post with a "read more" link. Failures are logged only.
    async fn update_excerpt(&self, post_id: u64, subtitle: &str, link: &str) {
        let excerpt = format!(
            "{}… <a class=\"more-link\" href=\"{}\">続きを読む</a>",
            subtitle, link
        );
        let url = format!("{}/posts/{}", self.api_base(), post_id);

        match self.send_json(&url, &json!({ "excerpt": excerpt })).await {
            Ok(response) if response.status().is_success() => {}
            Ok(response) => warn!(post_id, status = response.status().as_u16(), "excerpt update failed"),
            Err(e) => warn!(post_id, error = %e, "excerpt update failed"),
        }
    }
}

/// The body must be a JSON array; entries that are not valid terms are skipped.
fn parse_terms(taxonomy: &str, body: &str) -> Result<Vec<Term>> {
    let items: Vec<Value> = serde_json::from_str(body)
        .map_err(|e| PublishError::InvalidResponse(format!("{} list: {}", taxonomy, e)))?;

    Ok(items
        .into_iter()
        .filter_map(|item| match serde_json::from_value::<Term>(item) {
            Ok(term) => Some(term),
            Err(e) => {
                warn!(taxonomy, error = %e, "skipping malformed term");
                None
            }
        })
        .collect())
}

#[async_trait]
impl Publisher for WordPressPublisher {
    fn destination(&self) -> &'static str {
        "wordpress"
    }

    async fn publish(&self, article: &Article, options: &PublishOptions) -> Result<PublishOutcome> {
        let category_ids = self.resolve_terms("categories", &article.categories).await?;
        let tag_ids = self.resolve_terms("tags", &article.tags).await?;
        let subtitle = article.subtitle.as_deref().filter(|s| !s.is_empty());

        let mut payload = json!({
            "title": article.title,
            "content": markdown_to_html(&article.content),
            "status": options.status.as_str(),
            "slug": article.slug,
        });
        if let Some(subtitle) = subtitle {
            payload["excerpt"] = json!(subtitle);
        }
        if !category_ids.is_empty() {
            payload["categories"] = json!(category_ids);
        }
        if !tag_ids.is_empty() {
            payload["tags"] = json!(tag_ids);
        }

        let response = self
            .send_json(&format!("{}/posts", self.api_base()), &payload)
            .await?;
        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| PublishError::failed(format!("transport error: {}", e), None))?;

        if status == StatusCode::UNAUTHORIZED {
            return Err(PublishError::Authentication {
                status: 401,
                message: "check WORDPRESS_USER and WORDPRESS_APP_PASSWORD".to_string(),
            }
            .into());
        }
        if status.is_client_error() || status.is_server_error() {
            let message = error_field(&body, "message").unwrap_or_else(|| "post failed".to_string());
            return Err(PublishError::failed(message, Some(status.as_u16())).into());
        }

        let created: CreatedPost = serde_json::from_str(&body)
            .map_err(|e| PublishError::InvalidResponse(format!("created post: {}", e)))?;
        info!(post_id = created.id, status = %options.status, "WordPress post created");

        if let Some(subtitle) = subtitle {
            if !created.link.is_empty() {
                self.update_excerpt(created.id, subtitle, &created.link).await;
            }
        }

        let link = Some(created.link).filter(|l| !l.is_empty());
        Ok(PublishOutcome::published(Some(created.id.to_string()), link))
    }
}
