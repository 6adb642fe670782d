use std::fmt;
use std::str::FromStr;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::{PublishError, Result};
use crate::models::{Article, PublishOutcome};

pub mod oauth;
pub mod wordpress;
pub mod x;

pub use oauth::OAuth1Signer;
pub use wordpress::{Term, WordPressPublisher};
pub use x::XPublisher;

/// Pushes a finished article to one external destination.
#[async_trait]
pub trait Publisher: Send + Sync {
    fn destination(&self) -> &'static str;

    async fn publish(&self, article: &Article, options: &PublishOptions) -> Result<PublishOutcome>;
}

/// Post status requested from the CMS.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CmsStatus {
    #[default]
    Draft,
    Publish,
}

impl CmsStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            CmsStatus::Draft => "draft",
            CmsStatus::Publish => "publish",
        }
    }
}

impl fmt::Display for CmsStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CmsStatus {
    type Err = PublishError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "draft" => Ok(CmsStatus::Draft),
            "publish" => Ok(CmsStatus::Publish),
            other => Err(PublishError::failed(
                format!("unknown CMS status: {} (expected draft or publish)", other),
                None,
            )),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct PublishOptions {
    pub status: CmsStatus,
    /// Explicit social post text; the social publisher derives one when unset.
    pub text: Option<String>,
}

impl PublishOptions {
    pub fn with_status(mut self, status: CmsStatus) -> Self {
        self.status = status;
        self
    }

    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = Some(text.into());
        self
    }
}

/// Pull a human-readable message out of an error body, if it is JSON
/// carrying `field` as a string.
pub(crate) fn error_field(body: &str, field: &str) -> Option<String> {
    serde_json::from_str::<serde_json::Value>(body)
        .ok()?
        .get(field)?
        .as_str()
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cms_status_parses() {
        assert_eq!("draft".parse::<CmsStatus>().unwrap(), CmsStatus::Draft);
        assert_eq!("publish".parse::<CmsStatus>().unwrap(), CmsStatus::Publish);
        assert!("published".parse::<CmsStatus>().is_err());
        assert_eq!(PublishOptions::default().status, CmsStatus::Draft);
    }

    #[test]
    fn test_error_field() {
        assert_eq!(
            error_field(r#"{"message":"Sorry, not allowed"}"#, "message").as_deref(),
            Some("Sorry, not allowed")
        );
        assert_eq!(error_field(r#"{"message":3}"#, "message"), None);
        assert_eq!(error_field("<html>", "message"), None);
    }
}
