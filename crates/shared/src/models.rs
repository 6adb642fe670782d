use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::Error;

/// One normalized piece of information produced by a collector
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CollectedRecord {
    pub source: String,
    pub title: String,
    pub url: Option<String>,
    pub content: String,
    pub collected_at: DateTime<Utc>,
    pub published_date: Option<String>,
}

impl CollectedRecord {
    pub fn new(
        source: impl Into<String>,
        title: impl Into<String>,
        content: impl Into<String>,
    ) -> Self {
        Self {
            source: source.into(),
            title: title.into(),
            url: None,
            content: content.into(),
            collected_at: Utc::now(),
            published_date: None,
        }
    }

    /// Empty strings are treated as "no url".
    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        let url = url.into();
        self.url = if url.is_empty() { None } else { Some(url) };
        self
    }

    pub fn with_published_date(mut self, date: Option<String>) -> Self {
        self.published_date = date.filter(|d| !d.is_empty());
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ContentType {
    WeeklyAiNews,
    PaperReview,
    ProjectIntro,
    ToolTips,
    MarketAnalysis,
    MlPractice,
    Cv,
    Feature,
}

impl ContentType {
    pub const ALL: [ContentType; 8] = [
        ContentType::WeeklyAiNews,
        ContentType::PaperReview,
        ContentType::ProjectIntro,
        ContentType::ToolTips,
        ContentType::MarketAnalysis,
        ContentType::MlPractice,
        ContentType::Cv,
        ContentType::Feature,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ContentType::WeeklyAiNews => "weekly-ai-news",
            ContentType::PaperReview => "paper-review",
            ContentType::ProjectIntro => "project-intro",
            ContentType::ToolTips => "tool-tips",
            ContentType::MarketAnalysis => "market-analysis",
            ContentType::MlPractice => "ml-practice",
            ContentType::Cv => "cv",
            ContentType::Feature => "feature",
        }
    }
}

impl fmt::Display for ContentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ContentType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ContentType::ALL
            .into_iter()
            .find(|ct| ct.as_str() == s)
            .ok_or_else(|| Error::UnknownContentType(s.to_string()))
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PostStatus {
    #[default]
    Draft,
    Review,
    Ready,
    Published,
}

impl PostStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PostStatus::Draft => "draft",
            PostStatus::Review => "review",
            PostStatus::Ready => "ready",
            PostStatus::Published => "published",
        }
    }
}

impl fmt::Display for PostStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A blog article moving through the draft to published lifecycle
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Article {
    pub title: String,
    pub subtitle: Option<String>,
    pub content: String,
    pub content_type: ContentType,
    pub status: PostStatus,
    pub slug: String,
    pub categories: Vec<String>,
    pub tags: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub published_at: Option<DateTime<Utc>>,
    /// Post id assigned by the CMS
    pub external_id: Option<u64>,
    /// Public URL of the post on the CMS
    pub external_url: Option<String>,
}

impl Article {
    pub fn with_categories(mut self, categories: Vec<String>) -> Self {
        self.categories = categories;
        self
    }

    pub fn with_tags(mut self, tags: Vec<String>) -> Self {
        self.tags = tags;
        self
    }
}

/// Result of one publish attempt. Never persisted.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PublishOutcome {
    pub success: bool,
    pub external_id: Option<String>,
    pub external_url: Option<String>,
    pub error_message: Option<String>,
}

impl PublishOutcome {
    pub fn published(external_id: Option<String>, external_url: Option<String>) -> Self {
        Self {
            success: true,
            external_id,
            external_url,
            error_message: None,
        }
    }
}

/// Outcome of a thread: the first post plus every id in posting order
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ThreadOutcome {
    pub outcome: PublishOutcome,
    pub thread_ids: Vec<String>,
}
