use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::fs;
use tokio::io::AsyncWriteExt;

use crate::error::{Error, Result};
use crate::markdown::slugify;
use crate::models::{Article, ContentType, PostStatus};

const DELIMITER: &str = "---";

/// YAML header written above the article body
#[derive(Debug, Default, Serialize, Deserialize)]
struct FrontMatter {
    #[serde(default)]
    title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    date: Option<String>,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    content_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    status: Option<PostStatus>,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    slug: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    subtitle: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    categories: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    tags: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    published_at: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    wordpress_id: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    wordpress_url: Option<String>,
}

impl FrontMatter {
    fn from_article(article: &Article) -> Self {
        Self {
            title: article.title.clone(),
            date: Some(article.created_at.to_rfc3339()),
            content_type: Some(article.content_type.to_string()),
            status: Some(article.status),
            slug: article.slug.clone(),
            subtitle: article.subtitle.clone().filter(|s| !s.is_empty()),
            categories: article.categories.clone(),
            tags: article.tags.clone(),
            published_at: article.published_at.map(|t| t.to_rfc3339()),
            wordpress_id: article.external_id,
            wordpress_url: article.external_url.clone(),
        }
    }

    fn into_article(self, content: String, path: &Path) -> Result<Article> {
        let content_type = match self.content_type.as_deref() {
            Some(tag) => tag.parse::<ContentType>()?,
            None => ContentType::WeeklyAiNews,
        };
        let created_at = match self.date.as_deref() {
            Some(raw) => parse_timestamp(raw)
                .ok_or_else(|| Error::store(path, format!("invalid date: {}", raw)))?,
            None => Utc::now(),
        };
        let published_at = match self.published_at.as_deref() {
            Some(raw) => Some(
                parse_timestamp(raw)
                    .ok_or_else(|| Error::store(path, format!("invalid published_at: {}", raw)))?,
            ),
            None => None,
        };
        let slug = if self.slug.is_empty() {
            slugify(&self.title)
        } else {
            self.slug
        };

        Ok(Article {
            title: self.title,
            subtitle: self.subtitle,
            content,
            content_type,
            status: self.status.unwrap_or_default(),
            slug,
            categories: self.categories,
            tags: self.tags,
            created_at,
            published_at,
            external_id: self.wordpress_id,
            external_url: self.wordpress_url,
        })
    }
}

fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw.trim())
        .ok()
        .map(|t| t.with_timezone(&Utc))
}

fn render(article: &Article, path: &Path) -> Result<String> {
    let yaml = serde_yaml::to_string(&FrontMatter::from_article(article))
        .map_err(|e| Error::store(path, format!("failed to serialize front matter: {}", e)))?;
    Ok(format!("{}\n{}{}\n\n{}", DELIMITER, yaml, DELIMITER, article.content))
}

fn strip_line_break(text: &str) -> &str {
    text.strip_prefix("\r\n")
        .or_else(|| text.strip_prefix('\n'))
        .unwrap_or(text)
}

/// Body after the closing `---`: drops the rest of that line and at most one
/// blank separator line, so leading blank lines of the body survive.
fn body_after_delimiter(after: &str) -> &str {
    strip_line_break(strip_line_break(after))
}

/// Split a document into its YAML header and body. A document without a
/// header is all body.
fn split_front_matter(text: &str) -> (&str, &str) {
    let Some(rest) = text
        .strip_prefix("---\n")
        .or_else(|| text.strip_prefix("---\r\n"))
    else {
        return ("", text);
    };

    if let Some(body) = rest.strip_prefix("---") {
        return ("", body_after_delimiter(body));
    }

    match rest.find("\n---") {
        Some(end) => {
            let header = &rest[..end];
            let after = &rest[end + 4..];
            (header, body_after_delimiter(after))
        }
        None => ("", text),
    }
}

/// Markdown files with a YAML header, split into a drafts area keyed by
/// content type and a posts area keyed by year and month.
#[derive(Debug, Clone)]
pub struct ArticleStore {
    base_dir: PathBuf,
}

impl ArticleStore {
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
        }
    }

    pub fn drafts_dir(&self) -> PathBuf {
        self.base_dir.join("drafts")
    }

    pub fn posts_dir(&self) -> PathBuf {
        self.base_dir.join("posts")
    }

    /// `drafts/{type}/{YYYYMMDD}-{slug}.md`
    pub fn draft_path(&self, article: &Article) -> PathBuf {
        self.drafts_dir()
            .join(article.content_type.as_str())
            .join(format!(
                "{}-{}.md",
                article.created_at.format("%Y%m%d"),
                article.slug
            ))
    }

    /// `posts/{YYYY}/{MM}/{YYYYMMDD}-{type}-{slug}.md`
    pub fn published_path(&self, article: &Article, published_at: DateTime<Utc>) -> PathBuf {
        self.posts_dir()
            .join(published_at.format("%Y").to_string())
            .join(published_at.format("%m").to_string())
            .join(format!(
                "{}-{}-{}.md",
                published_at.format("%Y%m%d"),
                article.content_type,
                article.slug
            ))
    }

    /// Wrap LLM output into a new draft article.
    pub fn generate(
        &self,
        content_type: ContentType,
        title: &str,
        content: &str,
        subtitle: Option<&str>,
    ) -> Article {
        Article {
            title: title.to_string(),
            subtitle: subtitle.filter(|s| !s.is_empty()).map(str::to_string),
            content: content.to_string(),
            content_type,
            status: PostStatus::Draft,
            slug: slugify(title),
            categories: Vec::new(),
            tags: Vec::new(),
            created_at: Utc::now(),
            published_at: None,
            external_id: None,
            external_url: None,
        }
    }

    /// Write the article as a draft, replacing any draft at the same path.
    pub async fn save(&self, article: &Article) -> Result<PathBuf> {
        let path = self.draft_path(article);
        let document = render(article, &path)?;

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .await
                .map_err(|e| Error::store(&path, e))?;
        }
        fs::write(&path, document)
            .await
            .map_err(|e| Error::store(&path, e))?;

        Ok(path)
    }

    pub async fn load(&self, path: &Path) -> Result<Article> {
        let text = fs::read_to_string(path)
            .await
            .map_err(|e| Error::store(path, e))?;
        let (header, body) = split_front_matter(&text);

        let front: FrontMatter = if header.trim().is_empty() {
            FrontMatter::default()
        } else {
            serde_yaml::from_str(header)
                .map_err(|e| Error::store(path, format!("invalid front matter: {}", e)))?
        };

        front.into_article(body.to_string(), path)
    }

    /// Move a draft into the posts area, marking it published now.
    pub async fn promote(&self, article: &Article, draft_path: &Path) -> Result<PathBuf> {
        self.promote_at(article, draft_path, Utc::now()).await
    }

    /// Never overwrites an existing post. The draft is removed only once
    /// the published copy is on disk.
    pub async fn promote_at(
        &self,
        article: &Article,
        draft_path: &Path,
        now: DateTime<Utc>,
    ) -> Result<PathBuf> {
        let dest = self.published_path(article, now);

        let mut promoted = self.load(draft_path).await?;
        promoted.status = PostStatus::Published;
        promoted.published_at = Some(now);
        if article.external_id.is_some() {
            promoted.external_id = article.external_id;
        }
        if article.external_url.is_some() {
            promoted.external_url = article.external_url.clone();
        }
        let document = render(&promoted, &dest)?;

        if let Some(parent) = dest.parent() {
            fs::create_dir_all(parent)
                .await
                .map_err(|e| Error::store(&dest, e))?;
        }

        let mut file = fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&dest)
            .await
            .map_err(|e| match e.kind() {
                ErrorKind::AlreadyExists => Error::store(&dest, "destination already exists"),
                _ => Error::store(&dest, e),
            })?;
        file.write_all(document.as_bytes())
            .await
            .map_err(|e| Error::store(&dest, e))?;
        file.flush().await.map_err(|e| Error::store(&dest, e))?;
        drop(file);

        fs::remove_file(draft_path)
            .await
            .map_err(|e| Error::store(draft_path, e))?;

        Ok(dest)
    }

    /// Every draft file, newest date prefix first.
    pub async fn list_drafts(&self) -> Result<Vec<PathBuf>> {
        let drafts_dir = self.drafts_dir();
        let mut drafts = Vec::new();

        let mut type_dirs = match fs::read_dir(&drafts_dir).await {
            Ok(dir) => dir,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(drafts),
            Err(e) => return Err(Error::store(&drafts_dir, e)),
        };

        while let Some(entry) = type_dirs
            .next_entry()
            .await
            .map_err(|e| Error::store(&drafts_dir, e))?
        {
            let type_dir = entry.path();
            if !type_dir.is_dir() {
                continue;
            }
            let mut files = fs::read_dir(&type_dir)
                .await
                .map_err(|e| Error::store(&type_dir, e))?;
            while let Some(file) = files
                .next_entry()
                .await
                .map_err(|e| Error::store(&type_dir, e))?
            {
                let path = file.path();
                if path.extension().and_then(|s| s.to_str()) == Some("md") {
                    drafts.push(path);
                }
            }
        }

        drafts.sort_by(|a, b| b.file_name().cmp(&a.file_name()));
        Ok(drafts)
    }
}
