use async_trait::async_trait;
use reqwest::{Client, Response, StatusCode};
use serde::Deserialize;
use tracing::{debug, warn};

use super::{CollectOptions, Collector};
use crate::error::{Error, Result};
use crate::models::CollectedRecord;

const SOURCE: &str = "github";
pub const GITHUB_API_BASE: &str = "https://api.github.com";

const README_CHARS: usize = 3000;
const TREE_ENTRIES: usize = 200;
const COMMIT_COUNT: usize = 5;

#[derive(Debug, Deserialize)]
struct RepoInfo {
    full_name: Option<String>,
    description: Option<String>,
    #[serde(default)]
    stargazers_count: u64,
    #[serde(default)]
    forks_count: u64,
    language: Option<String>,
    html_url: Option<String>,
    default_branch: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct TreeResponse {
    #[serde(default)]
    tree: Vec<TreeEntry>,
}

#[derive(Debug, Deserialize)]
struct TreeEntry {
    #[serde(default)]
    path: String,
    #[serde(rename = "type", default)]
    kind: String,
}

#[derive(Debug, Deserialize)]
struct CommitItem {
    commit: Option<CommitDetail>,
}

#[derive(Debug, Deserialize)]
struct CommitDetail {
    #[serde(default)]
    message: String,
}

/// Summarizes one repository: metadata, README, file tree and recent commits.
pub struct GitHubCollector {
    client: Client,
    token: Option<String>,
    api_base: String,
}

impl GitHubCollector {
    pub fn new(token: Option<String>) -> Result<Self> {
        let token = token.filter(|t| !t.is_empty());
        if token.is_none() {
            warn!("GITHUB_TOKEN is not set; calling the GitHub API unauthenticated with a lower rate limit");
        }

        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(30))
            .user_agent(crate::USER_AGENT)
            .build()
            .map_err(|e| Error::collection(SOURCE, format!("failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            token,
            api_base: GITHUB_API_BASE.to_string(),
        })
    }

    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = api_base.into().trim_end_matches('/').to_string();
        self
    }

    async fn get(&self, path: &str, accept: &str) -> Result<Response> {
        let url = format!("{}{}", self.api_base, path);
        let mut request = self.client.get(&url).header("Accept", accept);
        if let Some(token) = &self.token {
            request = request.header("Authorization", format!("Bearer {}", token));
        }
        request
            .send()
            .await
            .map_err(|e| Error::collection(SOURCE, format!("request to {} failed: {}", path, e)))
    }

    async fn fetch_repo(&self, repo: &str) -> Result<RepoInfo> {
        let response = self
            .get(&format!("/repos/{}", repo), "application/vnd.github.v3+json")
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(Error::collection(
                SOURCE,
                format!("repository {} returned HTTP {}", repo, status.as_u16()),
            ));
        }

        response
            .json::<RepoInfo>()
            .await
            .map_err(|e| Error::collection(SOURCE, format!("failed to parse repository JSON: {}", e)))
    }

    async fn fetch_readme(&self, repo: &str) -> Result<String> {
        let response = self
            .get(&format!("/repos/{}/readme", repo), "application/vnd.github.v3.raw")
            .await?;

        match response.status() {
            StatusCode::NOT_FOUND => Ok(String::new()),
            s if s.is_success() => response
                .text()
                .await
                .map_err(|e| Error::collection(SOURCE, format!("failed to read README: {}", e))),
            s => Err(Error::collection(
                SOURCE,
                format!("README request returned HTTP {}", s.as_u16()),
            )),
        }
    }

    async fn fetch_tree(&self, repo: &str, branch: &str) -> Result<Vec<String>> {
        let response = self
            .get(
                &format!(
                    "/repos/{}/git/trees/{}?recursive=1",
                    repo,
                    urlencoding::encode(branch)
                ),
                "application/vnd.github.v3+json",
            )
            .await?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Ok(Vec::new());
        }
        if !status.is_success() {
            return Err(Error::collection(
                SOURCE,
                format!("tree request returned HTTP {}", status.as_u16()),
            ));
        }

        let body = response
            .text()
            .await
            .map_err(|e| Error::collection(SOURCE, format!("failed to read tree: {}", e)))?;
        let tree: TreeResponse = serde_json::from_str(&body).unwrap_or_default();

        Ok(tree
            .tree
            .into_iter()
            .take(TREE_ENTRIES)
            .map(|entry| {
                if entry.kind == "tree" {
                    format!("{}/", entry.path)
                } else {
                    entry.path
                }
            })
            .collect())
    }

    async fn fetch_commits(&self, repo: &str) -> Result<Vec<String>> {
        let response = self
            .get(
                &format!("/repos/{}/commits?per_page={}", repo, COMMIT_COUNT),
                "application/vnd.github.v3+json",
            )
            .await?;

        let status = response.status();
        // 409 is what GitHub returns for an empty repository
        if status == StatusCode::NOT_FOUND || status == StatusCode::CONFLICT {
            return Ok(Vec::new());
        }
        if !status.is_success() {
            return Err(Error::collection(
                SOURCE,
                format!("commits request returned HTTP {}", status.as_u16()),
            ));
        }

        let body = response
            .text()
            .await
            .map_err(|e| Error::collection(SOURCE, format!("failed to read commits: {}", e)))?;
        let commits: Vec<CommitItem> = serde_json::from_str(&body).unwrap_or_default();

        Ok(commits
            .into_iter()
            .take(COMMIT_COUNT)
            .map(|c| {
                c.commit
                    .and_then(|d| d.message.lines().next().map(str::to_string))
                    .unwrap_or_default()
            })
            .collect())
    }
}

fn render_repo(
    repo: &str,
    info: &RepoInfo,
    readme: &str,
    tree: &[String],
    commits: &[String],
) -> String {
    let mut parts = vec![
        format!("# {}", info.full_name.as_deref().unwrap_or(repo)),
        format!(
            "\n{}",
            info.description.as_deref().unwrap_or("No description")
        ),
        format!(
            "\nStars: {} | Forks: {} | Language: {}",
            info.stargazers_count,
            info.forks_count,
            info.language.as_deref().unwrap_or("N/A")
        ),
    ];

    if !readme.is_empty() {
        let excerpt: String = readme.chars().take(README_CHARS).collect();
        parts.push(format!("\n## README\n{}", excerpt));
    }
    if !tree.is_empty() {
        parts.push(format!("\n## Directory Structure\n```\n{}\n```", tree.join("\n")));
    }
    if !commits.is_empty() {
        parts.push("\n## Recent Commits".to_string());
        parts.extend(commits.iter().map(|m| format!("- {}", m)));
    }

    parts.join("\n")
}

#[async_trait]
impl Collector for GitHubCollector {
    fn source(&self) -> &'static str {
        SOURCE
    }

    async fn collect(&self, query: &str, _options: &CollectOptions) -> Result<Vec<CollectedRecord>> {
        let repo = query.trim().trim_matches('/');
        if repo.is_empty() {
            return Err(Error::collection(SOURCE, "repository name is empty"));
        }

        let info = self.fetch_repo(repo).await?;
        let branch = info.default_branch.as_deref().unwrap_or("main");
        debug!(repo, branch, "fetched repository metadata");

        let (readme, tree, commits) = futures::try_join!(
            self.fetch_readme(repo),
            self.fetch_tree(repo, branch),
            self.fetch_commits(repo),
        )?;

        let title = info.full_name.clone().unwrap_or_else(|| repo.to_string());
        let url = info
            .html_url
            .clone()
            .unwrap_or_else(|| format!("https://github.com/{}", repo));
        let content = render_repo(repo, &info, &readme, &tree, &commits);

        Ok(vec![CollectedRecord::new(SOURCE, title, content).with_url(url)])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn info() -> RepoInfo {
        RepoInfo {
            full_name: Some("owner/repo".to_string()),
            description: None,
            stargazers_count: 12,
            forks_count: 3,
            language: Some("Rust".to_string()),
            html_url: None,
            default_branch: None,
        }
    }

    #[test]
    fn test_render_minimal_repo() {
        let content = render_repo("owner/repo", &info(), "", &[], &[]);
        assert_eq!(
            content,
            "# owner/repo\n\nNo description\n\nStars: 12 | Forks: 3 | Language: Rust"
        );
    }

    #[test]
    fn test_render_full_repo() {
        let tree = vec!["src/".to_string(), "src/main.rs".to_string()];
        let commits = vec!["Initial commit".to_string()];
        let content = render_repo("owner/repo", &info(), "Hello", &tree, &commits);

        assert!(content.contains("\n\n## README\nHello"));
        assert!(content.contains("## Directory Structure\n```\nsrc/\nsrc/main.rs\n```"));
        assert!(content.ends_with("## Recent Commits\n- Initial commit"));
    }

    #[test]
    fn test_render_truncates_readme() {
        let readme = "ß".repeat(README_CHARS + 100);
        let content = render_repo("owner/repo", &info(), &readme, &[], &[]);
        assert_eq!(content.matches('ß').count(), README_CHARS);
    }

    #[test]
    fn test_missing_language_renders_na() {
        let mut repo = info();
        repo.language = None;
        let content = render_repo("owner/repo", &repo, "", &[], &[]);
        assert!(content.contains("Language: N/A"));
    }
}
