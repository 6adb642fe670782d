use std::io::ErrorKind;
use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use tokio::process::Command;
use tracing::info;

use super::{CollectOptions, Collector};
use crate::error::{Error, Result};
use crate::models::CollectedRecord;

const SOURCE: &str = "gemini";
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(120);
const TITLE_QUERY_CHARS: usize = 80;

/// Runs a local research CLI (`gemini -p <query>` by default) and keeps its
/// stdout as one record.
pub struct CliResearchCollector {
    program: String,
    args: Vec<String>,
    timeout: Duration,
}

impl Default for CliResearchCollector {
    fn default() -> Self {
        Self::new()
    }
}

impl CliResearchCollector {
    pub fn new() -> Self {
        Self {
            program: "gemini".to_string(),
            args: vec!["-p".to_string()],
            timeout: DEFAULT_TIMEOUT,
        }
    }

    /// Replace the program and the arguments placed before the query.
    pub fn with_command(mut self, program: impl Into<String>, args: Vec<String>) -> Self {
        self.program = program.into();
        self.args = args;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

#[async_trait]
impl Collector for CliResearchCollector {
    fn source(&self) -> &'static str {
        SOURCE
    }

    async fn collect(&self, query: &str, _options: &CollectOptions) -> Result<Vec<CollectedRecord>> {
        info!(program = %self.program, "running research CLI");

        let child = Command::new(&self.program)
            .args(&self.args)
            .arg(query)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| match e.kind() {
                ErrorKind::NotFound => {
                    Error::collection(SOURCE, format!("{} CLI not found", self.program))
                }
                _ => Error::collection(SOURCE, format!("failed to start {}: {}", self.program, e)),
            })?;

        // Dropping the timed-out future drops the child, which kills it.
        let output = tokio::time::timeout(self.timeout, child.wait_with_output())
            .await
            .map_err(|_| {
                Error::collection(
                    SOURCE,
                    format!("timed out after {}s", self.timeout.as_secs_f64()),
                )
            })?
            .map_err(|e| Error::collection(SOURCE, format!("failed to read CLI output: {}", e)))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(Error::collection(
                SOURCE,
                format!("CLI exited with {}: {}", output.status, stderr.trim()),
            ));
        }

        let content = String::from_utf8_lossy(&output.stdout).trim().to_string();
        let excerpt: String = query.chars().take(TITLE_QUERY_CHARS).collect();

        Ok(vec![CollectedRecord::new(
            SOURCE,
            format!("Gemini research: {}", excerpt),
            content,
        )])
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_stdout_becomes_single_record() {
        let collector = CliResearchCollector::new().with_command("echo", vec![]);
        let records = collector
            .collect("rust async runtimes", &CollectOptions::new())
            .await
            .unwrap();

        assert_eq!(records.len(), 1);
        assert_eq!(records[0].source, "gemini");
        assert_eq!(records[0].title, "Gemini research: rust async runtimes");
        assert_eq!(records[0].content, "rust async runtimes");
        assert!(records[0].url.is_none());
    }

    #[tokio::test]
    async fn test_title_truncates_query() {
        let collector = CliResearchCollector::new().with_command("echo", vec![]);
        let query = "q".repeat(200);
        let records = collector.collect(&query, &CollectOptions::new()).await.unwrap();
        assert_eq!(
            records[0].title,
            format!("Gemini research: {}", "q".repeat(80))
        );
    }

    #[tokio::test]
    async fn test_nonzero_exit_is_failure() {
        let collector = CliResearchCollector::new()
            .with_command("sh", vec!["-c".to_string(), "echo boom >&2; exit 3".to_string()]);
        let err = collector
            .collect("ignored", &CollectOptions::new())
            .await
            .unwrap_err();
        let message = err.to_string();
        assert!(message.starts_with("[gemini]"));
        assert!(message.contains("boom"));
    }

    #[tokio::test]
    async fn test_missing_binary_is_failure() {
        let collector =
            CliResearchCollector::new().with_command("definitely-not-a-real-cli-7f3a", vec![]);
        let err = collector
            .collect("anything", &CollectOptions::new())
            .await
            .unwrap_err();
        assert!(err.to_string().contains("not found"));
    }

    #[tokio::test]
    async fn test_timeout_is_failure() {
        let collector = CliResearchCollector::new()
            .with_command("sleep", vec![])
            .with_timeout(Duration::from_millis(100));
        let err = collector
            .collect("5", &CollectOptions::new())
            .await
            .unwrap_err();
        assert!(err.to_string().contains("timed out"));
    }
}
