use std::path::PathBuf;

use thiserror::Error;

use crate::models::ContentType;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("{component} is not configured, missing: {}", missing.join(", "))]
    Configuration {
        component: &'static str,
        missing: Vec<String>,
    },

    #[error("[{source_tag}] {message}")]
    Collection { source_tag: String, message: String },

    #[error(transparent)]
    Publish(#[from] PublishError),

    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("store error [{}]: {message}", path.display())]
    Store { path: PathBuf, message: String },

    #[error("no template registered for content type: {0}")]
    TemplateNotFound(ContentType),

    #[error("unknown content type: {0}")]
    UnknownContentType(String),
}

impl Error {
    pub fn collection(source_tag: impl Into<String>, message: impl Into<String>) -> Self {
        Error::Collection {
            source_tag: source_tag.into(),
            message: message.into(),
        }
    }

    pub fn store(path: impl Into<PathBuf>, message: impl ToString) -> Self {
        Error::Store {
            path: path.into(),
            message: message.to_string(),
        }
    }
}

/// Failures reported by a publisher. Every variant except `InvalidResponse`
/// maps to an HTTP status or a transport problem.
#[derive(Debug, Error)]
pub enum PublishError {
    #[error("authentication failed (HTTP {status}): {message}")]
    Authentication { status: u16, message: String },

    #[error("rate limited, retry later (HTTP 429)")]
    RateLimited,

    #[error("API credits depleted (HTTP 402)")]
    CreditsDepleted,

    #[error("server error (HTTP {status})")]
    Server { status: u16 },

    #[error("{}", format_failed(message, *status))]
    Failed { message: String, status: Option<u16> },

    #[error("failed to parse response: {0}")]
    InvalidResponse(String),
}

fn format_failed(message: &str, status: Option<u16>) -> String {
    match status {
        Some(code) => format!("{} (HTTP {})", message, code),
        None => message.to_string(),
    }
}

impl PublishError {
    pub fn failed(message: impl Into<String>, status: Option<u16>) -> Self {
        PublishError::Failed {
            message: message.into(),
            status,
        }
    }

    pub fn status(&self) -> Option<u16> {
        match self {
            PublishError::Authentication { status, .. } => Some(*status),
            PublishError::RateLimited => Some(429),
            PublishError::CreditsDepleted => Some(402),
            PublishError::Server { status } => Some(*status),
            PublishError::Failed { status, .. } => *status,
            PublishError::InvalidResponse(_) => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("post text is empty")]
    EmptyInput,

    #[error("post text exceeds {limit} characters (weighted length {length}, {over_by} over)")]
    LengthExceeded {
        length: usize,
        limit: usize,
        over_by: usize,
    },
}
