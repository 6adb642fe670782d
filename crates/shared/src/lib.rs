// Public modules
pub mod collectors;
pub mod config;
pub mod error;
pub mod logging;
pub mod markdown;
pub mod models;
pub mod notion;
pub mod publishers;
pub mod store;
pub mod templates;
pub mod weighted;

/// User agent sent with every outbound HTTP request.
pub const USER_AGENT: &str = concat!("content-pipeline/", env!("CARGO_PKG_VERSION"));

// Re-export commonly used types
pub use collectors::{build_collector, CollectOptions, Collector, CollectorKind};
pub use config::Config;
pub use error::{Error, PublishError, Result, ValidationError};
pub use models::{Article, CollectedRecord, ContentType, PostStatus, PublishOutcome, ThreadOutcome};
pub use publishers::{CmsStatus, PublishOptions, Publisher, WordPressPublisher, XPublisher};
pub use store::ArticleStore;
pub use templates::{build_prompt_context, ContentTemplate, TemplateRegistry};
