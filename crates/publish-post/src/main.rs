use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use shared::logging::init_logging;
use shared::{
    ArticleStore, CmsStatus, Config, ContentType, PublishOptions, Publisher, WordPressPublisher,
    XPublisher,
};
use std::fs;
use std::io::{self, Read, Write as _};
use std::path::{Path, PathBuf};

const DRAFT_CHOICES: usize = 20;

#[derive(Parser)]
#[command(name = "publish-post")]
#[command(about = "Save LLM output as a draft, publish drafts to WordPress and X")]
struct Args {
    /// Root of the article store
    #[arg(long, default_value = "docs", global = true)]
    base_dir: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Save generated text as a new draft
    Draft {
        /// Content type of the article
        #[arg(short = 't', long, default_value = "weekly-ai-news")]
        content_type: String,

        #[arg(long)]
        title: String,

        #[arg(long)]
        subtitle: Option<String>,

        /// Markdown body file (reads stdin when omitted)
        #[arg(short, long)]
        body: Option<PathBuf>,

        /// Comma-separated category names
        #[arg(long, value_delimiter = ',')]
        categories: Vec<String>,

        /// Comma-separated tag names
        #[arg(long, value_delimiter = ',')]
        tags: Vec<String>,
    },
    /// Publish a draft and move it to the posts area
    Publish {
        /// Draft file (if not provided, will list recent drafts)
        #[arg(short, long)]
        draft: Option<PathBuf>,

        /// Where to publish, in order
        #[arg(long = "to", value_enum, default_values_t = [Destination::Wordpress])]
        destinations: Vec<Destination>,

        /// Post status requested from WordPress
        #[arg(long, default_value = "draft")]
        status: String,

        /// Text of the X post (defaults to the title and the WordPress link)
        #[arg(long)]
        text: Option<String>,

        /// Post a reply chain on X instead of a single post; repeat per post
        #[arg(long)]
        thread: Vec<String>,

        /// Leave the draft in place after publishing
        #[arg(long)]
        keep_draft: bool,
    },
    /// List WordPress categories and tags
    Terms,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Destination {
    Wordpress,
    X,
}

fn select_draft(drafts: &[PathBuf]) -> Result<PathBuf> {
    if drafts.is_empty() {
        anyhow::bail!("No drafts found. Create one with `publish-post draft` first.");
    }
    let shown = &drafts[..drafts.len().min(DRAFT_CHOICES)];

    println!("Available drafts:\n");
    for (i, path) in shown.iter().enumerate() {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let content_type = path
            .parent()
            .and_then(Path::file_name)
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        println!("  {}) [{}] {}", i + 1, content_type, name);
    }

    print!("\nSelect draft (1-{}): ", shown.len());
    io::stdout().flush()?;

    let mut input = String::new();
    io::stdin().read_line(&mut input)?;

    let selection: usize = input
        .trim()
        .parse()
        .context("Invalid selection. Please enter a number.")?;

    if selection < 1 || selection > shown.len() {
        anyhow::bail!("Selection out of range. Please choose 1-{}", shown.len());
    }

    Ok(shown[selection - 1].clone())
}

fn read_body(path: Option<&Path>) -> Result<String> {
    match path {
        Some(path) => fs::read_to_string(path)
            .with_context(|| format!("Failed to read body file: {}", path.display())),
        None => {
            let mut body = String::new();
            io::stdin()
                .read_to_string(&mut body)
                .context("Failed to read body from stdin")?;
            Ok(body)
        }
    }
}

fn clean_names(names: Vec<String>) -> Vec<String> {
    names
        .into_iter()
        .map(|n| n.trim().to_string())
        .filter(|n| !n.is_empty())
        .collect()
}

async fn create_draft(
    store: &ArticleStore,
    content_type: &str,
    title: &str,
    subtitle: Option<&str>,
    body: Option<&Path>,
    categories: Vec<String>,
    tags: Vec<String>,
) -> Result<()> {
    let content_type: ContentType = content_type.parse()?;
    let content = read_body(body)?;
    if content.trim().is_empty() {
        anyhow::bail!("Article body is empty");
    }

    let article = store
        .generate(content_type, title, &content, subtitle)
        .with_categories(clean_names(categories))
        .with_tags(clean_names(tags));

    let path = store.save(&article).await.context("Failed to save draft")?;
    println!("✓ Draft saved to: {}", path.display());
    Ok(())
}

struct PublishRequest {
    draft: Option<PathBuf>,
    destinations: Vec<Destination>,
    status: CmsStatus,
    text: Option<String>,
    thread: Vec<String>,
    keep_draft: bool,
}

async fn publish_draft(store: &ArticleStore, config: &Config, request: PublishRequest) -> Result<()> {
    // Build every publisher first so missing credentials fail before any post goes out
    let wordpress = if request.destinations.contains(&Destination::Wordpress) {
        Some(WordPressPublisher::from_config(config)?)
    } else {
        None
    };
    let x = if request.destinations.contains(&Destination::X) {
        Some(XPublisher::from_config(config)?)
    } else {
        None
    };

    let draft_path = match request.draft {
        Some(path) => path,
        None => select_draft(&store.list_drafts().await?)?,
    };

    println!("📖 Reading draft: {}", draft_path.display());
    let mut article = store
        .load(&draft_path)
        .await
        .with_context(|| format!("Failed to load draft: {}", draft_path.display()))?;

    if let Some(wordpress) = &wordpress {
        println!("\n📝 Publishing to WordPress ({})...", request.status);
        let options = PublishOptions::default().with_status(request.status);
        let outcome = wordpress
            .publish(&article, &options)
            .await
            .context("WordPress publish failed")?;

        article.external_id = outcome.external_id.as_deref().and_then(|id| id.parse().ok());
        article.external_url = outcome.external_url.clone();
        println!(
            "✓ WordPress post {}: {}",
            outcome.external_id.as_deref().unwrap_or("?"),
            outcome.external_url.as_deref().unwrap_or("(no link)")
        );
    }

    if let Some(x) = &x {
        if request.thread.is_empty() {
            println!("\n🐦 Posting to X...");
            let mut options = PublishOptions::default();
            if let Some(text) = &request.text {
                options = options.with_text(text.as_str());
            }
            let outcome = x.publish(&article, &options).await.context("X post failed")?;
            println!(
                "✓ Posted: {}",
                outcome.external_url.as_deref().unwrap_or("(no link)")
            );
        } else {
            println!("\n🐦 Posting a {}-part thread to X...", request.thread.len());
            let thread = x
                .publish_thread(&article, &request.thread)
                .await
                .context("X thread failed")?;
            println!(
                "✓ Posted {} posts: {}",
                thread.thread_ids.len(),
                thread.outcome.external_url.as_deref().unwrap_or("(no link)")
            );
        }
    }

    if request.keep_draft {
        println!("\n✅ Done (draft kept at {})", draft_path.display());
        return Ok(());
    }

    let post_path = store
        .promote(&article, &draft_path)
        .await
        .context("Failed to move draft to posts")?;
    println!("\n✅ Published article saved to: {}", post_path.display());
    Ok(())
}

async fn list_terms(config: &Config) -> Result<()> {
    let wordpress = WordPressPublisher::from_config(config)?;
    println!("🔍 Fetching terms from {}...", wordpress.api_base());

    let (categories, tags) = tokio::try_join!(wordpress.list_categories(), wordpress.list_tags())
        .context("Failed to list WordPress terms")?;

    println!("\nCategories ({}):", categories.len());
    for term in &categories {
        println!("  {:>5}  {} ({} posts)", term.id, term.name, term.count);
    }
    println!("\nTags ({}):", tags.len());
    for term in &tags {
        println!("  {:>5}  {} ({} posts)", term.id, term.name, term.count);
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    init_logging("info");
    let config = Config::from_env();
    let store = ArticleStore::new(&args.base_dir);

    match args.command {
        Command::Draft {
            content_type,
            title,
            subtitle,
            body,
            categories,
            tags,
        } => {
            create_draft(
                &store,
                &content_type,
                &title,
                subtitle.as_deref(),
                body.as_deref(),
                categories,
                tags,
            )
            .await
        }
        Command::Publish {
            draft,
            destinations,
            status,
            text,
            thread,
            keep_draft,
        } => {
            let request = PublishRequest {
                draft,
                destinations,
                status: status.parse()?,
                text,
                thread,
                keep_draft,
            };
            publish_draft(&store, &config, request).await
        }
        Command::Terms => list_terms(&config).await,
    }
}
