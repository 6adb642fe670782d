use anyhow::{Context, Result};
use clap::Parser;
use serde_json::Value;
use shared::logging::init_logging;
use shared::{
    build_collector, build_prompt_context, CollectOptions, CollectorKind, Config, ContentType,
    TemplateRegistry,
};
use std::fs;
use std::io::{self as stdio, Write};
use std::path::{Path, PathBuf};

fn prompt_source_selection() -> Result<CollectorKind> {
    println!("Which source?");
    for (i, kind) in CollectorKind::ALL.iter().enumerate() {
        println!("  {}) {}", i + 1, kind);
    }
    print!("\nEnter your choice (1-{}): ", CollectorKind::ALL.len());
    stdio::stdout().flush()?;

    let mut input = String::new();
    stdio::stdin().read_line(&mut input)?;

    let selection: usize = input
        .trim()
        .parse()
        .context("Invalid selection. Please enter a number.")?;
    CollectorKind::ALL
        .get(selection.wrapping_sub(1))
        .copied()
        .ok_or_else(|| {
            anyhow::anyhow!(
                "Selection out of range. Please choose 1-{}",
                CollectorKind::ALL.len()
            )
        })
}

/// Read relay data handed over by an outer agent. A bare JSON list is taken
/// as the `results` (web search) or `pages` (Notion relay) option.
fn load_input(path: &Path, kind: CollectorKind) -> Result<CollectOptions> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("Failed to read input file: {}", path.display()))?;
    let value: Value = serde_json::from_str(&raw)
        .with_context(|| format!("Failed to parse input JSON from {}", path.display()))?;

    Ok(match value {
        Value::Array(items) => {
            let key = if kind == CollectorKind::WebSearch {
                "results"
            } else {
                "pages"
            };
            CollectOptions::new().with(key, items)
        }
        other => CollectOptions::from_value(other),
    })
}

#[derive(Parser)]
#[command(name = "collect-sources")]
#[command(about = "Collect source material and build the prompt context for a blog article")]
struct Args {
    /// Source to collect from (gemini, github, notion_medium, notion_alert,
    /// notion_paper, notion_news, url_fetcher, web_search)
    #[arg(short, long)]
    source: Option<String>,

    /// Query, keyword filter, repository (owner/name) or URL, depending on the source
    #[arg(short, long, default_value = "")]
    query: String,

    /// Number of days to look back
    #[arg(short, long)]
    days: Option<i64>,

    /// Start date (YYYY-MM-DD), overrides --days
    #[arg(long)]
    date_from: Option<String>,

    /// End date (YYYY-MM-DD), exclusive
    #[arg(long)]
    date_to: Option<String>,

    /// JSON file with relay data (Notion pages or search results)
    #[arg(short, long)]
    input: Option<PathBuf>,

    /// Content type of the article to write
    #[arg(short = 't', long, default_value = "weekly-ai-news")]
    content_type: String,

    /// Article topic
    #[arg(long)]
    topic: Option<String>,

    /// Reference URL for the article
    #[arg(long)]
    source_url: Option<String>,

    /// Write the prompt context here instead of stdout
    #[arg(short, long)]
    output: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    init_logging("info");
    let config = Config::from_env();

    let kind = match &args.source {
        Some(tag) => tag.parse::<CollectorKind>()?,
        None => prompt_source_selection()?,
    };
    let content_type: ContentType = args.content_type.parse()?;
    eprintln!("\n✓ Selected: {} → {}", kind, content_type);

    let mut options = match &args.input {
        Some(path) => load_input(path, kind)?,
        None => CollectOptions::new(),
    };
    if let Some(days) = args.days {
        options = options.with("days", days);
    }
    if let Some(from) = &args.date_from {
        options = options.with("date_from", from.as_str());
    }
    if let Some(to) = &args.date_to {
        options = options.with("date_to", to.as_str());
    }

    if kind.is_relay() && args.input.is_none() {
        eprintln!("⚠ {} only reshapes relayed data; pass it with --input", kind);
    }

    eprintln!("\n📚 Collecting from {}...", kind);
    let collector = build_collector(kind, &config)?;
    let records = collector
        .collect(&args.query, &options)
        .await
        .context("Failed to collect source material")?;

    if records.is_empty() {
        eprintln!("No records found for {}.", kind);
        return Ok(());
    }
    eprintln!("✓ Collected {} records", records.len());

    eprintln!("\n📝 Building prompt context...");
    let registry = TemplateRegistry::new();
    let template = registry.get(content_type)?;
    let context = build_prompt_context(
        template,
        args.topic.as_deref(),
        args.source_url.as_deref(),
        &records,
    );

    match &args.output {
        Some(path) => {
            if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                fs::create_dir_all(parent).context("Failed to create output directory")?;
            }
            fs::write(path, &context)
                .with_context(|| format!("Failed to write {}", path.display()))?;
            eprintln!("\n✅ Prompt context saved to: {}", path.display());
        }
        None => println!("{}", context),
    }

    Ok(())
}
