use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

use sift_client::ReqwestFetcher;
use sift_core::{
    DynamicRecord, ExtractPipeline, ModelResolver, Page, PageModelExtractor, PipelineConfig,
    TracingReporter,
};

#[derive(Parser)]
#[command(name = "sift", version, about = "Declarative page-model extraction")]
struct Cli {
    /// Directory holding `<name>/<version>.json` models and `registry.json`
    #[arg(long, global = true, env = "SIFT_MODELS_DIR", default_value = "models")]
    models_dir: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Extract records from pages and print them as JSON lines
    Extract {
        /// Model file path or name@version (name@latest uses registry.json)
        #[arg(short, long)]
        model: String,

        /// Page URL (repeatable)
        #[arg(short, long = "url", required = true)]
        urls: Vec<String>,

        /// Read the page from this file instead of fetching it (single URL only)
        #[arg(long)]
        html: Option<PathBuf>,

        /// Maximum number of pages processed at once
        #[arg(short, long, env = "SIFT_CONCURRENCY")]
        concurrency: Option<usize>,
    },

    /// Compile a model and print its rules
    Check {
        /// Model file path or name@version
        #[arg(short, long)]
        model: String,
    },

    /// Classify URLs as target, help or neither
    Match {
        /// Model file path or name@version
        #[arg(short, long)]
        model: String,

        /// URLs to classify
        #[arg(required = true)]
        urls: Vec<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env if present
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("sift=info".parse()?))
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let resolver = ModelResolver::new(&cli.models_dir);

    match cli.command {
        Commands::Extract {
            model,
            urls,
            html,
            concurrency,
        } => {
            let extractor = load_extractor(&resolver, &model)?;
            match html {
                Some(path) => cmd_extract_file(&extractor, &urls, &path)?,
                None => cmd_extract(extractor, urls, concurrency).await?,
            }
        }
        Commands::Check { model } => {
            let extractor = load_extractor(&resolver, &model)?;
            cmd_check(&extractor);
        }
        Commands::Match { model, urls } => {
            let extractor = load_extractor(&resolver, &model)?;
            cmd_match(&extractor, &urls);
        }
    }

    Ok(())
}

/// Resolve a model reference and compile it.
fn load_extractor(
    resolver: &ModelResolver,
    reference: &str,
) -> Result<PageModelExtractor<DynamicRecord>> {
    let resolved = resolver
        .resolve(reference)
        .with_context(|| format!("Failed to load model {reference}"))?;
    let schema = resolved
        .spec
        .into_schema()
        .with_context(|| format!("Invalid model {}", resolved.name))?;
    let extractor = PageModelExtractor::compile(schema)
        .with_context(|| format!("Failed to compile model {}", resolved.name))?;

    tracing::info!(
        model = %resolved.name,
        fields = extractor.field_rules().len(),
        "Model compiled"
    );
    Ok(extractor)
}

async fn cmd_extract(
    extractor: PageModelExtractor<DynamicRecord>,
    urls: Vec<String>,
    concurrency: Option<usize>,
) -> Result<()> {
    let mut config = PipelineConfig::from_env().context("Invalid pipeline configuration")?;
    if let Some(concurrency) = concurrency {
        config = config.with_concurrency(concurrency);
    }

    let fetcher = ReqwestFetcher::with_timeout(config.fetch_timeout)
        .context("Failed to build HTTP client")?;
    let pipeline = ExtractPipeline::new(fetcher, Arc::new(extractor), config);

    let cancel_token = CancellationToken::new();
    let ctrl_c_token = cancel_token.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("Interrupted, finishing pages in flight");
            ctrl_c_token.cancel();
        }
    });

    let output = pipeline.run(urls, cancel_token, &TracingReporter).await;
    for extracted in output.records {
        print_record(&extracted.url, extracted.record)?;
    }

    if output.stats.failed > 0 {
        anyhow::bail!("{} page(s) failed", output.stats.failed);
    }
    Ok(())
}

/// Extract from a local HTML file, treating it as the page at `urls[0]`.
fn cmd_extract_file(
    extractor: &PageModelExtractor<DynamicRecord>,
    urls: &[String],
    path: &Path,
) -> Result<()> {
    let [url] = urls else {
        anyhow::bail!("--html takes exactly one --url, got {}", urls.len());
    };
    let html = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read HTML file: {}", path.display()))?;

    let mut page = Page::new(url.as_str(), html);
    match extractor.try_apply(&mut page)? {
        None => tracing::info!(%url, "Not a target URL"),
        Some(_) if page.result_items().is_skip() => tracing::info!(%url, "Record skipped"),
        Some(record) => print_record(url, record)?,
    }
    Ok(())
}

fn print_record(url: &str, record: DynamicRecord) -> Result<()> {
    let line = serde_json::json!({
        "url": url,
        "record": record.into_json(),
    });
    println!("{}", serde_json::to_string(&line)?);
    Ok(())
}

fn cmd_check(extractor: &PageModelExtractor<DynamicRecord>) {
    println!("Model: {}", extractor.name());
    for pattern in extractor.target_urls().patterns() {
        println!("  target  {}", pattern.as_str());
    }
    if let Some(region) = extractor.target_region_selector() {
        println!("  target region  {}", region.expression());
    }
    for pattern in extractor.help_urls().patterns() {
        println!("  help    {}", pattern.as_str());
    }
    if let Some(region) = extractor.help_region_selector() {
        println!("  help region  {}", region.expression());
    }

    println!("Fields:");
    for rule in extractor.field_rules() {
        println!(
            "  {:<16} {:<5} {:<6} {}{}",
            rule.name(),
            if rule.is_multi() { "list" } else { "text" },
            format!("{:?}", rule.source()).to_lowercase(),
            rule.selector().expression(),
            if rule.is_required() { "  (required)" } else { "" },
        );
    }
}

fn cmd_match(extractor: &PageModelExtractor<DynamicRecord>, urls: &[String]) {
    for url in urls {
        println!("{}\t{}", classify(extractor, url), url);
    }
}

/// A URL matching both sets is reported as a target.
fn classify<T>(extractor: &PageModelExtractor<T>, url: &str) -> &'static str {
    if extractor.matches_target(url) {
        "target"
    } else if extractor.matches_help(url) {
        "help"
    } else {
        "none"
    }
}
