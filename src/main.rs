use std::io::Read;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::{Parser, Subcommand};
use miette::{IntoDiagnostic, Result};
use tracing_subscriber::EnvFilter;

use litreview_core::{
    InvocationPayload, LitReviewConfig, OutputFormat, ReviewOutcome, ReviewRequest,
};
use litreview_review::llm::LlmClient;
use litreview_review::pipeline::{ReviewGenerator, NO_ARTICLES_MESSAGE};
use litreview_store::{FsBlobStore, SqliteArticleStore};

const DEFAULT_CONFIG_PATH: &str = ".litreview.toml";

const DEFAULT_CONFIG: &str = r#"# litreview configuration

[storage]
# Directory holding article texts and generated reviews (LITREVIEW_BUCKET)
bucket = "bucket"
# Article table name (LITREVIEW_TABLE)
table = "articles"
# SQLite database holding the article table (LITREVIEW_DATABASE)
database = ".litreview/articles.db"
# Key prefix for stored reviews (LITREVIEW_REVIEW_PREFIX)
review_prefix = "reviews"
# Records read per page when selecting recent articles
scan_page_size = 100

[llm]
# Model name (OPENAI_MODEL)
model = "gpt-4o-mini"
# API key; prefer the OPENAI_API_KEY env var
# api_key = "sk-..."
# OpenAI-compatible endpoint (OPENAI_BASE_URL)
# base_url = "https://api.openai.com"
# Sampling temperature (OPENAI_TEMPERATURE)
temperature = 0.3

[review]
# Articles per review when the request has no limit (LITREVIEW_MAX_ARTICLES)
max_articles = 5
"#;

#[derive(Parser)]
#[command(
    name = "litreview",
    version,
    about = "Generate a short literature review from ingested research articles",
    long_about = "Generate a short literature review from ingested research articles.\n\n\
                   Selects articles from the article table, loads their text from the bucket,\n\
                   asks an OpenAI-compatible model for a review, and stores the result as a\n\
                   JSON artifact under a date-partitioned key.\n\n\
                   Examples:\n  \
                     litreview init                          Write a default .litreview.toml\n  \
                     litreview generate                      Review the most recent articles\n  \
                     litreview generate --paper-id a --paper-id b\n  \
                     echo '{\"limit\": 3}' | litreview generate --event -\n  \
                     litreview prompt --limit 2             Show the prompt without calling the model"
)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Path to configuration file (default: .litreview.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Output format: text or json (default: json for generate, text for prompt)
    #[arg(long, global = true)]
    format: Option<OutputFormat>,

    /// Enable verbose logging
    #[arg(long, short, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Command {
    /// Generate and store a literature review
    #[command(long_about = "Generate and store a literature review.\n\n\
        Without --paper-id, the most recent articles are used. The result is printed\n\
        as {\"ok\": ..., ...}; a request that resolves no article prints ok=false and\n\
        exits successfully.\n\n\
        Examples:\n  litreview generate --limit 3\n  litreview generate --event payload.json")]
    Generate {
        /// Article identifier to include (repeatable)
        #[arg(long = "paper-id")]
        paper_ids: Vec<String>,

        /// Maximum number of articles (default: review.max_articles)
        #[arg(long)]
        limit: Option<usize>,

        /// Read the invocation payload from a JSON file ('-' for stdin)
        #[arg(long, conflicts_with_all = ["paper_ids", "limit"])]
        event: Option<PathBuf>,
    },
    /// Print the prompt a review would use, without calling the model
    Prompt {
        /// Article identifier to include (repeatable)
        #[arg(long = "paper-id")]
        paper_ids: Vec<String>,

        /// Maximum number of articles (default: review.max_articles)
        #[arg(long)]
        limit: Option<usize>,
    },
    /// Create a default .litreview.toml in the current directory
    Init,
}

fn load_config(path: Option<&Path>) -> Result<LitReviewConfig> {
    let mut config = match path {
        Some(path) => LitReviewConfig::from_file(path).into_diagnostic()?,
        None => {
            let default_path = Path::new(DEFAULT_CONFIG_PATH);
            if default_path.exists() {
                LitReviewConfig::from_file(default_path).into_diagnostic()?
            } else {
                LitReviewConfig::default()
            }
        }
    };
    config.apply_env().into_diagnostic()?;
    config.validate().into_diagnostic()?;
    Ok(config)
}

fn build_pipeline(config: &LitReviewConfig) -> Result<ReviewGenerator> {
    let table = config.storage.table().into_diagnostic()?;
    let articles =
        SqliteArticleStore::open(&config.storage.database, table).into_diagnostic()?;
    let bucket = FsBlobStore::new(config.storage.bucket().into_diagnostic()?);
    let llm = LlmClient::new(&config.llm).into_diagnostic()?;
    Ok(ReviewGenerator::new(
        Arc::new(articles),
        Arc::new(bucket),
        Arc::new(llm),
        &config.storage,
    ))
}

fn read_payload(event: &Path) -> Result<InvocationPayload> {
    let input = if event == Path::new("-") {
        let mut buf = String::new();
        std::io::stdin()
            .read_to_string(&mut buf)
            .into_diagnostic()?;
        buf
    } else {
        std::fs::read_to_string(event).into_diagnostic()?
    };
    InvocationPayload::from_json(&input).into_diagnostic()
}

fn flag_payload(paper_ids: Vec<String>, limit: Option<usize>) -> InvocationPayload {
    InvocationPayload {
        paper_ids: Some(paper_ids),
        limit: limit.map(|l| l as u64),
    }
}

fn print_outcome(outcome: &ReviewOutcome, format: OutputFormat) -> Result<()> {
    match (format, outcome) {
        (OutputFormat::Json, _) => {
            println!(
                "{}",
                serde_json::to_string_pretty(outcome).into_diagnostic()?
            );
        }
        (_, ReviewOutcome::Failure { message }) => {
            eprintln!("{message}");
        }
        (OutputFormat::Text, ReviewOutcome::Success { review, .. }) => {
            println!("{review}");
        }
    }
    Ok(())
}

fn print_prompt(prompt: Option<String>, format: OutputFormat) -> Result<()> {
    match (format, prompt) {
        (OutputFormat::Json, Some(prompt)) => {
            let value = serde_json::json!({ "ok": true, "prompt": prompt });
            println!("{}", serde_json::to_string_pretty(&value).into_diagnostic()?);
        }
        (OutputFormat::Json, None) => {
            let outcome = ReviewOutcome::Failure {
                message: NO_ARTICLES_MESSAGE.to_string(),
            };
            println!("{}", serde_json::to_string_pretty(&outcome).into_diagnostic()?);
        }
        (OutputFormat::Text, Some(prompt)) => println!("{prompt}"),
        (OutputFormat::Text, None) => eprintln!("{NO_ARTICLES_MESSAGE}"),
    }
    Ok(())
}

fn init_tracing(verbose: bool) {
    let default_level = if verbose { "debug" } else { "warn" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    miette::set_hook(Box::new(|_| {
        Box::new(
            miette::MietteHandlerOpts::new()
                .terminal_links(true)
                .build(),
        )
    }))
    .expect("miette handler");
    human_panic::setup_panic!();

    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match cli.command {
        Command::Generate {
            paper_ids,
            limit,
            event,
        } => {
            let config = load_config(cli.config.as_deref())?;
            if config.llm.require_api_key().is_err() {
                miette::bail!(miette::miette!(
                    help = "Set OPENAI_API_KEY or add api_key in your .litreview.toml under [llm]",
                    "No API key configured for model '{}'",
                    config.llm.model
                ));
            }

            let payload = match event {
                Some(path) => read_payload(&path)?,
                None => flag_payload(paper_ids, limit),
            };
            let request = ReviewRequest::from_payload(payload, config.review.max_articles);
            tracing::debug!(
                requested = request.paper_ids.len(),
                limit = request.limit,
                "generating review"
            );

            let pipeline = build_pipeline(&config)?;
            let outcome = pipeline.run(&request).await.into_diagnostic()?;
            print_outcome(&outcome, cli.format.unwrap_or(OutputFormat::Json))?;
        }
        Command::Prompt { paper_ids, limit } => {
            let config = load_config(cli.config.as_deref())?;
            let request = ReviewRequest::from_payload(
                flag_payload(paper_ids, limit),
                config.review.max_articles,
            );
            let pipeline = build_pipeline(&config)?;
            let prompt = pipeline.preview(&request).await.into_diagnostic()?;
            print_prompt(prompt, cli.format.unwrap_or(OutputFormat::Text))?;
        }
        Command::Init => {
            let path = Path::new(DEFAULT_CONFIG_PATH);
            if path.exists() {
                miette::bail!("{} already exists", DEFAULT_CONFIG_PATH);
            }
            std::fs::write(path, DEFAULT_CONFIG).into_diagnostic()?;
            println!("Created {DEFAULT_CONFIG_PATH} with default configuration");
        }
    }

    Ok(())
}
