//! Twinset indexer main entry point
//!
//! This is the command-line interface for crawling the Twinset sites into a
//! SKU index and matching article lists against it.

use anyhow::Context;
use clap::{ArgGroup, Args, Parser, Subcommand};
use std::fs::{self, OpenOptions};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Mutex;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;
use twinset_indexer::config::{load_config, validate, Config, ALL_SITES};
use twinset_indexer::crawler::run_crawl;
use twinset_indexer::output::{
    match_articles, write_match_report, ArticleSource, DEFAULT_ARTICLE_COLUMN, DEFAULT_PART_COLUMN,
};
use twinset_indexer::product::text::safe_error;
use twinset_indexer::storage::open_storage;

/// Exit status after Ctrl-C
const EXIT_INTERRUPTED: u8 = 130;

/// Twinset indexer: resumable sitemap crawler and SKU matcher
///
/// `crawl` walks the sites' sitemaps and category pages into a SQLite SKU
/// index; `match` looks a list of articles up in that index.
#[derive(Parser, Debug)]
#[command(name = "twinset-indexer")]
#[command(version)]
#[command(about = "Twinset full-site SKU indexer", long_about = None)]
struct Cli {
    /// Optional TOML configuration file; flags override its values
    #[arg(long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Mirror the log to the console and lower the log level to debug
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Crawl sitemaps and pages into the SKU index, then export CSVs
    Crawl(CrawlArgs),
    /// Match an article list against the SKU index
    Match(MatchArgs),
}

#[derive(Args, Debug)]
struct CrawlArgs {
    /// Site key to crawl, or "both"
    #[arg(long, default_value = ALL_SITES)]
    site: String,

    #[arg(long)]
    db_path: Option<String>,

    #[arg(long)]
    log_path: Option<String>,

    #[arg(long)]
    export_dir: Option<String>,

    /// Limit processed sitemaps (for smoke tests)
    #[arg(long)]
    max_sitemaps: Option<u64>,

    /// Limit processed pages (for smoke tests)
    #[arg(long)]
    max_pages: Option<u64>,

    /// Category discovery depth
    #[arg(long)]
    max_depth: Option<u32>,

    /// Disable link discovery from pages
    #[arg(long)]
    no_discover_links: bool,

    /// Requeue error/blocked URLs before crawling
    #[arg(long)]
    retry_errors: bool,

    /// Request timeout in seconds
    #[arg(long)]
    timeout: Option<f64>,

    /// Attempts per request on network errors
    #[arg(long)]
    retries: Option<u32>,

    #[arg(long)]
    delay_min: Option<f64>,

    #[arg(long)]
    delay_max: Option<f64>,

    #[arg(long)]
    user_agent: Option<String>,

    /// Raw Cookie header
    #[arg(long)]
    cookie_header: Option<String>,

    /// Netscape cookies.txt path
    #[arg(long)]
    cookie_file: Option<String>,
}

impl CrawlArgs {
    fn apply(&self, config: &mut Config) {
        let crawl = &mut config.crawl;
        if let Some(v) = self.max_sitemaps {
            crawl.max_sitemaps = Some(v);
        }
        if let Some(v) = self.max_pages {
            crawl.max_pages = Some(v);
        }
        if let Some(v) = self.max_depth {
            crawl.max_depth = v;
        }
        if self.no_discover_links {
            crawl.discover_links = false;
        }
        if self.retry_errors {
            crawl.retry_errors = true;
        }
        if let Some(v) = self.delay_min {
            crawl.delay_min = v;
        }
        if let Some(v) = self.delay_max {
            crawl.delay_max = v;
        }

        let http = &mut config.http;
        if let Some(v) = self.timeout {
            http.timeout = v;
        }
        if let Some(v) = self.retries {
            http.retries = v;
        }
        if let Some(v) = &self.user_agent {
            http.user_agent = v.clone();
        }
        if let Some(v) = &self.cookie_header {
            http.cookie_header = Some(v.clone());
        }
        if let Some(v) = &self.cookie_file {
            http.cookie_file = Some(v.clone());
        }

        let output = &mut config.output;
        if let Some(v) = &self.db_path {
            output.db_path = v.clone();
        }
        if let Some(v) = &self.log_path {
            output.log_path = v.clone();
        }
        if let Some(v) = &self.export_dir {
            output.export_dir = v.clone();
        }
    }
}

#[derive(Args, Debug)]
#[command(group(
    ArgGroup::new("source")
        .required(true)
        .args(["articles_csv", "spreadsheet", "articles"])
))]
struct MatchArgs {
    #[arg(long)]
    db_path: Option<String>,

    #[arg(long)]
    log_path: Option<String>,

    /// Directory for the match report
    #[arg(long)]
    export_dir: Option<String>,

    /// CSV file with one article per row
    #[arg(long)]
    articles_csv: Option<PathBuf>,

    /// Column of --articles-csv to read (first column if absent)
    #[arg(long, default_value = DEFAULT_ARTICLE_COLUMN)]
    article_column: String,

    /// Spreadsheet (xlsx, xls, ods) with a part-number column
    #[arg(long, visible_alias = "xlsx")]
    spreadsheet: Option<PathBuf>,

    /// Worksheet of --spreadsheet (first sheet if omitted)
    #[arg(long)]
    sheet: Option<String>,

    #[arg(long, default_value = DEFAULT_PART_COLUMN)]
    part_column: String,

    /// Comma-separated articles
    #[arg(long)]
    articles: Option<String>,
}

impl MatchArgs {
    fn apply(&self, config: &mut Config) {
        let output = &mut config.output;
        if let Some(v) = &self.db_path {
            output.db_path = v.clone();
        }
        if let Some(v) = &self.log_path {
            output.log_path = v.clone();
        }
        if let Some(v) = &self.export_dir {
            output.match_dir = v.clone();
        }
    }

    fn source(&self) -> Option<ArticleSource> {
        if let Some(path) = &self.articles_csv {
            return Some(ArticleSource::Csv {
                path: path.clone(),
                column: self.article_column.clone(),
            });
        }
        if let Some(path) = &self.spreadsheet {
            return Some(ArticleSource::Spreadsheet {
                path: path.clone(),
                sheet: self.sheet.clone(),
                part_column: self.part_column.clone(),
            });
        }
        self.articles.clone().map(ArticleSource::Inline)
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let result = tokio::select! {
        result = run(cli) => result,
        _ = tokio::signal::ctrl_c() => {
            tracing::warn!("interrupted");
            eprintln!("Interrupted");
            return ExitCode::from(EXIT_INTERRUPTED);
        }
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("fatal: {:#}", e);
            eprintln!("Fatal: {}", safe_error(&format!("{:#}", e)));
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let mut config = match &cli.config {
        Some(path) => load_config(path)
            .with_context(|| format!("loading configuration from {}", path.display()))?,
        None => Config::default(),
    };

    match cli.command {
        Command::Crawl(args) => {
            args.apply(&mut config);
            validate(&config)?;
            setup_logging(Path::new(&config.output.log_path), cli.verbose)?;

            let sites = config.resolve_sites(&args.site)?;
            tracing::info!(
                "crawl start: site={} db={}",
                args.site,
                config.output.db_path
            );
            let summary = run_crawl(&config, &sites, &args.site).await?;
            println!("{}", serde_json::to_string_pretty(&summary)?);
        }
        Command::Match(args) => {
            args.apply(&mut config);
            validate(&config)?;
            setup_logging(Path::new(&config.output.log_path), cli.verbose)?;

            let source = args
                .source()
                .context("Provide one source: --articles-csv, --spreadsheet or --articles")?;
            let articles = source.load()?;
            tracing::info!("match articles count: {}", articles.len());

            let storage = open_storage(Path::new(&config.output.db_path))?;
            let report = match_articles(&storage, &articles)?;
            let outputs = write_match_report(&report, Path::new(&config.output.match_dir))?;
            tracing::info!("match outputs: {}", serde_json::to_string(&outputs)?);
            println!("{}", serde_json::to_string_pretty(&outputs)?);
        }
    }

    Ok(())
}

/// Sets up the tracing subscriber
///
/// Every event is appended to the log file; with `verbose` it is also
/// mirrored to stderr. `RUST_LOG` overrides the default filter.
fn setup_logging(log_path: &Path, verbose: bool) -> anyhow::Result<()> {
    if let Some(parent) = log_path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(log_path)
        .with_context(|| format!("opening log file {}", log_path.display()))?;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        if verbose {
            EnvFilter::new("twinset_indexer=debug,info")
        } else {
            EnvFilter::new("twinset_indexer=info,warn")
        }
    });

    let file_layer = tracing_subscriber::fmt::layer()
        .with_writer(Mutex::new(file))
        .with_ansi(false)
        .with_target(false);

    let console_layer = verbose.then(|| {
        tracing_subscriber::fmt::layer()
            .with_writer(std::io::stderr)
            .with_target(false)
    });

    tracing_subscriber::registry()
        .with(filter)
        .with(file_layer)
        .with(console_layer)
        .try_init()?;

    Ok(())
}
