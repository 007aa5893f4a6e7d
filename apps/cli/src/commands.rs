//! CLI command definitions, routing, and tracing setup.

use std::collections::HashMap;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use clap::{Parser, Subcommand};
use color_eyre::eyre::{Result, eyre};
use docscout_crawler::{ProgressCallback, ScraperService};
use docscout_shared::{
    AppConfig, CancellationToken, ScrapeScope, ScraperError, ScraperOptions,
    ScraperProgressEvent, init_config, load_config,
};
use indicatif::{ProgressBar, ProgressStyle};
use tracing::{info, warn};

// ---------------------------------------------------------------------------
// CLI structure
// ---------------------------------------------------------------------------

/// docscout: crawl documentation sources into indexable documents.
#[derive(Parser)]
#[command(
    name = "docscout",
    version,
    about = "Crawl websites, local folders, GitHub repositories and package registries into documents.",
    long_about = None,
)]
pub(crate) struct Cli {
    /// Log format: text (default) or json.
    #[arg(long, default_value = "text", global = true)]
    pub log_format: LogFormat,

    /// Verbosity level (-v, -vv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

/// Log output format.
#[derive(Clone, Debug, clap::ValueEnum)]
pub(crate) enum LogFormat {
    Text,
    Json,
}

/// Host restriction for discovered web links.
#[derive(Clone, Copy, Debug, clap::ValueEnum)]
pub(crate) enum ScopeArg {
    Subpages,
    Hostname,
    Domain,
}

impl From<ScopeArg> for ScrapeScope {
    fn from(arg: ScopeArg) -> Self {
        match arg {
            ScopeArg::Subpages => ScrapeScope::Subpages,
            ScopeArg::Hostname => ScrapeScope::Hostname,
            ScopeArg::Domain => ScrapeScope::Domain,
        }
    }
}

#[derive(clap::Args)]
pub(crate) struct ScrapeArgs {
    /// Seed URL (http(s), file://, GitHub, npm or PyPI).
    url: String,

    /// Library name recorded on every document.
    #[arg(short, long)]
    library: String,

    /// Library version recorded on every document.
    #[arg(long = "version", visible_alias = "lib-version", default_value = "latest")]
    lib_version: String,

    /// Page budget (defaults to the config file value).
    #[arg(long)]
    max_pages: Option<usize>,

    /// Maximum link depth from the seed.
    #[arg(long)]
    max_depth: Option<usize>,

    /// Pages fetched concurrently.
    #[arg(long)]
    concurrency: Option<usize>,

    /// Glob or /regex/ a link must match (repeatable).
    #[arg(long)]
    include: Vec<String>,

    /// Glob or /regex/ that drops a link (repeatable).
    #[arg(long)]
    exclude: Vec<String>,

    /// Extra request header as "Name: value" (repeatable).
    #[arg(short = 'H', long)]
    header: Vec<String>,

    /// Host restriction for web links.
    #[arg(long, value_enum)]
    scope: Option<ScopeArg>,

    /// Follow links outside the seed path.
    #[arg(long)]
    no_subpages: bool,

    /// Abort on the first failing page instead of skipping it.
    #[arg(long)]
    fail_fast: bool,

    /// Write documents here instead of stdout.
    #[arg(short, long)]
    output: Option<PathBuf>,
}

/// Top-level CLI subcommands.
#[derive(Subcommand)]
pub(crate) enum Command {
    /// Scrape a documentation source and emit one JSON document per line.
    Scrape(ScrapeArgs),

    /// Print which source strategy would handle a URL.
    Detect {
        /// URL to classify.
        url: String,
    },

    /// Configuration management.
    Config {
        /// Config subcommand.
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// Config subcommands.
#[derive(Subcommand)]
pub(crate) enum ConfigAction {
    /// Initialize config file with defaults.
    Init,
    /// Show resolved configuration.
    Show,
}

// ---------------------------------------------------------------------------
// Tracing setup
// ---------------------------------------------------------------------------

/// Initialize tracing based on CLI flags. Logs go to stderr so stdout stays JSON lines.
fn init_tracing(cli: &Cli) {
    use tracing_subscriber::{EnvFilter, fmt};

    let filter = match cli.verbose {
        0 => "docscout=info",
        1 => "docscout=debug",
        _ => "docscout=trace",
    };

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));

    match cli.log_format {
        LogFormat::Text => {
            fmt()
                .with_env_filter(env_filter)
                .with_writer(std::io::stderr)
                .with_target(false)
                .init();
        }
        LogFormat::Json => {
            fmt()
                .json()
                .with_env_filter(env_filter)
                .with_writer(std::io::stderr)
                .init();
        }
    }
}

// ---------------------------------------------------------------------------
// Command dispatch
// ---------------------------------------------------------------------------

/// Install tracing and run the selected command.
pub(crate) async fn run(cli: Cli) -> Result<()> {
    init_tracing(&cli);
    match cli.command {
        Command::Scrape(args) => cmd_scrape(args).await,
        Command::Detect { url } => cmd_detect(&url),
        Command::Config { action } => match action {
            ConfigAction::Init => cmd_config_init(),
            ConfigAction::Show => cmd_config_show(),
        },
    }
}

fn parse_headers(raw: &[String]) -> Result<HashMap<String, String>> {
    raw.iter()
        .map(|h| {
            let (name, value) = h
                .split_once(':')
                .ok_or_else(|| eyre!("invalid header '{h}': expected \"Name: value\""))?;
            let name = name.trim();
            if name.is_empty() {
                return Err(eyre!("invalid header '{h}': empty name"));
            }
            Ok((name.to_string(), value.trim().to_string()))
        })
        .collect()
}

fn build_options(args: &ScrapeArgs, config: &AppConfig) -> Result<ScraperOptions> {
    let mut options =
        ScraperOptions::from_config(&args.url, &args.library, &args.lib_version, config);
    if let Some(n) = args.max_pages {
        options.max_pages = n;
    }
    if let Some(n) = args.max_depth {
        options.max_depth = n;
    }
    if let Some(n) = args.concurrency {
        options.max_concurrency = n.max(1);
    }
    if let Some(scope) = args.scope {
        options.scope = scope.into();
    }
    options.subpages_only = !args.no_subpages;
    options.ignore_errors = !args.fail_fast;
    options.include_patterns = args.include.clone();
    options.exclude_patterns = args.exclude.clone();
    options.headers = parse_headers(&args.header)?;
    Ok(options)
}

async fn cmd_scrape(args: ScrapeArgs) -> Result<()> {
    let config = Arc::new(load_config()?);
    let options = build_options(&args, &config)?;

    let sink: Box<dyn Write + Send> = match &args.output {
        Some(path) => Box::new(File::create(path).map_err(|e| ScraperError::io(path, e))?),
        None => Box::new(std::io::stdout()),
    };

    let signal = CancellationToken::new();
    let on_interrupt = signal.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("interrupt received, stopping after in-flight pages");
            on_interrupt.cancel();
        }
    });

    info!(url = %options.url, library = %options.library, "scraping");
    let started = Instant::now();
    let reporter = CliProgress::new(sink)?;
    let service = ScraperService::from_config(config);
    let outcome = service.scrape(&options, &reporter, Some(signal.clone())).await;
    let summary = reporter.finish()?;
    outcome?;

    eprintln!();
    eprintln!("  Pages:     {}", summary.pages);
    eprintln!("  Documents: {}", summary.documents);
    if let Some(path) = &args.output {
        eprintln!("  Output:    {}", path.display());
    }
    if signal.is_cancelled() {
        eprintln!("  Stopped:   interrupted");
    }
    eprintln!("  Time:      {:.1}s", started.elapsed().as_secs_f64());
    eprintln!();

    Ok(())
}

fn cmd_detect(url: &str) -> Result<()> {
    let config = Arc::new(load_config()?);
    let service = ScraperService::from_config(config);
    match service.registry().detect(url) {
        Some(kind) => {
            println!("{kind}");
            Ok(())
        }
        None => Err(ScraperError::NoStrategy { url: url.into() }.into()),
    }
}

fn cmd_config_init() -> Result<()> {
    let path = init_config()?;
    println!("Config initialized at: {}", path.display());
    Ok(())
}

fn cmd_config_show() -> Result<()> {
    let config: AppConfig = load_config()?;
    let toml_str = toml::to_string_pretty(&config)?;
    println!("{toml_str}");
    Ok(())
}

// ---------------------------------------------------------------------------
// CLI progress reporter
// ---------------------------------------------------------------------------

struct Summary {
    pages: usize,
    documents: usize,
}

/// Spinner on stderr plus a JSON-lines document writer.
struct CliProgress {
    spinner: ProgressBar,
    out: Mutex<BufWriter<Box<dyn Write + Send>>>,
    summary: Mutex<Summary>,
}

impl CliProgress {
    fn new(sink: Box<dyn Write + Send>) -> Result<Self> {
        let spinner = ProgressBar::new_spinner();
        spinner.set_style(
            ProgressStyle::with_template("{spinner:.cyan} {msg}")
                .map_err(|e| eyre!("invalid progress template: {e}"))?
                .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"]),
        );
        spinner.enable_steady_tick(Duration::from_millis(80));
        Ok(Self {
            spinner,
            out: Mutex::new(BufWriter::new(sink)),
            summary: Mutex::new(Summary {
                pages: 0,
                documents: 0,
            }),
        })
    }

    fn finish(self) -> Result<Summary> {
        self.spinner.finish_and_clear();
        let mut out = self
            .out
            .into_inner()
            .map_err(|_| eyre!("output writer poisoned"))?;
        out.flush()?;
        self.summary
            .into_inner()
            .map_err(|_| eyre!("progress summary poisoned"))
    }

    fn write_document(&self, event: &ScraperProgressEvent) -> std::result::Result<(), ScraperError> {
        let Some(document) = &event.document else {
            return Ok(());
        };
        let line =
            serde_json::to_string(document).map_err(|e| ScraperError::Callback(e.to_string()))?;
        let mut out = self
            .out
            .lock()
            .map_err(|_| ScraperError::Callback("output writer poisoned".into()))?;
        writeln!(out, "{line}").map_err(|e| ScraperError::Callback(e.to_string()))
    }
}

#[async_trait]
impl ProgressCallback for CliProgress {
    async fn on_progress(&self, event: ScraperProgressEvent) -> docscout_shared::Result<()> {
        self.write_document(&event)?;

        if let Ok(mut summary) = self.summary.lock() {
            summary.pages = event.pages_scraped;
            if event.document.is_some() {
                summary.documents += 1;
            }
        }

        self.spinner.set_message(format!(
            "[{}/{}] depth {}/{} {}",
            event.pages_scraped,
            event.total_pages,
            event.depth,
            event.max_depth,
            event.current_url
        ));
        Ok(())
    }
}
