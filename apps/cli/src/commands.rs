//! CLI command definitions, routing, and tracing setup.

use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use color_eyre::eyre::{Result, eyre};
use indicatif::{ProgressBar, ProgressStyle};
use tracing::info;

use trendbot_core::{ProgressReporter, RunOutcome, build_pipeline};
use trendbot_publisher::NotionPublisher;
use trendbot_shared::{
    AppConfig, NotionConfig, PublishTarget, RunMode, config_file_path, init_config_at,
    load_config, load_config_from,
};
use trendbot_storage::Storage;

// ---------------------------------------------------------------------------
// CLI structure
// ---------------------------------------------------------------------------

/// TrendBot: trending tech news, summarized and published.
#[derive(Parser)]
#[command(
    name = "trendbot",
    version,
    about = "Fetch trending tech articles, summarize them with an LLM, and publish the summaries.",
    long_about = None,
)]
pub(crate) struct Cli {
    /// Log format: text (default) or json.
    #[arg(long, default_value = "text", global = true)]
    pub log_format: LogFormat,

    /// Verbosity level (-v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Config file to use instead of ~/.trendbot/trendbot.toml.
    #[arg(long, global = true, env = "TRENDBOT_CONFIG")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

/// Log output format.
#[derive(Clone, Debug, clap::ValueEnum)]
pub(crate) enum LogFormat {
    Text,
    Json,
}

#[derive(Clone, Copy, Debug, clap::ValueEnum)]
pub(crate) enum ModeArg {
    /// Thread the first article of the primary feed through one context.
    Context,
    /// Fetch every source, then analyze and publish each article.
    Batch,
}

impl From<ModeArg> for RunMode {
    fn from(mode: ModeArg) -> Self {
        match mode {
            ModeArg::Context => RunMode::Context,
            ModeArg::Batch => RunMode::Batch,
        }
    }
}

#[derive(Clone, Copy, Debug, clap::ValueEnum)]
pub(crate) enum TargetArg {
    Notion,
    Table,
}

impl From<TargetArg> for PublishTarget {
    fn from(target: TargetArg) -> Self {
        match target {
            TargetArg::Notion => PublishTarget::Notion,
            TargetArg::Table => PublishTarget::Table,
        }
    }
}

/// Top-level CLI subcommands.
#[derive(Subcommand)]
pub(crate) enum Command {
    /// Run the pipeline once.
    Run {
        /// Orchestration mode. Defaults to `[defaults].mode`.
        #[arg(short, long)]
        mode: Option<ModeArg>,

        /// Where to publish. Defaults to `[defaults].publisher`.
        #[arg(short, long)]
        publisher: Option<TargetArg>,

        /// Print the outcome as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Verify the Notion credentials by retrieving the target database.
    Check,

    /// List rows of the local articles table.
    Articles {
        /// Maximum rows to show, newest first.
        #[arg(short, long, default_value = "20")]
        limit: u32,

        /// Print rows as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Configuration management.
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// Config subcommands.
#[derive(Subcommand)]
pub(crate) enum ConfigAction {
    /// Write a config file with defaults.
    Init {
        /// Overwrite an existing file.
        #[arg(long)]
        force: bool,
    },
    /// Show resolved configuration.
    Show,
}

// ---------------------------------------------------------------------------
// Tracing setup
// ---------------------------------------------------------------------------

/// Initialize tracing based on CLI flags. `RUST_LOG` wins when set.
pub(crate) fn init_tracing(cli: &Cli) {
    use tracing_subscriber::{EnvFilter, fmt};

    let filter = match cli.verbose {
        0 => "trendbot=info",
        1 => "trendbot=debug",
        _ => "trendbot=trace",
    };

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));

    match cli.log_format {
        LogFormat::Text => {
            fmt()
                .with_env_filter(env_filter)
                .with_target(false)
                .with_writer(std::io::stderr)
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

/// Run the CLI command.
pub(crate) async fn run(cli: Cli) -> Result<()> {
    let config_path = cli.config.as_deref();
    match cli.command {
        Command::Run {
            mode,
            publisher,
            json,
        } => cmd_run(config_path, mode, publisher, json).await,
        Command::Check => cmd_check(config_path).await,
        Command::Articles { limit, json } => cmd_articles(config_path, limit, json).await,
        Command::Config { action } => match action {
            ConfigAction::Init { force } => cmd_config_init(config_path, force),
            ConfigAction::Show => cmd_config_show(config_path),
        },
    }
}

fn load(config_path: Option<&Path>) -> Result<AppConfig> {
    Ok(match config_path {
        Some(path) => load_config_from(path)?,
        None => load_config()?,
    })
}

// ---------------------------------------------------------------------------
// Command handlers
// ---------------------------------------------------------------------------

async fn cmd_run(
    config_path: Option<&Path>,
    mode: Option<ModeArg>,
    publisher: Option<TargetArg>,
    json: bool,
) -> Result<()> {
    let config = load(config_path)?;
    let mode = mode.map(RunMode::from).unwrap_or(config.defaults.mode);
    let target = publisher
        .map(PublishTarget::from)
        .unwrap_or(config.defaults.publisher);

    info!(?mode, ?target, "starting run");
    let pipeline = build_pipeline(&config, target).await?;

    let reporter = CliProgress::new();
    let outcome = match pipeline.run(mode, &reporter).await {
        Ok(outcome) => outcome,
        Err(e) => {
            reporter.fail();
            return Err(e.into());
        }
    };

    if json {
        let value = match &outcome {
            RunOutcome::Log(entries) => serde_json::to_value(entries)?,
            RunOutcome::Batch(report) => serde_json::to_value(report)?,
        };
        println!("{}", serde_json::to_string_pretty(&value)?);
        return Ok(());
    }

    match &outcome {
        RunOutcome::Log(_) => {
            println!();
            println!("  Run log:");
            print!("{outcome}");
            println!();
        }
        RunOutcome::Batch(report) => {
            println!();
            println!("  Batch complete: {report}");
            for source in &report.sources {
                if let Some(err) = &source.fetch_error {
                    println!("  {}: {err}", source.source);
                }
            }
            println!();
        }
    }
    Ok(())
}

async fn cmd_check(config_path: Option<&Path>) -> Result<()> {
    let config = load(config_path)?;
    let notion = NotionConfig::from_app(&config)?;
    let publisher = NotionPublisher::new(&notion)?;

    let info = publisher.check_connection().await?;
    println!("Notion connection OK");
    println!("  Database: {}", info.id);
    if !info.title.is_empty() {
        println!("  Title:    {}", info.title);
    }
    Ok(())
}

async fn cmd_articles(config_path: Option<&Path>, limit: u32, json: bool) -> Result<()> {
    let config = load(config_path)?;
    let path = config.storage.resolved_path()?;
    let storage = Storage::open_readonly(&path).await?;
    let rows = storage.list_articles(limit).await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&rows)?);
        return Ok(());
    }

    if rows.is_empty() {
        println!("No articles stored in {}", path.display());
        return Ok(());
    }

    for row in &rows {
        println!(
            "{}  [{}] {}",
            row.fetched_at.format("%Y-%m-%d %H:%M"),
            row.source,
            row.title
        );
        println!("    {}", row.source_url);
        if let Some(summary) = &row.summary {
            println!("    {summary}");
        }
    }
    println!();
    println!("{} of {} articles", rows.len(), storage.count_articles().await?);
    Ok(())
}

fn cmd_config_init(config_path: Option<&Path>, force: bool) -> Result<()> {
    let path = match config_path {
        Some(p) => p.to_path_buf(),
        None => config_file_path()?,
    };
    if path.exists() && !force {
        return Err(eyre!(
            "config already exists at {} (use --force to overwrite)",
            path.display()
        ));
    }
    init_config_at(&path)?;
    println!("Config initialized at: {}", path.display());
    Ok(())
}

fn cmd_config_show(config_path: Option<&Path>) -> Result<()> {
    let config = load(config_path)?;
    println!("{}", toml::to_string_pretty(&config)?);

    println!("# Environment");
    for var in [
        &config.agent.api_key_env,
        &config.notion.api_key_env,
        &config.notion.database_id_env,
    ] {
        let status = match std::env::var(var) {
            Ok(v) if !v.trim().is_empty() => "set",
            _ => "not set",
        };
        println!("# {var}: {status}");
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// CLI progress reporter
// ---------------------------------------------------------------------------

/// CLI progress reporter using an indicatif spinner.
struct CliProgress {
    spinner: ProgressBar,
}

impl CliProgress {
    fn new() -> Self {
        let spinner = ProgressBar::new_spinner();
        if let Ok(style) = ProgressStyle::with_template("{spinner:.cyan} {msg}") {
            spinner.set_style(
                style.tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"]),
            );
        }
        spinner.enable_steady_tick(std::time::Duration::from_millis(80));
        Self { spinner }
    }

    fn fail(&self) {
        self.spinner.abandon_with_message("run failed");
    }
}

impl ProgressReporter for CliProgress {
    fn phase(&self, name: &str) {
        self.spinner.set_message(name.to_string());
    }

    fn article(&self, title: &str, current: usize, total: usize) {
        self.spinner
            .set_message(format!("Processing [{current}/{total}] {title}"));
    }

    fn done(&self, _outcome: &RunOutcome) {
        self.spinner.finish_and_clear();
    }
}
