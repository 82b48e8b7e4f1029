//! CLI command definitions, routing, and tracing setup.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use color_eyre::eyre::{Result, eyre};
use indicatif::{ProgressBar, ProgressStyle};
use postsync_core::fleet::{CommandRunner, SweepProgress};
use postsync_core::ingest::ProgressReporter;
use postsync_shared::{AppConfig, FleetConfig, SyncConfig, init_config, load_config};
use postsync_store::PostStore;
use tracing::info;

// ---------------------------------------------------------------------------
// CLI structure
// ---------------------------------------------------------------------------

/// postsync — sync web-feed posts into a local markdown archive.
#[derive(Parser)]
#[command(
    name = "postsync",
    version,
    about = "Sync web-feed posts into per-owner markdown archives, singly or fleet-wide.",
    long_about = None,
)]
pub(crate) struct Cli {
    /// Log format: text (default) or json.
    #[arg(long, default_value = "text", global = true)]
    pub log_format: LogFormat,

    /// Verbosity level (-v, -vv, -vvv).
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

/// Top-level CLI subcommands.
#[derive(Subcommand)]
pub(crate) enum Command {
    /// Sync one owner's posts from their configured feeds.
    Sync {
        /// Owner repository directory (holds owner.json, posts/, metadata/).
        #[arg(long, default_value = ".")]
        dir: PathBuf,

        /// Skip the archive supplement pass regardless of strategy.
        #[arg(long)]
        no_supplement: bool,
    },

    /// Run ingestion across every target under a directory, with retries.
    Fleet {
        /// Directory whose subdirectories are sync targets.
        #[arg(long, default_value = ".")]
        targets: PathBuf,

        /// Seconds to pause between target invocations.
        #[arg(long)]
        delay: Option<u64>,

        /// Total rounds (first pass plus retries over failures).
        #[arg(long)]
        rounds: Option<u32>,

        /// Failure manifest path (defaults to failed-syncs.txt beside the targets).
        #[arg(long)]
        manifest: Option<PathBuf>,
    },

    /// Verify that posts and metadata files pair up in an owner directory.
    Check {
        /// Owner repository directory.
        #[arg(long, default_value = ".")]
        dir: PathBuf,
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

/// Initialize tracing based on CLI flags.
pub(crate) fn init_tracing(cli: &Cli) {
    use tracing_subscriber::{EnvFilter, fmt};

    let filter = match cli.verbose {
        0 => "postsync=info",
        1 => "postsync=debug",
        _ => "postsync=trace",
    };

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));

    match cli.log_format {
        LogFormat::Text => {
            fmt()
                .with_env_filter(env_filter)
                .with_target(false)
                .init();
        }
        LogFormat::Json => {
            fmt().json().with_env_filter(env_filter).init();
        }
    }
}

// ---------------------------------------------------------------------------
// Command dispatch
// ---------------------------------------------------------------------------

/// Run the CLI command.
pub(crate) async fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Command::Sync { dir, no_supplement } => cmd_sync(dir, no_supplement).await,
        Command::Fleet {
            targets,
            delay,
            rounds,
            manifest,
        } => cmd_fleet(targets, delay, rounds, manifest).await,
        Command::Check { dir } => cmd_check(dir).await,
        Command::Config { action } => match action {
            ConfigAction::Init => cmd_config_init().await,
            ConfigAction::Show => cmd_config_show().await,
        },
    }
}

async fn cmd_sync(dir: PathBuf, no_supplement: bool) -> Result<()> {
    let config = load_config()?;

    let mut sync_config = SyncConfig::from(&config);
    sync_config.owner_dir = dir;
    if no_supplement {
        sync_config.supplement = false;
    }

    info!(dir = %sync_config.owner_dir.display(), "syncing owner");

    let reporter = CliProgress::new();
    let report = postsync_core::ingest::sync_owner(&sync_config, &reporter).await?;
    reporter.finish();

    println!();
    println!("  Sync complete.");
    println!("  New posts:   {}", report.new_posts);
    println!("  Skipped:     {}", report.skipped);
    println!("  Supplements: {}", report.supplement_posts);
    if report.feed_errors > 0 {
        println!("  Feed errors: {}", report.feed_errors);
    }
    println!();

    Ok(())
}

async fn cmd_fleet(
    targets: PathBuf,
    delay: Option<u64>,
    rounds: Option<u32>,
    manifest: Option<PathBuf>,
) -> Result<()> {
    let config = load_config()?;

    if !targets.is_dir() {
        return Err(eyre!("'{}' is not a directory", targets.display()));
    }

    let mut fleet_config = FleetConfig::from(&config);
    fleet_config.manifest_path = targets.join(&config.fleet.manifest);
    fleet_config.targets_dir = targets;
    if let Some(delay) = delay {
        fleet_config.delay_secs = delay;
    }
    if let Some(rounds) = rounds {
        fleet_config.rounds = rounds.max(1);
    }
    if let Some(manifest) = manifest {
        fleet_config.manifest_path = manifest;
    }

    let runner = CommandRunner::new(&fleet_config.runner, &fleet_config.entry_point);
    let reporter = CliProgress::new();
    let report = postsync_core::fleet::run_sweep(&fleet_config, &runner, &reporter).await?;
    reporter.finish();

    println!();
    println!("  Fleet sweep complete.");
    println!("  Succeeded: {}", report.succeeded.len());
    println!("  Failed:    {}", report.failed.len());
    println!("  Rounds:    {}", report.rounds_run);
    for (name, error) in &report.failed {
        println!("    {name}: {error}");
    }
    if !report.failed.is_empty() {
        println!(
            "  Failure manifest: {}",
            fleet_config.manifest_path.display()
        );
    }
    println!();

    // Residual failures are recorded, not fatal.
    Ok(())
}

async fn cmd_check(dir: PathBuf) -> Result<()> {
    let config = load_config()?;

    let store = PostStore::new(&dir, &config.defaults.posts_dir, &config.defaults.metadata_dir);
    let report = store.verify()?;

    println!();
    println!("  Paired posts: {}", report.paired);
    for key in &report.missing_metadata {
        println!("  Missing metadata: {key}");
    }
    for key in &report.missing_posts {
        println!("  Missing post: {key}");
    }
    println!();

    if !report.is_clean() {
        return Err(eyre!(
            "store is inconsistent: {} unmatched entries",
            report.missing_metadata.len() + report.missing_posts.len()
        ));
    }

    Ok(())
}

async fn cmd_config_init() -> Result<()> {
    let path = init_config()?;
    println!("Config initialized at: {}", path.display());
    Ok(())
}

async fn cmd_config_show() -> Result<()> {
    let config: AppConfig = load_config()?;
    let toml_str = toml::to_string_pretty(&config)?;
    println!("{toml_str}");
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
        spinner.set_style(
            ProgressStyle::with_template("{spinner:.cyan} {msg}")
                .unwrap()
                .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"]),
        );
        spinner.enable_steady_tick(std::time::Duration::from_millis(80));
        Self { spinner }
    }

    fn finish(&self) {
        self.spinner.finish_and_clear();
    }
}

impl ProgressReporter for CliProgress {
    fn phase(&self, name: &str) {
        self.spinner.set_message(name.to_string());
    }

    fn post_written(&self, key: &str) {
        self.spinner.set_message(format!("Wrote {key}"));
    }
}

impl SweepProgress for CliProgress {
    fn round(&self, round: u32, total_rounds: u32, pending: usize) {
        self.spinner
            .set_message(format!("Round {round}/{total_rounds} ({pending} targets)"));
    }

    fn target(&self, name: &str, current: usize, total: usize) {
        self.spinner
            .set_message(format!("Syncing [{current}/{total}] {name}"));
    }
}
