//! Plugdex CLI - command-line interface for the plugin catalog.

mod commands;
mod config;
mod progress;
mod shutdown;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use console::Term;
use tracing_subscriber::EnvFilter;

use plugdex::RepoSlug;
use plugdex::catalog::Tier;

use crate::commands::shared::OutputFormat;

#[derive(Parser)]
#[command(name = "plugdex")]
#[command(version)]
#[command(about = "Verify and synchronize a community plugin catalog")]
#[command(
    long_about = "Plugdex keeps a JSON plugin catalog in step with the GitHub repositories it \
lists. Each repository is checked for automation workflows, a bot-published release with a \
package asset, a well-formed manifest and a semver tag. Passing entries are refreshed, \
repeat offenders are blacklisted and pruned."
)]
#[command(after_long_help = r#"EXAMPLES
    Check a repository without touching the catalog:
        $ plugdex verify eagle-cooler/eagle-webdav

    Submit a repository to the candidate tier:
        $ plugdex create eagle-cooler/eagle-webdav

    Submit straight to the primary tier, re-verifying a fresh entry:
        $ plugdex create eagle-cooler/eagle-webdav --tier primary --force

    Run the scheduled sync with a one-day staleness window:
        $ plugdex sync --days 1 --output json

    Generate shell completions:
        $ plugdex completions bash > ~/.local/share/bash-completion/completions/plugdex

CONFIGURATION
    Plugdex reads configuration from:
      1. ~/.config/plugdex/config.toml (or $XDG_CONFIG_HOME/plugdex/config.toml)
      2. ./plugdex.toml
      3. Environment variables (PLUGDEX_* prefix, e.g., PLUGDEX_GITHUB_TOKEN)
      4. .env file in current directory

ENVIRONMENT VARIABLES
    PLUGDEX_GITHUB_TOKEN    GitHub personal access token (falls back to GITHUB_TOKEN)
    PLUGDEX_INDEX_DIR       Catalog directory (default: ./index)
"#)]
struct Cli {
    /// Catalog directory (overrides config)
    #[arg(short, long, global = true)]
    index: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Verify a repository without changing the catalog
    ///
    /// Exits with status 1 when any check fails.
    Verify {
        /// Repository as owner/name
        repo: RepoSlug,

        /// Output format
        #[arg(short, long, value_enum, default_value_t = OutputFormat::Table)]
        output: OutputFormat,
    },
    /// Verify a repository and add or refresh its catalog entry
    Create {
        /// Repository as owner/name
        repo: RepoSlug,

        /// Tier for a new entry; `primary` also promotes an existing candidate
        #[arg(short, long, default_value_t = Tier::Candidate)]
        tier: Tier,

        /// Re-verify even if the entry changed recently
        #[arg(short, long)]
        force: bool,

        /// Output format
        #[arg(short, long, value_enum, default_value_t = OutputFormat::Table)]
        output: OutputFormat,
    },
    /// Re-verify stale catalog entries
    Sync {
        /// Skip entries changed within this many days (default from config or 3)
        #[arg(short, long)]
        days: Option<i64>,

        /// Maximum entries verified in this run (default from config or 200)
        #[arg(short = 'm', long)]
        max_batch: Option<usize>,

        /// Only sync the entry for this repository
        #[arg(short, long)]
        repo: Option<RepoSlug>,

        /// Output format
        #[arg(short, long, value_enum, default_value_t = OutputFormat::Table)]
        output: OutputFormat,
    },
    /// Move a candidate entry to the primary tier
    Promote {
        /// Plugin id
        id: String,
    },
    /// Remove an entry from the catalog
    Prune {
        /// Plugin id
        id: String,
    },
    /// Inspect or edit the failure ledger
    Blacklist {
        #[command(subcommand)]
        action: BlacklistAction,
    },
    /// Check that the registry and tier files agree
    ///
    /// Exits with status 1 when inconsistencies are found.
    Check,
    /// Show current GitHub rate limit status
    Limits {
        /// Output format
        #[arg(short, long, value_enum, default_value_t = OutputFormat::Table)]
        output: OutputFormat,
    },
    /// Generate shell completion scripts
    Completions {
        /// Shell to generate completions for
        shell: clap_complete::Shell,
    },
    /// Generate man page(s)
    Man {
        /// Output directory for man pages (prints to stdout if not specified)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

#[derive(Subcommand)]
enum BlacklistAction {
    /// List recorded failures
    List {
        /// Only show repositories at or over the threshold
        #[arg(short, long)]
        blocked: bool,

        /// Output format
        #[arg(short, long, value_enum, default_value_t = OutputFormat::Table)]
        output: OutputFormat,
    },
    /// Forget all failures for a repository
    Remove {
        /// Repository as owner/name
        repo: RepoSlug,
    },
}

impl Commands {
    /// Whether this command reports sync progress through tracing.
    fn logs_progress(&self) -> bool {
        matches!(
            self,
            Commands::Sync {
                output: OutputFormat::Json,
                ..
            }
        )
    }
}

/// Install the tracing subscriber on stderr, leaving stdout to reports.
fn init_logging() {
    let env_filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::new("plugdex=info,plugdex_cli=info"),
    };

    // A subscriber installed earlier wins.
    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}

#[tokio::main]
async fn main() -> ExitCode {
    match run().await {
        Ok(code) => code,
        Err(e) => {
            if Term::stderr().is_term() {
                eprintln!("{} {}", console::style("error:").red().bold(), e);
            } else {
                tracing::error!("{}", e);
            }
            ExitCode::from(2)
        }
    }
}

async fn run() -> Result<ExitCode, Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    // Structured logging when not on a TTY, or when progress is routed to the log
    if !Term::stdout().is_term() || cli.command.logs_progress() {
        init_logging();
    }

    // Handle commands that don't need configuration first
    match &cli.command {
        Commands::Completions { shell } => {
            commands::meta::handle_completions(*shell)?;
            return Ok(ExitCode::SUCCESS);
        }
        Commands::Man { output } => {
            commands::meta::handle_man(output.clone())?;
            return Ok(ExitCode::SUCCESS);
        }
        _ => {}
    }

    // Load configuration (config file -> env vars -> defaults)
    let mut config = config::Config::load();
    if let Some(dir) = cli.index {
        config.index.dir = dir;
    }

    match cli.command {
        Commands::Verify { repo, output } => commands::verify::handle_verify(&repo, output, &config).await,
        Commands::Create {
            repo,
            tier,
            force,
            output,
        } => commands::create::handle_create(&repo, tier, force, output, &config).await,
        Commands::Sync {
            days,
            max_batch,
            repo,
            output,
        } => {
            let shutdown = shutdown::setup_shutdown_handler();
            let options = commands::sync::SyncOptions {
                days,
                max_batch,
                repo,
                output,
            };
            commands::sync::handle_sync(options, &config, shutdown).await
        }
        Commands::Promote { id } => commands::catalog::handle_promote(&id, &config),
        Commands::Prune { id } => commands::catalog::handle_prune(&id, &config),
        Commands::Blacklist { action } => match action {
            BlacklistAction::List { blocked, output } => {
                commands::blacklist::handle_list(blocked, output, &config)
            }
            BlacklistAction::Remove { repo } => commands::blacklist::handle_remove(&repo, &config),
        },
        Commands::Check => commands::catalog::handle_check(&config),
        Commands::Limits { output } => commands::limits::handle_limits(output, &config).await,
        Commands::Completions { .. } | Commands::Man { .. } => Ok(ExitCode::SUCCESS),
    }
}
