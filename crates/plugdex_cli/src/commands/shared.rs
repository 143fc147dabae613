use std::error::Error;

use clap::ValueEnum;
use serde::Serialize;

use plugdex::catalog::CatalogStore;
use plugdex::github::GitHubClient;
use plugdex::platform::{RateLimitedClient, RemoteRepositoryClient};
use plugdex::sync::SyncEngine;
use plugdex::verify::Verifier;

use crate::config::Config;

/// The client every remote command goes through.
pub(crate) type Client = RateLimitedClient<GitHubClient>;

/// Output format for reports.
#[derive(Debug, Clone, Copy, Default, ValueEnum)]
pub(crate) enum OutputFormat {
    /// Display as a formatted table (default)
    #[default]
    Table,
    /// Display as JSON
    Json,
}

/// Build the paced GitHub client from configuration.
pub(crate) fn build_client(config: &Config) -> Result<Client, Box<dyn Error>> {
    let token = config.github_token();
    if token.is_none() {
        tracing::warn!("No GitHub token configured, using the unauthenticated quota");
    }
    let github = GitHubClient::new(token, config.github.api_url.as_deref())?;
    Ok(RateLimitedClient::new(
        github,
        config.engine_config().min_call_interval,
    ))
}

/// Build a sync engine around the paced client.
pub(crate) fn build_engine(config: &Config) -> Result<SyncEngine<Client>, Box<dyn Error>> {
    let client = build_client(config)?;
    Ok(SyncEngine::new(
        Verifier::new(client, config.verify_rules()),
        config.engine_config(),
    ))
}

/// Load the catalog from the configured directory.
pub(crate) fn load_store(config: &Config) -> Result<CatalogStore, Box<dyn Error>> {
    let store = CatalogStore::load(&config.index.dir)?;
    tracing::debug!(dir = %config.index.dir.display(), entries = store.len(), "Loaded catalog");
    Ok(store)
}

/// Print `value` as pretty JSON.
pub(crate) fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<(), Box<dyn Error>> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Print a rounded table.
pub(crate) fn print_table<T: tabled::Tabled>(rows: Vec<T>) {
    let mut table = tabled::Table::new(rows);
    table.with(tabled::settings::Style::rounded());
    println!("{}", table);
}

/// Display final rate limit status with a timeout to avoid hangs.
pub(crate) async fn display_final_rate_limit<C: RemoteRepositoryClient>(client: &C, is_tty: bool) {
    let rate_limit =
        tokio::time::timeout(std::time::Duration::from_secs(5), client.rate_limit()).await;

    match rate_limit {
        Ok(Ok(final_rate)) => {
            if is_tty {
                println!(
                    "\nRate limit after run: {}/{} remaining",
                    final_rate.remaining, final_rate.limit
                );
            } else {
                tracing::info!(
                    remaining = final_rate.remaining,
                    limit = final_rate.limit,
                    "Rate limit after run"
                );
            }
        }
        Ok(Err(error)) => {
            if is_tty {
                eprintln!("Warning: Failed to fetch rate limit after run: {error}");
            } else {
                tracing::warn!(error = %error, "Failed to fetch rate limit after run");
            }
        }
        Err(_) => {
            if is_tty {
                eprintln!("Warning: Timed out fetching rate limit after run");
            } else {
                tracing::warn!("Timed out fetching rate limit after run");
            }
        }
    }
}

/// Format a duration in a human-readable way.
pub(crate) fn format_duration(duration: chrono::Duration) -> String {
    let total_secs = duration.num_seconds();
    if total_secs < 60 {
        format!("{}s", total_secs)
    } else if total_secs < 3600 {
        let mins = total_secs / 60;
        let secs = total_secs % 60;
        if secs > 0 {
            format!("{}m {}s", mins, secs)
        } else {
            format!("{}m", mins)
        }
    } else {
        let hours = total_secs / 3600;
        let mins = (total_secs % 3600) / 60;
        if mins > 0 {
            format!("{}h {}m", hours, mins)
        } else {
            format!("{}h", hours)
        }
    }
}
