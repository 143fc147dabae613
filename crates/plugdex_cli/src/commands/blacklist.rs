use std::error::Error;
use std::process::ExitCode;

use chrono::Utc;
use console::{Term, style};
use serde::Serialize;

use plugdex::RepoSlug;
use plugdex::catalog::BlacklistEntry;

use crate::commands::shared::{OutputFormat, format_duration, load_store, print_json, print_table};
use crate::config::Config;

/// One failure record for display.
#[derive(Debug, Clone, Serialize, tabled::Tabled)]
#[serde(rename_all = "camelCase")]
pub(crate) struct BlacklistRow {
    #[tabled(rename = "Repository")]
    pub repository: String,
    #[tabled(rename = "Failures")]
    pub failures: u32,
    #[tabled(rename = "Blocked")]
    pub blocked: bool,
    #[tabled(rename = "Last Failure")]
    pub last_failure: String,
    #[tabled(rename = "Reason")]
    pub reason: String,
}

impl BlacklistRow {
    fn new(repository: &str, entry: &BlacklistEntry, threshold: u32) -> Self {
        let ago = Utc::now().signed_duration_since(entry.last_failure);
        Self {
            repository: repository.to_string(),
            failures: entry.failures,
            blocked: entry.is_blacklisted(threshold),
            last_failure: format!("{} ago", format_duration(ago)),
            reason: entry.reason.clone(),
        }
    }
}

/// Handle `plugdex blacklist list`.
pub(crate) fn handle_list(
    blocked_only: bool,
    output: OutputFormat,
    config: &Config,
) -> Result<ExitCode, Box<dyn Error>> {
    let store = load_store(config)?;
    let threshold = config.engine_config().blacklist_threshold;

    let rows: Vec<_> = store
        .blacklist()
        .iter()
        .map(|(repo, entry)| BlacklistRow::new(repo, entry, threshold))
        .filter(|row| !blocked_only || row.blocked)
        .collect();

    match output {
        OutputFormat::Json => print_json(&rows)?,
        OutputFormat::Table if rows.is_empty() => println!("No recorded failures"),
        OutputFormat::Table => print_table(rows),
    }
    Ok(ExitCode::SUCCESS)
}

/// Handle `plugdex blacklist remove`.
pub(crate) fn handle_remove(repo: &RepoSlug, config: &Config) -> Result<ExitCode, Box<dyn Error>> {
    let mut store = load_store(config)?;
    let Some(removed) = store.remove_from_blacklist(repo) else {
        return Err(format!("{repo} has no recorded failures").into());
    };
    store.save()?;

    if Term::stdout().is_term() {
        println!(
            "{} cleared {} failure(s) for {}",
            style("✓").green().bold(),
            removed.failures,
            repo
        );
    } else {
        tracing::info!(repo = %repo, failures = removed.failures, "Cleared failures");
    }
    Ok(ExitCode::SUCCESS)
}
