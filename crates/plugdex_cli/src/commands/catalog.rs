//! Local catalog maintenance: promote, prune and consistency checks.

use std::error::Error;
use std::process::ExitCode;

use chrono::Utc;
use console::{Term, style};

use crate::commands::shared::load_store;
use crate::config::Config;

/// Handle `plugdex promote`.
pub(crate) fn handle_promote(id: &str, config: &Config) -> Result<ExitCode, Box<dyn Error>> {
    let mut store = load_store(config)?;
    store.promote(id, Utc::now())?;
    store.save()?;
    report(&format!("promoted '{id}' to primary"));
    Ok(ExitCode::SUCCESS)
}

/// Handle `plugdex prune`.
pub(crate) fn handle_prune(id: &str, config: &Config) -> Result<ExitCode, Box<dyn Error>> {
    let mut store = load_store(config)?;
    let entry = store.prune(id)?;
    store.save()?;
    report(&format!("pruned '{}' ({})", entry.id, entry.repository));
    Ok(ExitCode::SUCCESS)
}

/// Handle `plugdex check`.
pub(crate) fn handle_check(config: &Config) -> Result<ExitCode, Box<dyn Error>> {
    let store = load_store(config)?;
    let issues = store.check_consistency();
    let is_tty = Term::stdout().is_term();

    if issues.is_empty() {
        if is_tty {
            println!(
                "{} {} entries, registry consistent",
                style("✓").green().bold(),
                store.len()
            );
        } else {
            tracing::info!(entries = store.len(), "Registry consistent");
        }
        return Ok(ExitCode::SUCCESS);
    }

    for issue in &issues {
        if is_tty {
            println!("{} {}", style("✗").red().bold(), issue);
        } else {
            tracing::warn!(id = %issue.id(), "{}", issue);
        }
    }
    if is_tty {
        println!("\n{} inconsistencies found", issues.len());
    }
    Ok(ExitCode::FAILURE)
}

fn report(message: &str) {
    if Term::stdout().is_term() {
        println!("{} {}", style("✓").green().bold(), message);
    } else {
        tracing::info!("{}", message);
    }
}
