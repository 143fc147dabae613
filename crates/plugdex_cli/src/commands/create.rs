use std::error::Error;
use std::process::ExitCode;

use console::{Term, style};

use plugdex::RepoSlug;
use plugdex::catalog::Tier;
use plugdex::sync::{CreateOutcome, CreateReport};

use crate::commands::shared::{OutputFormat, build_engine, load_store, print_json};
use crate::config::Config;

/// Handle `plugdex create`.
pub(crate) async fn handle_create(
    repo: &RepoSlug,
    tier: Tier,
    force: bool,
    output: OutputFormat,
    config: &Config,
) -> Result<ExitCode, Box<dyn Error>> {
    let engine = build_engine(config)?;
    let mut store = load_store(config)?;

    let report = engine.create_entry(&mut store, repo, tier, force).await?;

    match output {
        OutputFormat::Json => print_json(&report)?,
        OutputFormat::Table => print_report(&report, Term::stdout().is_term()),
    }

    Ok(if report.succeeded() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

fn print_report(report: &CreateReport, is_tty: bool) {
    if !is_tty {
        tracing::info!(
            repo = %report.repository,
            outcome = %report.outcome,
            id = ?report.id,
            tier = ?report.tier,
            failures = ?report.failures,
            "Submission finished"
        );
        for reason in &report.reasons {
            tracing::warn!(repo = %report.repository, "{}", reason);
        }
        return;
    }

    let mark = match report.outcome {
        CreateOutcome::Failed => style("✗").red().bold(),
        CreateOutcome::SkippedFresh | CreateOutcome::Unchanged => style("=").dim(),
        _ => style("✓").green().bold(),
    };
    println!("{} {} {}", mark, report.repository, report.outcome);

    if let Some(id) = &report.id {
        println!("  id:          {}", id);
    }
    if let Some(tier) = report.tier {
        println!("  tier:        {}", tier);
    }
    if let Some(name) = &report.name {
        println!("  name:        {}", name);
    }
    if let Some(tag) = &report.latest_version {
        println!("  version:     {}", tag);
    }
    if let Some(modified) = report.last_modified {
        println!("  modified:    {}", modified.format("%Y-%m-%d %H:%M:%S UTC"));
    }
    for reason in &report.reasons {
        println!("  - {}", reason);
    }
    if let Some(failures) = report.failures {
        println!("  recorded failures: {}", failures);
    }
    if report.outcome == CreateOutcome::SkippedFresh {
        println!("  {}", style("entry changed recently, pass --force to re-verify").dim());
    }
}
