//! The scheduled sync command.

use std::error::Error;
use std::process::ExitCode;
use std::sync::Arc;
use std::sync::atomic::AtomicBool;

use console::{Term, style};
use serde::Serialize;

use plugdex::RepoSlug;
use plugdex::sync::{EntryOutcome, SyncEngine, SyncReport};
use plugdex::verify::Verifier;

use crate::commands::shared::{
    OutputFormat, build_client, display_final_rate_limit, load_store, print_json, print_table,
};
use crate::config::Config;
use crate::progress::ProgressReporter;

/// Command-line overrides for a sync run.
#[derive(Debug, Clone)]
pub(crate) struct SyncOptions {
    pub(crate) days: Option<i64>,
    pub(crate) max_batch: Option<usize>,
    pub(crate) repo: Option<RepoSlug>,
    pub(crate) output: OutputFormat,
}

/// One row of the summary table.
#[derive(Debug, Serialize, tabled::Tabled)]
struct OutcomeRow {
    #[tabled(rename = "Outcome")]
    outcome: String,
    #[tabled(rename = "Entries")]
    count: usize,
}

/// One row of the problem table.
#[derive(Debug, tabled::Tabled)]
struct ProblemRow {
    #[tabled(rename = "Id")]
    id: String,
    #[tabled(rename = "Repository")]
    repository: String,
    #[tabled(rename = "Outcome")]
    outcome: String,
    #[tabled(rename = "Reasons")]
    reasons: String,
}

/// Handle `plugdex sync`.
pub(crate) async fn handle_sync(
    options: SyncOptions,
    config: &Config,
    shutdown: Arc<AtomicBool>,
) -> Result<ExitCode, Box<dyn Error>> {
    let mut engine_config = config.engine_config();
    if let Some(days) = options.days {
        engine_config.staleness = chrono::Duration::days(days.max(0));
    }
    if let Some(max) = options.max_batch {
        engine_config.max_batch_size = max;
    }

    let is_tty = Term::stdout().is_term();
    let reporter = Arc::new(ProgressReporter::for_output(options.output));

    let client = build_client(config)?;
    let engine = SyncEngine::new(Verifier::new(client, config.verify_rules()), engine_config)
        .with_progress(reporter.as_callback())
        .with_shutdown_flag(shutdown);

    let mut store = load_store(config)?;
    let report = engine.sync_all(&mut store, options.repo.as_ref()).await;
    reporter.finish();

    match options.output {
        OutputFormat::Json => print_json(&report)?,
        OutputFormat::Table => {
            print_summary(&report, is_tty);
            if is_tty {
                display_final_rate_limit(engine.verifier().client(), is_tty).await;
            }
        }
    }

    Ok(if report.is_success() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

fn outcome_rows(report: &SyncReport) -> Vec<OutcomeRow> {
    report
        .counts()
        .into_iter()
        .map(|(outcome, count)| OutcomeRow {
            outcome: outcome.to_string(),
            count,
        })
        .collect()
}

fn problem_rows(report: &SyncReport) -> Vec<ProblemRow> {
    report
        .outcomes
        .iter()
        .filter(|r| matches!(r.outcome, EntryOutcome::Failed | EntryOutcome::Pruned))
        .map(|r| ProblemRow {
            id: r.id.clone(),
            repository: r
                .repository
                .as_ref()
                .map(ToString::to_string)
                .unwrap_or_default(),
            outcome: r.outcome.to_string(),
            reasons: r.reasons.join("\n"),
        })
        .collect()
}

fn print_summary(report: &SyncReport, is_tty: bool) {
    let elapsed = report.finished_at - report.started_at;

    if !is_tty {
        let summary = report.summary();
        tracing::info!(
            total = summary.total(),
            mutations = report.mutations(),
            elapsed_ms = elapsed.num_milliseconds(),
            "Sync complete"
        );
        if let Some(reason) = &report.aborted {
            tracing::warn!(reason = %reason, "Sync stopped early");
        }
        if let Some(error) = &report.persist_error {
            tracing::error!(error = %error, "Catalog was not fully written");
        }
        return;
    }

    println!();
    print_table(outcome_rows(report));

    let problems = problem_rows(report);
    if !problems.is_empty() {
        println!();
        print_table(problems);
    }

    println!(
        "\n{} entries, {} changed in {:.1}s",
        report.summary().total(),
        report.mutations(),
        elapsed.num_milliseconds() as f64 / 1000.0
    );
    if let Some(reason) = &report.aborted {
        eprintln!("{} stopped early: {}", style("!").yellow().bold(), reason);
    }
    if let Some(error) = &report.persist_error {
        eprintln!("{} catalog was not fully written: {}", style("✗").red().bold(), error);
    }
}
