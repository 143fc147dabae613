use std::sync::Mutex;

use console::style;
use indicatif::{MultiProgress, ProgressBar, ProgressStyle};
use plugdex::sync::{EntryOutcome, SyncProgress};

/// Bars owned by the reporter.
#[derive(Default)]
struct ProgressState {
    /// One tick per batched entry.
    verify_bar: Option<ProgressBar>,
    /// Spinner while the catalog is written.
    save_bar: Option<ProgressBar>,
}

/// Interactive progress reporter using indicatif.
pub struct InteractiveReporter {
    multi: MultiProgress,
    state: Mutex<ProgressState>,
}

impl InteractiveReporter {
    pub fn new() -> Self {
        Self {
            multi: MultiProgress::new(),
            state: Mutex::new(ProgressState::default()),
        }
    }

    fn println(&self, line: String) {
        if self.multi.println(&line).is_err() {
            eprintln!("{line}");
        }
    }

    pub fn handle(&self, event: SyncProgress) {
        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());

        match event {
            SyncProgress::Reconciled { dropped } => {
                self.println(format!(
                    "{} dropped {} inconsistent entr{}: {}",
                    style("!").yellow().bold(),
                    dropped.len(),
                    if dropped.len() == 1 { "y" } else { "ies" },
                    dropped.join(", ")
                ));
            }

            SyncProgress::QuotaChecked { remaining, cap } => {
                self.println(format!(
                    "{} {} calls remaining, room for {} entries",
                    style("i").cyan().bold(),
                    remaining,
                    cap
                ));
            }

            SyncProgress::Selected {
                batch,
                fresh,
                blacklisted,
                deferred,
            } => {
                self.println(format!(
                    "{} {} to verify, {} fresh, {} blacklisted, {} deferred",
                    style("i").cyan().bold(),
                    batch,
                    fresh,
                    blacklisted,
                    deferred
                ));
                if batch > 0 {
                    let pb = self.multi.add(ProgressBar::new(batch as u64));
                    pb.set_style(Self::bar_style());
                    pb.set_prefix(format!("{:10}", "Verifying"));
                    state.verify_bar = Some(pb);
                }
            }

            SyncProgress::Verifying { repository, .. } => {
                if let Some(ref pb) = state.verify_bar {
                    pb.set_message(repository);
                }
            }

            SyncProgress::EntryDone {
                id,
                outcome,
                reasons,
            } => {
                let mark = match outcome {
                    EntryOutcome::Updated => Some(style("↑").green()),
                    EntryOutcome::Failed => Some(style("✗").red()),
                    EntryOutcome::Pruned => Some(style("−").red().bold()),
                    _ => None,
                };
                if let Some(mark) = mark {
                    let detail = if reasons.is_empty() {
                        String::new()
                    } else {
                        format!(": {}", reasons.join("; "))
                    };
                    self.println(format!("{mark} {id} {outcome}{detail}"));
                }
                if matches!(
                    outcome,
                    EntryOutcome::Updated
                        | EntryOutcome::Unchanged
                        | EntryOutcome::Failed
                        | EntryOutcome::Pruned
                ) && let Some(ref pb) = state.verify_bar
                {
                    pb.inc(1);
                }
            }

            SyncProgress::RateLimited { reset_at, deferred } => {
                if let Some(ref pb) = state.verify_bar {
                    pb.abandon_with_message(format!(
                        "rate limited until {}, {} deferred",
                        reset_at.format("%H:%M:%S UTC"),
                        deferred
                    ));
                }
            }

            SyncProgress::Interrupted { deferred } => {
                if let Some(ref pb) = state.verify_bar {
                    pb.abandon_with_message(format!("interrupted, {deferred} deferred"));
                }
            }

            SyncProgress::Persisting => {
                if let Some(ref pb) = state.verify_bar
                    && !pb.is_finished()
                {
                    pb.finish_with_message("done");
                }
                let pb = self.multi.add(ProgressBar::new_spinner());
                pb.set_style(Self::spinner_style());
                pb.set_prefix(format!("{:10}", "Saving"));
                pb.set_message("Writing catalog...");
                pb.enable_steady_tick(std::time::Duration::from_millis(100));
                state.save_bar = Some(pb);
            }

            SyncProgress::Persisted => {
                if let Some(ref pb) = state.save_bar {
                    pb.finish_with_message("Catalog written");
                }
            }

            SyncProgress::PersistError { error } => {
                if let Some(ref pb) = state.save_bar {
                    pb.abandon_with_message(format!("✗ {error}"));
                }
            }

            SyncProgress::Warning { message } => {
                self.println(format!("{} {}", style("!").yellow().bold(), message));
            }

            _ => {}
        }
    }

    pub fn finish(&self) {
        let state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        for pb in [&state.verify_bar, &state.save_bar].into_iter().flatten() {
            if !pb.is_finished() {
                pb.finish();
            }
        }
    }

    fn spinner_style() -> ProgressStyle {
        ProgressStyle::default_spinner()
            .template("{prefix:.bold.cyan} {spinner:.green} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏")
    }

    fn bar_style() -> ProgressStyle {
        ProgressStyle::default_bar()
            .template("{prefix:.bold.cyan} [{bar:40.cyan/blue}] {pos:>3}/{len:3} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("█▓░")
    }
}

impl Default for InteractiveReporter {
    fn default() -> Self {
        Self::new()
    }
}
