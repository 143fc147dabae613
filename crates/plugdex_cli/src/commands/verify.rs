use std::error::Error;
use std::process::ExitCode;

use console::{Term, style};

use plugdex::RepoSlug;
use plugdex::verify::{VerificationResult, Verifier};

use crate::commands::shared::{OutputFormat, build_client, print_json};
use crate::config::Config;

/// Handle `plugdex verify`.
pub(crate) async fn handle_verify(
    repo: &RepoSlug,
    output: OutputFormat,
    config: &Config,
) -> Result<ExitCode, Box<dyn Error>> {
    let verifier = Verifier::new(build_client(config)?, config.verify_rules());
    let result = verifier.verify(repo).await?;

    match output {
        OutputFormat::Json => print_json(&result)?,
        OutputFormat::Table => print_result(&result, Term::stdout().is_term()),
    }

    Ok(if result.passed {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

fn print_result(result: &VerificationResult, is_tty: bool) {
    if !is_tty {
        if result.passed {
            tracing::info!(repo = %result.repository, "Verification passed");
        } else {
            for reason in &result.reasons {
                tracing::warn!(repo = %result.repository, check = %reason.check, "{}", reason.message);
            }
        }
        return;
    }

    if result.passed {
        println!("{} {} passed", style("✓").green().bold(), result.repository);
    } else {
        println!("{} {} failed", style("✗").red().bold(), result.repository);
        for reason in &result.reasons {
            println!("  - {}", reason);
        }
    }

    if let Some(meta) = &result.metadata {
        println!("  id:          {}", meta.id);
        println!("  name:        {}", meta.name);
        println!("  version:     {}", meta.version.tag);
        if let Some(category) = &meta.category {
            println!("  category:    {}", category);
        }
        if meta.localized {
            println!("  {}", style("(localized from the default locale bundle)").dim());
        }
    }
}
