use std::error::Error;
use std::process::ExitCode;

use plugdex::github::{GitHubClient, GitHubRateLimits, RateLimitResource};

use crate::commands::shared::{OutputFormat, format_duration, print_json, print_table};
use crate::config::Config;

/// Handle `plugdex limits`.
pub(crate) async fn handle_limits(
    output: OutputFormat,
    config: &Config,
) -> Result<ExitCode, Box<dyn Error>> {
    let client = GitHubClient::new(config.github_token(), config.github.api_url.as_deref())?;
    let rate_limits = client.get_rate_limits().await?;
    let items = github_rate_limits_to_display(&rate_limits.resources);
    RateLimitDisplay::print_many(items, output)?;
    Ok(ExitCode::SUCCESS)
}

/// Rate limit information for display.
#[derive(Debug, Clone, serde::Serialize, tabled::Tabled)]
pub(crate) struct RateLimitDisplay {
    #[tabled(rename = "Resource")]
    #[serde(rename = "resource")]
    pub resource: String,
    #[tabled(rename = "Limit")]
    pub limit: String,
    #[tabled(rename = "Used")]
    pub used: String,
    #[tabled(rename = "Remaining")]
    pub remaining: String,
    #[tabled(rename = "Usage %")]
    pub usage_percent: String,
    #[tabled(rename = "Resets At")]
    pub reset_at: String,
    #[tabled(rename = "Resets In")]
    pub reset_in: String,
}

impl RateLimitDisplay {
    pub(crate) fn from_github_resource(name: &str, resource: &RateLimitResource) -> Self {
        let usage_percent = if resource.limit > 0 {
            (resource.used as f64 / resource.limit as f64) * 100.0
        } else {
            0.0
        };
        let now = chrono::Utc::now();
        let reset_at = resource.reset_at();
        let reset_duration = reset_at.signed_duration_since(now);
        let reset_in = if reset_duration.num_seconds() > 0 {
            format_duration(reset_duration)
        } else {
            "now".to_string()
        };

        Self {
            resource: name.to_string(),
            limit: resource.limit.to_string(),
            used: resource.used.to_string(),
            remaining: resource.remaining.to_string(),
            usage_percent: format!("{:.1}%", usage_percent),
            reset_at: reset_at.format("%Y-%m-%d %H:%M:%S UTC").to_string(),
            reset_in,
        }
    }

    pub(crate) fn print_many(
        mut items: Vec<Self>,
        format: OutputFormat,
    ) -> Result<(), Box<dyn Error>> {
        // Sort by resource name for consistent output
        items.sort_by(|a, b| a.resource.cmp(&b.resource));

        match format {
            OutputFormat::Table => print_table(items),
            OutputFormat::Json => print_json(&items)?,
        }
        Ok(())
    }
}

/// Build the display rows for every reported resource.
pub(crate) fn github_rate_limits_to_display(limits: &GitHubRateLimits) -> Vec<RateLimitDisplay> {
    let mut items = vec![RateLimitDisplay::from_github_resource("core", &limits.core)];
    if let Some(ref r) = limits.search {
        items.push(RateLimitDisplay::from_github_resource("search", r));
    }
    if let Some(ref r) = limits.graphql {
        items.push(RateLimitDisplay::from_github_resource("graphql", r));
    }
    items
}
