mod aggregate;
mod chart;
mod config;
mod error;
mod github;
mod model;
mod poller;

use aggregate::Aggregator;
use anyhow::{Context, Result};
use chrono::{Datelike, Utc};
use config::Config;
use github::{GithubClient, StatsSource};
use poller::StatsPoller;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let config = Config::from_env();
    let client = GithubClient::new(&config).context("Failed to build GitHub client")?;

    info!("Fetching GitHub repositories for {}...", config.username);
    let repos = match client.list_repos(&config.username).await {
        Ok(repos) => repos,
        Err(e) => {
            error!("Error fetching repositories: {e}");
            return Ok(());
        }
    };

    if repos.is_empty() {
        warn!("No repositories found for {}; nothing to chart", config.username);
        return Ok(());
    }

    info!("Fetching stats for {} repositories...", repos.len());
    let poller = StatsPoller::new(&client, &config.username, config.retry);
    let mut aggregator = Aggregator::new(
        Utc::now().year(),
        config.formula,
        config.track_previous_year,
    );
    aggregator.aggregate_repos(&repos, &poller).await;
    let totals = aggregator.finish(&config.username);

    info!(
        added = totals.lifetime.added,
        removed = totals.lifetime.removed,
        updated = totals.lifetime.updated,
        skipped = totals.repos_skipped,
        "Aggregated lifetime totals"
    );

    if totals.lifetime.is_empty() {
        warn!("No line changes were recorded; the chart will show zeros");
    }

    info!("Generating chart...");
    chart::render(
        totals,
        config.output_path.clone(),
        config.layout,
        config.theme,
    )
    .await
    .with_context(|| format!("Failed to render {}", config.output_path.display()))?;

    info!("Done! Check {}.", config.output_path.display());

    Ok(())
}
