use anyhow::{Context, Result};
use household_dashboard::{Dashboard, DashboardConfig, DEFAULT_LOG_FILTER};
use tokio::signal;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| DEFAULT_LOG_FILTER.into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    dotenvy::dotenv().ok();
    let config = DashboardConfig::from_env().context("Failed to load dashboard configuration")?;
    tracing::info!("Starting household dashboard (state in {})", config.state_dir.display());

    let dashboard = Dashboard::start(config).await;
    tracing::info!("Dashboard running. Press Ctrl+C to stop.");
    dashboard
        .run(async {
            if let Err(e) = signal::ctrl_c().await {
                tracing::error!("Failed to listen for Ctrl+C: {}", e);
            }
        })
        .await;

    Ok(())
}
