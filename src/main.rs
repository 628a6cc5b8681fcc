//! O Store - Sheets-backed storefront service

use anyhow::{Context, Result};
use ostore::config::AppConfig;
use ostore::http::router;
use ostore::state::AppState;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::registry().with(tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into())).with(tracing_subscriber::fmt::layer()).init();

    let config = AppConfig::from_env().context("invalid configuration")?;
    tracing::debug!(?config, "configuration loaded");
    if config.apps_script_url.is_none() {
        tracing::warn!("OSTORE_APPS_SCRIPT_URL not set: product edits are disabled and orders are kept locally");
    }
    let state = AppState::build(&config).await.context("failed to initialise application state")?;
    let app = router(state);

    let addr = format!("0.0.0.0:{}", config.port);
    tracing::info!("🚀 O Store listening on {}", addr);
    axum::serve(tokio::net::TcpListener::bind(&addr).await?, app).await?;
    Ok(())
}
