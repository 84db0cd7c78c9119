//! Registry API — entry point.
//!
//! Opens the JSON record store, then serves the REST API with per-IP rate
//! limiting. A background task periodically prunes idle rate-limit buckets.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tracing::info;
use tracing_subscriber::EnvFilter;

use registry_api::api::{self, ApiState};
use registry_api::config::Config;
use registry_api::rate_limit::{self, RateLimit};
use registry_api::store::JsonStore;

const RATE_LIMIT_CLEANUP_INTERVAL: Duration = Duration::from_secs(60);

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialise structured logging (RUST_LOG controls verbosity).
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    // Load optional .env file (ignored if missing).
    let _ = dotenvy::dotenv();

    let config = Config::from_env().map_err(|e| anyhow::anyhow!("{e}"))?;

    let store = JsonStore::open(&config.data_dir).await?;
    let registry = store.load_registry().await?;
    let stats = registry.statistics();
    info!(
        "Loaded {} projects, {} stakeholders, {} MRV records",
        stats.total_projects,
        stats.total_stakeholders,
        registry.mrv_data.len()
    );

    // ─── Rate limiting ────────────────────────────────────
    let limit = Arc::new(
        RateLimit::new(config.rate_limit_per_second, config.rate_limit_burst)
            .with_trusted_proxies(config.trusted_proxies.clone()),
    );
    tokio::spawn(rate_limit::cleanup_task(
        limit.clone(),
        RATE_LIMIT_CLEANUP_INTERVAL,
    ));

    // ─── REST API ─────────────────────────────────────────
    let addr = format!("0.0.0.0:{}", config.api_port);
    let state = Arc::new(ApiState::new(store, config));
    let app = api::router(state, limit);

    info!("API listening on http://{addr}");

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;

    Ok(())
}
