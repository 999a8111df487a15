//! register-server binary

use std::time::Duration;

use register_server::api;
use register_server::config::Config;
use register_server::error::BoxError;
use register_server::logger;
use register_server::pricing::PriceConfigHandle;
use register_server::state::{AppState, Backends};

const CLEANUP_INTERVAL: Duration = Duration::from_secs(60);

#[tokio::main]
async fn main() -> Result<(), BoxError> {
    // Load .env file
    let _ = dotenvy::dotenv();

    let config = Config::from_env()?;

    let _log_guard = logger::init_logger_with_file(
        &config.log_level,
        !config.is_development(),
        config.log_dir.as_deref(),
    )?;

    tracing::info!("Starting register-server (env: {})", config.environment);

    let prices = PriceConfigHandle::load(&config.price_config_path).await?;
    let backends = Backends::connect(&config, prices.clone()).await?;
    let state = AppState::new(backends, &config);

    // Periodic cleanup of expired reservations and local KV entries
    let cleanup_state = state.clone();
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(CLEANUP_INTERVAL);
        loop {
            interval.tick().await;
            cleanup_state.cleanup();
        }
    });

    // Price snapshot reload; a bad file keeps the current snapshot
    let price_path = config.price_config_path.clone();
    let reload_every = config.price_reload_interval;
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(reload_every);
        interval.tick().await;
        loop {
            interval.tick().await;
            if let Err(e) = prices.reload_from(&price_path).await {
                tracing::warn!(error = %e, path = %price_path, "price config reload failed");
            }
        }
    });

    let app = api::create_router(state);
    let http_addr = format!("0.0.0.0:{}", config.http_port);
    let listener = tokio::net::TcpListener::bind(&http_addr).await?;
    tracing::info!("register-server HTTP listening on {http_addr}");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("register-server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("failed to listen for shutdown signal: {e}");
    }
}
