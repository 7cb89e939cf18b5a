use anyhow::Context;
use melo_server::{app, cors_layer, maintenance, AppState, MeloConfig};
use std::time::Duration;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = MeloConfig::load_default()
        .unwrap_or_else(|e| {
            eprintln!("Failed to load config: {}, using defaults", e);
            MeloConfig::default()
        })
        .with_env()?;

    tracing::info!(
        port = config.server.port,
        log_dir = ?config.logging.rotation.directory,
        environment = %config.logging.logger.environment,
        "melo starting"
    );

    let state = AppState::new(&config.logging);
    let cors = cors_layer(&config.push.origin)?;

    let _tasks = maintenance::spawn(
        &state,
        Duration::from_secs(config.logging.rotation.interval_secs.max(1)),
        Duration::from_secs(config.server.sweep_interval_secs.max(1)),
    );

    let addr = config.server.addr();
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;

    tracing::info!("Server running at http://{}", addr);
    axum::serve(listener, app(state).layer(cors)).await?;

    Ok(())
}
