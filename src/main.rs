mod config;
mod protocol;
mod routes;
mod services;
mod state;

use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = config::Config::from_env();
    let port = config.port;
    tracing::info!(
        %port,
        activation_delay_ms = config.room.activation_delay_ms,
        ghost_count = config.room.ghost_count,
        tick_ms = config.room.tick_ms,
        statements_base_url = %config.pool.base_url,
        "config loaded"
    );

    let state = state::AppState::new(config);
    let app = routes::app(state);
    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{port}"))
        .await
        .expect("failed to bind");

    tracing::info!(%port, "crowdroom listening");
    axum::serve(listener, app).await.expect("server failed");
}
