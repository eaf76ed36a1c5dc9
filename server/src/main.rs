mod config;
mod db;
mod routes;
mod state;

use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    // A missing .env file is normal.
    let _ = dotenvy::dotenv();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = config::ServerConfig::from_env();
    tracing::info!(
        database_url = %config.database_url,
        static_dir = %config.static_dir.display(),
        "databind server starting"
    );

    let pool = db::init_pool(&config.database_url, config.max_connections)
        .await
        .expect("database init failed");

    let app = routes::app(state::AppState::new(pool), &config.static_dir);
    let listener = tokio::net::TcpListener::bind(config.bind_addr())
        .await
        .expect("failed to bind");

    tracing::info!(port = config.port, "databind server listening");
    axum::serve(listener, app).await.expect("server failed");
}
