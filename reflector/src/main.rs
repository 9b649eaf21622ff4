mod routes;

use anyhow::{Context, Result};
use reflector_server::{RoomRegistry, ServerConfig};
use routes::{router, AppState};
use std::net::SocketAddr;
use tracing::{info, Level};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt().with_max_level(Level::INFO).init();

    if dotenv::dotenv().is_err() {
        info!("No .env file found");
    }

    let config = ServerConfig::from_env()?;
    let registry = RoomRegistry::new();

    let app = router(AppState {
        registry,
        config: config.clone(),
    });

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    info!("conference server listening on http://{addr}");

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .context("failed to bind listener")?;
    axum::serve(listener, app).await.context("server error")?;

    Ok(())
}
