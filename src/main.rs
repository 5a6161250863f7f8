mod config;
mod error;
mod extract;
mod filename;
mod headers;
mod landing;
mod link;
mod relay;
mod router;

use router::{AppState, create_router};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> color_eyre::Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();
    color_eyre::install()?;

    let config = config::Config::load();
    tracing::debug!(?config, "configuration loaded");

    let state = AppState::new(config.upstream.clone())?;
    let app = create_router(state);

    let listener = tokio::net::TcpListener::bind(&config.host).await?;
    tracing::info!("Listening on: {}", listener.local_addr()?);
    axum::serve(listener, app).await?;

    Ok(())
}
