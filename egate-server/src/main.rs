use std::net::SocketAddr;
use std::sync::Arc;

use egate_server::store::Store;
use egate_server::{app, Config};
use tokio::sync::Mutex;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = Config::from_env()?;
    let store = Store::load(config.data_file.clone())?;

    let addr = SocketAddr::from(([127, 0, 0, 1], config.port));
    info!("listening on {}", addr);
    axum::Server::bind(&addr)
        .serve(app(Arc::new(Mutex::new(store))).into_make_service())
        .await?;
    Ok(())
}
