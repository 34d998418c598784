use std::net::SocketAddr;
use std::sync::Arc;

use docuhub::api::{self, AppState};
use docuhub::db::Database;
use docuhub::hub::Hub;
use docuhub::Config;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::from_env()?;
    init_tracing(&config.log_format);

    let db = Database::connect(&config.database_url).await?;
    let hub = Hub::new(db.clone());
    let addr: SocketAddr = config.http_addr.parse()?;

    let state = Arc::new(AppState { db, hub, config });
    let app = api::router(state);

    tracing::info!(%addr, "starting docuhub");
    axum::Server::bind(&addr)
        .serve(app.into_make_service())
        .await?;
    Ok(())
}

fn init_tracing(log_format: &str) {
    use tracing_subscriber::{fmt, EnvFilter};

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("docuhub=info,tower_http=warn"));

    if log_format == "json" {
        fmt().json().with_env_filter(filter).init();
    } else {
        fmt().with_env_filter(filter).init();
    }
}
