mod config;

use std::net::SocketAddr;
use std::sync::Arc;

use chrono::Duration;
use tracing::{info, warn};

use messagely_api::auth::{AppState, AppStateInner};
use messagely_api::store::UserStore;
use messagely_db::Database;

use crate::config::Config;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present
    let _ = dotenvy::dotenv();

    // Init logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "messagely=debug,messagely_api=debug,messagely_db=info,tower_http=debug".into()),
        )
        .init();

    let config = Config::from_env()?;
    if config.uses_placeholder_secret() {
        warn!("MESSAGELY_SECRET_KEY is unset or a placeholder; tokens are forgeable");
    }

    // Init database
    let db = Arc::new(Database::open(&config.db_path)?);

    // Shared state
    let app_state: AppState = Arc::new(AppStateInner {
        db: db.clone(),
        users: UserStore::new(db, config.work_factor),
        jwt_secret: config.secret_key.clone(),
        token_ttl: Duration::hours(config.token_ttl_hours),
    });

    let app = messagely_api::router(app_state);

    let addr: SocketAddr = format!("{}:{}", config.host, config.port).parse()?;
    info!("messagely listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
