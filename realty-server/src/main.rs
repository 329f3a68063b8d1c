//! Realty marketplace server

use std::sync::Arc;

use anyhow::{anyhow, Result};
use tokio::net::TcpListener;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use realty_server::{
    routes, AppState, Config, ConsoleNotifier, HttpIdentityProvider, InMemoryStore, Notifier,
    SmtpNotifier, SqliteStore, Store,
};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "realty_server=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    let config = Config::from_env().map_err(|e| anyhow!(e))?;
    tracing::info!(?config, "Loaded configuration");

    let notifier: Box<dyn Notifier> = match config.smtp.clone() {
        Some(smtp) => Box::new(SmtpNotifier::new(smtp).map_err(|e| anyhow!(e))?),
        None => {
            tracing::info!("SMTP not configured, notifications are logged only");
            Box::new(ConsoleNotifier::new())
        }
    };

    match config.database_path.clone() {
        Some(path) => {
            let store = SqliteStore::open(&path)?;
            tracing::info!(path = %path, "Opened SQLite database");
            serve(config, store, notifier).await
        }
        None => {
            tracing::warn!("DATABASE_PATH not set, using in-memory storage");
            serve(config, InMemoryStore::new(), notifier).await
        }
    }
}

async fn serve<S: Store + 'static>(
    config: Config,
    store: S,
    notifier: Box<dyn Notifier>,
) -> Result<()> {
    let identity = HttpIdentityProvider::new(
        config.oauth_server_url.clone(),
        config.oauth_client_id.clone(),
        config.oauth_client_secret.clone(),
    )?;

    let addr = format!("0.0.0.0:{}", config.port);

    // Create app state
    let state = Arc::new(AppState::new(config, store, identity, notifier)?);

    // Create router
    let app = routes::create_router(state);

    // Start server
    let listener = TcpListener::bind(&addr).await?;
    tracing::info!("Marketplace listening on http://{}", addr);

    axum::serve(listener, app).await?;

    Ok(())
}
