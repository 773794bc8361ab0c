use std::net::SocketAddr;
use std::sync::Arc;

use studyspace_api::{app, AppState};
use studyspace_engine::BookingEngine;
use studyspace_store::{DbClient, PgBookingStore};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "studyspace_api=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = studyspace_store::app_config::Config::load()?;
    tracing::info!("Starting StudySpace API on port {}", config.server.port);

    let db = DbClient::new(&config.database.url, config.database.max_connections).await?;
    db.migrate().await?;

    let store = Arc::new(PgBookingStore::new(db.pool.clone()));
    let engine = Arc::new(BookingEngine::with_max_attempts(
        store,
        config.booking.max_txn_attempts,
    ));

    let app = app(AppState { engine });

    let addr = SocketAddr::from(([0, 0, 0, 0], config.server.port));
    tracing::info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app.into_make_service()).await?;
    Ok(())
}
