//! Pratica invoicing server
//!
//! Serves the invoicing API and runs the scheduled retry pass.

mod scheduler;

use std::sync::Arc;
use std::time::Duration;

use tokio::net::TcpListener;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use pratica_accounting::HttpAccountingClient;
use pratica_api::{AppState, Invoicing, create_router};
use pratica_db::{BookingRepository, SeaOrmInvoicingStore, connect_with};
use pratica_shared::AppConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "pratica=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = AppConfig::load()?;

    let db = Arc::new(connect_with(&config.database).await?);
    info!(max_connections = config.database.max_connections, "Connected to database");

    let client = HttpAccountingClient::new(&config.accounting)?;
    info!(
        base_url = %config.accounting.base_url,
        timeout_secs = config.accounting.timeout_secs,
        "Accounting client configured"
    );

    let invoicing = Arc::new(Invoicing::new(
        Arc::new(SeaOrmInvoicingStore::new(Arc::clone(&db))),
        Arc::new(client),
        Arc::new(BookingRepository::new(db)),
        config.invoicing.profile.clone(),
    ));

    let retry_task = scheduler::spawn_retry_loop(
        Arc::clone(&invoicing),
        Duration::from_secs(config.invoicing.retry_interval_secs),
        config.invoicing.max_retries,
    );

    let state = AppState {
        invoicing,
        api_token: config.server.api_token.as_deref().map(Arc::from),
        default_max_retries: config.invoicing.max_retries,
    };
    if state.api_token.is_none() {
        tracing::warn!("server.api_token is not set; invoicing routes are unauthenticated");
    }

    let app = create_router(state);

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = TcpListener::bind(&addr).await?;
    info!("Server listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    if let Some(task) = retry_task {
        task.abort();
    }
    info!("Server stopped");

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
