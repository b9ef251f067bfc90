//! API server entry point.

use std::sync::Arc;

use api::config::{Config, LogFormat};
use event_store::{
    EventStore, InMemoryEventStore, InMemorySequenceAllocator, PostgresEventStore,
    PostgresSequenceAllocator, SequenceAllocator,
};
use metrics_exporter_prometheus::PrometheusHandle;
use sqlx::postgres::PgPoolOptions;
use tokio::signal;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

/// Waits for a shutdown signal (SIGINT or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install SIGINT handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            tracing::info!("received SIGINT, starting graceful shutdown");
        }
        () = terminate => {
            tracing::info!("received SIGTERM, starting graceful shutdown");
        }
    }
}

fn init_tracing(config: &Config) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.log_level.as_str()));
    let registry = tracing_subscriber::registry().with(filter);

    match config.log_format {
        LogFormat::Json => registry
            .with(tracing_subscriber::fmt::layer().json())
            .init(),
        LogFormat::Pretty => registry.with(tracing_subscriber::fmt::layer()).init(),
    }
}

async fn serve<S: EventStore + Clone + 'static>(
    store: S,
    sequences: Arc<dyn SequenceAllocator>,
    config: Config,
    metrics_handle: PrometheusHandle,
) {
    let (state, in_memory) = api::create_default_state(store, sequences, &config);
    in_memory
        .seed(&config)
        .await
        .expect("failed to seed accounts");

    // Replay existing orders into the listing view
    let replayed = state
        .projections
        .run_catch_up()
        .await
        .expect("catch-up failed");
    tracing::info!(replayed, "order summaries caught up");

    // Nothing is in flight yet, so interrupted checkouts can be finished too
    match state.checkout.recover().await {
        Ok(report) if !report.resumed.is_empty() || !report.still_stalled.is_empty() => {
            tracing::info!(
                resumed = report.resumed.len(),
                still_stalled = report.still_stalled.len(),
                "recovered unfinished checkouts"
            );
        }
        Ok(_) => {}
        Err(e) => tracing::warn!(error = %e, "could not recover unfinished checkouts"),
    }

    let app = api::create_app(state, metrics_handle, &config);

    let addr = config.addr();
    tracing::info!(%addr, "starting API server");

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .expect("failed to bind address");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("server error");

    tracing::info!("server shut down gracefully");
}

#[tokio::main]
async fn main() {
    // 1. Configuration and tracing
    let config = Config::from_env();
    init_tracing(&config);

    // 2. Install Prometheus metrics recorder
    let metrics_handle = metrics_exporter_prometheus::PrometheusBuilder::new()
        .install_recorder()
        .expect("failed to install Prometheus recorder");

    // 3. Pick the event store and serve
    match config.database_url.clone() {
        Some(url) => {
            let pool = PgPoolOptions::new()
                .max_connections(10)
                .connect(&url)
                .await
                .expect("failed to connect to PostgreSQL");
            let store = PostgresEventStore::new(pool.clone());
            store
                .run_migrations()
                .await
                .expect("failed to run migrations");
            tracing::info!("using PostgreSQL event store");

            let sequences = Arc::new(PostgresSequenceAllocator::new(pool));
            serve(store, sequences, config, metrics_handle).await;
        }
        None => {
            tracing::info!("DATABASE_URL not set, using in-memory event store");
            let sequences = Arc::new(InMemorySequenceAllocator::new());
            serve(InMemoryEventStore::new(), sequences, config, metrics_handle).await;
        }
    }
}
