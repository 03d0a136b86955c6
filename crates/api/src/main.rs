//! API server entry point.

use std::time::Duration;

use api::config::Config;
use cart_store::{CartStore, InMemoryCartStore, PostgresCartStore};
use checkout::{InMemoryOrderRepository, OrderRepository, PostgresOrderRepository};
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

async fn serve<S, R>(config: Config, cart_store: S, orders: R, metrics_handle: PrometheusHandle)
where
    S: CartStore + Clone + 'static,
    R: OrderRepository + 'static,
{
    let state = api::create_state(cart_store, orders, config.pricing.clone(), config.sessions);

    // Sweep four times per idle timeout.
    let sweep = (config.sessions.idle_timeout / 4).max(Duration::from_secs(1));
    let eviction = api::spawn_session_eviction(&state, sweep);

    let app = api::create_app(state, metrics_handle);

    let addr = config.addr();
    tracing::info!(%addr, "starting API server");

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .expect("failed to bind address");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("server error");

    eviction.abort();
}

#[tokio::main]
async fn main() {
    // 1. Load configuration
    let config = Config::from_env().expect("invalid configuration");

    // 2. Initialize tracing
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(&config.log_level)),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // 3. Install Prometheus metrics recorder
    let prometheus_builder = metrics_exporter_prometheus::PrometheusBuilder::new();
    let metrics_handle = prometheus_builder
        .install_recorder()
        .expect("failed to install Prometheus recorder");

    tracing::info!(
        tax_rate_bps = config.pricing.tax_rate.basis_points(),
        delivery_tiers = config.pricing.delivery_tiers.len(),
        "pricing configured"
    );

    // 4. Pick the cart store and serve
    match config.database_url.clone() {
        Some(url) => {
            let pool = PgPoolOptions::new()
                .max_connections(10)
                .connect(&url)
                .await
                .expect("failed to connect to PostgreSQL");
            let store = PostgresCartStore::new(pool.clone());
            store
                .run_migrations()
                .await
                .expect("failed to run database migrations");
            tracing::info!("persisting carts and orders in PostgreSQL");
            serve(
                config,
                store,
                PostgresOrderRepository::new(pool),
                metrics_handle,
            )
            .await;
        }
        None => {
            tracing::warn!("DATABASE_URL not set, carts and orders are kept in memory only");
            serve(
                config,
                InMemoryCartStore::new(),
                InMemoryOrderRepository::new(),
                metrics_handle,
            )
            .await;
        }
    }

    tracing::info!("server shut down gracefully");
}
