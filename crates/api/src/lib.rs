//! HTTP API server with observability for the storefront cart.
//!
//! Provides REST endpoints for per-session carts and checkout, with
//! structured logging (tracing) and Prometheus metrics.

pub mod config;
pub mod error;
pub mod extract;
pub mod routes;
pub mod sessions;

use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use axum::routing::{get, post, put};
use cart_store::CartStore;
use checkout::{InMemoryOrderRepository, OrderHandoff, OrderRepository};
use domain::{PricingConfig, StaticPricer};
use metrics_exporter_prometheus::PrometheusHandle;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use routes::AppState;
use sessions::{CartSessions, SessionLimits};

/// Creates the Axum application router with all routes and shared state.
pub fn create_app<S, R>(
    state: Arc<AppState<S, R>>,
    metrics_handle: PrometheusHandle,
) -> Router
where
    S: CartStore + Clone + 'static,
    R: OrderRepository + 'static,
{
    routes::metrics::describe();

    let metrics_router = Router::new()
        .route("/metrics", get(routes::metrics::get))
        .with_state(metrics_handle);

    Router::new()
        .route("/health", get(routes::health::check::<S, R>))
        .route("/delivery-tiers", get(routes::pricing::delivery_tiers::<S, R>))
        .route(
            "/cart",
            get(routes::cart::get::<S, R>).delete(routes::cart::clear::<S, R>),
        )
        .route(
            "/cart/items",
            post(routes::cart::add_item::<S, R>)
                .put(routes::cart::update_item::<S, R>)
                .delete(routes::cart::remove_item::<S, R>),
        )
        .route(
            "/cart/shipping-address",
            put(routes::cart::set_shipping_address::<S, R>),
        )
        .route(
            "/cart/payment-method",
            put(routes::cart::set_payment_method::<S, R>),
        )
        .route(
            "/cart/delivery-tier",
            put(routes::cart::set_delivery_tier::<S, R>),
        )
        .route("/checkout", post(routes::checkout::checkout::<S, R>))
        .route("/orders", get(routes::checkout::list::<S, R>))
        .route("/orders/{id}", get(routes::checkout::get::<S, R>))
        .with_state(state)
        .merge(metrics_router)
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TraceLayer::new_for_http())
}

/// Creates the application state over a cart store and an order repository.
pub fn create_state<S, R>(
    cart_store: S,
    orders: R,
    pricing: PricingConfig,
    limits: SessionLimits,
) -> Arc<AppState<S, R>>
where
    S: CartStore + Clone + 'static,
    R: OrderRepository + 'static,
{
    let pricer = StaticPricer::new(pricing);

    Arc::new(AppState {
        sessions: CartSessions::with_limits(cart_store, pricer.clone(), limits),
        handoff: OrderHandoff::new(pricer.clone(), orders),
        pricer,
    })
}

/// Creates state with in-memory orders and default session limits.
pub fn create_default_state<S>(
    cart_store: S,
    pricing: PricingConfig,
) -> Arc<AppState<S, InMemoryOrderRepository>>
where
    S: CartStore + Clone + 'static,
{
    create_state(
        cart_store,
        InMemoryOrderRepository::new(),
        pricing,
        SessionLimits::default(),
    )
}

/// Spawns a task that drops idle cart engines every `period`.
///
/// The task ends when the last handle to the state is dropped.
pub fn spawn_session_eviction<S, R>(
    state: &Arc<AppState<S, R>>,
    period: Duration,
) -> tokio::task::JoinHandle<()>
where
    S: CartStore + Clone + 'static,
    R: OrderRepository + 'static,
{
    let state = Arc::downgrade(state);
    tokio::spawn(async move {
        let mut ticks = tokio::time::interval(period);
        ticks.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        loop {
            ticks.tick().await;
            let Some(state) = state.upgrade() else {
                break;
            };
            state.sessions.evict_idle().await;
        }
    })
}
