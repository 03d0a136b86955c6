//! Prometheus metrics endpoint.

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use metrics::Unit;
use metrics_exporter_prometheus::PrometheusHandle;

/// Registers descriptions for the cart and checkout metrics.
pub fn describe() {
    metrics::describe_counter!(
        "cart_mutations_total",
        "Committed cart mutations, labelled by operation"
    );
    metrics::describe_counter!(
        "cart_busy_rejections_total",
        "Cart mutations rejected because another was in flight"
    );
    metrics::describe_counter!(
        "cart_persistence_failures_total",
        "Committed carts that could not be written to the store"
    );
    metrics::describe_histogram!(
        "cart_pricing_duration_seconds",
        Unit::Seconds,
        "Time spent repricing a cart"
    );
    metrics::describe_gauge!("cart_sessions_open", "Cart sessions held in memory");
    metrics::describe_counter!("orders_created_total", "Orders placed at checkout");
    metrics::describe_counter!(
        "order_validation_failures_total",
        "Checkouts rejected by order validation"
    );
}

/// GET /metrics: returns Prometheus-formatted metrics.
pub async fn get(State(handle): State<PrometheusHandle>) -> impl IntoResponse {
    (
        StatusCode::OK,
        [(
            axum::http::header::CONTENT_TYPE,
            "text/plain; version=0.0.4; charset=utf-8",
        )],
        handle.render(),
    )
}
