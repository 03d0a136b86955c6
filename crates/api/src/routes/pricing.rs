//! Pricing configuration endpoint.

use std::sync::Arc;

use axum::Json;
use axum::extract::State;
use cart_store::CartStore;
use checkout::OrderRepository;
use domain::DeliveryTier;
use serde::Serialize;

use super::AppState;

#[derive(Serialize)]
pub struct DeliveryTiersResponse {
    pub tax_rate_bps: u32,
    pub delivery_tiers: Vec<DeliveryTier>,
    /// Tier used when the cart has no explicit selection.
    pub default_tier_index: Option<usize>,
}

/// GET /delivery-tiers: lists the delivery tiers a cart can select.
pub async fn delivery_tiers<S, R>(
    State(state): State<Arc<AppState<S, R>>>,
) -> Json<DeliveryTiersResponse>
where
    S: CartStore + Clone + 'static,
    R: OrderRepository + 'static,
{
    let config = state.pricer.config();
    Json(DeliveryTiersResponse {
        tax_rate_bps: config.tax_rate.basis_points(),
        delivery_tiers: config.delivery_tiers.clone(),
        default_tier_index: config.default_tier_index(),
    })
}
