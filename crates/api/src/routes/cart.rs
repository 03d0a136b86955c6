//! Cart endpoints for the current session.

use std::sync::Arc;

use axum::Json;
use axum::extract::State;
use cart_store::CartStore;
use checkout::OrderRepository;
use domain::{
    Cart, CartEngine, CartPricing, CartUpdate, ClientId, ItemKey, LineItem, Money, Persistence, ResolvedTier,
    ShippingAddress, StaticPricer,
};
use serde::{Deserialize, Serialize};

use super::AppState;
use crate::error::ApiError;
use crate::extract::CartSession;

// -- Request types --

#[derive(Deserialize)]
pub struct ItemRequest {
    pub item: LineItem,
    pub quantity: u32,
}

#[derive(Deserialize)]
pub struct PaymentMethodRequest {
    pub payment_method: String,
}

#[derive(Deserialize)]
pub struct DeliveryTierRequest {
    pub index: usize,
}

// -- Response types --

#[derive(Serialize)]
pub struct CartResponse {
    pub session: String,
    pub revision: i64,
    pub items: Vec<LineItem>,
    pub item_count: usize,
    pub total_quantity: u32,
    pub shipping_address: Option<ShippingAddress>,
    pub payment_method: Option<String>,
    /// Explicit selection; the tier actually used is `delivery_tier`.
    pub delivery_tier_index: Option<usize>,
    pub delivery_tier: Option<ResolvedTier>,
    pub items_price: Money,
    /// Zero for a new or cleared cart; absent while a priced cart has no
    /// destination to ship to.
    pub shipping_price: Option<Money>,
    pub tax_price: Money,
    pub total_price: Money,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client_id: Option<ClientId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub persistence: Option<&'static str>,
}

impl CartResponse {
    fn from_cart(session: &str, cart: &Cart) -> Self {
        let totals = cart.totals();
        Self {
            session: session.to_string(),
            revision: cart.revision().as_i64(),
            items: cart.items().to_vec(),
            item_count: cart.item_count(),
            total_quantity: cart.total_quantity(),
            shipping_address: cart.shipping_address().cloned(),
            payment_method: cart.payment_method().map(str::to_string),
            delivery_tier_index: cart.delivery_tier_index(),
            delivery_tier: cart.breakdown().and_then(|b| b.delivery_tier.clone()),
            items_price: totals.items_price,
            shipping_price: match cart.pricing() {
                CartPricing::Unpriced => Some(totals.shipping_price),
                CartPricing::Priced(breakdown) => breakdown.shipping_price(),
            },
            tax_price: totals.tax_price,
            total_price: totals.total_price,
            client_id: None,
            persistence: None,
        }
    }

    fn from_update(session: &str, update: &CartUpdate) -> Self {
        let persistence = match update.persistence {
            Persistence::Saved(_) => "saved",
            Persistence::Failed(_) => "failed",
            Persistence::Skipped => "skipped",
        };

        Self {
            client_id: update.client_id(),
            persistence: Some(persistence),
            ..Self::from_cart(session, &update.cart)
        }
    }
}

type Engine<S> = Arc<CartEngine<S, StaticPricer>>;

async fn engine_for<S, R>(
    state: &AppState<S, R>,
    session: &CartSession,
) -> Result<Engine<S>, ApiError>
where
    S: CartStore + Clone + 'static,
    R: OrderRepository + 'static,
{
    Ok(state.sessions.get_or_open(&session.0).await?)
}

fn respond(session: &CartSession, update: &CartUpdate) -> Json<CartResponse> {
    Json(CartResponse::from_update(session.0.as_str(), update))
}

// -- Handlers --

/// GET /cart: returns the session's cart.
#[tracing::instrument(skip(state))]
pub async fn get<S, R>(
    State(state): State<Arc<AppState<S, R>>>,
    session: CartSession,
) -> Result<Json<CartResponse>, ApiError>
where
    S: CartStore + Clone + 'static,
    R: OrderRepository + 'static,
{
    let engine = engine_for(&state, &session).await?;
    let cart = engine.cart().await;
    Ok(Json(CartResponse::from_cart(session.0.as_str(), &cart)))
}

/// POST /cart/items: adds an item, merging into a matching line.
#[tracing::instrument(skip(state, req))]
pub async fn add_item<S, R>(
    State(state): State<Arc<AppState<S, R>>>,
    session: CartSession,
    Json(req): Json<ItemRequest>,
) -> Result<Json<CartResponse>, ApiError>
where
    S: CartStore + Clone + 'static,
    R: OrderRepository + 'static,
{
    let engine = engine_for(&state, &session).await?;
    let update = engine.add_item(req.item, req.quantity).await?;
    Ok(respond(&session, &update))
}

/// PUT /cart/items: replaces the quantity of a matching line.
#[tracing::instrument(skip(state, req))]
pub async fn update_item<S, R>(
    State(state): State<Arc<AppState<S, R>>>,
    session: CartSession,
    Json(req): Json<ItemRequest>,
) -> Result<Json<CartResponse>, ApiError>
where
    S: CartStore + Clone + 'static,
    R: OrderRepository + 'static,
{
    let engine = engine_for(&state, &session).await?;
    let update = engine.update_item(&req.item, req.quantity).await?;
    Ok(respond(&session, &update))
}

/// DELETE /cart/items: removes every line with the given identity.
#[tracing::instrument(skip(state))]
pub async fn remove_item<S, R>(
    State(state): State<Arc<AppState<S, R>>>,
    session: CartSession,
    Json(key): Json<ItemKey>,
) -> Result<Json<CartResponse>, ApiError>
where
    S: CartStore + Clone + 'static,
    R: OrderRepository + 'static,
{
    let engine = engine_for(&state, &session).await?;
    let update = engine.remove_item(&key).await?;
    Ok(respond(&session, &update))
}

/// PUT /cart/shipping-address
#[tracing::instrument(skip(state, address))]
pub async fn set_shipping_address<S, R>(
    State(state): State<Arc<AppState<S, R>>>,
    session: CartSession,
    Json(address): Json<ShippingAddress>,
) -> Result<Json<CartResponse>, ApiError>
where
    S: CartStore + Clone + 'static,
    R: OrderRepository + 'static,
{
    let engine = engine_for(&state, &session).await?;
    let update = engine.set_shipping_address(address).await?;
    Ok(respond(&session, &update))
}

/// PUT /cart/payment-method
#[tracing::instrument(skip(state, req))]
pub async fn set_payment_method<S, R>(
    State(state): State<Arc<AppState<S, R>>>,
    session: CartSession,
    Json(req): Json<PaymentMethodRequest>,
) -> Result<Json<CartResponse>, ApiError>
where
    S: CartStore + Clone + 'static,
    R: OrderRepository + 'static,
{
    if req.payment_method.trim().is_empty() {
        return Err(ApiError::BadRequest(
            "payment_method must not be empty".to_string(),
        ));
    }

    let engine = engine_for(&state, &session).await?;
    let update = engine.set_payment_method(req.payment_method).await?;
    Ok(respond(&session, &update))
}

/// PUT /cart/delivery-tier
#[tracing::instrument(skip(state, req))]
pub async fn set_delivery_tier<S, R>(
    State(state): State<Arc<AppState<S, R>>>,
    session: CartSession,
    Json(req): Json<DeliveryTierRequest>,
) -> Result<Json<CartResponse>, ApiError>
where
    S: CartStore + Clone + 'static,
    R: OrderRepository + 'static,
{
    let engine = engine_for(&state, &session).await?;
    let update = engine.set_delivery_tier_index(req.index).await?;
    Ok(respond(&session, &update))
}

/// DELETE /cart: empties the cart.
#[tracing::instrument(skip(state))]
pub async fn clear<S, R>(
    State(state): State<Arc<AppState<S, R>>>,
    session: CartSession,
) -> Result<Json<CartResponse>, ApiError>
where
    S: CartStore + Clone + 'static,
    R: OrderRepository + 'static,
{
    let engine = engine_for(&state, &session).await?;
    let update = engine.clear_cart().await?;
    Ok(respond(&session, &update))
}
