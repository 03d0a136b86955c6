//! Checkout and order lookup endpoints.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use cart_store::CartStore;
use checkout::{Order, OrderRepository};
use common::OrderId;

use super::AppState;
use crate::error::ApiError;
use crate::extract::{CartSession, Customer};

/// POST /checkout: places an order for the session's cart and clears it.
#[tracing::instrument(skip(state))]
pub async fn checkout<S, R>(
    State(state): State<Arc<AppState<S, R>>>,
    session: CartSession,
    Customer(customer_id): Customer,
) -> Result<(StatusCode, Json<Order>), ApiError>
where
    S: CartStore + Clone + 'static,
    R: OrderRepository + 'static,
{
    let engine = state.sessions.get_or_open(&session.0).await?;
    let order = state.handoff.checkout(customer_id, &engine).await?;
    Ok((StatusCode::CREATED, Json(order)))
}

/// GET /orders: lists the customer's orders.
#[tracing::instrument(skip(state))]
pub async fn list<S, R>(
    State(state): State<Arc<AppState<S, R>>>,
    Customer(customer_id): Customer,
) -> Result<Json<Vec<Order>>, ApiError>
where
    S: CartStore + Clone + 'static,
    R: OrderRepository + 'static,
{
    let orders = state
        .handoff
        .repository()
        .list_for_customer(customer_id)
        .await?;
    Ok(Json(orders))
}

/// GET /orders/{id}: loads one of the customer's orders.
#[tracing::instrument(skip(state))]
pub async fn get<S, R>(
    State(state): State<Arc<AppState<S, R>>>,
    Customer(customer_id): Customer,
    Path(id): Path<String>,
) -> Result<Json<Order>, ApiError>
where
    S: CartStore + Clone + 'static,
    R: OrderRepository + 'static,
{
    let order_id = parse_order_id(&id)?;

    let order = state
        .handoff
        .repository()
        .get(order_id)
        .await?
        .filter(|order| order.customer_id == customer_id)
        .ok_or_else(|| ApiError::NotFound(format!("Order {id} not found")))?;

    Ok(Json(order))
}

fn parse_order_id(id: &str) -> Result<OrderId, ApiError> {
    let uuid = uuid::Uuid::parse_str(id)
        .map_err(|e| ApiError::BadRequest(format!("Invalid order ID: {e}")))?;
    Ok(OrderId::from_uuid(uuid))
}
