//! Order handoff: reprice, validate and persist a proposed cart.

use cart_store::CartStore;
use chrono::Utc;
use common::CustomerId;
use domain::{Cart, CartEngine, LineItem, Persistence, Pricer, ShippingAddress};
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::order::{Order, OrderDraft};
use crate::repository::OrderRepository;
use crate::validator::validate_order;

/// The parts of a client cart that an order is built from.
///
/// Client-side totals are deliberately not part of this type; they are
/// recomputed on the server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckoutRequest {
    pub items: Vec<LineItem>,
    #[serde(default)]
    pub shipping_address: Option<ShippingAddress>,
    #[serde(default)]
    pub payment_method: Option<String>,
    #[serde(default)]
    pub delivery_tier_index: Option<usize>,
}

impl CheckoutRequest {
    /// Takes the proposal from a client cart, dropping its totals.
    pub fn from_cart(cart: &Cart) -> Self {
        Self {
            items: cart.items().to_vec(),
            shipping_address: cart.shipping_address().cloned(),
            payment_method: cart.payment_method().map(str::to_string),
            delivery_tier_index: cart.delivery_tier_index(),
        }
    }
}

/// Turns an untrusted cart proposal into a stored order.
pub struct OrderHandoff<P, R>
where
    P: Pricer,
    R: OrderRepository,
{
    pricer: P,
    repository: R,
}

impl<P, R> OrderHandoff<P, R>
where
    P: Pricer,
    R: OrderRepository,
{
    pub fn new(pricer: P, repository: R) -> Self {
        Self { pricer, repository }
    }

    pub fn repository(&self) -> &R {
        &self.repository
    }

    /// Places an order for a proposal.
    ///
    /// Prices are recomputed from the proposal's items, destination and
    /// delivery tier before the order is validated and stored.
    #[tracing::instrument(skip(self, request), fields(items = request.items.len()))]
    pub async fn place_order(
        &self,
        customer_id: CustomerId,
        request: CheckoutRequest,
    ) -> Result<Order> {
        let now = Utc::now();

        let breakdown = self
            .pricer
            .price(
                &request.items,
                request.shipping_address.as_ref(),
                request.delivery_tier_index,
            )
            .await?;

        let draft = OrderDraft::new(
            customer_id,
            request.items,
            request.shipping_address,
            request.payment_method,
            &breakdown,
            now,
        );

        let order = validate_order(draft, now).inspect_err(|e| {
            metrics::counter!("order_validation_failures_total").increment(1);
            tracing::info!(error = %e, "order rejected");
        })?;

        self.repository.create(order.clone()).await?;

        metrics::counter!("orders_created_total").increment(1);
        tracing::info!(
            order_id = %order.id,
            total = %order.total_price,
            delivery = %order.expected_delivery_date,
            "order created"
        );

        Ok(order)
    }

    /// Places an order for the engine's current cart, then clears the cart.
    ///
    /// The cart's busy flag is held throughout, so a concurrent checkout or
    /// edit of the same cart fails with `CartError::Busy`. The order stands
    /// even if the cleared cart cannot be persisted.
    #[tracing::instrument(skip(self, engine), fields(session = %engine.session_key()))]
    pub async fn checkout<S, CP>(
        &self,
        customer_id: CustomerId,
        engine: &CartEngine<S, CP>,
    ) -> Result<Order>
    where
        S: CartStore,
        CP: Pricer,
    {
        let (order, cleared) = engine
            .checkout_with(|cart| self.place_order(customer_id, CheckoutRequest::from_cart(&cart)))
            .await?;

        if let Persistence::Failed(reason) = cleared.persistence {
            tracing::warn!(order_id = %order.id, %reason, "cleared cart was not persisted");
        }

        Ok(order)
    }
}
