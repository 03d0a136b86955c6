//! Order records produced at checkout.

use chrono::{DateTime, Duration, Utc};
use common::{CustomerId, OrderId};
use domain::{LineItem, Money, PriceBreakdown, ShippingAddress};
use serde::{Deserialize, Serialize};

/// An order as assembled from a repriced proposal, before validation.
///
/// Optional fields are the ones a proposal may legitimately lack; the
/// validator turns a complete draft into an `Order`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderDraft {
    pub customer_id: CustomerId,
    pub items: Vec<LineItem>,
    pub shipping_address: Option<ShippingAddress>,
    pub payment_method: Option<String>,
    pub items_price: Money,
    /// None while shipping cannot be priced.
    pub shipping_price: Option<Money>,
    pub tax_price: Money,
    pub total_price: Money,
    pub delivery_tier: Option<String>,
    pub expected_delivery_date: Option<DateTime<Utc>>,
}

impl OrderDraft {
    /// Assembles a draft from server-computed prices.
    ///
    /// The expected delivery date is `now` plus the resolved tier's days.
    pub fn new(
        customer_id: CustomerId,
        items: Vec<LineItem>,
        shipping_address: Option<ShippingAddress>,
        payment_method: Option<String>,
        breakdown: &PriceBreakdown,
        now: DateTime<Utc>,
    ) -> Self {
        let tier = breakdown.delivery_tier.as_ref();

        Self {
            customer_id,
            items,
            shipping_address,
            payment_method,
            items_price: breakdown.items_price,
            shipping_price: breakdown.shipping_price(),
            tax_price: breakdown.tax_price,
            total_price: breakdown.total_price,
            delivery_tier: tier.map(|tier| tier.name.clone()),
            expected_delivery_date: tier
                .map(|tier| now + Duration::days(i64::from(tier.days_to_delivery))),
        }
    }
}

/// A placed order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    pub id: OrderId,
    pub customer_id: CustomerId,
    pub items: Vec<LineItem>,
    pub shipping_address: ShippingAddress,
    pub payment_method: String,
    pub items_price: Money,
    pub shipping_price: Money,
    pub tax_price: Money,
    pub total_price: Money,
    pub delivery_tier: String,
    pub expected_delivery_date: DateTime<Utc>,
    pub is_paid: bool,
    pub is_delivered: bool,
    pub created_at: DateTime<Utc>,
}

impl Order {
    /// Returns the number of units across all lines.
    pub fn total_quantity(&self) -> u32 {
        self.items
            .iter()
            .fold(0, |total, item| total.saturating_add(item.quantity))
    }
}
