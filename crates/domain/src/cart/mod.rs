//! Cart aggregate, its engine and related types.

mod aggregate;
mod change;
mod engine;
mod value_objects;

pub use aggregate::{Cart, CartPricing, CartTotals};
pub use change::CartChange;
pub use engine::{CartEngine, CartUpdate, Persistence};
pub use value_objects::{ClientId, ItemKey, LineItem, Money, ProductId, ShippingAddress};

use cart_store::CartStoreError;
use thiserror::Error;

use crate::pricing::PricingError;

/// Errors that can occur during cart operations.
#[derive(Debug, Error)]
pub enum CartError {
    /// Adding would take a line past its stock snapshot.
    #[error("Product is out of stock: {product_id} (requested {requested}, available {available})")]
    OutOfStock {
        product_id: ProductId,
        requested: u32,
        available: u32,
    },

    /// The new quantity exceeds the latest stock snapshot.
    #[error(
        "Not enough product in stock: {product_id} (requested {requested}, available {available})"
    )]
    NotEnoughStock {
        product_id: ProductId,
        requested: u32,
        available: u32,
    },

    /// Invalid quantity.
    #[error("Invalid quantity: {quantity} (must be greater than 0)")]
    InvalidQuantity { quantity: u32 },

    /// Invalid price.
    #[error("Invalid price: {price} (must not be negative)")]
    InvalidPrice { price: Money },

    /// Another mutation of this cart is in flight.
    #[error("Cart is busy with another update")]
    Busy,

    /// Totals could not be recomputed.
    #[error("Pricing error: {0}")]
    Pricing(#[from] PricingError),

    /// The stored cart could not be read.
    #[error("Cart store error: {0}")]
    Store(#[from] CartStoreError),

    /// The stored cart could not be decoded.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
