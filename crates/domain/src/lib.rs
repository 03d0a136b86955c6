//! Domain layer for the storefront cart.
//!
//! This crate provides:
//! - Value objects for line items, money and shipping addresses
//! - The `Cart` aggregate with its stock rules
//! - Pure price calculation and the `Pricer` port
//! - `CartEngine`, which serializes, reprices and persists cart mutations

pub mod cart;
pub mod pricing;

pub use cart::{
    Cart, CartChange, CartEngine, CartError, CartPricing, CartTotals, CartUpdate, ClientId,
    ItemKey, LineItem, Money, Persistence, ProductId, ShippingAddress,
};
pub use pricing::{
    DeliveryTier, PriceBreakdown, Pricer, PricingConfig, PricingError, ResolvedTier,
    ShippingCharge, StaticPricer, TaxRate, calculate,
};
