//! Price and delivery computation for a cart.

mod calculator;
mod config;
mod pricer;

pub use calculator::{PriceBreakdown, ResolvedTier, ShippingCharge, calculate};
pub use config::{DeliveryTier, PricingConfig, TaxRate};
pub use pricer::{Pricer, StaticPricer};

use thiserror::Error;

/// Errors that can occur while pricing a cart.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum PricingError {
    /// The selected delivery tier does not exist.
    #[error("Delivery tier {index} does not exist ({available} configured)")]
    DeliveryTierOutOfRange { index: usize, available: usize },

    /// An amount grew past what `Money` can hold.
    #[error("Price overflow while computing {0}")]
    AmountOverflow(&'static str),

    /// An external tax or shipping rate lookup failed.
    #[error("Rate lookup failed: {0}")]
    RateLookup(String),
}
