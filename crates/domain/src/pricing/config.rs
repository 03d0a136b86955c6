use serde::{Deserialize, Serialize};

use crate::cart::Money;

/// Flat tax rate in basis points (1500 = 15%).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TaxRate(u32);

impl TaxRate {
    /// Creates a tax rate from basis points.
    pub const fn from_basis_points(bps: u32) -> Self {
        Self(bps)
    }

    /// Returns the rate in basis points.
    pub fn basis_points(&self) -> u32 {
        self.0
    }

    /// Returns the tax owed on an amount, rounded half-up to the cent.
    ///
    /// None if the tax does not fit in a `Money`.
    pub fn apply(&self, amount: Money) -> Option<Money> {
        let scaled = i128::from(amount.cents()) * i128::from(self.0);
        i64::try_from((scaled + 5_000).div_euclid(10_000))
            .ok()
            .map(Money::from_cents)
    }
}

impl Default for TaxRate {
    fn default() -> Self {
        Self(1500)
    }
}

/// A delivery speed/price option offered at checkout.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeliveryTier {
    pub name: String,
    pub days_to_delivery: u32,
    pub shipping_price: Money,
    /// Orders at or above this amount ship free. Zero disables free shipping.
    pub free_shipping_minimum_price: Money,
}

impl DeliveryTier {
    pub fn new(
        name: impl Into<String>,
        days_to_delivery: u32,
        shipping_price: Money,
        free_shipping_minimum_price: Money,
    ) -> Self {
        Self {
            name: name.into(),
            days_to_delivery,
            shipping_price,
            free_shipping_minimum_price,
        }
    }
}

/// Business constants the calculator prices against.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PricingConfig {
    pub tax_rate: TaxRate,
    /// Ordered fastest first; the last tier is the default selection.
    pub delivery_tiers: Vec<DeliveryTier>,
}

impl PricingConfig {
    pub fn new(tax_rate: TaxRate, delivery_tiers: Vec<DeliveryTier>) -> Self {
        Self {
            tax_rate,
            delivery_tiers,
        }
    }

    /// Index of the tier used when the shopper has not picked one.
    pub fn default_tier_index(&self) -> Option<usize> {
        self.delivery_tiers.len().checked_sub(1)
    }
}

impl Default for PricingConfig {
    fn default() -> Self {
        Self {
            tax_rate: TaxRate::default(),
            delivery_tiers: vec![
                DeliveryTier::new("Tomorrow", 1, Money::from_cents(1290), Money::zero()),
                DeliveryTier::new("Next 3 Days", 3, Money::from_cents(690), Money::zero()),
                DeliveryTier::new(
                    "Next 5 Days",
                    5,
                    Money::from_cents(490),
                    Money::from_dollars(35),
                ),
            ],
        }
    }
}
