use serde::{Deserialize, Serialize};

use crate::cart::{LineItem, Money, ShippingAddress};

use super::{PricingConfig, PricingError};

/// Shipping cost of a priced cart.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "amount", rename_all = "snake_case")]
pub enum ShippingCharge {
    /// No destination yet, or no delivery tier to price against.
    Unavailable,
    /// The tier's free-shipping threshold was met.
    Free,
    /// The tier's flat rate applies.
    Flat(Money),
}

impl ShippingCharge {
    /// Returns the amount charged, if shipping could be priced.
    pub fn amount(&self) -> Option<Money> {
        match self {
            ShippingCharge::Unavailable => None,
            ShippingCharge::Free => Some(Money::zero()),
            ShippingCharge::Flat(price) => Some(*price),
        }
    }
}

/// The delivery tier a breakdown was priced against.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedTier {
    pub index: usize,
    pub name: String,
    pub days_to_delivery: u32,
}

/// Output of one pricing run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriceBreakdown {
    pub items_price: Money,
    pub shipping: ShippingCharge,
    pub tax_price: Money,
    pub total_price: Money,
    pub delivery_tier: Option<ResolvedTier>,
}

impl PriceBreakdown {
    /// Returns the shipping amount, if it could be priced.
    pub fn shipping_price(&self) -> Option<Money> {
        self.shipping.amount()
    }

    /// Returns the index of the tier that was priced against.
    pub fn delivery_tier_index(&self) -> Option<usize> {
        self.delivery_tier.as_ref().map(|tier| tier.index)
    }
}

/// Prices a list of line items.
///
/// Without an explicit `delivery_tier_index` the last configured tier is
/// used. An explicit index past the end of the tier list is an error.
/// Shipping stays unavailable until a destination is known.
pub fn calculate(
    config: &PricingConfig,
    items: &[LineItem],
    shipping_address: Option<&ShippingAddress>,
    delivery_tier_index: Option<usize>,
) -> Result<PriceBreakdown, PricingError> {
    let items_price = items
        .iter()
        .try_fold(Money::zero(), |sum, item| {
            item.line_total().and_then(|line| sum.checked_add(line))
        })
        .ok_or(PricingError::AmountOverflow("items price"))?;

    let resolved_index = match delivery_tier_index {
        Some(index) if index >= config.delivery_tiers.len() => {
            return Err(PricingError::DeliveryTierOutOfRange {
                index,
                available: config.delivery_tiers.len(),
            });
        }
        Some(index) => Some(index),
        None => config.default_tier_index(),
    };
    let tier = resolved_index.and_then(|index| config.delivery_tiers.get(index));

    let shipping = match (shipping_address, tier) {
        (Some(_), Some(tier)) => {
            if tier.free_shipping_minimum_price.is_positive()
                && items_price >= tier.free_shipping_minimum_price
            {
                ShippingCharge::Free
            } else {
                ShippingCharge::Flat(tier.shipping_price)
            }
        }
        _ => ShippingCharge::Unavailable,
    };

    let tax_price = config
        .tax_rate
        .apply(items_price)
        .ok_or(PricingError::AmountOverflow("tax price"))?;
    let total_price = items_price
        .checked_add(shipping.amount().unwrap_or_default())
        .and_then(|sum| sum.checked_add(tax_price))
        .ok_or(PricingError::AmountOverflow("total price"))?;

    let delivery_tier = resolved_index.zip(tier).map(|(index, tier)| ResolvedTier {
        index,
        name: tier.name.clone(),
        days_to_delivery: tier.days_to_delivery,
    });

    Ok(PriceBreakdown {
        items_price,
        shipping,
        tax_price,
        total_price,
        delivery_tier,
    })
}
