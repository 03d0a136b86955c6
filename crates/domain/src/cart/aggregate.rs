//! Cart aggregate implementation.

use cart_store::Revision;
use serde::{Deserialize, Serialize};

use crate::pricing::PriceBreakdown;

use super::{
    CartChange, CartError, ClientId, ItemKey, LineItem, Money, ShippingAddress,
};

/// Computed totals of a cart.
///
/// A cart is unpriced when it was just created or cleared; every other
/// mutation leaves it priced.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", content = "breakdown", rename_all = "snake_case")]
pub enum CartPricing {
    #[default]
    Unpriced,
    Priced(PriceBreakdown),
}

/// Flat view of the four price fields, with absent shipping counted as zero.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartTotals {
    pub items_price: Money,
    pub shipping_price: Money,
    pub tax_price: Money,
    pub total_price: Money,
}

/// Shopping cart aggregate for one session.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cart {
    /// Revision of the last committed mutation.
    #[serde(default)]
    revision: Revision,

    /// Lines in insertion order.
    items: Vec<LineItem>,

    #[serde(default)]
    pricing: CartPricing,

    shipping_address: Option<ShippingAddress>,

    payment_method: Option<String>,

    /// Explicit delivery tier selection; None means the default tier.
    delivery_tier_index: Option<usize>,
}

// Query methods
impl Cart {
    pub fn revision(&self) -> Revision {
        self.revision
    }

    /// Returns the lines in insertion order.
    pub fn items(&self) -> &[LineItem] {
        &self.items
    }

    /// Returns the line with the given identity.
    pub fn find(&self, key: &ItemKey) -> Option<&LineItem> {
        self.items.iter().find(|item| item.matches(key))
    }

    /// Returns the line with the given client ID.
    pub fn find_by_client_id(&self, client_id: ClientId) -> Option<&LineItem> {
        self.items.iter().find(|item| item.client_id == client_id)
    }

    pub fn item_count(&self) -> usize {
        self.items.len()
    }

    /// Returns the total quantity across all lines.
    pub fn total_quantity(&self) -> u32 {
        self.items
            .iter()
            .fold(0, |total, item| total.saturating_add(item.quantity))
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn pricing(&self) -> &CartPricing {
        &self.pricing
    }

    /// Returns the breakdown if the cart has been priced.
    pub fn breakdown(&self) -> Option<&PriceBreakdown> {
        match &self.pricing {
            CartPricing::Priced(breakdown) => Some(breakdown),
            CartPricing::Unpriced => None,
        }
    }

    pub fn totals(&self) -> CartTotals {
        match &self.pricing {
            CartPricing::Unpriced => CartTotals::default(),
            CartPricing::Priced(b) => CartTotals {
                items_price: b.items_price,
                shipping_price: b.shipping_price().unwrap_or_default(),
                tax_price: b.tax_price,
                total_price: b.total_price,
            },
        }
    }

    /// Returns the shipping price, if shipping has been priced.
    pub fn shipping_price(&self) -> Option<Money> {
        self.breakdown().and_then(PriceBreakdown::shipping_price)
    }

    pub fn shipping_address(&self) -> Option<&ShippingAddress> {
        self.shipping_address.as_ref()
    }

    pub fn payment_method(&self) -> Option<&str> {
        self.payment_method.as_deref()
    }

    pub fn delivery_tier_index(&self) -> Option<usize> {
        self.delivery_tier_index
    }

    /// Returns the tier the current totals were priced against.
    pub fn resolved_delivery_tier_index(&self) -> Option<usize> {
        self.breakdown().and_then(PriceBreakdown::delivery_tier_index)
    }
}

// Command methods (return changes)
impl Cart {
    /// Adds `quantity` units of an item.
    ///
    /// A line with the same identity absorbs the quantity; its stored stock
    /// snapshot bounds the merged quantity. Otherwise the item's own snapshot
    /// bounds the requested quantity.
    pub fn add_item(&self, item: LineItem, quantity: u32) -> Result<CartChange, CartError> {
        if quantity == 0 {
            return Err(CartError::InvalidQuantity { quantity });
        }

        if item.price.is_negative() {
            return Err(CartError::InvalidPrice { price: item.price });
        }

        if let Some(existing) = self.find(&item.key()) {
            let merged = existing.quantity.saturating_add(quantity);
            if existing.count_in_stock < merged {
                return Err(CartError::OutOfStock {
                    product_id: existing.product_id.clone(),
                    requested: merged,
                    available: existing.count_in_stock,
                });
            }

            return Ok(CartChange::ItemMerged {
                key: existing.key(),
                client_id: existing.client_id,
                quantity: merged,
            });
        }

        if item.count_in_stock < quantity {
            return Err(CartError::OutOfStock {
                product_id: item.product_id,
                requested: quantity,
                available: item.count_in_stock,
            });
        }

        Ok(CartChange::ItemAdded(LineItem { quantity, ..item }))
    }

    /// Replaces the quantity of an existing line.
    ///
    /// The caller's item carries the latest known stock snapshot; it bounds
    /// the new quantity and replaces the stored one. Returns None when no
    /// line has the item's identity.
    pub fn update_item(
        &self,
        item: &LineItem,
        quantity: u32,
    ) -> Result<Option<CartChange>, CartError> {
        let Some(existing) = self.find(&item.key()) else {
            return Ok(None);
        };

        if quantity == 0 {
            return Err(CartError::InvalidQuantity { quantity });
        }

        if quantity > item.count_in_stock {
            return Err(CartError::NotEnoughStock {
                product_id: existing.product_id.clone(),
                requested: quantity,
                available: item.count_in_stock,
            });
        }

        Ok(Some(CartChange::ItemQuantityChanged {
            key: existing.key(),
            quantity,
            count_in_stock: item.count_in_stock,
        }))
    }

    /// Removes every line with the given identity.
    pub fn remove_item(&self, key: &ItemKey) -> CartChange {
        CartChange::ItemRemoved(key.clone())
    }

    pub fn set_shipping_address(&self, address: ShippingAddress) -> CartChange {
        CartChange::ShippingAddressSet(address)
    }

    pub fn set_payment_method(&self, method: impl Into<String>) -> CartChange {
        CartChange::PaymentMethodSet(method.into())
    }

    pub fn select_delivery_tier(&self, index: usize) -> CartChange {
        CartChange::DeliveryTierSelected(index)
    }

    /// Empties the cart, keeping address, payment and tier selections.
    pub fn clear(&self) -> CartChange {
        CartChange::Cleared
    }
}

// Apply helpers
impl Cart {
    /// Applies a change. Totals are left stale until `apply_pricing`.
    pub fn apply(&mut self, change: CartChange) {
        match change {
            CartChange::ItemAdded(item) => self.items.push(item),
            CartChange::ItemMerged { key, quantity, .. } => {
                if let Some(item) = self.find_mut(&key) {
                    item.quantity = quantity;
                }
            }
            CartChange::ItemQuantityChanged {
                key,
                quantity,
                count_in_stock,
            } => {
                if let Some(item) = self.find_mut(&key) {
                    item.quantity = quantity;
                    item.count_in_stock = count_in_stock;
                }
            }
            CartChange::ItemRemoved(key) => self.items.retain(|item| !item.matches(&key)),
            CartChange::ShippingAddressSet(address) => self.shipping_address = Some(address),
            CartChange::PaymentMethodSet(method) => self.payment_method = Some(method),
            CartChange::DeliveryTierSelected(index) => self.delivery_tier_index = Some(index),
            CartChange::Cleared => {
                self.items.clear();
                self.pricing = CartPricing::Unpriced;
            }
        }
    }

    /// Replaces the totals with a fresh breakdown.
    pub fn apply_pricing(&mut self, breakdown: PriceBreakdown) {
        self.pricing = CartPricing::Priced(breakdown);
    }

    pub(crate) fn set_revision(&mut self, revision: Revision) {
        self.revision = revision;
    }

    fn find_mut(&mut self, key: &ItemKey) -> Option<&mut LineItem> {
        self.items.iter_mut().find(|item| item.matches(key))
    }
}
