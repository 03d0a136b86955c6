//! Cart state changes.

use super::{ClientId, ItemKey, LineItem, ShippingAddress};

/// A single decided change to a cart.
///
/// Changes are produced by the cart's command methods after validation and
/// applied to a copy of the cart; applying never fails.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CartChange {
    /// A new line was appended.
    ItemAdded(LineItem),

    /// An existing line absorbed an added quantity.
    ItemMerged {
        key: ItemKey,
        client_id: ClientId,
        quantity: u32,
    },

    /// An existing line's quantity was replaced.
    ItemQuantityChanged {
        key: ItemKey,
        quantity: u32,
        count_in_stock: u32,
    },

    /// Any line with this identity was dropped.
    ItemRemoved(ItemKey),

    ShippingAddressSet(ShippingAddress),

    PaymentMethodSet(String),

    DeliveryTierSelected(usize),

    /// Items and totals were reset.
    Cleared,
}

impl CartChange {
    /// Returns the change name used in logs and metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            CartChange::ItemAdded(_) => "ItemAdded",
            CartChange::ItemMerged { .. } => "ItemMerged",
            CartChange::ItemQuantityChanged { .. } => "ItemQuantityChanged",
            CartChange::ItemRemoved(_) => "ItemRemoved",
            CartChange::ShippingAddressSet(_) => "ShippingAddressSet",
            CartChange::PaymentMethodSet(_) => "PaymentMethodSet",
            CartChange::DeliveryTierSelected(_) => "DeliveryTierSelected",
            CartChange::Cleared => "Cleared",
        }
    }

    /// Returns true if totals must be recomputed after this change.
    ///
    /// Payment method never affects price, and a cleared cart has no totals.
    pub fn reprices(&self) -> bool {
        !matches!(self, CartChange::PaymentMethodSet(_) | CartChange::Cleared)
    }

    /// Returns the client ID of the line an add touched.
    pub fn client_id(&self) -> Option<ClientId> {
        match self {
            CartChange::ItemAdded(item) => Some(item.client_id),
            CartChange::ItemMerged { client_id, .. } => Some(*client_id),
            _ => None,
        }
    }
}
