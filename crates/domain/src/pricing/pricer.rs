use std::sync::Arc;

use async_trait::async_trait;

use crate::cart::{LineItem, ShippingAddress};

use super::{PriceBreakdown, PricingConfig, PricingError, calculate};

/// Port the cart engine and the order handoff price through.
///
/// Deployments that consult an external tax or shipping service implement
/// this trait; lookup failures surface as `PricingError::RateLookup`.
#[async_trait]
pub trait Pricer: Send + Sync {
    async fn price(
        &self,
        items: &[LineItem],
        shipping_address: Option<&ShippingAddress>,
        delivery_tier_index: Option<usize>,
    ) -> Result<PriceBreakdown, PricingError>;
}

/// Prices against a fixed, in-process configuration.
#[derive(Debug, Clone, Default)]
pub struct StaticPricer {
    config: Arc<PricingConfig>,
}

impl StaticPricer {
    pub fn new(config: PricingConfig) -> Self {
        Self {
            config: Arc::new(config),
        }
    }

    /// Returns the configuration this pricer uses.
    pub fn config(&self) -> &PricingConfig {
        &self.config
    }
}

#[async_trait]
impl Pricer for StaticPricer {
    async fn price(
        &self,
        items: &[LineItem],
        shipping_address: Option<&ShippingAddress>,
        delivery_tier_index: Option<usize>,
    ) -> Result<PriceBreakdown, PricingError> {
        calculate(&self.config, items, shipping_address, delivery_tier_index)
    }
}

#[async_trait]
impl<P: Pricer + ?Sized> Pricer for Arc<P> {
    async fn price(
        &self,
        items: &[LineItem],
        shipping_address: Option<&ShippingAddress>,
        delivery_tier_index: Option<usize>,
    ) -> Result<PriceBreakdown, PricingError> {
        (**self)
            .price(items, shipping_address, delivery_tier_index)
            .await
    }
}
