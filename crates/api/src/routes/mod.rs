//! HTTP route handlers.

pub mod cart;
pub mod checkout;
pub mod health;
pub mod metrics;
pub mod pricing;

use cart_store::CartStore;
use ::checkout::{OrderHandoff, OrderRepository};
use domain::StaticPricer;

use crate::sessions::CartSessions;

/// Shared application state accessible from all handlers.
pub struct AppState<S, R>
where
    S: CartStore + Clone,
    R: OrderRepository,
{
    pub sessions: CartSessions<S, StaticPricer>,
    pub handoff: OrderHandoff<StaticPricer, R>,
    pub pricer: StaticPricer,
}
