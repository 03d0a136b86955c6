//! Order repository port and in-memory implementation.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use common::{CustomerId, OrderId};
use tokio::sync::RwLock;

use crate::error::{CheckoutError, Result};
use crate::order::Order;

/// Trait for storing placed orders.
#[async_trait]
pub trait OrderRepository: Send + Sync {
    /// Stores a new order and returns its ID.
    async fn create(&self, order: Order) -> Result<OrderId>;

    /// Loads an order by ID.
    async fn get(&self, id: OrderId) -> Result<Option<Order>>;

    /// Lists a customer's orders, oldest first.
    async fn list_for_customer(&self, customer_id: CustomerId) -> Result<Vec<Order>>;
}

/// In-memory order repository for tests and single-node deployments.
#[derive(Clone, Default)]
pub struct InMemoryOrderRepository {
    orders: Arc<RwLock<HashMap<OrderId, Order>>>,
    fail_on_create: Arc<AtomicBool>,
}

impl InMemoryOrderRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Configures the repository to fail every create call.
    pub fn set_fail_on_create(&self, fail: bool) {
        self.fail_on_create.store(fail, Ordering::SeqCst);
    }

    pub async fn order_count(&self) -> usize {
        self.orders.read().await.len()
    }
}

#[async_trait]
impl OrderRepository for InMemoryOrderRepository {
    async fn create(&self, order: Order) -> Result<OrderId> {
        if self.fail_on_create.load(Ordering::SeqCst) {
            return Err(CheckoutError::Repository(
                "in-memory repository configured to fail".to_string(),
            ));
        }

        let mut orders = self.orders.write().await;
        if orders.contains_key(&order.id) {
            return Err(CheckoutError::Repository(format!(
                "order {} already exists",
                order.id
            )));
        }

        let id = order.id;
        orders.insert(id, order);
        Ok(id)
    }

    async fn get(&self, id: OrderId) -> Result<Option<Order>> {
        Ok(self.orders.read().await.get(&id).cloned())
    }

    async fn list_for_customer(&self, customer_id: CustomerId) -> Result<Vec<Order>> {
        let mut orders: Vec<Order> = self
            .orders
            .read()
            .await
            .values()
            .filter(|order| order.customer_id == customer_id)
            .cloned()
            .collect();
        orders.sort_by_key(|order| order.created_at);
        Ok(orders)
    }
}
