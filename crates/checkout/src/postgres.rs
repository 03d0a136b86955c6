use async_trait::async_trait;
use common::{CustomerId, OrderId};
use sqlx::PgPool;

use crate::error::{CheckoutError, Result};
use crate::order::Order;
use crate::repository::OrderRepository;

/// PostgreSQL-backed order repository.
///
/// Expects the `orders` table from the workspace migrations.
#[derive(Clone)]
pub struct PostgresOrderRepository {
    pool: PgPool,
}

impl PostgresOrderRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    fn decode(document: serde_json::Value) -> Result<Order> {
        serde_json::from_value(document).map_err(|e| {
            CheckoutError::Repository(format!("stored order could not be decoded: {e}"))
        })
    }
}

fn database_error(e: sqlx::Error) -> CheckoutError {
    CheckoutError::Repository(e.to_string())
}

#[async_trait]
impl OrderRepository for PostgresOrderRepository {
    async fn create(&self, order: Order) -> Result<OrderId> {
        let document = serde_json::to_value(&order)
            .map_err(|e| CheckoutError::Repository(format!("order could not be encoded: {e}")))?;

        let inserted = sqlx::query(
            r#"
            INSERT INTO orders (id, customer_id, document, created_at)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (id) DO NOTHING
            "#,
        )
        .bind(order.id.as_uuid())
        .bind(order.customer_id.as_uuid())
        .bind(&document)
        .bind(order.created_at)
        .execute(&self.pool)
        .await
        .map_err(database_error)?;

        if inserted.rows_affected() == 0 {
            return Err(CheckoutError::Repository(format!(
                "order {} already exists",
                order.id
            )));
        }

        tracing::debug!(order_id = %order.id, "order stored");
        Ok(order.id)
    }

    async fn get(&self, id: OrderId) -> Result<Option<Order>> {
        let document: Option<serde_json::Value> =
            sqlx::query_scalar("SELECT document FROM orders WHERE id = $1")
                .bind(id.as_uuid())
                .fetch_optional(&self.pool)
                .await
                .map_err(database_error)?;

        document.map(Self::decode).transpose()
    }

    async fn list_for_customer(&self, customer_id: CustomerId) -> Result<Vec<Order>> {
        let documents: Vec<serde_json::Value> = sqlx::query_scalar(
            r#"
            SELECT document
            FROM orders
            WHERE customer_id = $1
            ORDER BY created_at ASC
            "#,
        )
        .bind(customer_id.as_uuid())
        .fetch_all(&self.pool)
        .await
        .map_err(database_error)?;

        documents.into_iter().map(Self::decode).collect()
    }
}
