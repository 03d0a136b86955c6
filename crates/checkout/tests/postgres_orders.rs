//! PostgreSQL order repository tests
//!
//! These tests use a shared PostgreSQL container for efficiency.
//! Run with:
//!
//! ```bash
//! cargo test -p checkout --test postgres_orders -- --test-threads=1
//! ```

use std::sync::Arc;

use checkout::{CheckoutError, Order, OrderRepository, PostgresOrderRepository};
use chrono::{Duration, Utc};
use common::{CustomerId, OrderId};
use domain::{LineItem, Money, ShippingAddress};
use serial_test::serial;
use sqlx::PgPool;
use testcontainers::{ContainerAsync, runners::AsyncRunner};
use testcontainers_modules::postgres::Postgres;
use tokio::sync::OnceCell;

struct ContainerInfo {
    #[allow(dead_code)] // Container must stay alive for tests
    container: ContainerAsync<Postgres>,
    connection_string: String,
}

static CONTAINER: OnceCell<Arc<ContainerInfo>> = OnceCell::const_new();

async fn get_container_info() -> Arc<ContainerInfo> {
    CONTAINER
        .get_or_init(|| async {
            let container = Postgres::default().start().await.unwrap();

            let host = container.get_host().await.unwrap();
            let port = container.get_host_port_ipv4(5432).await.unwrap();

            let connection_string =
                format!("postgres://postgres:postgres@{}:{}/postgres", host, port);

            let temp_pool = PgPool::connect(&connection_string).await.unwrap();

            sqlx::raw_sql(include_str!("../../../migrations/002_create_orders_table.sql"))
                .execute(&temp_pool)
                .await
                .unwrap();

            temp_pool.close().await;

            Arc::new(ContainerInfo {
                container,
                connection_string,
            })
        })
        .await
        .clone()
}

async fn get_test_repository() -> PostgresOrderRepository {
    let info = get_container_info().await;

    let pool = sqlx::postgres::PgPoolOptions::new()
        .max_connections(5)
        .connect(&info.connection_string)
        .await
        .unwrap();

    sqlx::query("TRUNCATE TABLE orders")
        .execute(&pool)
        .await
        .unwrap();

    PostgresOrderRepository::new(pool)
}

fn order(customer_id: CustomerId, minutes_ago: i64) -> Order {
    let created_at = Utc::now() - Duration::minutes(minutes_ago);
    Order {
        id: OrderId::new(),
        customer_id,
        items: vec![LineItem::new("kettle", "Kettle", Money::from_cents(4500), 1, 2)],
        shipping_address: ShippingAddress {
            full_name: "Frances Allen".to_string(),
            street: "4 Compiler Ct".to_string(),
            city: "Peru".to_string(),
            postal_code: "12972".to_string(),
            province: "NY".to_string(),
            phone: "555-0133".to_string(),
            country: "US".to_string(),
        },
        payment_method: "PayPal".to_string(),
        items_price: Money::from_cents(4500),
        shipping_price: Money::zero(),
        tax_price: Money::from_cents(675),
        total_price: Money::from_cents(5175),
        delivery_tier: "Next 5 Days".to_string(),
        expected_delivery_date: created_at + Duration::days(5),
        is_paid: false,
        is_delivered: false,
        created_at,
    }
}

#[tokio::test]
#[serial]
async fn create_and_get_order() {
    let repo = get_test_repository().await;
    let order = order(CustomerId::new(), 0);

    let id = repo.create(order.clone()).await.unwrap();

    assert_eq!(id, order.id);
    assert_eq!(repo.get(id).await.unwrap(), Some(order));
    assert_eq!(repo.get(OrderId::new()).await.unwrap(), None);
}

#[tokio::test]
#[serial]
async fn duplicate_order_is_rejected() {
    let repo = get_test_repository().await;
    let order = order(CustomerId::new(), 0);
    repo.create(order.clone()).await.unwrap();

    let result = repo.create(order).await;

    assert!(matches!(result, Err(CheckoutError::Repository(_))));
}

#[tokio::test]
#[serial]
async fn customer_orders_are_listed_oldest_first() {
    let repo = get_test_repository().await;
    let customer = CustomerId::new();
    let newer = order(customer, 1);
    let older = order(customer, 30);
    repo.create(newer.clone()).await.unwrap();
    repo.create(older.clone()).await.unwrap();
    repo.create(order(CustomerId::new(), 5)).await.unwrap();

    let orders = repo.list_for_customer(customer).await.unwrap();

    assert_eq!(orders, vec![older, newer]);
}
