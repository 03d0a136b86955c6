//! Integration tests for the order handoff.
//!
//! These tests place orders from carts built through the cart engine and
//! verify that only server-computed totals reach the order record.

use cart_store::{InMemoryCartStore, SessionKey};
use chrono::{Duration, Utc};
use checkout::{CheckoutError, CheckoutRequest, InMemoryOrderRepository, OrderHandoff, OrderRepository};
use common::CustomerId;
use domain::{
    Cart, CartEngine, CartError, LineItem, Money, PriceBreakdown, Pricer, PricingError,
    ShippingAddress, StaticPricer,
};

type Handoff = OrderHandoff<StaticPricer, InMemoryOrderRepository>;
type Engine = CartEngine<InMemoryCartStore, StaticPricer>;

fn handoff() -> Handoff {
    OrderHandoff::new(StaticPricer::default(), InMemoryOrderRepository::new())
}

fn engine() -> Engine {
    CartEngine::new(
        SessionKey::generate(),
        InMemoryCartStore::new(),
        StaticPricer::default(),
    )
}

fn lamp() -> LineItem {
    LineItem::new("lamp", "Desk Lamp", Money::from_cents(2999), 1, 3)
}

fn address() -> ShippingAddress {
    ShippingAddress {
        full_name: "Barbara Liskov".to_string(),
        street: "32 Vassar St".to_string(),
        city: "Cambridge".to_string(),
        postal_code: "02139".to_string(),
        province: "MA".to_string(),
        phone: "555-0177".to_string(),
        country: "US".to_string(),
    }
}

async fn ready_engine() -> Engine {
    let engine = engine();
    engine.add_item(lamp(), 1).await.unwrap();
    engine.set_shipping_address(address()).await.unwrap();
    engine.set_payment_method("PayPal").await.unwrap();
    engine
}

mod place_order {
    use super::*;

    #[tokio::test]
    async fn tampered_totals_are_ignored() {
        let handoff = handoff();
        let engine = ready_engine().await;

        let mut json = serde_json::to_value(engine.cart().await).unwrap();
        let breakdown = &mut json["pricing"]["breakdown"];
        breakdown["items_price"] = serde_json::json!(1);
        breakdown["tax_price"] = serde_json::json!(0);
        breakdown["total_price"] = serde_json::json!(1);
        let tampered: Cart = serde_json::from_value(json).unwrap();
        assert_eq!(tampered.totals().total_price, Money::from_cents(1));

        let order = handoff
            .place_order(CustomerId::new(), CheckoutRequest::from_cart(&tampered))
            .await
            .unwrap();

        // 2999 + 490 shipping + 450 tax (449.85 rounded)
        assert_eq!(order.items_price, Money::from_cents(2999));
        assert_eq!(order.shipping_price, Money::from_cents(490));
        assert_eq!(order.tax_price, Money::from_cents(450));
        assert_eq!(order.total_price, Money::from_cents(3939));
    }

    #[tokio::test]
    async fn client_totals_in_request_body_are_dropped() {
        let handoff = handoff();
        let body = serde_json::json!({
            "items": [lamp()],
            "shipping_address": address(),
            "payment_method": "Stripe",
            "delivery_tier_index": 0,
            "total_price": 1,
        });
        let request: CheckoutRequest = serde_json::from_value(body).unwrap();

        let order = handoff
            .place_order(CustomerId::new(), request)
            .await
            .unwrap();

        assert_eq!(order.delivery_tier, "Tomorrow");
        assert_eq!(order.total_price, Money::from_cents(2999 + 1290 + 450));
    }

    #[tokio::test]
    async fn order_is_stored_unpaid_with_delivery_date() {
        let handoff = handoff();
        let engine = ready_engine().await;
        let customer = CustomerId::new();
        let before = Utc::now();

        let order = handoff
            .place_order(customer, CheckoutRequest::from_cart(&engine.cart().await))
            .await
            .unwrap();

        assert!(!order.is_paid);
        assert!(!order.is_delivered);
        assert_eq!(order.customer_id, customer);
        assert_eq!(order.delivery_tier, "Next 5 Days");
        assert!(order.expected_delivery_date >= before + Duration::days(5));
        assert!(order.expected_delivery_date <= Utc::now() + Duration::days(5));

        let stored = handoff.repository().get(order.id).await.unwrap();
        assert_eq!(stored, Some(order.clone()));
        assert_eq!(
            handoff.repository().list_for_customer(customer).await.unwrap(),
            vec![order]
        );
    }

    #[tokio::test]
    async fn incomplete_cart_is_rejected_with_all_violations() {
        let handoff = handoff();
        let engine = engine();
        engine.add_item(lamp(), 1).await.unwrap();

        let result = handoff
            .place_order(CustomerId::new(), CheckoutRequest::from_cart(&engine.cart().await))
            .await;

        let Err(CheckoutError::Validation(errors)) = result else {
            panic!("expected validation failure");
        };
        let fields: Vec<_> = errors.iter().map(|e| e.field.as_str()).collect();
        assert_eq!(fields, vec!["shipping_address", "payment_method", "shipping_price"]);
        assert_eq!(handoff.repository().order_count().await, 0);
    }

    #[tokio::test]
    async fn stock_is_rechecked() {
        let handoff = handoff();
        let mut request = CheckoutRequest::from_cart(&ready_engine().await.cart().await);
        request.items[0].quantity = 4;

        let result = handoff.place_order(CustomerId::new(), request).await;

        let Err(CheckoutError::Validation(errors)) = result else {
            panic!("expected validation failure");
        };
        assert_eq!(errors[0].field, "items[0].quantity");
    }

    #[tokio::test]
    async fn unknown_delivery_tier_is_a_pricing_error() {
        let handoff = handoff();
        let mut request = CheckoutRequest::from_cart(&ready_engine().await.cart().await);
        request.delivery_tier_index = Some(9);

        let result = handoff.place_order(CustomerId::new(), request).await;

        assert!(matches!(result, Err(CheckoutError::Pricing(_))));
    }
}

mod checkout_flow {
    use super::*;

    #[tokio::test]
    async fn checkout_places_order_and_clears_cart() {
        let handoff = handoff();
        let engine = ready_engine().await;

        let order = handoff.checkout(CustomerId::new(), &engine).await.unwrap();

        assert_eq!(order.items.len(), 1);
        let cart = engine.cart().await;
        assert!(cart.is_empty());
        assert_eq!(cart.totals().total_price, Money::zero());
        assert_eq!(cart.shipping_address(), Some(&address()));
    }

    #[tokio::test]
    async fn failed_checkout_keeps_cart() {
        let handoff = handoff();
        handoff.repository().set_fail_on_create(true);
        let engine = ready_engine().await;

        let result = handoff.checkout(CustomerId::new(), &engine).await;

        assert!(matches!(result, Err(CheckoutError::Repository(_))));
        assert_eq!(engine.cart().await.item_count(), 1);
    }

    /// Pricer that yields once before pricing, so joined checkouts interleave.
    #[derive(Default)]
    struct YieldingPricer(StaticPricer);

    #[async_trait::async_trait]
    impl Pricer for YieldingPricer {
        async fn price(
            &self,
            items: &[LineItem],
            shipping_address: Option<&ShippingAddress>,
            delivery_tier_index: Option<usize>,
        ) -> Result<PriceBreakdown, PricingError> {
            tokio::task::yield_now().await;
            self.0.price(items, shipping_address, delivery_tier_index).await
        }
    }

    #[tokio::test]
    async fn concurrent_checkouts_place_one_order() {
        let handoff = OrderHandoff::new(YieldingPricer::default(), InMemoryOrderRepository::new());
        let engine = ready_engine().await;
        let customer = CustomerId::new();

        let (first, second) = tokio::join!(
            handoff.checkout(customer, &engine),
            handoff.checkout(customer, &engine)
        );

        let busy = [&first, &second]
            .into_iter()
            .filter(|result| matches!(result, Err(CheckoutError::Cart(CartError::Busy))))
            .count();
        assert!(first.is_ok() || second.is_ok());
        assert_eq!(busy, 1);
        assert_eq!(handoff.repository().order_count().await, 1);
        assert!(engine.cart().await.is_empty());
    }

    #[tokio::test]
    async fn edit_during_checkout_is_rejected() {
        let handoff = OrderHandoff::new(YieldingPricer::default(), InMemoryOrderRepository::new());
        let engine = ready_engine().await;

        let (order, edit) = tokio::join!(
            handoff.checkout(CustomerId::new(), &engine),
            engine.add_item(lamp(), 1)
        );

        assert_eq!(order.unwrap().items[0].quantity, 1);
        assert!(matches!(edit, Err(CartError::Busy)));
        assert!(engine.cart().await.is_empty());
    }
}
