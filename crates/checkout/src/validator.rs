//! Order validation.
//!
//! Every rule is checked, and all violations are reported together.

use chrono::{DateTime, Utc};
use common::OrderId;
use domain::{LineItem, Money, ShippingAddress};

use crate::error::{CheckoutError, FieldError};
use crate::order::{Order, OrderDraft};

/// Validates a draft and turns it into an unpaid, undelivered order.
pub fn validate_order(draft: OrderDraft, now: DateTime<Utc>) -> Result<Order, CheckoutError> {
    let mut errors = Vec::new();

    if draft.items.is_empty() {
        errors.push(FieldError::new("items", "must not be empty"));
    }
    for (index, item) in draft.items.iter().enumerate() {
        check_item(index, item, &mut errors);
    }

    match &draft.shipping_address {
        Some(address) => check_address(address, &mut errors),
        None => errors.push(FieldError::new("shipping_address", "is required")),
    }

    let payment_method = draft
        .payment_method
        .filter(|method| !method.trim().is_empty());
    if payment_method.is_none() {
        errors.push(FieldError::new("payment_method", "is required"));
    }

    check_price("items_price", draft.items_price, &mut errors);
    check_price("tax_price", draft.tax_price, &mut errors);
    check_price("total_price", draft.total_price, &mut errors);
    match draft.shipping_price {
        Some(price) => check_price("shipping_price", price, &mut errors),
        None => errors.push(FieldError::new(
            "shipping_price",
            "shipping cannot be priced for this order",
        )),
    }

    match draft.expected_delivery_date {
        Some(date) if date <= now => errors.push(FieldError::new(
            "expected_delivery_date",
            "must be in the future",
        )),
        Some(_) => {}
        None => errors.push(FieldError::new("expected_delivery_date", "is required")),
    }

    match (
        errors.is_empty(),
        draft.shipping_address,
        payment_method,
        draft.shipping_price,
        draft.delivery_tier,
        draft.expected_delivery_date,
    ) {
        (
            true,
            Some(shipping_address),
            Some(payment_method),
            Some(shipping_price),
            Some(delivery_tier),
            Some(expected_delivery_date),
        ) => Ok(Order {
            id: OrderId::new(),
            customer_id: draft.customer_id,
            items: draft.items,
            shipping_address,
            payment_method,
            items_price: draft.items_price,
            shipping_price,
            tax_price: draft.tax_price,
            total_price: draft.total_price,
            delivery_tier,
            expected_delivery_date,
            is_paid: false,
            is_delivered: false,
            created_at: now,
        }),
        _ => {
            if errors.is_empty() {
                errors.push(FieldError::new("delivery_tier", "is required"));
            }
            Err(CheckoutError::Validation(errors))
        }
    }
}

fn check_item(index: usize, item: &LineItem, errors: &mut Vec<FieldError>) {
    let field = |name: &str| format!("items[{index}].{name}");

    if item.client_id.as_uuid().is_nil() {
        errors.push(FieldError::new(field("client_id"), "is required"));
    }

    let required = [
        ("product_id", item.product_id.as_str()),
        ("name", item.name.as_str()),
        ("slug", item.slug.as_str()),
        ("category", item.category.as_str()),
        ("image", item.image.as_str()),
    ];
    for (name, value) in required {
        if value.trim().is_empty() {
            errors.push(FieldError::new(field(name), "is required"));
        }
    }

    if item.price.is_negative() {
        errors.push(FieldError::new(field("price"), "must not be negative"));
    }

    if item.quantity == 0 {
        errors.push(FieldError::new(field("quantity"), "must be at least 1"));
    } else if item.quantity > item.count_in_stock {
        errors.push(FieldError::new(
            field("quantity"),
            format!("exceeds stock of {}", item.count_in_stock),
        ));
    }
}

fn check_address(address: &ShippingAddress, errors: &mut Vec<FieldError>) {
    let fields = [
        ("full_name", &address.full_name),
        ("street", &address.street),
        ("city", &address.city),
        ("postal_code", &address.postal_code),
        ("province", &address.province),
        ("phone", &address.phone),
        ("country", &address.country),
    ];

    for (name, value) in fields {
        if value.trim().is_empty() {
            errors.push(FieldError::new(
                format!("shipping_address.{name}"),
                "is required",
            ));
        }
    }
}

fn check_price(field: &str, price: Money, errors: &mut Vec<FieldError>) {
    if price.is_negative() {
        errors.push(FieldError::new(field, "must not be negative"));
    }
}
