//! Checkout error types.

use domain::{CartError, PricingError};
use serde::Serialize;
use thiserror::Error;

/// A single rule an order violated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldError {
    /// Path of the offending field, e.g. `items[0].quantity`.
    pub field: String,
    pub message: String,
}

impl FieldError {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

impl std::fmt::Display for FieldError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Errors that can occur while placing an order.
#[derive(Debug, Error)]
pub enum CheckoutError {
    /// The order record failed validation; every violation is listed.
    #[error("Order validation failed: {}", join(.0))]
    Validation(Vec<FieldError>),

    /// The proposal could not be repriced.
    #[error("Pricing error: {0}")]
    Pricing(#[from] PricingError),

    /// The order could not be stored or read.
    #[error("Order repository error: {0}")]
    Repository(String),

    /// The cart could not be read or cleared.
    #[error("Cart error: {0}")]
    Cart(#[from] CartError),
}

fn join(errors: &[FieldError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

/// Convenience type alias for checkout results.
pub type Result<T> = std::result::Result<T, CheckoutError>;
