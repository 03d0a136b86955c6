//! API error types with HTTP response mapping.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use checkout::{CheckoutError, FieldError};
use domain::{CartError, PricingError};

/// API-level error type that maps to HTTP responses.
#[derive(Debug)]
pub enum ApiError {
    /// Resource not found.
    NotFound(String),
    /// Bad request from the client.
    BadRequest(String),
    /// The caller is not identified.
    Unauthorized(String),
    /// Cart mutation error.
    Cart(CartError),
    /// Order handoff error.
    Checkout(CheckoutError),
    /// Internal server error.
    Internal(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message, errors) = match self {
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, msg, Vec::new()),
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg, Vec::new()),
            ApiError::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, msg, Vec::new()),
            ApiError::Cart(err) => {
                let (status, msg) = cart_error_to_response(err);
                (status, msg, Vec::new())
            }
            ApiError::Checkout(err) => checkout_error_to_response(err),
            ApiError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg, Vec::new()),
        };

        if status.is_server_error() {
            tracing::error!(error = %message, "internal server error");
        }

        let body = if errors.is_empty() {
            serde_json::json!({ "error": message })
        } else {
            serde_json::json!({ "error": message, "errors": errors })
        };
        (status, axum::Json(body)).into_response()
    }
}

fn cart_error_to_response(err: CartError) -> (StatusCode, String) {
    match &err {
        CartError::Busy => (StatusCode::CONFLICT, err.to_string()),
        CartError::OutOfStock { .. }
        | CartError::NotEnoughStock { .. }
        | CartError::InvalidQuantity { .. }
        | CartError::InvalidPrice { .. } => (StatusCode::UNPROCESSABLE_ENTITY, err.to_string()),
        CartError::Pricing(pricing) => pricing_status(pricing, err.to_string()),
        CartError::Store(_) | CartError::Serialization(_) => {
            (StatusCode::INTERNAL_SERVER_ERROR, err.to_string())
        }
    }
}

fn checkout_error_to_response(err: CheckoutError) -> (StatusCode, String, Vec<FieldError>) {
    match err {
        CheckoutError::Validation(errors) => (
            StatusCode::UNPROCESSABLE_ENTITY,
            "Order validation failed".to_string(),
            errors,
        ),
        CheckoutError::Pricing(pricing) => {
            let message = pricing.to_string();
            let (status, message) = pricing_status(&pricing, message);
            (status, message, Vec::new())
        }
        CheckoutError::Cart(cart) => {
            let (status, message) = cart_error_to_response(cart);
            (status, message, Vec::new())
        }
        err @ CheckoutError::Repository(_) => {
            (StatusCode::INTERNAL_SERVER_ERROR, err.to_string(), Vec::new())
        }
    }
}

fn pricing_status(err: &PricingError, message: String) -> (StatusCode, String) {
    match err {
        PricingError::DeliveryTierOutOfRange { .. } | PricingError::AmountOverflow(_) => {
            (StatusCode::UNPROCESSABLE_ENTITY, message)
        }
        PricingError::RateLookup(_) => (StatusCode::BAD_GATEWAY, message),
    }
}

impl From<CartError> for ApiError {
    fn from(err: CartError) -> Self {
        ApiError::Cart(err)
    }
}

impl From<CheckoutError> for ApiError {
    fn from(err: CheckoutError) -> Self {
        ApiError::Checkout(err)
    }
}
