//! Request extractors for the session and customer headers.

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use cart_store::SessionKey;
use common::CustomerId;
use uuid::Uuid;

use crate::error::ApiError;

/// Header carrying the shopper's cart session key.
pub const SESSION_HEADER: &str = "x-cart-session";

/// Header carrying the authenticated customer's ID.
pub const CUSTOMER_HEADER: &str = "x-customer-id";

/// The cart session a request operates on.
#[derive(Debug, Clone)]
pub struct CartSession(pub SessionKey);

impl<S> FromRequestParts<S> for CartSession
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        header_value(parts, SESSION_HEADER)
            .map(|key| Self(SessionKey::new(key)))
            .ok_or_else(|| ApiError::BadRequest(format!("Missing {SESSION_HEADER} header")))
    }
}

/// The customer placing or reading orders.
///
/// Identity is established upstream; this only reads the forwarded ID.
#[derive(Debug, Clone, Copy)]
pub struct Customer(pub CustomerId);

impl<S> FromRequestParts<S> for Customer
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let raw = header_value(parts, CUSTOMER_HEADER)
            .ok_or_else(|| ApiError::Unauthorized(format!("Missing {CUSTOMER_HEADER} header")))?;

        let uuid = Uuid::parse_str(raw)
            .map_err(|e| ApiError::Unauthorized(format!("Invalid {CUSTOMER_HEADER}: {e}")))?;

        Ok(Self(CustomerId::from_uuid(uuid)))
    }
}

fn header_value<'a>(parts: &'a Parts, name: &str) -> Option<&'a str> {
    parts
        .headers
        .get(name)
        .and_then(|value| value.to_str().ok())
        .map(str::trim)
        .filter(|value| !value.is_empty())
}
