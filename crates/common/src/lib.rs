//! Identifier types shared across the cart, checkout and API crates.

pub mod types;

pub use types::{CustomerId, OrderId, SessionKey};
