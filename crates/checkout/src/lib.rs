//! Order handoff for the storefront cart.
//!
//! The client's cart is treated as an untrusted proposal. At checkout the
//! handoff:
//! 1. Reprices the proposed items, destination and delivery tier
//! 2. Validates the resulting order record
//! 3. Persists the order through the `OrderRepository` port
//!
//! Totals carried by the client cart are never written to the order.

pub mod error;
pub mod handoff;
pub mod order;
pub mod postgres;
pub mod repository;
pub mod validator;

pub use error::{CheckoutError, FieldError};
pub use handoff::{CheckoutRequest, OrderHandoff};
pub use order::{Order, OrderDraft};
pub use postgres::PostgresOrderRepository;
pub use repository::{InMemoryOrderRepository, OrderRepository};
pub use validator::validate_order;
