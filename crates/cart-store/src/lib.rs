pub mod error;
pub mod memory;
pub mod postgres;
pub mod revision;
pub mod store;
pub mod stored;

pub use common::SessionKey;
pub use error::{CartStoreError, Result};
pub use memory::InMemoryCartStore;
pub use postgres::PostgresCartStore;
pub use revision::Revision;
pub use store::{CartStore, SaveOptions};
pub use stored::StoredCart;
