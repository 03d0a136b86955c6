use async_trait::async_trait;

use crate::{Result, Revision, SessionKey, StoredCart};

/// Options for saving a cart.
#[derive(Debug, Clone, Default)]
pub struct SaveOptions {
    /// Revision the stored cart is expected to be at.
    /// If None, the save overwrites unconditionally.
    pub expected_revision: Option<Revision>,
}

impl SaveOptions {
    /// Creates options with no revision check.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates options expecting the stored cart to be at a specific revision.
    pub fn expect_revision(revision: Revision) -> Self {
        Self {
            expected_revision: Some(revision),
        }
    }

    /// Creates options expecting no cart to be stored yet.
    pub fn expect_new() -> Self {
        Self {
            expected_revision: Some(Revision::initial()),
        }
    }
}

/// Persistence port for session carts.
///
/// Implementations must be thread-safe (Send + Sync). A missing cart counts as
/// being at `Revision::initial()` for the purpose of revision checks.
#[async_trait]
pub trait CartStore: Send + Sync {
    /// Loads the cart stored for a session, if any.
    async fn load(&self, session_key: &SessionKey) -> Result<Option<StoredCart>>;

    /// Saves a cart snapshot, replacing whatever is stored for its session.
    ///
    /// If `options.expected_revision` is set and does not match the stored
    /// revision, fails with `RevisionConflict` and writes nothing.
    ///
    /// Returns the revision now stored.
    async fn save(&self, cart: StoredCart, options: SaveOptions) -> Result<Revision>;

    /// Deletes the cart stored for a session.
    ///
    /// Returns true if a cart was removed.
    async fn delete(&self, session_key: &SessionKey) -> Result<bool>;
}
