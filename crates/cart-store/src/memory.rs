use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::{
    CartStoreError, Result, Revision, SessionKey, StoredCart,
    store::{CartStore, SaveOptions},
};

/// In-memory cart store for tests and single-process deployments.
///
/// Cloning yields another handle onto the same carts.
#[derive(Clone, Default)]
pub struct InMemoryCartStore {
    carts: Arc<RwLock<HashMap<SessionKey, StoredCart>>>,
    fail_on_save: Arc<AtomicBool>,
}

impl InMemoryCartStore {
    /// Creates a new empty in-memory cart store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of stored carts.
    pub async fn len(&self) -> usize {
        self.carts.read().await.len()
    }

    /// Returns true if no carts are stored.
    pub async fn is_empty(&self) -> bool {
        self.carts.read().await.is_empty()
    }

    /// Removes all stored carts.
    pub async fn clear(&self) {
        self.carts.write().await.clear();
    }

    /// Makes subsequent saves fail as if the storage were unreachable.
    pub fn set_fail_on_save(&self, fail: bool) {
        self.fail_on_save.store(fail, Ordering::SeqCst);
    }
}

#[async_trait]
impl CartStore for InMemoryCartStore {
    async fn load(&self, session_key: &SessionKey) -> Result<Option<StoredCart>> {
        Ok(self.carts.read().await.get(session_key).cloned())
    }

    async fn save(&self, cart: StoredCart, options: SaveOptions) -> Result<Revision> {
        if self.fail_on_save.load(Ordering::SeqCst) {
            return Err(CartStoreError::Unavailable(
                "in-memory store configured to fail".to_string(),
            ));
        }

        let mut carts = self.carts.write().await;

        let current = carts
            .get(&cart.session_key)
            .map(|stored| stored.revision)
            .unwrap_or(Revision::initial());

        if let Some(expected) = options.expected_revision
            && current != expected
        {
            return Err(CartStoreError::RevisionConflict {
                session_key: cart.session_key,
                expected,
                actual: current,
            });
        }

        let revision = cart.revision;
        carts.insert(cart.session_key.clone(), cart);
        Ok(revision)
    }

    async fn delete(&self, session_key: &SessionKey) -> Result<bool> {
        Ok(self.carts.write().await.remove(session_key).is_some())
    }
}
