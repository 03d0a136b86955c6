//! Cart engine: serialized, repricing mutations over one session's cart.

use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Instant;

use cart_store::{CartStore, Revision, SaveOptions, SessionKey, StoredCart};
use tokio::sync::RwLock;

use crate::pricing::Pricer;

use super::{Cart, CartChange, CartError, ClientId, ItemKey, LineItem, ShippingAddress};

/// Outcome of writing a committed cart through the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Persistence {
    /// The cart was stored at this revision.
    Saved(Revision),
    /// The write failed; the in-memory cart still holds the change.
    Failed(String),
    /// Nothing changed, so nothing was written.
    Skipped,
}

/// Result of a cart mutation.
#[derive(Debug, Clone)]
pub struct CartUpdate {
    /// The cart after the mutation.
    pub cart: Cart,

    /// The change that was applied, if any.
    pub change: Option<CartChange>,

    /// Whether the new cart reached the store.
    pub persistence: Persistence,
}

impl CartUpdate {
    /// Returns the client ID of the line an add created or merged into.
    pub fn client_id(&self) -> Option<ClientId> {
        self.change.as_ref().and_then(CartChange::client_id)
    }

    pub fn is_persisted(&self) -> bool {
        matches!(self.persistence, Persistence::Saved(_))
    }
}

struct EngineState {
    cart: Cart,
    /// Revision last confirmed by the store; the next save expects it.
    persisted_revision: Revision,
}

/// Clears the busy flag when dropped, on every exit path.
struct UpdateGuard<'a> {
    flag: &'a AtomicBool,
}

impl Drop for UpdateGuard<'_> {
    fn drop(&mut self) {
        self.flag.store(false, Ordering::Release);
    }
}

/// Owns one session's cart and serializes every mutation on it.
///
/// A mutation attempted while another is in flight fails immediately with
/// `CartError::Busy`; nothing is queued. Every change to items, shipping
/// address or delivery tier reprices the cart before it is committed, and
/// every committed cart is written through the store. Store failures are
/// reported on the returned `CartUpdate` but never undo the in-memory change.
pub struct CartEngine<S, P>
where
    S: CartStore,
    P: Pricer,
{
    session_key: SessionKey,
    store: S,
    pricer: P,
    state: RwLock<EngineState>,
    updating: AtomicBool,
}

impl<S, P> CartEngine<S, P>
where
    S: CartStore,
    P: Pricer,
{
    /// Creates an engine over an empty cart without consulting the store.
    pub fn new(session_key: SessionKey, store: S, pricer: P) -> Self {
        Self::with_state(session_key, store, pricer, Cart::default(), Revision::initial())
    }

    /// Opens the session's cart, rehydrating it from the store.
    ///
    /// A session with no stored cart starts empty.
    #[tracing::instrument(skip(store, pricer))]
    pub async fn open(session_key: SessionKey, store: S, pricer: P) -> Result<Self, CartError> {
        let (cart, revision) = load_cart(&store, &session_key).await?;
        tracing::debug!(revision = %revision, items = cart.item_count(), "cart opened");
        Ok(Self::with_state(session_key, store, pricer, cart, revision))
    }

    fn with_state(
        session_key: SessionKey,
        store: S,
        pricer: P,
        cart: Cart,
        persisted_revision: Revision,
    ) -> Self {
        Self {
            session_key,
            store,
            pricer,
            state: RwLock::new(EngineState {
                cart,
                persisted_revision,
            }),
            updating: AtomicBool::new(false),
        }
    }

    pub fn session_key(&self) -> &SessionKey {
        &self.session_key
    }

    /// Returns true while a mutation is in flight.
    pub fn is_updating(&self) -> bool {
        self.updating.load(Ordering::Acquire)
    }

    /// Returns a snapshot of the current cart.
    pub async fn cart(&self) -> Cart {
        self.state.read().await.cart.clone()
    }

    /// Adds `quantity` units of an item, merging into a matching line.
    #[tracing::instrument(skip(self, item), fields(session = %self.session_key, product = %item.product_id))]
    pub async fn add_item(&self, item: LineItem, quantity: u32) -> Result<CartUpdate, CartError> {
        self.execute("add_item", |cart| cart.add_item(item, quantity).map(Some))
            .await
    }

    /// Replaces the quantity of the line matching `item`.
    ///
    /// Does nothing if no line matches.
    #[tracing::instrument(skip(self, item), fields(session = %self.session_key, product = %item.product_id))]
    pub async fn update_item(
        &self,
        item: &LineItem,
        quantity: u32,
    ) -> Result<CartUpdate, CartError> {
        self.execute("update_item", |cart| cart.update_item(item, quantity))
            .await
    }

    #[tracing::instrument(skip(self), fields(session = %self.session_key))]
    pub async fn remove_item(&self, key: &ItemKey) -> Result<CartUpdate, CartError> {
        self.execute("remove_item", |cart| Ok(Some(cart.remove_item(key))))
            .await
    }

    #[tracing::instrument(skip(self, address), fields(session = %self.session_key))]
    pub async fn set_shipping_address(
        &self,
        address: ShippingAddress,
    ) -> Result<CartUpdate, CartError> {
        self.execute("set_shipping_address", |cart| {
            Ok(Some(cart.set_shipping_address(address)))
        })
        .await
    }

    #[tracing::instrument(skip(self, method), fields(session = %self.session_key))]
    pub async fn set_payment_method(
        &self,
        method: impl Into<String>,
    ) -> Result<CartUpdate, CartError> {
        let method = method.into();
        self.execute("set_payment_method", |cart| {
            Ok(Some(cart.set_payment_method(method)))
        })
        .await
    }

    #[tracing::instrument(skip(self), fields(session = %self.session_key))]
    pub async fn set_delivery_tier_index(&self, index: usize) -> Result<CartUpdate, CartError> {
        self.execute("set_delivery_tier_index", |cart| {
            Ok(Some(cart.select_delivery_tier(index)))
        })
        .await
    }

    /// Empties the cart and zeroes its totals.
    #[tracing::instrument(skip(self), fields(session = %self.session_key))]
    pub async fn clear_cart(&self) -> Result<CartUpdate, CartError> {
        self.execute("clear_cart", |cart| Ok(Some(cart.clear())))
            .await
    }

    /// Hands the current cart to `place`, then clears the cart if it succeeded.
    ///
    /// The busy flag is held from the snapshot until the clear is committed,
    /// so a second checkout or any edit made meanwhile fails with
    /// `CartError::Busy` instead of being ordered twice or silently wiped.
    /// A failing `place` leaves the cart untouched.
    #[tracing::instrument(skip(self, place), fields(session = %self.session_key))]
    pub async fn checkout_with<F, Fut, T, E>(&self, place: F) -> Result<(T, CartUpdate), E>
    where
        F: FnOnce(Cart) -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: From<CartError>,
    {
        let _guard = self.begin_update("checkout")?;

        let snapshot = self.state.read().await.cart.clone();
        let placed = place(snapshot).await?;

        let cleared = self
            .commit_change("checkout", |cart| Ok(Some(cart.clear())))
            .await?;
        Ok((placed, cleared))
    }

    /// Replaces the in-memory cart with the stored one.
    ///
    /// Used after another device moved the stored revision ahead.
    #[tracing::instrument(skip(self), fields(session = %self.session_key))]
    pub async fn reload(&self) -> Result<Cart, CartError> {
        let _guard = self.begin_update("reload")?;
        let (cart, revision) = load_cart(&self.store, &self.session_key).await?;

        let mut state = self.state.write().await;
        state.cart = cart.clone();
        state.persisted_revision = revision;
        Ok(cart)
    }

    fn begin_update(&self, operation: &'static str) -> Result<UpdateGuard<'_>, CartError> {
        if self
            .updating
            .compare_exchange(false, true, Ordering::Acquire, Ordering::Relaxed)
            .is_err()
        {
            tracing::debug!(operation, "cart busy, rejecting update");
            metrics::counter!("cart_busy_rejections_total").increment(1);
            return Err(CartError::Busy);
        }

        Ok(UpdateGuard {
            flag: &self.updating,
        })
    }

    async fn execute<F>(&self, operation: &'static str, decide: F) -> Result<CartUpdate, CartError>
    where
        F: FnOnce(&Cart) -> Result<Option<CartChange>, CartError>,
    {
        let _guard = self.begin_update(operation)?;
        self.commit_change(operation, decide).await
    }

    /// Decides a change against the current cart, applies it to a copy,
    /// reprices the copy if needed, then commits and persists it.
    ///
    /// Callers must hold the busy flag.
    async fn commit_change<F>(
        &self,
        operation: &'static str,
        decide: F,
    ) -> Result<CartUpdate, CartError>
    where
        F: FnOnce(&Cart) -> Result<Option<CartChange>, CartError>,
    {
        let current = self.state.read().await.cart.clone();

        let Some(change) = decide(&current)? else {
            return Ok(CartUpdate {
                cart: current,
                change: None,
                persistence: Persistence::Skipped,
            });
        };

        let mut next = current;
        next.apply(change.clone());

        if change.reprices() {
            let started = Instant::now();
            let breakdown = self
                .pricer
                .price(
                    next.items(),
                    next.shipping_address(),
                    next.delivery_tier_index(),
                )
                .await?;
            metrics::histogram!("cart_pricing_duration_seconds")
                .record(started.elapsed().as_secs_f64());
            next.apply_pricing(breakdown);
        }

        let expected = {
            let mut state = self.state.write().await;
            next.set_revision(state.cart.revision().next());
            state.cart = next.clone();
            state.persisted_revision
        };

        metrics::counter!("cart_mutations_total", "operation" => operation).increment(1);
        tracing::debug!(
            change = change.kind(),
            revision = %next.revision(),
            total = %next.totals().total_price,
            "cart updated"
        );

        let persistence = self.persist(&next, expected).await;

        Ok(CartUpdate {
            cart: next,
            change: Some(change),
            persistence,
        })
    }

    async fn persist(&self, cart: &Cart, expected: Revision) -> Persistence {
        let saved = match StoredCart::from_state(self.session_key.clone(), cart.revision(), cart)
        {
            Ok(stored) => {
                self.store
                    .save(stored, SaveOptions::expect_revision(expected))
                    .await
            }
            Err(e) => Err(e.into()),
        };

        match saved {
            Ok(revision) => {
                self.state.write().await.persisted_revision = revision;
                Persistence::Saved(revision)
            }
            Err(e) => {
                tracing::warn!(
                    error = %e,
                    revision = %cart.revision(),
                    "failed to persist cart, keeping in-memory state"
                );
                metrics::counter!("cart_persistence_failures_total").increment(1);
                Persistence::Failed(e.to_string())
            }
        }
    }
}

async fn load_cart<S: CartStore>(
    store: &S,
    session_key: &SessionKey,
) -> Result<(Cart, Revision), CartError> {
    match store.load(session_key).await? {
        Some(stored) => {
            let revision = stored.revision;
            let mut cart: Cart = stored.into_state()?;
            cart.set_revision(revision);
            Ok((cart, revision))
        }
        None => Ok((Cart::default(), Revision::initial())),
    }
}
