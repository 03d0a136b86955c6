//! Registry of per-session cart engines.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use cart_store::{CartStore, SessionKey};
use domain::{CartEngine, CartError, Pricer};
use tokio::sync::RwLock;

/// Bounds on how many engines stay in memory and for how long.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionLimits {
    /// Engines unused for this long are dropped by `evict_idle`.
    pub idle_timeout: Duration,
    /// Opening a session past this many drops the least recently used idle one.
    pub max_sessions: usize,
}

impl Default for SessionLimits {
    fn default() -> Self {
        Self {
            idle_timeout: Duration::from_secs(30 * 60),
            max_sessions: 10_000,
        }
    }
}

struct SessionEntry<S, P>
where
    S: CartStore,
    P: Pricer,
{
    engine: Arc<CartEngine<S, P>>,
    /// Milliseconds since the registry was created.
    last_used: AtomicU64,
}

impl<S, P> SessionEntry<S, P>
where
    S: CartStore,
    P: Pricer,
{
    /// True when no request holds the engine and no mutation is running.
    fn is_idle(&self) -> bool {
        Arc::strong_count(&self.engine) == 1 && !self.engine.is_updating()
    }
}

/// Lazily opens one `CartEngine` per session and hands out shared handles.
///
/// Engines are rehydrated from the store the first time a session is seen,
/// and again after they were evicted. Sessions never share an engine, and an
/// engine a request still holds is never evicted.
pub struct CartSessions<S, P>
where
    S: CartStore + Clone,
    P: Pricer + Clone,
{
    store: S,
    pricer: P,
    limits: SessionLimits,
    started: Instant,
    engines: RwLock<HashMap<SessionKey, SessionEntry<S, P>>>,
}

impl<S, P> CartSessions<S, P>
where
    S: CartStore + Clone,
    P: Pricer + Clone,
{
    pub fn new(store: S, pricer: P) -> Self {
        Self::with_limits(store, pricer, SessionLimits::default())
    }

    pub fn with_limits(store: S, pricer: P, limits: SessionLimits) -> Self {
        Self {
            store,
            pricer,
            limits,
            started: Instant::now(),
            engines: RwLock::new(HashMap::new()),
        }
    }

    fn now_millis(&self) -> u64 {
        u64::try_from(self.started.elapsed().as_millis()).unwrap_or(u64::MAX)
    }

    /// Returns the session's engine, opening it on first use.
    pub async fn get_or_open(&self, key: &SessionKey) -> Result<Arc<CartEngine<S, P>>, CartError> {
        if let Some(entry) = self.engines.read().await.get(key) {
            entry.last_used.store(self.now_millis(), Ordering::Relaxed);
            return Ok(entry.engine.clone());
        }

        let opened =
            CartEngine::open(key.clone(), self.store.clone(), self.pricer.clone()).await?;

        let mut engines = self.engines.write().await;
        if !engines.contains_key(key) && engines.len() >= self.limits.max_sessions {
            evict_least_recent(&mut *engines);
        }

        // A concurrent request may have opened the same session meanwhile; keep the first.
        let now = self.now_millis();
        let entry = engines.entry(key.clone()).or_insert_with(|| SessionEntry {
            engine: Arc::new(opened),
            last_used: AtomicU64::new(now),
        });
        entry.last_used.store(now, Ordering::Relaxed);
        let engine = entry.engine.clone();

        metrics::gauge!("cart_sessions_open").set(engines.len() as f64);
        Ok(engine)
    }

    /// Drops every idle engine unused for longer than the idle timeout.
    ///
    /// Returns the number of engines dropped.
    pub async fn evict_idle(&self) -> usize {
        let cutoff = u64::try_from(self.limits.idle_timeout.as_millis()).unwrap_or(u64::MAX);
        let now = self.now_millis();

        let mut engines = self.engines.write().await;
        let before = engines.len();
        engines.retain(|_, entry| {
            let unused_for = now.saturating_sub(entry.last_used.load(Ordering::Relaxed));
            unused_for < cutoff || !entry.is_idle()
        });
        let evicted = before - engines.len();

        if evicted > 0 {
            metrics::counter!("cart_sessions_evicted_total").increment(evicted as u64);
            tracing::debug!(evicted, open = engines.len(), "evicted idle cart sessions");
        }
        metrics::gauge!("cart_sessions_open").set(engines.len() as f64);
        evicted
    }

    pub async fn len(&self) -> usize {
        self.engines.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.engines.read().await.is_empty()
    }
}

fn evict_least_recent<S, P>(engines: &mut HashMap<SessionKey, SessionEntry<S, P>>)
where
    S: CartStore,
    P: Pricer,
{
    let oldest = engines
        .iter()
        .filter(|(_, entry)| entry.is_idle())
        .min_by_key(|(_, entry)| entry.last_used.load(Ordering::Relaxed))
        .map(|(key, _)| key.clone());

    if let Some(key) = oldest {
        engines.remove(&key);
        metrics::counter!("cart_sessions_evicted_total").increment(1);
        tracing::debug!(session = %key, "evicted least recently used cart session");
    }
}

#[cfg(test)]
mod tests {
    use cart_store::InMemoryCartStore;
    use domain::{LineItem, Money, StaticPricer};

    use super::*;

    fn sessions() -> CartSessions<InMemoryCartStore, StaticPricer> {
        CartSessions::new(InMemoryCartStore::new(), StaticPricer::default())
    }

    fn limited(
        idle_timeout: Duration,
        max_sessions: usize,
    ) -> CartSessions<InMemoryCartStore, StaticPricer> {
        CartSessions::with_limits(
            InMemoryCartStore::new(),
            StaticPricer::default(),
            SessionLimits {
                idle_timeout,
                max_sessions,
            },
        )
    }

    fn mug() -> LineItem {
        LineItem::new("mug", "Mug", Money::from_cents(1250), 1, 5)
    }

    #[tokio::test]
    async fn test_same_session_shares_engine() {
        let sessions = sessions();
        let key = SessionKey::new("s-1");

        let first = sessions.get_or_open(&key).await.unwrap();
        let second = sessions.get_or_open(&key).await.unwrap();

        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(sessions.len().await, 1);
    }

    #[tokio::test]
    async fn test_sessions_are_isolated() {
        let sessions = sessions();
        let a = sessions.get_or_open(&SessionKey::new("a")).await.unwrap();
        let b = sessions.get_or_open(&SessionKey::new("b")).await.unwrap();

        a.add_item(mug(), 1).await.unwrap();

        assert_eq!(a.cart().await.item_count(), 1);
        assert!(b.cart().await.is_empty());
    }

    #[tokio::test]
    async fn test_evicted_session_rehydrates_from_store() {
        let sessions = limited(Duration::ZERO, 100);
        let key = SessionKey::new("s-1");
        sessions
            .get_or_open(&key)
            .await
            .unwrap()
            .add_item(mug(), 2)
            .await
            .unwrap();

        assert_eq!(sessions.evict_idle().await, 1);
        assert!(sessions.is_empty().await);

        let reopened = sessions.get_or_open(&key).await.unwrap();
        assert_eq!(reopened.cart().await.total_quantity(), 2);
    }

    #[tokio::test]
    async fn test_held_engine_is_not_evicted() {
        let sessions = limited(Duration::ZERO, 100);
        let key = SessionKey::new("s-1");
        let held = sessions.get_or_open(&key).await.unwrap();

        assert_eq!(sessions.evict_idle().await, 0);

        let again = sessions.get_or_open(&key).await.unwrap();
        assert!(Arc::ptr_eq(&held, &again));
    }

    #[tokio::test]
    async fn test_recently_used_sessions_survive_idle_eviction() {
        let sessions = limited(Duration::from_secs(3600), 100);
        sessions.get_or_open(&SessionKey::new("s-1")).await.unwrap();

        assert_eq!(sessions.evict_idle().await, 0);
        assert_eq!(sessions.len().await, 1);
    }

    #[tokio::test]
    async fn test_cap_evicts_least_recently_used() {
        let sessions = limited(Duration::from_secs(3600), 2);
        let a = SessionKey::new("a");
        let b = SessionKey::new("b");
        sessions.get_or_open(&a).await.unwrap();
        tokio::time::sleep(Duration::from_millis(5)).await;
        sessions.get_or_open(&b).await.unwrap();
        tokio::time::sleep(Duration::from_millis(5)).await;
        sessions.get_or_open(&a).await.unwrap();
        tokio::time::sleep(Duration::from_millis(5)).await;

        sessions.get_or_open(&SessionKey::new("c")).await.unwrap();

        let engines = sessions.engines.read().await;
        assert_eq!(engines.len(), 2);
        assert!(engines.contains_key(&a));
        assert!(!engines.contains_key(&b));
    }
}
