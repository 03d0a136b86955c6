use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{Revision, SessionKey};

/// A persisted cart snapshot for one session.
///
/// The store treats the cart state as opaque JSON so that it does not depend
/// on the domain crate.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredCart {
    /// The session this cart belongs to.
    pub session_key: SessionKey,

    /// The cart revision captured by this snapshot.
    pub revision: Revision,

    /// When the snapshot was written.
    pub saved_at: DateTime<Utc>,

    /// The serialized cart state.
    pub state: serde_json::Value,
}

impl StoredCart {
    /// Creates a new stored cart from raw JSON state.
    pub fn new(session_key: SessionKey, revision: Revision, state: serde_json::Value) -> Self {
        Self {
            session_key,
            revision,
            saved_at: Utc::now(),
            state,
        }
    }

    /// Creates a stored cart from a serializable state.
    pub fn from_state<T: Serialize>(
        session_key: SessionKey,
        revision: Revision,
        state: &T,
    ) -> Result<Self, serde_json::Error> {
        Ok(Self {
            session_key,
            revision,
            saved_at: Utc::now(),
            state: serde_json::to_value(state)?,
        })
    }

    /// Deserializes the stored state into a concrete type.
    pub fn into_state<T: for<'de> Deserialize<'de>>(self) -> Result<T, serde_json::Error> {
        serde_json::from_value(self.state)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Serialize, Deserialize, PartialEq)]
    struct TestState {
        items: Vec<String>,
        total: i64,
    }

    #[test]
    fn from_state_and_into_state() {
        let original = TestState {
            items: vec!["tee".to_string()],
            total: 1999,
        };

        let stored =
            StoredCart::from_state(SessionKey::new("s-1"), Revision::new(3), &original).unwrap();
        assert_eq!(stored.revision, Revision::new(3));

        let restored: TestState = stored.into_state().unwrap();
        assert_eq!(restored, original);
    }
}
