use async_trait::async_trait;
use sqlx::{PgPool, Row, postgres::PgRow};

use crate::{
    CartStoreError, Result, Revision, SessionKey, StoredCart,
    store::{CartStore, SaveOptions},
};

/// PostgreSQL-backed cart store.
#[derive(Clone)]
pub struct PostgresCartStore {
    pool: PgPool,
}

impl PostgresCartStore {
    /// Creates a new PostgreSQL cart store.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Gets a reference to the underlying connection pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Runs the database migrations.
    pub async fn run_migrations(&self) -> std::result::Result<(), sqlx::migrate::MigrateError> {
        sqlx::migrate!("../../migrations").run(&self.pool).await
    }

    fn row_to_cart(row: PgRow) -> Result<StoredCart> {
        Ok(StoredCart {
            session_key: SessionKey::new(row.try_get::<String, _>("session_key")?),
            revision: Revision::new(row.try_get("revision")?),
            saved_at: row.try_get("saved_at")?,
            state: row.try_get("state")?,
        })
    }
}

#[async_trait]
impl CartStore for PostgresCartStore {
    async fn load(&self, session_key: &SessionKey) -> Result<Option<StoredCart>> {
        let row = sqlx::query(
            r#"
            SELECT session_key, revision, state, saved_at
            FROM carts
            WHERE session_key = $1
            "#,
        )
        .bind(session_key.as_str())
        .fetch_optional(&self.pool)
        .await?;

        row.map(Self::row_to_cart).transpose()
    }

    async fn save(&self, cart: StoredCart, options: SaveOptions) -> Result<Revision> {
        // Each branch checks the revision and writes in one statement.
        let written = match options.expected_revision {
            None => {
                sqlx::query(
                    r#"
                    INSERT INTO carts (session_key, revision, state, saved_at)
                    VALUES ($1, $2, $3, $4)
                    ON CONFLICT (session_key)
                    DO UPDATE SET revision = EXCLUDED.revision, state = EXCLUDED.state, saved_at = EXCLUDED.saved_at
                    "#,
                )
                .bind(cart.session_key.as_str())
                .bind(cart.revision.as_i64())
                .bind(&cart.state)
                .bind(cart.saved_at)
                .execute(&self.pool)
                .await?
            }
            Some(expected) if expected == Revision::initial() => {
                sqlx::query(
                    r#"
                    INSERT INTO carts (session_key, revision, state, saved_at)
                    VALUES ($1, $2, $3, $4)
                    ON CONFLICT (session_key) DO NOTHING
                    "#,
                )
                .bind(cart.session_key.as_str())
                .bind(cart.revision.as_i64())
                .bind(&cart.state)
                .bind(cart.saved_at)
                .execute(&self.pool)
                .await?
            }
            Some(expected) => {
                sqlx::query(
                    r#"
                    UPDATE carts
                    SET revision = $2, state = $3, saved_at = $4
                    WHERE session_key = $1 AND revision = $5
                    "#,
                )
                .bind(cart.session_key.as_str())
                .bind(cart.revision.as_i64())
                .bind(&cart.state)
                .bind(cart.saved_at)
                .bind(expected.as_i64())
                .execute(&self.pool)
                .await?
            }
        };

        if written.rows_affected() == 0 {
            let expected = options.expected_revision.unwrap_or_default();
            let current: Option<i64> =
                sqlx::query_scalar("SELECT revision FROM carts WHERE session_key = $1")
                    .bind(cart.session_key.as_str())
                    .fetch_optional(&self.pool)
                    .await?;

            return Err(CartStoreError::RevisionConflict {
                session_key: cart.session_key,
                expected,
                actual: Revision::new(current.unwrap_or(0)),
            });
        }

        tracing::debug!(session = %cart.session_key, revision = %cart.revision, "cart saved");
        Ok(cart.revision)
    }

    async fn delete(&self, session_key: &SessionKey) -> Result<bool> {
        let result = sqlx::query("DELETE FROM carts WHERE session_key = $1")
            .bind(session_key.as_str())
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}
