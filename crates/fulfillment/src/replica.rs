//! Replica document store.
//!
//! Keeps JSONB copies of orders and shipment records, one table per logical
//! collection, each document keyed by the source entity's id. Writes are
//! last-write-wins by `last_updated`: a stored document is replaced only
//! when the incoming timestamp is strictly greater, so ties keep the stored
//! version and re-applying a document is a no-op.
//!
//! No transactional guarantees span documents; every upsert is independent.

use std::time::Duration;

use chrono::{DateTime, Utc};
use secrecy::ExposeSecret;
use sqlx::Row;
use sqlx::postgres::{PgPool, PgPoolOptions};
use thiserror::Error;
use tracing::instrument;

/// Errors that can occur during replica-store operations.
#[derive(Debug, Error)]
pub enum ReplicaError {
    /// Database error from sqlx.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Document (de)serialization failed.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Logical collections of the replica store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Collection {
    /// Storefront order snapshots.
    Orders,
    /// Carrier pre-postagem records.
    Shipments,
}

impl Collection {
    /// Backing table name.
    #[must_use]
    pub const fn table(self) -> &'static str {
        match self {
            Self::Orders => "replica_orders",
            Self::Shipments => "replica_shipments",
        }
    }

    /// All collections.
    #[must_use]
    pub const fn all() -> [Self; 2] {
        [Self::Orders, Self::Shipments]
    }
}

/// A stored replica document.
#[derive(Debug, Clone)]
pub struct ReplicaDocument {
    /// Source entity id.
    pub id: String,
    /// Timestamp the last-write-wins rule compares on.
    pub last_updated: DateTime<Utc>,
    /// The replicated document.
    pub doc: serde_json::Value,
}

/// Create a `PostgreSQL` connection pool with sensible defaults.
///
/// # Errors
///
/// Returns `sqlx::Error` if the connection cannot be established.
pub async fn create_pool(database_url: &secrecy::SecretString) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(10)
        .min_connections(2)
        .acquire_timeout(Duration::from_secs(10))
        .connect(database_url.expose_secret())
        .await
}

/// Replica store over a Postgres pool.
#[derive(Clone)]
pub struct ReplicaStore {
    pool: PgPool,
}

impl ReplicaStore {
    /// Wrap an existing pool.
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Connect to the database and wrap the pool.
    ///
    /// # Errors
    ///
    /// Returns an error if the connection cannot be established.
    pub async fn connect(database_url: &secrecy::SecretString) -> Result<Self, ReplicaError> {
        Ok(Self::new(create_pool(database_url).await?))
    }

    /// Create a collection's backing table if it does not exist.
    ///
    /// # Errors
    ///
    /// Returns an error if the statement fails.
    #[instrument(skip(self), fields(collection = collection.table()))]
    pub async fn create_collection(&self, collection: Collection) -> Result<(), ReplicaError> {
        let sql = format!(
            "CREATE TABLE IF NOT EXISTS {} (
                id TEXT PRIMARY KEY,
                last_updated TIMESTAMPTZ NOT NULL,
                doc JSONB NOT NULL
            )",
            collection.table()
        );
        sqlx::query(&sql).execute(&self.pool).await?;
        Ok(())
    }

    /// Drop a collection's backing table.
    ///
    /// # Errors
    ///
    /// Returns an error if the statement fails.
    #[instrument(skip(self), fields(collection = collection.table()))]
    pub async fn drop_collection(&self, collection: Collection) -> Result<(), ReplicaError> {
        let sql = format!("DROP TABLE IF EXISTS {}", collection.table());
        sqlx::query(&sql).execute(&self.pool).await?;
        Ok(())
    }

    /// Upsert a document under last-write-wins.
    ///
    /// Returns `true` when the write was applied - a fresh insert, or a
    /// replacement where `last_updated` is strictly greater than the stored
    /// timestamp. Equal or older timestamps leave the stored document
    /// untouched and return `false`.
    ///
    /// # Errors
    ///
    /// Returns an error if the statement fails.
    #[instrument(skip(self, doc), fields(collection = collection.table(), id = %id))]
    pub async fn upsert(
        &self,
        collection: Collection,
        id: &str,
        last_updated: DateTime<Utc>,
        doc: &serde_json::Value,
    ) -> Result<bool, ReplicaError> {
        let sql = format!(
            "INSERT INTO {table} (id, last_updated, doc)
             VALUES ($1, $2, $3)
             ON CONFLICT (id) DO UPDATE
             SET last_updated = EXCLUDED.last_updated, doc = EXCLUDED.doc
             WHERE EXCLUDED.last_updated > {table}.last_updated",
            table = collection.table()
        );
        let result = sqlx::query(&sql)
            .bind(id)
            .bind(last_updated)
            .bind(doc)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// List every document in a collection.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    #[instrument(skip(self), fields(collection = collection.table()))]
    pub async fn list(&self, collection: Collection) -> Result<Vec<ReplicaDocument>, ReplicaError> {
        let sql = format!(
            "SELECT id, last_updated, doc FROM {} ORDER BY id",
            collection.table()
        );
        let rows = sqlx::query(&sql).fetch_all(&self.pool).await?;

        rows.into_iter()
            .map(|row| {
                Ok(ReplicaDocument {
                    id: row.try_get("id")?,
                    last_updated: row.try_get("last_updated")?,
                    doc: row.try_get("doc")?,
                })
            })
            .collect::<Result<_, sqlx::Error>>()
            .map_err(ReplicaError::Database)
    }
}
