//! Storage ports for the order lifecycle manager.
//!
//! The service is written against these traits; adapters (in-memory and
//! PostgreSQL) live in the `storage` crate. Writes to versioned records
//! are optimistic: the adapter must reject a write whose version no longer
//! matches the stored one.

use async_trait::async_trait;
use common::{OrderId, ProductId, StoreId, Version};
use futures_core::future::BoxFuture;
use thiserror::Error;

use crate::client::Client;
use crate::order::{Order, OrderWithClient};
use crate::product::Product;
use crate::store::Store;

/// Errors surfaced by storage adapters.
#[derive(Debug, Error)]
pub enum StorageError {
    /// A version-checked write found a different stored version.
    #[error("version conflict writing {entity} {id}")]
    VersionConflict { entity: &'static str, id: String },

    /// An insert collided with an existing record or unique key.
    #[error("duplicate {entity} {id}")]
    Duplicate { entity: &'static str, id: String },

    /// A record failed to serialize or deserialize.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// The backing engine failed.
    #[error("storage backend error: {0}")]
    Backend(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl StorageError {
    /// Wraps an engine-specific error as a backend failure.
    pub fn backend(err: impl std::error::Error + Send + Sync + 'static) -> Self {
        StorageError::Backend(Box::new(err))
    }
}

/// Result type for storage operations.
pub type StorageResult<T> = std::result::Result<T, StorageError>;

/// Capability set the order lifecycle manager needs from its storage
/// engine. All implementations must be thread-safe.
#[async_trait]
pub trait Storage: Send + Sync {
    /// Transaction handle produced by [`Storage::begin`].
    type Tx: StorageTx;

    /// Opens a transaction covering every write of one logical operation.
    async fn begin(&self) -> StorageResult<Self::Tx>;

    async fn find_store(&self, id: StoreId) -> StorageResult<Option<Store>>;

    /// Returns all orders of a store, each with its client record attached.
    async fn list_orders_for_store(&self, store_id: StoreId)
    -> StorageResult<Vec<OrderWithClient>>;

    /// Fetches one order with its client, regardless of status or store.
    async fn find_order(&self, id: OrderId) -> StorageResult<Option<OrderWithClient>>;

    /// Fetches an order for a status update: matches id and store and
    /// skips cancelled orders entirely.
    async fn find_updatable_order(
        &self,
        id: OrderId,
        store_id: StoreId,
    ) -> StorageResult<Option<Order>>;

    /// Version-checked write of an order's mutable fields. Returns the
    /// bumped version on success.
    async fn update_order(&self, order: &Order) -> StorageResult<Version>;

    async fn insert_store(&self, store: &Store) -> StorageResult<()>;

    async fn insert_product(&self, product: &Product) -> StorageResult<()>;
}

/// Operations available inside one transaction.
///
/// A transaction must be resolved by exactly one of [`StorageTx::commit`]
/// or [`StorageTx::rollback`]; dropping it unresolved must behave like a
/// rollback.
#[async_trait]
pub trait StorageTx: Send {
    async fn find_product(&mut self, id: ProductId) -> StorageResult<Option<Product>>;

    /// Version-checked write of a product's mutable fields. Returns the
    /// bumped version on success.
    async fn save_product(&mut self, product: &Product) -> StorageResult<Version>;

    async fn find_client_by_phone(&mut self, phone: &str) -> StorageResult<Option<Client>>;

    async fn insert_client(&mut self, client: &Client) -> StorageResult<()>;

    async fn insert_order(&mut self, order: &Order) -> StorageResult<()>;

    async fn commit(self) -> StorageResult<()>;

    async fn rollback(self) -> StorageResult<()>;
}

/// Runs `work` inside a storage transaction, committing on success and
/// rolling back on error.
///
/// The transaction is resolved on every exit path; a rollback failure is
/// logged and the original error is returned.
pub async fn with_transaction<S, T, E, F>(storage: &S, work: F) -> Result<T, E>
where
    S: Storage,
    E: From<StorageError>,
    F: for<'tx> FnOnce(&'tx mut S::Tx) -> BoxFuture<'tx, Result<T, E>>,
{
    let mut tx = storage.begin().await?;
    match work(&mut tx).await {
        Ok(value) => {
            tx.commit().await?;
            Ok(value)
        }
        Err(err) => {
            if let Err(rollback_err) = tx.rollback().await {
                tracing::warn!(error = %rollback_err, "transaction rollback failed");
            }
            Err(err)
        }
    }
}
