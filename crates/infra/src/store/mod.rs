//! Persistence collaborators for the stock ledger.
//!
//! A [`LedgerStore`] hands out units of work ([`UnitOfWork`]). Everything
//! written through a unit of work becomes visible atomically on `commit`;
//! dropping it (or calling `rollback`) discards every staged write.
//!
//! ## Optimistic concurrency
//!
//! `ProductStore::save` is a compare-and-swap on the product's version: the
//! write only succeeds if the stored version still equals the version the
//! product was loaded with. Otherwise it fails with
//! [`StoreError::VersionConflict`], which callers must not retry.

use std::sync::Arc;

use thiserror::Error;

use stockroom_core::{ProductCode, Version};
use stockroom_inventory::{Movement, NewMovement, Product};

pub mod in_memory;
pub mod postgres;
pub mod retry;

pub use in_memory::InMemoryLedgerStore;
pub use postgres::PostgresLedgerStore;
pub use retry::{RetryPolicy, RetryingStore};

/// Storage operation error.
///
/// These are infrastructure errors, as opposed to domain errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    /// The product changed since it was loaded.
    #[error("version conflict on product {code}: expected {expected}")]
    VersionConflict { code: ProductCode, expected: Version },

    /// The backend could not be reached (pool exhausted, connection refused, timeout).
    #[error("store unavailable: {0}")]
    Unavailable(String),

    #[error("database error: {0}")]
    Database(String),

    /// A stored row could not be mapped back into the domain model.
    #[error("corrupt row: {0}")]
    Corrupt(String),
}

impl StoreError {
    /// Whether the failure is worth retrying outside of a unit of work.
    pub fn is_transient(&self) -> bool {
        matches!(self, StoreError::Unavailable(_))
    }
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Product reads and version-checked writes inside a unit of work.
#[async_trait::async_trait]
pub trait ProductStore: Send {
    /// Load a product together with its current version.
    async fn load_for_update(&mut self, code: ProductCode) -> StoreResult<Option<Product>>;

    /// Persist `product` if the stored version still equals `product.version()`.
    ///
    /// Returns the new version on success.
    async fn save(&mut self, product: &Product) -> StoreResult<Version>;
}

/// Append-only movement writes inside a unit of work.
#[async_trait::async_trait]
pub trait MovementStore: Send {
    /// Append a movement. Returns the storage-assigned internal id.
    async fn append(&mut self, movement: &NewMovement) -> StoreResult<i64>;
}

/// An open atomic unit of work spanning products and movements.
#[async_trait::async_trait]
pub trait UnitOfWork: ProductStore + MovementStore {
    async fn commit(self) -> StoreResult<()>;

    async fn rollback(self) -> StoreResult<()>;
}

/// Entry point to a ledger backend.
///
/// Read methods run outside any unit of work and observe committed state only.
#[async_trait::async_trait]
pub trait LedgerStore: Send + Sync {
    type Tx: UnitOfWork + 'static;

    /// Open a new unit of work.
    async fn begin(&self) -> StoreResult<Self::Tx>;

    async fn find_product(&self, code: ProductCode) -> StoreResult<Option<Product>>;

    /// All products ordered by code.
    async fn list_products(&self) -> StoreResult<Vec<Product>>;

    /// Up to `limit` movements, most recent first (timestamp desc, internal id desc).
    async fn recent_by_product(&self, code: ProductCode, limit: usize) -> StoreResult<Vec<Movement>>;

    /// Every movement of a product in insertion order (oldest first).
    async fn history(&self, code: ProductCode) -> StoreResult<Vec<Movement>>;
}

#[async_trait::async_trait]
impl<S> LedgerStore for Arc<S>
where
    S: LedgerStore + ?Sized,
{
    type Tx = S::Tx;

    async fn begin(&self) -> StoreResult<Self::Tx> {
        (**self).begin().await
    }

    async fn find_product(&self, code: ProductCode) -> StoreResult<Option<Product>> {
        (**self).find_product(code).await
    }

    async fn list_products(&self) -> StoreResult<Vec<Product>> {
        (**self).list_products().await
    }

    async fn recent_by_product(&self, code: ProductCode, limit: usize) -> StoreResult<Vec<Movement>> {
        (**self).recent_by_product(code, limit).await
    }

    async fn history(&self, code: ProductCode) -> StoreResult<Vec<Movement>> {
        (**self).history(code).await
    }
}
