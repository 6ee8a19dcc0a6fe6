//! Infrastructure layer: ledger storage backends and the movement pipeline.

pub mod ledger;
pub mod store;

pub use ledger::{ErrorCategory, LedgerError, MovementOutcome, StockLedger};
pub use store::{
    InMemoryLedgerStore, LedgerStore, MovementStore, PostgresLedgerStore, ProductStore,
    RetryPolicy, RetryingStore, StoreError, StoreResult, UnitOfWork,
};
