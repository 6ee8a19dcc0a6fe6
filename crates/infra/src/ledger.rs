//! Stock movement pipeline (application-level orchestration).
//!
//! ```text
//! MovementRequest
//!   ↓
//! 1. Validate (kind, code, quantity, description); nothing touches storage yet
//!   ↓
//! 2. Open a unit of work and load the product with its version
//!   ↓
//! 3. Plan the movement (balance before/after, fresh public id, UTC timestamp)
//!   ↓
//! 4. Append the movement and save the product conditioned on its version
//!   ↓
//! 5. Commit (any failure in 2-5 rolls back)
//!   ↓
//! 6. Query the recent history of the product
//! ```
//!
//! Version conflicts surface as [`LedgerError::ConcurrencyConflict`] and are
//! never retried here. Dropping the `process_movement` future before the
//! commit completes drops the unit of work, which discards its writes.

use chrono::Utc;
use serde::Serialize;
use thiserror::Error;
use tracing::{error, info, instrument, warn};

use stockroom_core::{DomainError, MovementId, ProductCode};
use stockroom_inventory::{
    AuditReport, Movement, MovementRequest, NewMovement, Product, RECENT_MOVEMENTS_LIMIT,
    ValidatedMovement, audit_chain, sort_most_recent_first,
};

use crate::store::{LedgerStore, StoreError, UnitOfWork};

/// Coarse failure class, used for transport mapping and retry decisions.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCategory {
    Validation,
    NotFound,
    BusinessRule,
    Concurrency,
    Infrastructure,
}

#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("invalid movement type: '{raw}'")]
    InvalidMovementType { raw: String },

    #[error("validation failed: {0}")]
    Validation(String),

    #[error("product {0} not found")]
    ProductNotFound(ProductCode),

    #[error("insufficient stock for product {product_code}: available {available}, requested {requested}")]
    InsufficientStock {
        product_code: ProductCode,
        available: i64,
        requested: i64,
    },

    /// The product changed between load and save.
    #[error("product {product_code} was modified concurrently")]
    ConcurrencyConflict { product_code: ProductCode },

    #[error(transparent)]
    Store(StoreError),
}

impl LedgerError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            LedgerError::InvalidMovementType { .. } | LedgerError::Validation(_) => {
                ErrorCategory::Validation
            }
            LedgerError::ProductNotFound(_) => ErrorCategory::NotFound,
            LedgerError::InsufficientStock { .. } => ErrorCategory::BusinessRule,
            LedgerError::ConcurrencyConflict { .. } => ErrorCategory::Concurrency,
            LedgerError::Store(_) => ErrorCategory::Infrastructure,
        }
    }

    /// Whether resubmitting the same request may succeed.
    pub fn is_retryable(&self) -> bool {
        match self {
            LedgerError::ConcurrencyConflict { .. } => true,
            LedgerError::Store(e) => e.is_transient(),
            _ => false,
        }
    }
}

impl From<DomainError> for LedgerError {
    fn from(value: DomainError) -> Self {
        match value {
            DomainError::Validation(msg) => LedgerError::Validation(msg),
            DomainError::InvalidMovementType { raw } => LedgerError::InvalidMovementType { raw },
            DomainError::ProductNotFound(code) => LedgerError::ProductNotFound(code),
            DomainError::InsufficientStock {
                product_code,
                available,
                requested,
            } => LedgerError::InsufficientStock {
                product_code,
                available,
                requested,
            },
        }
    }
}

impl From<StoreError> for LedgerError {
    fn from(value: StoreError) -> Self {
        match value {
            StoreError::VersionConflict { code, .. } => {
                LedgerError::ConcurrencyConflict { product_code: code }
            }
            other => LedgerError::Store(other),
        }
    }
}

/// Result of an accepted movement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MovementOutcome {
    /// Product as committed, carrying its new version.
    pub product: Product,
    /// The movement that was recorded.
    pub movement: Movement,
    /// Most recent movements of the product, newest first.
    pub recent_movements: Vec<Movement>,
}

/// Orchestrates stock movements against a [`LedgerStore`].
#[derive(Debug, Clone)]
pub struct StockLedger<S> {
    store: S,
    recent_limit: usize,
}

impl<S> StockLedger<S> {
    pub fn new(store: S) -> Self {
        Self {
            store,
            recent_limit: RECENT_MOVEMENTS_LIMIT,
        }
    }

    pub fn with_recent_limit(mut self, limit: usize) -> Self {
        self.recent_limit = limit;
        self
    }

    pub fn store(&self) -> &S {
        &self.store
    }
}

impl<S: LedgerStore> StockLedger<S> {
    /// Record one stock movement atomically and return the refreshed product
    /// with its recent history.
    #[instrument(
        skip(self, request),
        fields(product_code = request.product_code, kind = %request.kind, quantity = request.quantity),
        err
    )]
    pub async fn process_movement(&self, request: &MovementRequest) -> Result<MovementOutcome, LedgerError> {
        let validated = request.validate().map_err(|e| {
            warn!(error = %e, "movement rejected before storage");
            LedgerError::from(e)
        })?;
        let code = validated.product_code;

        let mut tx = self.store.begin().await?;
        let (product, movement) = match apply_movement(&mut tx, &validated).await {
            Ok(applied) => applied,
            Err(e) => {
                if let Err(rb) = tx.rollback().await {
                    error!(error = %rb, "rollback failed");
                }
                log_rejection(&e);
                return Err(e);
            }
        };

        tx.commit().await.map_err(|e| {
            let e = LedgerError::from(e);
            log_rejection(&e);
            e
        })?;

        info!(
            public_id = %movement.public_id,
            balance_before = movement.balance_before,
            balance_after = movement.balance_after,
            version = %product.version(),
            "movement recorded"
        );

        let recent_movements = self
            .store
            .recent_by_product(code, self.recent_limit)
            .await
            .map_err(|e| {
                error!(error = %e, public_id = %movement.public_id, "movement committed but recent history query failed");
                LedgerError::from(e)
            })?;

        Ok(MovementOutcome {
            product,
            movement,
            recent_movements,
        })
    }

    /// All products ordered by code.
    pub async fn list_products(&self) -> Result<Vec<Product>, LedgerError> {
        Ok(self.store.list_products().await?)
    }

    /// Full movement history of a product, most recent first.
    #[instrument(skip(self), fields(product_code = %code), err)]
    pub async fn movement_history(&self, code: ProductCode) -> Result<Vec<Movement>, LedgerError> {
        self.require_product(code).await?;
        let mut movements = self.store.history(code).await?;
        sort_most_recent_first(&mut movements);
        Ok(movements)
    }

    /// Up to the configured limit of movements, most recent first.
    pub async fn recent_movements(&self, code: ProductCode) -> Result<Vec<Movement>, LedgerError> {
        Ok(self.store.recent_by_product(code, self.recent_limit).await?)
    }

    /// Replay a product's history and check it lands on the stored balance.
    #[instrument(skip(self), fields(product_code = %code), err)]
    pub async fn audit_product(&self, code: ProductCode) -> Result<AuditReport, LedgerError> {
        let product = self.require_product(code).await?;
        let history = self.store.history(code).await?;
        let report = audit_chain(&product, &history);
        match &report.discrepancy {
            None => info!(movements = report.movements_checked, "ledger consistent"),
            Some(d) => warn!(discrepancy = ?d, "ledger inconsistent"),
        }
        Ok(report)
    }

    async fn require_product(&self, code: ProductCode) -> Result<Product, LedgerError> {
        self.store
            .find_product(code)
            .await?
            .ok_or(LedgerError::ProductNotFound(code))
    }
}

async fn apply_movement<T: UnitOfWork>(
    tx: &mut T,
    request: &ValidatedMovement,
) -> Result<(Product, Movement), LedgerError> {
    let code = request.product_code;
    let mut product = tx
        .load_for_update(code)
        .await?
        .ok_or_else(|| DomainError::product_not_found(code))?;

    let planned = NewMovement::plan(&product, request, MovementId::new(), Utc::now())?;
    product.set_stock_quantity(planned.balance_after);

    let internal_id = tx.append(&planned).await?;
    let version = tx.save(&product).await?;

    Ok((product.with_version(version), planned.into_stored(internal_id)))
}

fn log_rejection(e: &LedgerError) {
    match e.category() {
        ErrorCategory::Infrastructure => error!(error = %e, "movement rolled back"),
        _ => warn!(error = %e, category = ?e.category(), "movement rejected"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    use tokio::sync::Barrier;

    use stockroom_core::Version;
    use stockroom_inventory::{Discrepancy, MovementKind};

    use crate::store::in_memory::InMemoryUnitOfWork;
    use crate::store::{InMemoryLedgerStore, MovementStore, ProductStore, StoreResult};

    fn code(n: i64) -> ProductCode {
        ProductCode::new(n).unwrap()
    }

    fn request(product_code: i64, kind: &str, quantity: i64) -> MovementRequest {
        MovementRequest {
            product_code,
            kind: kind.to_string(),
            quantity,
            description: None,
        }
    }

    fn ledger() -> StockLedger<InMemoryLedgerStore> {
        StockLedger::new(InMemoryLedgerStore::seeded())
    }

    async fn stock_of<S: LedgerStore>(ledger: &StockLedger<S>, n: i64) -> i64 {
        ledger
            .store()
            .find_product(code(n))
            .await
            .unwrap()
            .unwrap()
            .stock_quantity()
    }

    /// Fault injection around the in-memory store.
    #[derive(Clone, Default)]
    struct Faults {
        fail_save: bool,
        hang_commit: bool,
        barrier: Option<Arc<Barrier>>,
    }

    #[derive(Clone)]
    struct FaultyStore {
        inner: InMemoryLedgerStore,
        faults: Faults,
        begins: Arc<AtomicUsize>,
    }

    impl FaultyStore {
        fn new(faults: Faults) -> Self {
            Self {
                inner: InMemoryLedgerStore::seeded(),
                faults,
                begins: Arc::new(AtomicUsize::new(0)),
            }
        }
    }

    struct FaultyTx {
        inner: InMemoryUnitOfWork,
        faults: Faults,
    }

    #[async_trait::async_trait]
    impl ProductStore for FaultyTx {
        async fn load_for_update(&mut self, code: ProductCode) -> StoreResult<Option<Product>> {
            let product = self.inner.load_for_update(code).await?;
            if let Some(barrier) = &self.faults.barrier {
                barrier.wait().await;
            }
            Ok(product)
        }

        async fn save(&mut self, product: &Product) -> StoreResult<Version> {
            if self.faults.fail_save {
                return Err(StoreError::Database("injected save failure".into()));
            }
            self.inner.save(product).await
        }
    }

    #[async_trait::async_trait]
    impl MovementStore for FaultyTx {
        async fn append(&mut self, movement: &NewMovement) -> StoreResult<i64> {
            self.inner.append(movement).await
        }
    }

    #[async_trait::async_trait]
    impl UnitOfWork for FaultyTx {
        async fn commit(self) -> StoreResult<()> {
            if self.faults.hang_commit {
                std::future::pending::<()>().await;
            }
            self.inner.commit().await
        }

        async fn rollback(self) -> StoreResult<()> {
            self.inner.rollback().await
        }
    }

    #[async_trait::async_trait]
    impl LedgerStore for FaultyStore {
        type Tx = FaultyTx;

        async fn begin(&self) -> StoreResult<Self::Tx> {
            self.begins.fetch_add(1, Ordering::SeqCst);
            Ok(FaultyTx {
                inner: self.inner.begin().await?,
                faults: self.faults.clone(),
            })
        }

        async fn find_product(&self, code: ProductCode) -> StoreResult<Option<Product>> {
            self.inner.find_product(code).await
        }

        async fn list_products(&self) -> StoreResult<Vec<Product>> {
            self.inner.list_products().await
        }

        async fn recent_by_product(&self, code: ProductCode, limit: usize) -> StoreResult<Vec<Movement>> {
            self.inner.recent_by_product(code, limit).await
        }

        async fn history(&self, code: ProductCode) -> StoreResult<Vec<Movement>> {
            self.inner.history(code).await
        }
    }

    #[tokio::test]
    async fn inbound_adds_to_stock() {
        let ledger = ledger();
        let outcome = ledger.process_movement(&request(101, "ENTRADA", 50)).await.unwrap();

        assert_eq!(outcome.product.stock_quantity(), 200);
        assert_eq!(outcome.product.version(), Version::INITIAL.next());
        assert_eq!(outcome.recent_movements.len(), 1);

        let m = &outcome.recent_movements[0];
        assert_eq!(m.kind, MovementKind::Inbound);
        assert_eq!(m.balance_before, 150);
        assert_eq!(m.balance_after, 200);
        assert_eq!(m.public_id, outcome.movement.public_id);
    }

    #[tokio::test]
    async fn outbound_beyond_stock_is_rejected() {
        let ledger = ledger();
        ledger.process_movement(&request(101, "ENTRADA", 50)).await.unwrap();

        let err = ledger
            .process_movement(&request(101, "SAIDA", 10_000))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            LedgerError::InsufficientStock { available: 200, requested: 10_000, .. }
        ));
        assert_eq!(err.category(), ErrorCategory::BusinessRule);
        assert_eq!(stock_of(&ledger, 101).await, 200);
        assert_eq!(ledger.store().movement_count(), 1);
    }

    #[tokio::test]
    async fn adjustment_sets_absolute_balance() {
        let ledger = ledger();
        let outcome = ledger
            .process_movement(&request(101, "inventario", 500))
            .await
            .unwrap();
        assert_eq!(outcome.product.stock_quantity(), 500);
        assert_eq!(outcome.movement.balance_before, 150);
        assert_eq!(outcome.movement.balance_after, 500);
    }

    #[tokio::test]
    async fn unknown_product_is_not_found() {
        let ledger = ledger();
        let err = ledger
            .process_movement(&request(999_999, "ENTRADA", 1))
            .await
            .unwrap_err();
        assert!(matches!(err, LedgerError::ProductNotFound(c) if c.get() == 999_999));
        assert_eq!(err.category(), ErrorCategory::NotFound);
    }

    #[tokio::test]
    async fn invalid_kind_never_reaches_storage() {
        let ledger = StockLedger::new(FaultyStore::new(Faults::default()));
        let err = ledger
            .process_movement(&request(101, "invalido", 5))
            .await
            .unwrap_err();
        assert!(matches!(err, LedgerError::InvalidMovementType { .. }));
        assert_eq!(ledger.store().begins.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn non_positive_quantity_never_reaches_storage() {
        let ledger = StockLedger::new(FaultyStore::new(Faults::default()));
        for q in [0, -10] {
            let err = ledger
                .process_movement(&request(101, "ENTRADA", q))
                .await
                .unwrap_err();
            assert!(matches!(err, LedgerError::Validation(_)));
        }
        assert_eq!(ledger.store().begins.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn failed_save_leaves_no_movement_behind() {
        let ledger = StockLedger::new(FaultyStore::new(Faults {
            fail_save: true,
            ..Faults::default()
        }));
        let err = ledger
            .process_movement(&request(101, "ENTRADA", 50))
            .await
            .unwrap_err();

        assert_eq!(err.category(), ErrorCategory::Infrastructure);
        assert!(!err.is_retryable());
        assert_eq!(ledger.store().inner.movement_count(), 0);
        assert_eq!(stock_of(&ledger, 101).await, 150);
    }

    #[tokio::test]
    async fn concurrent_movements_from_same_version_yield_one_conflict() {
        let ledger = StockLedger::new(FaultyStore::new(Faults {
            barrier: Some(Arc::new(Barrier::new(2))),
            ..Faults::default()
        }));

        let first = request(101, "ENTRADA", 10);
        let second = request(101, "SAIDA", 20);
        let (a, b) = tokio::join!(ledger.process_movement(&first), ledger.process_movement(&second));

        let results = [a, b];
        let ok = results.iter().filter(|r| r.is_ok()).count();
        let conflicts = results
            .iter()
            .filter(|r| matches!(r, Err(LedgerError::ConcurrencyConflict { .. })))
            .count();
        assert_eq!(ok, 1);
        assert_eq!(conflicts, 1);

        let conflict = results.into_iter().find_map(Result::err).unwrap();
        assert!(conflict.is_retryable());
        assert_eq!(conflict.category(), ErrorCategory::Concurrency);

        assert_eq!(ledger.store().inner.movement_count(), 1);
        let audit = ledger.audit_product(code(101)).await.unwrap();
        assert!(audit.is_consistent(), "{audit:?}");
    }

    #[tokio::test]
    async fn dropped_before_commit_rolls_back() {
        let ledger = StockLedger::new(FaultyStore::new(Faults {
            hang_commit: true,
            ..Faults::default()
        }));

        let req = request(101, "ENTRADA", 50);
        let timed_out = tokio::time::timeout(Duration::from_millis(20), ledger.process_movement(&req)).await;
        assert!(timed_out.is_err());

        assert_eq!(ledger.store().inner.movement_count(), 0);
        assert_eq!(stock_of(&ledger, 101).await, 150);
    }

    #[tokio::test]
    async fn recent_history_is_capped_and_newest_first() {
        let ledger = ledger();
        for _ in 0..12 {
            ledger.process_movement(&request(102, "ENTRADA", 1)).await.unwrap();
        }
        let outcome = ledger.process_movement(&request(102, "SAIDA", 7)).await.unwrap();

        assert_eq!(outcome.recent_movements.len(), RECENT_MOVEMENTS_LIMIT);
        assert_eq!(outcome.recent_movements[0].kind, MovementKind::Outbound);
        assert_eq!(outcome.recent_movements[0].balance_after, 75 + 12 - 7);
        assert!(
            outcome
                .recent_movements
                .windows(2)
                .all(|w| (w[0].occurred_at, w[0].internal_id) > (w[1].occurred_at, w[1].internal_id))
        );
    }

    #[tokio::test]
    async fn recent_history_query_is_idempotent() {
        let ledger = ledger();
        ledger.process_movement(&request(103, "SAIDA", 20)).await.unwrap();
        ledger.process_movement(&request(103, "ENTRADA", 5)).await.unwrap();

        let first = ledger.recent_movements(code(103)).await.unwrap();
        let second = ledger.recent_movements(code(103)).await.unwrap();
        assert_eq!(first, second);
        assert_eq!(stock_of(&ledger, 103).await, 185);
    }

    #[tokio::test]
    async fn history_and_audit_follow_the_chain() {
        let ledger = ledger();
        ledger.process_movement(&request(104, "SAIDA", 20)).await.unwrap();
        ledger.process_movement(&request(104, "INVENTARIO", 10)).await.unwrap();
        ledger.process_movement(&request(104, "ENTRADA", 3)).await.unwrap();

        let history = ledger.movement_history(code(104)).await.unwrap();
        assert_eq!(history.len(), 3);
        assert_eq!(history[0].balance_after, 13);
        assert_eq!(history[2].balance_before, 320);

        let report = ledger.audit_product(code(104)).await.unwrap();
        assert!(report.is_consistent());
        assert_eq!(report.movements_checked, 3);
        assert_eq!(report.stock_quantity, 13);
    }

    #[tokio::test]
    async fn audit_checks_chain_against_stored_stock() {
        let drifted = Product::new(code(101), "Caneta Azul", 999, Version::INITIAL);
        let store = InMemoryLedgerStore::with_products([drifted]);
        let ledger = StockLedger::new(store);
        ledger.process_movement(&request(101, "ENTRADA", 1)).await.unwrap();
        assert!(ledger.audit_product(code(101)).await.unwrap().is_consistent());

        let err = ledger.audit_product(code(7)).await.unwrap_err();
        assert!(matches!(err, LedgerError::ProductNotFound(_)));

        // A movement whose chain does not start at the stored balance is caught.
        let report = audit_chain(
            &Product::new(code(101), "Caneta Azul", 5, Version::INITIAL),
            &ledger.store().history(code(101)).await.unwrap(),
        );
        assert!(matches!(report.discrepancy, Some(Discrepancy::StockMismatch { .. })));
    }

    #[tokio::test]
    async fn unknown_product_history_is_not_found() {
        let ledger = ledger();
        let err = ledger.movement_history(code(999_999)).await.unwrap_err();
        assert!(matches!(err, LedgerError::ProductNotFound(_)));
    }

    #[test]
    fn store_errors_map_to_categories() {
        let conflict = LedgerError::from(StoreError::VersionConflict {
            code: code(101),
            expected: Version::INITIAL,
        });
        assert_eq!(conflict.category(), ErrorCategory::Concurrency);

        let unavailable = LedgerError::from(StoreError::Unavailable("down".into()));
        assert_eq!(unavailable.category(), ErrorCategory::Infrastructure);
        assert!(unavailable.is_retryable());
    }
}
