use std::collections::BTreeMap;
use std::sync::{Arc, RwLock};

use stockroom_core::{ProductCode, Version};
use stockroom_inventory::{Movement, NewMovement, Product, seed_catalog, sort_most_recent_first};

use super::{LedgerStore, MovementStore, ProductStore, StoreError, StoreResult, UnitOfWork};

#[derive(Debug, Default)]
struct State {
    products: BTreeMap<ProductCode, Product>,
    movements: Vec<Movement>,
    last_internal_id: i64,
}

fn poisoned() -> StoreError {
    StoreError::Unavailable("lock poisoned".to_string())
}

/// In-memory ledger store.
///
/// Intended for tests/dev. Units of work stage their writes locally and apply
/// them under a single write lock on commit.
#[derive(Debug, Clone, Default)]
pub struct InMemoryLedgerStore {
    state: Arc<RwLock<State>>,
}

impl InMemoryLedgerStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store pre-populated with the default catalog.
    pub fn seeded() -> Self {
        Self::with_products(seed_catalog())
    }

    pub fn with_products(products: impl IntoIterator<Item = Product>) -> Self {
        let state = State {
            products: products.into_iter().map(|p| (p.code(), p)).collect(),
            ..State::default()
        };
        Self {
            state: Arc::new(RwLock::new(state)),
        }
    }

    /// Number of committed movements across all products.
    pub fn movement_count(&self) -> usize {
        self.state.read().map(|s| s.movements.len()).unwrap_or(0)
    }
}

/// Staged writes of one in-memory unit of work.
#[derive(Debug)]
pub struct InMemoryUnitOfWork {
    state: Arc<RwLock<State>>,
    /// Product as it should be stored, keyed by code, with the version it was loaded at.
    staged_products: BTreeMap<ProductCode, (Version, Product)>,
    staged_movements: Vec<Movement>,
}

#[async_trait::async_trait]
impl ProductStore for InMemoryUnitOfWork {
    async fn load_for_update(&mut self, code: ProductCode) -> StoreResult<Option<Product>> {
        if let Some((_, staged)) = self.staged_products.get(&code) {
            return Ok(Some(staged.clone()));
        }
        let state = self.state.read().map_err(|_| poisoned())?;
        Ok(state.products.get(&code).cloned())
    }

    async fn save(&mut self, product: &Product) -> StoreResult<Version> {
        let code = product.code();
        let expected = product.version();

        // A product saved twice in one unit of work keeps its original base version.
        let base = match self.staged_products.get(&code) {
            Some((base, staged)) if staged.version() == expected => *base,
            Some(_) => return Err(StoreError::VersionConflict { code, expected }),
            None => {
                let state = self.state.read().map_err(|_| poisoned())?;
                match state.products.get(&code) {
                    Some(current) if current.version() == expected => expected,
                    _ => return Err(StoreError::VersionConflict { code, expected }),
                }
            }
        };

        let next = expected.next();
        self.staged_products
            .insert(code, (base, product.clone().with_version(next)));
        Ok(next)
    }
}

#[async_trait::async_trait]
impl MovementStore for InMemoryUnitOfWork {
    async fn append(&mut self, movement: &NewMovement) -> StoreResult<i64> {
        // Ids are reserved eagerly; a rolled-back unit of work leaves a gap.
        let internal_id = {
            let mut state = self.state.write().map_err(|_| poisoned())?;
            state.last_internal_id += 1;
            state.last_internal_id
        };
        self.staged_movements
            .push(movement.clone().into_stored(internal_id));
        Ok(internal_id)
    }
}

#[async_trait::async_trait]
impl UnitOfWork for InMemoryUnitOfWork {
    async fn commit(self) -> StoreResult<()> {
        let mut state = self.state.write().map_err(|_| poisoned())?;

        for (code, (base, _)) in &self.staged_products {
            let still_current = state
                .products
                .get(code)
                .is_some_and(|p| p.version() == *base);
            if !still_current {
                return Err(StoreError::VersionConflict {
                    code: *code,
                    expected: *base,
                });
            }
        }

        for (code, (_, product)) in self.staged_products {
            state.products.insert(code, product);
        }
        state.movements.extend(self.staged_movements);
        Ok(())
    }

    async fn rollback(self) -> StoreResult<()> {
        Ok(())
    }
}

#[async_trait::async_trait]
impl LedgerStore for InMemoryLedgerStore {
    type Tx = InMemoryUnitOfWork;

    async fn begin(&self) -> StoreResult<Self::Tx> {
        Ok(InMemoryUnitOfWork {
            state: Arc::clone(&self.state),
            staged_products: BTreeMap::new(),
            staged_movements: Vec::new(),
        })
    }

    async fn find_product(&self, code: ProductCode) -> StoreResult<Option<Product>> {
        let state = self.state.read().map_err(|_| poisoned())?;
        Ok(state.products.get(&code).cloned())
    }

    async fn list_products(&self) -> StoreResult<Vec<Product>> {
        let state = self.state.read().map_err(|_| poisoned())?;
        Ok(state.products.values().cloned().collect())
    }

    async fn recent_by_product(&self, code: ProductCode, limit: usize) -> StoreResult<Vec<Movement>> {
        let mut movements: Vec<Movement> = {
            let state = self.state.read().map_err(|_| poisoned())?;
            state
                .movements
                .iter()
                .filter(|m| m.product_code == code)
                .cloned()
                .collect()
        };
        sort_most_recent_first(&mut movements);
        movements.truncate(limit);
        Ok(movements)
    }

    async fn history(&self, code: ProductCode) -> StoreResult<Vec<Movement>> {
        let mut movements: Vec<Movement> = {
            let state = self.state.read().map_err(|_| poisoned())?;
            state
                .movements
                .iter()
                .filter(|m| m.product_code == code)
                .cloned()
                .collect()
        };
        movements.sort_by_key(|m| m.internal_id);
        Ok(movements)
    }
}
