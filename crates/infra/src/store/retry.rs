//! Retry of transient store failures at the collaborator boundary.
//!
//! Only operations that are safe to repeat are retried: opening a unit of
//! work and read-only queries. Writes inside an open unit of work and
//! version conflicts are never retried.

use std::future::Future;
use std::time::Duration;

use tracing::warn;

use stockroom_core::ProductCode;
use stockroom_inventory::{Movement, Product};

use super::{LedgerStore, StoreResult};

/// Exponential backoff policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Maximum number of retries after the first attempt (0 = no retries).
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_millis(50),
            max_delay: Duration::from_secs(2),
        }
    }
}

impl RetryPolicy {
    pub fn exponential(max_attempts: u32, base_delay: Duration, max_delay: Duration) -> Self {
        Self {
            max_attempts,
            base_delay,
            max_delay,
        }
    }

    /// Delay before retry number `attempt` (1-indexed).
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        if attempt == 0 {
            return Duration::ZERO;
        }
        let factor = 2u32.saturating_pow(attempt - 1);
        self.base_delay
            .checked_mul(factor)
            .unwrap_or(self.max_delay)
            .min(self.max_delay)
    }

    async fn run<T, F, Fut>(&self, operation: &'static str, mut f: F) -> StoreResult<T>
    where
        F: FnMut() -> Fut + Send,
        Fut: Future<Output = StoreResult<T>> + Send,
        T: Send,
    {
        let mut attempt = 0;
        loop {
            match f().await {
                Err(e) if e.is_transient() && attempt < self.max_attempts => {
                    attempt += 1;
                    let delay = self.delay_for_attempt(attempt);
                    warn!(operation, attempt, ?delay, error = %e, "transient store failure, retrying");
                    tokio::time::sleep(delay).await;
                }
                other => return other,
            }
        }
    }
}

/// Wraps a [`LedgerStore`] and retries transient failures of safe operations.
#[derive(Debug, Clone)]
pub struct RetryingStore<S> {
    inner: S,
    policy: RetryPolicy,
}

impl<S> RetryingStore<S> {
    pub fn new(inner: S, policy: RetryPolicy) -> Self {
        Self { inner, policy }
    }

    pub fn inner(&self) -> &S {
        &self.inner
    }
}

#[async_trait::async_trait]
impl<S: LedgerStore> LedgerStore for RetryingStore<S> {
    type Tx = S::Tx;

    async fn begin(&self) -> StoreResult<Self::Tx> {
        let inner = &self.inner;
        self.policy.run("begin", move || inner.begin()).await
    }

    async fn find_product(&self, code: ProductCode) -> StoreResult<Option<Product>> {
        let inner = &self.inner;
        self.policy
            .run("find_product", move || inner.find_product(code))
            .await
    }

    async fn list_products(&self) -> StoreResult<Vec<Product>> {
        let inner = &self.inner;
        self.policy
            .run("list_products", move || inner.list_products())
            .await
    }

    async fn recent_by_product(&self, code: ProductCode, limit: usize) -> StoreResult<Vec<Movement>> {
        let inner = &self.inner;
        self.policy
            .run("recent_by_product", move || inner.recent_by_product(code, limit))
            .await
    }

    async fn history(&self, code: ProductCode) -> StoreResult<Vec<Movement>> {
        let inner = &self.inner;
        self.policy
            .run("history", move || inner.history(code))
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    use crate::store::{InMemoryLedgerStore, StoreError};

    /// Fails the first `failures` calls of every read with the given error.
    struct Flaky {
        inner: InMemoryLedgerStore,
        failures: u32,
        calls: AtomicU32,
        error: StoreError,
    }

    impl Flaky {
        fn gate(&self) -> StoreResult<()> {
            let n = self.calls.fetch_add(1, Ordering::SeqCst);
            if n < self.failures {
                Err(self.error.clone())
            } else {
                Ok(())
            }
        }
    }

    #[async_trait::async_trait]
    impl LedgerStore for Flaky {
        type Tx = <InMemoryLedgerStore as LedgerStore>::Tx;

        async fn begin(&self) -> StoreResult<Self::Tx> {
            self.gate()?;
            self.inner.begin().await
        }

        async fn find_product(&self, code: ProductCode) -> StoreResult<Option<Product>> {
            self.gate()?;
            self.inner.find_product(code).await
        }

        async fn list_products(&self) -> StoreResult<Vec<Product>> {
            self.gate()?;
            self.inner.list_products().await
        }

        async fn recent_by_product(&self, code: ProductCode, limit: usize) -> StoreResult<Vec<Movement>> {
            self.gate()?;
            self.inner.recent_by_product(code, limit).await
        }

        async fn history(&self, code: ProductCode) -> StoreResult<Vec<Movement>> {
            self.gate()?;
            self.inner.history(code).await
        }
    }

    fn flaky(failures: u32, error: StoreError) -> RetryingStore<Flaky> {
        RetryingStore::new(
            Flaky {
                inner: InMemoryLedgerStore::seeded(),
                failures,
                calls: AtomicU32::new(0),
                error,
            },
            RetryPolicy::exponential(3, Duration::from_millis(1), Duration::from_millis(4)),
        )
    }

    #[test]
    fn backoff_doubles_and_caps() {
        let policy = RetryPolicy::exponential(5, Duration::from_millis(10), Duration::from_millis(35));
        assert_eq!(policy.delay_for_attempt(0), Duration::ZERO);
        assert_eq!(policy.delay_for_attempt(1), Duration::from_millis(10));
        assert_eq!(policy.delay_for_attempt(2), Duration::from_millis(20));
        assert_eq!(policy.delay_for_attempt(3), Duration::from_millis(35));
        assert_eq!(policy.delay_for_attempt(40), Duration::from_millis(35));
    }

    #[tokio::test]
    async fn retries_unavailable_until_success() {
        let store = flaky(2, StoreError::Unavailable("connection refused".into()));
        let products = store.list_products().await.unwrap();
        assert_eq!(products.len(), 5);
        assert_eq!(store.inner().calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn gives_up_after_max_attempts() {
        let store = flaky(10, StoreError::Unavailable("connection refused".into()));
        assert!(store.begin().await.is_err());
        assert_eq!(store.inner().calls.load(Ordering::SeqCst), 4);
    }

    #[tokio::test]
    async fn non_transient_errors_are_not_retried() {
        let store = flaky(1, StoreError::Database("syntax error".into()));
        assert!(store.history(ProductCode::new(101).unwrap()).await.is_err());
        assert_eq!(store.inner().calls.load(Ordering::SeqCst), 1);
    }
}
