//! Service wiring: picks the ledger backend and holds calculator settings.

use anyhow::Context;
use tracing::info;

use stockroom_core::ProductCode;
use stockroom_infra::{
    InMemoryLedgerStore, LedgerError, MovementOutcome, PostgresLedgerStore, RetryingStore,
    StockLedger,
};
use stockroom_inventory::{AuditReport, Movement, MovementRequest, Product, seed_catalog};
use stockroom_invoicing::LateFeePolicy;
use stockroom_sales::CommissionRates;

use crate::config::AppConfig;

/// The ledger over whichever backend the process was configured with.
#[derive(Debug, Clone)]
pub enum LedgerBackend {
    InMemory(StockLedger<RetryingStore<InMemoryLedgerStore>>),
    Postgres(StockLedger<RetryingStore<PostgresLedgerStore>>),
}

macro_rules! delegate {
    ($self:ident, $ledger:ident => $call:expr) => {
        match $self {
            LedgerBackend::InMemory($ledger) => $call,
            LedgerBackend::Postgres($ledger) => $call,
        }
    };
}

impl LedgerBackend {
    pub fn name(&self) -> &'static str {
        match self {
            LedgerBackend::InMemory(_) => "in_memory",
            LedgerBackend::Postgres(_) => "postgres",
        }
    }

    pub async fn process_movement(&self, request: &MovementRequest) -> Result<MovementOutcome, LedgerError> {
        delegate!(self, ledger => ledger.process_movement(request).await)
    }

    pub async fn list_products(&self) -> Result<Vec<Product>, LedgerError> {
        delegate!(self, ledger => ledger.list_products().await)
    }

    pub async fn movement_history(&self, code: ProductCode) -> Result<Vec<Movement>, LedgerError> {
        delegate!(self, ledger => ledger.movement_history(code).await)
    }

    pub async fn audit_product(&self, code: ProductCode) -> Result<AuditReport, LedgerError> {
        delegate!(self, ledger => ledger.audit_product(code).await)
    }
}

#[derive(Debug, Clone)]
pub struct AppServices {
    pub ledger: LedgerBackend,
    pub commission_rates: CommissionRates,
    pub late_fees: LateFeePolicy,
}

impl AppServices {
    /// In-memory services seeded with the default catalog.
    pub fn in_memory(config: &AppConfig) -> Self {
        let store = RetryingStore::new(InMemoryLedgerStore::seeded(), config.store_retry);
        Self::with_ledger(
            LedgerBackend::InMemory(
                StockLedger::new(store).with_recent_limit(config.recent_movements_limit),
            ),
            config,
        )
    }

    fn with_ledger(ledger: LedgerBackend, config: &AppConfig) -> Self {
        Self {
            ledger,
            commission_rates: config.commission_rates,
            late_fees: config.late_fees,
        }
    }
}

/// Build services from configuration.
///
/// With `DATABASE_URL` set, connects to Postgres, creates the schema if needed
/// and inserts any missing seed products.
pub async fn build_services(config: &AppConfig) -> anyhow::Result<AppServices> {
    let Some(url) = config.database_url.as_deref() else {
        info!(backend = "in_memory", "using in-memory ledger store");
        return Ok(AppServices::in_memory(config));
    };

    let store = PostgresLedgerStore::connect(url, config.database_max_connections)
        .await
        .context("failed to connect to postgres")?;
    store
        .ensure_schema()
        .await
        .context("failed to create schema")?;
    store
        .seed_products(&seed_catalog())
        .await
        .context("failed to seed products")?;

    info!(backend = "postgres", "using postgres ledger store");
    let ledger = StockLedger::new(RetryingStore::new(store, config.store_retry))
        .with_recent_limit(config.recent_movements_limit);
    Ok(AppServices::with_ledger(LedgerBackend::Postgres(ledger), config))
}
