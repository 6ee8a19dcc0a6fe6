//! Postgres-backed ledger store.
//!
//! ## Schema
//!
//! ```sql
//! products  (code BIGINT PRIMARY KEY, description TEXT, stock_quantity BIGINT, version BIGINT)
//! movements (internal_id BIGSERIAL PRIMARY KEY, public_id UUID UNIQUE, product_code BIGINT
//!            REFERENCES products, kind TEXT, quantity BIGINT, description TEXT,
//!            occurred_at TIMESTAMPTZ, balance_before BIGINT, balance_after BIGINT)
//! ```
//!
//! ## Error Mapping
//!
//! | SQLx Error | PostgreSQL Error Code | StoreError |
//! |------------|----------------------|------------|
//! | Database (unique violation) | `23505` | `Database` (duplicate public id) |
//! | Database (serialization failure) | `40001` | `VersionConflict` when the code is known |
//! | Database (other) | Any other | `Database` |
//! | PoolTimedOut / PoolClosed / Io | N/A | `Unavailable` |
//! | ColumnDecode / Decode | N/A | `Corrupt` |
//!
//! A unit of work wraps one `sqlx::Transaction`; dropping it without commit
//! rolls the transaction back.

use std::time::Duration;

use chrono::{DateTime, Utc};
use sqlx::postgres::{PgPoolOptions, PgRow};
use sqlx::{PgPool, Postgres, Row, Transaction};
use tracing::{info, instrument};

use stockroom_core::{MovementId, ProductCode, Version};
use stockroom_inventory::{Movement, MovementKind, NewMovement, Product};

use super::{LedgerStore, MovementStore, ProductStore, StoreError, StoreResult, UnitOfWork};

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS products (
    code            BIGINT PRIMARY KEY CHECK (code > 0),
    description     TEXT NOT NULL,
    stock_quantity  BIGINT NOT NULL CHECK (stock_quantity >= 0),
    version         BIGINT NOT NULL DEFAULT 1
);

CREATE TABLE IF NOT EXISTS movements (
    internal_id     BIGSERIAL PRIMARY KEY,
    public_id       UUID NOT NULL UNIQUE,
    product_code    BIGINT NOT NULL REFERENCES products (code),
    kind            TEXT NOT NULL,
    quantity        BIGINT NOT NULL CHECK (quantity > 0),
    description     VARCHAR(1000),
    occurred_at     TIMESTAMPTZ NOT NULL,
    balance_before  BIGINT NOT NULL,
    balance_after   BIGINT NOT NULL
);

CREATE INDEX IF NOT EXISTS movements_product_recent
    ON movements (product_code, occurred_at DESC, internal_id DESC);
"#;

const MOVEMENT_COLUMNS: &str = "internal_id, public_id, product_code, kind, quantity, description, \
                                occurred_at, balance_before, balance_after";

/// Postgres-backed ledger store.
///
/// Uses SQLx connection pool which is thread-safe (Arc + Send + Sync).
#[derive(Debug, Clone)]
pub struct PostgresLedgerStore {
    pool: PgPool,
}

impl PostgresLedgerStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Open a pool against `database_url`.
    pub async fn connect(database_url: &str, max_connections: u32) -> StoreResult<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .acquire_timeout(Duration::from_secs(5))
            .connect(database_url)
            .await
            .map_err(|e| map_sqlx_error("connect", e))?;
        Ok(Self::new(pool))
    }

    /// Create the tables if they do not exist yet.
    #[instrument(skip(self), err)]
    pub async fn ensure_schema(&self) -> StoreResult<()> {
        sqlx::raw_sql(SCHEMA)
            .execute(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("ensure_schema", e))?;
        Ok(())
    }

    /// Insert `products` that are not present yet. Existing rows are left untouched.
    ///
    /// Returns how many rows were inserted.
    #[instrument(skip(self, products), fields(count = products.len()), err)]
    pub async fn seed_products(&self, products: &[Product]) -> StoreResult<u64> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| map_sqlx_error("begin_transaction", e))?;

        let mut inserted = 0;
        for p in products {
            let result = sqlx::query(
                r#"
                INSERT INTO products (code, description, stock_quantity, version)
                VALUES ($1, $2, $3, $4)
                ON CONFLICT (code) DO NOTHING
                "#,
            )
            .bind(p.code().get())
            .bind(p.description())
            .bind(p.stock_quantity())
            .bind(version_to_db(p.version())?)
            .execute(&mut *tx)
            .await
            .map_err(|e| map_sqlx_error("seed_product", e))?;
            inserted += result.rows_affected();
        }

        tx.commit()
            .await
            .map_err(|e| map_sqlx_error("commit_transaction", e))?;

        info!(inserted, "seeded products");
        Ok(inserted)
    }
}

/// One open Postgres transaction.
pub struct PostgresUnitOfWork {
    tx: Transaction<'static, Postgres>,
}

#[async_trait::async_trait]
impl ProductStore for PostgresUnitOfWork {
    #[instrument(skip(self), fields(product_code = %code), err)]
    async fn load_for_update(&mut self, code: ProductCode) -> StoreResult<Option<Product>> {
        let row = sqlx::query(
            r#"
            SELECT code, description, stock_quantity, version
            FROM products
            WHERE code = $1
            "#,
        )
        .bind(code.get())
        .fetch_optional(&mut *self.tx)
        .await
        .map_err(|e| map_sqlx_error("load_for_update", e))?;

        row.as_ref().map(product_from_row).transpose()
    }

    #[instrument(skip(self, product), fields(product_code = %product.code(), expected = %product.version()), err)]
    async fn save(&mut self, product: &Product) -> StoreResult<Version> {
        let code = product.code();
        let expected = product.version();

        // Compare-and-swap: zero rows means someone else committed first.
        let row = sqlx::query(
            r#"
            UPDATE products
            SET stock_quantity = $2, version = version + 1
            WHERE code = $1 AND version = $3
            RETURNING version
            "#,
        )
        .bind(code.get())
        .bind(product.stock_quantity())
        .bind(version_to_db(expected)?)
        .fetch_optional(&mut *self.tx)
        .await
        .map_err(|e| {
            if is_serialization_failure(&e) {
                StoreError::VersionConflict { code, expected }
            } else {
                map_sqlx_error("save_product", e)
            }
        })?;

        match row {
            Some(row) => {
                let version: i64 = row
                    .try_get("version")
                    .map_err(|e| map_sqlx_error("save_product", e))?;
                version_from_db(version)
            }
            None => Err(StoreError::VersionConflict { code, expected }),
        }
    }
}

#[async_trait::async_trait]
impl MovementStore for PostgresUnitOfWork {
    #[instrument(skip(self, movement), fields(product_code = %movement.product_code, kind = %movement.kind), err)]
    async fn append(&mut self, movement: &NewMovement) -> StoreResult<i64> {
        let row = sqlx::query(
            r#"
            INSERT INTO movements (
                public_id,
                product_code,
                kind,
                quantity,
                description,
                occurred_at,
                balance_before,
                balance_after
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING internal_id
            "#,
        )
        .bind(movement.public_id.as_uuid())
        .bind(movement.product_code.get())
        .bind(movement.kind.as_str())
        .bind(movement.quantity)
        .bind(movement.description.as_deref())
        .bind(movement.occurred_at)
        .bind(movement.balance_before)
        .bind(movement.balance_after)
        .fetch_one(&mut *self.tx)
        .await
        .map_err(|e| map_sqlx_error("insert_movement", e))?;

        row.try_get("internal_id")
            .map_err(|e| map_sqlx_error("insert_movement", e))
    }
}

#[async_trait::async_trait]
impl UnitOfWork for PostgresUnitOfWork {
    async fn commit(self) -> StoreResult<()> {
        self.tx
            .commit()
            .await
            .map_err(|e| map_sqlx_error("commit_transaction", e))
    }

    async fn rollback(self) -> StoreResult<()> {
        self.tx
            .rollback()
            .await
            .map_err(|e| map_sqlx_error("rollback", e))
    }
}

#[async_trait::async_trait]
impl LedgerStore for PostgresLedgerStore {
    type Tx = PostgresUnitOfWork;

    async fn begin(&self) -> StoreResult<Self::Tx> {
        let tx = self
            .pool
            .begin()
            .await
            .map_err(|e| map_sqlx_error("begin_transaction", e))?;
        Ok(PostgresUnitOfWork { tx })
    }

    #[instrument(skip(self), fields(product_code = %code), err)]
    async fn find_product(&self, code: ProductCode) -> StoreResult<Option<Product>> {
        let row = sqlx::query(
            "SELECT code, description, stock_quantity, version FROM products WHERE code = $1",
        )
        .bind(code.get())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("find_product", e))?;

        row.as_ref().map(product_from_row).transpose()
    }

    #[instrument(skip(self), err)]
    async fn list_products(&self) -> StoreResult<Vec<Product>> {
        let rows = sqlx::query(
            "SELECT code, description, stock_quantity, version FROM products ORDER BY code ASC",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("list_products", e))?;

        rows.iter().map(product_from_row).collect()
    }

    #[instrument(skip(self), fields(product_code = %code), err)]
    async fn recent_by_product(&self, code: ProductCode, limit: usize) -> StoreResult<Vec<Movement>> {
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);
        let sql = format!(
            "SELECT {MOVEMENT_COLUMNS} FROM movements WHERE product_code = $1 \
             ORDER BY occurred_at DESC, internal_id DESC LIMIT $2"
        );
        let rows = sqlx::query(&sql)
            .bind(code.get())
            .bind(limit)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("recent_by_product", e))?;

        rows.iter().map(movement_from_row).collect()
    }

    #[instrument(skip(self), fields(product_code = %code), err)]
    async fn history(&self, code: ProductCode) -> StoreResult<Vec<Movement>> {
        let sql = format!(
            "SELECT {MOVEMENT_COLUMNS} FROM movements WHERE product_code = $1 ORDER BY internal_id ASC"
        );
        let rows = sqlx::query(&sql)
            .bind(code.get())
            .fetch_all(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("history", e))?;

        rows.iter().map(movement_from_row).collect()
    }
}

fn version_to_db(version: Version) -> StoreResult<i64> {
    i64::try_from(version.get())
        .map_err(|_| StoreError::Corrupt(format!("version {version} does not fit in BIGINT")))
}

fn version_from_db(version: i64) -> StoreResult<Version> {
    u64::try_from(version)
        .map(Version::new)
        .map_err(|_| StoreError::Corrupt(format!("negative version {version}")))
}

fn product_from_row(row: &PgRow) -> StoreResult<Product> {
    let code: i64 = row.try_get("code").map_err(|e| map_sqlx_error("decode_product", e))?;
    let description: String = row
        .try_get("description")
        .map_err(|e| map_sqlx_error("decode_product", e))?;
    let stock_quantity: i64 = row
        .try_get("stock_quantity")
        .map_err(|e| map_sqlx_error("decode_product", e))?;
    let version: i64 = row.try_get("version").map_err(|e| map_sqlx_error("decode_product", e))?;

    let code = ProductCode::new(code).map_err(|e| StoreError::Corrupt(e.to_string()))?;
    Ok(Product::new(code, description, stock_quantity, version_from_db(version)?))
}

fn movement_from_row(row: &PgRow) -> StoreResult<Movement> {
    let decode = |e| map_sqlx_error("decode_movement", e);

    let product_code: i64 = row.try_get("product_code").map_err(decode)?;
    let kind: String = row.try_get("kind").map_err(decode)?;
    let public_id: uuid::Uuid = row.try_get("public_id").map_err(decode)?;
    let occurred_at: DateTime<Utc> = row.try_get("occurred_at").map_err(decode)?;

    Ok(Movement {
        internal_id: row.try_get("internal_id").map_err(decode)?,
        public_id: MovementId::from_uuid(public_id),
        product_code: ProductCode::new(product_code).map_err(|e| StoreError::Corrupt(e.to_string()))?,
        kind: MovementKind::parse(&kind).map_err(|e| StoreError::Corrupt(e.to_string()))?,
        quantity: row.try_get("quantity").map_err(decode)?,
        description: row.try_get("description").map_err(decode)?,
        occurred_at,
        balance_before: row.try_get("balance_before").map_err(decode)?,
        balance_after: row.try_get("balance_after").map_err(decode)?,
    })
}

fn is_serialization_failure(err: &sqlx::Error) -> bool {
    if let sqlx::Error::Database(db_err) = err {
        if let Some(code) = db_err.code() {
            return code.as_ref() == "40001";
        }
    }
    false
}

/// Map SQLx errors to store errors.
fn map_sqlx_error(operation: &str, err: sqlx::Error) -> StoreError {
    match err {
        sqlx::Error::Database(db_err) => {
            let code = db_err.code().map(|c| c.to_string()).unwrap_or_default();
            StoreError::Database(format!(
                "database error in {operation} ({code}): {}",
                db_err.message()
            ))
        }
        sqlx::Error::PoolTimedOut => {
            StoreError::Unavailable(format!("connection pool timed out in {operation}"))
        }
        sqlx::Error::PoolClosed => {
            StoreError::Unavailable(format!("connection pool closed in {operation}"))
        }
        sqlx::Error::Io(e) => StoreError::Unavailable(format!("io error in {operation}: {e}")),
        sqlx::Error::ColumnDecode { .. } | sqlx::Error::Decode(_) | sqlx::Error::ColumnNotFound(_) => {
            StoreError::Corrupt(format!("failed to decode row in {operation}: {err}"))
        }
        other => StoreError::Database(format!("error in {operation}: {other}")),
    }
}
