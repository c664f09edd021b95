//! Postgres-backed stock ledger.
//!
//! Stock is never stored; every read recomputes it from `stock_movements`
//! with `COALESCE(SUM(CASE ...), 0)`. Adjustments on one product are
//! serialized by locking the product row (`SELECT ... FOR UPDATE`) for the
//! lifetime of the transaction scope.
//!
//! ## Error Mapping
//!
//! | SQLx Error | PostgreSQL Error Code | LedgerStoreError |
//! |------------|----------------------|------------------|
//! | Database (unique violation) | `23505` | `Conflict` |
//! | Database (serialization failure / deadlock) | `40001` / `40P01` | `Conflict` |
//! | Database (foreign key violation) | `23503` | `InvalidMovement` |
//! | Database (check constraint violation) | `23514` | `InvalidMovement` |
//! | Database (other), PoolClosed, Io, ... | any | `Storage` |

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::{PgPoolOptions, PgRow};
use sqlx::{FromRow, PgPool, Postgres, Row, Transaction};
use tracing::instrument;

use minimart_core::{MovementId, ProductId, UserId};
use minimart_inventory::{NewMovement, Quantity, StockMovement};
use minimart_products::{Product, ProductSummary};

use super::{
    LedgerStore, LedgerStoreError, LedgerTx, MovementRecord, Page, ProductCatalog, ProductStock,
    ensure_same_product,
};

const SCHEMA: &[&str] = &[
    r#"
    CREATE TABLE IF NOT EXISTS products (
        id                  BIGSERIAL PRIMARY KEY,
        name                TEXT NOT NULL,
        sku                 TEXT NOT NULL UNIQUE,
        barcode             TEXT NULL UNIQUE,
        low_stock_threshold BIGINT NOT NULL DEFAULT 0 CHECK (low_stock_threshold >= 0),
        is_active           BOOLEAN NOT NULL DEFAULT TRUE,
        created_at          TIMESTAMPTZ NOT NULL DEFAULT now(),
        updated_at          TIMESTAMPTZ NOT NULL DEFAULT now(),
        deleted_at          TIMESTAMPTZ NULL
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS stock_movements (
        id             BIGSERIAL PRIMARY KEY,
        product_id     BIGINT NOT NULL REFERENCES products (id),
        movement_type  TEXT NOT NULL DEFAULT 'ADJUST' CHECK (movement_type IN ('IN', 'OUT', 'ADJUST')),
        direction      TEXT NOT NULL CHECK (direction IN ('IN', 'OUT')),
        quantity       BIGINT NOT NULL CHECK (quantity > 0),
        reason         TEXT NULL,
        notes          TEXT NULL,
        reference_type TEXT NULL,
        reference_id   BIGINT NULL,
        created_by     BIGINT NULL,
        created_at     TIMESTAMPTZ NOT NULL DEFAULT now(),
        updated_at     TIMESTAMPTZ NOT NULL DEFAULT now(),
        deleted_at     TIMESTAMPTZ NULL
    )
    "#,
    "CREATE INDEX IF NOT EXISTS stock_movements_product_id_idx ON stock_movements (product_id)",
    "CREATE INDEX IF NOT EXISTS stock_movements_product_created_idx ON stock_movements (product_id, created_at)",
    "CREATE INDEX IF NOT EXISTS stock_movements_created_by_idx ON stock_movements (created_by)",
    r#"
    CREATE TABLE IF NOT EXISTS logs (
        id         BIGSERIAL PRIMARY KEY,
        user_id    BIGINT NULL,
        action     TEXT NOT NULL,
        details    TEXT NULL,
        created_at TIMESTAMPTZ NOT NULL DEFAULT now()
    )
    "#,
];

const STOCK_SUM: &str =
    "COALESCE(SUM(CASE WHEN m.direction = 'IN' THEN m.quantity ELSE -m.quantity END), 0)::BIGINT";

/// Postgres-backed append-only stock ledger.
#[derive(Debug, Clone)]
pub struct PostgresLedgerStore {
    pool: Arc<PgPool>,
}

impl PostgresLedgerStore {
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool: Arc::new(pool),
        }
    }

    /// Open a pool against `database_url`.
    pub async fn connect(database_url: &str, max_connections: u32) -> Result<Self, LedgerStoreError> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(database_url)
            .await
            .map_err(|e| map_sqlx_error("connect", e))?;
        Ok(Self::new(pool))
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Create the ledger tables and indexes if they do not exist yet. Idempotent.
    #[instrument(skip(self), err)]
    pub async fn ensure_schema(&self) -> Result<(), LedgerStoreError> {
        for statement in SCHEMA {
            sqlx::query(statement)
                .execute(&*self.pool)
                .await
                .map_err(|e| map_sqlx_error("ensure_schema", e))?;
        }
        Ok(())
    }

    /// Insert or replace a catalog product, keeping its id.
    #[instrument(skip(self, product), fields(product_id = %product.id), err)]
    pub async fn upsert_product(&self, product: &Product) -> Result<(), LedgerStoreError> {
        product
            .validate()
            .map_err(|e| LedgerStoreError::InvalidProduct(e.to_string()))?;

        sqlx::query(
            r#"
            INSERT INTO products (id, name, sku, barcode, low_stock_threshold, is_active, deleted_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            ON CONFLICT (id) DO UPDATE SET
                name = EXCLUDED.name,
                sku = EXCLUDED.sku,
                barcode = EXCLUDED.barcode,
                low_stock_threshold = EXCLUDED.low_stock_threshold,
                is_active = EXCLUDED.is_active,
                deleted_at = EXCLUDED.deleted_at,
                updated_at = now()
            "#,
        )
        .bind(product.id.get())
        .bind(&product.name)
        .bind(&product.sku)
        .bind(product.barcode.as_deref())
        .bind(product.low_stock_threshold)
        .bind(product.is_active)
        .bind(product.deleted_at)
        .execute(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("upsert_product", e))?;
        Ok(())
    }
}

#[async_trait]
impl LedgerStore for PostgresLedgerStore {
    type Tx = PgLedgerTx;

    #[instrument(skip(self), fields(product_id = %product_id), err)]
    async fn begin_adjustment(&self, product_id: ProductId) -> Result<Self::Tx, LedgerStoreError> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| map_sqlx_error("begin_adjustment", e))?;

        let locked = sqlx::query("SELECT id FROM products WHERE id = $1 AND deleted_at IS NULL FOR UPDATE")
            .bind(product_id.get())
            .fetch_optional(&mut *tx)
            .await
            .map_err(|e| map_sqlx_error("begin_adjustment", e))?;

        if locked.is_none() {
            tx.rollback()
                .await
                .map_err(|e| map_sqlx_error("begin_adjustment", e))?;
            return Err(LedgerStoreError::ProductNotFound(product_id));
        }

        Ok(PgLedgerTx { product_id, tx })
    }

    #[instrument(skip(self), fields(product_id = %product_id), err)]
    async fn current_stock(&self, product_id: ProductId) -> Result<i64, LedgerStoreError> {
        sqlx::query_scalar::<_, i64>(&stock_query())
            .bind(product_id.get())
            .fetch_one(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("current_stock", e))
    }

    #[instrument(skip(self), err)]
    async fn list_with_stock(&self) -> Result<Vec<ProductStock>, LedgerStoreError> {
        let sql = format!(
            r#"
            SELECT
                p.id::BIGINT AS id,
                p.name,
                p.sku,
                p.barcode,
                p.low_stock_threshold::BIGINT AS low_stock_threshold,
                p.is_active,
                p.deleted_at,
                {STOCK_SUM} AS current_stock
            FROM products p
            LEFT JOIN stock_movements m
                ON m.product_id = p.id AND m.deleted_at IS NULL
            WHERE p.deleted_at IS NULL
            GROUP BY p.id
            ORDER BY p.name ASC, p.id ASC
            "#
        );

        let rows = sqlx::query(&sql)
            .fetch_all(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("list_with_stock", e))?;

        rows.iter()
            .map(|row| {
                let product = ProductRow::from_row(row).map_err(|e| corrupt_row("product", e))?;
                let current_stock: i64 = row
                    .try_get("current_stock")
                    .map_err(|e| corrupt_row("product", e))?;
                Ok(ProductStock {
                    product: product.into(),
                    current_stock,
                })
            })
            .collect()
    }

    #[instrument(skip(self), fields(limit = ?page.limit, offset = page.offset), err)]
    async fn list_movements(&self, page: Page) -> Result<Vec<MovementRecord>, LedgerStoreError> {
        let rows = sqlx::query(
            r#"
            SELECT
                m.id::BIGINT AS id,
                m.product_id::BIGINT AS product_id,
                m.movement_type,
                m.direction,
                m.quantity::BIGINT AS quantity,
                m.reason,
                m.notes,
                m.reference_type,
                m.reference_id::BIGINT AS reference_id,
                m.created_by::BIGINT AS created_by,
                m.created_at,
                m.deleted_at,
                p.id::BIGINT AS p_id,
                p.name AS p_name,
                p.sku AS p_sku,
                p.barcode AS p_barcode,
                p.low_stock_threshold::BIGINT AS p_low_stock_threshold,
                p.is_active AS p_is_active
            FROM stock_movements m
            LEFT JOIN products p
                ON p.id = m.product_id AND p.deleted_at IS NULL
            WHERE m.deleted_at IS NULL
            ORDER BY m.created_at DESC, m.id DESC
            LIMIT $1 OFFSET $2
            "#,
        )
        .bind(page.limit.map(i64::from))
        .bind(i64::from(page.offset))
        .fetch_all(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("list_movements", e))?;

        rows.iter()
            .map(|row| {
                let movement = MovementRow::from_row(row)
                    .map_err(|e| corrupt_row("stock_movement", e))?
                    .into_movement()?;
                let product = summary_from_row(row).map_err(|e| corrupt_row("product", e))?;
                Ok(MovementRecord { movement, product })
            })
            .collect()
    }
}

#[async_trait]
impl ProductCatalog for PostgresLedgerStore {
    #[instrument(skip(self), fields(product_id = %product_id), err)]
    async fn find_product(&self, product_id: ProductId) -> Result<Option<Product>, LedgerStoreError> {
        let row = sqlx::query(
            r#"
            SELECT
                id::BIGINT AS id, name, sku, barcode,
                low_stock_threshold::BIGINT AS low_stock_threshold, is_active, deleted_at
            FROM products
            WHERE id = $1 AND deleted_at IS NULL
            "#,
        )
        .bind(product_id.get())
        .fetch_optional(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("find_product", e))?;

        row.map(|r| {
            ProductRow::from_row(&r)
                .map(Product::from)
                .map_err(|e| corrupt_row("product", e))
        })
        .transpose()
    }
}

/// Transaction scope holding the `FOR UPDATE` lock on one product row.
///
/// Dropping it without `commit` lets sqlx roll the transaction back.
pub struct PgLedgerTx {
    product_id: ProductId,
    tx: Transaction<'static, Postgres>,
}

impl std::fmt::Debug for PgLedgerTx {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PgLedgerTx")
            .field("product_id", &self.product_id)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl LedgerTx for PgLedgerTx {
    fn product_id(&self) -> ProductId {
        self.product_id
    }

    async fn current_stock(&mut self) -> Result<i64, LedgerStoreError> {
        sqlx::query_scalar::<_, i64>(&stock_query())
            .bind(self.product_id.get())
            .fetch_one(&mut *self.tx)
            .await
            .map_err(|e| map_sqlx_error("tx.current_stock", e))
    }

    async fn append(&mut self, movement: NewMovement) -> Result<StockMovement, LedgerStoreError> {
        ensure_same_product(self.product_id, &movement)?;

        let row = sqlx::query(
            r#"
            INSERT INTO stock_movements (
                product_id, movement_type, direction, quantity,
                reason, notes, reference_type, reference_id, created_by
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            RETURNING id::BIGINT AS id, created_at
            "#,
        )
        .bind(movement.product_id.get())
        .bind(movement.movement_type.as_str())
        .bind(movement.direction.as_str())
        .bind(movement.quantity.get())
        .bind(movement.reason.as_deref())
        .bind(movement.notes.as_deref())
        .bind(movement.reference_type.as_deref())
        .bind(movement.reference_id)
        .bind(movement.created_by.map(|id| id.get()))
        .fetch_one(&mut *self.tx)
        .await
        .map_err(|e| map_sqlx_error("tx.append", e))?;

        let id: i64 = row.try_get("id").map_err(|e| corrupt_row("stock_movement", e))?;
        let created_at: DateTime<Utc> = row
            .try_get("created_at")
            .map_err(|e| corrupt_row("stock_movement", e))?;

        Ok(movement.into_stored(MovementId::from_raw(id), created_at))
    }

    async fn commit(self) -> Result<(), LedgerStoreError> {
        self.tx
            .commit()
            .await
            .map_err(|e| map_sqlx_error("tx.commit", e))
    }
}

fn stock_query() -> String {
    format!(
        "SELECT {STOCK_SUM} FROM stock_movements m WHERE m.product_id = $1 AND m.deleted_at IS NULL"
    )
}

fn corrupt_row(kind: &str, err: impl std::fmt::Display) -> LedgerStoreError {
    LedgerStoreError::Storage(format!("failed to decode {kind} row: {err}"))
}

/// Map SQLx errors to LedgerStoreError.
fn map_sqlx_error(operation: &str, err: sqlx::Error) -> LedgerStoreError {
    match err {
        sqlx::Error::Database(db_err) => {
            let msg = format!("database error in {}: {}", operation, db_err.message());
            match db_err.code().as_deref() {
                Some("23505") | Some("40001") | Some("40P01") => LedgerStoreError::Conflict(msg),
                Some("23503") | Some("23514") => LedgerStoreError::InvalidMovement(msg),
                _ => LedgerStoreError::Storage(msg),
            }
        }
        sqlx::Error::PoolClosed => {
            LedgerStoreError::Storage(format!("connection pool closed in {}", operation))
        }
        sqlx::Error::PoolTimedOut => {
            LedgerStoreError::Storage(format!("connection pool timed out in {}", operation))
        }
        _ => LedgerStoreError::Storage(format!("sqlx error in {}: {}", operation, err)),
    }
}

// SQLx row types

#[derive(Debug)]
struct ProductRow {
    id: i64,
    name: String,
    sku: String,
    barcode: Option<String>,
    low_stock_threshold: i64,
    is_active: bool,
    deleted_at: Option<DateTime<Utc>>,
}

impl<'r> FromRow<'r, PgRow> for ProductRow {
    fn from_row(row: &'r PgRow) -> Result<Self, sqlx::Error> {
        Ok(ProductRow {
            id: row.try_get("id")?,
            name: row.try_get("name")?,
            sku: row.try_get("sku")?,
            barcode: row.try_get("barcode")?,
            low_stock_threshold: row.try_get("low_stock_threshold")?,
            is_active: row.try_get("is_active")?,
            deleted_at: row.try_get("deleted_at")?,
        })
    }
}

impl From<ProductRow> for Product {
    fn from(row: ProductRow) -> Self {
        Product {
            id: ProductId::from_raw(row.id),
            name: row.name,
            sku: row.sku,
            barcode: row.barcode,
            low_stock_threshold: row.low_stock_threshold,
            is_active: row.is_active,
            deleted_at: row.deleted_at,
        }
    }
}

fn summary_from_row(row: &PgRow) -> Result<Option<ProductSummary>, sqlx::Error> {
    let id: Option<i64> = row.try_get("p_id")?;
    let Some(id) = id else {
        return Ok(None);
    };
    Ok(Some(ProductSummary {
        id: ProductId::from_raw(id),
        name: row.try_get("p_name")?,
        sku: row.try_get("p_sku")?,
        barcode: row.try_get("p_barcode")?,
        low_stock_threshold: row.try_get("p_low_stock_threshold")?,
        is_active: row.try_get("p_is_active")?,
    }))
}

#[derive(Debug)]
struct MovementRow {
    id: i64,
    product_id: i64,
    movement_type: String,
    direction: String,
    quantity: i64,
    reason: Option<String>,
    notes: Option<String>,
    reference_type: Option<String>,
    reference_id: Option<i64>,
    created_by: Option<i64>,
    created_at: DateTime<Utc>,
    deleted_at: Option<DateTime<Utc>>,
}

impl<'r> FromRow<'r, PgRow> for MovementRow {
    fn from_row(row: &'r PgRow) -> Result<Self, sqlx::Error> {
        Ok(MovementRow {
            id: row.try_get("id")?,
            product_id: row.try_get("product_id")?,
            movement_type: row.try_get("movement_type")?,
            direction: row.try_get("direction")?,
            quantity: row.try_get("quantity")?,
            reason: row.try_get("reason")?,
            notes: row.try_get("notes")?,
            reference_type: row.try_get("reference_type")?,
            reference_id: row.try_get("reference_id")?,
            created_by: row.try_get("created_by")?,
            created_at: row.try_get("created_at")?,
            deleted_at: row.try_get("deleted_at")?,
        })
    }
}

impl MovementRow {
    fn into_movement(self) -> Result<StockMovement, LedgerStoreError> {
        Ok(StockMovement {
            id: MovementId::from_raw(self.id),
            product_id: ProductId::from_raw(self.product_id),
            movement_type: self
                .movement_type
                .parse()
                .map_err(|e| corrupt_row("stock_movement", e))?,
            direction: self
                .direction
                .parse()
                .map_err(|e| corrupt_row("stock_movement", e))?,
            quantity: Quantity::new(self.quantity).map_err(|e| corrupt_row("stock_movement", e))?,
            reason: self.reason,
            notes: self.notes,
            reference_type: self.reference_type,
            reference_id: self.reference_id,
            created_by: self.created_by.map(UserId::from_raw),
            created_at: self.created_at,
            deleted_at: self.deleted_at,
        })
    }
}
