//! # Checkout Transaction Engine
//!
//! The only code path allowed to mutate stock. Every entry point here
//! follows the same transaction discipline:
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Stock Mutation Discipline                            │
//! │                                                                         │
//! │  validate input (pure, keel-core)                                       │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  BEGIN IMMEDIATE ← write lock up front, concurrent writers queue        │
//! │       │                                                                 │
//! │       ├── fresh reads (product, employee, customer/supplier)            │
//! │       ├── document rows (sale / purchase / nothing)                     │
//! │       ├── guarded stock update (condition re-checked in the UPDATE)     │
//! │       ├── one ledger row per touched SKU, same signed delta             │
//! │       └── stock snapshots for the alert rules                           │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  COMMIT ── ok ──► evaluate alert rules ──► sink (fire-and-forget)       │
//! │       │                                                                 │
//! │       └─ any failure ──► ROLLBACK, no partial writes survive            │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Entry Points
//! - [`CheckoutEngine::checkout`] - atomic sale (stock down)
//! - [`CheckoutEngine::adjust_stock`] - manual adjustment (either way)
//! - [`CheckoutEngine::receive_purchase`] - supplier receiving (stock up)

mod adjustment;
mod checkout;
mod error;
mod purchase;

pub use error::{AdjustmentError, CheckoutError, PurchaseError};
pub use purchase::PurchaseLine;

use chrono::Utc;
use sqlx::pool::PoolConnection;
use sqlx::{Sqlite, SqliteConnection};
use tracing::error;

use crate::alerts::AlertSink;
use crate::error::{DbError, DbResult};
use crate::pool::Database;
use keel_core::{AdjustmentReason, AlertEvaluator, AlertEvent, AlertThresholds, StockSnapshot};

/// The transactional engine for every stock-mutating operation.
///
/// Cheap to clone; one engine is shared across checkout sessions.
///
/// ## Usage
/// ```rust,ignore
/// let (sink, alert_rx) = AlertSink::channel();
/// let engine = CheckoutEngine::new(db, AlertThresholds::default(), sink);
/// let receipt = engine.checkout(cart.lines(), employee_id, None).await?;
/// ```
#[derive(Debug, Clone)]
pub struct CheckoutEngine {
    db: Database,
    evaluator: AlertEvaluator,
    sink: AlertSink,
}

impl CheckoutEngine {
    /// Creates an engine over a database handle.
    pub fn new(db: Database, thresholds: AlertThresholds, sink: AlertSink) -> Self {
        CheckoutEngine {
            db,
            evaluator: AlertEvaluator::new(thresholds),
            sink,
        }
    }

    /// The underlying database handle.
    pub fn db(&self) -> &Database {
        &self.db
    }

    // =========================================================================
    // Transaction plumbing shared by the entry points
    // =========================================================================

    /// Acquires a connection and opens a write transaction.
    ///
    /// `BEGIN IMMEDIATE` takes SQLite's write lock at BEGIN instead of
    /// at the first write, so two concurrent checkouts serialize before
    /// either has read stale stock.
    pub(crate) async fn begin_immediate(&self) -> DbResult<PoolConnection<Sqlite>> {
        let mut conn = self.db.pool().acquire().await.map_err(DbError::from)?;
        sqlx::query("BEGIN IMMEDIATE")
            .execute(&mut *conn)
            .await
            .map_err(DbError::from)?;
        Ok(conn)
    }

    /// Commits the open transaction.
    pub(crate) async fn commit(conn: &mut SqliteConnection) -> DbResult<()> {
        sqlx::query("COMMIT")
            .execute(conn)
            .await
            .map_err(DbError::from)?;
        Ok(())
    }

    /// Rolls back the open transaction. Best effort: a rollback that
    /// itself fails (dead connection) is logged, and dropping the
    /// connection discards the uncommitted transaction anyway.
    pub(crate) async fn rollback(conn: &mut SqliteConnection) {
        if let Err(e) = sqlx::query("ROLLBACK").execute(conn).await {
            error!(error = %e, "Rollback failed; dropping connection discards the transaction");
        }
    }

    // =========================================================================
    // In-transaction reads
    // =========================================================================

    pub(crate) async fn employee_exists(conn: &mut SqliteConnection, id: i64) -> DbResult<bool> {
        let row: Option<i64> = sqlx::query_scalar("SELECT 1 FROM employees WHERE id = ?1")
            .bind(id)
            .fetch_optional(conn)
            .await?;
        Ok(row.is_some())
    }

    pub(crate) async fn customer_exists(conn: &mut SqliteConnection, id: i64) -> DbResult<bool> {
        let row: Option<i64> = sqlx::query_scalar("SELECT 1 FROM customers WHERE id = ?1")
            .bind(id)
            .fetch_optional(conn)
            .await?;
        Ok(row.is_some())
    }

    pub(crate) async fn supplier_exists(conn: &mut SqliteConnection, id: i64) -> DbResult<bool> {
        let row: Option<i64> = sqlx::query_scalar("SELECT 1 FROM suppliers WHERE id = ?1")
            .bind(id)
            .fetch_optional(conn)
            .await?;
        Ok(row.is_some())
    }

    /// Reads the post-update stock observation for one SKU, inside the
    /// transaction, so the snapshot matches exactly what commits.
    pub(crate) async fn stock_snapshot(
        conn: &mut SqliteConnection,
        sku: &str,
    ) -> DbResult<Option<StockSnapshot>> {
        let row: Option<(String, String, i64, i64, Option<String>)> = sqlx::query_as(
            r#"
            SELECT p.sku, p.name, p.stock, p.low_stock_threshold, s.contact_info
            FROM products p
            LEFT JOIN suppliers s ON s.id = p.supplier_id
            WHERE p.sku = ?1
            "#,
        )
        .bind(sku)
        .fetch_optional(conn)
        .await?;

        Ok(row.map(
            |(sku, name, stock, low_stock_threshold, supplier_contact)| StockSnapshot {
                sku,
                name,
                stock,
                low_stock_threshold,
                supplier_contact,
            },
        ))
    }

    // =========================================================================
    // In-transaction writes
    // =========================================================================

    /// Appends one ledger row. Called in the same transaction as the
    /// stock update it records; the ledger is append-only by contract.
    pub(crate) async fn append_ledger(
        conn: &mut SqliteConnection,
        sku: &str,
        delta: i64,
        reason: AdjustmentReason,
        employee_id: i64,
    ) -> DbResult<()> {
        sqlx::query(
            r#"
            INSERT INTO inventory_adjustments (sku, adjusted_at, delta, reason, employee_id)
            VALUES (?1, ?2, ?3, ?4, ?5)
            "#,
        )
        .bind(sku)
        .bind(Utc::now())
        .bind(delta)
        .bind(reason)
        .bind(employee_id)
        .execute(conn)
        .await?;
        Ok(())
    }

    // =========================================================================
    // Post-commit hook
    // =========================================================================

    /// Runs the low-stock rule over committed snapshots and dispatches.
    /// Shared by the adjustment and receiving paths; checkout adds the
    /// large-transaction rule on top.
    pub(crate) fn dispatch_stock_alerts(&self, snapshots: &[StockSnapshot]) {
        self.dispatch(self.evaluator.evaluate_stock(snapshots));
    }

    pub(crate) fn dispatch(&self, events: Vec<AlertEvent>) {
        self.sink.send_all(events);
    }

    pub(crate) fn evaluator(&self) -> &AlertEvaluator {
        &self.evaluator
    }
}
