//! # Inventory Adjustment Ledger Repository
//!
//! Read-side access to the append-only stock ledger, plus the
//! reconciliation check that proves stock levels and ledger history
//! agree.
//!
//! ## Reconciliation Invariant
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │              initial_stock + Σ(ledger deltas) == stock                  │
//! │                                                                         │
//! │  products.initial_stock   frozen at creation                            │
//! │  inventory_adjustments    one signed delta per stock mutation,          │
//! │                           appended in the mutating transaction          │
//! │  products.stock           current level                                 │
//! │                                                                         │
//! │  If the equality ever fails, a stock write bypassed the engine or a     │
//! │  ledger append was skipped. reconcile() makes the check a one-call      │
//! │  audit.                                                                 │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Writes happen only inside engine transactions; there is no public
//! append here and nothing ever updates or deletes an entry.

use serde::Serialize;
use sqlx::SqlitePool;

use crate::error::{DbError, DbResult};
use keel_core::InventoryAdjustment;

/// Result of reconciling one SKU's stock against its ledger.
#[derive(Debug, Clone, Serialize)]
pub struct Reconciliation {
    pub sku: String,
    /// Baseline frozen at product creation.
    pub initial_stock: i64,
    /// Sum of all signed ledger deltas for the SKU.
    pub ledger_delta: i64,
    /// `initial_stock + ledger_delta`: what stock should be.
    pub expected_stock: i64,
    /// What `products.stock` actually holds.
    pub actual_stock: i64,
}

impl Reconciliation {
    /// True when ledger history fully explains the current stock level.
    #[inline]
    pub fn is_consistent(&self) -> bool {
        self.expected_stock == self.actual_stock
    }
}

/// Repository for ledger reads and reconciliation.
#[derive(Debug, Clone)]
pub struct AdjustmentRepository {
    pool: SqlitePool,
}

impl AdjustmentRepository {
    /// Creates a new AdjustmentRepository.
    pub fn new(pool: SqlitePool) -> Self {
        AdjustmentRepository { pool }
    }

    /// Lists ledger entries for a SKU, oldest first.
    pub async fn list_for_sku(&self, sku: &str) -> DbResult<Vec<InventoryAdjustment>> {
        let entries = sqlx::query_as::<_, InventoryAdjustment>(
            r#"
            SELECT id, sku, adjusted_at, delta, reason, employee_id
            FROM inventory_adjustments
            WHERE sku = ?1
            ORDER BY id
            "#,
        )
        .bind(sku)
        .fetch_all(&self.pool)
        .await?;

        Ok(entries)
    }

    /// Sums the signed deltas recorded for a SKU.
    pub async fn sum_deltas(&self, sku: &str) -> DbResult<i64> {
        let sum: i64 = sqlx::query_scalar(
            "SELECT COALESCE(SUM(delta), 0) FROM inventory_adjustments WHERE sku = ?1",
        )
        .bind(sku)
        .fetch_one(&self.pool)
        .await?;

        Ok(sum)
    }

    /// Reconciles one SKU: does the ledger explain the current stock?
    ///
    /// ## Errors
    /// - [`DbError::NotFound`] for an unknown SKU
    pub async fn reconcile(&self, sku: &str) -> DbResult<Reconciliation> {
        let row: Option<(i64, i64)> =
            sqlx::query_as("SELECT initial_stock, stock FROM products WHERE sku = ?1")
                .bind(sku)
                .fetch_optional(&self.pool)
                .await?;

        let (initial_stock, actual_stock) =
            row.ok_or_else(|| DbError::not_found("Product", sku))?;

        let ledger_delta = self.sum_deltas(sku).await?;

        Ok(Reconciliation {
            sku: sku.to_string(),
            initial_stock,
            ledger_delta,
            expected_stock: initial_stock + ledger_delta,
            actual_stock,
        })
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
