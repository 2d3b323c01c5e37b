//! # Purchase Receiving
//!
//! The stock-increasing mirror of checkout: receiving a supplier
//! delivery commits a Purchase, its items, the stock increments and
//! one `purchase` ledger row per SKU in a single transaction.
//!
//! Unit costs are frozen at receiving time (from the caller's line
//! when the delivery note names a cost, otherwise from the product's
//! catalog cost), so later catalog edits never rewrite purchase
//! history.

use chrono::Utc;
use sqlx::SqliteConnection;
use tracing::{info, instrument};

use super::{CheckoutEngine, PurchaseError};
use crate::error::DbError;
use keel_core::{validation, AdjustmentReason, StockSnapshot};

/// One received line: a SKU, how many units arrived, and optionally the
/// unit cost from the delivery note.
#[derive(Debug, Clone)]
pub struct PurchaseLine {
    pub sku: String,
    pub quantity: i64,
    /// Unit cost in cents; None freezes the product's catalog cost.
    pub unit_cost_cents: Option<i64>,
}

impl PurchaseLine {
    /// Creates a line costed from the product catalog.
    pub fn new(sku: impl Into<String>, quantity: i64) -> Self {
        PurchaseLine {
            sku: sku.into(),
            quantity,
            unit_cost_cents: None,
        }
    }

    /// Creates a line with an explicit unit cost.
    pub fn with_cost(sku: impl Into<String>, quantity: i64, unit_cost_cents: i64) -> Self {
        PurchaseLine {
            sku: sku.into(),
            quantity,
            unit_cost_cents: Some(unit_cost_cents),
        }
    }
}

impl CheckoutEngine {
    /// Receives a supplier purchase atomically and returns the new
    /// purchase id.
    ///
    /// ## Guarantees
    /// On `Ok`, the purchase, its items, the stock increments and one
    /// ledger row per SKU are all durable. On `Err`, none of them exist.
    #[instrument(skip(self, lines), fields(line_count = lines.len()))]
    pub async fn receive_purchase(
        &self,
        lines: &[PurchaseLine],
        supplier_id: i64,
        employee_id: i64,
    ) -> Result<i64, PurchaseError> {
        if lines.is_empty() {
            return Err(PurchaseError::EmptyPurchase);
        }
        for line in lines {
            validation::validate_sku(&line.sku)?;
            validation::validate_quantity(line.quantity)?;
            if let Some(cost) = line.unit_cost_cents {
                validation::validate_cost_cents(cost)?;
            }
        }

        let mut conn = self.begin_immediate().await?;
        let result = Self::receive_in_tx(&mut conn, lines, supplier_id, employee_id).await;

        match result {
            Ok((purchase_id, total_cents, snapshots)) => {
                if let Err(e) = Self::commit(&mut conn).await {
                    Self::rollback(&mut conn).await;
                    return Err(e.into());
                }

                info!(
                    purchase_id,
                    total_cents, supplier_id, employee_id, "Purchase received"
                );

                // Increments rarely trip the low-stock rule, but the
                // post-commit hook runs uniformly on every mutation
                // path: a short delivery can still leave stock low.
                self.dispatch_stock_alerts(&snapshots);

                Ok(purchase_id)
            }
            Err(e) => {
                Self::rollback(&mut conn).await;
                Err(e)
            }
        }
    }

    async fn receive_in_tx(
        conn: &mut SqliteConnection,
        lines: &[PurchaseLine],
        supplier_id: i64,
        employee_id: i64,
    ) -> Result<(i64, i64, Vec<StockSnapshot>), PurchaseError> {
        if !Self::supplier_exists(&mut *conn, supplier_id).await? {
            return Err(PurchaseError::UnknownSupplier { supplier_id });
        }
        if !Self::employee_exists(&mut *conn, employee_id).await? {
            return Err(PurchaseError::UnknownEmployee { employee_id });
        }

        // Freeze each line's unit cost and compute the total.
        let mut costed: Vec<(&PurchaseLine, i64)> = Vec::with_capacity(lines.len());
        let mut total_cents: i64 = 0;

        for line in lines {
            let catalog_cost: Option<i64> =
                sqlx::query_scalar("SELECT cost_cents FROM products WHERE sku = ?1")
                    .bind(&line.sku)
                    .fetch_optional(&mut *conn)
                    .await
                    .map_err(DbError::from)?;
            let catalog_cost = catalog_cost.ok_or_else(|| PurchaseError::UnknownSku {
                sku: line.sku.clone(),
            })?;

            let unit_cost = line.unit_cost_cents.unwrap_or(catalog_cost);
            total_cents += unit_cost * line.quantity;
            costed.push((line, unit_cost));
        }

        let purchase_at = Utc::now();
        let result = sqlx::query(
            "INSERT INTO purchases (purchase_at, total_cents, supplier_id, employee_id) VALUES (?1, ?2, ?3, ?4)",
        )
        .bind(purchase_at)
        .bind(total_cents)
        .bind(supplier_id)
        .bind(employee_id)
        .execute(&mut *conn)
        .await
        .map_err(DbError::from)?;
        let purchase_id = result.last_insert_rowid();

        for (line, unit_cost) in &costed {
            sqlx::query(
                "INSERT INTO purchase_items (purchase_id, sku, quantity, unit_cost_cents) VALUES (?1, ?2, ?3, ?4)",
            )
            .bind(purchase_id)
            .bind(&line.sku)
            .bind(line.quantity)
            .bind(unit_cost)
            .execute(&mut *conn)
            .await
            .map_err(DbError::from)?;

            sqlx::query("UPDATE products SET stock = stock + ?2, updated_at = ?3 WHERE sku = ?1")
                .bind(&line.sku)
                .bind(line.quantity)
                .bind(purchase_at)
                .execute(&mut *conn)
                .await
                .map_err(DbError::from)?;

            Self::append_ledger(
                &mut *conn,
                &line.sku,
                line.quantity,
                AdjustmentReason::Purchase,
                employee_id,
            )
            .await?;
        }

        let mut snapshots = Vec::with_capacity(costed.len());
        for (line, _) in &costed {
            if let Some(snapshot) = Self::stock_snapshot(&mut *conn, &line.sku).await? {
                snapshots.push(snapshot);
            }
        }

        Ok((purchase_id, total_cents, snapshots))
    }
}
