//! # Manual Stock Adjustments
//!
//! The non-sale stock mutation path: restocks outside the purchase
//! flow, damage write-offs, corrections after a physical count.
//!
//! Same discipline as checkout: guarded update plus ledger row in one
//! `BEGIN IMMEDIATE` transaction, low-stock rule evaluated after
//! commit. The `sale` and `purchase` reasons are rejected here: those
//! ledger rows exist only as side effects of their own document flows,
//! which keeps "ledger row without a sale" impossible by construction.

use chrono::Utc;
use sqlx::SqliteConnection;
use tracing::{info, instrument};

use super::{AdjustmentError, CheckoutEngine};
use crate::error::DbError;
use keel_core::{AdjustmentReason, StockSnapshot};

impl CheckoutEngine {
    /// Applies a signed manual stock adjustment and returns the new
    /// stock level.
    ///
    /// ## Errors
    /// - [`AdjustmentError::ZeroDelta`] for `delta == 0`
    /// - [`AdjustmentError::ReservedReason`] for `Sale` / `Purchase`
    /// - [`AdjustmentError::WouldGoNegative`] when the decrement exceeds
    ///   current stock; stock floors at zero, it never clamps silently
    #[instrument(skip(self))]
    pub async fn adjust_stock(
        &self,
        sku: &str,
        delta: i64,
        reason: AdjustmentReason,
        employee_id: i64,
    ) -> Result<i64, AdjustmentError> {
        if delta == 0 {
            return Err(AdjustmentError::ZeroDelta);
        }
        if matches!(reason, AdjustmentReason::Sale | AdjustmentReason::Purchase) {
            return Err(AdjustmentError::ReservedReason(reason));
        }

        let mut conn = self.begin_immediate().await?;
        let result = Self::adjust_in_tx(&mut conn, sku, delta, reason, employee_id).await;

        match result {
            Ok(snapshot) => {
                if let Err(e) = Self::commit(&mut conn).await {
                    Self::rollback(&mut conn).await;
                    return Err(e.into());
                }

                info!(
                    sku,
                    delta,
                    reason = reason.as_str(),
                    new_stock = snapshot.stock,
                    "Stock adjusted"
                );

                let new_stock = snapshot.stock;
                self.dispatch_stock_alerts(&[snapshot]);
                Ok(new_stock)
            }
            Err(e) => {
                Self::rollback(&mut conn).await;
                Err(e)
            }
        }
    }

    async fn adjust_in_tx(
        conn: &mut SqliteConnection,
        sku: &str,
        delta: i64,
        reason: AdjustmentReason,
        employee_id: i64,
    ) -> Result<StockSnapshot, AdjustmentError> {
        if !Self::employee_exists(&mut *conn, employee_id).await? {
            return Err(AdjustmentError::UnknownEmployee { employee_id });
        }

        let stock: Option<i64> = sqlx::query_scalar("SELECT stock FROM products WHERE sku = ?1")
            .bind(sku)
            .fetch_optional(&mut *conn)
            .await
            .map_err(DbError::from)?;
        let stock = stock.ok_or_else(|| AdjustmentError::UnknownSku {
            sku: sku.to_string(),
        })?;

        // Guarded: the floor is re-checked in the UPDATE, mirroring the
        // checkout decrement.
        let updated = sqlx::query(
            "UPDATE products SET stock = stock + ?2, updated_at = ?3 WHERE sku = ?1 AND stock + ?2 >= 0",
        )
        .bind(sku)
        .bind(delta)
        .bind(Utc::now())
        .execute(&mut *conn)
        .await
        .map_err(DbError::from)?;

        if updated.rows_affected() == 0 {
            return Err(AdjustmentError::WouldGoNegative {
                sku: sku.to_string(),
                stock,
                delta,
            });
        }

        Self::append_ledger(&mut *conn, sku, delta, reason, employee_id).await?;

        let snapshot = Self::stock_snapshot(&mut *conn, sku)
            .await?
            .ok_or_else(|| {
                AdjustmentError::Store(DbError::not_found("Product", sku))
            })?;

        Ok(snapshot)
    }
}
