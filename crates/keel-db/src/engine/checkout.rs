//! # Checkout
//!
//! The atomic sale path: one call turns a cart into a committed sale,
//! its line items, the stock decrements, and the matching ledger rows,
//! or into nothing at all.
//!
//! ## Commit Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  checkout(lines, employee, customer?)                                   │
//! │       │                                                                 │
//! │       ├── merge duplicate SKUs, validate shape        (no db yet)       │
//! │       ├── resolve customer: None → anonymous (id 0)                     │
//! │       │                                                                 │
//! │       ▼  BEGIN IMMEDIATE                                                │
//! │       ├── employee / customer existence                                 │
//! │       ├── per line: fresh product read → freeze price, check stock      │
//! │       ├── INSERT sale (total = Σ price×qty)                             │
//! │       ├── per line: INSERT sale_item                                    │
//! │       │             UPDATE products SET stock = stock - qty             │
//! │       │                WHERE sku = ? AND stock >= qty   ← guarded       │
//! │       │             INSERT ledger row (delta = -qty, reason 'sale')     │
//! │       ├── read stock snapshots for the alert rules                      │
//! │       ▼  COMMIT                                                         │
//! │       │                                                                 │
//! │       ├── evaluate low-stock + large-transaction rules                  │
//! │       └── return Receipt                                                │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! A price change between the in-transaction read and a later retry is
//! fine: the receipt and sale items carry the frozen price actually
//! charged.

use chrono::Utc;
use sqlx::SqliteConnection;
use tracing::{info, instrument, warn};

use super::{CheckoutEngine, CheckoutError};
use crate::error::DbError;
use keel_core::{
    cart::merge_lines, validation, CartLine, Receipt, ReceiptLine, StockSnapshot,
    ValidationError, AdjustmentReason, ANONYMOUS_CUSTOMER_ID, MAX_CART_LINES,
};

impl CheckoutEngine {
    /// Commits a sale atomically.
    ///
    /// ## Arguments
    /// * `lines` - requested (SKU, quantity) pairs; duplicates are merged
    /// * `employee_id` - cashier the sale is attributed to
    /// * `customer_id` - selected customer, or None for a walk-in sale
    ///
    /// ## Guarantees
    /// On `Ok`, the sale, its items, the stock decrements and one ledger
    /// row per SKU are all durable. On `Err`, none of them exist.
    #[instrument(skip(self, lines), fields(line_count = lines.len()))]
    pub async fn checkout(
        &self,
        lines: &[CartLine],
        employee_id: i64,
        customer_id: Option<i64>,
    ) -> Result<Receipt, CheckoutError> {
        // Shape validation before any database work.
        if lines.is_empty() {
            return Err(CheckoutError::EmptyCart);
        }

        let merged = merge_lines(lines);
        if merged.len() > MAX_CART_LINES {
            return Err(CheckoutError::InvalidLine(ValidationError::OutOfRange {
                field: "cart lines".to_string(),
                min: 1,
                max: MAX_CART_LINES as i64,
            }));
        }
        for line in &merged {
            validation::validate_sku(&line.sku)?;
            validation::validate_quantity(line.quantity)?;
        }

        let customer_id = customer_id.unwrap_or(ANONYMOUS_CUSTOMER_ID);

        let mut conn = self.begin_immediate().await?;
        let result = Self::checkout_in_tx(&mut conn, &merged, employee_id, customer_id).await;

        match result {
            Ok((receipt, snapshots)) => {
                if let Err(e) = Self::commit(&mut conn).await {
                    Self::rollback(&mut conn).await;
                    return Err(e.into());
                }

                info!(
                    sale_id = receipt.sale_id,
                    total_cents = receipt.total_cents,
                    employee_id,
                    customer_id,
                    "Checkout committed"
                );
                if receipt.is_zero_total() {
                    warn!(sale_id = receipt.sale_id, "Zero-total sale committed");
                }

                // Strictly post-commit: alert evaluation and dispatch
                // can never take the sale back.
                self.dispatch(self.evaluator().evaluate_checkout(&receipt, &snapshots));

                Ok(receipt)
            }
            Err(e) => {
                Self::rollback(&mut conn).await;
                Err(e)
            }
        }
    }

    /// The body of the checkout transaction. Any error here leaves the
    /// caller to roll back.
    async fn checkout_in_tx(
        conn: &mut SqliteConnection,
        lines: &[CartLine],
        employee_id: i64,
        customer_id: i64,
    ) -> Result<(Receipt, Vec<StockSnapshot>), CheckoutError> {
        if !Self::employee_exists(&mut *conn, employee_id).await? {
            return Err(CheckoutError::UnknownEmployee { employee_id });
        }
        if !Self::customer_exists(&mut *conn, customer_id).await? {
            return Err(CheckoutError::UnknownCustomer { customer_id });
        }

        // Fresh reads: freeze prices and verify stock under the write
        // lock, so no concurrent checkout can invalidate them.
        let mut receipt_lines = Vec::with_capacity(lines.len());
        let mut total_cents: i64 = 0;

        for line in lines {
            let row: Option<(String, i64, i64)> = sqlx::query_as(
                "SELECT name, price_cents, stock FROM products WHERE sku = ?1 AND is_active = 1",
            )
            .bind(&line.sku)
            .fetch_optional(&mut *conn)
            .await
            .map_err(DbError::from)?;

            let (name, price_cents, stock) = row.ok_or_else(|| CheckoutError::UnknownSku {
                sku: line.sku.clone(),
            })?;

            if stock < line.quantity {
                return Err(CheckoutError::InsufficientStock {
                    sku: line.sku.clone(),
                    requested: line.quantity,
                    available: stock,
                });
            }

            total_cents += price_cents * line.quantity;
            receipt_lines.push(ReceiptLine {
                sku: line.sku.clone(),
                name,
                quantity: line.quantity,
                unit_price_cents: price_cents,
            });
        }

        let sale_at = Utc::now();
        let result = sqlx::query(
            "INSERT INTO sales (sale_at, total_cents, employee_id, customer_id) VALUES (?1, ?2, ?3, ?4)",
        )
        .bind(sale_at)
        .bind(total_cents)
        .bind(employee_id)
        .bind(customer_id)
        .execute(&mut *conn)
        .await
        .map_err(DbError::from)?;
        let sale_id = result.last_insert_rowid();

        for line in receipt_lines.iter() {
            sqlx::query(
                "INSERT INTO sale_items (sale_id, sku, quantity, unit_price_cents) VALUES (?1, ?2, ?3, ?4)",
            )
            .bind(sale_id)
            .bind(&line.sku)
            .bind(line.quantity)
            .bind(line.unit_price_cents)
            .execute(&mut *conn)
            .await
            .map_err(DbError::from)?;

            // Guarded decrement: the stock condition is re-checked in
            // the UPDATE itself, so even a check missed above cannot
            // drive stock negative.
            let updated = sqlx::query(
                "UPDATE products SET stock = stock - ?2, updated_at = ?3 WHERE sku = ?1 AND stock >= ?2",
            )
            .bind(&line.sku)
            .bind(line.quantity)
            .bind(sale_at)
            .execute(&mut *conn)
            .await
            .map_err(DbError::from)?;

            if updated.rows_affected() == 0 {
                let available: i64 =
                    sqlx::query_scalar("SELECT stock FROM products WHERE sku = ?1")
                        .bind(&line.sku)
                        .fetch_one(&mut *conn)
                        .await
                        .map_err(DbError::from)?;
                return Err(CheckoutError::InsufficientStock {
                    sku: line.sku.clone(),
                    requested: line.quantity,
                    available,
                });
            }

            Self::append_ledger(
                &mut *conn,
                &line.sku,
                -line.quantity,
                AdjustmentReason::Sale,
                employee_id,
            )
            .await?;
        }

        // Snapshots read inside the transaction so they describe exactly
        // the state that commits.
        let mut snapshots = Vec::with_capacity(receipt_lines.len());
        for line in receipt_lines.iter() {
            if let Some(snapshot) = Self::stock_snapshot(&mut *conn, &line.sku).await? {
                snapshots.push(snapshot);
            }
        }

        let receipt = Receipt {
            sale_id,
            sale_at,
            lines: receipt_lines,
            total_cents,
            employee_id,
            customer_id,
        };

        Ok((receipt, snapshots))
    }
}
