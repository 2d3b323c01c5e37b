//! # Purchase Repository
//!
//! Read-side operations for supplier purchases and their items.
//!
//! Purchases mirror sales on the supplier side: written exactly once by
//! the engine's receiving path (stock increments plus ledger entries in
//! one transaction), immutable afterwards.

use sqlx::SqlitePool;

use crate::error::DbResult;
use keel_core::{Purchase, PurchaseItem};

/// Repository for purchase reads.
#[derive(Debug, Clone)]
pub struct PurchaseRepository {
    pool: SqlitePool,
}

impl PurchaseRepository {
    /// Creates a new PurchaseRepository.
    pub fn new(pool: SqlitePool) -> Self {
        PurchaseRepository { pool }
    }

    /// Gets a purchase by id.
    pub async fn get_by_id(&self, id: i64) -> DbResult<Option<Purchase>> {
        let purchase = sqlx::query_as::<_, Purchase>(
            r#"
            SELECT id, purchase_at, total_cents, supplier_id, employee_id
            FROM purchases
            WHERE id = ?1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(purchase)
    }

    /// Gets the line items of a purchase, in insertion order.
    pub async fn get_items(&self, purchase_id: i64) -> DbResult<Vec<PurchaseItem>> {
        let items = sqlx::query_as::<_, PurchaseItem>(
            r#"
            SELECT id, purchase_id, sku, quantity, unit_cost_cents
            FROM purchase_items
            WHERE purchase_id = ?1
            ORDER BY id
            "#,
        )
        .bind(purchase_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(items)
    }

    /// Lists purchases from one supplier, newest first.
    pub async fn list_for_supplier(&self, supplier_id: i64) -> DbResult<Vec<Purchase>> {
        let purchases = sqlx::query_as::<_, Purchase>(
            r#"
            SELECT id, purchase_at, total_cents, supplier_id, employee_id
            FROM purchases
            WHERE supplier_id = ?1
            ORDER BY id DESC
            "#,
        )
        .bind(supplier_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(purchases)
    }
}
