//! # Sale Repository
//!
//! Read-side operations for sales and sale items.
//!
//! ## Why Read-Only
//! Sales are written exactly once, by the checkout engine, inside the
//! same transaction that decrements stock and appends the ledger entry.
//! Committed sales are immutable history: corrections happen through
//! new adjustments, never edits. This repository therefore exposes no
//! insert, update or delete.

use sqlx::SqlitePool;

use crate::error::DbResult;
use keel_core::{Sale, SaleItem};

/// Repository for sale reads.
///
/// ## Usage
/// ```rust,ignore
/// let sale = db.sales().get_by_id(receipt.sale_id).await?.unwrap();
/// let items = db.sales().get_items(sale.id).await?;
/// ```
#[derive(Debug, Clone)]
pub struct SaleRepository {
    pool: SqlitePool,
}

impl SaleRepository {
    /// Creates a new SaleRepository.
    pub fn new(pool: SqlitePool) -> Self {
        SaleRepository { pool }
    }

    /// Gets a sale by id.
    pub async fn get_by_id(&self, id: i64) -> DbResult<Option<Sale>> {
        let sale = sqlx::query_as::<_, Sale>(
            "SELECT id, sale_at, total_cents, employee_id, customer_id FROM sales WHERE id = ?1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(sale)
    }

    /// Gets the line items of a sale, in insertion order.
    pub async fn get_items(&self, sale_id: i64) -> DbResult<Vec<SaleItem>> {
        let items = sqlx::query_as::<_, SaleItem>(
            r#"
            SELECT id, sale_id, sku, quantity, unit_price_cents
            FROM sale_items
            WHERE sale_id = ?1
            ORDER BY id
            "#,
        )
        .bind(sale_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(items)
    }

    /// Lists the most recent sales, newest first.
    pub async fn list_recent(&self, limit: u32) -> DbResult<Vec<Sale>> {
        let sales = sqlx::query_as::<_, Sale>(
            r#"
            SELECT id, sale_at, total_cents, employee_id, customer_id
            FROM sales
            ORDER BY id DESC
            LIMIT ?1
            "#,
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(sales)
    }

    /// Lists sales attributed to one customer, newest first.
    pub async fn list_for_customer(&self, customer_id: i64) -> DbResult<Vec<Sale>> {
        let sales = sqlx::query_as::<_, Sale>(
            r#"
            SELECT id, sale_at, total_cents, employee_id, customer_id
            FROM sales
            WHERE customer_id = ?1
            ORDER BY id DESC
            "#,
        )
        .bind(customer_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(sales)
    }

    /// Counts committed sales.
    pub async fn count(&self) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM sales")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }
}
