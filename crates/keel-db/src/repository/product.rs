//! # Product Repository
//!
//! Catalog operations: products, categories, suppliers.
//!
//! ## Stock Is Off Limits
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                  Who May Write products.stock?                          │
//! │                                                                         │
//! │  ProductRepository ── insert ──────► stock = initial_stock (once)       │
//! │  ProductRepository ── update_details  (name, price, threshold, ...)     │
//! │                         │                                               │
//! │                         └── NEVER touches stock or initial_stock        │
//! │                                                                         │
//! │  CheckoutEngine (engine/) ─► the only stock writer, and every write     │
//! │  lands a matching ledger entry in the same transaction.                 │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::Utc;
use sqlx::SqlitePool;
use tracing::debug;

use crate::error::{DbError, DbResult};
use keel_core::{
    validation, Category, Product, Supplier, ValidationError, DEFAULT_LOW_STOCK_THRESHOLD,
};

/// Input for creating a product.
///
/// `initial_stock` seeds both `stock` and the frozen `initial_stock`
/// baseline the ledger reconciles against.
#[derive(Debug, Clone)]
pub struct NewProduct {
    pub sku: String,
    pub name: String,
    pub category_id: i64,
    pub price_cents: i64,
    pub cost_cents: i64,
    pub initial_stock: i64,
    /// Defaults to [`DEFAULT_LOW_STOCK_THRESHOLD`] when None.
    pub low_stock_threshold: Option<i64>,
    pub supplier_id: i64,
}

impl NewProduct {
    /// Validates field-level rules before any database work.
    pub fn validate(&self) -> Result<(), ValidationError> {
        validation::validate_sku(&self.sku)?;
        validation::validate_product_name(&self.name)?;
        validation::validate_price_cents(self.price_cents)?;
        validation::validate_cost_cents(self.cost_cents)?;
        validation::validate_stock(self.initial_stock)?;
        Ok(())
    }
}

/// Repository for catalog database operations.
///
/// ## Usage
/// ```rust,ignore
/// let repo = db.products();
/// let product = repo.get_by_sku("COKE-330").await?;
/// let needs_restock = repo.low_stock().await?;
/// ```
#[derive(Debug, Clone)]
pub struct ProductRepository {
    pool: SqlitePool,
}

impl ProductRepository {
    /// Creates a new ProductRepository.
    pub fn new(pool: SqlitePool) -> Self {
        ProductRepository { pool }
    }

    // =========================================================================
    // Products
    // =========================================================================

    /// Inserts a new product.
    ///
    /// Sets `stock = initial_stock` and freezes `initial_stock`; neither
    /// this method nor [`update_details`](Self::update_details) can move
    /// stock afterwards.
    ///
    /// ## Errors
    /// - [`DbError::UniqueViolation`] if the SKU already exists
    /// - [`DbError::ForeignKeyViolation`] for an unknown category/supplier
    pub async fn insert(&self, new: &NewProduct) -> DbResult<Product> {
        new.validate()
            .map_err(|e| DbError::Internal(e.to_string()))?;
        let threshold = new
            .low_stock_threshold
            .unwrap_or(DEFAULT_LOW_STOCK_THRESHOLD);

        debug!(sku = %new.sku, "Inserting product");

        let now = Utc::now();
        sqlx::query(
            r#"
            INSERT INTO products
                (sku, name, category_id, price_cents, cost_cents,
                 stock, initial_stock, low_stock_threshold, supplier_id,
                 created_at, updated_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?6, ?7, ?8, ?9, ?9)
            "#,
        )
        .bind(&new.sku)
        .bind(&new.name)
        .bind(new.category_id)
        .bind(new.price_cents)
        .bind(new.cost_cents)
        .bind(new.initial_stock)
        .bind(threshold)
        .bind(new.supplier_id)
        .bind(now)
        .execute(&self.pool)
        .await?;

        self.get_by_sku(&new.sku)
            .await?
            .ok_or_else(|| DbError::not_found("Product", &new.sku))
    }

    /// Gets a product by SKU, active or not.
    pub async fn get_by_sku(&self, sku: &str) -> DbResult<Option<Product>> {
        let product = sqlx::query_as::<_, Product>(
            r#"
            SELECT sku, name, category_id, price_cents, cost_cents,
                   stock, initial_stock, low_stock_threshold, supplier_id,
                   is_active, created_at, updated_at
            FROM products
            WHERE sku = ?1
            "#,
        )
        .bind(sku)
        .fetch_optional(&self.pool)
        .await?;

        Ok(product)
    }

    /// Lists active products sorted by name.
    pub async fn list_active(&self) -> DbResult<Vec<Product>> {
        let products = sqlx::query_as::<_, Product>(
            r#"
            SELECT sku, name, category_id, price_cents, cost_cents,
                   stock, initial_stock, low_stock_threshold, supplier_id,
                   is_active, created_at, updated_at
            FROM products
            WHERE is_active = 1
            ORDER BY name
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(products)
    }

    /// Lists active products currently below their low-stock threshold.
    ///
    /// This is the pull-based restock report; the push-based path is the
    /// post-commit alert stream.
    pub async fn low_stock(&self) -> DbResult<Vec<Product>> {
        let products = sqlx::query_as::<_, Product>(
            r#"
            SELECT sku, name, category_id, price_cents, cost_cents,
                   stock, initial_stock, low_stock_threshold, supplier_id,
                   is_active, created_at, updated_at
            FROM products
            WHERE is_active = 1 AND stock < low_stock_threshold
            ORDER BY stock ASC
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(products)
    }

    /// Updates a product's mutable catalog fields. Stock and
    /// initial_stock are deliberately not updatable here.
    pub async fn update_details(
        &self,
        sku: &str,
        name: &str,
        price_cents: i64,
        cost_cents: i64,
        low_stock_threshold: i64,
    ) -> DbResult<Product> {
        // Same shape rules as insert; a bad price must fail here, not
        // as a CHECK violation out of the UPDATE.
        validation::validate_product_name(name).map_err(|e| DbError::Internal(e.to_string()))?;
        validation::validate_price_cents(price_cents)
            .map_err(|e| DbError::Internal(e.to_string()))?;
        validation::validate_cost_cents(cost_cents)
            .map_err(|e| DbError::Internal(e.to_string()))?;
        validation::validate_stock(low_stock_threshold)
            .map_err(|e| DbError::Internal(e.to_string()))?;

        let result = sqlx::query(
            r#"
            UPDATE products
            SET name = ?2,
                price_cents = ?3,
                cost_cents = ?4,
                low_stock_threshold = ?5,
                updated_at = ?6
            WHERE sku = ?1
            "#,
        )
        .bind(sku)
        .bind(name)
        .bind(price_cents)
        .bind(cost_cents)
        .bind(low_stock_threshold)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Product", sku));
        }

        self.get_by_sku(sku)
            .await?
            .ok_or_else(|| DbError::not_found("Product", sku))
    }

    /// Soft-deletes a product (marks inactive, keeps sale history valid).
    pub async fn soft_delete(&self, sku: &str) -> DbResult<()> {
        let result =
            sqlx::query("UPDATE products SET is_active = 0, updated_at = ?2 WHERE sku = ?1")
                .bind(sku)
                .bind(Utc::now())
                .execute(&self.pool)
                .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Product", sku));
        }
        Ok(())
    }

    /// Counts active products.
    pub async fn count(&self) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM products WHERE is_active = 1")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    // =========================================================================
    // Categories / Suppliers
    // =========================================================================

    /// Inserts a category and returns it with its assigned id.
    pub async fn insert_category(&self, name: &str) -> DbResult<Category> {
        let result = sqlx::query("INSERT INTO categories (name) VALUES (?1)")
            .bind(name)
            .execute(&self.pool)
            .await?;

        Ok(Category {
            id: result.last_insert_rowid(),
            name: name.to_string(),
        })
    }

    /// Inserts a supplier and returns it with its assigned id.
    pub async fn insert_supplier(&self, name: &str, contact_info: &str) -> DbResult<Supplier> {
        let result = sqlx::query("INSERT INTO suppliers (name, contact_info) VALUES (?1, ?2)")
            .bind(name)
            .bind(contact_info)
            .execute(&self.pool)
            .await?;

        Ok(Supplier {
            id: result.last_insert_rowid(),
            name: name.to_string(),
            contact_info: contact_info.to_string(),
        })
    }

    /// Gets a supplier by id.
    pub async fn get_supplier(&self, id: i64) -> DbResult<Option<Supplier>> {
        let supplier =
            sqlx::query_as::<_, Supplier>("SELECT id, name, contact_info FROM suppliers WHERE id = ?1")
                .bind(id)
                .fetch_optional(&self.pool)
                .await?;
        Ok(supplier)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::{Database, DbConfig};

    async fn test_db() -> Database {
        Database::new(DbConfig::in_memory()).await.unwrap()
    }

    async fn seed_catalog(db: &Database) -> (i64, i64) {
        let category = db.products().insert_category("Beverages").await.unwrap();
        let supplier = db
            .products()
            .insert_supplier("Acme Wholesale", "orders@acme.example")
            .await
            .unwrap();
        (category.id, supplier.id)
    }

    fn new_product(sku: &str, category_id: i64, supplier_id: i64, stock: i64) -> NewProduct {
        NewProduct {
            sku: sku.to_string(),
            name: format!("{sku} product"),
            category_id,
            price_cents: 299,
            cost_cents: 120,
            initial_stock: stock,
            low_stock_threshold: None,
            supplier_id,
        }
    }

    #[tokio::test]
    async fn test_insert_freezes_initial_stock() {
        let db = test_db().await;
        let (cat, sup) = seed_catalog(&db).await;

        let product = db
            .products()
            .insert(&new_product("COKE-330", cat, sup, 100))
            .await
            .unwrap();

        assert_eq!(product.stock, 100);
        assert_eq!(product.initial_stock, 100);
        assert_eq!(product.low_stock_threshold, DEFAULT_LOW_STOCK_THRESHOLD);
        assert!(product.is_active);
    }

    #[tokio::test]
    async fn test_duplicate_sku_rejected() {
        let db = test_db().await;
        let (cat, sup) = seed_catalog(&db).await;
        let repo = db.products();

        repo.insert(&new_product("COKE-330", cat, sup, 10))
            .await
            .unwrap();
        let err = repo
            .insert(&new_product("COKE-330", cat, sup, 10))
            .await
            .unwrap_err();

        assert!(matches!(err, DbError::UniqueViolation { .. }));
    }

    #[tokio::test]
    async fn test_update_details_leaves_stock_alone() {
        let db = test_db().await;
        let (cat, sup) = seed_catalog(&db).await;
        let repo = db.products();

        repo.insert(&new_product("COKE-330", cat, sup, 50))
            .await
            .unwrap();
        let updated = repo
            .update_details("COKE-330", "Coca-Cola 330ml", 349, 130, 10)
            .await
            .unwrap();

        assert_eq!(updated.name, "Coca-Cola 330ml");
        assert_eq!(updated.price_cents, 349);
        assert_eq!(updated.low_stock_threshold, 10);
        assert_eq!(updated.stock, 50);
        assert_eq!(updated.initial_stock, 50);
    }

    #[tokio::test]
    async fn test_update_details_rejects_bad_money_before_sql() {
        let db = test_db().await;
        let (cat, sup) = seed_catalog(&db).await;
        let repo = db.products();

        repo.insert(&new_product("COKE-330", cat, sup, 50))
            .await
            .unwrap();

        // Non-positive price is a validation error, not a CHECK violation
        // surfacing from the UPDATE.
        let err = repo
            .update_details("COKE-330", "Coca-Cola 330ml", 0, 120, 25)
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::Internal(_)));

        let err = repo
            .update_details("COKE-330", "Coca-Cola 330ml", 349, -1, 25)
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::Internal(_)));

        // Row is untouched.
        let product = repo.get_by_sku("COKE-330").await.unwrap().unwrap();
        assert_eq!(product.price_cents, 299);
        assert_eq!(product.cost_cents, 120);
    }

    #[tokio::test]
    async fn test_low_stock_report() {
        let db = test_db().await;
        let (cat, sup) = seed_catalog(&db).await;
        let repo = db.products();

        repo.insert(&new_product("LOW", cat, sup, 3)).await.unwrap();
        repo.insert(&new_product("OK", cat, sup, 500)).await.unwrap();

        let low = repo.low_stock().await.unwrap();
        assert_eq!(low.len(), 1);
        assert_eq!(low[0].sku, "LOW");
    }

    #[tokio::test]
    async fn test_soft_delete_hides_from_listing() {
        let db = test_db().await;
        let (cat, sup) = seed_catalog(&db).await;
        let repo = db.products();

        repo.insert(&new_product("COKE-330", cat, sup, 10))
            .await
            .unwrap();
        repo.soft_delete("COKE-330").await.unwrap();

        assert!(repo.list_active().await.unwrap().is_empty());
        // Still readable directly (sale history needs it).
        let product = repo.get_by_sku("COKE-330").await.unwrap().unwrap();
        assert!(!product.is_active);
    }
}
