//! Integration tests for the checkout transaction engine: atomicity,
//! ledger reconciliation, alert dispatch, concurrency.

use std::sync::atomic::{AtomicU32, Ordering};

use keel_core::{
    AdjustmentReason, AlertEvent, AlertThresholds, CartLine, ANONYMOUS_CUSTOMER_ID,
};
use keel_db::{
    AdjustmentError, AlertSink, CheckoutEngine, CheckoutError, Database, DbConfig, DbError,
    NewProduct, PurchaseLine,
};
use tokio::sync::mpsc::UnboundedReceiver;

// =============================================================================
// Fixtures
// =============================================================================

struct Fixture {
    db: Database,
    engine: CheckoutEngine,
    alerts: UnboundedReceiver<AlertEvent>,
    employee_id: i64,
    supplier_id: i64,
    category_id: i64,
}

async fn fixture() -> Fixture {
    fixture_with(DbConfig::in_memory(), AlertThresholds::default()).await
}

async fn fixture_with(config: DbConfig, thresholds: AlertThresholds) -> Fixture {
    let db = Database::new(config).await.unwrap();
    let (sink, alerts) = AlertSink::channel();
    let engine = CheckoutEngine::new(db.clone(), thresholds, sink);

    let category = db.products().insert_category("Beverages").await.unwrap();
    let supplier = db
        .products()
        .insert_supplier("Acme Wholesale", "orders@acme.example")
        .await
        .unwrap();
    let employee = db.employees().insert("Sam Park", Some("cashier")).await.unwrap();

    Fixture {
        db,
        engine,
        alerts,
        employee_id: employee.id,
        supplier_id: supplier.id,
        category_id: category.id,
    }
}

impl Fixture {
    async fn add_product(&self, sku: &str, price_cents: i64, stock: i64) {
        self.add_product_with_threshold(sku, price_cents, stock, 25)
            .await;
    }

    async fn add_product_with_threshold(
        &self,
        sku: &str,
        price_cents: i64,
        stock: i64,
        threshold: i64,
    ) {
        self.db
            .products()
            .insert(&NewProduct {
                sku: sku.to_string(),
                name: format!("{sku} product"),
                category_id: self.category_id,
                price_cents,
                cost_cents: price_cents / 2,
                initial_stock: stock,
                low_stock_threshold: Some(threshold),
                supplier_id: self.supplier_id,
            })
            .await
            .unwrap();
    }

    async fn stock_of(&self, sku: &str) -> i64 {
        self.db
            .products()
            .get_by_sku(sku)
            .await
            .unwrap()
            .unwrap()
            .stock
    }
}

// =============================================================================
// Scenario: simple checkout
// =============================================================================

#[tokio::test]
async fn checkout_commits_sale_items_stock_and_ledger_atomically() {
    let mut fx = fixture().await;
    fx.add_product("COKE-330", 299, 100).await;
    fx.add_product("CHIPS-50", 150, 80).await;

    let receipt = fx
        .engine
        .checkout(
            &[CartLine::new("COKE-330", 3), CartLine::new("CHIPS-50", 2)],
            fx.employee_id,
            None,
        )
        .await
        .unwrap();

    // Receipt totals match the frozen line prices.
    assert_eq!(receipt.total_cents, 3 * 299 + 2 * 150);
    assert_eq!(receipt.lines.len(), 2);
    assert_eq!(receipt.customer_id, ANONYMOUS_CUSTOMER_ID);
    assert!(!receipt.is_zero_total());

    // Sale row agrees with the receipt, and with its items.
    let sale = fx.db.sales().get_by_id(receipt.sale_id).await.unwrap().unwrap();
    let items = fx.db.sales().get_items(receipt.sale_id).await.unwrap();
    assert_eq!(sale.total_cents, receipt.total_cents);
    let item_sum: i64 = items.iter().map(|i| i.unit_price_cents * i.quantity).sum();
    assert_eq!(item_sum, sale.total_cents);

    // Stock moved, and the ledger explains the move.
    assert_eq!(fx.stock_of("COKE-330").await, 97);
    assert_eq!(fx.stock_of("CHIPS-50").await, 78);

    let ledger = fx.db.adjustments().list_for_sku("COKE-330").await.unwrap();
    assert_eq!(ledger.len(), 1);
    assert_eq!(ledger[0].delta, -3);
    assert_eq!(ledger[0].reason, AdjustmentReason::Sale);
    assert_eq!(ledger[0].employee_id, fx.employee_id);

    let recon = fx.db.adjustments().reconcile("COKE-330").await.unwrap();
    assert!(recon.is_consistent());
    assert_eq!(recon.expected_stock, 97);

    // Stock is comfortable and the sale is small: no alerts.
    assert!(fx.alerts.try_recv().is_err());
}

#[tokio::test]
async fn checkout_can_drain_stock_to_exactly_zero() {
    let fx = fixture().await;
    fx.add_product_with_threshold("COKE-330", 299, 10, 0).await;

    fx.engine
        .checkout(&[CartLine::new("COKE-330", 10)], fx.employee_id, None)
        .await
        .unwrap();

    assert_eq!(fx.stock_of("COKE-330").await, 0);
    let ledger = fx.db.adjustments().list_for_sku("COKE-330").await.unwrap();
    assert_eq!(ledger.len(), 1);
    assert_eq!(ledger[0].delta, -10);

    // The next unit is unsellable.
    let err = fx
        .engine
        .checkout(&[CartLine::new("COKE-330", 1)], fx.employee_id, None)
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        CheckoutError::InsufficientStock { available: 0, .. }
    ));
}

#[tokio::test]
async fn checkout_merges_duplicate_skus_before_stock_check() {
    let fx = fixture().await;
    fx.add_product("COKE-330", 299, 5).await;

    // 3 + 3 = 6 requested against 5 in stock. Two naive per-line checks
    // would each pass; the merged check must not.
    let err = fx
        .engine
        .checkout(
            &[CartLine::new("COKE-330", 3), CartLine::new("COKE-330", 3)],
            fx.employee_id,
            None,
        )
        .await
        .unwrap_err();

    match err {
        CheckoutError::InsufficientStock {
            sku,
            requested,
            available,
        } => {
            assert_eq!(sku, "COKE-330");
            assert_eq!(requested, 6);
            assert_eq!(available, 5);
        }
        other => panic!("unexpected error: {other:?}"),
    }
    assert_eq!(fx.stock_of("COKE-330").await, 5);
}

#[tokio::test]
async fn checkout_freezes_price_against_later_catalog_edits() {
    let fx = fixture().await;
    fx.add_product("COKE-330", 299, 100).await;

    let receipt = fx
        .engine
        .checkout(&[CartLine::new("COKE-330", 1)], fx.employee_id, None)
        .await
        .unwrap();

    // Catalog price changes after the sale.
    fx.db
        .products()
        .update_details("COKE-330", "Coca-Cola 330ml", 999, 120, 25)
        .await
        .unwrap();

    // Committed history still shows the price actually charged.
    let items = fx.db.sales().get_items(receipt.sale_id).await.unwrap();
    assert_eq!(items[0].unit_price_cents, 299);
    let sale = fx.db.sales().get_by_id(receipt.sale_id).await.unwrap().unwrap();
    assert_eq!(sale.total_cents, 299);
}

// =============================================================================
// Scenario: failed checkout leaves no trace
// =============================================================================

#[tokio::test]
async fn failed_checkout_rolls_back_every_write() {
    let mut fx = fixture().await;
    fx.add_product("COKE-330", 299, 100).await;
    fx.add_product("CHIPS-50", 150, 1).await;

    // Second line fails after the first would have decremented.
    let err = fx
        .engine
        .checkout(
            &[CartLine::new("COKE-330", 5), CartLine::new("CHIPS-50", 2)],
            fx.employee_id,
            None,
        )
        .await
        .unwrap_err();
    assert!(matches!(err, CheckoutError::InsufficientStock { .. }));
    assert!(!err.is_retryable());

    // Nothing committed: no sale, no items, full stock, empty ledger.
    assert_eq!(fx.db.sales().count().await.unwrap(), 0);
    assert_eq!(fx.stock_of("COKE-330").await, 100);
    assert_eq!(fx.stock_of("CHIPS-50").await, 1);
    assert!(fx
        .db
        .adjustments()
        .list_for_sku("COKE-330")
        .await
        .unwrap()
        .is_empty());

    // And no alert fired for the failed attempt.
    assert!(fx.alerts.try_recv().is_err());
}

#[tokio::test]
async fn checkout_validation_errors() {
    let fx = fixture().await;
    fx.add_product("COKE-330", 299, 100).await;

    assert!(matches!(
        fx.engine.checkout(&[], fx.employee_id, None).await.unwrap_err(),
        CheckoutError::EmptyCart
    ));
    assert!(matches!(
        fx.engine
            .checkout(&[CartLine::new("COKE-330", 0)], fx.employee_id, None)
            .await
            .unwrap_err(),
        CheckoutError::InvalidLine(_)
    ));
    assert!(matches!(
        fx.engine
            .checkout(&[CartLine::new("COKE-330", 1000)], fx.employee_id, None)
            .await
            .unwrap_err(),
        CheckoutError::InvalidLine(_)
    ));
    assert!(matches!(
        fx.engine
            .checkout(&[CartLine::new("GHOST", 1)], fx.employee_id, None)
            .await
            .unwrap_err(),
        CheckoutError::UnknownSku { .. }
    ));
    assert!(matches!(
        fx.engine
            .checkout(&[CartLine::new("COKE-330", 1)], 9999, None)
            .await
            .unwrap_err(),
        CheckoutError::UnknownEmployee { .. }
    ));
    assert!(matches!(
        fx.engine
            .checkout(&[CartLine::new("COKE-330", 1)], fx.employee_id, Some(9999))
            .await
            .unwrap_err(),
        CheckoutError::UnknownCustomer { .. }
    ));
}

#[tokio::test]
async fn soft_deleted_product_is_not_sellable() {
    let fx = fixture().await;
    fx.add_product("COKE-330", 299, 100).await;
    fx.db.products().soft_delete("COKE-330").await.unwrap();

    let err = fx
        .engine
        .checkout(&[CartLine::new("COKE-330", 1)], fx.employee_id, None)
        .await
        .unwrap_err();
    assert!(matches!(err, CheckoutError::UnknownSku { .. }));
}

// =============================================================================
// Scenario: concurrent checkouts never oversell
// =============================================================================

static DB_COUNTER: AtomicU32 = AtomicU32::new(0);

fn temp_db_path() -> std::path::PathBuf {
    let n = DB_COUNTER.fetch_add(1, Ordering::Relaxed);
    std::env::temp_dir().join(format!(
        "keel-engine-test-{}-{}.db",
        std::process::id(),
        n
    ))
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_checkouts_never_oversell() {
    // In-memory SQLite is per-connection; real concurrency needs a file.
    let path = temp_db_path();
    let mut fx = fixture_with(
        DbConfig::new(&path).max_connections(8),
        AlertThresholds::default(),
    )
    .await;
    fx.add_product_with_threshold("COKE-330", 299, 10, 0).await;

    // 8 buyers want 3 each: only 3 can succeed (9 units), never 4.
    let mut handles = Vec::new();
    for _ in 0..8 {
        let engine = fx.engine.clone();
        let employee_id = fx.employee_id;
        handles.push(tokio::spawn(async move {
            engine
                .checkout(&[CartLine::new("COKE-330", 3)], employee_id, None)
                .await
        }));
    }

    let mut succeeded = 0;
    for handle in handles {
        match handle.await.unwrap() {
            Ok(receipt) => {
                assert_eq!(receipt.total_cents, 3 * 299);
                succeeded += 1;
            }
            Err(CheckoutError::InsufficientStock { available, .. }) => {
                assert!(available < 3);
            }
            Err(other) => panic!("unexpected error: {other:?}"),
        }
    }

    assert_eq!(succeeded, 3);
    assert_eq!(fx.stock_of("COKE-330").await, 10 - 3 * 3);

    // The ledger fully explains the final stock level.
    let recon = fx.db.adjustments().reconcile("COKE-330").await.unwrap();
    assert!(recon.is_consistent());
    assert_eq!(recon.ledger_delta, -9);
    assert_eq!(fx.db.sales().count().await.unwrap(), 3);

    drop(fx.alerts);
    fx.db.close().await;
    let _ = std::fs::remove_file(&path);
}

// =============================================================================
// Scenario: alerts
// =============================================================================

#[tokio::test]
async fn low_stock_alert_fires_exactly_once_per_commit() {
    let mut fx = fixture().await;
    fx.add_product_with_threshold("COKE-330", 299, 27, 25).await;

    // 27 -> 24: strictly below 25, one alert.
    fx.engine
        .checkout(&[CartLine::new("COKE-330", 3)], fx.employee_id, None)
        .await
        .unwrap();

    match fx.alerts.try_recv().unwrap() {
        AlertEvent::LowStock(alert) => {
            assert_eq!(alert.sku, "COKE-330");
            assert_eq!(alert.stock, 24);
            assert_eq!(alert.threshold, 25);
            assert_eq!(alert.supplier_contact.as_deref(), Some("orders@acme.example"));
        }
        other => panic!("unexpected event: {other:?}"),
    }
    assert!(fx.alerts.try_recv().is_err());
}

#[tokio::test]
async fn stock_at_threshold_does_not_alert() {
    let mut fx = fixture().await;
    fx.add_product_with_threshold("COKE-330", 299, 27, 25).await;

    // 27 -> 25: at the threshold, not below it.
    fx.engine
        .checkout(&[CartLine::new("COKE-330", 2)], fx.employee_id, None)
        .await
        .unwrap();

    assert!(fx.alerts.try_recv().is_err());
}

#[tokio::test]
async fn large_transaction_alert_at_threshold() {
    let mut fx = fixture_with(DbConfig::in_memory(), AlertThresholds::new(100_000)).await;
    fx.add_product_with_threshold("TV-55", 50_000, 100, 0).await;

    let receipt = fx
        .engine
        .checkout(&[CartLine::new("TV-55", 2)], fx.employee_id, None)
        .await
        .unwrap();
    assert_eq!(receipt.total_cents, 100_000);

    match fx.alerts.try_recv().unwrap() {
        AlertEvent::LargeTransaction(alert) => {
            assert_eq!(alert.sale_id, receipt.sale_id);
            assert_eq!(alert.total_cents, 100_000);
            assert_eq!(alert.employee_id, fx.employee_id);
        }
        other => panic!("unexpected event: {other:?}"),
    }
    assert!(fx.alerts.try_recv().is_err());
}

#[tokio::test]
async fn dropped_alert_consumer_does_not_fail_checkout() {
    let fx = fixture().await;
    fx.add_product_with_threshold("COKE-330", 299, 10, 25).await;
    let Fixture {
        db,
        engine,
        alerts,
        employee_id,
        ..
    } = fx;
    drop(alerts);

    // Commit succeeds even though the low-stock event has nowhere to go.
    engine
        .checkout(&[CartLine::new("COKE-330", 1)], employee_id, None)
        .await
        .unwrap();
    let stock = db.products().get_by_sku("COKE-330").await.unwrap().unwrap().stock;
    assert_eq!(stock, 9);
}

// =============================================================================
// Scenario: anonymous customer
// =============================================================================

#[tokio::test]
async fn walk_in_sale_attributes_to_anonymous_customer() {
    let fx = fixture().await;
    fx.add_product("COKE-330", 299, 100).await;

    let receipt = fx
        .engine
        .checkout(&[CartLine::new("COKE-330", 1)], fx.employee_id, None)
        .await
        .unwrap();
    assert_eq!(receipt.customer_id, ANONYMOUS_CUSTOMER_ID);

    let sale = fx.db.sales().get_by_id(receipt.sale_id).await.unwrap().unwrap();
    assert_eq!(sale.customer_id, ANONYMOUS_CUSTOMER_ID);

    // Named customers still attach normally.
    let customer = fx.db.customers().insert("Jordan Li", "").await.unwrap();
    let receipt = fx
        .engine
        .checkout(
            &[CartLine::new("COKE-330", 1)],
            fx.employee_id,
            Some(customer.id),
        )
        .await
        .unwrap();
    assert_eq!(receipt.customer_id, customer.id);

    // The sentinel row cannot be deleted out from under history.
    assert!(fx
        .db
        .customers()
        .delete(ANONYMOUS_CUSTOMER_ID)
        .await
        .is_err());
}

// =============================================================================
// Scenario: manual adjustments
// =============================================================================

#[tokio::test]
async fn manual_adjustment_writes_ledger_and_floors_at_zero() {
    let fx = fixture().await;
    fx.add_product_with_threshold("COKE-330", 299, 10, 0).await;

    // Damage write-off.
    let new_stock = fx
        .engine
        .adjust_stock("COKE-330", -4, AdjustmentReason::Damage, fx.employee_id)
        .await
        .unwrap();
    assert_eq!(new_stock, 6);

    // Floor: cannot write off more than exists.
    let err = fx
        .engine
        .adjust_stock("COKE-330", -7, AdjustmentReason::Damage, fx.employee_id)
        .await
        .unwrap_err();
    match err {
        AdjustmentError::WouldGoNegative { stock, delta, .. } => {
            assert_eq!(stock, 6);
            assert_eq!(delta, -7);
        }
        other => panic!("unexpected error: {other:?}"),
    }
    assert_eq!(fx.stock_of("COKE-330").await, 6);

    // Restock back up.
    let new_stock = fx
        .engine
        .adjust_stock("COKE-330", 20, AdjustmentReason::Restock, fx.employee_id)
        .await
        .unwrap();
    assert_eq!(new_stock, 26);

    // Ledger: exactly the two committed adjustments, rejected one absent.
    let ledger = fx.db.adjustments().list_for_sku("COKE-330").await.unwrap();
    let deltas: Vec<i64> = ledger.iter().map(|e| e.delta).collect();
    assert_eq!(deltas, vec![-4, 20]);

    let recon = fx.db.adjustments().reconcile("COKE-330").await.unwrap();
    assert!(recon.is_consistent());
    assert_eq!(recon.actual_stock, 26);
}

#[tokio::test]
async fn adjustment_rejects_zero_delta_and_reserved_reasons() {
    let fx = fixture().await;
    fx.add_product("COKE-330", 299, 10).await;

    assert!(matches!(
        fx.engine
            .adjust_stock("COKE-330", 0, AdjustmentReason::Correction, fx.employee_id)
            .await
            .unwrap_err(),
        AdjustmentError::ZeroDelta
    ));
    assert!(matches!(
        fx.engine
            .adjust_stock("COKE-330", -1, AdjustmentReason::Sale, fx.employee_id)
            .await
            .unwrap_err(),
        AdjustmentError::ReservedReason(AdjustmentReason::Sale)
    ));
    assert!(matches!(
        fx.engine
            .adjust_stock("GHOST", 1, AdjustmentReason::Restock, fx.employee_id)
            .await
            .unwrap_err(),
        AdjustmentError::UnknownSku { .. }
    ));
}

// =============================================================================
// Scenario: purchase receiving
// =============================================================================

#[tokio::test]
async fn receiving_mirrors_checkout_on_the_supplier_side() {
    let fx = fixture().await;
    fx.add_product_with_threshold("COKE-330", 299, 5, 0).await;

    let purchase_id = fx
        .engine
        .receive_purchase(
            &[PurchaseLine::with_cost("COKE-330", 48, 110)],
            fx.supplier_id,
            fx.employee_id,
        )
        .await
        .unwrap();

    assert_eq!(fx.stock_of("COKE-330").await, 53);

    let purchase = fx
        .db
        .purchases()
        .get_by_id(purchase_id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(purchase.total_cents, 48 * 110);
    assert_eq!(purchase.supplier_id, fx.supplier_id);

    let items = fx.db.purchases().get_items(purchase_id).await.unwrap();
    assert_eq!(items.len(), 1);
    assert_eq!(items[0].unit_cost_cents, 110);

    // Ledger mirrors the increment with reason 'purchase'.
    let ledger = fx.db.adjustments().list_for_sku("COKE-330").await.unwrap();
    assert_eq!(ledger.len(), 1);
    assert_eq!(ledger[0].delta, 48);
    assert_eq!(ledger[0].reason, AdjustmentReason::Purchase);
    assert!(fx
        .db
        .adjustments()
        .reconcile("COKE-330")
        .await
        .unwrap()
        .is_consistent());
}

#[tokio::test]
async fn receiving_defaults_cost_from_catalog() {
    let fx = fixture().await;
    // cost_cents = price / 2 = 149 (fixture convention).
    fx.add_product("COKE-330", 299, 0).await;

    let purchase_id = fx
        .engine
        .receive_purchase(
            &[PurchaseLine::new("COKE-330", 10)],
            fx.supplier_id,
            fx.employee_id,
        )
        .await
        .unwrap();

    let items = fx.db.purchases().get_items(purchase_id).await.unwrap();
    assert_eq!(items[0].unit_cost_cents, 149);
}

#[tokio::test]
async fn failed_receiving_rolls_back_every_write() {
    let fx = fixture().await;
    fx.add_product("COKE-330", 299, 5).await;

    // Second line unknown: first line's increment must not survive.
    let err = fx
        .engine
        .receive_purchase(
            &[
                PurchaseLine::new("COKE-330", 10),
                PurchaseLine::new("GHOST", 1),
            ],
            fx.supplier_id,
            fx.employee_id,
        )
        .await
        .unwrap_err();
    assert!(matches!(err, keel_db::PurchaseError::UnknownSku { .. }));

    assert_eq!(fx.stock_of("COKE-330").await, 5);
    assert!(fx
        .db
        .adjustments()
        .list_for_sku("COKE-330")
        .await
        .unwrap()
        .is_empty());
}

// =============================================================================
// Scenario: ledger is append-only history
// =============================================================================

#[tokio::test]
async fn ledger_reconstructs_stock_across_mixed_operations() {
    let fx = fixture().await;
    fx.add_product_with_threshold("COKE-330", 299, 100, 0).await;

    fx.engine
        .checkout(&[CartLine::new("COKE-330", 40)], fx.employee_id, None)
        .await
        .unwrap();
    fx.engine
        .receive_purchase(
            &[PurchaseLine::new("COKE-330", 24)],
            fx.supplier_id,
            fx.employee_id,
        )
        .await
        .unwrap();
    fx.engine
        .adjust_stock("COKE-330", -3, AdjustmentReason::Damage, fx.employee_id)
        .await
        .unwrap();

    let recon = fx.db.adjustments().reconcile("COKE-330").await.unwrap();
    assert_eq!(recon.initial_stock, 100);
    assert_eq!(recon.ledger_delta, -40 + 24 - 3);
    assert_eq!(recon.expected_stock, 81);
    assert_eq!(recon.actual_stock, 81);
    assert!(recon.is_consistent());

    assert_eq!(fx.db.adjustments().sum_deltas("COKE-330").await.unwrap(), -19);
}

// =============================================================================
// Error taxonomy
// =============================================================================

#[tokio::test]
async fn consistency_errors_are_not_retryable() {
    let fx = fixture().await;
    fx.add_product("COKE-330", 299, 1).await;

    let err = fx
        .engine
        .checkout(&[CartLine::new("COKE-330", 2)], fx.employee_id, None)
        .await
        .unwrap_err();
    assert!(!err.is_retryable());

    let err = CheckoutError::Store(DbError::Busy("database is locked".into()));
    assert!(err.is_retryable());
}
