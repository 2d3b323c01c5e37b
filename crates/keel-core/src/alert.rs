//! # Alert Rules
//!
//! Post-commit alert rule evaluation.
//!
//! ## Where This Runs
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                     Alert Evaluation Timing                             │
//! │                                                                         │
//! │  checkout / adjust / receive_purchase                                   │
//! │       │                                                                 │
//! │       ├── BEGIN ... writes ... COMMIT      ← durable state change       │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  AlertEvaluator (THIS MODULE)              ← strictly after commit      │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  Vec<AlertEvent> ──► dispatcher sink       ← fire-and-forget            │
//! │                                                                         │
//! │  Evaluation and dispatch can never roll back the committed sale.        │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Rules are configuration, not hardcoded business facts: the
//! large-transaction boundary lives in [`AlertThresholds`], and the
//! low-stock boundary is each product's own `low_stock_threshold`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::types::Receipt;

// =============================================================================
// Configuration
// =============================================================================

/// Configured alert boundaries for a deployment.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AlertThresholds {
    /// A committed sale with total >= this value (in cents) emits a
    /// large-transaction alert.
    pub large_transaction_cents: i64,
}

impl AlertThresholds {
    /// Creates thresholds with an explicit large-transaction boundary.
    pub fn new(large_transaction_cents: i64) -> Self {
        AlertThresholds {
            large_transaction_cents,
        }
    }
}

impl Default for AlertThresholds {
    /// $10,000.00, the boundary the business has historically used.
    fn default() -> Self {
        AlertThresholds {
            large_transaction_cents: 1_000_000,
        }
    }
}

// =============================================================================
// Inputs
// =============================================================================

/// Post-commit stock observation for one SKU touched by an operation.
///
/// Gathered inside the transaction (so the observation matches exactly
/// what was committed) and evaluated after it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StockSnapshot {
    pub sku: String,
    pub name: String,
    pub stock: i64,
    pub low_stock_threshold: i64,
    /// Contact line of the product's supplier, for the restock hint.
    pub supplier_contact: Option<String>,
}

// =============================================================================
// Events
// =============================================================================

/// A SKU fell below its configured low-stock threshold.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LowStockAlert {
    pub sku: String,
    pub name: String,
    pub stock: i64,
    pub threshold: i64,
    pub supplier_contact: Option<String>,
    pub occurred_at: DateTime<Utc>,
}

/// A committed sale met or exceeded the large-transaction threshold.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LargeTransactionAlert {
    pub sale_id: i64,
    pub total_cents: i64,
    pub employee_id: i64,
    pub customer_id: i64,
    pub occurred_at: DateTime<Utc>,
}

/// A structured alert event handed to the notification dispatcher.
///
/// Serializes as `{type, payload}` with `occurred_at` inside the
/// payload; delivery is at-most-once per commit.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload", rename_all = "snake_case")]
pub enum AlertEvent {
    LowStock(LowStockAlert),
    LargeTransaction(LargeTransactionAlert),
}

impl AlertEvent {
    /// When the triggering state change was observed.
    pub fn occurred_at(&self) -> DateTime<Utc> {
        match self {
            AlertEvent::LowStock(a) => a.occurred_at,
            AlertEvent::LargeTransaction(a) => a.occurred_at,
        }
    }
}

// =============================================================================
// Evaluator
// =============================================================================

/// Evaluates committed state against the configured alert rules.
#[derive(Debug, Clone, Default)]
pub struct AlertEvaluator {
    thresholds: AlertThresholds,
}

impl AlertEvaluator {
    /// Creates an evaluator with the given thresholds.
    pub fn new(thresholds: AlertThresholds) -> Self {
        AlertEvaluator { thresholds }
    }

    /// Returns the configured thresholds.
    pub fn thresholds(&self) -> &AlertThresholds {
        &self.thresholds
    }

    /// Evaluates the state left behind by a committed checkout.
    ///
    /// Emits low-stock events for every touched SKU now strictly below
    /// its threshold, then at most one large-transaction event for the
    /// sale itself.
    pub fn evaluate_checkout(
        &self,
        receipt: &Receipt,
        stocks: &[StockSnapshot],
    ) -> Vec<AlertEvent> {
        let mut events = self.evaluate_stock(stocks);

        if receipt.total_cents >= self.thresholds.large_transaction_cents {
            events.push(AlertEvent::LargeTransaction(LargeTransactionAlert {
                sale_id: receipt.sale_id,
                total_cents: receipt.total_cents,
                employee_id: receipt.employee_id,
                customer_id: receipt.customer_id,
                occurred_at: receipt.sale_at,
            }));
        }

        events
    }

    /// Evaluates the low-stock rule for the SKUs touched by a committed
    /// stock mutation (manual adjustment or purchase receiving).
    pub fn evaluate_stock(&self, stocks: &[StockSnapshot]) -> Vec<AlertEvent> {
        let now = Utc::now();
        stocks
            .iter()
            .filter(|s| s.stock < s.low_stock_threshold)
            .map(|s| {
                AlertEvent::LowStock(LowStockAlert {
                    sku: s.sku.clone(),
                    name: s.name.clone(),
                    stock: s.stock,
                    threshold: s.low_stock_threshold,
                    supplier_contact: s.supplier_contact.clone(),
                    occurred_at: now,
                })
            })
            .collect()
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ReceiptLine;

    fn snapshot(sku: &str, stock: i64, threshold: i64) -> StockSnapshot {
        StockSnapshot {
            sku: sku.to_string(),
            name: format!("{sku} name"),
            stock,
            low_stock_threshold: threshold,
            supplier_contact: Some("orders@acme.example".to_string()),
        }
    }

    fn receipt(total_cents: i64) -> Receipt {
        Receipt {
            sale_id: 42,
            sale_at: Utc::now(),
            lines: vec![ReceiptLine {
                sku: "COKE-330".to_string(),
                name: "Coca-Cola 330ml".to_string(),
                quantity: 1,
                unit_price_cents: total_cents,
            }],
            total_cents,
            employee_id: 7,
            customer_id: crate::ANONYMOUS_CUSTOMER_ID,
        }
    }

    #[test]
    fn test_low_stock_is_strictly_below_threshold() {
        let evaluator = AlertEvaluator::default();

        let events = evaluator.evaluate_stock(&[snapshot("A", 24, 25)]);
        assert_eq!(events.len(), 1);
        match &events[0] {
            AlertEvent::LowStock(a) => {
                assert_eq!(a.sku, "A");
                assert_eq!(a.stock, 24);
                assert_eq!(a.threshold, 25);
            }
            other => panic!("unexpected event: {other:?}"),
        }

        // At the threshold is not low.
        assert!(evaluator.evaluate_stock(&[snapshot("A", 25, 25)]).is_empty());
    }

    #[test]
    fn test_large_transaction_at_threshold_fires() {
        let evaluator = AlertEvaluator::new(AlertThresholds::new(1_000_000));

        let events = evaluator.evaluate_checkout(&receipt(1_000_000), &[]);
        assert_eq!(events.len(), 1);
        match &events[0] {
            AlertEvent::LargeTransaction(a) => {
                assert_eq!(a.sale_id, 42);
                assert_eq!(a.total_cents, 1_000_000);
            }
            other => panic!("unexpected event: {other:?}"),
        }

        assert!(evaluator
            .evaluate_checkout(&receipt(999_999), &[])
            .is_empty());
    }

    #[test]
    fn test_checkout_emits_both_rule_kinds() {
        let evaluator = AlertEvaluator::new(AlertThresholds::new(1_000));

        let events =
            evaluator.evaluate_checkout(&receipt(1_200_000), &[snapshot("A", 3, 25)]);
        assert_eq!(events.len(), 2);
        assert!(matches!(events[0], AlertEvent::LowStock(_)));
        assert!(matches!(events[1], AlertEvent::LargeTransaction(_)));
    }

    #[test]
    fn test_event_serializes_with_type_and_payload() {
        let evaluator = AlertEvaluator::default();
        let events = evaluator.evaluate_stock(&[snapshot("A", 0, 25)]);
        let json = serde_json::to_value(&events[0]).unwrap();

        assert_eq!(json["type"], "low_stock");
        assert_eq!(json["payload"]["sku"], "A");
        assert!(json["payload"]["occurred_at"].is_string());
    }
}
