//! # Domain Types
//!
//! Core domain types used throughout Keel POS.
//!
//! ## Type Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                           Domain Types                                  │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────────┐   │
//! │  │    Product      │   │      Sale       │   │ InventoryAdjustment │   │
//! │  │  ─────────────  │   │  ─────────────  │   │  ─────────────────  │   │
//! │  │  sku (PK)       │   │  id             │   │  sku (FK)           │   │
//! │  │  price_cents    │   │  total_cents    │   │  delta (signed)     │   │
//! │  │  stock          │   │  employee_id    │   │  reason             │   │
//! │  │  threshold      │   │  customer_id    │   │  employee_id        │   │
//! │  └─────────────────┘   └─────────────────┘   └─────────────────────┘   │
//! │                                                                         │
//! │  Purchase / PurchaseItem mirror Sale / SaleItem on the supplier         │
//! │  side, increasing stock instead of decreasing it.                       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Identity
//! Products use their SKU as the business primary key (immutable).
//! Everything else uses SQLite integer row ids; customer id 0 is the
//! reserved anonymous identity ([`crate::ANONYMOUS_CUSTOMER_ID`]).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::money::Money;

// =============================================================================
// Product
// =============================================================================

/// A product available for sale.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Product {
    /// Stock Keeping Unit - immutable business identifier.
    pub sku: String,

    /// Display name shown to cashier and on receipt.
    pub name: String,

    /// Category this product belongs to.
    pub category_id: i64,

    /// Unit price in cents (smallest currency unit, > 0).
    pub price_cents: i64,

    /// Unit cost in cents (for margin calculations, >= 0).
    pub cost_cents: i64,

    /// Current stock level. Never negative.
    pub stock: i64,

    /// Stock level at creation, frozen. The ledger reconciles against
    /// `initial_stock + sum(deltas)`.
    pub initial_stock: i64,

    /// Per-product low-stock alert threshold.
    pub low_stock_threshold: i64,

    /// Supplier this product is restocked from.
    pub supplier_id: i64,

    /// Whether product is active (soft delete).
    pub is_active: bool,

    /// When the product was created.
    pub created_at: DateTime<Utc>,

    /// When the product was last updated.
    pub updated_at: DateTime<Utc>,
}

impl Product {
    /// Returns the price as a Money type.
    #[inline]
    pub fn price(&self) -> Money {
        Money::from_cents(self.price_cents)
    }

    /// Returns the unit cost as a Money type.
    #[inline]
    pub fn cost(&self) -> Money {
        Money::from_cents(self.cost_cents)
    }

    /// Checks whether `quantity` units can be sold from current stock.
    pub fn can_sell(&self, quantity: i64) -> bool {
        quantity > 0 && self.stock >= quantity
    }

    /// Checks whether the current stock is below the low-stock threshold.
    #[inline]
    pub fn is_low_stock(&self) -> bool {
        self.stock < self.low_stock_threshold
    }
}

// =============================================================================
// Category / Supplier
// =============================================================================

/// A product category.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Category {
    pub id: i64,
    pub name: String,
}

/// A supplier that products are restocked from.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Supplier {
    pub id: i64,
    pub name: String,
    /// Free-form contact line, surfaced in low-stock alerts.
    pub contact_info: String,
}

// =============================================================================
// Customer / Employee
// =============================================================================

/// A customer. Row id 0 is the reserved anonymous identity.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Customer {
    pub id: i64,
    pub name: String,
    pub contact_info: String,
    /// True only for the reserved anonymous row.
    pub is_anonymous: bool,
}

impl Customer {
    /// Checks if this is the reserved anonymous identity.
    #[inline]
    pub fn is_reserved(&self) -> bool {
        self.id == crate::ANONYMOUS_CUSTOMER_ID
    }
}

/// An employee. Every sale and adjustment attributes one.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Employee {
    pub id: i64,
    pub name: String,
    pub role: Option<String>,
}

// =============================================================================
// Sale / SaleItem
// =============================================================================

/// A committed sale. Created atomically with its items by the checkout
/// engine and immutable thereafter. Corrections are new adjustments or
/// new sales, never edits to history.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Sale {
    pub id: i64,
    pub sale_at: DateTime<Utc>,
    /// Always equals the sum of line totals, in cents.
    pub total_cents: i64,
    pub employee_id: i64,
    pub customer_id: i64,
}

impl Sale {
    /// Returns the total as Money.
    #[inline]
    pub fn total(&self) -> Money {
        Money::from_cents(self.total_cents)
    }
}

/// A line item in a sale.
/// Uses the snapshot pattern: unit price is frozen at time of sale and
/// preserved even if the product price later changes.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct SaleItem {
    pub id: i64,
    pub sale_id: i64,
    pub sku: String,
    /// Quantity sold (> 0).
    pub quantity: i64,
    /// Unit price in cents at time of sale (frozen).
    pub unit_price_cents: i64,
}

impl SaleItem {
    /// Returns the unit price as Money.
    #[inline]
    pub fn unit_price(&self) -> Money {
        Money::from_cents(self.unit_price_cents)
    }

    /// Returns the line total (unit price × quantity).
    #[inline]
    pub fn line_total(&self) -> Money {
        self.unit_price().multiply_quantity(self.quantity)
    }
}

// =============================================================================
// Purchase / PurchaseItem
// =============================================================================

/// A supplier purchase: the stock-increasing mirror of a sale.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Purchase {
    pub id: i64,
    pub purchase_at: DateTime<Utc>,
    pub total_cents: i64,
    pub supplier_id: i64,
    pub employee_id: i64,
}

/// A line item in a purchase, with the unit cost frozen at receiving time.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct PurchaseItem {
    pub id: i64,
    pub purchase_id: i64,
    pub sku: String,
    pub quantity: i64,
    pub unit_cost_cents: i64,
}

impl PurchaseItem {
    /// Returns the line total (unit cost × quantity).
    #[inline]
    pub fn line_total(&self) -> Money {
        Money::from_cents(self.unit_cost_cents).multiply_quantity(self.quantity)
    }
}

// =============================================================================
// Inventory Adjustment Ledger
// =============================================================================

/// Why a stock level changed. Stored as snake_case text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[serde(rename_all = "snake_case")]
pub enum AdjustmentReason {
    /// Stock decremented by a committed sale.
    Sale,
    /// Stock incremented by a received supplier purchase.
    Purchase,
    /// Manual restock outside the purchase flow.
    Restock,
    /// Damaged or expired goods written off.
    Damage,
    /// Manual correction after a physical count.
    Correction,
}

impl AdjustmentReason {
    /// Stable text form, matching the database encoding.
    pub fn as_str(&self) -> &'static str {
        match self {
            AdjustmentReason::Sale => "sale",
            AdjustmentReason::Purchase => "purchase",
            AdjustmentReason::Restock => "restock",
            AdjustmentReason::Damage => "damage",
            AdjustmentReason::Correction => "correction",
        }
    }
}

/// One entry in the append-only inventory adjustment ledger.
///
/// Every stock-quantity change in `Product` has exactly one entry here
/// with the same signed delta, written in the same transaction. Entries
/// are never updated or deleted.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct InventoryAdjustment {
    pub id: i64,
    pub sku: String,
    pub adjusted_at: DateTime<Utc>,
    /// Signed quantity change: negative for sales/damage, positive for
    /// purchases/restocks.
    pub delta: i64,
    pub reason: AdjustmentReason,
    pub employee_id: i64,
}

// =============================================================================
// Receipt
// =============================================================================

/// One line on a receipt, with the price frozen at checkout.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReceiptLine {
    pub sku: String,
    pub name: String,
    pub quantity: i64,
    pub unit_price_cents: i64,
}

impl ReceiptLine {
    /// Returns the line total (unit price × quantity).
    #[inline]
    pub fn line_total(&self) -> Money {
        Money::from_cents(self.unit_price_cents).multiply_quantity(self.quantity)
    }
}

/// Value object returned by a successful checkout.
///
/// Carries everything the caller needs to print or display without a
/// follow-up read: sale identity, frozen line details, exact total,
/// timestamp and attribution.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Receipt {
    pub sale_id: i64,
    pub sale_at: DateTime<Utc>,
    pub lines: Vec<ReceiptLine>,
    pub total_cents: i64,
    pub employee_id: i64,
    /// The resolved customer: the caller's choice, or the anonymous
    /// identity when none was supplied.
    pub customer_id: i64,
}

impl Receipt {
    /// Returns the total as Money.
    #[inline]
    pub fn total(&self) -> Money {
        Money::from_cents(self.total_cents)
    }

    /// True when every line sold at zero price. Such sales commit
    /// normally but the caller should flag them for review.
    pub fn is_zero_total(&self) -> bool {
        self.total_cents == 0
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn product(stock: i64, threshold: i64) -> Product {
        let now = Utc::now();
        Product {
            sku: "COKE-330".to_string(),
            name: "Coca-Cola 330ml".to_string(),
            category_id: 1,
            price_cents: 299,
            cost_cents: 120,
            stock,
            initial_stock: stock,
            low_stock_threshold: threshold,
            supplier_id: 1,
            is_active: true,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_can_sell() {
        let p = product(10, 25);
        assert!(p.can_sell(10));
        assert!(!p.can_sell(11));
        assert!(!p.can_sell(0));
        assert!(!p.can_sell(-1));
    }

    #[test]
    fn test_is_low_stock_strictly_below_threshold() {
        assert!(product(24, 25).is_low_stock());
        assert!(!product(25, 25).is_low_stock());
    }

    #[test]
    fn test_sale_item_line_total() {
        let item = SaleItem {
            id: 1,
            sale_id: 1,
            sku: "COKE-330".to_string(),
            quantity: 3,
            unit_price_cents: 299,
        };
        assert_eq!(item.line_total().cents(), 897);
    }

    #[test]
    fn test_adjustment_reason_text() {
        assert_eq!(AdjustmentReason::Sale.as_str(), "sale");
        assert_eq!(AdjustmentReason::Correction.as_str(), "correction");
    }

    #[test]
    fn test_receipt_zero_total_flag() {
        let receipt = Receipt {
            sale_id: 1,
            sale_at: Utc::now(),
            lines: vec![],
            total_cents: 0,
            employee_id: 1,
            customer_id: crate::ANONYMOUS_CUSTOMER_ID,
        };
        assert!(receipt.is_zero_total());
    }
}
