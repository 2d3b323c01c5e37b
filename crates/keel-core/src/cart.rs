//! # Cart Module
//!
//! Caller-owned, in-memory cart: (SKU, quantity) pairs with derived
//! line totals. Nothing here is persisted; the cart only becomes
//! durable when it is handed to the checkout transaction engine.
//!
//! ## Ownership
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  One session, one cart, one owner                                       │
//! │                                                                         │
//! │  UI session ──owns──► Cart ──add_line / update_quantity / remove_line   │
//! │       │                                                                 │
//! │       └── checkout(cart.lines(), employee, customer)                    │
//! │                                                                         │
//! │  The cart is an explicit value passed into checkout, never shared       │
//! │  global state, so there is no ambiguity about which session's cart     │
//! │  is being committed.                                                    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;
use crate::validation::{validate_cart_size, validate_quantity, validate_sku};

/// One requested line: a SKU and how many units of it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartLine {
    pub sku: String,
    pub quantity: i64,
}

impl CartLine {
    /// Creates a new cart line.
    pub fn new(sku: impl Into<String>, quantity: i64) -> Self {
        CartLine {
            sku: sku.into(),
            quantity,
        }
    }
}

/// An in-memory shopping cart for a single session.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Cart {
    lines: Vec<CartLine>,
}

impl Cart {
    /// Creates an empty cart.
    pub fn new() -> Self {
        Cart::default()
    }

    /// Adds a line, summing the quantity into an existing line for the
    /// same SKU instead of duplicating it.
    pub fn add_line(&mut self, sku: &str, quantity: i64) -> Result<(), ValidationError> {
        validate_sku(sku)?;
        validate_quantity(quantity)?;

        if let Some(line) = self.lines.iter_mut().find(|l| l.sku == sku) {
            line.quantity = validate_quantity(line.quantity + quantity)
                .map(|_| line.quantity + quantity)?;
            return Ok(());
        }

        validate_cart_size(self.lines.len())?;
        self.lines.push(CartLine::new(sku, quantity));
        Ok(())
    }

    /// Replaces the quantity of an existing line.
    pub fn update_quantity(&mut self, sku: &str, quantity: i64) -> Result<(), ValidationError> {
        validate_quantity(quantity)?;

        match self.lines.iter_mut().find(|l| l.sku == sku) {
            Some(line) => {
                line.quantity = quantity;
                Ok(())
            }
            None => Err(ValidationError::NotInCart {
                sku: sku.to_string(),
            }),
        }
    }

    /// Removes a line from the cart.
    pub fn remove_line(&mut self, sku: &str) -> Result<(), ValidationError> {
        let before = self.lines.len();
        self.lines.retain(|l| l.sku != sku);
        if self.lines.len() == before {
            return Err(ValidationError::NotInCart {
                sku: sku.to_string(),
            });
        }
        Ok(())
    }

    /// Returns the current lines in insertion order.
    pub fn lines(&self) -> &[CartLine] {
        &self.lines
    }

    /// Checks if the cart has no lines.
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Number of distinct lines.
    pub fn len(&self) -> usize {
        self.lines.len()
    }

    /// Empties the cart (after a successful checkout).
    pub fn clear(&mut self) {
        self.lines.clear();
    }
}

/// Merges duplicate SKUs in a slice of requested lines, preserving
/// first-seen order.
///
/// ## Why This Exists
/// The engine accepts raw `&[CartLine]` from any caller, not just
/// [`Cart`]. A cart requesting the same SKU twice must be validated as
/// one effective line with the summed quantity; a naive per-line check
/// would let two half-sized lines pass individually and oversell the
/// stock they share.
pub fn merge_lines(lines: &[CartLine]) -> Vec<CartLine> {
    let mut merged: Vec<CartLine> = Vec::with_capacity(lines.len());
    for line in lines {
        match merged.iter_mut().find(|m| m.sku == line.sku) {
            Some(existing) => existing.quantity += line.quantity,
            None => merged.push(line.clone()),
        }
    }
    merged
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_add_line_sums_duplicates() {
        let mut cart = Cart::new();
        cart.add_line("COKE-330", 2).unwrap();
        cart.add_line("COKE-330", 3).unwrap();

        assert_eq!(cart.len(), 1);
        assert_eq!(cart.lines()[0].quantity, 5);
    }

    #[test]
    fn test_add_line_rejects_bad_input() {
        let mut cart = Cart::new();
        assert!(cart.add_line("COKE-330", 0).is_err());
        assert!(cart.add_line("COKE-330", -1).is_err());
        assert!(cart.add_line("", 1).is_err());
        assert!(cart.is_empty());
    }

    #[test]
    fn test_update_quantity() {
        let mut cart = Cart::new();
        cart.add_line("COKE-330", 2).unwrap();
        cart.update_quantity("COKE-330", 7).unwrap();
        assert_eq!(cart.lines()[0].quantity, 7);

        assert!(cart.update_quantity("PEPSI-330", 1).is_err());
        assert!(cart.update_quantity("COKE-330", 0).is_err());
    }

    #[test]
    fn test_remove_line() {
        let mut cart = Cart::new();
        cart.add_line("COKE-330", 2).unwrap();
        cart.remove_line("COKE-330").unwrap();
        assert!(cart.is_empty());

        assert!(cart.remove_line("COKE-330").is_err());
    }

    #[test]
    fn test_merge_lines_preserves_order() {
        let lines = vec![
            CartLine::new("A", 1),
            CartLine::new("B", 2),
            CartLine::new("A", 3),
        ];
        let merged = merge_lines(&lines);

        assert_eq!(merged.len(), 2);
        assert_eq!(merged[0], CartLine::new("A", 4));
        assert_eq!(merged[1], CartLine::new("B", 2));
    }
}
