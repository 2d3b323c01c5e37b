//! # Repository Module
//!
//! Database repository implementations for Keel POS.
//!
//! ## Repository Pattern
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Repository Pattern Explained                         │
//! │                                                                         │
//! │  The Repository pattern abstracts database access behind a clean API.  │
//! │                                                                         │
//! │  Caller                                                                 │
//! │       │                                                                 │
//! │       │  db.products().get_by_sku("COKE-330")                           │
//! │       │  ↓                                                              │
//! │       ▼                                                                 │
//! │  ProductRepository                                                      │
//! │  ├── get_by_sku(&self, sku)                                             │
//! │  ├── insert(&self, new_product)                                         │
//! │  ├── update_details(&self, ...)                                         │
//! │  └── low_stock(&self)                                                   │
//! │       │                                                                 │
//! │       │  SQL Query                                                      │
//! │       ▼                                                                 │
//! │  SQLite Database                                                        │
//! │                                                                         │
//! │  Stock is deliberately absent from every repository write: only the    │
//! │  checkout engine's transactional paths may touch it, so the ledger     │
//! │  stays reconcilable.                                                    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Available Repositories
//!
//! - [`product::ProductRepository`] - Product catalog CRUD (not stock)
//! - [`party::CustomerRepository`] / [`party::EmployeeRepository`] - Parties
//! - [`sale::SaleRepository`] - Sale and sale item reads
//! - [`purchase::PurchaseRepository`] - Purchase and purchase item reads
//! - [`adjustment::AdjustmentRepository`] - Ledger reads and reconciliation

pub mod adjustment;
pub mod party;
pub mod product;
pub mod purchase;
pub mod sale;
