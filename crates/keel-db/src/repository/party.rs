//! # Party Repositories
//!
//! Customers and employees.
//!
//! ## The Anonymous Customer
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Anonymous Customer (id 0)                            │
//! │                                                                         │
//! │  Seeded by migration, before any sale can exist.                        │
//! │                                                                         │
//! │  checkout(customer_id: None) ──► sale.customer_id = 0                   │
//! │                                                                         │
//! │  Walk-in sales therefore always have a valid customer foreign key;      │
//! │  per-customer history queries need no NULL handling.                    │
//! │                                                                         │
//! │  delete(0) ──► rejected here. The row is load-bearing.                  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use sqlx::SqlitePool;
use tracing::debug;

use crate::error::{DbError, DbResult};
use keel_core::{Customer, Employee, ANONYMOUS_CUSTOMER_ID};

// =============================================================================
// Customers
// =============================================================================

/// Repository for customer database operations.
#[derive(Debug, Clone)]
pub struct CustomerRepository {
    pool: SqlitePool,
}

impl CustomerRepository {
    /// Creates a new CustomerRepository.
    pub fn new(pool: SqlitePool) -> Self {
        CustomerRepository { pool }
    }

    /// Inserts a named customer and returns it with its assigned id.
    ///
    /// New rows are never anonymous; id 0 exists only via the seed
    /// migration.
    pub async fn insert(&self, name: &str, contact_info: &str) -> DbResult<Customer> {
        debug!(name = %name, "Inserting customer");

        let result = sqlx::query(
            "INSERT INTO customers (name, contact_info, is_anonymous) VALUES (?1, ?2, 0)",
        )
        .bind(name)
        .bind(contact_info)
        .execute(&self.pool)
        .await?;

        Ok(Customer {
            id: result.last_insert_rowid(),
            name: name.to_string(),
            contact_info: contact_info.to_string(),
            is_anonymous: false,
        })
    }

    /// Gets a customer by id.
    pub async fn get_by_id(&self, id: i64) -> DbResult<Option<Customer>> {
        let customer = sqlx::query_as::<_, Customer>(
            "SELECT id, name, contact_info, is_anonymous FROM customers WHERE id = ?1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(customer)
    }

    /// Lists all customers, anonymous row first.
    pub async fn list(&self) -> DbResult<Vec<Customer>> {
        let customers = sqlx::query_as::<_, Customer>(
            "SELECT id, name, contact_info, is_anonymous FROM customers ORDER BY id",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(customers)
    }

    /// Deletes a customer.
    ///
    /// ## Errors
    /// - [`DbError::Internal`] when asked to delete the reserved
    ///   anonymous identity
    /// - [`DbError::ForeignKeyViolation`] when sales reference the row
    pub async fn delete(&self, id: i64) -> DbResult<()> {
        if id == ANONYMOUS_CUSTOMER_ID {
            return Err(DbError::Internal(
                "The anonymous customer is reserved and cannot be deleted".to_string(),
            ));
        }

        let result = sqlx::query("DELETE FROM customers WHERE id = ?1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Customer", id));
        }
        Ok(())
    }
}

// =============================================================================
// Employees
// =============================================================================

/// Repository for employee database operations.
#[derive(Debug, Clone)]
pub struct EmployeeRepository {
    pool: SqlitePool,
}

impl EmployeeRepository {
    /// Creates a new EmployeeRepository.
    pub fn new(pool: SqlitePool) -> Self {
        EmployeeRepository { pool }
    }

    /// Inserts an employee and returns it with its assigned id.
    pub async fn insert(&self, name: &str, role: Option<&str>) -> DbResult<Employee> {
        debug!(name = %name, "Inserting employee");

        let result = sqlx::query("INSERT INTO employees (name, role) VALUES (?1, ?2)")
            .bind(name)
            .bind(role)
            .execute(&self.pool)
            .await?;

        Ok(Employee {
            id: result.last_insert_rowid(),
            name: name.to_string(),
            role: role.map(str::to_string),
        })
    }

    /// Gets an employee by id.
    pub async fn get_by_id(&self, id: i64) -> DbResult<Option<Employee>> {
        let employee =
            sqlx::query_as::<_, Employee>("SELECT id, name, role FROM employees WHERE id = ?1")
                .bind(id)
                .fetch_optional(&self.pool)
                .await?;

        Ok(employee)
    }

    /// Lists all employees by name.
    pub async fn list(&self) -> DbResult<Vec<Employee>> {
        let employees =
            sqlx::query_as::<_, Employee>("SELECT id, name, role FROM employees ORDER BY name")
                .fetch_all(&self.pool)
                .await?;

        Ok(employees)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
