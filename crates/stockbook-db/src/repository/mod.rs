//! # Repository Module
//!
//! Database repository implementations for Stockbook.
//!
//! ## Repository Pattern
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Sale Engine                                                            │
//! │       │                                                                 │
//! │       │  db.products().get(&scope, id)                                 │
//! │       │  db.stock().adjust(&scope, id, -3)                             │
//! │       │  db.sales().insert(&sale)                                      │
//! │       ▼                                                                 │
//! │  Repository  ──► timed(op, deadline, sqlx query) ──► SQLite            │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Scoping
//! Every read and write is filtered by user and business. The `"default"`
//! business also matches rows stored with a NULL business id:
//!
//! ```sql
//! user_id = ?1 AND (business_id = ?2 OR (?2 = 'default' AND business_id IS NULL))
//! ```
//!
//! Scoped statements therefore always bind the user id as `?1` and the
//! business id as `?2`.
//!
//! ## Available Repositories
//!
//! - [`product::ProductRepository`] - Product lookup and insertion
//! - [`service::ServiceRepository`] - Service lookup and insertion
//! - [`sale::SaleRepository`] - Sale records (both generations)
//! - [`expense::ExpenseRepository`] - Business expenses
//! - [`stock::StockLedger`] - Atomic stock adjustments

pub mod expense;
pub mod product;
pub mod sale;
pub mod service;
pub mod stock;

/// Scope predicate shared by every scoped statement (binds `?1`, `?2`).
pub(crate) const SCOPE_FILTER: &str =
    "user_id = ?1 AND (business_id = ?2 OR (?2 = 'default' AND business_id IS NULL))";
