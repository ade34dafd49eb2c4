//! # stockbook-core: Pure Business Logic for Stockbook
//!
//! This crate holds the sale record model and all money math as pure
//! functions with zero I/O dependencies.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Stockbook Architecture                           │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                    HTTP API (apps/api)                          │   │
//! │  │   Sale Engine (create / update / delete)  ·  Reporting Service  │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │             ★ stockbook-core (THIS CRATE) ★                     │   │
//! │  │                                                                 │   │
//! │  │   ┌──────────┐  ┌──────────┐  ┌──────────┐  ┌──────────────┐   │   │
//! │  │   │   sale   │  │ finance  │  │  report  │  │   catalog    │   │   │
//! │  │   │ SaleBody │  │ revenue  │  │ buckets  │  │  snapshots   │   │   │
//! │  │   │ SaleLine │  │ cogs     │  │ ranking  │  │  enrichment  │   │   │
//! │  │   └──────────┘  └──────────┘  └──────────┘  └──────────────┘   │   │
//! │  │                                                                 │   │
//! │  │   NO I/O • NO DATABASE • NO NETWORK • PURE FUNCTIONS           │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │                stockbook-db (Database Layer)                    │   │
//! │  │        SQLite queries, migrations, repositories, stock ledger   │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`money`] - Money type with integer arithmetic (no floating point!)
//! - [`types`] - Scope, catalog entities, business expenses
//! - [`sale`] - The two-generation sale record model and engine inputs
//! - [`finance`] - Shape-agnostic revenue / COGS / profit
//! - [`catalog`] - Category resolution and read-time enrichment
//! - [`report`] - Period summaries, rankings, monthly series
//! - [`validation`] - Business rule validation
//! - [`error`] - Domain error types
//!
//! ## Example Usage
//!
//! ```rust
//! use stockbook_core::money::Money;
//!
//! let unit_price = Money::from_cents(1000);
//! let line_total = unit_price.multiply_quantity(3);
//! assert_eq!(line_total.cents(), 3000);
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod catalog;
pub mod error;
pub mod finance;
pub mod money;
pub mod report;
pub mod sale;
pub mod types;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================

pub use error::{CoreError, CoreResult, ValidationError};
pub use money::Money;
pub use sale::*;
pub use types::*;

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Business id sentinel for a user's primary business.
///
/// Records written before businesses existed carry no business id at all;
/// queries scoped to this sentinel include them.
pub const DEFAULT_BUSINESS_ID: &str = "default";

/// Maximum number of lines accepted in a single sale.
pub const MAX_SALE_LINES: usize = 100;

/// Maximum quantity of a single sale line.
///
/// Keeps `quantity × price` comfortably inside i64 cents.
pub const MAX_LINE_QUANTITY: i64 = 1_000_000;

/// Largest unit price accepted on a request line, in cents ($100M).
///
/// With [`MAX_LINE_QUANTITY`] and [`MAX_SALE_LINES`] the request-priced
/// totals stay below `i64::MAX`.
pub const MAX_UNIT_PRICE_CENTS: i64 = 10_000_000_000;

/// Largest sale expense amount (scalar or itemized), in cents.
pub const MAX_EXPENSE_CENTS: i64 = 10_000_000_000;

/// Label used when neither a snapshot nor the live catalog knows a category.
pub const UNCATEGORIZED: &str = "Uncategorized";
