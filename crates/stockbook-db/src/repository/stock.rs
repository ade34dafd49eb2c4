//! # Stock Ledger
//!
//! The only writer of `products.current_stock`.
//!
//! ## Atomic Adjustment
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  adjust(scope, product_id, delta)                                       │
//! │                                                                         │
//! │  UPDATE products                                                        │
//! │     SET current_stock = current_stock + delta                           │
//! │   WHERE id = ? AND <scope>                                              │
//! │     AND (delta >= 0 OR current_stock + delta >= 0)                      │
//! │  RETURNING current_stock                                                │
//! │                                                                         │
//! │  row returned  → new stock level                                        │
//! │  no row        → follow-up read:                                        │
//! │                    product missing → DbError::NotFound                  │
//! │                    product present → DbError::InsufficientStock         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The availability check and the write are one statement, so two
//! concurrent sales of the last unit cannot both succeed. Increments are
//! unconditional.

use std::time::Duration;

use chrono::Utc;
use sqlx::SqlitePool;
use tracing::debug;

use crate::error::{DbError, DbResult};
use crate::repository::SCOPE_FILTER;
use crate::timeout::timed;
use stockbook_core::Scope;

#[derive(Debug, Clone)]
pub struct StockLedger {
    pool: SqlitePool,
    timeout: Duration,
}

impl StockLedger {
    pub fn new(pool: SqlitePool, timeout: Duration) -> Self {
        StockLedger { pool, timeout }
    }

    /// Applies a signed delta and returns the new stock level.
    ///
    /// Negative deltas only apply when enough stock is on hand.
    ///
    /// A [`DbError::Timeout`] means the outcome is unknown: the deadline
    /// drops the query future, but SQLite may already have committed the
    /// update. Callers must not assume the stock was left unchanged.
    pub async fn adjust(&self, scope: &Scope, product_id: &str, delta: i64) -> DbResult<i64> {
        debug!(product_id = %product_id, delta, "Adjusting stock");

        let sql = format!(
            "UPDATE products \
             SET current_stock = current_stock + ?3, updated_at = ?4 \
             WHERE {SCOPE_FILTER} AND id = ?5 \
             AND (?3 >= 0 OR current_stock + ?3 >= 0) \
             RETURNING current_stock"
        );

        let updated: Option<i64> = timed("stock.adjust", self.timeout, async {
            let updated = sqlx::query_scalar::<_, i64>(&sql)
                .bind(&scope.user_id)
                .bind(&scope.business_id)
                .bind(delta)
                .bind(Utc::now())
                .bind(product_id)
                .fetch_optional(&self.pool)
                .await?;
            Ok::<_, DbError>(updated)
        })
        .await?;

        if let Some(stock) = updated {
            return Ok(stock);
        }

        match self.current_stock(scope, product_id).await? {
            None => Err(DbError::not_found("Product", product_id)),
            Some(available) => {
                debug!(product_id = %product_id, available, delta, "Stock decrement refused");
                Err(DbError::InsufficientStock {
                    product_id: product_id.to_string(),
                    available,
                    requested: -delta,
                })
            }
        }
    }

    /// Reads the current stock level (`None` if the product is not visible
    /// in this scope).
    pub async fn current_stock(&self, scope: &Scope, product_id: &str) -> DbResult<Option<i64>> {
        let sql = format!("SELECT current_stock FROM products WHERE {SCOPE_FILTER} AND id = ?3");

        timed("stock.current", self.timeout, async {
            let stock = sqlx::query_scalar::<_, i64>(&sql)
                .bind(&scope.user_id)
                .bind(&scope.business_id)
                .bind(product_id)
                .fetch_optional(&self.pool)
                .await?;
            Ok::<_, DbError>(stock)
        })
        .await
    }
}
