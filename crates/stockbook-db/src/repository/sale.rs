//! # Sale Repository
//!
//! Storage for both sale generations in one table.
//!
//! ## Row Layout
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  sales row                                                              │
//! │                                                                         │
//! │  generation 1 (Legacy)           generation 2 (Lines)                   │
//! │  ─────────────────────           ────────────────────                   │
//! │  product_id            ✓         product_id            NULL             │
//! │  product_name          ✓         product_name          NULL             │
//! │  quantity              ✓         quantity              NULL             │
//! │  unit_sale_price_cents ✓         unit_sale_price_cents NULL             │
//! │  unit_cost_price_cents ✓         unit_cost_price_cents NULL             │
//! │  items_json            NULL      items_json            [SaleLine, ...]  │
//! │                                                                         │
//! │  Anything else is rejected by the decoder as an invalid record.        │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::time::Duration;

use chrono::{DateTime, Utc};
use sqlx::{FromRow, SqlitePool};
use tracing::debug;

use crate::error::{DbError, DbResult};
use crate::repository::SCOPE_FILTER;
use crate::timeout::timed;
use stockbook_core::{
    LegacyLine, Money, Sale, SaleBody, SaleExpenseDetail, SaleLine, SaleTotals, Scope,
};

const SALE_COLUMNS: &str = "id, user_id, business_id, customer_name, sale_date, notes, \
     product_id, product_name, quantity, unit_sale_price_cents, unit_cost_price_cents, \
     items_json, total_sales_cents, total_cogs_cents, total_profit_cents, \
     sale_expenses_cents, sale_expense_details_json, created_at, updated_at";

// =============================================================================
// Filter
// =============================================================================

/// List filter. Dates form the half-open window `[from, to)`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SaleFilter {
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
    /// Only sales with a line referencing this product or service.
    pub item_id: Option<String>,
}

// =============================================================================
// Row Mapping
// =============================================================================

#[derive(Debug, FromRow)]
struct SaleRow {
    id: String,
    user_id: String,
    business_id: Option<String>,
    customer_name: Option<String>,
    sale_date: DateTime<Utc>,
    notes: Option<String>,
    product_id: Option<String>,
    product_name: Option<String>,
    quantity: Option<i64>,
    unit_sale_price_cents: Option<i64>,
    unit_cost_price_cents: Option<i64>,
    items_json: Option<String>,
    total_sales_cents: Option<i64>,
    total_cogs_cents: Option<i64>,
    total_profit_cents: i64,
    sale_expenses_cents: i64,
    sale_expense_details_json: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl SaleRow {
    fn decode_body(&self) -> DbResult<SaleBody> {
        let has_legacy = self.product_id.is_some()
            || self.product_name.is_some()
            || self.quantity.is_some()
            || self.unit_sale_price_cents.is_some()
            || self.unit_cost_price_cents.is_some();

        match (has_legacy, &self.items_json) {
            (true, Some(_)) => Err(DbError::invalid_record(
                "Sale",
                &self.id,
                "both legacy columns and line items are populated",
            )),
            (false, None) => Err(DbError::invalid_record(
                "Sale",
                &self.id,
                "neither legacy columns nor line items are populated",
            )),
            (false, Some(json)) => {
                let lines: Vec<SaleLine> = serde_json::from_str(json).map_err(|e| {
                    DbError::invalid_record("Sale", &self.id, format!("items_json: {e}"))
                })?;
                if lines.is_empty() {
                    return Err(DbError::invalid_record("Sale", &self.id, "empty line items"));
                }
                Ok(SaleBody::Lines(lines))
            }
            (true, None) => {
                let incomplete =
                    || DbError::invalid_record("Sale", &self.id, "incomplete legacy columns");
                Ok(SaleBody::Legacy(LegacyLine {
                    product_id: self.product_id.clone().ok_or_else(incomplete)?,
                    product_name: self.product_name.clone().ok_or_else(incomplete)?,
                    quantity: self.quantity.ok_or_else(incomplete)?,
                    unit_sale_price: Money::from_cents(
                        self.unit_sale_price_cents.ok_or_else(incomplete)?,
                    ),
                    unit_cost_price: Money::from_cents(
                        self.unit_cost_price_cents.ok_or_else(incomplete)?,
                    ),
                }))
            }
        }
    }
}

impl TryFrom<SaleRow> for Sale {
    type Error = DbError;

    fn try_from(row: SaleRow) -> DbResult<Self> {
        let body = row.decode_body()?;

        let sale_expense_details: Vec<SaleExpenseDetail> =
            serde_json::from_str(&row.sale_expense_details_json).map_err(|e| {
                DbError::invalid_record("Sale", &row.id, format!("sale_expense_details_json: {e}"))
            })?;

        let totals = match (row.total_sales_cents, row.total_cogs_cents) {
            (Some(sales), Some(cogs)) => Some(SaleTotals {
                total_sales: Money::from_cents(sales),
                total_cogs: Money::from_cents(cogs),
            }),
            _ => None,
        };

        Ok(Sale {
            id: row.id,
            user_id: row.user_id,
            business_id: row.business_id,
            customer_name: row.customer_name,
            sale_date: row.sale_date,
            notes: row.notes,
            body,
            totals,
            total_profit: Money::from_cents(row.total_profit_cents),
            sale_expenses: Money::from_cents(row.sale_expenses_cents),
            sale_expense_details,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

/// Column values a sale is written with.
struct SaleColumns {
    product_id: Option<String>,
    product_name: Option<String>,
    quantity: Option<i64>,
    unit_sale_price_cents: Option<i64>,
    unit_cost_price_cents: Option<i64>,
    items_json: Option<String>,
    total_sales_cents: Option<i64>,
    total_cogs_cents: Option<i64>,
    details_json: String,
}

impl SaleColumns {
    fn encode(sale: &Sale) -> DbResult<Self> {
        let to_json_err = |e: serde_json::Error| DbError::Internal(e.to_string());
        let details_json =
            serde_json::to_string(&sale.sale_expense_details).map_err(to_json_err)?;
        let totals = sale.totals;

        let columns = match &sale.body {
            SaleBody::Legacy(line) => SaleColumns {
                product_id: Some(line.product_id.clone()),
                product_name: Some(line.product_name.clone()),
                quantity: Some(line.quantity),
                unit_sale_price_cents: Some(line.unit_sale_price.cents()),
                unit_cost_price_cents: Some(line.unit_cost_price.cents()),
                items_json: None,
                total_sales_cents: totals.map(|t| t.total_sales.cents()),
                total_cogs_cents: totals.map(|t| t.total_cogs.cents()),
                details_json,
            },
            SaleBody::Lines(lines) => SaleColumns {
                product_id: None,
                product_name: None,
                quantity: None,
                unit_sale_price_cents: None,
                unit_cost_price_cents: None,
                items_json: Some(serde_json::to_string(lines).map_err(to_json_err)?),
                total_sales_cents: totals.map(|t| t.total_sales.cents()),
                total_cogs_cents: totals.map(|t| t.total_cogs.cents()),
                details_json,
            },
        };
        Ok(columns)
    }
}

// =============================================================================
// Repository
// =============================================================================

#[derive(Debug, Clone)]
pub struct SaleRepository {
    pool: SqlitePool,
    timeout: Duration,
}

impl SaleRepository {
    pub fn new(pool: SqlitePool, timeout: Duration) -> Self {
        SaleRepository { pool, timeout }
    }

    /// Inserts a sale of either generation.
    pub async fn insert(&self, sale: &Sale) -> DbResult<()> {
        debug!(id = %sale.id, lines = sale.body.line_count(), "Inserting sale");

        let c = SaleColumns::encode(sale)?;

        timed("sales.insert", self.timeout, async {
            sqlx::query(
                r#"
                INSERT INTO sales (
                    id, user_id, business_id, customer_name, sale_date, notes,
                    product_id, product_name, quantity, unit_sale_price_cents,
                    unit_cost_price_cents, items_json, total_sales_cents, total_cogs_cents,
                    total_profit_cents, sale_expenses_cents, sale_expense_details_json,
                    created_at, updated_at
                ) VALUES (
                    ?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10,
                    ?11, ?12, ?13, ?14, ?15, ?16, ?17, ?18, ?19
                )
                "#,
            )
            .bind(&sale.id)
            .bind(&sale.user_id)
            .bind(&sale.business_id)
            .bind(&sale.customer_name)
            .bind(sale.sale_date)
            .bind(&sale.notes)
            .bind(&c.product_id)
            .bind(&c.product_name)
            .bind(c.quantity)
            .bind(c.unit_sale_price_cents)
            .bind(c.unit_cost_price_cents)
            .bind(&c.items_json)
            .bind(c.total_sales_cents)
            .bind(c.total_cogs_cents)
            .bind(sale.total_profit.cents())
            .bind(sale.sale_expenses.cents())
            .bind(&c.details_json)
            .bind(sale.created_at)
            .bind(sale.updated_at)
            .execute(&self.pool)
            .await?;
            Ok::<_, DbError>(())
        })
        .await
    }

    /// Gets a sale by id within the scope.
    pub async fn get(&self, scope: &Scope, id: &str) -> DbResult<Option<Sale>> {
        debug!(id = %id, "Getting sale");

        let sql = format!("SELECT {SALE_COLUMNS} FROM sales WHERE {SCOPE_FILTER} AND id = ?3");

        let row = timed("sales.get", self.timeout, async {
            let row = sqlx::query_as::<_, SaleRow>(&sql)
                .bind(&scope.user_id)
                .bind(&scope.business_id)
                .bind(id)
                .fetch_optional(&self.pool)
                .await?;
            Ok::<_, DbError>(row)
        })
        .await?;

        row.map(Sale::try_from).transpose()
    }

    /// Lists sales, newest first.
    ///
    /// The date window is applied in SQL; the item filter is applied to the
    /// decoded bodies since lines live in an embedded JSON column.
    pub async fn list(&self, scope: &Scope, filter: &SaleFilter) -> DbResult<Vec<Sale>> {
        let sql = format!(
            "SELECT {SALE_COLUMNS} FROM sales WHERE {SCOPE_FILTER} \
             AND (?3 IS NULL OR sale_date >= ?3) \
             AND (?4 IS NULL OR sale_date < ?4) \
             ORDER BY sale_date DESC, created_at DESC"
        );

        let rows = timed("sales.list", self.timeout, async {
            let rows = sqlx::query_as::<_, SaleRow>(&sql)
                .bind(&scope.user_id)
                .bind(&scope.business_id)
                .bind(filter.from)
                .bind(filter.to)
                .fetch_all(&self.pool)
                .await?;
            Ok::<_, DbError>(rows)
        })
        .await?;

        let mut sales = rows
            .into_iter()
            .map(Sale::try_from)
            .collect::<DbResult<Vec<_>>>()?;

        if let Some(item_id) = filter.item_id.as_deref() {
            sales.retain(|s| s.body.references(item_id));
        }

        debug!(count = sales.len(), "Listed sales");
        Ok(sales)
    }

    /// Overwrites every mutable column of an existing sale. `id`, owner and
    /// `created_at` are left untouched.
    pub async fn replace(&self, scope: &Scope, sale: &Sale) -> DbResult<()> {
        debug!(id = %sale.id, "Replacing sale");

        let c = SaleColumns::encode(sale)?;
        let sql = format!(
            "UPDATE sales SET \
                customer_name = ?3, sale_date = ?4, notes = ?5, \
                product_id = ?6, product_name = ?7, quantity = ?8, \
                unit_sale_price_cents = ?9, unit_cost_price_cents = ?10, \
                items_json = ?11, total_sales_cents = ?12, total_cogs_cents = ?13, \
                total_profit_cents = ?14, sale_expenses_cents = ?15, \
                sale_expense_details_json = ?16, updated_at = ?17 \
             WHERE {SCOPE_FILTER} AND id = ?18"
        );

        let affected = timed("sales.replace", self.timeout, async {
            let result = sqlx::query(&sql)
                .bind(&scope.user_id)
                .bind(&scope.business_id)
                .bind(&sale.customer_name)
                .bind(sale.sale_date)
                .bind(&sale.notes)
                .bind(&c.product_id)
                .bind(&c.product_name)
                .bind(c.quantity)
                .bind(c.unit_sale_price_cents)
                .bind(c.unit_cost_price_cents)
                .bind(&c.items_json)
                .bind(c.total_sales_cents)
                .bind(c.total_cogs_cents)
                .bind(sale.total_profit.cents())
                .bind(sale.sale_expenses.cents())
                .bind(&c.details_json)
                .bind(sale.updated_at)
                .bind(&sale.id)
                .execute(&self.pool)
                .await?;
            Ok::<_, DbError>(result.rows_affected())
        })
        .await?;

        if affected == 0 {
            return Err(DbError::not_found("Sale", &sale.id));
        }
        Ok(())
    }

    /// Deletes a sale. Returns whether a row was removed.
    pub async fn delete(&self, scope: &Scope, id: &str) -> DbResult<bool> {
        debug!(id = %id, "Deleting sale");

        let sql = format!("DELETE FROM sales WHERE {SCOPE_FILTER} AND id = ?3");

        let affected = timed("sales.delete", self.timeout, async {
            let result = sqlx::query(&sql)
                .bind(&scope.user_id)
                .bind(&scope.business_id)
                .bind(id)
                .execute(&self.pool)
                .await?;
            Ok::<_, DbError>(result.rows_affected())
        })
        .await?;

        Ok(affected > 0)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
