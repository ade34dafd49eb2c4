//! # Expense Repository
//!
//! Business expenses (rent, utilities, ...) read by reporting.

use std::time::Duration;

use chrono::{DateTime, Utc};
use sqlx::{FromRow, SqlitePool};
use tracing::debug;

use crate::error::{DbError, DbResult};
use crate::repository::SCOPE_FILTER;
use crate::timeout::timed;
use stockbook_core::{Expense, Money, Scope};

#[derive(Debug, FromRow)]
struct ExpenseRow {
    id: String,
    user_id: String,
    business_id: Option<String>,
    category: String,
    amount_cents: i64,
    description: Option<String>,
    expense_date: DateTime<Utc>,
    created_at: DateTime<Utc>,
}

impl From<ExpenseRow> for Expense {
    fn from(row: ExpenseRow) -> Self {
        Expense {
            id: row.id,
            user_id: row.user_id,
            business_id: row.business_id,
            category: row.category,
            amount: Money::from_cents(row.amount_cents),
            description: row.description,
            expense_date: row.expense_date,
            created_at: row.created_at,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ExpenseRepository {
    pool: SqlitePool,
    timeout: Duration,
}

impl ExpenseRepository {
    pub fn new(pool: SqlitePool, timeout: Duration) -> Self {
        ExpenseRepository { pool, timeout }
    }

    /// Lists expenses dated in `[from, to)`, oldest first. Either bound may
    /// be open.
    pub async fn list(
        &self,
        scope: &Scope,
        from: Option<DateTime<Utc>>,
        to: Option<DateTime<Utc>>,
    ) -> DbResult<Vec<Expense>> {
        let sql = format!(
            "SELECT id, user_id, business_id, category, amount_cents, description, \
             expense_date, created_at \
             FROM expenses WHERE {SCOPE_FILTER} \
             AND (?3 IS NULL OR expense_date >= ?3) \
             AND (?4 IS NULL OR expense_date < ?4) \
             ORDER BY expense_date"
        );

        let rows = timed("expenses.list", self.timeout, async {
            let rows = sqlx::query_as::<_, ExpenseRow>(&sql)
                .bind(&scope.user_id)
                .bind(&scope.business_id)
                .bind(from)
                .bind(to)
                .fetch_all(&self.pool)
                .await?;
            Ok::<_, DbError>(rows)
        })
        .await?;

        debug!(count = rows.len(), "Listed expenses");
        Ok(rows.into_iter().map(Expense::from).collect())
    }

    pub async fn insert(&self, expense: &Expense) -> DbResult<()> {
        debug!(id = %expense.id, category = %expense.category, "Inserting expense");

        timed("expenses.insert", self.timeout, async {
            sqlx::query(
                r#"
                INSERT INTO expenses (
                    id, user_id, business_id, category, amount_cents, description,
                    expense_date, created_at
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
                "#,
            )
            .bind(&expense.id)
            .bind(&expense.user_id)
            .bind(&expense.business_id)
            .bind(&expense.category)
            .bind(expense.amount.cents())
            .bind(&expense.description)
            .bind(expense.expense_date)
            .bind(expense.created_at)
            .execute(&self.pool)
            .await?;
            Ok::<_, DbError>(())
        })
        .await
    }
}
