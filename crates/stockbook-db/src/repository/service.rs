//! # Service Repository
//!
//! Services carry no stock, so this is a plain scoped lookup table.

use std::time::Duration;

use chrono::{DateTime, Utc};
use sqlx::{FromRow, SqlitePool};
use tracing::debug;

use crate::error::{DbError, DbResult};
use crate::repository::SCOPE_FILTER;
use crate::timeout::timed;
use stockbook_core::{Money, Scope, Service};

const SERVICE_COLUMNS: &str =
    "id, user_id, business_id, name, price_cents, category, created_at, updated_at";

#[derive(Debug, FromRow)]
struct ServiceRow {
    id: String,
    user_id: String,
    business_id: Option<String>,
    name: String,
    price_cents: i64,
    category: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<ServiceRow> for Service {
    fn from(row: ServiceRow) -> Self {
        Service {
            id: row.id,
            user_id: row.user_id,
            business_id: row.business_id,
            name: row.name,
            price: Money::from_cents(row.price_cents),
            category: row.category,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ServiceRepository {
    pool: SqlitePool,
    timeout: Duration,
}

impl ServiceRepository {
    pub fn new(pool: SqlitePool, timeout: Duration) -> Self {
        ServiceRepository { pool, timeout }
    }

    pub async fn get(&self, scope: &Scope, id: &str) -> DbResult<Option<Service>> {
        debug!(id = %id, "Getting service");

        let sql = format!("SELECT {SERVICE_COLUMNS} FROM services WHERE {SCOPE_FILTER} AND id = ?3");

        let row = timed("services.get", self.timeout, async {
            let row = sqlx::query_as::<_, ServiceRow>(&sql)
                .bind(&scope.user_id)
                .bind(&scope.business_id)
                .bind(id)
                .fetch_optional(&self.pool)
                .await?;
            Ok::<_, DbError>(row)
        })
        .await?;

        Ok(row.map(Service::from))
    }

    pub async fn list(&self, scope: &Scope) -> DbResult<Vec<Service>> {
        let sql = format!("SELECT {SERVICE_COLUMNS} FROM services WHERE {SCOPE_FILTER} ORDER BY name");

        let rows = timed("services.list", self.timeout, async {
            let rows = sqlx::query_as::<_, ServiceRow>(&sql)
                .bind(&scope.user_id)
                .bind(&scope.business_id)
                .fetch_all(&self.pool)
                .await?;
            Ok::<_, DbError>(rows)
        })
        .await?;

        Ok(rows.into_iter().map(Service::from).collect())
    }

    /// Inserts a service (seed binary and tests).
    pub async fn insert(&self, service: &Service) -> DbResult<()> {
        debug!(id = %service.id, name = %service.name, "Inserting service");

        timed("services.insert", self.timeout, async {
            sqlx::query(
                r#"
                INSERT INTO services (
                    id, user_id, business_id, name, price_cents, category, created_at, updated_at
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
                "#,
            )
            .bind(&service.id)
            .bind(&service.user_id)
            .bind(&service.business_id)
            .bind(&service.name)
            .bind(service.price.cents())
            .bind(&service.category)
            .bind(service.created_at)
            .bind(service.updated_at)
            .execute(&self.pool)
            .await?;
            Ok::<_, DbError>(())
        })
        .await
    }
}
