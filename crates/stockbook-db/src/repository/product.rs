//! # Product Repository
//!
//! Scoped product reads and insertion. Stock is never written here; see
//! [`crate::repository::stock::StockLedger`].

use std::collections::BTreeMap;
use std::time::Duration;

use chrono::{DateTime, Utc};
use sqlx::{FromRow, SqlitePool};
use tracing::debug;

use crate::error::{DbError, DbResult};
use crate::repository::SCOPE_FILTER;
use crate::timeout::timed;
use stockbook_core::{Money, Product, Scope};

const PRODUCT_COLUMNS: &str = "id, user_id, business_id, name, category, sku, product_type, \
     size, color, cost_price_cents, sale_price_cents, current_stock, custom_fields_json, \
     created_at, updated_at";

#[derive(Debug, FromRow)]
struct ProductRow {
    id: String,
    user_id: String,
    business_id: Option<String>,
    name: String,
    category: Option<String>,
    sku: Option<String>,
    product_type: Option<String>,
    size: Option<String>,
    color: Option<String>,
    cost_price_cents: i64,
    sale_price_cents: i64,
    current_stock: i64,
    custom_fields_json: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<ProductRow> for Product {
    type Error = DbError;

    fn try_from(row: ProductRow) -> DbResult<Self> {
        let custom_fields: BTreeMap<String, String> =
            serde_json::from_str(&row.custom_fields_json).map_err(|e| {
                DbError::invalid_record("Product", &row.id, format!("custom fields: {e}"))
            })?;

        Ok(Product {
            id: row.id,
            user_id: row.user_id,
            business_id: row.business_id,
            name: row.name,
            category: row.category,
            sku: row.sku,
            product_type: row.product_type,
            size: row.size,
            color: row.color,
            cost_price: Money::from_cents(row.cost_price_cents),
            sale_price: Money::from_cents(row.sale_price_cents),
            current_stock: row.current_stock,
            custom_fields,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

/// Repository for product database operations.
#[derive(Debug, Clone)]
pub struct ProductRepository {
    pool: SqlitePool,
    timeout: Duration,
}

impl ProductRepository {
    pub fn new(pool: SqlitePool, timeout: Duration) -> Self {
        ProductRepository { pool, timeout }
    }

    /// Gets a product by id within the scope.
    ///
    /// ## Returns
    /// * `Ok(Some(Product))` - Product found
    /// * `Ok(None)` - No such product in this scope
    pub async fn get(&self, scope: &Scope, id: &str) -> DbResult<Option<Product>> {
        debug!(id = %id, "Getting product");

        let sql = format!("SELECT {PRODUCT_COLUMNS} FROM products WHERE {SCOPE_FILTER} AND id = ?3");

        let row = timed("products.get", self.timeout, async {
            let row = sqlx::query_as::<_, ProductRow>(&sql)
                .bind(&scope.user_id)
                .bind(&scope.business_id)
                .bind(id)
                .fetch_optional(&self.pool)
                .await?;
            Ok::<_, DbError>(row)
        })
        .await?;

        row.map(Product::try_from).transpose()
    }

    /// Lists every product in the scope, ordered by name.
    pub async fn list(&self, scope: &Scope) -> DbResult<Vec<Product>> {
        let sql = format!("SELECT {PRODUCT_COLUMNS} FROM products WHERE {SCOPE_FILTER} ORDER BY name");

        let rows = timed("products.list", self.timeout, async {
            let rows = sqlx::query_as::<_, ProductRow>(&sql)
                .bind(&scope.user_id)
                .bind(&scope.business_id)
                .fetch_all(&self.pool)
                .await?;
            Ok::<_, DbError>(rows)
        })
        .await?;

        debug!(count = rows.len(), "Listed products");
        rows.into_iter().map(Product::try_from).collect()
    }

    /// Inserts a product.
    ///
    /// Catalog management lives outside this system; this exists for the
    /// seed binary and tests.
    pub async fn insert(&self, product: &Product) -> DbResult<()> {
        debug!(id = %product.id, name = %product.name, "Inserting product");

        let custom_fields = serde_json::to_string(&product.custom_fields)
            .map_err(|e| DbError::Internal(e.to_string()))?;

        timed("products.insert", self.timeout, async {
            sqlx::query(
                r#"
                INSERT INTO products (
                    id, user_id, business_id, name, category, sku, product_type,
                    size, color, cost_price_cents, sale_price_cents, current_stock,
                    custom_fields_json, created_at, updated_at
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15)
                "#,
            )
            .bind(&product.id)
            .bind(&product.user_id)
            .bind(&product.business_id)
            .bind(&product.name)
            .bind(&product.category)
            .bind(&product.sku)
            .bind(&product.product_type)
            .bind(&product.size)
            .bind(&product.color)
            .bind(product.cost_price.cents())
            .bind(product.sale_price.cents())
            .bind(product.current_stock)
            .bind(&custom_fields)
            .bind(product.created_at)
            .bind(product.updated_at)
            .execute(&self.pool)
            .await?;
            Ok::<_, DbError>(())
        })
        .await
    }
}
