//! # Reporting Service
//!
//! Fetches a scope's sales and expenses for a window once, then hands them
//! to the pure reductions in [`stockbook_core::report`].

use chrono::{DateTime, NaiveDate, Utc};
use tracing::debug;

use stockbook_core::catalog::CatalogIndex;
use stockbook_core::report::{
    self, Bucket, Granularity, MonthPoint, PeriodSummary, TopItems,
};
use stockbook_core::{Expense, Sale, Scope, ValidationError};
use stockbook_db::{Database, SaleFilter};

use crate::error::ApiResult;
use crate::services::catalog_for;

/// Longest monthly trend a single request may ask for.
pub const MAX_TREND_MONTHS: u32 = 60;

/// Largest top-N ranking a single request may ask for.
pub const MAX_TOP_LIMIT: usize = 100;

/// Half-open reporting window `[from, to)`; either bound may be open.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReportWindow {
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
}

impl ReportWindow {
    pub fn new(from: Option<DateTime<Utc>>, to: Option<DateTime<Utc>>) -> Self {
        ReportWindow { from, to }
    }
}

/// Sales, expenses and category index for one scope and window.
struct Dataset {
    sales: Vec<Sale>,
    expenses: Vec<Expense>,
    catalog: CatalogIndex,
}

#[derive(Debug, Clone)]
pub struct ReportService {
    db: Database,
}

impl ReportService {
    pub fn new(db: Database) -> Self {
        ReportService { db }
    }

    pub async fn summary(&self, scope: &Scope, window: ReportWindow) -> ApiResult<PeriodSummary> {
        let data = self.fetch(scope, window).await?;
        Ok(report::summarize(&data.sales, &data.expenses, &data.catalog))
    }

    pub async fn buckets(
        &self,
        scope: &Scope,
        window: ReportWindow,
        granularity: Granularity,
    ) -> ApiResult<Vec<Bucket>> {
        let data = self.fetch(scope, window).await?;
        Ok(report::bucketize(
            &data.sales,
            &data.expenses,
            &data.catalog,
            granularity,
        ))
    }

    /// `months` consecutive calendar months ending with the month of `end`.
    pub async fn monthly_trend(
        &self,
        scope: &Scope,
        months: u32,
        end: NaiveDate,
    ) -> ApiResult<Vec<MonthPoint>> {
        if months == 0 || months > MAX_TREND_MONTHS {
            return Err(ValidationError::OutOfRange {
                field: "months".to_string(),
                min: 1,
                max: MAX_TREND_MONTHS as i64,
            }
            .into());
        }

        let out_of_range = || ValidationError::InvalidFormat {
            field: "end".to_string(),
            reason: "date out of supported range".to_string(),
        };

        let first = report::shift_month(report::month_start(end), -(months as i32 - 1))
            .ok_or_else(out_of_range)?;
        let (from, _) = report::month_window(first).ok_or_else(out_of_range)?;
        let (_, to) = report::month_window(end).ok_or_else(out_of_range)?;

        let data = self.fetch(scope, ReportWindow::new(Some(from), Some(to))).await?;
        Ok(report::monthly_series(
            &data.sales,
            &data.expenses,
            &data.catalog,
            first,
            months,
        ))
    }

    pub async fn top_items(
        &self,
        scope: &Scope,
        window: ReportWindow,
        limit: usize,
    ) -> ApiResult<TopItems> {
        if limit == 0 || limit > MAX_TOP_LIMIT {
            return Err(ValidationError::OutOfRange {
                field: "limit".to_string(),
                min: 1,
                max: MAX_TOP_LIMIT as i64,
            }
            .into());
        }

        let data = self.fetch(scope, window).await?;
        Ok(report::top_items(&data.sales, &data.catalog, limit))
    }

    async fn fetch(&self, scope: &Scope, window: ReportWindow) -> ApiResult<Dataset> {
        let filter = SaleFilter {
            from: window.from,
            to: window.to,
            item_id: None,
        };

        let sales = self.db.sales().list(scope, &filter).await?;
        let expenses = self.db.expenses().list(scope, window.from, window.to).await?;
        let catalog = catalog_for(&self.db, scope, &sales).await?;

        debug!(
            sales = sales.len(),
            expenses = expenses.len(),
            catalog = catalog.len(),
            "Loaded report dataset"
        );

        Ok(Dataset {
            sales,
            expenses,
            catalog,
        })
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCode;
    use crate::services::{fixtures, SaleEngine};
    use chrono::TimeZone;
    use stockbook_core::{
        ItemKind, LegacyLine, LineInput, Money, SaleBody, SaleExpenseDetail, SaleInput,
    };
    use uuid::Uuid;

    fn dated_sale(item_id: &str, quantity: i64, date: DateTime<Utc>) -> SaleInput {
        let mut input = SaleInput::from_lines(vec![LineInput {
            item_id: item_id.to_string(),
            item_kind: ItemKind::Product,
            quantity,
            unit_sale_price: None,
        }]);
        input.sale_date = Some(date);
        input
    }

    fn expense(scope: &Scope, amount: i64, date: DateTime<Utc>) -> Expense {
        Expense {
            id: Uuid::new_v4().to_string(),
            user_id: scope.user_id.clone(),
            business_id: Some(scope.business_id.clone()),
            category: "Rent".to_string(),
            amount: Money::from_cents(amount),
            description: None,
            expense_date: date,
            created_at: date,
        }
    }

    #[tokio::test]
    async fn test_summary_profit_ladder() {
        let db = fixtures::db().await;
        let scope = fixtures::scope();
        let mug = fixtures::product(&db, &scope, "Mug", "Kitchen", 20, 400, 1000).await;
        let engine = SaleEngine::new(db.clone());
        let reports = ReportService::new(db.clone());

        let day = Utc.with_ymd_and_hms(2024, 3, 10, 12, 0, 0).unwrap();
        let mut input = dated_sale(&mug.id, 3, day);
        input.sale_expense_details = vec![SaleExpenseDetail {
            category: "Shipping".to_string(),
            amount: Money::from_cents(200),
            description: None,
        }];
        engine.create(&scope, input).await.unwrap();
        db.expenses().insert(&expense(&scope, 500, day)).await.unwrap();

        let summary = reports.summary(&scope, ReportWindow::default()).await.unwrap();
        assert_eq!(summary.revenue, Money::from_cents(3000));
        assert_eq!(summary.cogs, Money::from_cents(1200));
        assert_eq!(summary.sale_expenses, Money::from_cents(200));
        assert_eq!(summary.gross_profit, Money::from_cents(1600));
        assert_eq!(summary.business_expenses, Money::from_cents(500));
        assert_eq!(summary.net_profit, Money::from_cents(1100));
        assert_eq!(summary.sale_count, 1);
        assert_eq!(summary.units_sold, 3);
    }

    #[tokio::test]
    async fn test_top_category_by_revenue() {
        let db = fixtures::db().await;
        let scope = fixtures::scope();
        let a = fixtures::product(&db, &scope, "Apron", "A", 20, 100, 1000).await;
        let b = fixtures::product(&db, &scope, "Bowl", "B", 20, 100, 5000).await;
        let engine = SaleEngine::new(db.clone());
        let reports = ReportService::new(db.clone());

        let now = Utc::now();
        engine.create(&scope, dated_sale(&a.id, 10, now)).await.unwrap();
        engine.create(&scope, dated_sale(&b.id, 3, now)).await.unwrap();

        let top = reports
            .top_items(&scope, ReportWindow::default(), 5)
            .await
            .unwrap();
        assert_eq!(top.categories[0].key, "B");
        assert_eq!(top.categories[0].revenue, Money::from_cents(15000));
        assert_eq!(top.categories[1].key, "A");
        assert_eq!(top.items[0].name, "Bowl");

        let summary = reports.summary(&scope, ReportWindow::default()).await.unwrap();
        assert_eq!(summary.top_category.unwrap().key, "B");
    }

    #[tokio::test]
    async fn test_legacy_sale_category_from_live_catalog() {
        let db = fixtures::db().await;
        let scope = fixtures::scope();
        let lamp = fixtures::product(&db, &scope, "Lamp", "Lighting", 5, 1500, 3000).await;
        let reports = ReportService::new(db.clone());

        let now = Utc::now();
        let legacy = stockbook_core::Sale {
            id: Uuid::new_v4().to_string(),
            user_id: scope.user_id.clone(),
            business_id: None,
            customer_name: None,
            sale_date: now,
            notes: None,
            body: SaleBody::Legacy(LegacyLine {
                product_id: lamp.id.clone(),
                product_name: lamp.name.clone(),
                quantity: 1,
                unit_sale_price: Money::from_cents(3000),
                unit_cost_price: Money::from_cents(1500),
            }),
            totals: None,
            total_profit: Money::from_cents(1500),
            sale_expenses: Money::zero(),
            sale_expense_details: Vec::new(),
            created_at: now,
            updated_at: now,
        };
        db.sales().insert(&legacy).await.unwrap();

        let top = reports
            .top_items(&scope, ReportWindow::default(), 3)
            .await
            .unwrap();
        assert_eq!(top.categories[0].key, "Lighting");
        assert_eq!(top.categories[0].profit, Money::from_cents(1500));
    }

    #[tokio::test]
    async fn test_buckets_and_window() {
        let db = fixtures::db().await;
        let scope = fixtures::scope();
        let mug = fixtures::product(&db, &scope, "Mug", "Kitchen", 20, 400, 1000).await;
        let engine = SaleEngine::new(db.clone());
        let reports = ReportService::new(db.clone());

        let jan = Utc.with_ymd_and_hms(2024, 1, 20, 9, 0, 0).unwrap();
        let feb = Utc.with_ymd_and_hms(2024, 2, 3, 9, 0, 0).unwrap();
        engine.create(&scope, dated_sale(&mug.id, 1, jan)).await.unwrap();
        engine.create(&scope, dated_sale(&mug.id, 2, feb)).await.unwrap();

        let buckets = reports
            .buckets(&scope, ReportWindow::default(), Granularity::Month)
            .await
            .unwrap();
        assert_eq!(buckets.len(), 2);
        assert_eq!(buckets[0].period, "2024-01");
        assert_eq!(buckets[1].summary.units_sold, 2);

        let feb_start = Utc.with_ymd_and_hms(2024, 2, 1, 0, 0, 0).unwrap();
        let window = ReportWindow::new(Some(feb_start), None);
        let summary = reports.summary(&scope, window).await.unwrap();
        assert_eq!(summary.sale_count, 1);
        assert_eq!(summary.revenue, Money::from_cents(2000));
    }

    #[tokio::test]
    async fn test_monthly_trend_windows_are_disjoint() {
        let db = fixtures::db().await;
        let scope = fixtures::scope();
        let mug = fixtures::product(&db, &scope, "Mug", "Kitchen", 20, 400, 1000).await;
        let engine = SaleEngine::new(db.clone());
        let reports = ReportService::new(db.clone());

        // Exactly on a month boundary: belongs to March only.
        let boundary = Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap();
        let feb = Utc.with_ymd_and_hms(2024, 2, 29, 23, 59, 59).unwrap();
        let dec = Utc.with_ymd_and_hms(2023, 12, 31, 10, 0, 0).unwrap();
        engine.create(&scope, dated_sale(&mug.id, 1, boundary)).await.unwrap();
        engine.create(&scope, dated_sale(&mug.id, 2, feb)).await.unwrap();
        engine.create(&scope, dated_sale(&mug.id, 4, dec)).await.unwrap();

        let end = NaiveDate::from_ymd_opt(2024, 3, 15).unwrap();
        let series = reports.monthly_trend(&scope, 3, end).await.unwrap();

        let months: Vec<&str> = series.iter().map(|p| p.month.as_str()).collect();
        assert_eq!(months, vec!["2024-01", "2024-02", "2024-03"]);
        assert_eq!(series[0].summary.units_sold, 0);
        assert_eq!(series[1].summary.units_sold, 2);
        assert_eq!(series[2].summary.units_sold, 1);

        let total: i64 = series.iter().map(|p| p.summary.units_sold).sum();
        assert_eq!(total, 3);
    }

    #[tokio::test]
    async fn test_limits_are_validated() {
        let db = fixtures::db().await;
        let scope = fixtures::scope();
        let reports = ReportService::new(db);

        let end = NaiveDate::from_ymd_opt(2024, 3, 15).unwrap();
        let err = reports.monthly_trend(&scope, 0, end).await.unwrap_err();
        assert_eq!(err.code, ErrorCode::ValidationError);
        let err = reports.monthly_trend(&scope, 61, end).await.unwrap_err();
        assert_eq!(err.code, ErrorCode::ValidationError);

        let err = reports
            .top_items(&scope, ReportWindow::default(), 0)
            .await
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::ValidationError);
    }

    #[tokio::test]
    async fn test_reports_are_scoped() {
        let db = fixtures::db().await;
        let scope = fixtures::scope();
        let mug = fixtures::product(&db, &scope, "Mug", "Kitchen", 20, 400, 1000).await;
        let engine = SaleEngine::new(db.clone());
        let reports = ReportService::new(db.clone());

        engine
            .create(&scope, dated_sale(&mug.id, 2, Utc::now()))
            .await
            .unwrap();

        let other = Scope::new("user-1", Some("shop-2"));
        let summary = reports.summary(&other, ReportWindow::default()).await.unwrap();
        assert_eq!(summary.sale_count, 0);
        assert!(summary.revenue.is_zero());
        assert!(summary.top_category.is_none());
    }
}
