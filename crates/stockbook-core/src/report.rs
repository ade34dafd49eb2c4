//! # Report Reductions
//!
//! Pure reductions over pre-fetched sales and expenses. The reporting
//! service fetches once per request and calls into here; nothing in this
//! module touches storage.
//!
//! ## Profit Ladder
//! ```text
//! revenue
//!   − cogs
//!   − sale expenses        (shipping, payment fees, ...)
//!   ─────────────────
//!   = gross profit
//!   − business expenses    (rent, utilities, ...)
//!   ─────────────────
//!   = net profit
//! ```
//!
//! ## Monthly Series
//! ```text
//!   pre-fetched sales ──┬──► [Jan 1, Feb 1) ──► summarize
//!                       ├──► [Feb 1, Mar 1) ──► summarize
//!                       └──► [Mar 1, Apr 1) ──► summarize
//! ```
//! Windows are half-open, so a sale lands in exactly one month.

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Datelike, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};

use crate::catalog::{resolve_category, CatalogIndex};
use crate::error::ValidationError;
use crate::finance;
use crate::money::Money;
use crate::sale::{Sale, SaleBody};
use crate::types::Expense;

// =============================================================================
// Granularity
// =============================================================================

/// Bucket width for period reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Granularity {
    Day,
    Month,
    Year,
}

impl Granularity {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Granularity::Day => "day",
            Granularity::Month => "month",
            Granularity::Year => "year",
        }
    }

    /// First day of the bucket containing `date`.
    pub fn bucket_start(&self, date: NaiveDate) -> NaiveDate {
        let start = match self {
            Granularity::Day => Some(date),
            Granularity::Month => date.with_day(1),
            Granularity::Year => NaiveDate::from_ymd_opt(date.year(), 1, 1),
        };
        start.unwrap_or(date)
    }

    /// Human-readable bucket label (`2024-03-05`, `2024-03`, `2024`).
    pub fn label(&self, start: NaiveDate) -> String {
        match self {
            Granularity::Day => start.format("%Y-%m-%d").to_string(),
            Granularity::Month => start.format("%Y-%m").to_string(),
            Granularity::Year => start.format("%Y").to_string(),
        }
    }
}

impl Default for Granularity {
    fn default() -> Self {
        Granularity::Month
    }
}

impl fmt::Display for Granularity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Granularity {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "day" | "daily" => Ok(Granularity::Day),
            "month" | "monthly" => Ok(Granularity::Month),
            "year" | "yearly" => Ok(Granularity::Year),
            _ => Err(ValidationError::InvalidFormat {
                field: "granularity".to_string(),
                reason: "expected day, month or year".to_string(),
            }),
        }
    }
}

// =============================================================================
// Report Types
// =============================================================================

/// One group in a category or item ranking.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RankEntry {
    /// Category label, or item id for item rankings.
    pub key: String,
    /// Display name (same as `key` for categories).
    pub name: String,
    pub revenue: Money,
    pub cogs: Money,
    /// Line-level profit (before sale expenses).
    pub profit: Money,
    pub quantity: i64,
}

/// Reduced figures for one period.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PeriodSummary {
    pub revenue: Money,
    pub cogs: Money,
    pub sale_expenses: Money,
    pub business_expenses: Money,
    /// revenue − cogs − sale_expenses
    pub gross_profit: Money,
    /// gross_profit − business_expenses
    pub net_profit: Money,
    pub sale_count: usize,
    pub units_sold: i64,
    pub top_category: Option<RankEntry>,
    pub top_product: Option<RankEntry>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Bucket {
    pub period: String,
    pub start: NaiveDate,
    pub summary: PeriodSummary,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MonthPoint {
    /// `YYYY-MM`
    pub month: String,
    pub start: NaiveDate,
    pub summary: PeriodSummary,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TopItems {
    pub categories: Vec<RankEntry>,
    pub items: Vec<RankEntry>,
}

// =============================================================================
// Line Contributions
// =============================================================================

/// What one line (or one legacy sale) adds to the rankings.
struct Contribution {
    item_id: String,
    name: String,
    category: String,
    revenue: Money,
    cogs: Money,
    profit: Money,
    quantity: i64,
}

fn contributions(sale: &Sale, catalog: &CatalogIndex) -> Vec<Contribution> {
    match &sale.body {
        SaleBody::Legacy(line) => {
            let revenue = line.unit_sale_price.multiply_quantity(line.quantity);
            let cogs = line.unit_cost_price.multiply_quantity(line.quantity);
            vec![Contribution {
                item_id: line.product_id.clone(),
                name: line.product_name.clone(),
                category: resolve_category(None, &line.product_id, catalog),
                revenue,
                cogs,
                profit: revenue - cogs,
                quantity: line.quantity,
            }]
        }
        SaleBody::Lines(lines) => lines
            .iter()
            .map(|l| Contribution {
                item_id: l.item_id.clone(),
                name: l.name.clone(),
                category: resolve_category(l.snapshot.as_ref(), &l.item_id, catalog),
                revenue: l.line_total,
                cogs: l.cogs(),
                profit: l.line_profit,
                quantity: l.quantity,
            })
            .collect(),
    }
}

/// Groups contributions, keeping first-seen order, then sorts by
/// descending revenue. The sort is stable, so exact ties stay in
/// first-seen order.
fn rank_by<F>(sales: &[&Sale], catalog: &CatalogIndex, group: F) -> Vec<RankEntry>
where
    F: Fn(&Contribution) -> (String, String),
{
    let mut positions: HashMap<String, usize> = HashMap::new();
    let mut entries: Vec<RankEntry> = Vec::new();

    for sale in sales {
        for c in contributions(sale, catalog) {
            let (key, name) = group(&c);
            let idx = match positions.get(&key) {
                Some(&idx) => idx,
                None => {
                    entries.push(RankEntry {
                        key: key.clone(),
                        name,
                        revenue: Money::zero(),
                        cogs: Money::zero(),
                        profit: Money::zero(),
                        quantity: 0,
                    });
                    positions.insert(key, entries.len() - 1);
                    entries.len() - 1
                }
            };
            let entry = &mut entries[idx];
            entry.revenue += c.revenue;
            entry.cogs += c.cogs;
            entry.profit += c.profit;
            entry.quantity += c.quantity;
        }
    }

    entries.sort_by(|a, b| b.revenue.cmp(&a.revenue));
    entries
}

fn rank_categories_refs(sales: &[&Sale], catalog: &CatalogIndex) -> Vec<RankEntry> {
    rank_by(sales, catalog, |c| (c.category.clone(), c.category.clone()))
}

fn rank_items_refs(sales: &[&Sale], catalog: &CatalogIndex) -> Vec<RankEntry> {
    rank_by(sales, catalog, |c| (c.item_id.clone(), c.name.clone()))
}

/// Categories by descending revenue.
pub fn rank_categories(sales: &[Sale], catalog: &CatalogIndex) -> Vec<RankEntry> {
    let refs: Vec<&Sale> = sales.iter().collect();
    rank_categories_refs(&refs, catalog)
}

/// Catalog items by descending revenue.
pub fn rank_items(sales: &[Sale], catalog: &CatalogIndex) -> Vec<RankEntry> {
    let refs: Vec<&Sale> = sales.iter().collect();
    rank_items_refs(&refs, catalog)
}

/// The first `limit` categories and items.
pub fn top_items(sales: &[Sale], catalog: &CatalogIndex, limit: usize) -> TopItems {
    let mut categories = rank_categories(sales, catalog);
    let mut items = rank_items(sales, catalog);
    categories.truncate(limit);
    items.truncate(limit);
    TopItems { categories, items }
}

// =============================================================================
// Summaries
// =============================================================================

fn summarize_refs(sales: &[&Sale], expenses: &[&Expense], catalog: &CatalogIndex) -> PeriodSummary {
    let revenue: Money = sales.iter().map(|s| finance::revenue(s)).sum();
    let cogs: Money = sales.iter().map(|s| finance::cogs(s)).sum();
    let sale_expenses: Money = sales.iter().map(|s| s.sale_expenses).sum();
    let business_expenses: Money = expenses.iter().map(|e| e.amount).sum();
    let gross_profit = revenue - cogs - sale_expenses;

    PeriodSummary {
        revenue,
        cogs,
        sale_expenses,
        business_expenses,
        gross_profit,
        net_profit: gross_profit - business_expenses,
        sale_count: sales.len(),
        units_sold: sales.iter().map(|s| finance::quantity(s)).sum(),
        top_category: rank_categories_refs(sales, catalog).into_iter().next(),
        top_product: rank_items_refs(sales, catalog).into_iter().next(),
    }
}

/// Reduces a whole sale/expense set into one summary.
pub fn summarize(sales: &[Sale], expenses: &[Expense], catalog: &CatalogIndex) -> PeriodSummary {
    let sale_refs: Vec<&Sale> = sales.iter().collect();
    let expense_refs: Vec<&Expense> = expenses.iter().collect();
    summarize_refs(&sale_refs, &expense_refs, catalog)
}

/// Splits the sets into day, month or year buckets, ascending.
///
/// Only periods with at least one sale or expense appear.
pub fn bucketize(
    sales: &[Sale],
    expenses: &[Expense],
    catalog: &CatalogIndex,
    granularity: Granularity,
) -> Vec<Bucket> {
    let mut groups: BTreeMap<NaiveDate, (Vec<&Sale>, Vec<&Expense>)> = BTreeMap::new();

    for sale in sales {
        let start = granularity.bucket_start(sale.sale_date.date_naive());
        groups.entry(start).or_default().0.push(sale);
    }
    for expense in expenses {
        let start = granularity.bucket_start(expense.expense_date.date_naive());
        groups.entry(start).or_default().1.push(expense);
    }

    groups
        .into_iter()
        .map(|(start, (s, e))| Bucket {
            period: granularity.label(start),
            start,
            summary: summarize_refs(&s, &e, catalog),
        })
        .collect()
}

/// One summary per calendar month, `months` points starting at the month
/// containing `first_month`. Months with no activity are included.
pub fn monthly_series(
    sales: &[Sale],
    expenses: &[Expense],
    catalog: &CatalogIndex,
    first_month: NaiveDate,
    months: u32,
) -> Vec<MonthPoint> {
    let first = month_start(first_month);

    (0..months)
        .filter_map(|offset| shift_month(first, offset as i32))
        .filter_map(|start| {
            let (from, to) = month_window(start)?;
            let in_window = |at: &DateTime<Utc>| *at >= from && *at < to;

            let s: Vec<&Sale> = sales.iter().filter(|s| in_window(&s.sale_date)).collect();
            let e: Vec<&Expense> = expenses
                .iter()
                .filter(|e| in_window(&e.expense_date))
                .collect();

            Some(MonthPoint {
                month: Granularity::Month.label(start),
                start,
                summary: summarize_refs(&s, &e, catalog),
            })
        })
        .collect()
}

// =============================================================================
// Calendar Helpers
// =============================================================================

/// First day of the month containing `date`.
pub fn month_start(date: NaiveDate) -> NaiveDate {
    Granularity::Month.bucket_start(date)
}

/// First day of the month `delta` months away from the month of `date`.
///
/// ```rust
/// use chrono::NaiveDate;
/// use stockbook_core::report::shift_month;
///
/// let jan = NaiveDate::from_ymd_opt(2024, 1, 31).unwrap();
/// assert_eq!(shift_month(jan, 1), NaiveDate::from_ymd_opt(2024, 2, 1));
/// assert_eq!(shift_month(jan, -1), NaiveDate::from_ymd_opt(2023, 12, 1));
/// ```
pub fn shift_month(date: NaiveDate, delta: i32) -> Option<NaiveDate> {
    let index = date.year() * 12 + date.month0() as i32 + delta;
    let year = index.div_euclid(12);
    let month = index.rem_euclid(12) as u32 + 1;
    NaiveDate::from_ymd_opt(year, month, 1)
}

/// Half-open UTC window `[start of month, start of next month)`.
pub fn month_window(date: NaiveDate) -> Option<(DateTime<Utc>, DateTime<Utc>)> {
    let start = month_start(date);
    let next = shift_month(start, 1)?;
    Some((
        start.and_time(NaiveTime::MIN).and_utc(),
        next.and_time(NaiveTime::MIN).and_utc(),
    ))
}

// =============================================================================
// Unit Tests
// =============================================================================
