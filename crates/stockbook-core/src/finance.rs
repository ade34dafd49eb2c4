//! # Financial Aggregator
//!
//! Revenue, COGS, profit and quantity for a sale or a collection of sales,
//! identical for both schema generations.
//!
//! ## Resolution Order
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  revenue(sale)                                                          │
//! │    1. persisted totals.total_sales                                      │
//! │    2. Σ line_total                  (Lines)                             │
//! │    3. quantity × unit_sale_price    (Legacy)                            │
//! │                                                                         │
//! │  cogs(sale)                                                             │
//! │    1. persisted totals.total_cogs                                       │
//! │    2. Σ quantity × unit_cost_price  (Lines)                             │
//! │    3. quantity × unit_cost_price    (Legacy)                            │
//! │                                                                         │
//! │  profit(sale)  → persisted total_profit, never recomputed               │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The write-side helpers ([`price_line`], [`compute_totals`]) live here as
//! well so the numbers a sale is stored with and the numbers reports read
//! back come from one place.

use crate::error::ValidationError;
use crate::money::Money;
use crate::sale::{Sale, SaleBody, SaleLine};
use crate::types::CatalogItem;

// =============================================================================
// Per-Sale Reads
// =============================================================================

/// Total units sold.
pub fn quantity(sale: &Sale) -> i64 {
    match &sale.body {
        SaleBody::Legacy(line) => line.quantity,
        SaleBody::Lines(lines) => lines.iter().map(|l| l.quantity).sum(),
    }
}

/// Revenue of one sale.
pub fn revenue(sale: &Sale) -> Money {
    if let Some(totals) = sale.totals {
        return totals.total_sales;
    }

    match &sale.body {
        SaleBody::Legacy(line) => line.unit_sale_price.multiply_quantity(line.quantity),
        SaleBody::Lines(lines) => lines.iter().map(|l| l.line_total).sum(),
    }
}

/// Cost of goods sold for one sale.
pub fn cogs(sale: &Sale) -> Money {
    if let Some(totals) = sale.totals {
        return totals.total_cogs;
    }

    match &sale.body {
        SaleBody::Legacy(line) => line.unit_cost_price.multiply_quantity(line.quantity),
        SaleBody::Lines(lines) => lines.iter().map(SaleLine::cogs).sum(),
    }
}

/// The persisted profit (after sale-attributable expenses).
#[inline]
pub fn profit(sale: &Sale) -> Money {
    sale.total_profit
}

/// Revenue minus COGS, before sale expenses.
#[inline]
pub fn gross_profit(sale: &Sale) -> Money {
    revenue(sale) - cogs(sale)
}

/// Short label for lists and receipts.
///
/// ```text
/// Legacy           → product name
/// Lines (1 line)   → that line's name
/// Lines (N > 1)    → "Multi-product sale (N items)"
/// ```
pub fn display_name(sale: &Sale) -> String {
    match &sale.body {
        SaleBody::Legacy(line) => line.product_name.clone(),
        SaleBody::Lines(lines) => match lines.as_slice() {
            [only] => only.name.clone(),
            _ => format!("Multi-product sale ({} items)", lines.len()),
        },
    }
}

// =============================================================================
// Collection Reads
// =============================================================================

pub fn total_revenue(sales: &[Sale]) -> Money {
    sales.iter().map(revenue).sum()
}

pub fn total_cogs(sales: &[Sale]) -> Money {
    sales.iter().map(cogs).sum()
}

pub fn total_profit(sales: &[Sale]) -> Money {
    sales.iter().map(profit).sum()
}

pub fn total_sale_expenses(sales: &[Sale]) -> Money {
    sales.iter().map(|s| s.sale_expenses).sum()
}

pub fn total_quantity(sales: &[Sale]) -> i64 {
    sales.iter().map(quantity).sum()
}

// =============================================================================
// Write-Side Computation
// =============================================================================

/// Totals computed for a line set at write time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ComputedTotals {
    pub total_sales: Money,
    pub total_cogs: Money,
    /// total_sales − total_cogs
    pub gross_profit: Money,
    /// gross_profit − sale_expenses (the persisted value)
    pub total_profit: Money,
}

/// Prices one line against its resolved catalog item.
///
/// The name and attributes are snapshotted; the unit cost is the product's
/// cost price, or zero for a service. Fails with
/// [`ValidationError::Overflow`] when an amount leaves the i64 range.
pub fn price_line(
    item: &CatalogItem,
    quantity: i64,
    unit_sale_price: Money,
) -> Result<SaleLine, ValidationError> {
    let unit_cost_price = item.unit_cost();
    let line_total = unit_sale_price
        .checked_multiply_quantity(quantity)
        .ok_or_else(|| overflow("lineTotal"))?;
    let line_profit = unit_cost_price
        .checked_multiply_quantity(quantity)
        .and_then(|cost| line_total.checked_sub(cost))
        .ok_or_else(|| overflow("lineProfit"))?;

    Ok(SaleLine {
        item_id: item.id().to_string(),
        item_kind: item.kind(),
        name: item.name().to_string(),
        quantity,
        unit_sale_price,
        unit_cost_price,
        line_total,
        line_profit,
        snapshot: Some(item.snapshot()),
    })
}

/// Sums priced lines and subtracts the sale expenses.
pub fn compute_totals(
    lines: &[SaleLine],
    sale_expenses: Money,
) -> Result<ComputedTotals, ValidationError> {
    let total_sales = Money::checked_sum(lines.iter().map(|l| l.line_total))
        .ok_or_else(|| overflow("totalSales"))?;
    let total_cogs = lines
        .iter()
        .map(|l| l.unit_cost_price.checked_multiply_quantity(l.quantity))
        .try_fold(Money::zero(), |total, cogs| total.checked_add(cogs?))
        .ok_or_else(|| overflow("totalCogs"))?;
    let gross_profit = total_sales
        .checked_sub(total_cogs)
        .ok_or_else(|| overflow("grossProfit"))?;
    let total_profit = gross_profit
        .checked_sub(sale_expenses)
        .ok_or_else(|| overflow("totalProfit"))?;

    Ok(ComputedTotals {
        total_sales,
        total_cogs,
        gross_profit,
        total_profit,
    })
}

fn overflow(field: &str) -> ValidationError {
    ValidationError::Overflow {
        field: field.to_string(),
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sale::{LegacyLine, SaleTotals};
    use crate::types::{ItemKind, Product, Service};
    use chrono::Utc;
    use std::collections::BTreeMap;

    fn product(cost: i64, price: i64) -> CatalogItem {
        let now = Utc::now();
        CatalogItem::Product(Product {
            id: "p-1".to_string(),
            user_id: "u".to_string(),
            business_id: None,
            name: "Widget".to_string(),
            category: Some("Tools".to_string()),
            sku: None,
            product_type: None,
            size: None,
            color: None,
            cost_price: Money::from_cents(cost),
            sale_price: Money::from_cents(price),
            current_stock: 10,
            custom_fields: BTreeMap::new(),
            created_at: now,
            updated_at: now,
        })
    }

    fn service(price: i64) -> CatalogItem {
        let now = Utc::now();
        CatalogItem::Service(Service {
            id: "s-1".to_string(),
            user_id: "u".to_string(),
            business_id: None,
            name: "Setup".to_string(),
            price: Money::from_cents(price),
            category: None,
            created_at: now,
            updated_at: now,
        })
    }

    fn sale(body: SaleBody, totals: Option<SaleTotals>, profit: i64) -> Sale {
        let now = Utc::now();
        Sale {
            id: "sale-1".to_string(),
            user_id: "u".to_string(),
            business_id: None,
            customer_name: None,
            sale_date: now,
            notes: None,
            body,
            totals,
            total_profit: Money::from_cents(profit),
            sale_expenses: Money::zero(),
            sale_expense_details: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_multi_line_aggregation() {
        let lines = vec![
            price_line(&product(4, 10), 2, Money::from_cents(10)).unwrap(),
            price_line(&product(2, 5), 1, Money::from_cents(5)).unwrap(),
        ];
        let totals = compute_totals(&lines, Money::zero()).unwrap();

        assert_eq!(totals.total_sales, Money::from_cents(25));
        assert_eq!(totals.total_cogs, Money::from_cents(10));
        assert_eq!(totals.gross_profit, Money::from_cents(15));
        assert_eq!(totals.total_profit, Money::from_cents(15));
    }

    #[test]
    fn test_sale_expenses_reduce_profit_only() {
        let lines = vec![price_line(&product(400, 1000), 3, Money::from_cents(1000)).unwrap()];
        let totals = compute_totals(&lines, Money::from_cents(250)).unwrap();

        assert_eq!(totals.total_sales, Money::from_cents(3000));
        assert_eq!(totals.total_cogs, Money::from_cents(1200));
        assert_eq!(totals.total_profit, Money::from_cents(1550));
        assert_eq!(
            totals.total_profit,
            totals.total_sales - totals.total_cogs - Money::from_cents(250)
        );
    }

    #[test]
    fn test_service_line_has_zero_cost() {
        let line = price_line(&service(9999), 3, Money::from_cents(1500)).unwrap();

        assert_eq!(line.item_kind, ItemKind::Service);
        assert!(line.unit_cost_price.is_zero());
        assert_eq!(line.line_total, Money::from_cents(4500));
        assert_eq!(line.line_profit, line.line_total);
    }

    #[test]
    fn test_line_overflow_is_a_validation_error() {
        let err = price_line(&product(400, 1000), 3, Money::from_cents(i64::MAX / 2)).unwrap_err();
        assert!(matches!(err, ValidationError::Overflow { ref field } if field == "lineTotal"));

        // A catalog cost large enough to overflow COGS on its own.
        let err = price_line(&product(i64::MAX / 2, 1000), 3, Money::from_cents(1000)).unwrap_err();
        assert!(matches!(err, ValidationError::Overflow { .. }));
    }

    #[test]
    fn test_totals_overflow_is_a_validation_error() {
        let big = price_line(&service(0), 1, Money::from_cents(i64::MAX / 2 + 1)).unwrap();
        let err = compute_totals(&[big.clone(), big.clone()], Money::zero()).unwrap_err();
        assert!(matches!(err, ValidationError::Overflow { ref field } if field == "totalSales"));

        let discount = price_line(&service(0), 1, Money::from_cents(i64::MIN + 1)).unwrap();
        let err = compute_totals(&[discount], Money::from_cents(10)).unwrap_err();
        assert!(matches!(err, ValidationError::Overflow { ref field } if field == "totalProfit"));
    }

    #[test]
    fn test_shape_equivalence() {
        let legacy = LegacyLine {
            product_id: "p-1".to_string(),
            product_name: "Widget".to_string(),
            quantity: 3,
            unit_sale_price: Money::from_cents(1000),
            unit_cost_price: Money::from_cents(400),
        };
        let modern = price_line(&product(400, 1000), 3, Money::from_cents(1000)).unwrap();
        let totals = compute_totals(std::slice::from_ref(&modern), Money::zero()).unwrap();
        let stored_totals = Some(SaleTotals {
            total_sales: totals.total_sales,
            total_cogs: totals.total_cogs,
        });

        // With and without persisted totals, both generations agree.
        for t in [None, stored_totals] {
            let gen1 = sale(SaleBody::Legacy(legacy.clone()), t, 1800);
            let gen2 = sale(SaleBody::Lines(vec![modern.clone()]), t, 1800);

            assert_eq!(revenue(&gen1), revenue(&gen2));
            assert_eq!(cogs(&gen1), cogs(&gen2));
            assert_eq!(profit(&gen1), profit(&gen2));
            assert_eq!(quantity(&gen1), quantity(&gen2));
            assert_eq!(revenue(&gen1), Money::from_cents(3000));
            assert_eq!(cogs(&gen1), Money::from_cents(1200));
        }
    }

    #[test]
    fn test_persisted_totals_win() {
        let line = price_line(&product(400, 1000), 1, Money::from_cents(1000)).unwrap();
        let s = sale(
            SaleBody::Lines(vec![line]),
            Some(SaleTotals {
                total_sales: Money::from_cents(1234),
                total_cogs: Money::from_cents(100),
            }),
            1134,
        );
        assert_eq!(revenue(&s), Money::from_cents(1234));
        assert_eq!(cogs(&s), Money::from_cents(100));
        assert_eq!(gross_profit(&s), Money::from_cents(1134));
    }

    #[test]
    fn test_display_name() {
        let one = price_line(&product(1, 2), 1, Money::from_cents(2)).unwrap();
        let other = price_line(&service(5), 1, Money::from_cents(5)).unwrap();

        let single = sale(SaleBody::Lines(vec![one.clone()]), None, 1);
        assert_eq!(display_name(&single), "Widget");

        let multi = sale(SaleBody::Lines(vec![one, other]), None, 6);
        assert_eq!(display_name(&multi), "Multi-product sale (2 items)");

        let legacy = sale(
            SaleBody::Legacy(LegacyLine {
                product_id: "p".to_string(),
                product_name: "Vintage Lamp".to_string(),
                quantity: 1,
                unit_sale_price: Money::from_cents(100),
                unit_cost_price: Money::zero(),
            }),
            None,
            100,
        );
        assert_eq!(display_name(&legacy), "Vintage Lamp");
    }

    #[test]
    fn test_collection_totals() {
        let a = sale(
            SaleBody::Lines(vec![price_line(&product(4, 10), 2, Money::from_cents(10)).unwrap()]),
            None,
            12,
        );
        let b = sale(
            SaleBody::Lines(vec![price_line(&service(5), 1, Money::from_cents(5)).unwrap()]),
            None,
            5,
        );
        let sales = vec![a, b];

        assert_eq!(total_revenue(&sales), Money::from_cents(25));
        assert_eq!(total_cogs(&sales), Money::from_cents(8));
        assert_eq!(total_profit(&sales), Money::from_cents(17));
        assert_eq!(total_quantity(&sales), 3);
        assert!(total_sale_expenses(&sales).is_zero());
    }
}
