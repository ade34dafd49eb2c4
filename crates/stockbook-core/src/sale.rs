//! # Sale Record Model
//!
//! A sale exists in one of two schema generations, and both appear in
//! historical data:
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                          SaleBody                                       │
//! │                                                                         │
//! │  Legacy (generation 1)              Lines (generation 2)               │
//! │  ─────────────────────              ───────────────────                │
//! │  product_id                         [ SaleLine {                       │
//! │  product_name                           item_id, item_kind,            │
//! │  quantity                               name (snapshot),               │
//! │  unit_sale_price                        quantity, unit prices,         │
//! │  unit_cost_price                        line_total, line_profit,       │
//! │                                         snapshot? }, ... ]             │
//! │                                                                         │
//! │  read-only / historical             every new write                    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Code that needs to look inside a sale matches on [`SaleBody`] (see
//! [`crate::finance`]); nothing probes for optional fields.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::money::Money;
use crate::types::{ItemKind, ItemSnapshot};

// =============================================================================
// Lines
// =============================================================================

/// The single scalar line of a generation-1 sale. Always a product.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LegacyLine {
    pub product_id: String,
    pub product_name: String,
    pub quantity: i64,
    pub unit_sale_price: Money,
    pub unit_cost_price: Money,
}

/// One line of a generation-2 sale.
///
/// Embedded in the sale record; never stored on its own.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SaleLine {
    pub item_id: String,
    pub item_kind: ItemKind,
    /// Name at sale time (frozen).
    pub name: String,
    pub quantity: i64,
    pub unit_sale_price: Money,
    /// Zero for services.
    pub unit_cost_price: Money,
    /// quantity × unit_sale_price
    pub line_total: Money,
    /// line_total − quantity × unit_cost_price
    pub line_profit: Money,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub snapshot: Option<ItemSnapshot>,
}

impl SaleLine {
    /// Cost of goods for this line.
    #[inline]
    pub fn cogs(&self) -> Money {
        self.unit_cost_price.multiply_quantity(self.quantity)
    }
}

// =============================================================================
// Sale Body
// =============================================================================

/// The two coexisting sale shapes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "schema", content = "data", rename_all = "camelCase")]
pub enum SaleBody {
    Legacy(LegacyLine),
    Lines(Vec<SaleLine>),
}

impl SaleBody {
    /// Number of lines (a legacy sale counts as one).
    pub fn line_count(&self) -> usize {
        match self {
            SaleBody::Legacy(_) => 1,
            SaleBody::Lines(lines) => lines.len(),
        }
    }

    /// Whether any line references `item_id`.
    pub fn references(&self, item_id: &str) -> bool {
        match self {
            SaleBody::Legacy(line) => line.product_id == item_id,
            SaleBody::Lines(lines) => lines.iter().any(|l| l.item_id == item_id),
        }
    }

    /// Stock held by this body, one entry per product line in line order.
    ///
    /// Service lines hold no stock and are skipped.
    pub fn product_reservations(&self) -> Vec<StockReservation> {
        match self {
            SaleBody::Legacy(line) => vec![StockReservation {
                product_id: line.product_id.clone(),
                name: line.product_name.clone(),
                quantity: line.quantity,
            }],
            SaleBody::Lines(lines) => lines
                .iter()
                .filter(|l| l.item_kind == ItemKind::Product)
                .map(|l| StockReservation {
                    product_id: l.item_id.clone(),
                    name: l.name.clone(),
                    quantity: l.quantity,
                })
                .collect(),
        }
    }
}

/// Units of one product held by a sale.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StockReservation {
    pub product_id: String,
    pub name: String,
    pub quantity: i64,
}

// =============================================================================
// Sale
// =============================================================================

/// Revenue and COGS precomputed at write time.
///
/// Some historical records lack them; readers then derive the values from
/// the lines (see [`crate::finance`]).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SaleTotals {
    pub total_sales: Money,
    pub total_cogs: Money,
}

/// An itemized sale-attributable cost (shipping, payment fee, ...).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SaleExpenseDetail {
    pub category: String,
    pub amount: Money,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// A recorded sale.
///
/// ## Invariant
/// For every record written by the sale engine:
/// `total_profit == total_sales - total_cogs - sale_expenses`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Sale {
    pub id: String,
    pub user_id: String,
    pub business_id: Option<String>,
    pub customer_name: Option<String>,
    pub sale_date: DateTime<Utc>,
    pub notes: Option<String>,
    pub body: SaleBody,
    pub totals: Option<SaleTotals>,
    /// Persisted profit; the source of truth for profit queries.
    pub total_profit: Money,
    /// Scalar total of sale-attributable expenses.
    pub sale_expenses: Money,
    pub sale_expense_details: Vec<SaleExpenseDetail>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Sale {
    #[inline]
    pub fn is_legacy(&self) -> bool {
        matches!(self.body, SaleBody::Legacy(_))
    }
}

// =============================================================================
// Engine Inputs
// =============================================================================

/// Requested line of a new or edited sale.
#[derive(Debug, Clone, PartialEq)]
pub struct LineInput {
    pub item_id: String,
    pub item_kind: ItemKind,
    pub quantity: i64,
    /// Defaults to the catalog price when absent.
    pub unit_sale_price: Option<Money>,
}

/// The item part of a create/update request.
#[derive(Debug, Clone, PartialEq)]
pub enum SaleItems {
    /// Older clients send a single product with scalar fields.
    Legacy {
        item_id: String,
        quantity: i64,
        unit_sale_price: Option<Money>,
    },
    Lines(Vec<LineInput>),
}

impl SaleItems {
    /// Normalizes both request shapes into line inputs.
    pub fn to_lines(&self) -> Vec<LineInput> {
        match self {
            SaleItems::Legacy {
                item_id,
                quantity,
                unit_sale_price,
            } => vec![LineInput {
                item_id: item_id.clone(),
                item_kind: ItemKind::Product,
                quantity: *quantity,
                unit_sale_price: *unit_sale_price,
            }],
            SaleItems::Lines(lines) => lines.clone(),
        }
    }
}

/// Everything needed to create or replace a sale.
#[derive(Debug, Clone, PartialEq)]
pub struct SaleInput {
    pub items: SaleItems,
    pub customer_name: Option<String>,
    /// Defaults to "now" on create and to the stored date on update.
    pub sale_date: Option<DateTime<Utc>>,
    pub notes: Option<String>,
    pub sale_expenses: Option<Money>,
    pub sale_expense_details: Vec<SaleExpenseDetail>,
}

impl SaleInput {
    /// A line-item input with no metadata.
    pub fn from_lines(lines: Vec<LineInput>) -> Self {
        SaleInput {
            items: SaleItems::Lines(lines),
            customer_name: None,
            sale_date: None,
            notes: None,
            sale_expenses: None,
            sale_expense_details: Vec::new(),
        }
    }

    /// The scalar expense total: explicit value, else the sum of details.
    pub fn resolved_sale_expenses(&self) -> Money {
        self.sale_expenses
            .unwrap_or_else(|| self.sale_expense_details.iter().map(|d| d.amount).sum())
    }
}

/// What the engine reports back after a write.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SaleSummary {
    pub sale_id: String,
    pub total_sales: Money,
    pub total_cogs: Money,
    pub total_profit: Money,
    pub item_count: usize,
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn line(item_id: &str, kind: ItemKind, qty: i64) -> SaleLine {
        SaleLine {
            item_id: item_id.to_string(),
            item_kind: kind,
            name: item_id.to_uppercase(),
            quantity: qty,
            unit_sale_price: Money::from_cents(100),
            unit_cost_price: Money::zero(),
            line_total: Money::from_cents(100 * qty),
            line_profit: Money::from_cents(100 * qty),
            snapshot: None,
        }
    }

    #[test]
    fn test_reservations_skip_services() {
        let body = SaleBody::Lines(vec![
            line("p1", ItemKind::Product, 2),
            line("s1", ItemKind::Service, 1),
            line("p2", ItemKind::Product, 4),
        ]);
        let reservations = body.product_reservations();
        assert_eq!(reservations.len(), 2);
        assert_eq!(reservations[0].product_id, "p1");
        assert_eq!(reservations[1].quantity, 4);
    }

    #[test]
    fn test_legacy_reservation() {
        let body = SaleBody::Legacy(LegacyLine {
            product_id: "p9".to_string(),
            product_name: "Old Thing".to_string(),
            quantity: 3,
            unit_sale_price: Money::from_cents(500),
            unit_cost_price: Money::from_cents(200),
        });
        assert_eq!(body.line_count(), 1);
        assert!(body.references("p9"));
        assert_eq!(body.product_reservations()[0].quantity, 3);
    }

    #[test]
    fn test_legacy_items_normalize_to_product_line() {
        let items = SaleItems::Legacy {
            item_id: "p1".to_string(),
            quantity: 2,
            unit_sale_price: Some(Money::from_cents(999)),
        };
        let lines = items.to_lines();
        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0].item_kind, ItemKind::Product);
        assert_eq!(lines[0].unit_sale_price, Some(Money::from_cents(999)));
    }

    #[test]
    fn test_resolved_sale_expenses_prefers_scalar() {
        let mut input = SaleInput::from_lines(Vec::new());
        input.sale_expense_details = vec![
            SaleExpenseDetail {
                category: "shipping".to_string(),
                amount: Money::from_cents(300),
                description: None,
            },
            SaleExpenseDetail {
                category: "fees".to_string(),
                amount: Money::from_cents(45),
                description: Some("card fee".to_string()),
            },
        ];
        assert_eq!(input.resolved_sale_expenses(), Money::from_cents(345));

        input.sale_expenses = Some(Money::from_cents(345));
        assert_eq!(input.resolved_sale_expenses(), Money::from_cents(345));
    }

    #[test]
    fn test_body_json_is_tagged() {
        let body = SaleBody::Lines(vec![line("p1", ItemKind::Product, 1)]);
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["schema"], "lines");
        assert_eq!(json["data"][0]["itemId"], "p1");
    }
}
