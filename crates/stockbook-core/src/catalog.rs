//! # Catalog Lookups
//!
//! Category resolution and read-time enrichment of sale lines.
//!
//! ```text
//! attributes(line)
//!   1. line.snapshot                 (fast path, frozen at sale time)
//!   2. live catalog entry by item id (historical lines without snapshot)
//!   3. none                          (item since deleted)
//! ```
//!
//! Enrichment builds a new view; the stored sale is never touched.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::finance;
use crate::money::Money;
use crate::sale::{Sale, SaleBody, SaleExpenseDetail};
use crate::types::{ItemKind, ItemSnapshot, Product, Service};
use crate::UNCATEGORIZED;

// =============================================================================
// Catalog Index
// =============================================================================

/// What the live catalog currently says about one item.
#[derive(Debug, Clone, PartialEq)]
pub struct CatalogEntry {
    pub name: String,
    pub kind: ItemKind,
    pub category: Option<String>,
    pub attributes: ItemSnapshot,
}

/// In-memory id → entry map for one scope, built once per request.
#[derive(Debug, Clone, Default)]
pub struct CatalogIndex {
    entries: HashMap<String, CatalogEntry>,
}

impl CatalogIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds the index from the scope's products and services.
    pub fn from_catalog(products: &[Product], services: &[Service]) -> Self {
        let mut index = CatalogIndex::new();
        for p in products {
            index.insert(
                p.id.clone(),
                CatalogEntry {
                    name: p.name.clone(),
                    kind: ItemKind::Product,
                    category: p.category.clone(),
                    attributes: p.snapshot(),
                },
            );
        }
        for s in services {
            index.insert(
                s.id.clone(),
                CatalogEntry {
                    name: s.name.clone(),
                    kind: ItemKind::Service,
                    category: s.category.clone(),
                    attributes: s.snapshot(),
                },
            );
        }
        index
    }

    pub fn insert(&mut self, id: String, entry: CatalogEntry) {
        self.entries.insert(id, entry);
    }

    pub fn get(&self, id: &str) -> Option<&CatalogEntry> {
        self.entries.get(id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

// =============================================================================
// Category Resolution
// =============================================================================

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

/// Resolves the reporting category of an item.
///
/// Snapshot category, then live catalog category, then
/// [`UNCATEGORIZED`].
pub fn resolve_category(
    snapshot: Option<&ItemSnapshot>,
    item_id: &str,
    catalog: &CatalogIndex,
) -> String {
    non_blank(snapshot.and_then(|s| s.category.as_deref()))
        .or_else(|| non_blank(catalog.get(item_id).and_then(|e| e.category.as_deref())))
        .unwrap_or(UNCATEGORIZED)
        .to_string()
}

// =============================================================================
// Enrichment
// =============================================================================

/// Where an enriched line's attributes came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AttributeSource {
    Snapshot,
    Live,
    Missing,
}

/// A sale line as presented to readers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnrichedLine {
    pub item_id: String,
    pub item_kind: ItemKind,
    pub name: String,
    pub quantity: i64,
    pub unit_sale_price: Money,
    pub unit_cost_price: Money,
    pub line_total: Money,
    pub line_profit: Money,
    pub category: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub attributes: Option<ItemSnapshot>,
    pub attributes_source: AttributeSource,
}

/// A sale as presented to readers: both generations flattened into lines,
/// with aggregator figures filled in.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnrichedSale {
    pub id: String,
    pub business_id: Option<String>,
    pub customer_name: Option<String>,
    pub sale_date: DateTime<Utc>,
    pub notes: Option<String>,
    /// `"legacy"` or `"lines"`.
    pub schema: String,
    pub display_name: String,
    pub items: Vec<EnrichedLine>,
    pub quantity: i64,
    pub total_sales: Money,
    pub total_cogs: Money,
    pub total_profit: Money,
    pub sale_expenses: Money,
    pub sale_expense_details: Vec<SaleExpenseDetail>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

fn attributes_for(
    snapshot: Option<&ItemSnapshot>,
    item_id: &str,
    catalog: &CatalogIndex,
) -> (Option<ItemSnapshot>, AttributeSource) {
    if let Some(snap) = snapshot {
        return (Some(snap.clone()), AttributeSource::Snapshot);
    }
    match catalog.get(item_id) {
        Some(entry) => (Some(entry.attributes.clone()), AttributeSource::Live),
        None => (None, AttributeSource::Missing),
    }
}

/// Builds the reader view of a sale.
pub fn enrich(sale: &Sale, catalog: &CatalogIndex) -> EnrichedSale {
    let (schema, items) = match &sale.body {
        SaleBody::Legacy(line) => {
            let (attributes, source) = attributes_for(None, &line.product_id, catalog);
            let line_total = line.unit_sale_price.multiply_quantity(line.quantity);
            let item = EnrichedLine {
                item_id: line.product_id.clone(),
                item_kind: ItemKind::Product,
                name: line.product_name.clone(),
                quantity: line.quantity,
                unit_sale_price: line.unit_sale_price,
                unit_cost_price: line.unit_cost_price,
                line_total,
                line_profit: line_total - line.unit_cost_price.multiply_quantity(line.quantity),
                category: resolve_category(None, &line.product_id, catalog),
                attributes,
                attributes_source: source,
            };
            ("legacy", vec![item])
        }
        SaleBody::Lines(lines) => {
            let items = lines
                .iter()
                .map(|l| {
                    let (attributes, source) =
                        attributes_for(l.snapshot.as_ref(), &l.item_id, catalog);
                    EnrichedLine {
                        item_id: l.item_id.clone(),
                        item_kind: l.item_kind,
                        name: l.name.clone(),
                        quantity: l.quantity,
                        unit_sale_price: l.unit_sale_price,
                        unit_cost_price: l.unit_cost_price,
                        line_total: l.line_total,
                        line_profit: l.line_profit,
                        category: resolve_category(l.snapshot.as_ref(), &l.item_id, catalog),
                        attributes,
                        attributes_source: source,
                    }
                })
                .collect();
            ("lines", items)
        }
    };

    EnrichedSale {
        id: sale.id.clone(),
        business_id: sale.business_id.clone(),
        customer_name: sale.customer_name.clone(),
        sale_date: sale.sale_date,
        notes: sale.notes.clone(),
        schema: schema.to_string(),
        display_name: finance::display_name(sale),
        items,
        quantity: finance::quantity(sale),
        total_sales: finance::revenue(sale),
        total_cogs: finance::cogs(sale),
        total_profit: finance::profit(sale),
        sale_expenses: sale.sale_expenses,
        sale_expense_details: sale.sale_expense_details.clone(),
        created_at: sale.created_at,
        updated_at: sale.updated_at,
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
