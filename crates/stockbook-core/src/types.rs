//! # Domain Types
//!
//! Catalog and scoping types used throughout Stockbook. The sale record
//! itself lives in [`crate::sale`].
//!
//! ## Type Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                    │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │     Scope       │   │    Product      │   │    Service      │       │
//! │  │  ─────────────  │   │  ─────────────  │   │  ─────────────  │       │
//! │  │  user_id        │   │  id (UUID)      │   │  id (UUID)      │       │
//! │  │  business_id    │   │  cost_price     │   │  price          │       │
//! │  │  ("default")    │   │  sale_price     │   │  (no stock,     │       │
//! │  └─────────────────┘   │  current_stock  │   │   zero cost)    │       │
//! │                        └─────────────────┘   └─────────────────┘       │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐                             │
//! │  │  CatalogItem    │   │    Expense      │                             │
//! │  │  Product |      │   │  business cost  │                             │
//! │  │  Service        │   │  (not per sale) │                             │
//! │  └─────────────────┘   └─────────────────┘                             │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::money::Money;
use crate::DEFAULT_BUSINESS_ID;

// =============================================================================
// Scope
// =============================================================================

/// The tenant-like partition every catalog and sale query runs under.
///
/// Passed explicitly through every engine and reporting call; there is no
/// ambient "current business".
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Scope {
    pub user_id: String,
    pub business_id: String,
}

impl Scope {
    /// Creates a scope, falling back to the default business when none given.
    pub fn new(user_id: impl Into<String>, business_id: Option<&str>) -> Self {
        let business_id = business_id
            .map(str::trim)
            .filter(|b| !b.is_empty())
            .unwrap_or(DEFAULT_BUSINESS_ID);

        Scope {
            user_id: user_id.into(),
            business_id: business_id.to_string(),
        }
    }

    /// Whether this scope also covers records stored without a business id.
    #[inline]
    pub fn is_default_business(&self) -> bool {
        self.business_id == DEFAULT_BUSINESS_ID
    }
}

// =============================================================================
// Item Kind
// =============================================================================

/// What a sale line refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ItemKind {
    #[serde(alias = "product")]
    Product,
    #[serde(alias = "service")]
    Service,
}

impl ItemKind {
    pub const fn as_str(&self) -> &'static str {
        match self {
            ItemKind::Product => "Product",
            ItemKind::Service => "Service",
        }
    }
}

impl Default for ItemKind {
    fn default() -> Self {
        ItemKind::Product
    }
}

impl fmt::Display for ItemKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// Item Snapshot
// =============================================================================

/// Catalog attributes frozen onto a sale line at sale time.
///
/// Later catalog edits never change what a historical line displays.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemSnapshot {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sku: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub product_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub custom_fields: BTreeMap<String, String>,
}

// =============================================================================
// Product
// =============================================================================

/// A stocked product available for sale.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    /// Unique identifier (UUID v4).
    pub id: String,

    /// Owning user.
    pub user_id: String,

    /// Owning business; `None` on records that predate businesses.
    pub business_id: Option<String>,

    pub name: String,
    pub category: Option<String>,
    pub sku: Option<String>,
    pub product_type: Option<String>,
    pub size: Option<String>,
    pub color: Option<String>,

    /// Unit cost, the basis for COGS.
    pub cost_price: Money,

    /// Default unit sale price (a sale may override it).
    pub sale_price: Money,

    /// Current stock level. Historical data may contain negative values.
    pub current_stock: i64,

    pub custom_fields: BTreeMap<String, String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Product {
    /// Checks whether `quantity` units are available right now.
    ///
    /// Advisory only: the stock ledger's conditional decrement is what
    /// actually guarantees stock never goes negative.
    #[inline]
    pub fn can_sell(&self, quantity: i64) -> bool {
        self.current_stock >= quantity
    }

    /// Freezes the display attributes for a sale line.
    pub fn snapshot(&self) -> ItemSnapshot {
        ItemSnapshot {
            category: self.category.clone(),
            sku: self.sku.clone(),
            product_type: self.product_type.clone(),
            size: self.size.clone(),
            color: self.color.clone(),
            custom_fields: self.custom_fields.clone(),
        }
    }
}

// =============================================================================
// Service
// =============================================================================

/// A sellable service. Services have no stock and no cost.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Service {
    pub id: String,
    pub user_id: String,
    pub business_id: Option<String>,
    pub name: String,
    pub price: Money,
    pub category: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Service {
    pub fn snapshot(&self) -> ItemSnapshot {
        ItemSnapshot {
            category: self.category.clone(),
            product_type: Some(ItemKind::Service.as_str().to_string()),
            ..ItemSnapshot::default()
        }
    }
}

// =============================================================================
// Catalog Item
// =============================================================================

/// A resolved sale-line target.
#[derive(Debug, Clone, PartialEq)]
pub enum CatalogItem {
    Product(Product),
    Service(Service),
}

impl CatalogItem {
    pub fn id(&self) -> &str {
        match self {
            CatalogItem::Product(p) => &p.id,
            CatalogItem::Service(s) => &s.id,
        }
    }

    pub fn name(&self) -> &str {
        match self {
            CatalogItem::Product(p) => &p.name,
            CatalogItem::Service(s) => &s.name,
        }
    }

    pub fn kind(&self) -> ItemKind {
        match self {
            CatalogItem::Product(_) => ItemKind::Product,
            CatalogItem::Service(_) => ItemKind::Service,
        }
    }

    pub fn category(&self) -> Option<&str> {
        match self {
            CatalogItem::Product(p) => p.category.as_deref(),
            CatalogItem::Service(s) => s.category.as_deref(),
        }
    }

    /// Unit cost used for COGS. Services always cost zero.
    /// Catalog sale price, used when a sale line gives none.
    pub fn list_price(&self) -> Money {
        match self {
            CatalogItem::Product(p) => p.sale_price,
            CatalogItem::Service(s) => s.price,
        }
    }

    pub fn unit_cost(&self) -> Money {
        match self {
            CatalogItem::Product(p) => p.cost_price,
            CatalogItem::Service(_) => Money::zero(),
        }
    }

    pub fn snapshot(&self) -> ItemSnapshot {
        match self {
            CatalogItem::Product(p) => p.snapshot(),
            CatalogItem::Service(s) => s.snapshot(),
        }
    }
}

// =============================================================================
// Expense
// =============================================================================

/// A business expense that is not attributable to any single sale
/// (rent, utilities, ...). Reduces net profit in reports.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Expense {
    pub id: String,
    pub user_id: String,
    pub business_id: Option<String>,
    pub category: String,
    pub amount: Money,
    pub description: Option<String>,
    pub expense_date: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

// =============================================================================
// Unit Tests
// =============================================================================
