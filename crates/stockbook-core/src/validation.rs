//! # Validation Module
//!
//! Input validation for sale writes.
//!
//! ## Validation Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Validation Layers                                  │
//! │                                                                         │
//! │  Layer 1: HTTP handler                                                 │
//! │  └── Deserialization (shape, types, dates)                             │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 2: Sale engine                                                  │
//! │  └── THIS MODULE: business rules, run before any stock is touched      │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 3: Database (SQLite)                                            │
//! │  ├── NOT NULL / CHECK constraints                                      │
//! │  └── Conditional stock decrement                                       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use crate::error::ValidationError;
use crate::money::Money;
use crate::sale::{SaleExpenseDetail, SaleInput};
use crate::types::ItemKind;
use crate::{MAX_EXPENSE_CENTS, MAX_LINE_QUANTITY, MAX_SALE_LINES, MAX_UNIT_PRICE_CENTS};

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

const MAX_CUSTOMER_NAME_LEN: usize = 200;
const MAX_NOTES_LEN: usize = 2000;
const MAX_EXPENSE_CATEGORY_LEN: usize = 100;

// =============================================================================
// Scalar Validators
// =============================================================================

/// Validates a line quantity.
///
/// ## Rules
/// - Must be positive (> 0)
/// - Must not exceed MAX_LINE_QUANTITY
pub fn validate_quantity(qty: i64) -> ValidationResult<()> {
    if qty <= 0 {
        return Err(ValidationError::MustBePositive {
            field: "quantity".to_string(),
        });
    }

    if qty > MAX_LINE_QUANTITY {
        return Err(ValidationError::OutOfRange {
            field: "quantity".to_string(),
            min: 1,
            max: MAX_LINE_QUANTITY,
        });
    }

    Ok(())
}

/// Validates a unit price. Zero is allowed (free items).
///
/// ## Rules
/// - Must not be negative
/// - Must not exceed MAX_UNIT_PRICE_CENTS
///
/// ## Example
/// ```rust
/// use stockbook_core::money::Money;
/// use stockbook_core::validation::validate_price;
///
/// assert!(validate_price("unitSalePrice", Money::from_cents(0)).is_ok());
/// assert!(validate_price("unitSalePrice", Money::from_cents(-1)).is_err());
/// assert!(validate_price("unitSalePrice", Money::from_cents(i64::MAX / 2)).is_err());
/// ```
pub fn validate_price(field: &str, price: Money) -> ValidationResult<()> {
    validate_amount(field, price, MAX_UNIT_PRICE_CENTS)
}

/// Validates a service line price. Negative values (discounts) are
/// allowed within the same magnitude as a product price.
pub fn validate_signed_price(field: &str, price: Money) -> ValidationResult<()> {
    if !(-MAX_UNIT_PRICE_CENTS..=MAX_UNIT_PRICE_CENTS).contains(&price.cents()) {
        return Err(ValidationError::OutOfRange {
            field: field.to_string(),
            min: -MAX_UNIT_PRICE_CENTS,
            max: MAX_UNIT_PRICE_CENTS,
        });
    }

    Ok(())
}

fn validate_amount(field: &str, amount: Money, max: i64) -> ValidationResult<()> {
    if amount.is_negative() {
        return Err(ValidationError::MustNotBeNegative {
            field: field.to_string(),
        });
    }

    if amount.cents() > max {
        return Err(ValidationError::OutOfRange {
            field: field.to_string(),
            min: 0,
            max,
        });
    }

    Ok(())
}

/// Validates an entity id (UUID format).
///
/// ## Example
/// ```rust
/// use stockbook_core::validation::validate_id;
///
/// assert!(validate_id("itemId", "550e8400-e29b-41d4-a716-446655440000").is_ok());
/// assert!(validate_id("itemId", "not-a-uuid").is_err());
/// ```
pub fn validate_id(field: &str, id: &str) -> ValidationResult<()> {
    if id.trim().is_empty() {
        return Err(ValidationError::Required {
            field: field.to_string(),
        });
    }

    uuid::Uuid::parse_str(id).map_err(|_| ValidationError::InvalidFormat {
        field: field.to_string(),
        reason: "must be a valid UUID".to_string(),
    })?;

    Ok(())
}

fn validate_optional_text(field: &str, value: Option<&str>, max: usize) -> ValidationResult<()> {
    match value {
        Some(v) if v.chars().count() > max => Err(ValidationError::TooLong {
            field: field.to_string(),
            max,
        }),
        _ => Ok(()),
    }
}

// =============================================================================
// Sale Validators
// =============================================================================

fn validate_expense_detail(detail: &SaleExpenseDetail) -> ValidationResult<()> {
    let category = detail.category.trim();
    if category.is_empty() {
        return Err(ValidationError::Required {
            field: "saleExpenseDetails.category".to_string(),
        });
    }
    if category.chars().count() > MAX_EXPENSE_CATEGORY_LEN {
        return Err(ValidationError::TooLong {
            field: "saleExpenseDetails.category".to_string(),
            max: MAX_EXPENSE_CATEGORY_LEN,
        });
    }
    validate_amount("saleExpenseDetails.amount", detail.amount, MAX_EXPENSE_CENTS)
}

/// Validates a create/update request before anything is resolved or
/// reserved.
///
/// ## Rules
/// - At least one line, at most MAX_SALE_LINES
/// - Every item id is a UUID, every quantity positive
/// - Product lines may not carry a negative unit price
/// - Unit prices and sale expenses stay below their caps
/// - Sale expenses (scalar and itemized) are non-negative; when both are
///   given the itemized amounts must add up to the scalar
pub fn validate_sale_input(input: &SaleInput) -> ValidationResult<()> {
    let lines = input.items.to_lines();

    if lines.is_empty() {
        return Err(ValidationError::Required {
            field: "items".to_string(),
        });
    }

    if lines.len() > MAX_SALE_LINES {
        return Err(ValidationError::OutOfRange {
            field: "items".to_string(),
            min: 1,
            max: MAX_SALE_LINES as i64,
        });
    }

    for line in &lines {
        validate_id("itemId", &line.item_id)?;
        validate_quantity(line.quantity)?;

        if let Some(price) = line.unit_sale_price {
            match line.item_kind {
                ItemKind::Product => validate_price("unitSalePrice", price)?,
                ItemKind::Service => validate_signed_price("unitSalePrice", price)?,
            }
        }
    }

    validate_optional_text(
        "customerName",
        input.customer_name.as_deref(),
        MAX_CUSTOMER_NAME_LEN,
    )?;
    validate_optional_text("notes", input.notes.as_deref(), MAX_NOTES_LEN)?;

    for detail in &input.sale_expense_details {
        validate_expense_detail(detail)?;
    }

    if let Some(scalar) = input.sale_expenses {
        validate_amount("saleExpenses", scalar, MAX_EXPENSE_CENTS)?;

        if !input.sale_expense_details.is_empty() {
            let itemized: Money = input.sale_expense_details.iter().map(|d| d.amount).sum();
            if itemized != scalar {
                return Err(ValidationError::Inconsistent {
                    field: "saleExpenses".to_string(),
                    reason: format!(
                        "itemized details add up to {} cents, not {} cents",
                        itemized.cents(),
                        scalar.cents()
                    ),
                });
            }
        }
    }

    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================
