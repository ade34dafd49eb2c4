//! # Sale Handlers
//!
//! Create, read, update and delete sales. Both request generations are
//! accepted on create and update:
//!
//! ```json
//! { "productId": "…", "quantitySold": 3, "unitPrice": 1000 }
//! { "items": [{ "itemId": "…", "itemType": "Service", "quantity": 1 }] }
//! ```

use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use serde::{Deserialize, Serialize};
use stockbook_core::catalog::EnrichedSale;
use stockbook_core::{ItemKind, LineInput, Money, SaleExpenseDetail, SaleInput, SaleItems, SaleSummary};
use stockbook_db::SaleFilter;
use tracing::debug;

use crate::error::{ApiError, ApiResult};
use crate::extract::RequestScope;
use crate::handlers::{parse_window, ApiResponse, Instant};
use crate::state::AppState;

// =============================================================================
// Request / Response Types
// =============================================================================

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LineRequest {
    pub item_id: String,
    #[serde(default)]
    pub item_type: ItemKind,
    pub quantity: i64,
    #[serde(default)]
    pub unit_sale_price: Option<Money>,
}

/// Create/update body.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SaleRequest {
    // Single-product shape sent by older clients
    pub product_id: Option<String>,
    pub quantity_sold: Option<i64>,
    pub unit_price: Option<Money>,

    pub items: Option<Vec<LineRequest>>,

    pub customer_name: Option<String>,
    pub sale_date: Option<String>,
    pub notes: Option<String>,
    pub sale_expenses: Option<Money>,
    #[serde(default)]
    pub sale_expense_details: Vec<SaleExpenseDetail>,
}

impl SaleRequest {
    pub fn into_input(self) -> ApiResult<SaleInput> {
        let items = match (self.items, self.product_id) {
            (Some(_), Some(_)) => {
                return Err(ApiError::validation(
                    "Send either items or productId, not both",
                ))
            }
            (Some(lines), None) => SaleItems::Lines(
                lines
                    .into_iter()
                    .map(|l| LineInput {
                        item_id: l.item_id,
                        item_kind: l.item_type,
                        quantity: l.quantity,
                        unit_sale_price: l.unit_sale_price,
                    })
                    .collect(),
            ),
            (None, Some(product_id)) => SaleItems::Legacy {
                item_id: product_id,
                quantity: self
                    .quantity_sold
                    .ok_or_else(|| ApiError::validation("quantitySold is required"))?,
                unit_sale_price: self.unit_price,
            },
            (None, None) => return Err(ApiError::validation("items is required")),
        };

        let sale_date = self
            .sale_date
            .as_deref()
            .filter(|d| !d.trim().is_empty())
            .map(|d| Instant::parse("saleDate", d).map(Instant::start))
            .transpose()?;

        Ok(SaleInput {
            items,
            customer_name: self.customer_name,
            sale_date,
            notes: self.notes,
            sale_expenses: self.sale_expenses,
            sale_expense_details: self.sale_expense_details,
        })
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListSalesQuery {
    pub from: Option<String>,
    pub to: Option<String>,
    pub item_id: Option<String>,
}

/// Create/update response: `{ success, saleId, totalSales, totalCogs, totalProfit, itemCount }`.
#[derive(Debug, Serialize)]
pub struct SaleWriteResponse {
    pub success: bool,
    #[serde(flatten)]
    pub summary: SaleSummary,
}

#[derive(Debug, Serialize)]
pub struct DeleteResponse {
    pub success: bool,
}

fn body<T>(payload: Result<Json<T>, JsonRejection>) -> ApiResult<T> {
    payload
        .map(|Json(value)| value)
        .map_err(|rejection| ApiError::validation(rejection.body_text()))
}

// =============================================================================
// Handlers
// =============================================================================

pub async fn create_sale(
    State(state): State<AppState>,
    RequestScope(scope): RequestScope,
    payload: Result<Json<SaleRequest>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<SaleWriteResponse>)> {
    let input = body(payload)?.into_input()?;
    let summary = state.sales().create(&scope, input).await?;

    Ok((
        StatusCode::CREATED,
        Json(SaleWriteResponse {
            success: true,
            summary,
        }),
    ))
}

pub async fn list_sales(
    State(state): State<AppState>,
    RequestScope(scope): RequestScope,
    query: Result<Query<ListSalesQuery>, QueryRejection>,
) -> ApiResult<Json<ApiResponse<Vec<EnrichedSale>>>> {
    let Query(query) = query.map_err(|rejection| ApiError::validation(rejection.body_text()))?;
    let (from, to) = parse_window(query.from.as_deref(), query.to.as_deref())?;

    let filter = SaleFilter {
        from,
        to,
        item_id: query.item_id.filter(|id| !id.trim().is_empty()),
    };
    debug!(?filter, "Listing sales");

    let sales = state.sales().list(&scope, &filter).await?;
    Ok(Json(ApiResponse::ok(sales)))
}

pub async fn get_sale(
    State(state): State<AppState>,
    RequestScope(scope): RequestScope,
    Path(sale_id): Path<String>,
) -> ApiResult<Json<ApiResponse<EnrichedSale>>> {
    let sale = state.sales().get(&scope, &sale_id).await?;
    Ok(Json(ApiResponse::ok(sale)))
}

pub async fn update_sale(
    State(state): State<AppState>,
    RequestScope(scope): RequestScope,
    Path(sale_id): Path<String>,
    payload: Result<Json<SaleRequest>, JsonRejection>,
) -> ApiResult<Json<SaleWriteResponse>> {
    let input = body(payload)?.into_input()?;
    let summary = state.sales().update(&scope, &sale_id, input).await?;

    Ok(Json(SaleWriteResponse {
        success: true,
        summary,
    }))
}

pub async fn delete_sale(
    State(state): State<AppState>,
    RequestScope(scope): RequestScope,
    Path(sale_id): Path<String>,
) -> ApiResult<Json<DeleteResponse>> {
    state.sales().delete(&scope, &sale_id).await?;
    Ok(Json(DeleteResponse { success: true }))
}
