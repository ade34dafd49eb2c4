//! # Report Handlers
//!
//! Dashboard figures: period summary, bucketed summaries, monthly trend
//! and top-N rankings.

use std::str::FromStr;

use axum::extract::rejection::QueryRejection;
use axum::extract::{Query, State};
use axum::Json;
use chrono::Utc;
use serde::Deserialize;
use stockbook_core::report::{Bucket, Granularity, MonthPoint, PeriodSummary, TopItems};

use crate::error::{ApiError, ApiResult};
use crate::extract::RequestScope;
use crate::handlers::{parse_window, ApiResponse, Instant};
use crate::services::report_service::ReportWindow;
use crate::state::AppState;

const DEFAULT_TREND_MONTHS: u32 = 12;
const DEFAULT_TOP_LIMIT: usize = 5;

// Query structs repeat `from`/`to` instead of flattening a shared struct:
// serde_urlencoded cannot parse numbers through `#[serde(flatten)]`.

#[derive(Debug, Default, Deserialize)]
pub struct WindowQuery {
    pub from: Option<String>,
    pub to: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct BucketQuery {
    pub from: Option<String>,
    pub to: Option<String>,
    pub granularity: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct MonthlyQuery {
    pub months: Option<u32>,
    pub end: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct TopQuery {
    pub from: Option<String>,
    pub to: Option<String>,
    pub limit: Option<usize>,
}

fn window(from: &Option<String>, to: &Option<String>) -> ApiResult<ReportWindow> {
    let (from, to) = parse_window(from.as_deref(), to.as_deref())?;
    Ok(ReportWindow::new(from, to))
}

fn query<T>(query: Result<Query<T>, QueryRejection>) -> ApiResult<T> {
    query
        .map(|Query(value)| value)
        .map_err(|rejection| ApiError::validation(rejection.body_text()))
}

pub async fn summary(
    State(state): State<AppState>,
    RequestScope(scope): RequestScope,
    params: Result<Query<WindowQuery>, QueryRejection>,
) -> ApiResult<Json<ApiResponse<PeriodSummary>>> {
    let params = query(params)?;
    let window = window(&params.from, &params.to)?;
    let summary = state.reports().summary(&scope, window).await?;
    Ok(Json(ApiResponse::ok(summary)))
}

pub async fn buckets(
    State(state): State<AppState>,
    RequestScope(scope): RequestScope,
    params: Result<Query<BucketQuery>, QueryRejection>,
) -> ApiResult<Json<ApiResponse<Vec<Bucket>>>> {
    let params = query(params)?;
    let window = window(&params.from, &params.to)?;
    let granularity = match params.granularity.as_deref() {
        Some(value) => Granularity::from_str(value)?,
        None => Granularity::default(),
    };

    let buckets = state.reports().buckets(&scope, window, granularity).await?;
    Ok(Json(ApiResponse::ok(buckets)))
}

pub async fn monthly(
    State(state): State<AppState>,
    RequestScope(scope): RequestScope,
    params: Result<Query<MonthlyQuery>, QueryRejection>,
) -> ApiResult<Json<ApiResponse<Vec<MonthPoint>>>> {
    let params = query(params)?;
    let months = params.months.unwrap_or(DEFAULT_TREND_MONTHS);
    let end = match params.end.as_deref().filter(|e| !e.trim().is_empty()) {
        Some(value) => Instant::parse("end", value)?.date(),
        None => Utc::now().date_naive(),
    };

    let series = state.reports().monthly_trend(&scope, months, end).await?;
    Ok(Json(ApiResponse::ok(series)))
}

pub async fn top(
    State(state): State<AppState>,
    RequestScope(scope): RequestScope,
    params: Result<Query<TopQuery>, QueryRejection>,
) -> ApiResult<Json<ApiResponse<TopItems>>> {
    let params = query(params)?;
    let window = window(&params.from, &params.to)?;
    let limit = params.limit.unwrap_or(DEFAULT_TOP_LIMIT);

    let top = state.reports().top_items(&scope, window, limit).await?;
    Ok(Json(ApiResponse::ok(top)))
}
