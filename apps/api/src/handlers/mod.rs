//! # HTTP Handlers
//!
//! Thin adapters: extract scope and parameters, call a service, wrap the
//! result.
//!
//! ## Handler Organization
//! ```text
//! handlers/
//! ├── health.rs  - GET /api/health
//! ├── sales.rs   - /api/sales CRUD
//! └── reports.rs - /api/reports/*
//! ```

pub mod health;
pub mod reports;
pub mod sales;

use chrono::{DateTime, Duration, NaiveDate, NaiveTime, Utc};
use serde::Serialize;

use crate::error::{ApiError, ApiResult};

/// Success envelope for reads.
#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: T,
}

impl<T> ApiResponse<T> {
    pub fn ok(data: T) -> Self {
        ApiResponse {
            success: true,
            data,
        }
    }
}

/// A client-supplied point in time: RFC 3339, or a bare `YYYY-MM-DD`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Instant {
    At(DateTime<Utc>),
    Day(NaiveDate),
}

impl Instant {
    pub(crate) fn parse(field: &str, value: &str) -> ApiResult<Self> {
        let value = value.trim();

        if let Ok(at) = DateTime::parse_from_rfc3339(value) {
            return Ok(Instant::At(at.with_timezone(&Utc)));
        }

        NaiveDate::parse_from_str(value, "%Y-%m-%d")
            .map(Instant::Day)
            .map_err(|_| {
                ApiError::validation(format!(
                    "{field} must be an RFC 3339 timestamp or YYYY-MM-DD date"
                ))
            })
    }

    /// The instant itself, or midnight UTC for a bare date.
    pub(crate) fn start(self) -> DateTime<Utc> {
        match self {
            Instant::At(at) => at,
            Instant::Day(day) => day.and_time(NaiveTime::MIN).and_utc(),
        }
    }

    /// Exclusive upper bound. A bare date includes that whole day.
    pub(crate) fn end_exclusive(self) -> DateTime<Utc> {
        match self {
            Instant::At(at) => at,
            Instant::Day(_) => self.start() + Duration::days(1),
        }
    }

    pub(crate) fn date(self) -> NaiveDate {
        match self {
            Instant::At(at) => at.date_naive(),
            Instant::Day(day) => day,
        }
    }
}

/// Parses `from` / `to` query parameters into a half-open window.
pub(crate) fn parse_window(
    from: Option<&str>,
    to: Option<&str>,
) -> ApiResult<(Option<DateTime<Utc>>, Option<DateTime<Utc>>)> {
    let from = from
        .filter(|v| !v.trim().is_empty())
        .map(|v| Instant::parse("from", v).map(Instant::start))
        .transpose()?;
    let to = to
        .filter(|v| !v.trim().is_empty())
        .map(|v| Instant::parse("to", v).map(Instant::end_exclusive))
        .transpose()?;

    if let (Some(from), Some(to)) = (from, to) {
        if from >= to {
            return Err(ApiError::validation("from must be before to"));
        }
    }

    Ok((from, to))
}
