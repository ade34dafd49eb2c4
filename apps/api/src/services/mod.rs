//! # Service Layer
//!
//! Orchestration between HTTP handlers and storage.
//!
//! - [`sale_service::SaleEngine`] - create / update / delete with stock reservation
//! - [`report_service::ReportService`] - period summaries, buckets, trends, rankings

pub mod report_service;
pub mod sale_service;

pub use report_service::ReportService;
pub use sale_service::SaleEngine;

use stockbook_core::catalog::CatalogIndex;
use stockbook_core::{Sale, SaleBody, Scope};
use stockbook_db::Database;

use crate::error::ApiResult;

/// Whether any line of `sale` needs the live catalog for its category.
///
/// Lines carrying a snapshot category are self-describing.
fn needs_live_lookup(sale: &Sale) -> bool {
    match &sale.body {
        SaleBody::Legacy(_) => true,
        SaleBody::Lines(lines) => lines.iter().any(|line| {
            line.snapshot
                .as_ref()
                .and_then(|s| s.category.as_deref())
                .map_or(true, |c| c.trim().is_empty())
        }),
    }
}

/// Loads the catalog index only when some sale cannot be described from
/// its own snapshots.
pub(crate) async fn catalog_for(
    db: &Database,
    scope: &Scope,
    sales: &[Sale],
) -> ApiResult<CatalogIndex> {
    if !sales.iter().any(needs_live_lookup) {
        return Ok(CatalogIndex::new());
    }

    let products = db.products().list(scope).await?;
    let services = db.services().list(scope).await?;
    Ok(CatalogIndex::from_catalog(&products, &services))
}
