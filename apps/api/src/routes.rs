//! # Router
//!
//! ```text
//! GET    /api/health
//! POST   /api/sales                 create
//! GET    /api/sales?from&to&itemId  list
//! GET    /api/sales/{id}            get
//! PUT    /api/sales/{id}            update
//! DELETE /api/sales/{id}            delete
//! GET    /api/reports/summary?from&to
//! GET    /api/reports/buckets?from&to&granularity
//! GET    /api/reports/monthly?months&end
//! GET    /api/reports/top?from&to&limit
//! ```

use axum::routing::get;
use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::handlers::{health, reports, sales};
use crate::state::AppState;

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/health", get(health::health))
        .route("/api/sales", get(sales::list_sales).post(sales::create_sale))
        .route(
            "/api/sales/{id}",
            get(sales::get_sale)
                .put(sales::update_sale)
                .delete(sales::delete_sale),
        )
        .route("/api/reports/summary", get(reports::summary))
        .route("/api/reports/buckets", get(reports::buckets))
        .route("/api/reports/monthly", get(reports::monthly))
        .route("/api/reports/top", get(reports::top))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
