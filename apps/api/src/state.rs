//! # Application State
//!
//! Shared by every handler through axum's `State` extractor. Cloning is
//! cheap: the database handle wraps a pooled connection set.

use stockbook_db::Database;

use crate::services::{ReportService, SaleEngine};

#[derive(Debug, Clone)]
pub struct AppState {
    pub db: Database,
}

impl AppState {
    pub fn new(db: Database) -> Self {
        AppState { db }
    }

    pub fn sales(&self) -> SaleEngine {
        SaleEngine::new(self.db.clone())
    }

    pub fn reports(&self) -> ReportService {
        ReportService::new(self.db.clone())
    }
}
