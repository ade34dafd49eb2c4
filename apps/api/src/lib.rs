//! # stockbook-api: HTTP Service for Stockbook
//!
//! Hosts the Sale Engine and the Reporting Service behind axum.
//!
//! ## Request Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  HTTP request                                                           │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  TraceLayer / CorsLayer                                                 │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  RequestScope (X-User-Id, X-Business-Id) ─── 401 when missing          │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  handlers::{sales, reports}                                             │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  services::{SaleEngine, ReportService}                                  │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  stockbook-db (repositories, stock ledger)  +  stockbook-core (math)   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Organization
//!
//! - [`config`] - Environment configuration
//! - [`error`] - `ApiError` and the JSON error envelope
//! - [`extract`] - Request scope extractor
//! - [`handlers`] - HTTP handlers
//! - [`routes`] - Router assembly
//! - [`services`] - Sale Engine and Reporting Service
//! - [`state`] - Shared application state

pub mod config;
pub mod error;
pub mod extract;
pub mod handlers;
pub mod routes;
pub mod services;
pub mod state;

pub use config::{ApiConfig, ConfigError};
pub use error::{ApiError, ApiResult, ErrorCode};
pub use routes::router;
pub use state::AppState;
