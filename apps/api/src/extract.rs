//! # Request Scope Extraction
//!
//! The external session layer authenticates callers and forwards the user
//! and business ids as headers. Every sale and report handler takes a
//! [`RequestScope`], so a request without a user id never reaches storage.

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use stockbook_core::Scope;

use crate::error::ApiError;

pub const USER_ID_HEADER: &str = "x-user-id";
pub const BUSINESS_ID_HEADER: &str = "x-business-id";

/// Scope of the authenticated caller.
#[derive(Debug, Clone)]
pub struct RequestScope(pub Scope);

impl<S> FromRequestParts<S> for RequestScope
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let user_id = match parts.headers.get(USER_ID_HEADER) {
            Some(value) => value
                .to_str()
                .map_err(|_| ApiError::unauthorized("X-User-Id header contains invalid characters"))?
                .trim(),
            None => return Err(ApiError::unauthorized("Missing X-User-Id header")),
        };

        if user_id.is_empty() {
            return Err(ApiError::unauthorized("Missing X-User-Id header"));
        }

        let business_id = match parts.headers.get(BUSINESS_ID_HEADER) {
            Some(value) => Some(
                value
                    .to_str()
                    .map_err(|_| ApiError::validation("X-Business-Id header contains invalid characters"))?,
            ),
            None => None,
        };

        Ok(RequestScope(Scope::new(user_id, business_id)))
    }
}
