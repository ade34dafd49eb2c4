//! # Storage Call Timeouts
//!
//! Every repository call runs under a deadline. A call that overruns
//! surfaces as [`DbError::Timeout`] instead of hanging the request.
//!
//! ```text
//!   repository method
//!        │
//!        ▼
//!   timed("sales.list", 5s, async { ... sqlx ... })
//!        │
//!        ├── finished in time  → its own Result
//!        └── deadline elapsed  → DbError::Timeout { operation, millis }
//! ```

use std::future::Future;
use std::time::Duration;

use tracing::warn;

use crate::error::{DbError, DbResult};

/// Default deadline for one storage call.
pub const DEFAULT_STORAGE_TIMEOUT: Duration = Duration::from_millis(5000);

/// Runs `fut` under `limit`.
pub async fn timed<T, F>(operation: &'static str, limit: Duration, fut: F) -> DbResult<T>
where
    F: Future<Output = DbResult<T>>,
{
    match tokio::time::timeout(limit, fut).await {
        Ok(result) => result,
        Err(_) => {
            let millis = limit.as_millis() as u64;
            warn!(operation, millis, "Storage call timed out");
            Err(DbError::Timeout {
                operation: operation.to_string(),
                millis,
            })
        }
    }
}
