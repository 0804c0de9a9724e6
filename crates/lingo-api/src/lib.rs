pub mod auth;
pub mod convert;
pub mod error;
pub mod extract;
pub mod middleware;
pub mod relationships;
pub mod routes;
pub mod users;

use lingo_db::Database;
use tracing::error;

use crate::auth::AppState;
use crate::error::ApiError;

pub use routes::router;

/// Run blocking DB work off the async runtime.
pub(crate) async fn run_db<F, T>(state: &AppState, f: F) -> Result<T, ApiError>
where
    F: FnOnce(&Database) -> Result<T, ApiError> + Send + 'static,
    T: Send + 'static,
{
    let state = state.clone();
    tokio::task::spawn_blocking(move || f(&state.db))
        .await
        .map_err(|e| {
            error!("spawn_blocking join error: {}", e);
            ApiError::Internal(e.into())
        })?
}
