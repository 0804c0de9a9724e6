use axum::extract::FromRequest;

use crate::error::ApiError;

/// `Json` whose rejection renders as an `ApiError`, so malformed bodies get
/// the same `{ "message" }` shape as every other failure.
#[derive(FromRequest)]
#[from_request(via(axum::Json), rejection(ApiError))]
pub struct JsonBody<T>(pub T);
