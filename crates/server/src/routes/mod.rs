//! API route handlers.

pub mod dev;
pub mod leveling;
pub mod status;
pub mod tools;
pub mod users;

use axum::{http::StatusCode, Json};
use xphub_shared::ErrorBody;

/// Error half of every handler: a status and a `{"detail": ...}` body.
pub type ApiFailure = (StatusCode, Json<ErrorBody>);

pub type ApiResult<T> = Result<Json<T>, ApiFailure>;

pub fn failure(status: StatusCode, detail: impl Into<String>) -> ApiFailure {
    (status, Json(ErrorBody::new(detail)))
}
