//! Records every request so tests can count what reached the backend.

use axum::{
    extract::{Request, State},
    http::header::AUTHORIZATION,
    middleware::Next,
    response::Response,
};

use crate::state::{AppState, RecordedRequest};

pub async fn record_requests(State(state): State<AppState>, request: Request, next: Next) -> Response {
    state.record_request(RecordedRequest {
        method: request.method().to_string(),
        path: request.uri().path().to_string(),
        authorization: request
            .headers()
            .get(AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string),
    });

    next.run(request).await
}
