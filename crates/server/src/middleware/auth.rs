//! Bearer-token rejection.
//!
//! Tokens are not issued or checked here; a token is refused only once it has
//! been put on the rejection list with [`AppState::reject_token`].

use axum::{
    extract::{Request, State},
    http::{header::AUTHORIZATION, HeaderMap, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use xphub_shared::ErrorBody;

use crate::state::AppState;

/// Extract the token from an `Authorization: Bearer <token>` header.
pub fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|t| !t.is_empty())
}

pub async fn reject_revoked_tokens(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Response {
    let rejected = bearer_token(request.headers()).is_some_and(|t| state.is_rejected(t));
    if rejected {
        tracing::debug!(path = %request.uri().path(), "rejecting revoked bearer token");
        return (
            StatusCode::UNAUTHORIZED,
            Json(ErrorBody::new("Invalid or expired token")),
        )
            .into_response();
    }

    next.run(request).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn parses_bearer_header() {
        let mut headers = HeaderMap::new();
        assert_eq!(bearer_token(&headers), None);

        headers.insert(AUTHORIZATION, HeaderValue::from_static("Bearer abc"));
        assert_eq!(bearer_token(&headers), Some("abc"));

        headers.insert(AUTHORIZATION, HeaderValue::from_static("Basic abc"));
        assert_eq!(bearer_token(&headers), None);

        headers.insert(AUTHORIZATION, HeaderValue::from_static("Bearer "));
        assert_eq!(bearer_token(&headers), None);
    }
}
