//! Shared error types.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Error envelope returned by the backend for `/api/*` failures.
///
/// The backend reports failures as `{"detail": "..."}`; clients surface the
/// detail instead of failing to decode a success response type.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ErrorBody {
    pub detail: String,
}

impl ErrorBody {
    pub fn new(detail: impl Into<String>) -> Self {
        Self {
            detail: detail.into(),
        }
    }
}

/// Attempt to pull a user-facing message out of an error body.
pub fn try_error_detail(body: &str) -> Option<String> {
    let parsed = serde_json::from_str::<ErrorBody>(body).ok()?;
    let detail = parsed.detail.trim();
    if detail.is_empty() {
        None
    } else {
        Some(detail.to_string())
    }
}

/// API error type for client-side use.
///
/// `Clone` so a single failed fetch can be handed to every caller waiting on it.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ApiError {
    #[error("Network error: {0}")]
    Network(String),
    #[error("Unauthorized: stored credential rejected")]
    Unauthorized,
    #[error("HTTP {status}: {body}")]
    Http { status: u16, body: String },
    #[error("Deserialization error: {0}")]
    Deserialize(String),
}

impl ApiError {
    /// Whether a failed read may be attempted again.
    pub fn is_retryable(&self) -> bool {
        !matches!(self, ApiError::Unauthorized)
    }

    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::Http { status, .. } => Some(*status),
            ApiError::Unauthorized => Some(401),
            ApiError::Network(_) | ApiError::Deserialize(_) => None,
        }
    }

    /// Best message for display: the backend's detail when there is one.
    pub fn user_message(&self) -> String {
        match self {
            ApiError::Http { body, .. } => try_error_detail(body).unwrap_or_else(|| self.to_string()),
            _ => self.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_detail() {
        let body = r#"{"detail":"User level 2 is below required level 5"}"#;
        assert_eq!(
            try_error_detail(body).as_deref(),
            Some("User level 2 is below required level 5")
        );
        assert_eq!(try_error_detail(r#"{"detail":"  "}"#), None);
        assert_eq!(try_error_detail("<html>"), None);
    }

    #[test]
    fn unauthorized_is_not_retryable() {
        assert!(!ApiError::Unauthorized.is_retryable());
        assert!(ApiError::Network("refused".into()).is_retryable());
        assert!(ApiError::Http {
            status: 500,
            body: String::new()
        }
        .is_retryable());
    }

    #[test]
    fn user_message_prefers_detail() {
        let err = ApiError::Http {
            status: 403,
            body: r#"{"detail":"too low"}"#.to_string(),
        };
        assert_eq!(err.user_message(), "too low");
        assert_eq!(err.status(), Some(403));

        let err = ApiError::Http {
            status: 502,
            body: "bad gateway".to_string(),
        };
        assert_eq!(err.user_message(), "HTTP 502: bad gateway");
    }
}
