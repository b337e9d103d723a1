//! HTTP API client with bearer-token support.

use std::time::Duration;

use reqwest::{Client, RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use xphub_shared::{
    try_error_detail, ApiError, HealthStatus, LeaderboardEntry, ToolStatus, UnlockResponse, User,
};

use crate::auth_session::AuthSession;
use crate::config::ClientConfig;

/// HTTP client for the xphub backend.
///
/// Attaches the session's token to every request. A 401 clears the token and
/// flips the session into [`AuthStatus::LoginRequired`](crate::AuthStatus).
#[derive(Debug, Clone)]
pub struct ApiClient {
    client: Client,
    base_url: String,
    login_url: String,
    session: AuthSession,
}

impl ApiClient {
    pub fn new(config: &ClientConfig, session: AuthSession) -> Result<Self, ApiError> {
        let client = Client::builder()
            .timeout(config.http_timeout)
            .build()
            .map_err(|e| ApiError::Network(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            base_url: config.api_url.clone(),
            login_url: config.login_url.clone(),
            session,
        })
    }

    /// Client with default settings against `base_url`.
    pub fn with_base_url(base_url: impl Into<String>, session: AuthSession) -> Result<Self, ApiError> {
        let mut config = ClientConfig::for_api_url(base_url);
        config.http_timeout = Duration::from_secs(10);
        Self::new(&config, session)
    }

    pub fn session(&self) -> &AuthSession {
        &self.session
    }

    fn url(&self, path: &str) -> String {
        if path.starts_with("http://") || path.starts_with("https://") {
            return path.to_string();
        }
        let base = self.base_url.trim_end_matches('/');
        let path = path.trim_start_matches('/');
        format!("{base}/{path}")
    }

    fn authorize(&self, rb: RequestBuilder) -> RequestBuilder {
        match self.session.auth_token() {
            Some(token) => rb.bearer_auth(token),
            None => rb,
        }
    }

    async fn send(&self, rb: RequestBuilder) -> Result<String, ApiError> {
        let resp = self
            .authorize(rb)
            .send()
            .await
            .map_err(|e| ApiError::Network(e.to_string()))?;

        let status = resp.status();
        let text = resp
            .text()
            .await
            .map_err(|e| ApiError::Network(format!("failed to read body: {e}")))?;

        if status == StatusCode::UNAUTHORIZED {
            self.session.require_login(&self.login_url);
            return Err(ApiError::Unauthorized);
        }

        if !status.is_success() {
            tracing::debug!(
                status = status.as_u16(),
                detail = ?try_error_detail(&text),
                "request rejected"
            );
            return Err(ApiError::Http {
                status: status.as_u16(),
                body: text,
            });
        }

        Ok(text)
    }

    /// Make a GET request
    pub async fn get_json<TRes: DeserializeOwned>(&self, path: &str) -> Result<TRes, ApiError> {
        let url = self.url(path);
        tracing::debug!(%url, "GET");
        let text = self.send(self.client.get(&url)).await?;
        serde_json::from_str(&text).map_err(|e| ApiError::Deserialize(e.to_string()))
    }

    /// Make a POST request without a body
    pub async fn post_empty<TRes: DeserializeOwned>(&self, path: &str) -> Result<TRes, ApiError> {
        let url = self.url(path);
        tracing::debug!(%url, "POST");
        let text = self.send(self.client.post(&url)).await?;

        if text.is_empty() {
            serde_json::from_str("null").map_err(|e| ApiError::Deserialize(e.to_string()))
        } else {
            serde_json::from_str(&text).map_err(|e| ApiError::Deserialize(e.to_string()))
        }
    }

    // --- Endpoints ---

    pub async fn get_user(&self, discord_id: &str) -> Result<User, ApiError> {
        self.get_json(&format!("/api/users/{}", urlencoding::encode(discord_id)))
            .await
    }

    pub async fn get_leaderboard(&self, limit: u32) -> Result<Vec<LeaderboardEntry>, ApiError> {
        self.get_json(&format!("/api/leveling/leaderboard?limit={limit}"))
            .await
    }

    pub async fn get_user_tools(&self, discord_id: &str) -> Result<Vec<ToolStatus>, ApiError> {
        self.get_json(&format!("/api/tools/user/{}", urlencoding::encode(discord_id)))
            .await
    }

    pub async fn unlock_tool(&self, discord_id: &str, tool_id: &str) -> Result<UnlockResponse, ApiError> {
        self.post_empty(&format!(
            "/api/tools/unlock/{}/{}",
            urlencoding::encode(discord_id),
            urlencoding::encode(tool_id)
        ))
        .await
    }

    pub async fn health(&self) -> Result<HealthStatus, ApiError> {
        self.get_json("/health").await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStorage;
    use std::sync::Arc;

    fn client(base: &str) -> ApiClient {
        let session = AuthSession::new(Arc::new(MemoryStorage::new()));
        ApiClient::with_base_url(base, session).unwrap()
    }

    #[test]
    fn joins_paths() {
        let api = client("http://localhost:8000/");
        assert_eq!(api.url("/api/users/1"), "http://localhost:8000/api/users/1");
        assert_eq!(api.url("health"), "http://localhost:8000/health");
        assert_eq!(api.url("https://other/x"), "https://other/x");
    }

    #[tokio::test]
    async fn connection_refused_is_network_error() {
        // Port 9 (discard) is closed on loopback in test environments.
        let api = client("http://127.0.0.1:9");
        let err = api.get_user("123").await.unwrap_err();
        assert!(matches!(err, ApiError::Network(_)));
        assert!(err.is_retryable());
    }
}
