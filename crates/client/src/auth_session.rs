//! Session resolver: the active Discord identity and auth token, persisted in [`Storage`].

use std::sync::Arc;

use tokio::sync::watch;

use crate::storage::{self, Storage};

const DISCORD_ID_KEY: &str = "discord_id";
const AUTH_TOKEN_KEY: &str = "auth_token";

/// Whether the stored credential is still accepted by the backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthStatus {
    Active,
    /// The backend answered 401; the token was dropped and the user has to
    /// sign in again at `login_url`.
    LoginRequired { login_url: String },
}

/// Session handle shared by the API client, the queries and the event bridge.
///
/// Reads go straight to storage: there is no validation, expiry or refresh,
/// and a missing identifier simply means "logged out".
#[derive(Clone)]
pub struct AuthSession {
    storage: Arc<dyn Storage>,
    status: Arc<watch::Sender<AuthStatus>>,
}

impl AuthSession {
    pub fn new(storage: Arc<dyn Storage>) -> Self {
        let (status, _) = watch::channel(AuthStatus::Active);
        Self {
            storage,
            status: Arc::new(status),
        }
    }

    /// The active Discord identifier, if one is stored.
    pub fn discord_id(&self) -> Option<String> {
        storage::load(self.storage.as_ref(), DISCORD_ID_KEY)
    }

    /// The bearer token attached to API requests, if one is stored.
    pub fn auth_token(&self) -> Option<String> {
        storage::load(self.storage.as_ref(), AUTH_TOKEN_KEY)
    }

    pub fn is_authenticated(&self) -> bool {
        self.discord_id().is_some()
    }

    /// Store an identity and optionally a token.
    pub fn login(&self, discord_id: impl Into<String>, token: Option<String>) {
        let discord_id = discord_id.into();
        storage::save(self.storage.as_ref(), DISCORD_ID_KEY, &discord_id);
        if let Some(token) = token {
            self.set_auth_token(token);
        }
        tracing::info!(discord_id = %discord_id, "session stored");
    }

    pub fn set_auth_token(&self, token: impl Into<String>) {
        storage::save(self.storage.as_ref(), AUTH_TOKEN_KEY, &token.into());
        self.status.send_replace(AuthStatus::Active);
    }

    pub fn clear_auth_token(&self) {
        self.storage.remove(AUTH_TOKEN_KEY);
    }

    /// Drop the stored credential and ask for a fresh login.
    pub(crate) fn require_login(&self, login_url: &str) {
        self.clear_auth_token();
        self.status.send_replace(AuthStatus::LoginRequired {
            login_url: login_url.to_string(),
        });
        tracing::warn!(login_url, "credential rejected, login required");
    }

    /// Logout and clear session
    pub fn logout(&self) {
        self.storage.remove(DISCORD_ID_KEY);
        self.clear_auth_token();
        tracing::info!("session cleared");
    }

    pub fn status(&self) -> AuthStatus {
        self.status.borrow().clone()
    }

    /// Subscribe to credential status changes.
    pub fn watch_status(&self) -> watch::Receiver<AuthStatus> {
        self.status.subscribe()
    }
}

impl std::fmt::Debug for AuthSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthSession")
            .field("discord_id", &self.discord_id())
            .field("has_token", &self.auth_token().is_some())
            .field("status", &self.status())
            .finish()
    }
}
