//! Cached reads of the backend's resources and the tool-unlock mutation.

use std::sync::{Arc, Weak};
use std::time::Duration;

use tokio::task::JoinHandle;
use xphub_shared::{is_dense_ranking, ApiError, LeaderboardEntry, ToolStatus, UnlockResponse, User};

use crate::api_client::ApiClient;
use crate::auth_session::AuthSession;
use crate::cache::QueryCache;
use crate::config::CacheConfig;
use crate::tools::UnlockState;

pub const DEFAULT_LEADERBOARD_LIMIT: u32 = 10;

/// Cache key of a resource query.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum QueryKey {
    User(String),
    Tools(String),
    Leaderboard(u32),
}

/// Result of [`Queries::unlock_tool`].
#[derive(Debug, Clone, PartialEq)]
pub enum UnlockOutcome {
    Unlocked(UnlockResponse),
    /// The tool was not in the `Available` state; nothing was sent.
    NotAvailable(UnlockState),
}

pub struct Queries {
    api: ApiClient,
    users: QueryCache<String, User>,
    tools: QueryCache<String, Vec<ToolStatus>>,
    leaderboard: QueryCache<u32, Vec<LeaderboardEntry>>,
    refresh_interval: Duration,
}

impl Queries {
    pub fn new(api: ApiClient, config: &CacheConfig) -> Self {
        Self {
            api,
            users: QueryCache::new("users", config.user_stale_time, config.retries),
            tools: QueryCache::new("tools", config.user_stale_time, config.retries),
            leaderboard: QueryCache::new(
                "leaderboard",
                config.leaderboard_stale_time,
                config.retries,
            ),
            refresh_interval: config.leaderboard_refresh_interval,
        }
    }

    pub fn api(&self) -> &ApiClient {
        &self.api
    }

    pub fn session(&self) -> &AuthSession {
        self.api.session()
    }

    pub async fn user(&self, discord_id: &str) -> Result<User, ApiError> {
        let api = self.api.clone();
        let id = discord_id.to_string();
        self.users
            .get(discord_id.to_string(), move || {
                let api = api.clone();
                let id = id.clone();
                async move { api.get_user(&id).await }
            })
            .await
    }

    /// The signed-in user's record, or `None` when logged out.
    pub async fn current_user(&self) -> Result<Option<User>, ApiError> {
        match self.session().discord_id() {
            Some(id) => self.user(&id).await.map(Some),
            None => Ok(None),
        }
    }

    pub async fn tools(&self, discord_id: &str) -> Result<Vec<ToolStatus>, ApiError> {
        let api = self.api.clone();
        let id = discord_id.to_string();
        self.tools
            .get(discord_id.to_string(), move || {
                let api = api.clone();
                let id = id.clone();
                async move { api.get_user_tools(&id).await }
            })
            .await
    }

    pub async fn current_tools(&self) -> Result<Option<Vec<ToolStatus>>, ApiError> {
        match self.session().discord_id() {
            Some(id) => self.tools(&id).await.map(Some),
            None => Ok(None),
        }
    }

    pub async fn leaderboard(&self, limit: u32) -> Result<Vec<LeaderboardEntry>, ApiError> {
        self.leaderboard
            .get(limit, leaderboard_fetch(self.api.clone(), limit))
            .await
    }

    /// Refetch a leaderboard page now, ignoring staleness.
    pub async fn refresh_leaderboard(&self, limit: u32) -> Result<Vec<LeaderboardEntry>, ApiError> {
        self.leaderboard
            .refetch(limit, leaderboard_fetch(self.api.clone(), limit))
            .await
    }

    /// Keep a leaderboard page current by refetching it every refresh interval.
    ///
    /// The task stops when the returned handle is dropped or when `self` is.
    pub fn spawn_leaderboard_refresh(self: &Arc<Self>, limit: u32) -> RefreshHandle {
        let period = self.refresh_interval.max(Duration::from_millis(1));
        let queries: Weak<Self> = Arc::downgrade(self);

        let task = tokio::spawn(async move {
            let mut ticker = tokio::time::interval_at(tokio::time::Instant::now() + period, period);
            loop {
                ticker.tick().await;
                let Some(queries) = queries.upgrade() else {
                    break;
                };
                match queries.refresh_leaderboard(limit).await {
                    Ok(entries) => {
                        tracing::debug!(limit, entries = entries.len(), "leaderboard refreshed")
                    }
                    Err(e) => tracing::warn!(limit, error = %e, "leaderboard refresh failed"),
                }
            }
        });

        RefreshHandle { task }
    }

    /// Unlock a tool for `discord_id`.
    ///
    /// Only a tool in [`UnlockState::Available`] reaches the backend. On
    /// success the user's tools list and user record are invalidated; on
    /// failure the cache is left alone.
    pub async fn unlock_tool(&self, discord_id: &str, status: &ToolStatus) -> Result<UnlockOutcome, ApiError> {
        let state = UnlockState::of(status);
        if !state.can_unlock() {
            tracing::debug!(tool = %status.tool.name, %state, "unlock not offered");
            return Ok(UnlockOutcome::NotAvailable(state));
        }

        let response = self.api.unlock_tool(discord_id, &status.tool.id).await?;
        tracing::info!(discord_id, tool = %status.tool.name, message = %response.message, "tool unlocked");

        self.invalidate(&QueryKey::Tools(discord_id.to_string()));
        self.invalidate(&QueryKey::User(discord_id.to_string()));
        Ok(UnlockOutcome::Unlocked(response))
    }

    /// Mark a query invalid. Returns `true` if it had been cached.
    pub fn invalidate(&self, key: &QueryKey) -> bool {
        match key {
            QueryKey::User(id) => self.users.invalidate(id),
            QueryKey::Tools(id) => self.tools.invalidate(id),
            QueryKey::Leaderboard(limit) => self.leaderboard.invalidate(limit),
        }
    }

    pub fn is_fresh(&self, key: &QueryKey) -> bool {
        match key {
            QueryKey::User(id) => self.users.is_fresh(id),
            QueryKey::Tools(id) => self.tools.is_fresh(id),
            QueryKey::Leaderboard(limit) => self.leaderboard.is_fresh(limit),
        }
    }

    /// Drop every cached response (used on logout).
    pub fn clear(&self) {
        self.users.clear();
        self.tools.clear();
        self.leaderboard.clear();
    }
}

fn leaderboard_fetch(
    api: ApiClient,
    limit: u32,
) -> impl Fn() -> futures_util::future::BoxFuture<'static, Result<Vec<LeaderboardEntry>, ApiError>> + Send + 'static {
    use futures_util::FutureExt;

    move || {
        let api = api.clone();
        async move {
            let entries = api.get_leaderboard(limit).await?;
            Ok(normalize_leaderboard(entries, limit))
        }
        .boxed()
    }
}

/// Cap a leaderboard page at `limit` entries and flag a broken ranking.
fn normalize_leaderboard(mut entries: Vec<LeaderboardEntry>, limit: u32) -> Vec<LeaderboardEntry> {
    if entries.len() > limit as usize {
        tracing::warn!(limit, received = entries.len(), "leaderboard longer than requested");
        entries.truncate(limit as usize);
    }
    if !is_dense_ranking(&entries) {
        tracing::warn!(limit, "leaderboard ranks are not dense from 1");
    }
    entries
}

/// Background leaderboard refresh; aborted on drop.
#[derive(Debug)]
pub struct RefreshHandle {
    task: JoinHandle<()>,
}

impl RefreshHandle {
    pub fn stop(self) {
        self.task.abort();
    }

    pub fn is_running(&self) -> bool {
        !self.task.is_finished()
    }
}

impl Drop for RefreshHandle {
    fn drop(&mut self) {
        self.task.abort();
    }
}
