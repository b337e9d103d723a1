//! Client configuration from environment variables.

use std::time::Duration;

use url::Url;
use xphub_shared::WS_PATH;

const DEFAULT_API_URL: &str = "http://localhost:8000";
const DEFAULT_LOGIN_URL: &str = "/login";

/// Staleness and refresh windows for the data-fetch cache.
#[derive(Debug, Clone)]
pub struct CacheConfig {
    /// How long a user record or tools list is served without refetching.
    pub user_stale_time: Duration,
    /// How long a leaderboard page is served without refetching.
    pub leaderboard_stale_time: Duration,
    /// Period of the background leaderboard refresh.
    pub leaderboard_refresh_interval: Duration,
    /// Extra attempts after a failed read.
    pub retries: u32,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            user_stale_time: Duration::from_secs(5 * 60),
            leaderboard_stale_time: Duration::from_secs(60),
            leaderboard_refresh_interval: Duration::from_secs(60),
            retries: 1,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub api_url: String,
    pub socket_url: String,
    /// Where the user is sent when the backend rejects the stored credential.
    pub login_url: String,
    pub http_timeout: Duration,
    pub cache: CacheConfig,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self::for_api_url(DEFAULT_API_URL)
    }
}

impl ClientConfig {
    /// Config pointing both HTTP and push channel at one backend.
    pub fn for_api_url(api_url: impl Into<String>) -> Self {
        let api_url = api_url.into().trim_end_matches('/').to_string();
        let socket_url = socket_url_for(&api_url);
        Self {
            api_url,
            socket_url,
            login_url: DEFAULT_LOGIN_URL.to_string(),
            http_timeout: Duration::from_secs(30),
            cache: CacheConfig::default(),
        }
    }

    /// Parse configuration from environment variables.
    ///
    /// Environment variables:
    /// - `XPHUB_API_URL`: backend base URL (default: "http://localhost:8000")
    /// - `XPHUB_SOCKET_URL`: push channel URL (default: API URL with ws scheme + "/ws")
    /// - `XPHUB_LOGIN_URL`: login entry point (default: "/login")
    /// - `XPHUB_USER_STALE_SECS`, `XPHUB_LEADERBOARD_STALE_SECS`,
    ///   `XPHUB_LEADERBOARD_REFRESH_SECS`, `XPHUB_HTTP_TIMEOUT_SECS`
    pub fn from_env() -> Self {
        let api_url = std::env::var("XPHUB_API_URL").unwrap_or_else(|_| DEFAULT_API_URL.to_string());
        let mut config = Self::for_api_url(api_url);

        if let Ok(socket_url) = std::env::var("XPHUB_SOCKET_URL") {
            config.socket_url = socket_url;
        }
        if let Ok(login_url) = std::env::var("XPHUB_LOGIN_URL") {
            config.login_url = login_url;
        }
        if let Some(secs) = env_secs("XPHUB_USER_STALE_SECS") {
            config.cache.user_stale_time = secs;
        }
        if let Some(secs) = env_secs("XPHUB_LEADERBOARD_STALE_SECS") {
            config.cache.leaderboard_stale_time = secs;
        }
        if let Some(secs) = env_secs("XPHUB_LEADERBOARD_REFRESH_SECS") {
            config.cache.leaderboard_refresh_interval = secs;
        }
        if let Some(secs) = env_secs("XPHUB_HTTP_TIMEOUT_SECS") {
            config.http_timeout = secs;
        }

        config
    }
}

fn env_secs(name: &str) -> Option<Duration> {
    let raw = std::env::var(name).ok()?;
    match raw.trim().parse::<u64>() {
        Ok(secs) => Some(Duration::from_secs(secs)),
        Err(_) => {
            tracing::warn!(variable = name, value = %raw, "ignoring non-numeric duration");
            None
        }
    }
}

/// Convert an HTTP(S) base URL into the push channel's WS(S) URL.
pub fn socket_url_for(api_url: &str) -> String {
    let base = api_url.trim_end_matches('/');
    let Ok(mut url) = Url::parse(base) else {
        return format!("{base}{WS_PATH}");
    };

    let scheme = match url.scheme() {
        "https" => "wss",
        "http" => "ws",
        other => other,
    }
    .to_string();
    if url.set_scheme(&scheme).is_err() {
        tracing::warn!(api_url, "could not derive push channel scheme");
    }
    let path = format!("{}{WS_PATH}", url.path().trim_end_matches('/'));
    url.set_path(&path);
    url.to_string()
}
