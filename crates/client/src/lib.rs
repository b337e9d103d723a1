//! xphub client library
//!
//! Data layer for the xphub dashboard: an authenticated HTTP client for the
//! leveling backend, a per-key query cache with staleness and in-flight
//! deduplication, and a push-channel bridge that invalidates cached queries
//! when the backend reports level-ups and tool unlocks.

pub mod api_client;
pub mod auth_session;
pub mod cache;
pub mod config;
pub mod logging;
pub mod queries;
pub mod storage;
pub mod tools;
pub mod ws;

pub use api_client::ApiClient;
pub use auth_session::{AuthSession, AuthStatus};
pub use cache::QueryCache;
pub use config::{CacheConfig, ClientConfig};
pub use queries::{Queries, QueryKey, RefreshHandle, UnlockOutcome, DEFAULT_LEADERBOARD_LIMIT};
pub use storage::{FileStorage, MemoryStorage, Storage};
pub use tools::UnlockState;
pub use xphub_shared::ApiError;
pub use ws::{
    install_cache_invalidation, CacheInvalidation, ConnectionState, EventBridge, ReconnectConfig,
    Subscription,
};
