//! Real-time push channel.
//!
//! [`EventBridge`] owns one WebSocket connection to the backend and a typed
//! handler list per event kind. [`install_cache_invalidation`] wires the
//! `level_up` and `tool_unlocked` events to the query cache.
//!
//! ```rust,ignore
//! let bridge = EventBridge::new(config.socket_url.clone());
//! let _wiring = install_cache_invalidation(&bridge, &queries);
//! bridge.connect();
//! ```

mod bridge;
mod connection;
mod sync;

pub use bridge::{EventBridge, Subscription};
pub use connection::{ConnectionState, ReconnectConfig, WsConnection, WsError, WsHandle};
pub use sync::{install_cache_invalidation, CacheInvalidation};
