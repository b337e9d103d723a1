//! Push events that invalidate cached queries.

use std::sync::Arc;

use crate::queries::{Queries, QueryKey};

use super::bridge::{EventBridge, Subscription};

/// Handlers installed by [`install_cache_invalidation`].
#[derive(Debug)]
pub struct CacheInvalidation {
    subscriptions: Vec<Subscription>,
}

impl CacheInvalidation {
    /// Unregister the invalidation handlers.
    pub fn uninstall(self, bridge: &EventBridge) {
        for sub in &self.subscriptions {
            bridge.off(sub);
        }
    }
}

/// Invalidate cached queries when the backend reports a change.
///
/// - `level_up` invalidates the levelled-up user's record.
/// - `tool_unlocked` invalidates the signed-in user's tools list, and the
///   event subject's list when that is someone else.
///
/// Invalidation happens inside dispatch; the refetch waits for the next read.
pub fn install_cache_invalidation(bridge: &EventBridge, queries: &Arc<Queries>) -> CacheInvalidation {
    let level_up = {
        let queries = queries.clone();
        bridge.on_level_up(move |event| {
            tracing::info!(
                discord_id = %event.discord_id,
                old_level = event.old_level,
                new_level = event.new_level,
                tier = ?event.new_tier,
                "level up"
            );
            queries.invalidate(&QueryKey::User(event.discord_id.clone()));
        })
    };

    let tool_unlocked = {
        let queries = queries.clone();
        bridge.on_tool_unlocked(move |event| {
            tracing::info!(discord_id = %event.discord_id, tool = %event.tool_name, "tool unlocked");
            let current = queries.session().discord_id();
            if let Some(current) = &current {
                queries.invalidate(&QueryKey::Tools(current.clone()));
            }
            if current.as_deref() != Some(event.discord_id.as_str()) {
                queries.invalidate(&QueryKey::Tools(event.discord_id.clone()));
            }
        })
    };

    CacheInvalidation {
        subscriptions: vec![level_up, tool_unlocked],
    }
}
