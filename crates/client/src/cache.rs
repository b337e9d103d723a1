//! Keyed response cache with staleness, in-flight deduplication and invalidation.
//!
//! Each entry remembers the last successful value and when it was fetched.
//! A read returns the cached value while it is fresh; otherwise it starts a
//! fetch or joins the one already running for that key. Fetches run as
//! spawned tasks that store their own result, so callers going away never
//! cancel a request; waiters share the task's output.

use std::fmt::Debug;
use std::future::Future;
use std::hash::Hash;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use futures_util::future::{BoxFuture, FutureExt, Shared};
use tokio::time::Instant;
use xphub_shared::ApiError;

type SharedFetch<V> = Shared<BoxFuture<'static, Result<V, ApiError>>>;

struct Entry<V> {
    value: Option<V>,
    fetched_at: Option<Instant>,
    invalidated: bool,
    /// Fetch currently running for this key, tagged so a detached fetch
    /// cannot overwrite a newer result.
    in_flight: Option<(u64, SharedFetch<V>)>,
}

impl<V> Default for Entry<V> {
    fn default() -> Self {
        Self {
            value: None,
            fetched_at: None,
            invalidated: false,
            in_flight: None,
        }
    }
}

impl<V: Clone> Entry<V> {
    fn fresh_value(&self, stale_time: Duration) -> Option<V> {
        if self.invalidated {
            return None;
        }
        let fetched_at = self.fetched_at?;
        if fetched_at.elapsed() < stale_time {
            self.value.clone()
        } else {
            None
        }
    }
}

pub struct QueryCache<K, V> {
    name: &'static str,
    entries: Arc<DashMap<K, Entry<V>>>,
    stale_time: Duration,
    retries: u32,
    next_fetch_id: AtomicU64,
}

impl<K, V> QueryCache<K, V>
where
    K: Eq + Hash + Clone + Debug + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
{
    /// `retries` is the number of extra attempts after a failed fetch.
    pub fn new(name: &'static str, stale_time: Duration, retries: u32) -> Self {
        Self {
            name,
            entries: Arc::new(DashMap::new()),
            stale_time,
            retries,
            next_fetch_id: AtomicU64::new(1),
        }
    }

    pub fn stale_time(&self) -> Duration {
        self.stale_time
    }

    /// Return the cached value if fresh, otherwise fetch it.
    pub async fn get<F, Fut>(&self, key: K, fetch: F) -> Result<V, ApiError>
    where
        F: Fn() -> Fut + Send + 'static,
        Fut: Future<Output = Result<V, ApiError>> + Send + 'static,
    {
        self.load(key, fetch, false).await
    }

    /// Fetch regardless of staleness. Joins a fetch already in flight.
    pub async fn refetch<F, Fut>(&self, key: K, fetch: F) -> Result<V, ApiError>
    where
        F: Fn() -> Fut + Send + 'static,
        Fut: Future<Output = Result<V, ApiError>> + Send + 'static,
    {
        self.load(key, fetch, true).await
    }

    async fn load<F, Fut>(&self, key: K, fetch: F, force: bool) -> Result<V, ApiError>
    where
        F: Fn() -> Fut + Send + 'static,
        Fut: Future<Output = Result<V, ApiError>> + Send + 'static,
    {
        let (fetch_id, pending) = {
            let mut entry = self.entries.entry(key.clone()).or_default();

            if !force {
                if let Some(value) = entry.fresh_value(self.stale_time) {
                    tracing::trace!(cache = self.name, ?key, "hit");
                    return Ok(value);
                }
            }

            let joined = entry
                .in_flight
                .as_ref()
                .map(|(id, pending)| (*id, pending.clone()));

            match joined {
                Some(joined) => {
                    tracing::trace!(cache = self.name, ?key, "joining in-flight fetch");
                    joined
                }
                None => {
                    let id = self.next_fetch_id.fetch_add(1, Ordering::Relaxed);
                    tracing::debug!(cache = self.name, ?key, force, "fetching");
                    let pending = self.spawn_fetch(key.clone(), id, fetch);
                    entry.in_flight = Some((id, pending.clone()));
                    (id, pending)
                }
            }
        };

        tracing::trace!(cache = self.name, ?key, fetch_id, "awaiting fetch");
        pending.await
    }

    /// Run the fetch on its own task. The task writes the result into the
    /// entry if it is still the entry's current fetch.
    fn spawn_fetch<F, Fut>(&self, key: K, fetch_id: u64, fetch: F) -> SharedFetch<V>
    where
        F: Fn() -> Fut + Send + 'static,
        Fut: Future<Output = Result<V, ApiError>> + Send + 'static,
    {
        let name = self.name;
        let retries = self.retries;
        let entries = self.entries.clone();

        let task = tokio::spawn(async move {
            let result = fetch_with_retry(name, retries, fetch).await;
            match entries.get_mut(&key) {
                Some(mut entry) if matches!(&entry.in_flight, Some((id, _)) if *id == fetch_id) => {
                    entry.in_flight = None;
                    if let Ok(value) = &result {
                        entry.value = Some(value.clone());
                        entry.fetched_at = Some(Instant::now());
                        entry.invalidated = false;
                    }
                }
                _ => tracing::trace!(cache = name, ?key, "discarding detached fetch result"),
            }
            result
        });

        async move {
            task.await
                .unwrap_or_else(|e| Err(ApiError::Network(format!("fetch task failed: {e}"))))
        }
        .boxed()
        .shared()
    }

    /// Mark `key` invalid so the next read fetches, whatever its age.
    ///
    /// A fetch already running for the key is detached: callers awaiting it
    /// still get its result, but it is not stored. Returns `true` if the key
    /// had an entry.
    pub fn invalidate(&self, key: &K) -> bool {
        match self.entries.get_mut(key) {
            Some(mut entry) => {
                entry.invalidated = true;
                entry.in_flight = None;
                tracing::debug!(cache = self.name, ?key, "invalidated");
                true
            }
            None => false,
        }
    }

    /// Invalidate every key matching `predicate`. Returns how many matched.
    pub fn invalidate_where(&self, predicate: impl Fn(&K) -> bool) -> usize {
        let mut count = 0;
        for mut entry in self.entries.iter_mut() {
            if predicate(entry.key()) {
                entry.invalidated = true;
                entry.in_flight = None;
                count += 1;
            }
        }
        if count > 0 {
            tracing::debug!(cache = self.name, count, "invalidated entries");
        }
        count
    }

    pub fn invalidate_all(&self) -> usize {
        self.invalidate_where(|_| true)
    }

    /// Last stored value for `key`, fresh or not.
    pub fn peek(&self, key: &K) -> Option<V> {
        self.entries.get(key).and_then(|entry| entry.value.clone())
    }

    /// Whether a read of `key` right now would be served from the cache.
    pub fn is_fresh(&self, key: &K) -> bool {
        self.entries
            .get(key)
            .map(|entry| entry.fresh_value(self.stale_time).is_some())
            .unwrap_or(false)
    }

    pub fn is_fetching(&self, key: &K) -> bool {
        self.entries
            .get(key)
            .map(|entry| entry.in_flight.is_some())
            .unwrap_or(false)
    }

    pub fn clear(&self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Run `fetch`, retrying immediately up to `retries` times on retryable errors.
async fn fetch_with_retry<V, F, Fut>(name: &'static str, retries: u32, fetch: F) -> Result<V, ApiError>
where
    F: Fn() -> Fut,
    Fut: Future<Output = Result<V, ApiError>>,
{
    let mut attempt = 0;
    loop {
        let attempt_fut = fetch();
        match attempt_fut.await {
            Ok(value) => return Ok(value),
            Err(err) if attempt < retries && err.is_retryable() => {
                attempt += 1;
                tracing::debug!(cache = name, attempt, error = %err, "fetch failed, retrying");
            }
            Err(err) => {
                tracing::warn!(cache = name, error = %err, "fetch failed");
                return Err(err);
            }
        }
    }
}
