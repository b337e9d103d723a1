//! Application state shared across request handlers.

use std::collections::{HashSet, VecDeque};
use std::sync::{Arc, Mutex, PoisonError};

use tokio::sync::{broadcast, RwLock};
use uuid::Uuid;
use xphub_shared::{ServerEvent, WsEnvelope};

use crate::db::Db;

const EVENT_CAPACITY: usize = 100;

/// Oldest recorded requests are dropped past this many.
pub const MAX_RECORDED_REQUESTS: usize = 1000;

/// A request as seen by the recording middleware.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedRequest {
    pub method: String,
    pub path: String,
    pub authorization: Option<String>,
}

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub db: Arc<RwLock<Db>>,
    pub events: broadcast::Sender<WsEnvelope<ServerEvent>>,
    pub environment: String,
    requests: Arc<Mutex<VecDeque<RecordedRequest>>>,
    rejected_tokens: Arc<Mutex<HashSet<String>>>,
}

impl AppState {
    pub fn new(db: Db) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            db: Arc::new(RwLock::new(db)),
            events,
            environment: "development".to_string(),
            requests: Arc::new(Mutex::new(VecDeque::new())),
            rejected_tokens: Arc::new(Mutex::new(HashSet::new())),
        }
    }

    pub fn with_environment(mut self, environment: impl Into<String>) -> Self {
        self.environment = environment.into();
        self
    }

    /// Push an event to every connected socket. Returns how many received it.
    pub fn broadcast(&self, event: ServerEvent) -> usize {
        let kind = event.kind().name();
        let envelope = WsEnvelope::new(Uuid::new_v4().to_string(), event);
        match self.events.send(envelope) {
            Ok(receivers) => {
                tracing::debug!(event = kind, receivers, "broadcast push event");
                receivers
            }
            Err(_) => {
                tracing::debug!(event = kind, "no sockets connected, event dropped");
                0
            }
        }
    }

    pub fn record_request(&self, request: RecordedRequest) {
        let mut requests = self.requests.lock().unwrap_or_else(PoisonError::into_inner);
        if requests.len() == MAX_RECORDED_REQUESTS {
            requests.pop_front();
        }
        requests.push_back(request);
    }

    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.requests
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .cloned()
            .collect()
    }

    /// Number of recorded requests to `path`, any method.
    pub fn request_count(&self, path: &str) -> usize {
        self.requests
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .filter(|r| r.path == path)
            .count()
    }

    pub fn clear_requests(&self) {
        self.requests
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }

    /// Make every later request bearing `token` fail with 401.
    pub fn reject_token(&self, token: impl Into<String>) {
        self.rejected_tokens
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(token.into());
    }

    pub fn is_rejected(&self, token: &str) -> bool {
        self.rejected_tokens
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .contains(token)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(path: &str) -> RecordedRequest {
        RecordedRequest {
            method: "GET".to_string(),
            path: path.to_string(),
            authorization: None,
        }
    }

    #[test]
    fn request_log_is_bounded() {
        let state = AppState::new(Db::default());
        state.record_request(request("/first"));
        for _ in 0..MAX_RECORDED_REQUESTS {
            state.record_request(request("/health"));
        }

        assert_eq!(state.requests().len(), MAX_RECORDED_REQUESTS);
        assert_eq!(state.request_count("/first"), 0);
        assert_eq!(state.request_count("/health"), MAX_RECORDED_REQUESTS);

        state.clear_requests();
        assert!(state.requests().is_empty());
    }

    #[test]
    fn rejected_tokens() {
        let state = AppState::new(Db::default());
        assert!(!state.is_rejected("tok"));
        state.reject_token("tok");
        assert!(state.is_rejected("tok"));
    }
}
