//! Typed handler registry on top of the push connection.
//!
//! Each event kind has its own ordered handler list. Incoming events are
//! matched exhaustively and fanned out to the handlers of their kind, in the
//! order they were registered.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError, RwLock};

use tokio::sync::watch;
use xphub_shared::{EventKind, LevelUpEvent, ServerEvent, ToolUnlockedEvent};

use super::connection::{ConnectionState, ReconnectConfig, WsConnection, WsError, WsHandle};

type Handler<T> = Arc<dyn Fn(&T) + Send + Sync>;
type HandlerList<T> = Vec<(u64, Handler<T>)>;

#[derive(Default)]
struct Registry {
    connection_established: HandlerList<String>,
    level_up: HandlerList<LevelUpEvent>,
    tool_unlocked: HandlerList<ToolUnlockedEvent>,
    pong: HandlerList<Option<i64>>,
}

impl Registry {
    fn remove(&mut self, sub: &Subscription) -> bool {
        fn remove_from<T>(list: &mut HandlerList<T>, id: u64) -> bool {
            let before = list.len();
            list.retain(|(handler_id, _)| *handler_id != id);
            list.len() != before
        }

        match sub.kind {
            EventKind::ConnectionEstablished => remove_from(&mut self.connection_established, sub.id),
            EventKind::LevelUp => remove_from(&mut self.level_up, sub.id),
            EventKind::ToolUnlocked => remove_from(&mut self.tool_unlocked, sub.id),
            EventKind::Pong => remove_from(&mut self.pong, sub.id),
        }
    }

    fn len(&self) -> usize {
        self.connection_established.len() + self.level_up.len() + self.tool_unlocked.len() + self.pong.len()
    }
}

/// Token returned by registration; pass it to [`EventBridge::off`].
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Subscription {
    kind: EventKind,
    id: u64,
}

impl Subscription {
    pub fn kind(&self) -> EventKind {
        self.kind
    }
}

struct Dispatcher {
    handlers: RwLock<Registry>,
    next_id: AtomicU64,
    closed: AtomicBool,
}

impl Dispatcher {
    fn register<T>(&self, kind: EventKind, list: fn(&mut Registry) -> &mut HandlerList<T>, handler: Handler<T>) -> Subscription {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let mut registry = self.handlers.write().unwrap_or_else(PoisonError::into_inner);
        list(&mut *registry).push((id, handler));
        tracing::trace!(event = kind.name(), id, "handler registered");
        Subscription { kind, id }
    }

    fn dispatch(&self, event: &ServerEvent) {
        if self.closed.load(Ordering::Acquire) {
            return;
        }
        tracing::debug!(event = event.kind().name(), "dispatching push event");

        match event {
            ServerEvent::ConnectionEstablished { sid } => self.invoke(|r| &r.connection_established, sid),
            ServerEvent::LevelUp(payload) => self.invoke(|r| &r.level_up, payload),
            ServerEvent::ToolUnlocked(payload) => self.invoke(|r| &r.tool_unlocked, payload),
            ServerEvent::Pong { timestamp } => self.invoke(|r| &r.pong, timestamp),
        }
    }

    /// Run the handlers registered for one kind.
    ///
    /// The list is cloned out first so handlers can register or unregister
    /// while it runs.
    fn invoke<T>(&self, list: fn(&Registry) -> &HandlerList<T>, payload: &T) {
        let handlers: Vec<Handler<T>> = {
            let registry = self.handlers.read().unwrap_or_else(PoisonError::into_inner);
            list(&*registry).iter().map(|(_, h)| h.clone()).collect()
        };

        for handler in handlers {
            if self.closed.load(Ordering::Acquire) {
                break;
            }
            handler(payload);
        }
    }
}

/// The process's single push-channel connection and its handlers.
pub struct EventBridge {
    url: String,
    reconnect: ReconnectConfig,
    dispatcher: Arc<Dispatcher>,
    state: Arc<watch::Sender<ConnectionState>>,
    connection: Mutex<Option<WsConnection>>,
}

impl EventBridge {
    pub fn new(url: impl Into<String>) -> Self {
        Self::with_reconnect(url, ReconnectConfig::default())
    }

    pub fn with_reconnect(url: impl Into<String>, reconnect: ReconnectConfig) -> Self {
        let (state, _) = watch::channel(ConnectionState::Disconnected);
        Self {
            url: url.into(),
            reconnect,
            dispatcher: Arc::new(Dispatcher {
                handlers: RwLock::new(Registry::default()),
                next_id: AtomicU64::new(1),
                closed: AtomicBool::new(false),
            }),
            state: Arc::new(state),
            connection: Mutex::new(None),
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn on_connection_established<F>(&self, handler: F) -> Subscription
    where
        F: Fn(&str) + Send + Sync + 'static,
    {
        self.dispatcher.register(
            EventKind::ConnectionEstablished,
            |r| &mut r.connection_established,
            Arc::new(move |sid: &String| handler(sid)),
        )
    }

    pub fn on_level_up<F>(&self, handler: F) -> Subscription
    where
        F: Fn(&LevelUpEvent) + Send + Sync + 'static,
    {
        self.dispatcher
            .register(EventKind::LevelUp, |r| &mut r.level_up, Arc::new(handler))
    }

    pub fn on_tool_unlocked<F>(&self, handler: F) -> Subscription
    where
        F: Fn(&ToolUnlockedEvent) + Send + Sync + 'static,
    {
        self.dispatcher
            .register(EventKind::ToolUnlocked, |r| &mut r.tool_unlocked, Arc::new(handler))
    }

    /// Handler receives the timestamp the server echoed back, if any.
    pub fn on_pong<F>(&self, handler: F) -> Subscription
    where
        F: Fn(Option<i64>) + Send + Sync + 'static,
    {
        self.dispatcher.register(
            EventKind::Pong,
            |r| &mut r.pong,
            Arc::new(move |timestamp: &Option<i64>| handler(*timestamp)),
        )
    }

    /// Unregister a handler. Returns `false` if it was already gone.
    pub fn off(&self, subscription: &Subscription) -> bool {
        self.dispatcher
            .handlers
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(subscription)
    }

    pub fn handler_count(&self) -> usize {
        self.dispatcher
            .handlers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Deliver an event to its handlers as if it had arrived on the socket.
    pub fn dispatch(&self, event: &ServerEvent) {
        self.dispatcher.dispatch(event);
    }

    /// Start the connection task. Does nothing while one is already running.
    pub fn connect(&self) {
        let mut connection = self.connection.lock().unwrap_or_else(PoisonError::into_inner);
        if connection.as_ref().is_some_and(WsConnection::is_running) {
            return;
        }

        self.dispatcher.closed.store(false, Ordering::Release);
        let dispatcher = self.dispatcher.clone();
        tracing::info!(url = %self.url, "starting push channel");
        *connection = Some(WsConnection::spawn(
            self.url.clone(),
            self.reconnect.clone(),
            self.state.clone(),
            Arc::new(move |event: ServerEvent| dispatcher.dispatch(&event)),
        ));
    }

    /// Close the connection and drop every registered handler.
    pub async fn shutdown(&self) {
        self.dispatcher.closed.store(true, Ordering::Release);
        let cleared = {
            let mut registry = self
                .dispatcher
                .handlers
                .write()
                .unwrap_or_else(PoisonError::into_inner);
            std::mem::take(&mut *registry).len()
        };

        let connection = self
            .connection
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(connection) = connection {
            connection.close().await;
        }

        self.state.send_replace(ConnectionState::Disconnected);
        tracing::info!(url = %self.url, cleared, "push channel shut down");
    }

    pub fn state(&self) -> ConnectionState {
        self.state.borrow().clone()
    }

    pub fn watch_state(&self) -> watch::Receiver<ConnectionState> {
        self.state.subscribe()
    }

    pub fn handle(&self) -> Option<WsHandle> {
        self.connection
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .map(WsConnection::handle)
    }

    pub fn ping(&self) -> Result<(), WsError> {
        self.handle().ok_or(WsError::NotConnected)?.ping()
    }
}

impl std::fmt::Debug for EventBridge {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventBridge")
            .field("url", &self.url)
            .field("state", &self.state())
            .field("handlers", &self.handler_count())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use xphub_shared::RankTier;

    fn level_up(discord_id: &str, new_level: u32) -> ServerEvent {
        ServerEvent::LevelUp(LevelUpEvent {
            discord_id: discord_id.to_string(),
            username: "TestUser".to_string(),
            old_level: new_level - 1,
            new_level,
            new_tier: Some(RankTier::Basic),
            unlocked_tools: vec![],
            timestamp: Some(Utc::now()),
        })
    }

    fn tool_unlocked(discord_id: &str) -> ServerEvent {
        ServerEvent::ToolUnlocked(ToolUnlockedEvent {
            discord_id: discord_id.to_string(),
            tool_id: "voice".to_string(),
            tool_name: "Voice Channels".to_string(),
            timestamp: Some(Utc::now()),
        })
    }

    fn bridge() -> EventBridge {
        EventBridge::new("ws://127.0.0.1:9/ws")
    }

    #[test]
    fn handlers_run_in_registration_order() {
        let bridge = bridge();
        let seen = Arc::new(Mutex::new(Vec::new()));

        for tag in ["first", "second", "third"] {
            let seen = seen.clone();
            bridge.on_level_up(move |event| {
                seen.lock().unwrap().push(format!("{tag}:{}", event.new_level));
            });
        }

        bridge.dispatch(&level_up("1", 4));
        assert_eq!(*seen.lock().unwrap(), vec!["first:4", "second:4", "third:4"]);
    }

    #[test]
    fn dispatch_only_reaches_matching_kind() {
        let bridge = bridge();
        let levels = Arc::new(AtomicU64::new(0));
        let unlocks = Arc::new(AtomicU64::new(0));

        {
            let levels = levels.clone();
            bridge.on_level_up(move |_| {
                levels.fetch_add(1, Ordering::SeqCst);
            });
        }
        {
            let unlocks = unlocks.clone();
            bridge.on_tool_unlocked(move |_| {
                unlocks.fetch_add(1, Ordering::SeqCst);
            });
        }

        bridge.dispatch(&tool_unlocked("1"));
        bridge.dispatch(&tool_unlocked("1"));
        bridge.dispatch(&ServerEvent::Pong { timestamp: Some(1) });

        assert_eq!(levels.load(Ordering::SeqCst), 0);
        assert_eq!(unlocks.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn off_removes_exactly_one_handler() {
        let bridge = bridge();
        let calls = Arc::new(Mutex::new(Vec::new()));

        let a = {
            let calls = calls.clone();
            bridge.on_level_up(move |_| calls.lock().unwrap().push("a"))
        };
        {
            let calls = calls.clone();
            bridge.on_level_up(move |_| calls.lock().unwrap().push("b"));
        }

        assert!(bridge.off(&a));
        assert!(!bridge.off(&a));
        bridge.dispatch(&level_up("1", 2));
        assert_eq!(*calls.lock().unwrap(), vec!["b"]);
        assert_eq!(a.kind(), EventKind::LevelUp);
    }

    #[test]
    fn handler_can_unregister_itself_during_dispatch() {
        let bridge = Arc::new(bridge());
        let calls = Arc::new(AtomicU64::new(0));
        let slot: Arc<Mutex<Option<Subscription>>> = Arc::new(Mutex::new(None));

        let weak = Arc::downgrade(&bridge);
        let sub = {
            let calls = calls.clone();
            let slot = slot.clone();
            bridge.on_tool_unlocked(move |_| {
                calls.fetch_add(1, Ordering::SeqCst);
                let sub = slot.lock().unwrap().take();
                if let (Some(bridge), Some(sub)) = (weak.upgrade(), sub) {
                    bridge.off(&sub);
                }
            })
        };
        *slot.lock().unwrap() = Some(sub);

        bridge.dispatch(&tool_unlocked("1"));
        bridge.dispatch(&tool_unlocked("1"));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(bridge.handler_count(), 0);
    }

    #[test]
    fn typed_payloads_reach_handlers() {
        let bridge = bridge();
        let sid = Arc::new(Mutex::new(String::new()));
        let pong = Arc::new(Mutex::new(None));

        {
            let sid = sid.clone();
            bridge.on_connection_established(move |s| *sid.lock().unwrap() = s.to_string());
        }
        {
            let pong = pong.clone();
            bridge.on_pong(move |ts| *pong.lock().unwrap() = ts);
        }

        bridge.dispatch(&ServerEvent::ConnectionEstablished { sid: "abc".to_string() });
        bridge.dispatch(&ServerEvent::Pong { timestamp: Some(42) });

        assert_eq!(*sid.lock().unwrap(), "abc");
        assert_eq!(*pong.lock().unwrap(), Some(42));
    }

    #[tokio::test]
    async fn shutdown_clears_handlers_and_stops_dispatch() {
        let bridge = bridge();
        let calls = Arc::new(AtomicU64::new(0));
        {
            let calls = calls.clone();
            bridge.on_level_up(move |_| {
                calls.fetch_add(1, Ordering::SeqCst);
            });
        }

        bridge.connect();
        bridge.shutdown().await;

        bridge.dispatch(&level_up("1", 2));
        assert_eq!(calls.load(Ordering::SeqCst), 0);
        assert_eq!(bridge.handler_count(), 0);
        assert_eq!(bridge.state(), ConnectionState::Disconnected);
        assert!(bridge.handle().is_none());
    }

    #[test]
    fn ping_without_connection_fails() {
        assert_eq!(bridge().ping(), Err(WsError::NotConnected));
    }
}
