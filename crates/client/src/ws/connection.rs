//! WebSocket connection with state management and auto-reconnect.

use std::sync::Arc;
use std::time::Duration;

use futures_channel::mpsc::{unbounded, UnboundedReceiver, UnboundedSender};
use futures_util::{SinkExt, StreamExt};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_tungstenite::{connect_async, tungstenite::Message};
use xphub_shared::{ClientCommand, EventKind, ServerEvent, WsEnvelope};

/// Connection state for the push channel
#[derive(Debug, Clone, PartialEq)]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Connected,
    Reconnecting { attempt: u32 },
    Failed { reason: String },
}

impl ConnectionState {
    pub fn is_connected(&self) -> bool {
        matches!(self, ConnectionState::Connected)
    }

    pub fn is_connecting(&self) -> bool {
        matches!(
            self,
            ConnectionState::Connecting | ConnectionState::Reconnecting { .. }
        )
    }
}

/// Configuration for auto-reconnect behavior
#[derive(Debug, Clone)]
pub struct ReconnectConfig {
    /// Maximum number of reconnect attempts (0 = infinite)
    pub max_attempts: u32,
    /// Initial delay in milliseconds
    pub initial_delay_ms: u32,
    /// Maximum delay in milliseconds
    pub max_delay_ms: u32,
    /// Multiplier for exponential backoff
    pub backoff_multiplier: f32,
}

impl Default for ReconnectConfig {
    fn default() -> Self {
        Self {
            max_attempts: 0,
            initial_delay_ms: 1000,
            max_delay_ms: 30000,
            backoff_multiplier: 1.5,
        }
    }
}

impl ReconnectConfig {
    /// Calculate delay for a given attempt number
    pub fn delay_for_attempt(&self, attempt: u32) -> u32 {
        let delay = self.initial_delay_ms as f32 * self.backoff_multiplier.powi(attempt as i32);
        (delay as u32).min(self.max_delay_ms)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum WsError {
    #[error("push channel is not connected")]
    NotConnected,
    #[error("push channel is closed")]
    Closed,
}

/// Handle for sending commands through the push channel
#[derive(Debug, Clone)]
pub struct WsHandle {
    sender: UnboundedSender<WsEnvelope<ClientCommand>>,
    state: watch::Receiver<ConnectionState>,
}

impl WsHandle {
    /// Queue a command; it is written once the socket is up.
    pub fn send(&self, cmd: ClientCommand) -> Result<(), WsError> {
        tracing::debug!(?cmd, "queueing command");
        let envelope = WsEnvelope::new(uuid::Uuid::new_v4().to_string(), cmd);
        self.sender
            .unbounded_send(envelope)
            .map_err(|_| WsError::Closed)
    }

    /// Send a liveness ping carrying the local clock. Only sent while connected.
    pub fn ping(&self) -> Result<(), WsError> {
        if !self.state.borrow().is_connected() {
            return Err(WsError::NotConnected);
        }
        self.send(ClientCommand::Ping {
            timestamp: chrono::Utc::now().timestamp_millis(),
        })
    }
}

pub(crate) type EventSink = Arc<dyn Fn(ServerEvent) + Send + Sync>;

/// A managed connection to the backend's push channel.
///
/// Dropping it ends the background task: the loop exits once its shutdown
/// and command channels close.
pub struct WsConnection {
    url: String,
    state: Arc<watch::Sender<ConnectionState>>,
    sender: UnboundedSender<WsEnvelope<ClientCommand>>,
    shutdown: watch::Sender<bool>,
    task: JoinHandle<()>,
}

impl WsConnection {
    /// Start the connection loop in a background tokio task.
    pub(crate) fn spawn(
        url: String,
        reconnect_config: ReconnectConfig,
        state: Arc<watch::Sender<ConnectionState>>,
        on_event: EventSink,
    ) -> Self {
        let (sender, receiver) = unbounded();
        let (shutdown, shutdown_rx) = watch::channel(false);

        let task = tokio::spawn(run_connection_loop(
            url.clone(),
            state.clone(),
            receiver,
            on_event,
            reconnect_config,
            shutdown_rx,
        ));

        Self {
            url,
            state,
            sender,
            shutdown,
            task,
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// Get a handle for sending commands
    pub fn handle(&self) -> WsHandle {
        WsHandle {
            sender: self.sender.clone(),
            state: self.state.subscribe(),
        }
    }

    pub fn is_running(&self) -> bool {
        !self.task.is_finished()
    }

    /// Close the socket and wait for the loop to stop.
    pub async fn close(self) {
        let _ = self.shutdown.send(true);
        if let Err(e) = self.task.await {
            if !e.is_cancelled() {
                tracing::error!(error = %e, "push channel task failed");
            }
        }
        self.state.send_replace(ConnectionState::Disconnected);
    }
}

/// How an established socket ended.
enum SocketEnd {
    /// Server or network dropped it; reconnect.
    Lost,
    /// We asked for it; stop.
    Closed,
}

async fn run_connection_loop(
    url: String,
    state: Arc<watch::Sender<ConnectionState>>,
    mut receiver: UnboundedReceiver<WsEnvelope<ClientCommand>>,
    on_event: EventSink,
    reconnect_config: ReconnectConfig,
    mut shutdown: watch::Receiver<bool>,
) {
    let mut attempt = 0u32;

    loop {
        if *shutdown.borrow() {
            break;
        }

        if attempt == 0 {
            state.send_replace(ConnectionState::Connecting);
        } else {
            state.send_replace(ConnectionState::Reconnecting { attempt });
        }

        let connected = tokio::select! {
            result = connect_async(url.as_str()) => result,
            _ = shutdown.changed() => break,
        };

        match connected {
            Ok((ws_stream, _response)) => {
                state.send_replace(ConnectionState::Connected);
                attempt = 0;
                tracing::info!(%url, "push channel connected");

                let (mut write, mut read) = ws_stream.split();

                let end = loop {
                    tokio::select! {
                        msg = read.next() => match msg {
                            Some(Ok(Message::Text(text))) => {
                                tracing::trace!(frame = %text.as_str(), "push frame");
                                if let Some(event) = decode_frame(text.as_str()) {
                                    on_event(event);
                                }
                            }
                            Some(Ok(Message::Close(_))) => {
                                tracing::info!(%url, "push channel received close frame");
                                break SocketEnd::Lost;
                            }
                            // Pongs are answered by tungstenite; binary frames are not part of the protocol.
                            Some(Ok(_)) => {}
                            Some(Err(e)) => {
                                tracing::warn!(error = %e, "push channel read error");
                                break SocketEnd::Lost;
                            }
                            None => break SocketEnd::Lost,
                        },
                        cmd = receiver.next() => match cmd {
                            Some(cmd) => match serde_json::to_string(&cmd) {
                                Ok(json) => {
                                    if let Err(e) = write.send(Message::Text(json.into())).await {
                                        tracing::warn!(error = %e, "push channel send failed");
                                        break SocketEnd::Lost;
                                    }
                                }
                                Err(e) => tracing::error!(error = %e, "failed to serialize command"),
                            },
                            None => break SocketEnd::Closed,
                        },
                        _ = shutdown.changed() => {
                            let _ = write.send(Message::Close(None)).await;
                            break SocketEnd::Closed;
                        }
                    }
                };

                state.send_replace(ConnectionState::Disconnected);
                match end {
                    SocketEnd::Closed => {
                        tracing::info!(%url, "push channel closed");
                        break;
                    }
                    SocketEnd::Lost => tracing::info!(%url, "push channel lost, reconnecting"),
                }
            }
            Err(e) => {
                tracing::warn!(%url, error = %e, attempt, "push channel connect failed");

                if reconnect_config.max_attempts > 0 && attempt >= reconnect_config.max_attempts {
                    state.send_replace(ConnectionState::Failed {
                        reason: format!(
                            "Max reconnect attempts ({}) exceeded",
                            reconnect_config.max_attempts
                        ),
                    });
                    return;
                }

                let delay = reconnect_config.delay_for_attempt(attempt);
                tracing::debug!(%url, delay_ms = delay, attempt = attempt + 1, "reconnecting");
                tokio::select! {
                    _ = tokio::time::sleep(Duration::from_millis(u64::from(delay))) => {}
                    _ = shutdown.changed() => break,
                }
                attempt += 1;
            }
        }
    }

    state.send_replace(ConnectionState::Disconnected);
}

/// Decode a text frame. Frames of a known event that fail to decode are
/// logged at warn; anything else at debug.
fn decode_frame(text: &str) -> Option<ServerEvent> {
    match serde_json::from_str::<WsEnvelope<ServerEvent>>(text) {
        Ok(frame) => Some(frame.payload),
        Err(e) => {
            let kind = serde_json::from_str::<serde_json::Value>(text)
                .ok()
                .and_then(|value| value.get("event")?.as_str().and_then(EventKind::from_name));
            match kind {
                Some(kind) => tracing::warn!(event = kind.name(), error = %e, "dropping malformed push event"),
                None => tracing::debug!(error = %e, "skipping unrecognized frame"),
            }
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backoff_grows_and_caps() {
        let config = ReconnectConfig::default();
        assert_eq!(config.delay_for_attempt(0), 1000);
        assert_eq!(config.delay_for_attempt(1), 1500);
        assert_eq!(config.delay_for_attempt(2), 2250);
        assert_eq!(config.delay_for_attempt(20), 30000);
    }

    #[test]
    fn state_predicates() {
        assert!(ConnectionState::Connected.is_connected());
        assert!(ConnectionState::Reconnecting { attempt: 2 }.is_connecting());
        assert!(!ConnectionState::Disconnected.is_connecting());
    }

    #[tokio::test]
    async fn ping_requires_connection() {
        let (state, _) = watch::channel(ConnectionState::Disconnected);
        let state = Arc::new(state);
        let (sender, _receiver) = unbounded();
        let handle = WsHandle {
            sender,
            state: state.subscribe(),
        };

        assert_eq!(handle.ping(), Err(WsError::NotConnected));
        state.send_replace(ConnectionState::Connected);
        assert_eq!(handle.ping(), Ok(()));
    }

    #[tokio::test]
    async fn gives_up_after_max_attempts() {
        let (state, mut state_rx) = watch::channel(ConnectionState::Disconnected);
        let config = ReconnectConfig {
            max_attempts: 2,
            initial_delay_ms: 10,
            max_delay_ms: 10,
            backoff_multiplier: 1.0,
        };
        let connection = WsConnection::spawn(
            "ws://127.0.0.1:9/ws".to_string(),
            config,
            Arc::new(state),
            Arc::new(|_| {}),
        );

        let failed = state_rx
            .wait_for(|s| matches!(s, ConnectionState::Failed { .. }))
            .await
            .map(|s| s.clone());
        assert!(matches!(failed, Ok(ConnectionState::Failed { .. })));
        assert!(connection.handle().ping().is_err());
    }

    #[test]
    fn decodes_backend_level_up_frame() {
        let text = r#"{"event":"level_up","data":{"discord_id":"123","old_level":2,"new_level":3,"timestamp":"2026-01-01T00:00:00.123456"}}"#;
        let event = decode_frame(text).unwrap();
        assert_eq!(event.kind(), EventKind::LevelUp);
        assert_eq!(event.discord_id(), Some("123"));
    }

    #[test]
    fn undecodable_frames_are_dropped() {
        assert!(decode_frame(r#"{"event":"level_up","data":{"new_level":3}}"#).is_none());
        assert!(decode_frame(r#"{"event":"xp_gained","data":{}}"#).is_none());
        assert!(decode_frame("not json").is_none());
    }
}
