//! WebSocket push channel.

use axum::{
    extract::{
        ws::{Message, WebSocket},
        State, WebSocketUpgrade,
    },
    response::Response,
};
use futures_util::{SinkExt, StreamExt};
use tokio::sync::{broadcast, mpsc};
use uuid::Uuid;
use xphub_shared::{ClientCommand, ServerEvent, WsEnvelope};

use crate::state::AppState;

pub async fn ws_handler(State(state): State<AppState>, ws: WebSocketUpgrade) -> Response {
    // Subscribe before the upgrade so nothing broadcast after the handshake is missed.
    let events = state.events.subscribe();
    ws.on_upgrade(move |socket| handle_socket(socket, events))
}

async fn handle_socket(socket: WebSocket, mut events: broadcast::Receiver<WsEnvelope<ServerEvent>>) {
    let (mut sender, mut receiver) = socket.split();
    let sid = Uuid::new_v4().to_string();
    tracing::info!(%sid, "push client connected");

    let (forward_tx, mut forward_rx) = mpsc::unbounded_channel::<WsEnvelope<ServerEvent>>();

    let _ = forward_tx.send(envelope(ServerEvent::ConnectionEstablished { sid: sid.clone() }));

    // Broadcast events for every client
    let forward_broadcast = forward_tx.clone();
    let broadcast_task = tokio::spawn(async move {
        loop {
            match events.recv().await {
                Ok(event) => {
                    if forward_broadcast.send(event).is_err() {
                        break;
                    }
                }
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    tracing::warn!(skipped, "push client lagged behind broadcast");
                }
                Err(broadcast::error::RecvError::Closed) => break,
            }
        }
    });

    // Task to forward events to the WebSocket
    let send_task = tokio::spawn(async move {
        while let Some(event) = forward_rx.recv().await {
            let json = match serde_json::to_string(&event) {
                Ok(json) => json,
                Err(e) => {
                    tracing::error!(error = %e, "failed to serialize push event");
                    continue;
                }
            };
            if sender.send(Message::Text(json.into())).await.is_err() {
                break;
            }
        }
    });

    while let Some(msg) = receiver.next().await {
        match msg {
            Ok(Message::Text(text)) => {
                match serde_json::from_str::<WsEnvelope<ClientCommand>>(text.as_str()) {
                    Ok(command) => handle_client_command(command.payload, &forward_tx),
                    Err(e) => tracing::debug!(%sid, error = %e, "ignoring unrecognized client frame"),
                }
            }
            Ok(Message::Close(_)) => break,
            Err(_) => break,
            _ => {}
        }
    }

    broadcast_task.abort();
    send_task.abort();
    tracing::info!(%sid, "push client disconnected");
}

fn handle_client_command(command: ClientCommand, forward_tx: &mpsc::UnboundedSender<WsEnvelope<ServerEvent>>) {
    match command {
        ClientCommand::Ping { timestamp } => {
            let _ = forward_tx.send(envelope(ServerEvent::Pong {
                timestamp: Some(timestamp),
            }));
        }
    }
}

fn envelope(event: ServerEvent) -> WsEnvelope<ServerEvent> {
    WsEnvelope::new(Uuid::new_v4().to_string(), event)
}
