//! Development-only routes for driving the push channel by hand.

use axum::{extract::State, Json};
use serde::Serialize;
use xphub_shared::ServerEvent;

use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct Delivered {
    pub event: &'static str,
    pub receivers: usize,
}

/// Broadcast an arbitrary event, e.g.
/// `{"event": "level_up", "data": {...}}`.
pub async fn push_event(State(state): State<AppState>, Json(event): Json<ServerEvent>) -> Json<Delivered> {
    let kind = event.kind().name();
    let receivers = state.broadcast(event);
    Json(Delivered {
        event: kind,
        receivers,
    })
}
