//! xphub development backend
//!
//! An in-memory server speaking the leveling backend's REST and push-channel
//! contract, for running and testing the dashboard without the real service.

pub mod config;
pub mod db;
pub mod middleware;
pub mod routes;
pub mod state;
pub mod ws;

use std::net::SocketAddr;

use axum::{
    http::HeaderValue,
    middleware::from_fn_with_state,
    routing::{get, post},
    Router,
};
use tower_http::{
    cors::{AllowOrigin, Any, CorsLayer},
    trace::TraceLayer,
};
use tokio::task::JoinHandle;
use xphub_shared::WS_PATH;

pub use config::{CorsOrigins, ServerConfig};
pub use db::Db;
pub use state::{AppState, RecordedRequest};

pub fn cors_layer(origins: &CorsOrigins) -> CorsLayer {
    let allow_origin = match origins {
        CorsOrigins::Any => AllowOrigin::any(),
        CorsOrigins::List(list) => {
            let values: Vec<HeaderValue> = list
                .iter()
                .filter_map(|origin| match HeaderValue::from_str(origin) {
                    Ok(value) => Some(value),
                    Err(e) => {
                        tracing::warn!(%origin, error = %e, "ignoring invalid CORS origin");
                        None
                    }
                })
                .collect();
            AllowOrigin::list(values)
        }
    };

    CorsLayer::new()
        .allow_origin(allow_origin)
        .allow_methods(Any)
        .allow_headers(Any)
}

/// Build the router. The development event route and request recording are
/// mounted only when `dev_routes` is set.
pub fn app(state: AppState, cors: CorsLayer, dev_routes: bool) -> Router {
    let mut router = Router::new()
        .route("/", get(routes::status::root))
        .route("/health", get(routes::status::health))
        // Users
        .route("/api/users/{discord_id}", get(routes::users::get_user))
        // Leveling
        .route("/api/leveling/leaderboard", get(routes::leveling::leaderboard))
        // Tools
        .route("/api/tools", get(routes::tools::list_tools))
        .route("/api/tools/user/{discord_id}", get(routes::tools::user_tools))
        .route(
            "/api/tools/unlock/{discord_id}/{tool_id}",
            post(routes::tools::unlock_tool),
        )
        // WebSocket
        .route(WS_PATH, get(ws::ws_handler));

    if dev_routes {
        router = router.route("/api/dev/events", post(routes::dev::push_event));
    }

    router = router.layer(from_fn_with_state(
        state.clone(),
        middleware::auth::reject_revoked_tokens,
    ));
    if dev_routes {
        router = router.layer(from_fn_with_state(
            state.clone(),
            middleware::record::record_requests,
        ));
    }

    router
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

/// Router with permissive CORS and development routes, for tests.
pub fn dev_app(state: AppState) -> Router {
    app(state, cors_layer(&CorsOrigins::Any), true)
}

/// Serve [`dev_app`] on `addr` in a background task. Bind port 0 to get an
/// ephemeral port; the bound address is returned.
pub async fn spawn_dev_server(
    addr: SocketAddr,
    state: AppState,
) -> std::io::Result<(SocketAddr, JoinHandle<()>)> {
    spawn_server(addr, dev_app(state)).await
}

/// Serve `router` on `addr` in a background task.
pub async fn spawn_server(addr: SocketAddr, router: Router) -> std::io::Result<(SocketAddr, JoinHandle<()>)> {
    let listener = tokio::net::TcpListener::bind(addr).await?;
    let local_addr = listener.local_addr()?;

    let task = tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, router).await {
            tracing::error!(error = %e, "server stopped");
        }
    });

    tracing::debug!(addr = %local_addr, "server listening");
    Ok((local_addr, task))
}
