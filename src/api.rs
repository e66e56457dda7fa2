//! HTTP surface for the state mirror
//!
//! One listener serves `GET /data` (full snapshot, permissive CORS so a
//! dashboard on another origin can poll it) with every other path falling
//! back to the static dashboard files. An optional second listener pushes
//! each update over a WebSocket instead of waiting for polls.

use anyhow::{Context, Result};
use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use serde::Serialize;
use std::collections::HashMap;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower_http::{
    cors::{Any, CorsLayer},
    services::ServeDir,
};
use tracing::{debug, info, warn};

use crate::state::{StateStore, StateTag, UpdateNotice};

/// Shared state for HTTP handlers
pub struct ApiState {
    /// The mirror the pipeline writes into
    pub store: StateStore,
    /// Update channel the push listener subscribes to
    pub updates: broadcast::Sender<UpdateNotice>,
}

/// One entry of the `/data` response
#[derive(Debug, Serialize)]
pub struct DataEntry {
    pub state: StateTag,
    pub data: serde_json::Value,
}

/// Build the polling router: `/data` plus static dashboard fallback
pub fn build_router(state: Arc<ApiState>, static_dir: PathBuf) -> Router {
    Router::new()
        .route("/data", get(get_data))
        .fallback_service(ServeDir::new(static_dir))
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(state)
}

/// GET /data - full current snapshot, one entry per known file
async fn get_data(State(state): State<Arc<ApiState>>) -> Json<HashMap<String, DataEntry>> {
    let entries = state
        .store
        .snapshot()
        .into_iter()
        .map(|(filename, record)| {
            (
                filename,
                DataEntry {
                    state: record.tag,
                    data: record.payload,
                },
            )
        })
        .collect();
    Json(entries)
}

/// Build the push router: a single WebSocket route
pub fn build_push_router(state: Arc<ApiState>) -> Router {
    Router::new()
        .route("/ws", get(state_updates_ws))
        .with_state(state)
}

/// GET /ws - WebSocket push of every state update
async fn state_updates_ws(
    ws: WebSocketUpgrade,
    State(state): State<Arc<ApiState>>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_websocket(socket, state.updates.subscribe()))
}

/// Forward updates to one client until either side goes away.
///
/// A failed send ends only this task; other clients have their own
/// subscriptions and never notice.
async fn handle_websocket(mut socket: WebSocket, mut rx: broadcast::Receiver<UpdateNotice>) {
    debug!("WebSocket client connected for state updates");

    loop {
        tokio::select! {
            result = rx.recv() => {
                match result {
                    Ok(notice) => {
                        let msg = match serde_json::to_string(&notice) {
                            Ok(msg) => msg,
                            Err(e) => {
                                warn!("failed to serialize update: {}", e);
                                continue;
                            }
                        };
                        if socket.send(Message::Text(msg)).await.is_err() {
                            debug!("WebSocket client disconnected");
                            break;
                        }
                    }
                    Err(broadcast::error::RecvError::Closed) => {
                        debug!("update channel closed");
                        break;
                    }
                    Err(broadcast::error::RecvError::Lagged(n)) => {
                        warn!("WebSocket client lagged by {} updates", n);
                    }
                }
            }
            result = socket.recv() => {
                match result {
                    Some(Ok(Message::Close(_))) | None => {
                        debug!("WebSocket client closed connection");
                        break;
                    }
                    Some(Ok(Message::Ping(data))) => {
                        if socket.send(Message::Pong(data)).await.is_err() {
                            break;
                        }
                    }
                    Some(Ok(_)) => {
                        // No client-to-server messages are defined.
                    }
                    Some(Err(e)) => {
                        warn!("WebSocket error: {}", e);
                        break;
                    }
                }
            }
        }
    }
}

/// Bind a listener on all interfaces; failure here is a startup error.
pub async fn bind(port: u16) -> Result<TcpListener> {
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))
}

/// Serve the polling endpoint and dashboard assets
pub async fn serve_http(
    listener: TcpListener,
    state: Arc<ApiState>,
    static_dir: PathBuf,
) -> Result<()> {
    info!(
        "serving dashboard and /data on http://{}",
        listener.local_addr()?
    );
    axum::serve(listener, build_router(state, static_dir))
        .await
        .context("HTTP server error")?;
    Ok(())
}

/// Serve the push WebSocket listener
pub async fn serve_push(listener: TcpListener, state: Arc<ApiState>) -> Result<()> {
    info!(
        "pushing state updates on ws://{}/ws",
        listener.local_addr()?
    );
    axum::serve(listener, build_push_router(state))
        .await
        .context("push server error")?;
    Ok(())
}
