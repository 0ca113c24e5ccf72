//! WebSocket and HTTP surface.

use axum::{
    extract::{
        ws::{Message as AxumWsMessage, WebSocket, WebSocketUpgrade},
        Path, State,
    },
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use futures_util::{SinkExt, StreamExt};
use serde::Serialize;
use std::sync::Arc;
use tokio::net::TcpListener;

use crate::gateway::Gateway;
use crate::room::MediaAssets;

#[derive(Clone)]
pub struct AppState {
    gateway: Arc<Gateway>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct CreatedRoom {
    room_id: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct RoomInfo {
    room_id: String,
    media: Option<MediaAssets>,
    members: usize,
    has_host: bool,
}

pub fn router(gateway: Arc<Gateway>) -> Router {
    Router::new()
        .route("/healthz", get(health_check))
        .route("/ws", get(ws_endpoint))
        .route("/rooms", post(create_room))
        .route("/rooms/:room_id", get(room_info))
        .with_state(AppState { gateway })
}

/// Serve until the listener fails or the future is dropped.
pub async fn serve(listener: TcpListener, gateway: Arc<Gateway>) -> anyhow::Result<()> {
    axum::serve(listener, router(gateway)).await?;
    Ok(())
}

async fn health_check() -> &'static str {
    "ok"
}

async fn create_room(
    State(state): State<AppState>,
    media: Option<Json<MediaAssets>>,
) -> impl IntoResponse {
    let room_id = state
        .gateway
        .registry()
        .create_with_media(media.map(|Json(media)| media));
    (StatusCode::CREATED, Json(CreatedRoom { room_id }))
}

async fn room_info(
    State(state): State<AppState>,
    Path(room_id): Path<String>,
) -> Result<Json<RoomInfo>, StatusCode> {
    let room = state
        .gateway
        .registry()
        .get(&room_id)
        .ok_or(StatusCode::NOT_FOUND)?;
    Ok(Json(RoomInfo {
        room_id,
        media: room.media().cloned(),
        members: room.member_count(),
        has_host: room.host_id().is_some(),
    }))
}

async fn ws_endpoint(ws: WebSocketUpgrade, State(state): State<AppState>) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_connection(socket, state))
}

async fn handle_connection(socket: WebSocket, state: AppState) {
    let gateway = state.gateway;
    let (client_id, mut rx) = gateway.connect();
    let (mut ws_sender, mut ws_receiver) = socket.split();

    let send_task = tokio::spawn(async move {
        while let Some(event) = rx.recv().await {
            let json = match serde_json::to_string(&event) {
                Ok(j) => j,
                Err(e) => {
                    tracing::error!("Failed to serialize event: {}", e);
                    continue;
                }
            };

            if let Err(e) = ws_sender.send(AxumWsMessage::Text(json)).await {
                tracing::warn!("Failed to send to client {}: {}", client_id, e);
                break;
            }
        }
    });

    while let Some(msg) = ws_receiver.next().await {
        match msg {
            Ok(AxumWsMessage::Text(text)) => gateway.handle_frame(client_id, &text),
            Ok(AxumWsMessage::Close(_)) => {
                tracing::info!("Client {} closing connection", client_id);
                break;
            }
            Err(e) => {
                tracing::warn!("WebSocket error from {}: {}", client_id, e);
                break;
            }
            _ => {}
        }
    }

    gateway.disconnect(client_id);
    send_task.abort();
}
