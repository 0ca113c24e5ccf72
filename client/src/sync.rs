use anyhow::{Context, Result};
use futures_util::{SinkExt, StreamExt};
use parking_lot::Mutex;
use std::{sync::Arc, time::Instant};
use tokio::{
    sync::{mpsc, oneshot},
    time::sleep,
};
use tokio_tungstenite::{connect_async, tungstenite::Message as WsMessage};
use uuid::Uuid;

use crate::constants::KEEPALIVE_INTERVAL;
use crate::protocol::{ClientEvent, PlaybackAction, ServerEvent};

/// Owns the WebSocket to the sync server
pub struct SyncClient {
    inner: Arc<SyncClientState>,
}

struct SyncClientState {
    tx: Mutex<Option<mpsc::UnboundedSender<WsMessage>>>,
    stats: Mutex<SyncStats>,
}

#[derive(Default, Clone)]
struct SyncStats {
    bytes_out: u64,
    bytes_in: u64,
    messages_out: u64,
    messages_in: u64,
    last_message_at: Option<Instant>,
    last_ping_sent: Option<Instant>,
    last_ping_nonce: Option<u64>,
    last_rtt_ms: Option<f32>,
    connected_since: Option<Instant>,
}

#[derive(Debug, Clone)]
pub struct SyncStatsSnapshot {
    pub bytes_out: u64,
    pub bytes_in: u64,
    pub messages_out: u64,
    pub messages_in: u64,
    pub last_rtt_ms: Option<f32>,
    pub last_message_age: Option<f32>,
    pub connected_duration: Option<f32>,
}

impl SyncClient {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(SyncClientState {
                tx: Mutex::new(None),
                stats: Mutex::new(SyncStats::default()),
            }),
        }
    }

    /// Connect to the sync server. Returns a receiver that resolves when the socket closes.
    pub async fn connect<F>(&self, server_url: &str, on_event: F) -> Result<oneshot::Receiver<()>>
    where
        F: Fn(ServerEvent) + Send + Sync + 'static,
    {
        let (ws_stream, _) = connect_async(server_url)
            .await
            .with_context(|| format!("Failed to connect to {server_url}"))?;

        let (mut ws_sender, mut ws_receiver) = ws_stream.split();
        let (tx, mut rx) = mpsc::unbounded_channel::<WsMessage>();
        *self.inner.tx.lock() = Some(tx);
        self.inner.stats.lock().connected_since = Some(Instant::now());

        let (disconnect_tx, disconnect_rx) = oneshot::channel();
        let disconnect_signal = Arc::new(Mutex::new(Some(disconnect_tx)));

        // Sender task
        let send_inner = Arc::clone(&self.inner);
        let send_signal = Arc::clone(&disconnect_signal);
        tokio::spawn(async move {
            while let Some(msg) = rx.recv().await {
                if ws_sender.send(msg).await.is_err() {
                    break;
                }
            }
            send_inner.clear_transport();
            if let Some(tx) = send_signal.lock().take() {
                let _ = tx.send(());
            }
        });

        let handler = Arc::new(on_event);
        let recv_inner = Arc::clone(&self.inner);
        let recv_signal = Arc::clone(&disconnect_signal);
        tokio::spawn(async move {
            while let Some(msg) = ws_receiver.next().await {
                match msg {
                    Ok(WsMessage::Text(text)) => {
                        recv_inner.record_incoming(text.len() as u64);
                        match serde_json::from_str::<ServerEvent>(text.as_str()) {
                            Ok(event) => handler(event),
                            Err(e) => tracing::debug!("Ignoring unknown server frame: {}", e),
                        }
                    }
                    Ok(WsMessage::Pong(payload)) => recv_inner.handle_ws_pong(&payload),
                    Ok(WsMessage::Close(_)) => break,
                    Err(e) => {
                        tracing::warn!("WebSocket error: {}", e);
                        break;
                    }
                    _ => {}
                }
            }
            recv_inner.clear_transport();
            if let Some(tx) = recv_signal.lock().take() {
                let _ = tx.send(());
            }
        });

        // Keep-alive pings
        let ping_inner = Arc::clone(&self.inner);
        tokio::spawn(async move {
            loop {
                sleep(KEEPALIVE_INTERVAL).await;
                if ping_inner.send_keepalive().is_err() {
                    break;
                }
            }
        });

        Ok(disconnect_rx)
    }

    pub fn join_room(&self, room_id: &str, as_host: bool) -> Result<()> {
        self.send_event(ClientEvent::JoinRoom {
            room_id: room_id.to_string(),
            as_host,
        })
    }

    /// Ignored by the server unless this connection is the room's host
    pub fn control(&self, room_id: &str, action: PlaybackAction, current_time: f64) -> Result<()> {
        self.send_event(ClientEvent::Control {
            room_id: room_id.to_string(),
            action,
            current_time,
        })
    }

    pub fn request_sync(&self, room_id: &str) -> Result<()> {
        self.send_event(ClientEvent::RequestSync {
            room_id: room_id.to_string(),
        })
    }

    pub fn stats_snapshot(&self) -> SyncStatsSnapshot {
        self.inner.snapshot()
    }

    fn send_event(&self, event: ClientEvent) -> Result<()> {
        let json = serde_json::to_string(&event).context("Failed to serialize event")?;
        self.inner.record_outgoing(json.len() as u64);
        let tx = self
            .inner
            .tx
            .lock()
            .clone()
            .context("Not connected to the sync server")?;
        tx.send(WsMessage::Text(json.into()))
            .context("Failed to queue message to socket")?;
        Ok(())
    }
}

impl SyncClientState {
    fn record_outgoing(&self, bytes: u64) {
        let mut stats = self.stats.lock();
        stats.bytes_out += bytes;
        stats.messages_out += 1;
        stats.last_message_at = Some(Instant::now());
    }

    fn record_incoming(&self, bytes: u64) {
        let mut stats = self.stats.lock();
        stats.bytes_in += bytes;
        stats.messages_in += 1;
        stats.last_message_at = Some(Instant::now());
    }

    fn handle_ws_pong(&self, payload: &[u8]) {
        self.record_incoming(payload.len() as u64);
        if payload.len() < 8 {
            return;
        }
        let mut nonce_bytes = [0u8; 8];
        nonce_bytes.copy_from_slice(&payload[..8]);
        self.record_pong(u64::from_le_bytes(nonce_bytes));
    }

    fn record_pong(&self, nonce: u64) {
        let mut stats = self.stats.lock();
        if stats.last_ping_nonce == Some(nonce) {
            if let Some(sent) = stats.last_ping_sent {
                stats.last_rtt_ms = Some(sent.elapsed().as_secs_f32() * 1000.0);
            }
            stats.last_ping_nonce = None;
            stats.last_ping_sent = None;
        }
    }

    fn send_keepalive(&self) -> Result<(), ()> {
        let nonce = Uuid::new_v4().as_u128() as u64;
        {
            let mut stats = self.stats.lock();
            stats.last_ping_nonce = Some(nonce);
            stats.last_ping_sent = Some(Instant::now());
        }
        let tx = self.tx.lock().clone().ok_or(())?;
        tx.send(WsMessage::Ping(nonce.to_le_bytes().to_vec().into()))
            .map_err(|_| ())
    }

    fn clear_transport(&self) {
        *self.tx.lock() = None;
    }

    fn snapshot(&self) -> SyncStatsSnapshot {
        let stats = self.stats.lock().clone();
        SyncStatsSnapshot {
            bytes_out: stats.bytes_out,
            bytes_in: stats.bytes_in,
            messages_out: stats.messages_out,
            messages_in: stats.messages_in,
            last_rtt_ms: stats.last_rtt_ms,
            last_message_age: stats.last_message_at.map(|t| t.elapsed().as_secs_f32()),
            connected_duration: stats.connected_since.map(|t| t.elapsed().as_secs_f32()),
        }
    }
}
