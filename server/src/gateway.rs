//! Per-connection event routing.
//!
//! The gateway knows nothing about WebSockets: a transport hands it decoded
//! frames (or raw text) plus the connection id, and drains the receiver it got
//! from [`Gateway::connect`] for outbound events.

use dashmap::DashMap;
use std::sync::Arc;
use tokio::sync::mpsc;
use uuid::Uuid;

use crate::error::RoomError;
use crate::membership::Membership;
use crate::protocol::{ClientEvent, ConnectionId, PlaybackAction, ServerEvent};
use crate::registry::RoomRegistry;

const LOG_TAG: &str = "[Tandem Gateway]";

pub type ClientSender = mpsc::UnboundedSender<ServerEvent>;
pub type ClientReceiver = mpsc::UnboundedReceiver<ServerEvent>;

/// Outbound half of the session channel
pub trait Outbox {
    fn send(&self, to: &ConnectionId, event: ServerEvent);
}

pub struct Gateway {
    registry: Arc<RoomRegistry>,
    membership: Membership,
    connections: DashMap<ConnectionId, ClientSender>,
}

impl Gateway {
    pub fn new(registry: Arc<RoomRegistry>) -> Self {
        Self {
            membership: Membership::new(registry.clone()),
            registry,
            connections: DashMap::new(),
        }
    }

    pub fn registry(&self) -> &Arc<RoomRegistry> {
        &self.registry
    }

    /// Register a new connection under a fresh id.
    pub fn connect(&self) -> (ConnectionId, ClientReceiver) {
        let conn = Uuid::new_v4();
        (conn, self.attach(conn))
    }

    /// Register a connection under a caller-chosen id. Replaces any earlier
    /// channel for the same id.
    pub fn attach(&self, conn: ConnectionId) -> ClientReceiver {
        let (tx, rx) = mpsc::unbounded_channel();
        self.connections.insert(conn, tx);
        tracing::info!("{LOG_TAG} Client {} connected", conn);
        rx
    }

    pub fn connection_count(&self) -> usize {
        self.connections.len()
    }

    /// Decode one text frame and route it. Malformed frames are dropped.
    pub fn handle_frame(&self, conn: ConnectionId, text: &str) {
        match serde_json::from_str::<ClientEvent>(text) {
            Ok(event) => self.dispatch(conn, event),
            Err(e) => tracing::debug!("{LOG_TAG} Dropping malformed frame from {}: {}", conn, e),
        }
    }

    pub fn dispatch(&self, conn: ConnectionId, event: ClientEvent) {
        match event {
            ClientEvent::JoinRoom { room_id, as_host } => {
                if let Err(e) = self.membership.join(self, &room_id, conn, as_host) {
                    tracing::info!("{LOG_TAG} Join of {} by {} refused: {}", room_id, conn, e);
                    if e.is_reported() {
                        self.send(
                            &conn,
                            ServerEvent::RoomError {
                                message: e.message().to_string(),
                            },
                        );
                    }
                }
            }
            ClientEvent::Control {
                room_id,
                action,
                current_time,
            } => self.control(conn, &room_id, action, current_time),
            ClientEvent::RequestSync { room_id } => {
                if !self.membership.request_sync(self, &room_id, conn) {
                    tracing::debug!(
                        "{LOG_TAG} Ignoring sync request from {} for unknown room {}",
                        conn,
                        room_id
                    );
                }
            }
        }
    }

    /// Transport reported the connection gone.
    pub fn disconnect(&self, conn: ConnectionId) {
        self.connections.remove(&conn);
        self.membership.leave(self, conn);
        tracing::info!("{LOG_TAG} Client {} disconnected", conn);
    }

    fn control(&self, conn: ConnectionId, room_id: &str, action: PlaybackAction, current_time: f64) {
        let outcome = self.registry.with_room(room_id, |room| {
            let broadcast = room.control(&conn, action, current_time, self.registry.now())?;
            for member in room.members() {
                self.send(member, ServerEvent::Control(broadcast.clone()));
            }
            Ok::<_, RoomError>(room.member_count())
        });

        match outcome {
            Some(Ok(members)) => tracing::debug!(
                "{LOG_TAG} Broadcast {:?} at {} from {} to {} members in room {}",
                action,
                current_time,
                conn,
                members,
                room_id
            ),
            Some(Err(e)) => tracing::debug!("{LOG_TAG} Dropped control from {}: {}", conn, e),
            None => tracing::debug!(
                "{LOG_TAG} Dropped control from {} for unknown room {}",
                conn,
                room_id
            ),
        }
    }
}

impl Outbox for Gateway {
    fn send(&self, to: &ConnectionId, event: ServerEvent) {
        if let Some(tx) = self.connections.get(to) {
            if tx.send(event).is_err() {
                tracing::debug!("{LOG_TAG} Client {} channel closed", to);
            }
        }
    }
}
