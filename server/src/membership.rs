//! Join admission, capacity, and host election.

use std::sync::Arc;

use crate::error::RoomError;
use crate::gateway::Outbox;
use crate::protocol::{ConnectionId, Role, RoomId, ServerEvent};
use crate::registry::RoomRegistry;

const LOG_TAG: &str = "[Tandem Membership]";

pub struct Membership {
    registry: Arc<RoomRegistry>,
}

impl Membership {
    pub fn new(registry: Arc<RoomRegistry>) -> Self {
        Self { registry }
    }

    /// Admit `conn` into `room_id` and tell it its role. Guests also get a
    /// snapshot so they can line up their player without asking.
    ///
    /// Errors are returned, not sent; the caller decides what the requester
    /// hears.
    pub fn join(
        &self,
        outbox: &dyn Outbox,
        room_id: &str,
        conn: ConnectionId,
        as_host: bool,
    ) -> Result<Role, RoomError> {
        self.registry
            .with_room(room_id, |room| {
                let admission = room.admit(conn, as_host)?;

                outbox.send(&conn, ServerEvent::Role { role: admission.role });
                if let Some(previous) = admission.displaced_host {
                    tracing::info!(
                        "{LOG_TAG} Client {} took host of room {} from {}",
                        conn,
                        room_id,
                        previous
                    );
                    outbox.send(&previous, ServerEvent::Role { role: Role::Guest });
                }
                if admission.role == Role::Guest {
                    let snapshot = room.snapshot(self.registry.now());
                    outbox.send(&conn, ServerEvent::SyncState(snapshot));
                }

                tracing::info!(
                    "{LOG_TAG} Client {} joined room {} as {:?} ({} members)",
                    conn,
                    room_id,
                    admission.role,
                    room.member_count()
                );
                Ok(admission.role)
            })
            .unwrap_or_else(|| {
                Err(RoomError::RoomNotFound {
                    room_id: room_id.to_string(),
                })
            })
    }

    /// Remove `conn` from every room holding it. Returns the rooms it left.
    pub fn leave(&self, outbox: &dyn Outbox, conn: ConnectionId) -> Vec<RoomId> {
        let mut left = Vec::new();
        for room_id in self.registry.rooms_with_member(&conn) {
            let departure = self.registry.remove_member(&room_id, &conn, |room, departure| {
                if let Some(new_host) = departure.promoted {
                    tracing::info!(
                        "{LOG_TAG} Host of room {} moved from {} to {}",
                        room.id(),
                        conn,
                        new_host
                    );
                    outbox.send(&new_host, ServerEvent::Role { role: Role::Host });
                }
            });

            if departure.is_some() {
                tracing::info!("{LOG_TAG} Client {} left room {}", conn, room_id);
                left.push(room_id);
            }
        }
        left
    }

    /// Resend the current snapshot to `conn` alone. Returns false, and sends
    /// nothing, when the room does not exist.
    pub fn request_sync(&self, outbox: &dyn Outbox, room_id: &str, conn: ConnectionId) -> bool {
        self.registry
            .with_room(room_id, |room| {
                let snapshot = room.snapshot(self.registry.now());
                outbox.send(&conn, ServerEvent::SyncState(snapshot));
            })
            .is_some()
    }
}
