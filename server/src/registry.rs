use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use std::sync::Arc;
use uuid::Uuid;

use crate::clock::Clock;
use crate::protocol::{ConnectionId, RoomId};
use crate::room::{Departure, MediaAssets, Room};

const LOG_TAG: &str = "[Tandem Registry]";

/// Short-code collisions tolerated before falling back to a full UUID id
const MAX_CODE_ATTEMPTS: usize = 16;

/// Every live room, keyed by id. Owned by the process and handed to the
/// gateway at construction.
///
/// Each room sits behind its own map entry lock; callers mutate a room only
/// through [`RoomRegistry::with_room`] or [`RoomRegistry::remove_member`], so a
/// room is never observed half-updated.
pub struct RoomRegistry {
    rooms: DashMap<RoomId, Room>,
    clock: Arc<dyn Clock>,
}

impl RoomRegistry {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            rooms: DashMap::new(),
            clock,
        }
    }

    pub fn now(&self) -> i64 {
        self.clock.now_millis()
    }

    /// Allocate an empty, paused room with no media attached.
    pub fn create(&self) -> RoomId {
        self.create_with_media(None)
    }

    /// Tries short "NNN-NNN" codes first; once those keep colliding the id
    /// widens to a UUID, so this always returns.
    pub fn create_with_media(&self, media: Option<MediaAssets>) -> RoomId {
        let mut attempts = 0;
        loop {
            let candidate = if attempts < MAX_CODE_ATTEMPTS {
                generate_room_code()
            } else {
                Uuid::new_v4().to_string()
            };
            attempts += 1;

            match self.rooms.entry(candidate) {
                Entry::Occupied(_) => continue,
                Entry::Vacant(slot) => {
                    let room_id = slot.key().clone();
                    slot.insert(Room::new(room_id.clone(), media, self.now()));
                    tracing::info!("{LOG_TAG} Room {} created", room_id);
                    return room_id;
                }
            }
        }
    }

    /// Point-in-time copy of a room.
    pub fn get(&self, room_id: &str) -> Option<Room> {
        self.rooms.get(room_id).map(|room| room.clone())
    }

    pub fn contains(&self, room_id: &str) -> bool {
        self.rooms.contains_key(room_id)
    }

    /// Returns whether a room was actually removed.
    pub fn delete(&self, room_id: &str) -> bool {
        let removed = self.rooms.remove(room_id).is_some();
        if removed {
            tracing::info!("{LOG_TAG} Room {} deleted", room_id);
        }
        removed
    }

    pub fn len(&self) -> usize {
        self.rooms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rooms.is_empty()
    }

    /// Run `f` with exclusive access to one room. `None` if it does not exist.
    ///
    /// `f` must not call back into the registry.
    pub fn with_room<R>(&self, room_id: &str, f: impl FnOnce(&mut Room) -> R) -> Option<R> {
        self.rooms.get_mut(room_id).map(|mut room| f(&mut room))
    }

    pub fn rooms_with_member(&self, conn: &ConnectionId) -> Vec<RoomId> {
        self.rooms
            .iter()
            .filter(|entry| entry.value().is_member(conn))
            .map(|entry| entry.key().clone())
            .collect()
    }

    /// Remove `conn` from one room and drop the room if that emptied it, in a
    /// single locked step. `notify` runs under the same lock with the room as
    /// it is after the removal.
    pub fn remove_member(
        &self,
        room_id: &str,
        conn: &ConnectionId,
        notify: impl FnOnce(&Room, &Departure),
    ) -> Option<Departure> {
        let mut departure = None;
        let removed = self.rooms.remove_if_mut(room_id, |_, room| {
            let Some(outcome) = room.remove(conn) else {
                return false;
            };
            notify(room, &outcome);
            departure = Some(outcome);
            outcome.now_empty
        });

        if removed.is_some() {
            tracing::info!("{LOG_TAG} Room {} deleted (empty)", room_id);
        }
        departure
    }
}

fn generate_room_code() -> RoomId {
    let raw = (Uuid::new_v4().as_u128() % 1_000_000) as u32;
    format!("{:03}-{:03}", raw / 1000, raw % 1000)
}
