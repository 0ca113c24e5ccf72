use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use crate::error::RoomError;
use crate::playback::PlaybackState;
use crate::protocol::{ConnectionId, ControlBroadcast, PlaybackAction, Role, RoomId, SyncSnapshot};

/// Maximum number of distinct members in a room
pub const ROOM_CAPACITY: usize = 2;

/// References to the media a room was created for. Never validated here.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MediaAssets {
    pub video: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subtitles: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fingerprint: Option<String>,
}

/// One synchronized-playback session
#[derive(Debug, Clone)]
pub struct Room {
    id: RoomId,
    /// Ordered so host migration is deterministic
    members: BTreeSet<ConnectionId>,
    host_id: Option<ConnectionId>,
    playback: PlaybackState,
    media: Option<MediaAssets>,
}

/// What happened when a connection was admitted
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Admission {
    pub role: Role,
    /// Previous host that lost the role to an `asHost` join
    pub displaced_host: Option<ConnectionId>,
}

/// What happened when a member left
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Departure {
    pub was_host: bool,
    pub promoted: Option<ConnectionId>,
    pub now_empty: bool,
}

impl Room {
    pub fn new(id: RoomId, media: Option<MediaAssets>, now: i64) -> Self {
        Self {
            id,
            members: BTreeSet::new(),
            host_id: None,
            playback: PlaybackState::new(now),
            media,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn members(&self) -> impl Iterator<Item = &ConnectionId> {
        self.members.iter()
    }

    pub fn member_count(&self) -> usize {
        self.members.len()
    }

    pub fn is_member(&self, conn: &ConnectionId) -> bool {
        self.members.contains(conn)
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    pub fn host_id(&self) -> Option<ConnectionId> {
        self.host_id
    }

    pub fn is_host(&self, conn: &ConnectionId) -> bool {
        self.host_id.as_ref() == Some(conn)
    }

    pub fn playback(&self) -> &PlaybackState {
        &self.playback
    }

    pub fn media(&self) -> Option<&MediaAssets> {
        self.media.as_ref()
    }

    /// Admit `conn`, then run the host-assignment rule: asking for host, or
    /// joining a hostless room, makes `conn` the host. There is no contest; the
    /// latest `as_host` join wins.
    pub fn admit(&mut self, conn: ConnectionId, as_host: bool) -> Result<Admission, RoomError> {
        if !self.members.contains(&conn) && self.members.len() >= ROOM_CAPACITY {
            return Err(RoomError::RoomFull {
                capacity: ROOM_CAPACITY,
            });
        }
        self.members.insert(conn);

        let mut displaced_host = None;
        if as_host || self.host_id.is_none() {
            displaced_host = self.host_id.replace(conn).filter(|prev| *prev != conn);
        }

        let role = if self.is_host(&conn) {
            Role::Host
        } else {
            Role::Guest
        };
        Ok(Admission {
            role,
            displaced_host,
        })
    }

    /// Drop `conn` from the room. If it held the host role, the lowest-sorted
    /// remaining member inherits it. `None` when `conn` was not a member.
    pub fn remove(&mut self, conn: &ConnectionId) -> Option<Departure> {
        if !self.members.remove(conn) {
            return None;
        }

        let was_host = self.is_host(conn);
        let mut promoted = None;
        if was_host {
            self.host_id = self.members.first().copied();
            promoted = self.host_id;
        }

        Some(Departure {
            was_host,
            promoted,
            now_empty: self.members.is_empty(),
        })
    }

    /// Host-gated playback transition.
    pub fn control(
        &mut self,
        conn: &ConnectionId,
        action: PlaybackAction,
        current_time: f64,
        now: i64,
    ) -> Result<ControlBroadcast, RoomError> {
        if !self.is_host(conn) {
            return Err(RoomError::Unauthorized);
        }
        Ok(self.playback.apply(action, current_time, now))
    }

    pub fn snapshot(&self, now: i64) -> SyncSnapshot {
        SyncSnapshot {
            state: self.playback,
            server_time: now,
            host_socket_id: self.host_id,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn conn(n: u128) -> ConnectionId {
        Uuid::from_u128(n)
    }

    fn room() -> Room {
        Room::new("100-200".into(), None, 0)
    }

    #[test]
    fn first_join_becomes_host() {
        let mut room = room();
        let admission = room.admit(conn(1), false).unwrap();
        assert_eq!(admission.role, Role::Host);
        assert_eq!(admission.displaced_host, None);
        assert_eq!(room.host_id(), Some(conn(1)));
    }

    #[test]
    fn second_join_is_guest() {
        let mut room = room();
        room.admit(conn(1), true).unwrap();
        let admission = room.admit(conn(2), false).unwrap();
        assert_eq!(admission.role, Role::Guest);
        assert_eq!(room.host_id(), Some(conn(1)));
    }

    #[test]
    fn as_host_seizes_role() {
        let mut room = room();
        room.admit(conn(1), true).unwrap();
        let admission = room.admit(conn(2), true).unwrap();
        assert_eq!(admission.role, Role::Host);
        assert_eq!(admission.displaced_host, Some(conn(1)));
        assert!(!room.is_host(&conn(1)));
    }

    #[test]
    fn third_member_is_rejected() {
        let mut room = room();
        room.admit(conn(1), false).unwrap();
        room.admit(conn(2), false).unwrap();
        assert_eq!(
            room.admit(conn(3), true),
            Err(RoomError::RoomFull { capacity: 2 })
        );
        assert_eq!(room.member_count(), 2);
        assert_eq!(room.host_id(), Some(conn(1)));
    }

    #[test]
    fn rejoin_does_not_count_twice() {
        let mut room = room();
        room.admit(conn(1), false).unwrap();
        room.admit(conn(2), false).unwrap();

        let again = room.admit(conn(1), false).unwrap();
        assert_eq!(again.role, Role::Host);
        let again = room.admit(conn(2), false).unwrap();
        assert_eq!(again.role, Role::Guest);
        assert_eq!(room.member_count(), 2);
    }

    #[test]
    fn host_leaving_promotes_remaining_member() {
        let mut room = room();
        room.admit(conn(9), true).unwrap();
        room.admit(conn(4), false).unwrap();

        let departure = room.remove(&conn(9)).unwrap();
        assert!(departure.was_host);
        assert_eq!(departure.promoted, Some(conn(4)));
        assert!(!departure.now_empty);
        assert!(room.is_host(&conn(4)));
    }

    #[test]
    fn guest_leaving_keeps_host() {
        let mut room = room();
        room.admit(conn(1), true).unwrap();
        room.admit(conn(2), false).unwrap();

        let departure = room.remove(&conn(2)).unwrap();
        assert!(!departure.was_host);
        assert_eq!(departure.promoted, None);
        assert_eq!(room.host_id(), Some(conn(1)));
    }

    #[test]
    fn last_member_leaving_empties_room() {
        let mut room = room();
        room.admit(conn(1), true).unwrap();
        let departure = room.remove(&conn(1)).unwrap();
        assert!(departure.now_empty);
        assert_eq!(room.host_id(), None);
        assert!(room.remove(&conn(1)).is_none());
    }

    #[test]
    fn guest_control_changes_nothing() {
        let mut room = room();
        room.admit(conn(1), true).unwrap();
        room.admit(conn(2), false).unwrap();
        room.control(&conn(1), PlaybackAction::Play, 10.0, 1_000).unwrap();

        let before = *room.playback();
        assert_eq!(
            room.control(&conn(2), PlaybackAction::Pause, 15.0, 2_000),
            Err(RoomError::Unauthorized)
        );
        assert_eq!(*room.playback(), before);
    }

    #[test]
    fn snapshot_carries_host_and_time() {
        let mut room = room();
        room.admit(conn(1), true).unwrap();
        room.control(&conn(1), PlaybackAction::Play, 10.0, 1_000).unwrap();

        let snap = room.snapshot(4_000);
        assert_eq!(snap.server_time, 4_000);
        assert_eq!(snap.host_socket_id, Some(conn(1)));
        assert_eq!(snap.state.last_update_at, 1_000);
        assert!(snap.state.playing);
    }
}
