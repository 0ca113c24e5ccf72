use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::playback::PlaybackState;

/// Transport-assigned id of one live connection
pub type ConnectionId = Uuid;

/// Opaque room identifier handed out by the registry
pub type RoomId = String;

/// Events sent by a client, framed as `{"event": ..., "data": ...}`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "kebab-case")]
pub enum ClientEvent {
    #[serde(rename_all = "camelCase")]
    JoinRoom {
        room_id: RoomId,
        #[serde(default)]
        as_host: bool,
    },
    #[serde(rename_all = "camelCase")]
    Control {
        room_id: RoomId,
        action: PlaybackAction,
        current_time: f64,
    },
    #[serde(rename_all = "camelCase")]
    RequestSync { room_id: RoomId },
}

/// Events sent by the server
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "kebab-case")]
pub enum ServerEvent {
    Role { role: Role },
    RoomError { message: String },
    SyncState(SyncSnapshot),
    Control(ControlBroadcast),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlaybackAction {
    Play,
    Pause,
    Seek,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Host,
    Guest,
}

/// Full state handed to a guest on join and on `request-sync`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncSnapshot {
    pub state: PlaybackState,
    pub server_time: i64,
    pub host_socket_id: Option<ConnectionId>,
}

/// Result of an accepted host command, fanned out to every member
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ControlBroadcast {
    pub action: PlaybackAction,
    pub current_time: f64,
    pub server_time: i64,
    pub playing: bool,
}
