use serde::{Deserialize, Serialize};

/// Events sent to the server (must match server protocol)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "kebab-case")]
pub enum ClientEvent {
    #[serde(rename_all = "camelCase")]
    JoinRoom { room_id: String, as_host: bool },
    #[serde(rename_all = "camelCase")]
    Control {
        room_id: String,
        action: PlaybackAction,
        current_time: f64,
    },
    #[serde(rename_all = "camelCase")]
    RequestSync { room_id: String },
}

/// Events received from the server
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

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaybackState {
    pub playing: bool,
    pub position: f64,
    pub last_update_at: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncSnapshot {
    pub state: PlaybackState,
    pub server_time: i64,
    pub host_socket_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ControlBroadcast {
    pub action: PlaybackAction,
    pub current_time: f64,
    pub server_time: i64,
    pub playing: bool,
}

/// Body for `POST /rooms`
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateRoomRequest {
    pub video: String,
    pub fingerprint: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatedRoom {
    pub room_id: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parses_sync_state_with_hostless_room() {
        let event: ServerEvent = serde_json::from_value(json!({
            "event": "sync-state",
            "data": {
                "state": {"playing": false, "position": 0.0, "lastUpdateAt": 5},
                "serverTime": 9,
                "hostSocketId": null
            }
        }))
        .unwrap();
        let ServerEvent::SyncState(snapshot) = event else {
            panic!("wrong variant");
        };
        assert_eq!(snapshot.host_socket_id, None);
        assert_eq!(snapshot.server_time, 9);
    }

    #[test]
    fn join_room_frame() {
        let frame = serde_json::to_value(ClientEvent::JoinRoom {
            room_id: "123-456".into(),
            as_host: true,
        })
        .unwrap();
        assert_eq!(
            frame,
            json!({"event": "join-room", "data": {"roomId": "123-456", "asHost": true}})
        );
    }
}
