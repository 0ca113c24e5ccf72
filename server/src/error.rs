//! Recoverable session errors.
//!
//! These never take the process down. Only the originating connection hears
//! about them, as a `room-error` frame.

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RoomError {
    /// Join or control referenced a room the registry does not hold
    #[error("Room not found: {room_id}")]
    RoomNotFound { room_id: String },

    /// A third distinct connection tried to join
    #[error("Room is full (capacity {capacity})")]
    RoomFull { capacity: usize },

    /// Control from a connection that is not the room's host.
    /// Dropped silently, never sent to the caller.
    #[error("Only the host can control playback")]
    Unauthorized,
}

impl RoomError {
    /// Text placed in the `room-error` payload.
    pub fn message(&self) -> &'static str {
        match self {
            RoomError::RoomNotFound { .. } => "Room not found",
            RoomError::RoomFull { .. } => "Room is full",
            RoomError::Unauthorized => "Only the host can control playback",
        }
    }

    /// Whether the error is surfaced to the caller at all.
    pub fn is_reported(&self) -> bool {
        !matches!(self, RoomError::Unauthorized)
    }
}
