//! Two-party synchronized playback sessions.
//!
//! One member of each room is the host; its play/pause/seek commands are
//! authoritative and fanned out, server-stamped, to both members.

pub mod clock;
pub mod config;
pub mod error;
pub mod gateway;
pub mod membership;
pub mod playback;
pub mod protocol;
pub mod registry;
pub mod room;
pub mod transport;

pub use clock::{Clock, ManualClock, SystemClock};
pub use config::Config;
pub use error::RoomError;
pub use gateway::{Gateway, Outbox};
pub use playback::PlaybackState;
pub use protocol::{ClientEvent, ConnectionId, PlaybackAction, Role, RoomId, ServerEvent};
pub use registry::RoomRegistry;
pub use room::{MediaAssets, Room, ROOM_CAPACITY};
