//! Authoritative playback model for a room.
//!
//! `position` is exact only at `last_update_at`. Anyone reading the state while
//! `playing` is true has to add the time elapsed since then, see
//! [`PlaybackState::position_at`].

use serde::{Deserialize, Serialize};

use crate::protocol::{ControlBroadcast, PlaybackAction};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaybackState {
    pub playing: bool,
    /// Seconds into the media
    pub position: f64,
    /// Server time (ms since epoch) at which `position` was authoritative
    pub last_update_at: i64,
}

impl PlaybackState {
    /// Paused at zero, stamped `now`.
    pub fn new(now: i64) -> Self {
        Self {
            playing: false,
            position: 0.0,
            last_update_at: now,
        }
    }

    /// Apply a host command. The host is trusted as-is: no range checks on
    /// `current_time`.
    pub fn apply(&mut self, action: PlaybackAction, current_time: f64, now: i64) -> ControlBroadcast {
        match action {
            PlaybackAction::Play => self.playing = true,
            PlaybackAction::Pause => self.playing = false,
            PlaybackAction::Seek => {}
        }
        self.position = current_time;
        self.last_update_at = now;

        ControlBroadcast {
            action,
            current_time,
            server_time: now,
            playing: self.playing,
        }
    }

    /// Reconciled position at server time `now`.
    pub fn position_at(&self, now: i64) -> f64 {
        if !self.playing {
            return self.position;
        }
        let elapsed_ms = (now - self.last_update_at).max(0);
        self.position + elapsed_ms as f64 / 1000.0
    }
}
