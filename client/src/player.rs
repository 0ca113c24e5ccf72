//! Local model of the shared player.
//!
//! The server only ever says "position was P at server time T". This keeps
//! the latest such statement plus an estimate of how far the server clock is
//! from ours, and turns them into a position for any local instant.

use crate::protocol::{ControlBroadcast, Role, SyncSnapshot};

#[derive(Debug, Default, Clone)]
pub struct LocalPlayer {
    role: Option<Role>,
    host_id: Option<String>,
    playing: bool,
    position: f64,
    /// Server time at which `position` was exact
    reference_server_time: i64,
    /// server clock minus local clock, in ms
    clock_offset_ms: Option<i64>,
}

impl LocalPlayer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn role(&self) -> Option<Role> {
        self.role
    }

    pub fn set_role(&mut self, role: Role) {
        self.role = Some(role);
    }

    pub fn is_host(&self) -> bool {
        self.role == Some(Role::Host)
    }

    pub fn host_id(&self) -> Option<&str> {
        self.host_id.as_deref()
    }

    pub fn is_playing(&self) -> bool {
        self.playing
    }

    pub fn clock_offset_ms(&self) -> Option<i64> {
        self.clock_offset_ms
    }

    pub fn apply_snapshot(&mut self, snapshot: &SyncSnapshot, local_now: i64) {
        self.observe_server_time(snapshot.server_time, local_now);
        self.host_id = snapshot.host_socket_id.clone();
        self.playing = snapshot.state.playing;
        self.position = snapshot.state.position;
        self.reference_server_time = snapshot.state.last_update_at;
    }

    /// Applied the same way on the host, which does not trust its own clock
    /// for what it just sent.
    pub fn apply_control(&mut self, control: &ControlBroadcast, local_now: i64) {
        self.observe_server_time(control.server_time, local_now);
        self.playing = control.playing;
        self.position = control.current_time;
        self.reference_server_time = control.server_time;
    }

    /// Reconciled position in seconds at local time `local_now`.
    pub fn position_at(&self, local_now: i64) -> f64 {
        if !self.playing {
            return self.position;
        }
        let server_now = local_now + self.clock_offset_ms.unwrap_or(0);
        let elapsed_ms = (server_now - self.reference_server_time).max(0);
        self.position + elapsed_ms as f64 / 1000.0
    }

    /// Every server-stamped event replaces the offset, so a local clock
    /// correction is picked up on the next event.
    fn observe_server_time(&mut self, server_time: i64, local_now: i64) {
        self.clock_offset_ms = Some(server_time - local_now);
    }
}
