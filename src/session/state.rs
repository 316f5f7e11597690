//! Session state machine
//!
//! Tracks one stream from configuration through connect, reading, failure
//! and reconnection to shutdown.
//!
//! ```text
//!   Idle ──start()──► Connecting ──► Connected ──► Reading ◄─┐
//!    ▲                    │                          │       │ frame
//!    └────── open/read ───┘                    read fails    │
//!            failed                                  ▼       │
//!                          Failed ◄── exhausted ── Reconnecting ──► Connected
//!                                                                  (attempt ok)
//!   any ──shutdown()──► Stopped
//! ```

use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};

use crate::stats::SessionCounters;

/// Session lifecycle state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum SessionState {
    /// Configured (or not), not started
    Idle = 0,
    /// Initial open or a reconnect attempt in progress
    Connecting = 1,
    /// Source open, no frame read yet on this connection
    Connected = 2,
    /// Frames are flowing into the slot
    Reading = 3,
    /// Backoff schedule exhausted, not connected
    Failed = 4,
    /// Waiting out a backoff delay
    Reconnecting = 5,
    /// Task ended
    Stopped = 6,
}

impl SessionState {
    fn from_u8(v: u8) -> Self {
        match v {
            0 => Self::Idle,
            1 => Self::Connecting,
            2 => Self::Connected,
            3 => Self::Reading,
            4 => Self::Failed,
            5 => Self::Reconnecting,
            6 => Self::Stopped,
            _ => Self::Idle,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Connecting => "connecting",
            Self::Connected => "connected",
            Self::Reading => "reading",
            Self::Failed => "failed",
            Self::Reconnecting => "reconnecting",
            Self::Stopped => "stopped",
        }
    }
}

impl std::fmt::Display for SessionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Lock-free status view of one session
///
/// Written only by the session (its `start()` and its task); any thread may
/// read it.
#[derive(Debug)]
pub struct SessionStatus {
    state: AtomicU8,
    running: AtomicBool,
    connected: AtomicBool,
    /// Frame and reconnect counters
    pub counters: SessionCounters,
}

impl SessionStatus {
    pub fn new() -> Self {
        Self {
            state: AtomicU8::new(SessionState::Idle as u8),
            running: AtomicBool::new(false),
            connected: AtomicBool::new(false),
            counters: SessionCounters::default(),
        }
    }

    pub fn state(&self) -> SessionState {
        SessionState::from_u8(self.state.load(Ordering::Acquire))
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    pub fn is_connected(&self) -> bool {
        self.connected.load(Ordering::Acquire)
    }

    /// Move to `state`, returning the previous state
    pub(crate) fn set_state(&self, state: SessionState) -> SessionState {
        SessionState::from_u8(self.state.swap(state as u8, Ordering::AcqRel))
    }

    pub(crate) fn set_running(&self, running: bool) {
        self.running.store(running, Ordering::Release);
    }

    pub(crate) fn set_connected(&self, connected: bool) {
        self.connected.store(connected, Ordering::Release);
    }

    /// Connection established: connected flag up, state `Connected`
    pub(crate) fn on_connected(&self) {
        self.set_connected(true);
        self.set_state(SessionState::Connected);
    }

    /// Connection lost: connected flag down, state `Reconnecting`
    pub(crate) fn on_connection_lost(&self) {
        self.set_connected(false);
        self.set_state(SessionState::Reconnecting);
    }

    /// Task ended
    pub(crate) fn on_stopped(&self) {
        self.set_running(false);
        self.set_connected(false);
        self.set_state(SessionState::Stopped);
    }
}

impl Default for SessionStatus {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_lifecycle() {
        let status = SessionStatus::new();

        assert_eq!(status.state(), SessionState::Idle);
        assert!(!status.is_running());
        assert!(!status.is_connected());

        status.set_state(SessionState::Connecting);
        status.set_running(true);
        status.on_connected();
        assert_eq!(status.state(), SessionState::Connected);
        assert!(status.is_connected());

        status.on_connection_lost();
        assert_eq!(status.state(), SessionState::Reconnecting);
        assert!(!status.is_connected());
        assert!(status.is_running());

        status.on_stopped();
        assert_eq!(status.state(), SessionState::Stopped);
        assert!(!status.is_running());
    }

    #[test]
    fn test_set_state_returns_previous() {
        let status = SessionStatus::new();

        let prev = status.set_state(SessionState::Reading);
        assert_eq!(prev, SessionState::Idle);
        assert_eq!(status.set_state(SessionState::Failed), SessionState::Reading);
    }

    #[test]
    fn test_state_display() {
        assert_eq!(SessionState::Reconnecting.to_string(), "reconnecting");
        assert_eq!(SessionState::from_u8(42), SessionState::Idle);
    }
}
