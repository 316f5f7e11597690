//! Session configuration

use std::time::Duration;

use super::backoff::{BackoffSchedule, ExhaustionPolicy};
use crate::media::Transport;

/// Per-session connection options
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// URL scheme used to build the connection string
    pub scheme: String,

    /// Lower-transport hint handed to the media backend
    pub transport: Transport,

    /// Open must complete within this time
    pub open_timeout: Duration,

    /// A single frame read must complete within this time
    ///
    /// Also bounds how long `shutdown()` may wait for a pending read.
    pub read_timeout: Duration,

    /// Waits between reconnect attempts
    pub backoff: BackoffSchedule,

    /// Behaviour once every attempt in `backoff` failed
    pub exhaustion_policy: ExhaustionPolicy,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            scheme: "rtsp".to_string(),
            transport: Transport::Tcp,
            open_timeout: Duration::from_secs(5),
            read_timeout: Duration::from_secs(5),
            backoff: BackoffSchedule::default(),
            exhaustion_policy: ExhaustionPolicy::AwaitRequest,
        }
    }
}

impl SessionConfig {
    /// Set the URL scheme
    pub fn scheme(mut self, scheme: impl Into<String>) -> Self {
        self.scheme = scheme.into();
        self
    }

    /// Set the transport hint
    pub fn transport(mut self, transport: Transport) -> Self {
        self.transport = transport;
        self
    }

    /// Set open timeout
    pub fn open_timeout(mut self, timeout: Duration) -> Self {
        self.open_timeout = timeout;
        self
    }

    /// Set read timeout
    pub fn read_timeout(mut self, timeout: Duration) -> Self {
        self.read_timeout = timeout;
        self
    }

    /// Set the reconnect schedule
    pub fn backoff(mut self, backoff: BackoffSchedule) -> Self {
        self.backoff = backoff;
        self
    }

    /// Set the exhaustion policy
    pub fn exhaustion_policy(mut self, policy: ExhaustionPolicy) -> Self {
        self.exhaustion_policy = policy;
        self
    }
}
