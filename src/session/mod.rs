//! Stream sessions
//!
//! One [`SessionManager`] per remote source. Each owns:
//! - Its [`StreamEndpoint`] (credentials and location)
//! - A [`FrameSlot`](crate::slot::FrameSlot) holding the latest frame
//! - A background task that reads frames and reconnects on failure
//!
//! Status is observable lock-free through [`SessionState`] and the
//! running/connected flags.

pub mod backoff;
pub mod config;
pub mod endpoint;
pub mod manager;
pub mod state;

pub use backoff::{BackoffSchedule, ExhaustionPolicy};
pub use config::SessionConfig;
pub use endpoint::StreamEndpoint;
pub use manager::SessionManager;
pub use state::{SessionState, SessionStatus};
