//! Video recording
//!
//! A [`RecorderSession`] persists one frame slot to a single encoded file at
//! a fixed frame rate, independent of how fast the slot is fed:
//!
//! ```text
//!   SessionManager ──write──► FrameSlot ◄──read every 1/fps── RecorderSession ──► out.mp4
//! ```

pub mod config;
pub mod session;

pub use config::{RecorderTarget, DEFAULT_CODEC_TAG, DEFAULT_TARGET_FPS};
pub use session::RecorderSession;
