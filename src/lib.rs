//! Resilient multi-stream RTSP ingest
//!
//! Keeps several network video streams alive across transient failures,
//! exposes the latest decoded frame of each, optionally records one of them
//! and tiles all of them into a single view.
//!
//! ```text
//!   AppConfig ──► StreamEndpoint ──► SessionManager ──task──► FrameSlot ◄── RecorderSession ──► out.mp4
//!                                    (one per stream)            ▲
//!                                                                │ frame()
//!                                          Orchestrator ── Compositor ──► Display
//! ```
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use rtsp_mosaic::{
//!     FfmpegBackend, HeadlessDisplay, Orchestrator, OrchestratorConfig, SessionConfig,
//!     SessionManager, StreamEndpoint,
//! };
//! use tokio_util::sync::CancellationToken;
//!
//! # async fn run() -> rtsp_mosaic::Result<()> {
//! let backend = Arc::new(FfmpegBackend::new());
//! let cancel = CancellationToken::new();
//!
//! let mut session = SessionManager::with_parent(backend, SessionConfig::default(), &cancel);
//! session.configure(StreamEndpoint::new("admin", "secret", "10.0.0.5", "554", "cam1"));
//! session.start().await?;
//!
//! let mut orchestrator = Orchestrator::new(OrchestratorConfig::default(), cancel);
//! orchestrator.add_session(session);
//! orchestrator.set_display(HeadlessDisplay);
//! orchestrator.run().await;
//! # Ok(())
//! # }
//! ```

pub mod compositor;
pub mod config;
pub mod error;
pub mod media;
pub mod recorder;
pub mod session;
pub mod slot;
pub mod stats;

pub use compositor::{
    Command, CompositeFrame, ConsoleDisplay, Display, DisplayFeedback, Grid, GridLayout,
    HeadlessDisplay, KeyBindings, Orchestrator, OrchestratorConfig, RunSummary,
};
pub use config::{AppConfig, ConfigError};
pub use error::{ConfigurationError, Error, RecorderError, Result};
pub use media::{Capture, FfmpegBackend, FrameWriter, MediaBackend, MediaError, Transport};
pub use recorder::{RecorderSession, RecorderTarget};
pub use session::{
    BackoffSchedule, ExhaustionPolicy, SessionConfig, SessionManager, SessionState,
    StreamEndpoint,
};
pub use slot::{Frame, FrameSlot, Resolution};
pub use stats::{RecorderStats, SessionStats};
