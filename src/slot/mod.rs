//! Latest-frame hand-off between a producer and any number of consumers
//!
//! Each stream owns exactly one [`FrameSlot`]. The session task overwrites it
//! on every successful read; the compositor and the recorder clone whatever is
//! in it on their own cadence.
//!
//! # Architecture
//!
//! ```text
//!   [Session task]                FrameSlot                 [Consumers]
//!   capture.read() ──write()──► ┌──────────────┐ ──read()──► Orchestrator (20 Hz)
//!                               │ frame: Frame │
//!                               │ version: u64 │ ──read()──► RecorderSession (F Hz)
//!                               └──────────────┘
//! ```
//!
//! # Zero-Copy Design
//!
//! `Frame` wraps a `bytes::Bytes` buffer, so `read()` only bumps a reference
//! count while the lock is held. A writer replaces the whole `Frame`, which
//! means a reader sees either the old buffer or the new one, never a mix.
//!
//! # No Backpressure
//!
//! The slot never queues. Slow readers silently skip intermediate frames;
//! freshness wins over completeness.

pub mod frame;
pub mod store;

pub use frame::{Frame, Resolution};
pub use store::FrameSlot;
