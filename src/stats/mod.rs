//! Statistics for sessions and recorders

pub mod metrics;

pub use metrics::{RecorderCounters, RecorderStats, SessionCounters, SessionStats};
