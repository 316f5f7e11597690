//! Statistics for stream sessions and recorders

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use parking_lot::Mutex;

/// Live counters for one session, updated by its task
#[derive(Debug, Default)]
pub struct SessionCounters {
    frames_read: AtomicU64,
    read_failures: AtomicU64,
    reconnect_attempts: AtomicU64,
    reconnects: AtomicU64,
    started_at: Mutex<Option<Instant>>,
}

impl SessionCounters {
    pub(crate) fn mark_started(&self) {
        *self.started_at.lock() = Some(Instant::now());
    }

    pub(crate) fn on_frame(&self) {
        self.frames_read.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn on_read_failure(&self) {
        self.read_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn on_reconnect_attempt(&self) {
        self.reconnect_attempts.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn on_reconnect(&self) {
        self.reconnects.fetch_add(1, Ordering::Relaxed);
    }

    /// Point-in-time copy
    pub fn snapshot(&self) -> SessionStats {
        let started_at = *self.started_at.lock();
        let mut stats = SessionStats {
            frames_read: self.frames_read.load(Ordering::Relaxed),
            read_failures: self.read_failures.load(Ordering::Relaxed),
            reconnect_attempts: self.reconnect_attempts.load(Ordering::Relaxed),
            reconnects: self.reconnects.load(Ordering::Relaxed),
            duration: started_at.map(|t| t.elapsed()).unwrap_or_default(),
            fps: 0.0,
        };
        stats.calculate_fps();
        stats
    }
}

/// Session-level statistics
#[derive(Debug, Clone, Default)]
pub struct SessionStats {
    /// Frames written into the slot (the test read included)
    pub frames_read: u64,
    /// Failed reads
    pub read_failures: u64,
    /// Reconnect attempts, successful or not
    pub reconnect_attempts: u64,
    /// Successful reconnects
    pub reconnects: u64,
    /// Time since the session started
    pub duration: Duration,
    /// Average frames per second over `duration`
    pub fps: f64,
}

impl SessionStats {
    /// Calculate fps from frames and duration
    pub fn calculate_fps(&mut self) {
        let secs = self.duration.as_secs_f64();
        if secs > 0.0 {
            self.fps = self.frames_read as f64 / secs;
        }
    }
}

/// Recorder statistics
#[derive(Debug, Clone, Default)]
pub struct RecorderStats {
    /// Frames appended to the output
    pub frames_written: u64,
    /// Writes that repeated the previous frame because no new one arrived
    pub duplicated_frames: u64,
}

/// Live counters for one recorder
#[derive(Debug, Default)]
pub struct RecorderCounters {
    frames_written: AtomicU64,
    duplicated_frames: AtomicU64,
}

impl RecorderCounters {
    pub(crate) fn on_write(&self, duplicate: bool) {
        self.frames_written.fetch_add(1, Ordering::Relaxed);
        if duplicate {
            self.duplicated_frames.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub fn snapshot(&self) -> RecorderStats {
        RecorderStats {
            frames_written: self.frames_written.load(Ordering::Relaxed),
            duplicated_frames: self.duplicated_frames.load(Ordering::Relaxed),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_stats_new() {
        let stats = SessionCounters::default().snapshot();
        assert_eq!(stats.frames_read, 0);
        assert_eq!(stats.read_failures, 0);
        assert_eq!(stats.reconnect_attempts, 0);
        assert_eq!(stats.reconnects, 0);
        assert_eq!(stats.duration, Duration::ZERO);
        assert_eq!(stats.fps, 0.0);
    }

    #[test]
    fn test_session_stats_calculate_fps() {
        let mut stats = SessionStats {
            frames_read: 250,
            duration: Duration::from_secs(10),
            ..Default::default()
        };

        stats.calculate_fps();

        assert_eq!(stats.fps, 25.0);
    }

    #[test]
    fn test_session_stats_calculate_fps_zero_duration() {
        let mut stats = SessionStats {
            frames_read: 250,
            ..Default::default()
        };

        stats.calculate_fps();

        // With zero duration, fps should remain 0
        assert_eq!(stats.fps, 0.0);
    }

    #[test]
    fn test_session_counters() {
        let counters = SessionCounters::default();
        counters.mark_started();
        counters.on_frame();
        counters.on_frame();
        counters.on_read_failure();
        counters.on_reconnect_attempt();
        counters.on_reconnect_attempt();
        counters.on_reconnect();

        let stats = counters.snapshot();
        assert_eq!(stats.frames_read, 2);
        assert_eq!(stats.read_failures, 1);
        assert_eq!(stats.reconnect_attempts, 2);
        assert_eq!(stats.reconnects, 1);
    }

    #[test]
    fn test_recorder_counters() {
        let counters = RecorderCounters::default();
        counters.on_write(false);
        counters.on_write(true);
        counters.on_write(true);

        let stats = counters.snapshot();
        assert_eq!(stats.frames_written, 3);
        assert_eq!(stats.duplicated_frames, 2);
    }
}
