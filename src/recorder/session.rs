//! Recorder session
//!
//! A write task that samples one frame slot at a fixed cadence and appends
//! each sample to an encoded video file. The slot is either shared with a
//! stream session (`attach`) or fed by the caller (`submit_frame`).

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use super::config::RecorderTarget;
use crate::compositor::layout::resize_nearest;
use crate::error::RecorderError;
use crate::media::{FrameWriter, MediaBackend, WriterRequest};
use crate::slot::{Frame, FrameSlot, Resolution};
use crate::stats::{RecorderCounters, RecorderStats};

/// Fixed-cadence video writer fed from a frame slot
pub struct RecorderSession<B: MediaBackend> {
    backend: Arc<B>,
    target: RecorderTarget,
    slot: FrameSlot,
    running: Arc<AtomicBool>,
    counters: Arc<RecorderCounters>,
    parent: CancellationToken,
    cancel: CancellationToken,
    task: Option<JoinHandle<B::Writer>>,
}

impl<B: MediaBackend> RecorderSession<B> {
    pub fn new(backend: Arc<B>) -> Self {
        Self::with_parent(backend, &CancellationToken::new())
    }

    /// Create a recorder whose task also stops when `parent` is cancelled
    pub fn with_parent(backend: Arc<B>, parent: &CancellationToken) -> Self {
        Self {
            backend,
            target: RecorderTarget::default(),
            slot: FrameSlot::default(),
            running: Arc::new(AtomicBool::new(false)),
            counters: Arc::new(RecorderCounters::default()),
            parent: parent.clone(),
            cancel: parent.child_token(),
            task: None,
        }
    }

    /// Set the output target
    pub fn configure(&mut self, target: RecorderTarget) {
        self.target = target;
    }

    pub fn target(&self) -> &RecorderTarget {
        &self.target
    }

    /// Record from `slot` (typically a stream session's) instead of the
    /// recorder's own
    ///
    /// Takes effect on the next `start()`.
    pub fn attach(&mut self, slot: FrameSlot) {
        self.slot = slot;
    }

    /// Hand the recorder a frame; the next tick writes it
    pub fn submit_frame(&self, frame: Frame) {
        self.slot.write(frame);
    }

    /// Open the writer and spawn the write task
    pub async fn start(&mut self) -> Result<(), RecorderError> {
        if self.is_running() {
            return Err(RecorderError::AlreadyRunning);
        }
        self.close_writer().await;

        let (path, fps, size) = self.target.resolve()?;
        let request = WriterRequest {
            path: path.clone(),
            codec_tag: self.target.codec_tag.clone(),
            fps,
            size,
        };

        let writer = self
            .backend
            .open_writer(&request)
            .await
            .map_err(|e| RecorderError::Open {
                path: path.clone(),
                source: e,
            })?;

        self.running.store(true, Ordering::Release);
        self.cancel = self.parent.child_token();

        tracing::info!(
            path = %path.display(),
            fps = fps,
            size = %size,
            codec = %request.codec_tag,
            "Recording started"
        );

        let worker = RecorderWorker {
            writer,
            slot: self.slot.clone(),
            size,
            period: Duration::from_secs_f64(1.0 / f64::from(fps)),
            path,
            running: Arc::clone(&self.running),
            counters: Arc::clone(&self.counters),
            cancel: self.cancel.clone(),
        };
        self.task = Some(tokio::spawn(worker.run()));

        Ok(())
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    pub fn stats(&self) -> RecorderStats {
        self.counters.snapshot()
    }

    /// Shared handle to the slot being recorded
    pub fn slot(&self) -> FrameSlot {
        self.slot.clone()
    }

    /// Stop the task, then flush and close the output
    pub async fn shutdown(&mut self) {
        if self.task.is_none() {
            return;
        }

        self.cancel.cancel();
        self.close_writer().await;
        self.running.store(false, Ordering::Release);
    }

    async fn close_writer(&mut self) {
        let Some(task) = self.task.take() else {
            return;
        };

        let writer = match task.await {
            Ok(writer) => writer,
            Err(e) => {
                tracing::error!(error = %e, "Recorder task failed");
                return;
            }
        };

        let path = self
            .target
            .output_path
            .clone()
            .unwrap_or_else(|| PathBuf::from("<unset>"));
        match writer.close().await {
            Ok(()) => {
                let stats = self.stats();
                tracing::info!(
                    path = %path.display(),
                    frames = stats.frames_written,
                    duplicated = stats.duplicated_frames,
                    "Video saved"
                );
            }
            Err(e) => {
                tracing::error!(path = %path.display(), error = %e, "Failed to close video writer");
            }
        }
    }
}

impl<B: MediaBackend> Drop for RecorderSession<B> {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

struct RecorderWorker<W: FrameWriter> {
    writer: W,
    slot: FrameSlot,
    size: Resolution,
    period: Duration,
    path: PathBuf,
    running: Arc<AtomicBool>,
    counters: Arc<RecorderCounters>,
    cancel: CancellationToken,
}

impl<W: FrameWriter> RecorderWorker<W> {
    /// Write loop; hands the writer back for closing
    async fn run(mut self) -> W {
        let mut ticker = tokio::time::interval(self.period);
        let mut last_version = None;

        loop {
            tokio::select! {
                _ = self.cancel.cancelled() => break,
                _ = ticker.tick() => {}
            }

            let (version, frame) = self.slot.read_versioned();
            let duplicate = last_version == Some(version);
            last_version = Some(version);

            let frame = resize_nearest(&frame, self.size);
            if let Err(e) = self.writer.write(&frame).await {
                tracing::error!(
                    path = %self.path.display(),
                    error = %e,
                    "Write failed, recording stopped"
                );
                break;
            }
            self.counters.on_write(duplicate);
        }

        self.running.store(false, Ordering::Release);
        self.writer
    }
}

#[cfg(test)]
mod tests {
    use tokio_test::{assert_err, assert_ok};

    use super::*;
    use crate::media::testing::ScriptedBackend;

    fn backend() -> ScriptedBackend {
        ScriptedBackend::new(Resolution::new(8, 8), Duration::from_millis(40))
    }

    fn target(size: Resolution) -> RecorderTarget {
        RecorderTarget::new()
            .output_path("out.mp4")
            .target_fps(10)
            .frame_size(size)
    }

    #[tokio::test(start_paused = true)]
    async fn test_start_requires_target_fields() {
        let mut recorder = RecorderSession::new(Arc::new(backend()));

        let err = assert_err!(recorder.start().await);
        assert!(matches!(err, RecorderError::MissingOutputPath));

        recorder.configure(RecorderTarget::new().output_path("out.mp4"));
        let err = assert_err!(recorder.start().await);
        assert!(matches!(err, RecorderError::MissingTargetFps));

        recorder.configure(RecorderTarget::new().output_path("out.mp4").target_fps(10));
        let err = assert_err!(recorder.start().await);
        assert!(matches!(err, RecorderError::MissingFrameSize));

        assert!(!recorder.is_running());
    }

    #[tokio::test(start_paused = true)]
    async fn test_open_failure() {
        let backend = backend();
        backend.fail_writer_open();
        let mut recorder = RecorderSession::new(Arc::new(backend));
        recorder.configure(target(Resolution::new(8, 8)));

        let err = assert_err!(recorder.start().await);
        assert!(matches!(err, RecorderError::Open { .. }));
        assert!(!recorder.is_running());
    }

    #[tokio::test(start_paused = true)]
    async fn test_writes_at_target_cadence_with_duplicates() {
        let backend = backend();
        let mut recorder = RecorderSession::new(Arc::new(backend.clone()));
        recorder.configure(target(Resolution::new(8, 8)));
        recorder.submit_frame(Frame::filled(Resolution::new(8, 8), 1));

        assert_ok!(recorder.start().await);
        assert_err!(recorder.start().await);
        tokio::time::sleep(Duration::from_secs(1)).await;
        recorder.shutdown().await;

        // 10 fps for 1 s, first tick immediate
        let stats = recorder.stats();
        assert!((10..=11).contains(&stats.frames_written));
        // Only one frame was ever submitted
        assert_eq!(stats.duplicated_frames, stats.frames_written - 1);
        assert_eq!(backend.written().len() as u64, stats.frames_written);
        assert!(backend.writer_closed());
        assert!(!recorder.is_running());
    }

    #[tokio::test(start_paused = true)]
    async fn test_fresh_frames_are_not_duplicates() {
        let backend = backend();
        let mut recorder = RecorderSession::new(Arc::new(backend.clone()));
        recorder.configure(target(Resolution::new(8, 8)));
        let slot = recorder.slot();

        assert_ok!(recorder.start().await);
        for i in 0..5u8 {
            // Land each frame between two ticks
            tokio::time::sleep(Duration::from_millis(50)).await;
            slot.write(Frame::filled(Resolution::new(8, 8), i + 1));
            tokio::time::sleep(Duration::from_millis(50)).await;
        }
        // Past the tick that picks up the last frame
        tokio::time::sleep(Duration::from_millis(60)).await;
        recorder.shutdown().await;

        let stats = recorder.stats();
        assert_eq!(stats.duplicated_frames, 0);
        let written = backend.written();
        assert_eq!(written.last().and_then(|f| f.pixel(0, 0)), Some([5, 5, 5]));
    }

    #[tokio::test(start_paused = true)]
    async fn test_attached_slot_is_resized() {
        let backend = backend();
        let source = FrameSlot::new(Resolution::new(16, 16));
        source.write(Frame::filled(Resolution::new(16, 16), 3));

        let mut recorder = RecorderSession::new(Arc::new(backend.clone()));
        recorder.configure(target(Resolution::new(4, 4)));
        recorder.attach(source);

        assert_ok!(recorder.start().await);
        tokio::time::sleep(Duration::from_millis(250)).await;
        recorder.shutdown().await;

        let written = backend.written();
        assert!(!written.is_empty());
        assert!(written
            .iter()
            .all(|f| f.resolution() == Resolution::new(4, 4) && f.pixel(3, 3) == Some([3, 3, 3])));
    }

    #[tokio::test(start_paused = true)]
    async fn test_write_failure_stops_recorder() {
        let backend = backend();
        backend.fail_writes();
        let mut recorder = RecorderSession::new(Arc::new(backend.clone()));
        recorder.configure(target(Resolution::new(8, 8)));

        assert_ok!(recorder.start().await);
        tokio::time::sleep(Duration::from_millis(250)).await;

        assert!(!recorder.is_running());
        assert_eq!(recorder.stats().frames_written, 0);

        recorder.shutdown().await;
        assert!(backend.writer_closed());
    }

    #[tokio::test(start_paused = true)]
    async fn test_parent_cancellation_stops_recorder() {
        let backend = backend();
        let parent = CancellationToken::new();
        let mut recorder = RecorderSession::with_parent(Arc::new(backend.clone()), &parent);
        recorder.configure(target(Resolution::new(8, 8)));

        assert_ok!(recorder.start().await);
        parent.cancel();
        tokio::time::sleep(Duration::from_millis(10)).await;

        assert!(!recorder.is_running());
        recorder.shutdown().await;
        assert!(backend.writer_closed());
    }
}
