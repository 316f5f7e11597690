//! Scripted in-memory media backend for unit tests
//!
//! A single [`ScriptedBackend`] models one remote source. Tests flip it
//! online/offline, make the next N opens fail, and inspect what writers
//! received.

use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;

use super::{Capture, CaptureRequest, FrameWriter, MediaBackend, MediaError, WriterRequest};
use crate::slot::{Frame, Resolution};

#[derive(Debug)]
struct SourceState {
    resolution: Resolution,
    frame_interval: Duration,
    online: AtomicBool,
    fail_next_opens: AtomicU32,
    fail_reads: AtomicBool,
    opens: AtomicU32,
    releases: AtomicU32,
    sequence: AtomicU64,
    requests: Mutex<Vec<CaptureRequest>>,
    writer_fail_open: AtomicBool,
    writer_fail_writes: AtomicBool,
    written: Mutex<Vec<Frame>>,
    writer_closed: AtomicBool,
}

#[derive(Debug, Clone)]
pub(crate) struct ScriptedBackend {
    state: Arc<SourceState>,
}

impl ScriptedBackend {
    pub(crate) fn new(resolution: Resolution, frame_interval: Duration) -> Self {
        Self {
            state: Arc::new(SourceState {
                resolution,
                frame_interval,
                online: AtomicBool::new(true),
                fail_next_opens: AtomicU32::new(0),
                fail_reads: AtomicBool::new(false),
                opens: AtomicU32::new(0),
                releases: AtomicU32::new(0),
                sequence: AtomicU64::new(0),
                requests: Mutex::new(Vec::new()),
                writer_fail_open: AtomicBool::new(false),
                writer_fail_writes: AtomicBool::new(false),
                written: Mutex::new(Vec::new()),
                writer_closed: AtomicBool::new(false),
            }),
        }
    }

    /// Take the source down (opens and reads fail) or bring it back
    pub(crate) fn set_online(&self, online: bool) {
        self.state.online.store(online, Ordering::SeqCst);
    }

    /// Fail the next `n` opens even if the source is online
    pub(crate) fn fail_next_opens(&self, n: u32) {
        self.state.fail_next_opens.store(n, Ordering::SeqCst);
    }

    /// Opens succeed but every read fails
    pub(crate) fn set_fail_reads(&self, fail: bool) {
        self.state.fail_reads.store(fail, Ordering::SeqCst);
    }

    pub(crate) fn opens(&self) -> u32 {
        self.state.opens.load(Ordering::SeqCst)
    }

    pub(crate) fn releases(&self) -> u32 {
        self.state.releases.load(Ordering::SeqCst)
    }

    pub(crate) fn last_request(&self) -> Option<CaptureRequest> {
        self.state.requests.lock().last().cloned()
    }

    pub(crate) fn fail_writer_open(&self) {
        self.state.writer_fail_open.store(true, Ordering::SeqCst);
    }

    pub(crate) fn fail_writes(&self) {
        self.state.writer_fail_writes.store(true, Ordering::SeqCst);
    }

    pub(crate) fn written(&self) -> Vec<Frame> {
        self.state.written.lock().clone()
    }

    pub(crate) fn writer_closed(&self) -> bool {
        self.state.writer_closed.load(Ordering::SeqCst)
    }
}

pub(crate) struct ScriptedCapture {
    state: Arc<SourceState>,
}

impl MediaBackend for ScriptedBackend {
    type Capture = ScriptedCapture;
    type Writer = ScriptedWriter;

    async fn open_capture(&self, request: &CaptureRequest) -> Result<ScriptedCapture, MediaError> {
        self.state.opens.fetch_add(1, Ordering::SeqCst);
        self.state.requests.lock().push(request.clone());

        if !self.state.online.load(Ordering::SeqCst) {
            return Err(MediaError::Open("source offline".into()));
        }

        let pending = self.state.fail_next_opens.load(Ordering::SeqCst);
        if pending > 0 {
            self.state.fail_next_opens.store(pending - 1, Ordering::SeqCst);
            return Err(MediaError::Open("scripted open failure".into()));
        }

        Ok(ScriptedCapture {
            state: Arc::clone(&self.state),
        })
    }

    async fn open_writer(&self, request: &WriterRequest) -> Result<ScriptedWriter, MediaError> {
        if self.state.writer_fail_open.load(Ordering::SeqCst) {
            return Err(MediaError::Open(format!(
                "cannot create {}",
                request.path.display()
            )));
        }
        Ok(ScriptedWriter {
            state: Arc::clone(&self.state),
        })
    }
}

impl Capture for ScriptedCapture {
    fn resolution(&self) -> Resolution {
        self.state.resolution
    }

    fn fps(&self) -> Option<f64> {
        Some(1.0 / self.state.frame_interval.as_secs_f64())
    }

    async fn read(&mut self) -> Result<Frame, MediaError> {
        tokio::time::sleep(self.state.frame_interval).await;

        if !self.state.online.load(Ordering::SeqCst) {
            return Err(MediaError::EndOfStream);
        }
        if self.state.fail_reads.load(Ordering::SeqCst) {
            return Err(MediaError::Read("scripted read failure".into()));
        }

        let seq = self.state.sequence.fetch_add(1, Ordering::SeqCst) + 1;
        Ok(Frame::filled(self.state.resolution, seq as u8))
    }

    async fn release(self) {
        self.state.releases.fetch_add(1, Ordering::SeqCst);
    }
}

pub(crate) struct ScriptedWriter {
    state: Arc<SourceState>,
}

impl FrameWriter for ScriptedWriter {
    async fn write(&mut self, frame: &Frame) -> Result<(), MediaError> {
        if self.state.writer_fail_writes.load(Ordering::SeqCst) {
            return Err(MediaError::Write("disk full".into()));
        }
        self.state.written.lock().push(frame.clone());
        Ok(())
    }

    async fn close(self) -> Result<(), MediaError> {
        self.state.writer_closed.store(true, Ordering::SeqCst);
        Ok(())
    }
}
