//! Session manager and its read task
//!
//! A [`SessionManager`] owns one stream: its endpoint, its frame slot and the
//! background task that keeps the slot fed. The task owns the open capture;
//! the manager only talks to it through the cancellation token and the
//! reconnect channel, and reads its progress from [`SessionStatus`].
//!
//! ```text
//!   SessionManager                         SessionWorker (tokio task)
//!   ──────────────                         ──────────────────────────
//!   start() ── open + test read ──spawn──► loop {
//!   request_reconnect() ──mpsc(1)────────►   reconnect requested? -> reconnect()
//!   shutdown() ──cancel──────────────────►   read -> slot.write()
//!            ◄─────── capture ─── join ───   read failed -> reconnect()
//!   frame() ◄──────── FrameSlot ◄──────────  }
//! ```

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use super::backoff::ExhaustionPolicy;
use super::config::SessionConfig;
use super::endpoint::StreamEndpoint;
use super::state::{SessionState, SessionStatus};
use crate::error::{ConfigurationError, Error, Result};
use crate::media::{Capture, CaptureRequest, MediaBackend, MediaError};
use crate::slot::{Frame, FrameSlot, Resolution};
use crate::stats::SessionStats;

/// Lifecycle owner for one remote stream
pub struct SessionManager<B: MediaBackend> {
    backend: Arc<B>,
    config: SessionConfig,
    endpoint: Option<StreamEndpoint>,
    status: Arc<SessionStatus>,
    slot: FrameSlot,
    resolution: Resolution,
    source_fps: Option<f64>,
    reconnect_tx: Option<mpsc::Sender<()>>,
    parent: CancellationToken,
    cancel: CancellationToken,
    task: Option<JoinHandle<Option<B::Capture>>>,
}

impl<B: MediaBackend> SessionManager<B> {
    /// Create an unconfigured session
    pub fn new(backend: Arc<B>, config: SessionConfig) -> Self {
        Self::with_parent(backend, config, &CancellationToken::new())
    }

    /// Create a session whose task also stops when `parent` is cancelled
    pub fn with_parent(backend: Arc<B>, config: SessionConfig, parent: &CancellationToken) -> Self {
        Self {
            backend,
            config,
            endpoint: None,
            status: Arc::new(SessionStatus::new()),
            slot: FrameSlot::default(),
            resolution: Resolution::default(),
            source_fps: None,
            reconnect_tx: None,
            parent: parent.clone(),
            cancel: parent.child_token(),
            task: None,
        }
    }

    /// Store the stream credentials
    pub fn configure(&mut self, endpoint: StreamEndpoint) {
        self.endpoint = Some(endpoint);
    }

    pub fn endpoint(&self) -> Option<&StreamEndpoint> {
        self.endpoint.as_ref()
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Connect, perform one test read and spawn the read task
    ///
    /// On failure any opened capture is released and the session is left
    /// idle and not running.
    pub async fn start(&mut self) -> Result<()> {
        let endpoint = self
            .endpoint
            .clone()
            .ok_or(ConfigurationError::MissingEndpoint)?;
        let stream = endpoint.to_string();

        if self.status.is_running() {
            return Err(Error::AlreadyRunning(stream));
        }
        // Reap a task that ended on its own (exhaustion policy `Stop`)
        self.join_task().await;

        let request = CaptureRequest {
            url: endpoint.connection_url(&self.config.scheme)?,
            transport: self.config.transport,
            open_timeout: self.config.open_timeout,
            read_timeout: self.config.read_timeout,
        };

        tracing::info!(stream = %stream, transport = request.transport.as_str(), "Connecting");
        self.status.set_state(SessionState::Connecting);

        let mut capture = match open_capture(self.backend.as_ref(), &request).await {
            Ok(capture) => capture,
            Err(e) => {
                self.status.set_state(SessionState::Idle);
                return Err(Error::Connect { stream, source: e });
            }
        };

        let frame = match read_frame(&mut capture, request.read_timeout).await {
            Ok(frame) => frame,
            Err(e) => {
                capture.release().await;
                self.status.set_state(SessionState::Idle);
                return Err(Error::Read { stream, source: e });
            }
        };

        self.resolution = capture.resolution();
        self.source_fps = capture.fps();
        self.slot.set_resolution(self.resolution);
        self.slot.write(frame);

        self.status.counters.mark_started();
        self.status.counters.on_frame();
        self.status.set_running(true);
        self.status.on_connected();

        tracing::info!(
            stream = %stream,
            resolution = %self.resolution,
            fps = ?self.source_fps,
            "Stream connected"
        );

        let (reconnect_tx, reconnect_rx) = mpsc::channel(1);
        self.reconnect_tx = Some(reconnect_tx);
        self.cancel = self.parent.child_token();

        let worker = SessionWorker {
            backend: Arc::clone(&self.backend),
            request,
            stream,
            config: self.config.clone(),
            status: Arc::clone(&self.status),
            slot: self.slot.clone(),
            reconnect_rx,
            cancel: self.cancel.clone(),
            capture: Some(capture),
        };
        self.task = Some(tokio::spawn(worker.run()));

        Ok(())
    }

    /// Ask the task to drop its connection and reconnect
    ///
    /// Never blocks. Requests made before the task picks one up collapse
    /// into one.
    pub fn request_reconnect(&self) {
        if let Some(tx) = &self.reconnect_tx {
            let _ = tx.try_send(());
        }
    }

    pub fn is_running(&self) -> bool {
        self.status.is_running()
    }

    pub fn is_connected(&self) -> bool {
        self.status.is_connected()
    }

    pub fn state(&self) -> SessionState {
        self.status.state()
    }

    pub fn stats(&self) -> SessionStats {
        self.status.counters.snapshot()
    }

    /// Latest frame, or a blank frame before the first read
    pub fn frame(&self) -> Frame {
        self.slot.read()
    }

    /// Shared handle to this session's frame slot
    pub fn slot(&self) -> FrameSlot {
        self.slot.clone()
    }

    /// Resolution negotiated by `start()`
    pub fn resolution(&self) -> Resolution {
        self.resolution
    }

    /// Frame rate advertised by the source at `start()`
    pub fn source_fps(&self) -> Option<f64> {
        self.source_fps
    }

    /// Stop the task, wait for it and release its connection
    pub async fn shutdown(&mut self) {
        if self.task.is_none() {
            return;
        }

        let stream = self.display_name();
        tracing::info!(stream = %stream, "Closing stream");

        self.cancel.cancel();
        self.reconnect_tx = None;
        self.join_task().await;
        self.status.on_stopped();

        tracing::info!(stream = %stream, "Stream closed");
    }

    async fn join_task(&mut self) {
        let Some(task) = self.task.take() else {
            return;
        };

        match task.await {
            Ok(Some(capture)) => capture.release().await,
            Ok(None) => {}
            Err(e) => {
                tracing::error!(stream = %self.display_name(), error = %e, "Session task failed");
            }
        }
    }

    fn display_name(&self) -> String {
        self.endpoint
            .as_ref()
            .map(ToString::to_string)
            .unwrap_or_else(|| "<unconfigured>".to_string())
    }
}

impl<B: MediaBackend> Drop for SessionManager<B> {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

/// State owned by the background task
struct SessionWorker<B: MediaBackend> {
    backend: Arc<B>,
    request: CaptureRequest,
    stream: String,
    config: SessionConfig,
    status: Arc<SessionStatus>,
    slot: FrameSlot,
    reconnect_rx: mpsc::Receiver<()>,
    cancel: CancellationToken,
    capture: Option<B::Capture>,
}

impl<B: MediaBackend> SessionWorker<B> {
    /// Read loop; hands the open capture (if any) back on exit
    async fn run(mut self) -> Option<B::Capture> {
        loop {
            if self.cancel.is_cancelled() {
                break;
            }

            if self.reconnect_rx.try_recv().is_ok() {
                tracing::info!(stream = %self.stream, "Reconnect requested");
                self.reconnect().await;
                continue;
            }

            if self.capture.is_none() {
                if self.on_exhausted().await {
                    continue;
                }
                break;
            }
            let Some(capture) = self.capture.as_mut() else {
                continue;
            };

            let outcome = tokio::select! {
                _ = self.cancel.cancelled() => None,
                result = read_frame(capture, self.request.read_timeout) => Some(result),
            };

            match outcome {
                None => break,
                Some(Ok(frame)) => {
                    self.slot.write(frame);
                    self.status.counters.on_frame();
                    if self.status.state() != SessionState::Reading {
                        self.status.set_state(SessionState::Reading);
                    }
                }
                Some(Err(e)) => {
                    tracing::warn!(stream = %self.stream, error = %e, "Read failed");
                    self.status.counters.on_read_failure();
                    self.reconnect().await;
                }
            }
        }

        self.status.on_stopped();
        tracing::debug!(stream = %self.stream, "Session task exiting");
        self.capture
    }

    /// Walk the backoff schedule until an attempt opens the source
    ///
    /// Leaves `capture` set on success. On exhaustion the state is `Failed`
    /// and `capture` is `None`.
    async fn reconnect(&mut self) {
        self.status.on_connection_lost();
        if let Some(capture) = self.capture.take() {
            capture.release().await;
        }

        let schedule = self.config.backoff.clone();
        let max_attempts = schedule.max_attempts();

        for (attempt, delay) in schedule.attempts() {
            self.status.counters.on_reconnect_attempt();
            tracing::info!(
                stream = %self.stream,
                attempt = attempt,
                max_attempts = max_attempts,
                delay_ms = delay.as_millis() as u64,
                "Reconnecting"
            );

            let cancelled = tokio::select! {
                _ = self.cancel.cancelled() => true,
                _ = tokio::time::sleep(delay) => false,
            };
            if cancelled {
                return;
            }

            self.status.set_state(SessionState::Connecting);
            match open_capture(self.backend.as_ref(), &self.request).await {
                Ok(capture) => {
                    let resolution = capture.resolution();
                    self.slot.set_resolution(resolution);
                    self.capture = Some(capture);
                    self.status.on_connected();
                    self.status.counters.on_reconnect();
                    tracing::info!(
                        stream = %self.stream,
                        attempt = attempt,
                        resolution = %resolution,
                        "Reconnected"
                    );
                    return;
                }
                Err(e) => {
                    tracing::warn!(
                        stream = %self.stream,
                        attempt = attempt,
                        error = %e,
                        "Reconnect attempt failed"
                    );
                    self.status.set_state(SessionState::Reconnecting);
                }
            }
        }

        self.status.set_state(SessionState::Failed);
        tracing::warn!(
            stream = %self.stream,
            attempts = max_attempts,
            "Reconnect schedule exhausted"
        );
    }

    /// Apply the exhaustion policy; returns false when the task should end
    async fn on_exhausted(&mut self) -> bool {
        let policy = match self.config.exhaustion_policy {
            // An empty schedule would spin
            ExhaustionPolicy::RetryForever if self.config.backoff.max_attempts() == 0 => {
                ExhaustionPolicy::AwaitRequest
            }
            policy => policy,
        };

        match policy {
            ExhaustionPolicy::AwaitRequest => {
                let requested = tokio::select! {
                    _ = self.cancel.cancelled() => false,
                    msg = self.reconnect_rx.recv() => msg.is_some(),
                };
                if requested {
                    tracing::info!(stream = %self.stream, "Reconnect requested");
                    self.reconnect().await;
                }
                requested
            }
            ExhaustionPolicy::RetryForever => {
                self.reconnect().await;
                true
            }
            ExhaustionPolicy::Stop => {
                tracing::warn!(stream = %self.stream, "Giving up on stream");
                false
            }
        }
    }
}

async fn open_capture<B: MediaBackend>(
    backend: &B,
    request: &CaptureRequest,
) -> std::result::Result<B::Capture, MediaError> {
    match tokio::time::timeout(request.open_timeout, backend.open_capture(request)).await {
        Ok(result) => result,
        Err(_) => Err(MediaError::Timeout(request.open_timeout)),
    }
}

async fn read_frame<C: Capture>(
    capture: &mut C,
    timeout: Duration,
) -> std::result::Result<Frame, MediaError> {
    match tokio::time::timeout(timeout, capture.read()).await {
        Ok(result) => result,
        Err(_) => Err(MediaError::Timeout(timeout)),
    }
}
