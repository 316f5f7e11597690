//! Orchestrator loop
//!
//! Owns every session and the optional recorder, and runs the fixed-period
//! display loop on the caller's task:
//!
//! ```text
//!   loop every period (default 50 ms):
//!     frames  ◄── session.frame() for each connected session
//!     canvas  ◄── compositor.compose(frames)
//!     keys    ◄── display.show(canvas), when a display is set
//!     q / ESC / closed  -> cancel
//!     r                 -> request_reconnect() on every session
//!   on exit: recorder.shutdown(), then session.shutdown() for each
//! ```

use std::time::Duration;

use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use super::canvas::{CompositeFrame, Compositor};
use super::display::{Command, Display, KeyBindings};
use super::layout::{Grid, GridLayout, DEFAULT_CANVAS_SIZE, DEFAULT_SINGLE_SIZE};
use crate::media::MediaBackend;
use crate::recorder::RecorderSession;
use crate::session::SessionManager;
use crate::slot::Resolution;

/// Orchestrator settings
#[derive(Debug, Clone)]
pub struct OrchestratorConfig {
    /// Target loop period
    pub period: Duration,

    /// How often per-session statistics are logged
    pub stats_interval: Duration,

    /// Canvas size for a single stream
    pub single_size: Resolution,

    /// Canvas size for two or more streams
    pub canvas_size: Resolution,

    /// Fixed grid; derived from the stream count when `None`
    pub grid: Option<Grid>,

    /// Key to command map
    pub key_bindings: KeyBindings,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            period: Duration::from_millis(50),
            stats_interval: Duration::from_secs(5),
            single_size: DEFAULT_SINGLE_SIZE,
            canvas_size: DEFAULT_CANVAS_SIZE,
            grid: None,
            key_bindings: KeyBindings::default(),
        }
    }
}

impl OrchestratorConfig {
    /// Set the loop period
    pub fn period(mut self, period: Duration) -> Self {
        self.period = period;
        self
    }

    /// Set the statistics interval
    pub fn stats_interval(mut self, interval: Duration) -> Self {
        self.stats_interval = interval;
        self
    }

    /// Set the single-stream canvas size
    pub fn single_size(mut self, size: Resolution) -> Self {
        self.single_size = size;
        self
    }

    /// Set the multi-stream canvas size
    pub fn canvas_size(mut self, size: Resolution) -> Self {
        self.canvas_size = size;
        self
    }

    /// Use a fixed grid
    pub fn grid(mut self, grid: Grid) -> Self {
        self.grid = Some(grid);
        self
    }

    /// Replace the key bindings
    pub fn key_bindings(mut self, bindings: KeyBindings) -> Self {
        self.key_bindings = bindings;
        self
    }
}

/// What a finished run did
#[derive(Debug, Clone, Default)]
pub struct RunSummary {
    /// Completed loop iterations
    pub cycles: u64,
    /// Wall time spent in the loop
    pub elapsed: Duration,
    /// Average cycles per second
    pub cycle_rate: f64,
}

/// Root component tying sessions, recorder and display together
pub struct Orchestrator<B: MediaBackend> {
    config: OrchestratorConfig,
    sessions: Vec<SessionManager<B>>,
    recorder: Option<RecorderSession<B>>,
    display: Option<Box<dyn Display>>,
    compositor: Option<Compositor>,
    cancel: CancellationToken,
    cycles: u64,
}

impl<B: MediaBackend> Orchestrator<B> {
    /// Create an orchestrator that stops when `cancel` fires
    pub fn new(config: OrchestratorConfig, cancel: CancellationToken) -> Self {
        Self {
            config,
            sessions: Vec::new(),
            recorder: None,
            display: None,
            compositor: None,
            cancel,
            cycles: 0,
        }
    }

    /// Stop signal shared with everything the orchestrator owns
    pub fn cancel_token(&self) -> &CancellationToken {
        &self.cancel
    }

    /// Add a started session; it gets the next grid cell
    pub fn add_session(&mut self, session: SessionManager<B>) {
        self.sessions.push(session);
        self.compositor = None;
    }

    pub fn set_recorder(&mut self, recorder: RecorderSession<B>) {
        self.recorder = Some(recorder);
    }

    /// Show composites on `display` and take commands from it
    pub fn set_display(&mut self, display: impl Display + 'static) {
        self.display = Some(Box::new(display));
    }

    pub fn sessions(&self) -> &[SessionManager<B>] {
        &self.sessions
    }

    pub fn recorder(&self) -> Option<&RecorderSession<B>> {
        self.recorder.as_ref()
    }

    /// Current canvas, once a cycle has composited one
    pub fn canvas(&self) -> Option<&CompositeFrame> {
        self.compositor.as_ref().map(Compositor::canvas)
    }

    pub fn layout(&self) -> GridLayout {
        GridLayout::new(
            self.sessions.len(),
            self.config.single_size,
            self.config.canvas_size,
            self.config.grid,
        )
    }

    /// Run one iteration: composite, render, apply commands
    pub fn cycle(&mut self) {
        self.cycles += 1;

        if self.sessions.is_empty() {
            return;
        }

        let count = self.sessions.len();
        let config = &self.config;
        let compositor = self.compositor.get_or_insert_with(|| {
            Compositor::new(GridLayout::new(
                count,
                config.single_size,
                config.canvas_size,
                config.grid,
            ))
        });

        let tiles: Vec<_> = self
            .sessions
            .iter()
            .map(|s| s.is_connected().then(|| s.frame()))
            .collect();
        let canvas = compositor.compose(&tiles);

        let Some(display) = self.display.as_mut() else {
            return;
        };
        let feedback = display.show(canvas);

        if feedback.closed {
            tracing::info!("Display closed");
            self.cancel.cancel();
        }
        for key in feedback.keys {
            match self.config.key_bindings.command(key) {
                Some(Command::Quit) => {
                    tracing::info!(key = key, "Quit requested");
                    self.cancel.cancel();
                }
                Some(Command::ReconnectAll) => {
                    tracing::info!(sessions = self.sessions.len(), "Reconnecting all streams");
                    for session in &self.sessions {
                        session.request_reconnect();
                    }
                }
                None => {}
            }
        }
    }

    /// Loop until cancelled, then tear everything down
    pub async fn run(&mut self) -> RunSummary {
        let started = Instant::now();
        let mut last_stats = started;
        let first_cycle = self.cycles;

        tracing::info!(
            sessions = self.sessions.len(),
            recording = self.recorder.is_some(),
            period_ms = self.config.period.as_millis() as u64,
            "Orchestrator running"
        );

        while !self.cancel.is_cancelled() {
            let cycle_start = Instant::now();
            self.cycle();

            if last_stats.elapsed() >= self.config.stats_interval {
                self.log_stats(started.elapsed());
                last_stats = Instant::now();
            }

            let remaining = self.config.period.saturating_sub(cycle_start.elapsed());
            tokio::select! {
                _ = self.cancel.cancelled() => break,
                _ = tokio::time::sleep(remaining) => {}
            }
        }

        let elapsed = started.elapsed();
        self.teardown().await;

        let cycles = self.cycles - first_cycle;
        let secs = elapsed.as_secs_f64();
        let summary = RunSummary {
            cycles,
            elapsed,
            cycle_rate: if secs > 0.0 { cycles as f64 / secs } else { 0.0 },
        };

        tracing::info!(
            cycles = summary.cycles,
            elapsed_secs = secs,
            cycle_rate = summary.cycle_rate,
            "Orchestrator stopped"
        );
        summary
    }

    /// Stop the recorder, then every session
    pub async fn teardown(&mut self) {
        self.cancel.cancel();

        if let Some(recorder) = self.recorder.as_mut() {
            recorder.shutdown().await;
        }
        for session in &mut self.sessions {
            session.shutdown().await;
        }
    }

    fn log_stats(&self, elapsed: Duration) {
        for session in &self.sessions {
            let stats = session.stats();
            let stream = session
                .endpoint()
                .map(ToString::to_string)
                .unwrap_or_default();
            tracing::info!(
                stream = %stream,
                state = %session.state(),
                frames = stats.frames_read,
                fps = stats.fps,
                reconnects = stats.reconnects,
                read_failures = stats.read_failures,
                "Stream stats"
            );
        }

        if let Some(recorder) = &self.recorder {
            let stats = recorder.stats();
            tracing::info!(
                frames = stats.frames_written,
                duplicated = stats.duplicated_frames,
                running = recorder.is_running(),
                "Recorder stats"
            );
        }

        tracing::debug!(
            cycles = self.cycles,
            elapsed_secs = elapsed.as_secs_f64(),
            "Orchestrator stats"
        );
    }
}
