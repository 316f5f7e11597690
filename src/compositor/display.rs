//! Display and keyboard collaborators
//!
//! The orchestrator hands every composite to a [`Display`] and gets back
//! the keys pressed since the last call. [`KeyBindings`] turn those keys into
//! [`Command`]s.

use std::collections::HashMap;
use std::io::Cursor;
use std::path::{Path, PathBuf};

use image::codecs::png::PngEncoder;
use image::{ExtendedColorType, ImageEncoder};
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::sync::mpsc;

use super::canvas::CompositeFrame;

/// Key code for Escape
pub const KEY_ESC: u8 = 27;

/// What the user asked for since the last frame
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DisplayFeedback {
    /// Key codes in the order they were pressed
    pub keys: Vec<u8>,
    /// The output surface went away
    pub closed: bool,
}

/// Rendering surface for composites
pub trait Display: Send {
    /// Present one composite and collect input
    fn show(&mut self, frame: &CompositeFrame) -> DisplayFeedback;
}

/// Orchestrator-level action bound to a key
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    /// Stop everything
    Quit,
    /// Ask every session to reconnect
    ReconnectAll,
}

/// Key to command map
#[derive(Debug, Clone)]
pub struct KeyBindings {
    bindings: HashMap<u8, Command>,
}

impl KeyBindings {
    /// No bindings at all
    pub fn empty() -> Self {
        Self {
            bindings: HashMap::new(),
        }
    }

    /// Bind `key` to `command`, replacing any previous binding
    pub fn bind(mut self, key: u8, command: Command) -> Self {
        self.bindings.insert(key, command);
        self
    }

    pub fn command(&self, key: u8) -> Option<Command> {
        self.bindings.get(&key).copied()
    }
}

impl Default for KeyBindings {
    /// ESC and `q` quit, `r` reconnects every stream
    fn default() -> Self {
        Self::empty()
            .bind(KEY_ESC, Command::Quit)
            .bind(b'q', Command::Quit)
            .bind(b'r', Command::ReconnectAll)
    }
}

/// Discards frames and never reports input
#[derive(Debug, Default)]
pub struct HeadlessDisplay;

impl Display for HeadlessDisplay {
    fn show(&mut self, _frame: &CompositeFrame) -> DisplayFeedback {
        DisplayFeedback::default()
    }
}

/// Snapshot failures
#[derive(Debug, thiserror::Error)]
pub enum SnapshotError {
    #[error("failed to encode snapshot: {0}")]
    Encode(#[from] image::ImageError),

    #[error("failed to write snapshot: {0}")]
    Io(#[from] std::io::Error),
}

/// Terminal-driven display
///
/// Reads commands from a line-oriented input (stdin in the binary). Each
/// line is one key: its first byte, or ESC for the word `esc`. The `s` key
/// saves the current composite as a PNG under the snapshot directory.
#[derive(Debug)]
pub struct ConsoleDisplay {
    keys: mpsc::Receiver<u8>,
    snapshot_dir: PathBuf,
    snapshots: u32,
}

impl ConsoleDisplay {
    /// Read keys from the process's stdin
    pub fn stdin(snapshot_dir: impl Into<PathBuf>) -> Self {
        Self::from_reader(tokio::io::stdin(), snapshot_dir)
    }

    /// Read keys from any line-oriented input
    pub fn from_reader<R>(reader: R, snapshot_dir: impl Into<PathBuf>) -> Self
    where
        R: AsyncRead + Unpin + Send + 'static,
    {
        let (tx, rx) = mpsc::channel(64);

        tokio::spawn(async move {
            let mut lines = BufReader::new(reader).lines();
            loop {
                match lines.next_line().await {
                    Ok(Some(line)) => {
                        let Some(key) = parse_key(&line) else {
                            continue;
                        };
                        if tx.send(key).await.is_err() {
                            break;
                        }
                    }
                    Ok(None) => {
                        tracing::debug!("Console input closed");
                        break;
                    }
                    Err(e) => {
                        tracing::warn!(error = %e, "Console input failed");
                        break;
                    }
                }
            }
        });

        Self {
            keys: rx,
            snapshot_dir: snapshot_dir.into(),
            snapshots: 0,
        }
    }

    /// Snapshots requested so far
    pub fn snapshots(&self) -> u32 {
        self.snapshots
    }

    /// Encode and write on the blocking pool, off the display loop
    fn snapshot(&mut self, frame: &CompositeFrame) {
        self.snapshots += 1;
        let path = self
            .snapshot_dir
            .join(format!("snapshot_{:04}.png", self.snapshots));
        let frame = frame.clone();

        tokio::task::spawn_blocking(move || match save_png(&frame, &path) {
            Ok(()) => tracing::info!(path = %path.display(), "Snapshot saved"),
            Err(e) => tracing::warn!(path = %path.display(), error = %e, "Snapshot failed"),
        });
    }
}

impl Display for ConsoleDisplay {
    fn show(&mut self, frame: &CompositeFrame) -> DisplayFeedback {
        let mut feedback = DisplayFeedback::default();

        while let Ok(key) = self.keys.try_recv() {
            if key == b's' {
                self.snapshot(frame);
            }
            feedback.keys.push(key);
        }

        feedback
    }
}

fn parse_key(line: &str) -> Option<u8> {
    let line = line.trim();
    if line.eq_ignore_ascii_case("esc") {
        return Some(KEY_ESC);
    }
    line.bytes().next()
}

/// Write `frame` as an RGB PNG, creating parent directories
pub fn save_png(frame: &CompositeFrame, path: &Path) -> Result<(), SnapshotError> {
    let resolution = frame.resolution();

    // BGR to RGB
    let mut rgb = frame.as_bytes().to_vec();
    for px in rgb.chunks_exact_mut(3) {
        px.swap(0, 2);
    }

    let mut cursor = Cursor::new(Vec::new());
    PngEncoder::new(&mut cursor).write_image(
        &rgb,
        resolution.width,
        resolution.height,
        ExtendedColorType::Rgb8,
    )?;

    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, cursor.into_inner())?;
    Ok(())
}
