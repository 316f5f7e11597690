//! Media capability
//!
//! The crate never decodes or encodes video itself. A [`MediaBackend`] turns a
//! URL into a [`Capture`] that yields decoded frames, and an output path into a
//! [`FrameWriter`] that encodes them.
//!
//! This module provides:
//! - The backend traits
//! - Open requests carrying transport hints and timeouts
//! - [`FfmpegBackend`], which drives `ffmpeg`/`ffprobe` child processes

pub mod error;
pub mod ffmpeg;

#[cfg(test)]
pub(crate) mod testing;

use std::future::Future;
use std::path::PathBuf;
use std::time::Duration;

use crate::slot::{Frame, Resolution};

pub use error::MediaError;
pub use ffmpeg::FfmpegBackend;

/// Lower-transport hint for RTSP sources
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Transport {
    /// Interleaved over the RTSP TCP connection (survives NAT and lossy links)
    #[default]
    Tcp,
    /// Plain RTP over UDP
    Udp,
}

impl Transport {
    pub fn as_str(&self) -> &'static str {
        match self {
            Transport::Tcp => "tcp",
            Transport::Udp => "udp",
        }
    }
}

/// Parameters for opening a capture
#[derive(Debug, Clone)]
pub struct CaptureRequest {
    /// Full connection URL, credentials included
    pub url: String,
    /// Transport hint
    pub transport: Transport,
    /// Time allowed for the open to complete
    pub open_timeout: Duration,
    /// Time allowed for a single frame read
    pub read_timeout: Duration,
}

/// Parameters for opening an output writer
#[derive(Debug, Clone)]
pub struct WriterRequest {
    /// Output file path
    pub path: PathBuf,
    /// Four-character codec tag (e.g. "avc1")
    pub codec_tag: String,
    /// Output frame rate
    pub fps: u32,
    /// Output frame size; every written frame must match it
    pub size: Resolution,
}

/// Factory for captures and writers
pub trait MediaBackend: Send + Sync + 'static {
    type Capture: Capture;
    type Writer: FrameWriter;

    /// Open a source and negotiate its resolution
    fn open_capture(
        &self,
        request: &CaptureRequest,
    ) -> impl Future<Output = Result<Self::Capture, MediaError>> + Send;

    /// Create an output file
    fn open_writer(
        &self,
        request: &WriterRequest,
    ) -> impl Future<Output = Result<Self::Writer, MediaError>> + Send;
}

/// An open source of decoded frames
pub trait Capture: Send + 'static {
    /// Negotiated frame size
    fn resolution(&self) -> Resolution;

    /// Source frame rate, if the source advertises one
    fn fps(&self) -> Option<f64>;

    /// Read the next frame
    fn read(&mut self) -> impl Future<Output = Result<Frame, MediaError>> + Send;

    /// Release the underlying connection
    fn release(self) -> impl Future<Output = ()> + Send;
}

/// An open encoded-video output
pub trait FrameWriter: Send + 'static {
    /// Append one frame
    fn write(&mut self, frame: &Frame) -> impl Future<Output = Result<(), MediaError>> + Send;

    /// Flush and close the output
    fn close(self) -> impl Future<Output = Result<(), MediaError>> + Send;
}
