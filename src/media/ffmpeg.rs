//! ffmpeg-backed media capability
//!
//! Decoding and encoding are delegated to `ffmpeg` child processes talking
//! raw BGR24 over pipes:
//!
//! ```text
//!   ffprobe -of json URL        -> width, height, avg_frame_rate
//!   ffmpeg -i URL -f rawvideo -s WxH -> stdout: w*h*3 bytes per frame
//!   stdin: w*h*3 bytes / frame  -> ffmpeg -f rawvideo -i pipe:0 -c:v libx264 out.mp4
//! ```
//!
//! Every child is spawned with `kill_on_drop`, so dropping a capture or a
//! timed-out open never leaks a process.

use std::path::PathBuf;
use std::process::Stdio;
use std::time::Duration;

use serde::Deserialize;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::process::{Child, ChildStdin, ChildStdout, Command};

use super::{Capture, CaptureRequest, FrameWriter, MediaBackend, MediaError, WriterRequest};
use crate::slot::{Frame, Resolution};

/// Media backend driving `ffmpeg` and `ffprobe`
#[derive(Debug, Clone)]
pub struct FfmpegBackend {
    ffmpeg_path: String,
    ffprobe_path: String,
}

impl FfmpegBackend {
    /// Create a backend using `FFMPEG_PATH` / `FFPROBE_PATH`, falling back to
    /// the binaries on `PATH`
    pub fn new() -> Self {
        Self {
            ffmpeg_path: std::env::var("FFMPEG_PATH").unwrap_or_else(|_| "ffmpeg".to_string()),
            ffprobe_path: std::env::var("FFPROBE_PATH").unwrap_or_else(|_| "ffprobe".to_string()),
        }
    }

    /// Create with custom binary paths
    pub fn with_paths(ffmpeg: impl Into<String>, ffprobe: impl Into<String>) -> Self {
        Self {
            ffmpeg_path: ffmpeg.into(),
            ffprobe_path: ffprobe.into(),
        }
    }

    async fn probe(&self, request: &CaptureRequest) -> Result<ProbeInfo, MediaError> {
        let mut cmd = Command::new(&self.ffprobe_path);
        cmd.args(probe_args(request))
            .env("LC_ALL", "C")
            .stdin(Stdio::null())
            .kill_on_drop(true);

        let output = tokio::time::timeout(request.open_timeout, cmd.output())
            .await
            .map_err(|_| MediaError::Timeout(request.open_timeout))?
            .map_err(|e| MediaError::Spawn {
                program: self.ffprobe_path.clone(),
                source: e,
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(MediaError::Open(stderr.trim().to_string()));
        }

        parse_probe_output(&output.stdout)
    }
}

impl Default for FfmpegBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl MediaBackend for FfmpegBackend {
    type Capture = FfmpegCapture;
    type Writer = FfmpegWriter;

    async fn open_capture(&self, request: &CaptureRequest) -> Result<FfmpegCapture, MediaError> {
        let info = self.probe(request).await?;

        tracing::debug!(
            resolution = %info.resolution,
            fps = ?info.fps,
            "Source probed"
        );

        let mut cmd = Command::new(&self.ffmpeg_path);
        cmd.args(capture_args(request, info.resolution))
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .kill_on_drop(true);

        let mut child = cmd.spawn().map_err(|e| MediaError::Spawn {
            program: self.ffmpeg_path.clone(),
            source: e,
        })?;

        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| MediaError::Open("ffmpeg stdout not captured".into()))?;

        Ok(FfmpegCapture {
            child,
            stdout,
            resolution: info.resolution,
            fps: info.fps,
            read_timeout: request.read_timeout,
        })
    }

    async fn open_writer(&self, request: &WriterRequest) -> Result<FfmpegWriter, MediaError> {
        let mut cmd = Command::new(&self.ffmpeg_path);
        cmd.args(writer_args(request))
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .kill_on_drop(true);

        let mut child = cmd.spawn().map_err(|e| MediaError::Spawn {
            program: self.ffmpeg_path.clone(),
            source: e,
        })?;

        // Catch immediate failures such as an unwritable path
        if let Some(status) = child.try_wait()? {
            return Err(MediaError::Open(format!("ffmpeg exited with {}", status)));
        }

        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| MediaError::Open("ffmpeg stdin not captured".into()))?;

        Ok(FfmpegWriter {
            child,
            stdin: Some(stdin),
            size: request.size,
            path: request.path.clone(),
        })
    }
}

/// A live `ffmpeg` decode process
pub struct FfmpegCapture {
    child: Child,
    stdout: ChildStdout,
    resolution: Resolution,
    fps: Option<f64>,
    read_timeout: Duration,
}

impl Capture for FfmpegCapture {
    fn resolution(&self) -> Resolution {
        self.resolution
    }

    fn fps(&self) -> Option<f64> {
        self.fps
    }

    async fn read(&mut self) -> Result<Frame, MediaError> {
        let mut buf = vec![0u8; self.resolution.byte_len()];

        match tokio::time::timeout(self.read_timeout, self.stdout.read_exact(&mut buf)).await {
            Err(_) => Err(MediaError::Timeout(self.read_timeout)),
            Ok(Err(e)) if e.kind() == std::io::ErrorKind::UnexpectedEof => {
                Err(MediaError::EndOfStream)
            }
            Ok(Err(e)) => Err(MediaError::Read(e.to_string())),
            Ok(Ok(_)) => Frame::new(self.resolution, buf)
                .ok_or_else(|| MediaError::Read("short frame".into())),
        }
    }

    async fn release(mut self) {
        if let Err(e) = self.child.kill().await {
            tracing::debug!(error = %e, "ffmpeg capture already exited");
        }
    }
}

/// A live `ffmpeg` encode process
pub struct FfmpegWriter {
    child: Child,
    stdin: Option<ChildStdin>,
    size: Resolution,
    path: PathBuf,
}

impl FrameWriter for FfmpegWriter {
    async fn write(&mut self, frame: &Frame) -> Result<(), MediaError> {
        if frame.resolution() != self.size {
            return Err(MediaError::Write(format!(
                "frame is {}, writer expects {}",
                frame.resolution(),
                self.size
            )));
        }

        let stdin = self
            .stdin
            .as_mut()
            .ok_or_else(|| MediaError::Write("writer closed".into()))?;

        stdin
            .write_all(frame.data())
            .await
            .map_err(|e| MediaError::Write(e.to_string()))
    }

    async fn close(mut self) -> Result<(), MediaError> {
        if let Some(mut stdin) = self.stdin.take() {
            stdin.flush().await?;
            stdin.shutdown().await?;
        }

        // EOF on stdin lets ffmpeg finalize the container
        let status = self.child.wait().await?;
        if !status.success() {
            return Err(MediaError::Write(format!(
                "ffmpeg exited with {} while finalizing {}",
                status,
                self.path.display()
            )));
        }
        Ok(())
    }
}

/// Parameters reported by `ffprobe`
#[derive(Debug, Clone, PartialEq)]
struct ProbeInfo {
    resolution: Resolution,
    fps: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct ProbeOutput {
    #[serde(default)]
    streams: Vec<ProbeStream>,
}

#[derive(Debug, Deserialize)]
struct ProbeStream {
    width: Option<u32>,
    height: Option<u32>,
    avg_frame_rate: Option<String>,
}

fn parse_probe_output(stdout: &[u8]) -> Result<ProbeInfo, MediaError> {
    let output: ProbeOutput =
        serde_json::from_slice(stdout).map_err(|e| MediaError::Probe(e.to_string()))?;

    let stream = output
        .streams
        .into_iter()
        .next()
        .ok_or_else(|| MediaError::Probe("no video stream".into()))?;

    let resolution = match (stream.width, stream.height) {
        (Some(w), Some(h)) if w > 0 && h > 0 => Resolution::new(w, h),
        _ => return Err(MediaError::Probe("video stream has no dimensions".into())),
    };

    Ok(ProbeInfo {
        resolution,
        fps: stream.avg_frame_rate.as_deref().and_then(parse_frame_rate),
    })
}

/// Parse an ffprobe rational such as "25/1" or "30000/1001"
fn parse_frame_rate(rate: &str) -> Option<f64> {
    let (num, den) = rate.split_once('/')?;
    let num: f64 = num.trim().parse().ok()?;
    let den: f64 = den.trim().parse().ok()?;
    if num <= 0.0 || den <= 0.0 {
        return None;
    }
    Some(num / den)
}

fn is_rtsp(url: &str) -> bool {
    url.starts_with("rtsp://") || url.starts_with("rtsps://")
}

/// Demuxer options placed before the input URL
fn source_options(request: &CaptureRequest) -> Vec<String> {
    if !is_rtsp(&request.url) {
        return Vec::new();
    }
    vec![
        "-rtsp_transport".to_string(),
        request.transport.as_str().to_string(),
        // Socket I/O timeout, in microseconds
        "-timeout".to_string(),
        request.read_timeout.as_micros().to_string(),
    ]
}

fn probe_args(request: &CaptureRequest) -> Vec<String> {
    let mut args = vec!["-v".to_string(), "error".to_string()];
    args.extend(source_options(request));
    args.extend(
        [
            "-select_streams",
            "v:0",
            "-show_entries",
            "stream=width,height,avg_frame_rate",
            "-of",
            "json",
        ]
        .iter()
        .map(|s| s.to_string()),
    );
    // ffprobe takes the URL positionally
    args.push(request.url.clone());
    args
}

/// Decode to raw BGR24 frames pinned at `size`
fn capture_args(request: &CaptureRequest, size: Resolution) -> Vec<String> {
    let mut args: Vec<String> = ["-hide_banner", "-nostdin", "-loglevel", "error"]
        .iter()
        .map(|s| s.to_string())
        .collect();
    args.extend(source_options(request));
    args.push("-i".to_string());
    args.push(request.url.clone());
    args.extend(
        ["-an", "-f", "rawvideo", "-pix_fmt", "bgr24"]
            .iter()
            .map(|s| s.to_string()),
    );
    // Output geometry must not follow mid-stream size changes
    args.push("-s".to_string());
    args.push(size.to_string());
    args.push("pipe:1".to_string());
    args
}

/// Pick an encoder for a four-character codec tag
fn encoder_for_tag(tag: &str) -> &'static str {
    match tag.to_ascii_lowercase().as_str() {
        "hvc1" | "hev1" | "hevc" => "libx265",
        "mp4v" => "mpeg4",
        "mjpg" => "mjpeg",
        _ => "libx264",
    }
}

fn writer_args(request: &WriterRequest) -> Vec<String> {
    vec![
        "-y".to_string(),
        "-hide_banner".to_string(),
        "-loglevel".to_string(),
        "error".to_string(),
        "-f".to_string(),
        "rawvideo".to_string(),
        "-pix_fmt".to_string(),
        "bgr24".to_string(),
        "-s".to_string(),
        request.size.to_string(),
        "-r".to_string(),
        request.fps.to_string(),
        "-i".to_string(),
        "pipe:0".to_string(),
        "-c:v".to_string(),
        encoder_for_tag(&request.codec_tag).to_string(),
        "-pix_fmt".to_string(),
        "yuv420p".to_string(),
        "-tag:v".to_string(),
        request.codec_tag.clone(),
        request.path.display().to_string(),
    ]
}
