//! Recorder target configuration

use std::path::PathBuf;

use crate::error::RecorderError;
use crate::slot::Resolution;

/// Codec tag used for recordings
pub const DEFAULT_CODEC_TAG: &str = "avc1";

/// Default recording cadence
pub const DEFAULT_TARGET_FPS: u32 = 20;

/// Where and how a recorder writes
///
/// Every field starts unset; `RecorderSession::start()` rejects a target
/// missing any of them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecorderTarget {
    /// Output file
    pub output_path: Option<PathBuf>,

    /// Frames written per second
    pub target_fps: Option<u32>,

    /// Output frame size; frames of another size are scaled to it
    pub frame_size: Option<Resolution>,

    /// Four-character codec tag
    pub codec_tag: String,
}

impl Default for RecorderTarget {
    fn default() -> Self {
        Self {
            output_path: None,
            target_fps: None,
            frame_size: None,
            codec_tag: DEFAULT_CODEC_TAG.to_string(),
        }
    }
}

impl RecorderTarget {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the output file
    pub fn output_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.output_path = Some(path.into());
        self
    }

    /// Set the cadence
    pub fn target_fps(mut self, fps: u32) -> Self {
        self.target_fps = Some(fps);
        self
    }

    /// Set the output frame size
    pub fn frame_size(mut self, size: Resolution) -> Self {
        self.frame_size = Some(size);
        self
    }

    /// Set the codec tag
    pub fn codec_tag(mut self, tag: impl Into<String>) -> Self {
        self.codec_tag = tag.into();
        self
    }

    /// Check every field, returning `(path, fps, size)`
    pub(crate) fn resolve(&self) -> Result<(PathBuf, u32, Resolution), RecorderError> {
        let path = self
            .output_path
            .clone()
            .filter(|p| !p.as_os_str().is_empty())
            .ok_or(RecorderError::MissingOutputPath)?;
        let fps = self
            .target_fps
            .filter(|&fps| fps > 0)
            .ok_or(RecorderError::MissingTargetFps)?;
        let size = self
            .frame_size
            .filter(|size| !size.is_empty())
            .ok_or(RecorderError::MissingFrameSize)?;
        Ok((path, fps, size))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_target_is_unset() {
        let target = RecorderTarget::default();

        assert!(target.output_path.is_none());
        assert!(target.target_fps.is_none());
        assert!(target.frame_size.is_none());
        assert_eq!(target.codec_tag, "avc1");
    }

    #[test]
    fn test_builder_chaining() {
        let target = RecorderTarget::new()
            .output_path("out.mp4")
            .target_fps(25)
            .frame_size(Resolution::new(1280, 720));

        let (path, fps, size) = target.resolve().unwrap();
        assert_eq!(path, PathBuf::from("out.mp4"));
        assert_eq!(fps, 25);
        assert_eq!(size, Resolution::new(1280, 720));
    }

    #[test]
    fn test_resolve_reports_first_missing_field() {
        let target = RecorderTarget::new().target_fps(20);
        assert!(matches!(
            target.resolve(),
            Err(RecorderError::MissingOutputPath)
        ));

        let target = RecorderTarget::new()
            .output_path("out.mp4")
            .target_fps(0)
            .frame_size(Resolution::new(2, 2));
        assert!(matches!(target.resolve(), Err(RecorderError::MissingTargetFps)));

        let target = RecorderTarget::new()
            .output_path("out.mp4")
            .target_fps(20)
            .frame_size(Resolution::new(0, 720));
        assert!(matches!(target.resolve(), Err(RecorderError::MissingFrameSize)));
    }
}
