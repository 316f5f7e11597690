//! Decoded frame types
//!
//! Frames are packed BGR24 images: three bytes per pixel, rows top to bottom,
//! no padding.

use bytes::Bytes;

/// Bytes per BGR24 pixel
pub const BYTES_PER_PIXEL: usize = 3;

/// Frame dimensions in pixels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Resolution {
    /// Width in pixels
    pub width: u32,
    /// Height in pixels
    pub height: u32,
}

impl Resolution {
    /// Create a new resolution
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// Whether either dimension is zero
    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    /// Size of a BGR24 buffer of this resolution
    pub fn byte_len(&self) -> usize {
        self.width as usize * self.height as usize * BYTES_PER_PIXEL
    }
}

impl std::fmt::Display for Resolution {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

/// An immutable decoded image
///
/// Cheap to clone: the pixel buffer is reference counted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    resolution: Resolution,
    data: Bytes,
}

impl Frame {
    /// Wrap a BGR24 buffer
    ///
    /// Returns `None` if the buffer length does not match the resolution.
    pub fn new(resolution: Resolution, data: impl Into<Bytes>) -> Option<Self> {
        let data = data.into();
        if data.len() != resolution.byte_len() {
            return None;
        }
        Some(Self { resolution, data })
    }

    /// A zero-filled (black) frame
    pub fn blank(resolution: Resolution) -> Self {
        Self::filled(resolution, 0)
    }

    /// A frame with every byte set to `value`
    pub fn filled(resolution: Resolution, value: u8) -> Self {
        Self {
            resolution,
            data: Bytes::from(vec![value; resolution.byte_len()]),
        }
    }

    pub fn resolution(&self) -> Resolution {
        self.resolution
    }

    pub fn width(&self) -> u32 {
        self.resolution.width
    }

    pub fn height(&self) -> u32 {
        self.resolution.height
    }

    /// Raw BGR24 bytes
    pub fn data(&self) -> &Bytes {
        &self.data
    }

    /// BGR value of the pixel at (x, y)
    pub fn pixel(&self, x: u32, y: u32) -> Option<[u8; 3]> {
        if x >= self.resolution.width || y >= self.resolution.height {
            return None;
        }
        let offset = (y as usize * self.resolution.width as usize + x as usize) * BYTES_PER_PIXEL;
        let px = &self.data[offset..offset + BYTES_PER_PIXEL];
        Some([px[0], px[1], px[2]])
    }

    /// Whether every byte is zero
    pub fn is_blank(&self) -> bool {
        self.data.iter().all(|&b| b == 0)
    }
}
