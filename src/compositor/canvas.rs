//! Composite canvas
//!
//! Holds the tiled image between cycles. A cell is only repainted when its
//! session delivers a frame, so a disconnected stream keeps showing the last
//! picture it produced.

use bytes::BytesMut;

use super::layout::{resize_nearest, GridLayout};
use crate::slot::frame::BYTES_PER_PIXEL;
use crate::slot::{Frame, Resolution};

/// Separator line colour (BGR)
pub const SEPARATOR_COLOR: [u8; 3] = [255, 255, 255];

/// Mutable BGR24 canvas holding every tile
#[derive(Debug, Clone)]
pub struct CompositeFrame {
    resolution: Resolution,
    data: BytesMut,
}

impl CompositeFrame {
    /// A black canvas
    pub fn new(resolution: Resolution) -> Self {
        Self {
            resolution,
            data: BytesMut::zeroed(resolution.byte_len()),
        }
    }

    pub fn resolution(&self) -> Resolution {
        self.resolution
    }

    /// Raw BGR24 bytes
    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    /// BGR value at (x, y)
    pub fn pixel(&self, x: u32, y: u32) -> Option<[u8; 3]> {
        let offset = self.offset(x, y)?;
        let px = &self.data[offset..offset + BYTES_PER_PIXEL];
        Some([px[0], px[1], px[2]])
    }

    /// Copy the canvas into an immutable frame
    pub fn to_frame(&self) -> Frame {
        Frame::new(self.resolution, self.data.clone().freeze())
            .unwrap_or_else(|| Frame::blank(self.resolution))
    }

    /// Copy `frame` with its top-left corner at (x, y), clipped to the canvas
    pub fn blit(&mut self, frame: &Frame, x: u32, y: u32) {
        if x >= self.resolution.width || y >= self.resolution.height {
            return;
        }

        let width = frame.width().min(self.resolution.width - x) as usize;
        let height = frame.height().min(self.resolution.height - y);
        let src_stride = frame.width() as usize * BYTES_PER_PIXEL;
        let row_len = width * BYTES_PER_PIXEL;
        let src = frame.data();

        for row in 0..height {
            let Some(dst) = self.offset(x, y + row) else {
                break;
            };
            let src_start = row as usize * src_stride;
            self.data[dst..dst + row_len].copy_from_slice(&src[src_start..src_start + row_len]);
        }
    }

    /// Draw a one-pixel vertical line at column `x`
    pub fn draw_vertical_line(&mut self, x: u32, color: [u8; 3]) {
        for y in 0..self.resolution.height {
            self.put_pixel(x, y, color);
        }
    }

    /// Draw a one-pixel horizontal line at row `y`
    pub fn draw_horizontal_line(&mut self, y: u32, color: [u8; 3]) {
        for x in 0..self.resolution.width {
            self.put_pixel(x, y, color);
        }
    }

    fn put_pixel(&mut self, x: u32, y: u32, color: [u8; 3]) {
        if let Some(offset) = self.offset(x, y) {
            self.data[offset..offset + BYTES_PER_PIXEL].copy_from_slice(&color);
        }
    }

    fn offset(&self, x: u32, y: u32) -> Option<usize> {
        if x >= self.resolution.width || y >= self.resolution.height {
            return None;
        }
        Some((y as usize * self.resolution.width as usize + x as usize) * BYTES_PER_PIXEL)
    }
}

/// Lays tiles out on a persistent canvas
#[derive(Debug)]
pub struct Compositor {
    layout: GridLayout,
    canvas: CompositeFrame,
}

impl Compositor {
    pub fn new(layout: GridLayout) -> Self {
        let mut compositor = Self {
            canvas: CompositeFrame::new(layout.canvas()),
            layout,
        };
        compositor.draw_separators();
        compositor
    }

    pub fn layout(&self) -> &GridLayout {
        &self.layout
    }

    pub fn canvas(&self) -> &CompositeFrame {
        &self.canvas
    }

    /// Paint one cycle
    ///
    /// `tiles[i]` is the frame for cell `i`, or `None` to leave that cell as
    /// it is.
    pub fn compose(&mut self, tiles: &[Option<Frame>]) -> &CompositeFrame {
        let cell = self.layout.cell_size();

        for (index, tile) in tiles.iter().enumerate() {
            let (Some(frame), Some((x, y))) = (tile, self.layout.cell_origin(index)) else {
                continue;
            };
            let scaled = resize_nearest(frame, cell);
            self.canvas.blit(&scaled, x, y);
        }

        self.draw_separators();
        &self.canvas
    }

    fn draw_separators(&mut self) {
        for x in self.layout.vertical_separators() {
            self.canvas.draw_vertical_line(x, SEPARATOR_COLOR);
        }
        for y in self.layout.horizontal_separators() {
            self.canvas.draw_horizontal_line(y, SEPARATOR_COLOR);
        }
    }
}
