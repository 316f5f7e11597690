//! Grid layout and nearest-neighbour scaling
//!
//! ```text
//!   N = 4, canvas 1280x720, grid 2x2
//!
//!   x=0          x=640        x=1280
//!   ┌────────────┬────────────┐ y=0
//!   │  tile 0    │  tile 2    │
//!   ├────────────┼────────────┤ y=360
//!   │  tile 1    │  tile 3    │
//!   └────────────┴────────────┘ y=720
//! ```
//!
//! Tiles fill columns first: tile `i` goes to `row = i % rows`,
//! `col = i / rows`.

use crate::slot::frame::BYTES_PER_PIXEL;
use crate::slot::{Frame, Resolution};

/// Window size used when a single stream is shown
pub const DEFAULT_SINGLE_SIZE: Resolution = Resolution::new(80 * 16, 80 * 9);

/// Canvas size used for two or more streams
pub const DEFAULT_CANVAS_SIZE: Resolution = Resolution::new(1280, 720);

/// Column and row count of a grid
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Grid {
    pub cols: u32,
    pub rows: u32,
}

impl Grid {
    pub const fn new(cols: u32, rows: u32) -> Self {
        Self { cols, rows }
    }

    /// Smallest near-square grid holding `count` tiles
    pub fn for_count(count: usize) -> Self {
        if count <= 1 {
            return Self::new(1, 1);
        }
        let cols = (count as f64).sqrt().ceil() as u32;
        let rows = (count as u32).div_ceil(cols);
        Self::new(cols, rows)
    }

    /// Number of cells
    pub fn capacity(&self) -> usize {
        self.cols as usize * self.rows as usize
    }
}

/// Where each tile of a composite goes
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GridLayout {
    count: usize,
    canvas: Resolution,
    grid: Grid,
    cell: Resolution,
}

impl GridLayout {
    /// Layout for `count` tiles
    ///
    /// One tile fills a `single_size` canvas. Two or more share `canvas`,
    /// split by `grid` when it has room for all of them, otherwise by
    /// [`Grid::for_count`].
    pub fn new(count: usize, single_size: Resolution, canvas: Resolution, grid: Option<Grid>) -> Self {
        if count <= 1 {
            return Self {
                count,
                canvas: single_size,
                grid: Grid::new(1, 1),
                cell: single_size,
            };
        }

        let grid = grid
            .filter(|g| g.cols > 0 && g.rows > 0 && g.capacity() >= count)
            .unwrap_or_else(|| Grid::for_count(count));
        let cell = Resolution::new(canvas.width / grid.cols, canvas.height / grid.rows);

        Self {
            count,
            canvas,
            grid,
            cell,
        }
    }

    /// Layout with the default sizes and a derived grid
    pub fn for_count(count: usize) -> Self {
        Self::new(count, DEFAULT_SINGLE_SIZE, DEFAULT_CANVAS_SIZE, None)
    }

    pub fn count(&self) -> usize {
        self.count
    }

    pub fn canvas(&self) -> Resolution {
        self.canvas
    }

    pub fn grid(&self) -> Grid {
        self.grid
    }

    pub fn cell_size(&self) -> Resolution {
        self.cell
    }

    /// Top-left corner of tile `index`
    pub fn cell_origin(&self, index: usize) -> Option<(u32, u32)> {
        if index >= self.count.max(1) {
            return None;
        }
        let rows = self.grid.rows as usize;
        let row = (index % rows) as u32;
        let col = (index / rows) as u32;
        Some((col * self.cell.width, row * self.cell.height))
    }

    /// X positions of the vertical separator lines
    pub fn vertical_separators(&self) -> Vec<u32> {
        (1..self.grid.cols).map(|c| c * self.cell.width).collect()
    }

    /// Y positions of the horizontal separator lines
    pub fn horizontal_separators(&self) -> Vec<u32> {
        (1..self.grid.rows).map(|r| r * self.cell.height).collect()
    }
}

/// Scale `frame` to `target` by nearest-neighbour sampling
///
/// Returns the frame unchanged (a cheap clone) when it already has the
/// target size, and a blank frame when either size is empty.
pub fn resize_nearest(frame: &Frame, target: Resolution) -> Frame {
    let source = frame.resolution();
    if source == target {
        return frame.clone();
    }
    if source.is_empty() || target.is_empty() {
        return Frame::blank(target);
    }

    let src = frame.data();
    let src_stride = source.width as usize * BYTES_PER_PIXEL;

    // Source column byte offset for each target column
    let columns: Vec<usize> = (0..target.width as u64)
        .map(|x| (x * source.width as u64 / target.width as u64) as usize * BYTES_PER_PIXEL)
        .collect();

    let mut out = Vec::with_capacity(target.byte_len());
    for y in 0..target.height as u64 {
        let sy = (y * source.height as u64 / target.height as u64) as usize;
        let row = &src[sy * src_stride..(sy + 1) * src_stride];
        for &offset in &columns {
            out.extend_from_slice(&row[offset..offset + BYTES_PER_PIXEL]);
        }
    }

    Frame::new(target, out).unwrap_or_else(|| Frame::blank(target))
}
