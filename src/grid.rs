//! Maps a 3×3 grid cell to a pixel offset from the panel center.
//!
//! The drawable area is the panel shrunk by a margin on every side, split
//! into three rows and three columns. Cells are numbered row-major from the
//! top-left:
//!
//! ```text
//! 0 1 2
//! 3 4 5
//! 6 7 8
//! ```

use crate::{Geometry, Offset};

pub const GRID_COLS: usize = 3;
pub const GRID_ROWS: usize = 3;
pub const GRID_CELLS: usize = GRID_COLS * GRID_ROWS;

/// Inset from the panel edges, in density-independent units.
pub const GRID_MARGIN_DP: f32 = 56.0;

/// Convert a margin in density-independent units to whole panel pixels.
pub fn margin_px(margin_dp: f32, density: f32) -> u32 {
    (margin_dp * density).round().max(0.0) as u32
}

/// Offset from the geometry's center to the center of `cell`.
///
/// Done in floating point and rounded half away from zero, so cells that
/// mirror each other through the center get offsets of equal magnitude.
///
/// # Panics
/// In debug builds, if `cell >= GRID_CELLS`.
pub fn cell_offset(cell: usize, geometry: Geometry, margin: u32) -> Offset {
    debug_assert!(cell < GRID_CELLS, "cell index {cell} out of range");

    let width = geometry.width.max(1) as f32;
    let height = geometry.height.max(1) as f32;
    let margin = margin as f32;

    let inset_w = (width - 2.0 * margin).max(1.0);
    let inset_h = (height - 2.0 * margin).max(1.0);
    let cell_w = inset_w / GRID_COLS as f32;
    let cell_h = inset_h / GRID_ROWS as f32;

    let row = (cell / GRID_COLS) as f32;
    let col = (cell % GRID_COLS) as f32;

    // Center the inset area even when the clamp made it wider than the panel.
    let origin_x = (width - inset_w) / 2.0;
    let origin_y = (height - inset_h) / 2.0;
    let center_x = origin_x + col * cell_w + cell_w / 2.0;
    let center_y = origin_y + row * cell_h + cell_h / 2.0;

    Offset::new(
        (center_x - width / 2.0).round() as i32,
        (center_y - height / 2.0).round() as i32,
    )
}
