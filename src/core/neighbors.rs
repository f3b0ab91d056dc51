//! Incremental maintenance of a minicolumn's neighbor list.
//!
//! A minicolumn's neighbors are every other minicolumn within Chebyshev distance
//! `inhibition_radius` of it, clipped to the layer grid. The radius drifts between timesteps,
//! so instead of rebuilding the list from scratch each time, growth is handled by visiting only
//! the cells that joined the neighborhood. The difference between the new and the old box is cut
//! into up to four axis-aligned bands:
//!
//! ```text
//!   +-----------------+
//!   |       top       |
//!   +----+-------+----+
//!   |left|  old  |rght|
//!   +----+-------+----+
//!   |     bottom      |
//!   +-----------------+
//! ```
//!
//! Top and bottom span the full new width, left and right span the old box's rows.
//!
//! Shrinking (or an unchanged clipped area) drops the whole list and rebuilds it for the new
//! radius. Cells that stayed in the neighborhood are visited again, which is wasted work on
//! shrink, but the band decomposition above only holds for growth.

use super::topology::{Grid, GridRect};
use crate::error::{HtmError, Result};

/// Number of neighbors of `(x, y)` at `radius`, the minicolumn itself excluded.
#[inline]
pub fn neighbor_count(grid: Grid, x: u32, y: u32, radius: u32) -> usize {
    grid.neighborhood(x, y, radius).area() - 1
}

/// Brings `neighbors` of the minicolumn at `(x, y)` from `old_radius` to `new_radius`.
///
/// `old_radius` must be the radius `neighbors` was last built for, or `None` if it was never
/// built. Entries are arena indices into a layer of shape `grid`. On error the list is left
/// unchanged.
pub fn update_neighbors(
    neighbors: &mut Vec<usize>,
    grid: Grid,
    x: u32,
    y: u32,
    old_radius: Option<u32>,
    new_radius: u32,
) -> Result<()> {
    let old_area = old_radius.map_or(0, |r| neighbor_count(grid, x, y, r));
    let new_area = neighbor_count(grid, x, y, new_radius);
    let new_rect = grid.neighborhood(x, y, new_radius);

    if new_area <= old_area {
        let mut rebuilt = Vec::new();
        fill_full(&mut rebuilt, grid, new_rect, x, y, new_area)?;
        *neighbors = rebuilt;
        return Ok(());
    }

    if old_area == 0 {
        neighbors.clear();
        return fill_full(neighbors, grid, new_rect, x, y, new_area);
    }

    debug_assert_eq!(neighbors.len(), old_area);
    reserve(neighbors, new_area - neighbors.len())?;

    // old_area > 0 implies old_radius is set.
    let old_rect = grid.neighborhood(x, y, old_radius.unwrap_or(0));
    for band in growth_bands(old_rect, new_rect) {
        neighbors.extend(band.cells().map(|(bx, by)| grid.index(bx, by)));
    }

    debug_assert_eq!(neighbors.len(), new_area);
    Ok(())
}

/// Every cell of `rect` except `(x, y)`, written into an empty `neighbors`.
fn fill_full(
    neighbors: &mut Vec<usize>,
    grid: Grid,
    rect: GridRect,
    x: u32,
    y: u32,
    count: usize,
) -> Result<()> {
    reserve(neighbors, count)?;
    neighbors.extend(
        rect.cells()
            .filter(|&(cx, cy)| cx != x || cy != y)
            .map(|(cx, cy)| grid.index(cx, cy)),
    );
    Ok(())
}

fn reserve(neighbors: &mut Vec<usize>, additional: usize) -> Result<()> {
    neighbors.try_reserve_exact(additional).map_err(|e| {
        HtmError::Allocation(format!("neighbor buffer of {additional} entries: {e}"))
    })
}

/// Splits `new - old` into disjoint top, bottom, left and right bands.
/// `old` must lie inside `new`.
pub fn growth_bands(old: GridRect, new: GridRect) -> impl Iterator<Item = GridRect> {
    let top = (new.top < old.top).then(|| GridRect {
        top: new.top,
        left: new.left,
        bottom: old.top - 1,
        right: new.right,
    });
    let bottom = (new.bottom > old.bottom).then(|| GridRect {
        top: old.bottom + 1,
        left: new.left,
        bottom: new.bottom,
        right: new.right,
    });
    let left = (new.left < old.left).then(|| GridRect {
        top: old.top,
        left: new.left,
        bottom: old.bottom,
        right: old.left - 1,
    });
    let right = (new.right > old.right).then(|| GridRect {
        top: old.top,
        left: old.right + 1,
        bottom: old.bottom,
        right: new.right,
    });
    [top, bottom, left, right].into_iter().flatten()
}
