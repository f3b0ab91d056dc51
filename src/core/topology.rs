//! Topology of the 2D grids the layer works with: the minicolumn grid and the input frame.
//!
//! `Grid` converts between arena indices and `(x, y)` coordinates in row-major order.
//! `GridRect` is an inclusive, axis-aligned box clipped to a grid. It describes both receptive
//! fields in input space and Chebyshev neighborhoods in minicolumn space, and iterates over the
//! cells it covers.

use serde::{Deserialize, Serialize};
use std::cmp::min;

/// The shape of a 2D grid stored row-major in a flat arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Grid {
    pub width: u32,
    pub height: u32,
}

impl Grid {
    #[inline]
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// Number of cells in the grid.
    #[inline]
    pub fn len(&self) -> usize {
        self.width as usize * self.height as usize
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Converts `(x, y)` coordinates into a linear arena index.
    #[inline]
    pub fn index(&self, x: u32, y: u32) -> usize {
        y as usize * self.width as usize + x as usize
    }

    /// Converts a linear arena index into `(x, y)` coordinates.
    #[inline]
    pub fn coordinates(&self, index: usize) -> (u32, u32) {
        let width = self.width as usize;
        ((index % width) as u32, (index / width) as u32)
    }

    /// The box of every cell within Chebyshev distance `radius` of `(x, y)`, clipped to the grid.
    #[inline]
    pub fn neighborhood(&self, x: u32, y: u32, radius: u32) -> GridRect {
        GridRect::around(x, y, radius, self.width, self.height)
    }
}

/// An inclusive rectangle `[left, right] x [top, bottom]` of grid cells.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GridRect {
    pub top: u32,
    pub left: u32,
    pub bottom: u32,
    pub right: u32,
}

impl GridRect {
    /// The box centered on `(x, y)` with half-side `radius`, clipped to `[0, width-1] x [0, height-1]`.
    #[inline]
    pub fn around(x: u32, y: u32, radius: u32, width: u32, height: u32) -> Self {
        Self {
            top: y.saturating_sub(radius),
            left: x.saturating_sub(radius),
            bottom: min(y.saturating_add(radius), height.saturating_sub(1)),
            right: min(x.saturating_add(radius), width.saturating_sub(1)),
        }
    }

    #[inline]
    pub fn width(&self) -> u32 {
        self.right - self.left + 1
    }

    #[inline]
    pub fn height(&self) -> u32 {
        self.bottom - self.top + 1
    }

    /// Number of cells covered.
    #[inline]
    pub fn area(&self) -> usize {
        self.width() as usize * self.height() as usize
    }

    #[inline]
    pub fn contains(&self, x: u32, y: u32) -> bool {
        (self.left..=self.right).contains(&x) && (self.top..=self.bottom).contains(&y)
    }

    /// Iterates over the `(x, y)` coordinates of every covered cell in row-major order.
    #[inline]
    pub fn cells(&self) -> Cells {
        Cells {
            rect: *self,
            x: self.left,
            y: self.top,
            remaining: self.area(),
        }
    }
}

/// Iterator over the cells of a `GridRect`.
pub struct Cells {
    rect: GridRect,
    x: u32,
    y: u32,
    remaining: usize,
}

impl Iterator for Cells {
    type Item = (u32, u32);

    fn next(&mut self) -> Option<Self::Item> {
        if self.remaining == 0 {
            return None;
        }
        let cell = (self.x, self.y);
        self.remaining -= 1;
        if self.x == self.rect.right {
            self.x = self.rect.left;
            self.y += 1;
        } else {
            self.x += 1;
        }
        Some(cell)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl ExactSizeIterator for Cells {}
