//! A `Repr` is a binary input frame: a 2D grid of bits packed into 32-bit words.
//!
//! The user sees rows and columns, but the bits live in one flat row-major vector of words.
//! Bit `(row, col)` is stored at linear position `row * cols + col`, in word `pos / 32`
//! at bit `pos % 32`. The shape never changes after construction; bit values are rewritten
//! by the encoder between timesteps.

use std::fmt;
use tracing::warn;

/// Number of bits stored per word.
const WORD_BITS: usize = u32::BITS as usize;

/// A bit-packed binary frame of `rows * cols` bits.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Repr {
    rows: u32,
    cols: u32,
    bits: Vec<u32>,
}

impl Repr {
    /// Creates a new `Repr` with every bit cleared.
    #[inline]
    pub fn new(rows: u32, cols: u32) -> Self {
        let len = rows as usize * cols as usize;
        Self {
            rows,
            cols,
            bits: vec![0; len.div_ceil(WORD_BITS)],
        }
    }

    /// Creates a new `Repr` with every bit set.
    #[inline]
    pub fn filled(rows: u32, cols: u32) -> Self {
        let mut repr = Self::new(rows, cols);
        repr.fill(true);
        repr
    }

    /// Creates a new `Repr` whose bit at `(row, col)` is `f(row, col)`.
    pub fn from_fn<F>(rows: u32, cols: u32, mut f: F) -> Self
    where
        F: FnMut(u32, u32) -> bool,
    {
        let mut repr = Self::new(rows, cols);
        for row in 0..rows {
            for col in 0..cols {
                if f(row, col) {
                    repr.put(row, col, true);
                }
            }
        }
        repr
    }

    #[inline]
    pub fn rows(&self) -> u32 {
        self.rows
    }

    #[inline]
    pub fn cols(&self) -> u32 {
        self.cols
    }

    /// Total number of bits in the frame.
    #[inline]
    pub fn len(&self) -> usize {
        self.rows as usize * self.cols as usize
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns `true` if `(row, col)` lies inside the grid.
    #[inline]
    pub fn contains(&self, row: u32, col: u32) -> bool {
        row < self.rows && col < self.cols
    }

    /// Returns the bit at `(row, col)`. Positions outside the grid read as `false`.
    #[inline]
    pub fn get(&self, row: u32, col: u32) -> bool {
        self.contains(row, col) && self.test(row, col)
    }

    /// Sets the bit at `(row, col)`.
    #[inline]
    pub fn set(&mut self, row: u32, col: u32) {
        self.assign(row, col, true);
    }

    /// Clears the bit at `(row, col)`.
    #[inline]
    pub fn clear(&mut self, row: u32, col: u32) {
        self.assign(row, col, false);
    }

    /// Writes `value` to `(row, col)`. Writes outside the grid are logged and dropped.
    pub fn assign(&mut self, row: u32, col: u32, value: bool) {
        if !self.contains(row, col) {
            warn!(
                row,
                col,
                rows = self.rows,
                cols = self.cols,
                "attempt to modify repr bit outside range"
            );
            return;
        }
        self.put(row, col, value);
    }

    /// Sets or clears every bit. Padding bits in the last word stay cleared.
    pub fn fill(&mut self, value: bool) {
        if !value {
            self.bits.fill(0);
            return;
        }
        self.bits.fill(u32::MAX);
        let extra = self.len() % WORD_BITS;
        if extra != 0 {
            if let Some(last) = self.bits.last_mut() {
                *last = u32::MAX >> (WORD_BITS - extra);
            }
        }
    }

    /// Number of set bits.
    #[inline]
    pub fn count_ones(&self) -> usize {
        self.bits.iter().map(|word| word.count_ones() as usize).sum()
    }

    /// Iterates over the `(row, col)` coordinates of every set bit in row-major order.
    pub fn iter_ones(&self) -> impl Iterator<Item = (u32, u32)> + '_ {
        let cols = self.cols as usize;
        self.bits
            .iter()
            .enumerate()
            .flat_map(move |(w, &word)| {
                (0..WORD_BITS)
                    .filter(move |b| word & (1 << b) != 0)
                    .map(move |b| w * WORD_BITS + b)
            })
            .map(move |pos| ((pos / cols) as u32, (pos % cols) as u32))
    }

    /// Unchecked read used on the hot path, callers guarantee `(row, col)` is in range.
    #[inline]
    pub(crate) fn test(&self, row: u32, col: u32) -> bool {
        debug_assert!(self.contains(row, col));
        let (word, bit) = self.locate(row, col);
        self.bits[word] & (1 << bit) != 0
    }

    #[inline]
    fn put(&mut self, row: u32, col: u32, value: bool) {
        let (word, bit) = self.locate(row, col);
        if value {
            self.bits[word] |= 1 << bit;
        } else {
            self.bits[word] &= !(1 << bit);
        }
    }

    /// Word index and bit position of `(row, col)`.
    #[inline]
    fn locate(&self, row: u32, col: u32) -> (usize, usize) {
        let pos = row as usize * self.cols as usize + col as usize;
        (pos / WORD_BITS, pos % WORD_BITS)
    }
}

impl fmt::Display for Repr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for row in 0..self.rows {
            for col in 0..self.cols {
                f.write_str(if self.test(row, col) { "1" } else { "0" })?;
            }
            writeln!(f)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_repr_is_clear() {
        let repr = Repr::new(7, 9);
        assert_eq!(repr.len(), 63);
        assert_eq!(repr.count_ones(), 0);
        assert_eq!(repr.bits.len(), 2);
    }

    #[test]
    fn set_and_clear_bits() {
        let mut repr = Repr::new(4, 10);
        repr.set(0, 0);
        repr.set(3, 9);
        repr.set(1, 5);
        assert!(repr.get(0, 0));
        assert!(repr.get(3, 9));
        assert!(repr.get(1, 5));
        assert!(!repr.get(1, 4));
        assert_eq!(repr.count_ones(), 3);

        repr.clear(1, 5);
        assert!(!repr.get(1, 5));
        assert_eq!(repr.count_ones(), 2);
    }

    #[test]
    fn out_of_range_access_is_ignored() {
        let mut repr = Repr::new(2, 3);
        repr.set(2, 0);
        repr.set(0, 3);
        assert_eq!(repr.count_ones(), 0);
        assert!(!repr.get(5, 5));
    }

    #[test]
    fn fill_leaves_padding_clear() {
        let repr = Repr::filled(5, 7);
        assert_eq!(repr.count_ones(), 35);
        assert!(repr.get(4, 6));

        let mut repr = Repr::filled(8, 8);
        assert_eq!(repr.count_ones(), 64);
        repr.fill(false);
        assert_eq!(repr.count_ones(), 0);
    }

    #[test]
    fn iter_ones_yields_coordinates_in_row_major_order() {
        let repr = Repr::from_fn(3, 20, |r, c| (r + c) % 7 == 0);
        let ones: Vec<_> = repr.iter_ones().collect();
        let expected: Vec<_> = (0..3)
            .flat_map(|r| (0..20).map(move |c| (r, c)))
            .filter(|&(r, c)| (r + c) % 7 == 0)
            .collect();
        assert_eq!(ones, expected);
    }

    #[test]
    fn display_prints_one_line_per_row() {
        let repr = Repr::from_fn(2, 3, |r, c| r == c);
        assert_eq!(repr.to_string(), "100\n010\n");
    }
}
