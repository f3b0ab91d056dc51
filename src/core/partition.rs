//! Row partitions handed to the pipeline workers.
//!
//! The layer's rows are split as evenly as possible across the workers, remainder rows go to
//! the first partition. Each worker exclusively owns the minicolumns of its rows for the
//! duration of a phase, which `split_rows_mut` makes explicit by handing out disjoint mutable
//! slices of the arena.

use super::column::Minicolumn;
use std::ops::Range;

/// A contiguous range of layer rows owned by one worker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Partition {
    pub row_start: u32,
    pub row_count: u32,
    pub row_width: u32,
}

impl Partition {
    /// Splits `height` rows of `width` minicolumns across `workers` partitions.
    /// The worker count is clamped to `[1, height]` so no partition is empty.
    pub fn split(height: u32, width: u32, workers: usize) -> Vec<Partition> {
        let workers = workers.clamp(1, height.max(1) as usize) as u32;
        let base = height / workers;
        let remainder = height - base * workers;

        let mut row_start = 0;
        (0..workers)
            .map(|t| {
                let row_count = base + if t == 0 { remainder } else { 0 };
                let partition = Partition {
                    row_start,
                    row_count,
                    row_width: width,
                };
                row_start += row_count;
                partition
            })
            .collect()
    }

    /// Number of minicolumns in the partition.
    #[inline]
    pub fn len(&self) -> usize {
        self.row_count as usize * self.row_width as usize
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Arena index range covered by the partition.
    #[inline]
    pub fn range(&self) -> Range<usize> {
        let start = self.row_start as usize * self.row_width as usize;
        start..start + self.len()
    }
}

/// Splits the arena into one shared slice per partition.
pub fn split_rows<'a>(
    mut columns: &'a [Minicolumn],
    partitions: &[Partition],
) -> Vec<&'a [Minicolumn]> {
    partitions
        .iter()
        .map(|p| {
            let (head, tail) = columns.split_at(p.len());
            columns = tail;
            head
        })
        .collect()
}

/// Splits the arena into one exclusive slice per partition.
pub fn split_rows_mut<'a>(
    mut columns: &'a mut [Minicolumn],
    partitions: &[Partition],
) -> Vec<&'a mut [Minicolumn]> {
    let mut chunks = Vec::with_capacity(partitions.len());
    for p in partitions {
        let (head, tail) = std::mem::take(&mut columns).split_at_mut(p.len());
        chunks.push(head);
        columns = tail;
    }
    chunks
}
