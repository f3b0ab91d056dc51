//! A `Synapse` models a single proximal connection between a `Minicolumn` and an input bit.
//!
//! The synapse does not own or point at the input frame. It stores the `(row, col)` coordinate
//! of the bit it tests, and the frame is handed to the pipeline on every timestep.
//!
//! If the permanence is at or above `CONNECTED_PERM`, the synapse is "connected" and counts
//! toward the minicolumn's overlap score. When the owning minicolumn wins the local competition,
//! permanence is increased if the tested bit was active and decreased otherwise.

use super::repr::Repr;

/// Permanence at or above which a synapse is connected. New synapses start here.
pub const CONNECTED_PERM: f32 = 0.200;

/// Permanence added to a synapse whose input bit was active while its minicolumn won.
pub const PERM_INC: f32 = 0.150;

/// Permanence removed from a synapse whose input bit was inactive while its minicolumn won.
pub const PERM_DEC: f32 = 0.100;

pub const MIN_PERM: f32 = 0.0;
pub const MAX_PERM: f32 = 1.0;

/// A synapse connecting an input coordinate with an associated permanence value.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Synapse {
    /// Represents the strength of the connection between the synapse and the input bit.
    pub permanence: f32,

    /// Row of the input bit this synapse tests.
    pub src_row: u32,

    /// Column of the input bit this synapse tests.
    pub src_col: u32,
}

impl Synapse {
    /// Creates a synapse on `(src_row, src_col)` starting at the connected threshold.
    #[inline]
    pub fn new(src_row: u32, src_col: u32) -> Self {
        Self {
            permanence: CONNECTED_PERM,
            src_row,
            src_col,
        }
    }

    #[inline]
    pub fn is_connected(&self) -> bool {
        self.permanence >= CONNECTED_PERM
    }

    /// Returns `true` if the tested input bit is set in `input`.
    #[inline]
    pub fn is_active(&self, input: &Repr) -> bool {
        input.test(self.src_row, self.src_col)
    }

    /// Euclidean distance from the source coordinate to `(x, y)` in input space.
    #[inline]
    pub fn distance_to(&self, x: u32, y: u32) -> f32 {
        let dx = self.src_col as f32 - x as f32;
        let dy = self.src_row as f32 - y as f32;
        dx.hypot(dy)
    }

    /// Hebbian update: reinforce if the input bit was active, punish otherwise.
    /// The connection state before the update does not matter.
    #[inline]
    pub fn adapt(&mut self, input: &Repr) {
        let permanence = if self.is_active(input) {
            self.permanence + PERM_INC
        } else {
            self.permanence - PERM_DEC
        };
        self.permanence = permanence.clamp(MIN_PERM, MAX_PERM);
    }
}
