//! A `Minicolumn` is one feature detector of the layer.
//!
//! Biological inspiration:
//! Minicolumns are inspired by the cortical mini-columns found in the brain, narrow chains of
//! neurons sharing the same feedforward input.
//!
//! Meaning in HTM:
//! Each minicolumn owns a proximal dendrite segment: a fixed array of synapses into a square
//! receptive field of the input. Every timestep it computes its overlap with the current input
//! and competes with the minicolumns inside the inhibition radius (its neighbors) to become
//! active. Active minicolumns reinforce synapses on active input bits and punish the rest, so
//! over time each one becomes selective for a recurring input pattern.

use super::{repr::Repr, synapses::Synapse};

/// Number of timesteps remembered by the activity history register.
pub const HISTORY_LEN: u32 = u8::BITS;

/// Represents a minicolumn of the spatial pooling layer.
#[derive(Debug, Clone)]
pub struct Minicolumn {
    /// Competitive score of the current timestep, raw overlap scaled by boost or zeroed.
    pub overlap: u32,

    /// Rolling activity register. Bit `t` is set if the minicolumn was active `t` steps ago.
    pub active_history: u8,

    /// Multiplier applied to the raw overlap. Stays at 1.0, boosting updates are not performed.
    pub boost: f32,

    /// Center of the receptive field in input coordinates `(x, y)`.
    pub center: (u32, u32),

    /// The proximal dendrite segment. Its length is fixed once receptive fields are wired.
    synapses: Box<[Synapse]>,

    /// Arena indices of the other minicolumns inside the inhibition radius.
    neighbors: Vec<usize>,

    /// The inhibition radius `neighbors` was last built for.
    neighbor_radius: Option<u32>,
}

impl Default for Minicolumn {
    fn default() -> Self {
        Self {
            overlap: 0,
            active_history: 0,
            boost: 1.0,
            center: (0, 0),
            synapses: Box::default(),
            neighbors: Vec::new(),
            neighbor_radius: None,
        }
    }
}

impl Minicolumn {
    /// Creates an unwired minicolumn.
    pub fn new() -> Self {
        Self::default()
    }

    /// Wires the proximal segment, resetting all learned and competitive state.
    pub(crate) fn wire(&mut self, center: (u32, u32), synapses: Box<[Synapse]>) {
        *self = Self {
            center,
            synapses,
            ..Self::default()
        };
    }

    #[inline]
    pub fn synapses(&self) -> &[Synapse] {
        &self.synapses
    }

    #[inline]
    pub fn num_synapses(&self) -> usize {
        self.synapses.len()
    }

    #[inline]
    pub fn neighbors(&self) -> &[usize] {
        &self.neighbors
    }

    /// The inhibition radius the neighbor list currently reflects, if it was ever built.
    #[inline]
    pub fn neighbor_radius(&self) -> Option<u32> {
        self.neighbor_radius
    }

    pub(crate) fn neighbor_state_mut(&mut self) -> (&mut Vec<usize>, &mut Option<u32>) {
        (&mut self.neighbors, &mut self.neighbor_radius)
    }

    /// Returns `true` if the minicolumn was active `t` timesteps ago (`t = 0` is the current step).
    #[inline]
    pub fn active_at(&self, t: u32) -> bool {
        t < HISTORY_LEN && self.active_history & (1 << t) != 0
    }

    /// Shifts the history by one timestep and records the current activity in bit 0.
    #[inline]
    pub fn record_activity(&mut self, active: bool) {
        self.active_history = (self.active_history << 1) | u8::from(active);
    }

    /// Mean Euclidean distance from the center to the sources of the connected synapses,
    /// or 0 without connected synapses.
    pub fn connected_radius(&self) -> f32 {
        let (x, y) = self.center;
        let (sum, count) = self
            .synapses
            .iter()
            .filter(|syn| syn.is_connected())
            .fold((0.0f32, 0u32), |(sum, count), syn| {
                (sum + syn.distance_to(x, y), count + 1)
            });
        if count == 0 {
            0.0
        } else {
            sum / count as f32
        }
    }

    /// Counts connected synapses whose input bit is set.
    #[inline]
    pub fn raw_overlap(&self, input: &Repr) -> u32 {
        self.synapses
            .iter()
            .filter(|syn| syn.is_connected() && syn.is_active(input))
            .count() as u32
    }

    /// Computes the competitive overlap score: zero below `column_complexity * num_synapses`
    /// connected active synapses, otherwise the raw overlap scaled by the boost factor.
    pub fn compute_overlap(&mut self, input: &Repr, column_complexity: f32) {
        let raw = self.raw_overlap(input);
        let minimum = column_complexity * self.synapses.len() as f32;
        self.overlap = if raw as f32 >= minimum {
            (raw as f32 * self.boost) as u32
        } else {
            0
        };
    }

    /// Adapts every synapse of the proximal segment to `input`.
    pub fn learn(&mut self, input: &Repr) {
        self.synapses.iter_mut().for_each(|syn| syn.adapt(input));
    }
}
