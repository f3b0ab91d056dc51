//! The `Layer` owns the grid of minicolumns and the layer-wide inhibition radius.
//!
//! Minicolumns live in a flat row-major arena indexed by `(x, y)`. Neighbor lists hold arena
//! indices, never references, so a minicolumn can be read by any worker while only its owner
//! mutates it. The layer is allocated once and never resized. Receptive fields are wired once
//! against the shape of the first input frame.

use super::{
    column::Minicolumn,
    repr::Repr,
    synapses::Synapse,
    topology::{Grid, GridRect},
};
use crate::error::{HtmError, Result};
use tracing::debug;

/// Represents the spatial pooling layer.
#[derive(Debug)]
pub struct Layer {
    /// Shape of the minicolumn grid.
    grid: Grid,

    /// All minicolumns in row-major order.
    minicolumns: Vec<Minicolumn>,

    /// Layer-wide competition radius, in minicolumns. Written once per timestep.
    pub(crate) inhibition_radius: u32,

    /// Shape `(rows, cols)` of the input the receptive fields were wired against.
    input_shape: Option<(u32, u32)>,
}

impl Layer {
    /// Allocates a `height x width` layer of unwired minicolumns.
    pub fn new(height: u32, width: u32) -> Result<Self> {
        if height == 0 || width == 0 {
            return Err(HtmError::Configuration(format!(
                "layer dimensions must be non-zero, got {height}x{width}"
            )));
        }
        let grid = Grid::new(width, height);
        let mut minicolumns = Vec::new();
        minicolumns.try_reserve_exact(grid.len()).map_err(|e| {
            HtmError::Allocation(format!("{height}x{width} layer minicolumns: {e}"))
        })?;
        minicolumns.resize_with(grid.len(), Minicolumn::new);

        Ok(Self {
            grid,
            minicolumns,
            inhibition_radius: 0,
            input_shape: None,
        })
    }

    #[inline]
    pub fn height(&self) -> u32 {
        self.grid.height
    }

    #[inline]
    pub fn width(&self) -> u32 {
        self.grid.width
    }

    #[inline]
    pub fn grid(&self) -> Grid {
        self.grid
    }

    #[inline]
    pub fn inhibition_radius(&self) -> u32 {
        self.inhibition_radius
    }

    /// Shape `(rows, cols)` of the input the layer was wired against, if wired.
    #[inline]
    pub fn input_shape(&self) -> Option<(u32, u32)> {
        self.input_shape
    }

    #[inline]
    pub fn is_wired(&self) -> bool {
        self.input_shape.is_some()
    }

    #[inline]
    pub fn minicolumns(&self) -> &[Minicolumn] {
        &self.minicolumns
    }

    #[inline]
    pub(crate) fn minicolumns_mut(&mut self) -> &mut [Minicolumn] {
        &mut self.minicolumns
    }

    /// The minicolumn at grid coordinates `(x, y)`.
    ///
    /// # Panics
    ///
    /// Panics if `(x, y)` lies outside the `width x height` grid.
    #[inline]
    pub fn minicolumn(&self, x: u32, y: u32) -> &Minicolumn {
        assert!(
            x < self.grid.width && y < self.grid.height,
            "minicolumn ({x}, {y}) outside a {}x{} layer",
            self.grid.height,
            self.grid.width
        );
        &self.minicolumns[self.grid.index(x, y)]
    }

    /// Returns `true` if the minicolumn at `(x, y)` was active `t` timesteps ago.
    ///
    /// # Panics
    ///
    /// Panics if `(x, y)` lies outside the grid, like [`Layer::minicolumn`].
    #[inline]
    pub fn active_at(&self, x: u32, y: u32, t: u32) -> bool {
        self.minicolumn(x, y).active_at(t)
    }

    /// Arena indices of every minicolumn active `t` timesteps ago.
    pub fn active_columns(&self, t: u32) -> Vec<usize> {
        self.minicolumns
            .iter()
            .enumerate()
            .filter(|(_, mc)| mc.active_at(t))
            .map(|(index, _)| index)
            .collect()
    }

    /// Wires every minicolumn's proximal segment to a square receptive field of `input`.
    ///
    /// The field has side `sqrt(rows * cols * fraction)` and is centered at the minicolumn's
    /// proportional position over the input. Each synapse starts at the connected threshold.
    /// Input of a single row is treated as 1D and every field sits on row 0.
    ///
    /// The input must be at least as large as the layer in every applicable dimension. On any
    /// error no minicolumn is modified.
    pub fn init_receptive_fields(&mut self, input: &Repr, fraction: f32) -> Result<()> {
        if !(fraction > 0.0 && fraction <= 1.0) {
            return Err(HtmError::Configuration(format!(
                "receptive field fraction must be in (0, 1], got {fraction}"
            )));
        }
        self.validate_input(input)?;

        let mut wired = Vec::new();
        wired.try_reserve_exact(self.grid.len()).map_err(|e| {
            HtmError::Allocation(format!("receptive fields of {} minicolumns: {e}", self.grid.len()))
        })?;

        for index in 0..self.grid.len() {
            let (x, y) = self.grid.coordinates(index);
            let center = receptive_field_center(x, y, self.grid, input);
            let field = receptive_field(center, input, fraction);

            let mut synapses = Vec::new();
            synapses.try_reserve_exact(field.area()).map_err(|e| {
                HtmError::Allocation(format!(
                    "{} synapses for minicolumn ({x}, {y}): {e}",
                    field.area()
                ))
            })?;
            synapses.extend(field.cells().map(|(col, row)| Synapse::new(row, col)));
            wired.push((center, synapses.into_boxed_slice()));
        }

        for (mc, (center, synapses)) in self.minicolumns.iter_mut().zip(wired) {
            mc.wire(center, synapses);
        }
        self.inhibition_radius = 0;
        self.input_shape = Some((input.rows(), input.cols()));

        debug!(
            height = self.grid.height,
            width = self.grid.width,
            input_rows = input.rows(),
            input_cols = input.cols(),
            fraction,
            "receptive fields wired"
        );
        Ok(())
    }

    /// Checks that `input` can feed a layer of this size.
    fn validate_input(&self, input: &Repr) -> Result<()> {
        let mismatch = |reason| HtmError::DimensionMismatch {
            input_rows: input.rows(),
            input_cols: input.cols(),
            layer_height: self.grid.height,
            layer_width: self.grid.width,
            reason,
        };

        if input.rows() > 1 && input.cols() > 1 {
            if self.grid.height > input.rows() {
                return Err(mismatch("input height less than layer height"));
            }
            if self.grid.width > input.cols() {
                return Err(mismatch("input width less than layer width"));
            }
        } else if input.rows() == 1 && input.cols() > 1 {
            if self.grid.width > input.cols() {
                return Err(mismatch("input width less than layer width"));
            }
        } else {
            return Err(mismatch("input is using invalid dimensions"));
        }
        Ok(())
    }

    /// Checks that `input` has the shape the receptive fields were wired against.
    pub(crate) fn check_wired_input(&self, input: &Repr) -> Result<()> {
        match self.input_shape {
            None => Err(HtmError::Configuration(
                "layer receptive fields are not initialized".to_string(),
            )),
            Some(shape) if shape != (input.rows(), input.cols()) => {
                Err(HtmError::DimensionMismatch {
                    input_rows: input.rows(),
                    input_cols: input.cols(),
                    layer_height: self.grid.height,
                    layer_width: self.grid.width,
                    reason: "input shape differs from the wired receptive fields",
                })
            }
            Some(_) => Ok(()),
        }
    }
}

/// Maps minicolumn `(x, y)` proportionally onto the input, offset by half a cell.
/// Returns the center as `(x, y)` in input coordinates, `y` is 0 for 1D input.
pub fn receptive_field_center(x: u32, y: u32, layer: Grid, input: &Repr) -> (u32, u32) {
    let x_step = input.cols() / layer.width;
    let x_center = x * x_step + x_step / 2;
    let y_center = if input.rows() > 1 {
        let y_step = input.rows() / layer.height;
        y * y_step + y_step / 2
    } else {
        0
    };
    (x_center, y_center)
}

/// The clipped receptive field around `center`, in input coordinates.
///
/// Each axis spans `[c - r, c + r)` with `r = side / 2`, so an unclipped field of even side
/// covers `side x side` bits. A zero radius still keeps the center bit. 1D input spans row 0 only.
pub fn receptive_field(center: (u32, u32), input: &Repr, fraction: f32) -> GridRect {
    let side = (input.len() as f64 * fraction as f64).sqrt() as u32;
    let radius = side / 2;
    let (left, right) = field_span(center.0, radius, input.cols());
    let (top, bottom) = if input.rows() > 1 {
        field_span(center.1, radius, input.rows())
    } else {
        (0, 0)
    };
    GridRect {
        top,
        left,
        bottom,
        right,
    }
}

/// Inclusive bounds of `[c - radius, c + radius)` clipped to `[0, len)`, never empty.
fn field_span(c: u32, radius: u32, len: u32) -> (u32, u32) {
    let start = c.saturating_sub(radius);
    let end = c
        .saturating_add(radius)
        .min(len)
        .max(c.saturating_add(1));
    (start, end - 1)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_layer_is_unwired() {
        let layer = Layer::new(3, 5).unwrap();
        assert_eq!(layer.minicolumns().len(), 15);
        assert!(!layer.is_wired());
        assert_eq!(layer.inhibition_radius(), 0);
    }

    #[test]
    #[should_panic(expected = "outside a 3x5 layer")]
    fn minicolumn_outside_the_grid_panics() {
        let layer = Layer::new(3, 5).unwrap();
        layer.minicolumn(5, 0);
    }

    #[test]
    fn zero_sized_layer_is_rejected() {
        assert!(matches!(Layer::new(0, 4), Err(HtmError::Configuration(_))));
        assert!(matches!(Layer::new(4, 0), Err(HtmError::Configuration(_))));
    }

    #[test]
    fn receptive_fields_of_a_4x4_layer_on_8x8_input() {
        let mut layer = Layer::new(4, 4).unwrap();
        let input = Repr::filled(8, 8);
        layer.init_receptive_fields(&input, 0.25).unwrap();

        // side 4, radius 2, centers at 1, 3, 5, 7
        let corner = layer.minicolumn(0, 0);
        assert_eq!(corner.center, (1, 1));
        assert_eq!(corner.num_synapses(), 9);

        let inner = layer.minicolumn(1, 2);
        assert_eq!(inner.center, (3, 5));
        assert_eq!(inner.num_synapses(), 16);
        let rows: Vec<u32> = inner.synapses().iter().map(|s| s.src_row).collect();
        assert_eq!(rows.iter().min(), Some(&3));
        assert_eq!(rows.iter().max(), Some(&6));

        let far = layer.minicolumn(3, 3);
        assert_eq!(far.center, (7, 7));
        assert_eq!(far.num_synapses(), 9);

        // unclipped fields are side x side
        for (x, y) in [(1, 1), (1, 2), (2, 1), (2, 2)] {
            assert_eq!(layer.minicolumn(x, y).num_synapses(), 16);
        }

        for mc in layer.minicolumns() {
            assert_eq!(mc.boost, 1.0);
            assert_eq!(mc.active_history, 0);
            assert!(mc.synapses().iter().all(|s| s.is_connected()));
        }
    }

    #[test]
    fn one_dimensional_input_wires_row_zero() {
        let mut layer = Layer::new(2, 4).unwrap();
        let input = Repr::new(1, 16);
        layer.init_receptive_fields(&input, 0.25).unwrap();

        // side 2, radius 1
        for mc in layer.minicolumns() {
            assert_eq!(mc.center.1, 0);
            assert!(mc.synapses().iter().all(|s| s.src_row == 0));
            assert_eq!(mc.num_synapses(), 2);
        }
        let mc = layer.minicolumn(1, 0);
        assert_eq!(mc.center, (6, 0));
        let cols: Vec<u32> = mc.synapses().iter().map(|s| s.src_col).collect();
        assert_eq!(cols, vec![5, 6]);
    }

    #[test]
    fn zero_radius_field_keeps_the_center_bit() {
        let mut layer = Layer::new(4, 4).unwrap();
        let input = Repr::new(4, 4);
        // side 1, radius 0
        layer.init_receptive_fields(&input, 0.1).unwrap();
        for (index, mc) in layer.minicolumns().iter().enumerate() {
            let (x, y) = layer.grid().coordinates(index);
            assert_eq!(mc.num_synapses(), 1);
            assert_eq!((mc.synapses()[0].src_col, mc.synapses()[0].src_row), (x, y));
        }
    }

    #[test]
    fn undersized_input_is_rejected_without_wiring() {
        let mut layer = Layer::new(6, 6).unwrap();
        for (rows, cols) in [(5, 6), (6, 5), (1, 5), (0, 0), (6, 1), (1, 1)] {
            let input = Repr::new(rows, cols);
            assert!(matches!(
                layer.init_receptive_fields(&input, 0.5),
                Err(HtmError::DimensionMismatch { .. })
            ));
        }
        assert!(!layer.is_wired());
        assert!(layer.minicolumns().iter().all(|mc| mc.num_synapses() == 0));
    }

    #[test]
    fn invalid_fraction_is_rejected() {
        let mut layer = Layer::new(2, 2).unwrap();
        let input = Repr::new(4, 4);
        assert!(layer.init_receptive_fields(&input, 0.0).is_err());
        assert!(layer.init_receptive_fields(&input, 1.5).is_err());
        assert!(layer.init_receptive_fields(&input, f32::NAN).is_err());
    }

    #[test]
    fn wired_input_shape_is_enforced() {
        let mut layer = Layer::new(2, 2).unwrap();
        assert!(layer.check_wired_input(&Repr::new(4, 4)).is_err());
        layer.init_receptive_fields(&Repr::new(4, 4), 0.5).unwrap();
        assert!(layer.check_wired_input(&Repr::new(4, 4)).is_ok());
        assert!(layer.check_wired_input(&Repr::new(4, 5)).is_err());
    }
}
