//! Error types reported by layer setup and the spatial pooling pipeline.

use thiserror::Error;

/// Failures surfaced to callers. Nothing is retried inside the crate.
#[derive(Error, Debug)]
pub enum HtmError {
    /// A configuration value is missing, out of range or inconsistent.
    #[error("Invalid configuration: {0}")]
    Configuration(String),

    /// The input frame is smaller than the layer grid, or differs from the shape the
    /// receptive fields were wired against.
    #[error("Input of {input_rows}x{input_cols} does not fit a {layer_height}x{layer_width} layer: {reason}")]
    DimensionMismatch {
        input_rows: u32,
        input_cols: u32,
        layer_height: u32,
        layer_width: u32,
        reason: &'static str,
    },

    /// A layer, synapse array or neighbor buffer could not be allocated.
    #[error("Allocation failed: {0}")]
    Allocation(String),

    /// A worker thread could not be spawned or joined during a pipeline phase.
    /// Minicolumn state mutated by earlier phases is not rolled back.
    #[error("Pipeline execution failed: {0}")]
    Execution(String),

    /// The codec did not produce a frame.
    #[error("Codec produced no input frame")]
    MissingInput,
}

pub type Result<T> = std::result::Result<T, HtmError>;
