//! Configuration consumed by the layer and the spatial pooler.
//!
//! Parsing a configuration file is up to the caller; every struct here derives serde's
//! `Serialize` and `Deserialize` so any serde format can produce it. Missing fields fall back to
//! the defaults below.

use crate::error::{HtmError, Result};
use serde::{Deserialize, Serialize};

/// Top-level configuration of an HTM context.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HtmConfig {
    pub layer: LayerConfig,
    pub columns: ColumnConfig,

    /// Worker threads per pipeline phase.
    pub workers: usize,
}

/// Shape of the minicolumn grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LayerConfig {
    pub height: u32,
    pub width: u32,
}

/// Receptive field and competition parameters shared by all minicolumns.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ColumnConfig {
    /// Fraction of the input area covered by one receptive field, in (0, 1].
    pub receptive_field: f32,

    /// Target fraction of active minicolumns inside any neighborhood, in [0, 1].
    pub local_activity: f32,

    /// Minimum fraction of connected, active synapses for a non-zero overlap, in [0, 1].
    pub column_complexity: f32,
}

impl Default for HtmConfig {
    fn default() -> Self {
        Self {
            layer: LayerConfig::default(),
            columns: ColumnConfig::default(),
            workers: 4,
        }
    }
}

impl Default for LayerConfig {
    fn default() -> Self {
        Self {
            height: 48,
            width: 48,
        }
    }
}

impl Default for ColumnConfig {
    fn default() -> Self {
        Self {
            receptive_field: 0.02,
            local_activity: 0.02,
            column_complexity: 0.33,
        }
    }
}

impl HtmConfig {
    /// Checks every value is inside its domain.
    pub fn validate(&self) -> Result<()> {
        if self.layer.height == 0 || self.layer.width == 0 {
            return Err(HtmError::Configuration(format!(
                "layer dimensions must be non-zero, got {}x{}",
                self.layer.height, self.layer.width
            )));
        }
        let rf = self.columns.receptive_field;
        if !(rf > 0.0 && rf <= 1.0) {
            return Err(HtmError::Configuration(format!(
                "receptive_field must be in (0, 1], got {rf}"
            )));
        }
        check_unit("local_activity", self.columns.local_activity)?;
        check_unit("column_complexity", self.columns.column_complexity)?;
        if self.workers == 0 {
            return Err(HtmError::Configuration(
                "workers must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

fn check_unit(name: &str, value: f32) -> Result<()> {
    if (0.0..=1.0).contains(&value) {
        Ok(())
    } else {
        Err(HtmError::Configuration(format!(
            "{name} must be in [0, 1], got {value}"
        )))
    }
}
