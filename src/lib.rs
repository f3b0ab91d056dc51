//! Spatial pooling layer of a Hierarchical Temporal Memory.
//!
//! A grid of minicolumns learns sparse, stable representations of a streaming binary input
//! through synaptic permanence adaptation and local inhibition. Each timestep runs three
//! fork-join phases (inhibition radius, overlap, activation and learning) over disjoint
//! row partitions of the layer.

pub mod codec;
pub mod config;
pub mod core;
pub mod error;
pub mod htm;

pub use crate::codec::{Codec, NoiseCodec};
pub use crate::config::{ColumnConfig, HtmConfig, LayerConfig};
pub use crate::core::{layer::Layer, repr::Repr, spatial_pooler::SpatialPooler};
pub use crate::error::{HtmError, Result};
pub use crate::htm::Htm;
