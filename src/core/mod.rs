//! Building blocks of the spatial pooling layer, leaves first.

pub mod column;
pub mod layer;
pub mod neighbors;
pub mod partition;
pub mod repr;
pub mod spatial_pooler;
pub mod synapses;
pub mod topology;
