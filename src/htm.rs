//! The `Htm` context ties configuration, the codec, the layer and the spatial pooler together.
//!
//! Construction pulls the first frame from the codec, allocates the layer and wires the
//! receptive fields against that frame. Every `process` call then runs one spatial pooling
//! timestep on the current frame and pulls the next one.

use crate::{
    codec::Codec,
    config::HtmConfig,
    core::{layer::Layer, repr::Repr, spatial_pooler::SpatialPooler},
    error::{HtmError, Result},
};
use tracing::info;

/// An initialized spatial pooling layer fed by a codec.
pub struct Htm<C: Codec> {
    config: HtmConfig,
    codec: C,
    layer: Layer,
    pooler: SpatialPooler,
    frame: Repr,
    timestep: u64,

    /// Whether winners adapt their synapses during `process`.
    pub learn: bool,
}

impl<C: Codec> Htm<C> {
    /// Validates `config`, pulls the first frame from `codec` and wires a new layer against it.
    pub fn new(config: HtmConfig, mut codec: C) -> Result<Self> {
        config.validate()?;
        let frame = codec.produce_frame().ok_or(HtmError::MissingInput)?;

        let mut layer = Layer::new(config.layer.height, config.layer.width)?;
        layer.init_receptive_fields(&frame, config.columns.receptive_field)?;
        let pooler = SpatialPooler::from_config(&config);

        info!(
            height = config.layer.height,
            width = config.layer.width,
            workers = config.workers,
            input_rows = frame.rows(),
            input_cols = frame.cols(),
            "htm initialization complete"
        );

        Ok(Self {
            config,
            codec,
            layer,
            pooler,
            frame,
            timestep: 0,
            learn: true,
        })
    }

    /// Runs one spatial pooling timestep on the current frame, then pulls the next frame.
    ///
    /// A pipeline failure leaves the layer partially updated and should end the run.
    pub fn process(&mut self) -> Result<()> {
        self.pooler
            .compute(&mut self.layer, &self.frame, self.learn)?;
        self.timestep += 1;

        let next = self.codec.produce_frame().ok_or(HtmError::MissingInput)?;
        if (next.rows(), next.cols()) != (self.frame.rows(), self.frame.cols()) {
            return Err(HtmError::DimensionMismatch {
                input_rows: next.rows(),
                input_cols: next.cols(),
                layer_height: self.layer.height(),
                layer_width: self.layer.width(),
                reason: "codec changed the frame shape",
            });
        }
        self.frame = next;
        Ok(())
    }

    #[inline]
    pub fn config(&self) -> &HtmConfig {
        &self.config
    }

    #[inline]
    pub fn layer(&self) -> &Layer {
        &self.layer
    }

    #[inline]
    pub fn pooler(&self) -> &SpatialPooler {
        &self.pooler
    }

    /// The frame the next `process` call will pool.
    #[inline]
    pub fn frame(&self) -> &Repr {
        &self.frame
    }

    /// Number of completed timesteps.
    #[inline]
    pub fn timestep(&self) -> u64 {
        self.timestep
    }

    /// Arena indices of the minicolumns active `t` timesteps ago.
    #[inline]
    pub fn active_columns(&self, t: u32) -> Vec<usize> {
        self.layer.active_columns(t)
    }
}
