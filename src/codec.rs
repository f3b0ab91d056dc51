//! The encoder boundary. A `Codec` produces one input frame per timestep.
//!
//! Any `FnMut() -> Option<Repr>` closure is a codec. `NoiseCodec` produces seeded random frames,
//! which is useful for exercising a layer without a real encoder.

use crate::core::repr::Repr;
use rand::{rngs::StdRng, Rng, SeedableRng};

/// Source of input frames. Returning `None` means no frame is available.
pub trait Codec {
    fn produce_frame(&mut self) -> Option<Repr>;
}

impl<F> Codec for F
where
    F: FnMut() -> Option<Repr>,
{
    #[inline]
    fn produce_frame(&mut self) -> Option<Repr> {
        self()
    }
}

/// Produces frames where each bit is set independently with probability `density`.
#[derive(Debug)]
pub struct NoiseCodec {
    pub rows: u32,
    pub cols: u32,
    pub density: f64,
    rng: StdRng,
}

impl NoiseCodec {
    /// Creates a codec seeded with `seed`, so frame sequences are reproducible.
    pub fn new(rows: u32, cols: u32, density: f64, seed: u64) -> Self {
        Self {
            rows,
            cols,
            density: density.clamp(0.0, 1.0),
            rng: StdRng::seed_from_u64(seed),
        }
    }
}

impl Codec for NoiseCodec {
    fn produce_frame(&mut self) -> Option<Repr> {
        let density = self.density;
        let rng = &mut self.rng;
        Some(Repr::from_fn(self.rows, self.cols, |_, _| {
            rng.random_bool(density)
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn closures_are_codecs() {
        let mut frames = vec![Repr::filled(2, 2), Repr::new(2, 2)].into_iter();
        let mut codec = move || frames.next();
        assert_eq!(codec.produce_frame().map(|f| f.count_ones()), Some(4));
        assert_eq!(codec.produce_frame().map(|f| f.count_ones()), Some(0));
        assert!(codec.produce_frame().is_none());
    }

    #[test]
    fn noise_is_reproducible() {
        let mut a = NoiseCodec::new(16, 16, 0.3, 7);
        let mut b = NoiseCodec::new(16, 16, 0.3, 7);
        for _ in 0..3 {
            assert_eq!(a.produce_frame(), b.produce_frame());
        }
    }

    #[test]
    fn noise_density_extremes() {
        let mut empty = NoiseCodec::new(8, 8, 0.0, 1);
        let mut full = NoiseCodec::new(8, 8, 1.0, 1);
        assert_eq!(empty.produce_frame().map(|f| f.count_ones()), Some(0));
        assert_eq!(full.produce_frame().map(|f| f.count_ones()), Some(64));
    }
}
