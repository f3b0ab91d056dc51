//! The `SpatialPooler` runs one timestep of spatial pooling over a `Layer`:
//! - Computes the layer-wide inhibition radius from the mean connected receptive field radius.
//! - Computes an "overlap" score for each minicolumn from connected synapses on active input bits.
//! - Lets each minicolumn compete with its neighbors inside the inhibition radius (local
//!   k-winners-take-all) and adapts the synapses of the winners.
//!
//! Each phase is executed by a fixed number of worker threads over disjoint row partitions of the
//! layer, spawned at phase entry and joined before the next phase starts. Phase B reads the radius
//! phase A produced, phase C reads the overlaps phase B produced, so the join is a hard barrier.
//!
//! Ownership during the phases:
//! - Phase A only reads minicolumns. The per-partition averages are reduced by the calling
//!   thread after the join, so the layer radius is never written concurrently.
//! - Phase B hands every worker an exclusive slice of the arena.
//! - Phase C hands every worker an exclusive slice as well. Neighbors in other partitions are
//!   only seen through a snapshot of the overlaps and a flag array of minicolumns that already
//!   fired this round. A worker can therefore never mutate another partition's neighbor lists.
//!
//! A failed spawn or join aborts the timestep with `HtmError::Execution`. Minicolumn state written
//! by phases that already completed is not rolled back.

use super::{
    column::Minicolumn,
    layer::Layer,
    neighbors::update_neighbors,
    partition::{split_rows, split_rows_mut, Partition},
    repr::Repr,
    topology::Grid,
};
use crate::{
    config::HtmConfig,
    error::{HtmError, Result},
};
use std::{
    any::Any,
    sync::atomic::{AtomicBool, Ordering},
    thread,
};
use tracing::{debug, trace};

/// Runs the spatial pooling pipeline with the competition and learning parameters of a layer.
#[derive(Debug, Clone)]
pub struct SpatialPooler {
    /// Target fraction of active minicolumns inside any neighborhood.
    pub local_activity: f32,

    /// Minimum fraction of a minicolumn's synapses that must be connected and active for its
    /// overlap to count.
    pub column_complexity: f32,

    /// Number of worker threads per phase.
    pub workers: usize,

    /// The total number of compute iterations performed so far (whether learning or not).
    pub iteration_num: u32,

    /// The number of compute iterations performed so far with learning enabled.
    pub iteration_learn_num: u32,
}

/// Read-only view of the layer shared by the phase C workers.
struct Competition<'a> {
    grid: Grid,
    radius: u32,
    local_activity: f32,
    learn: bool,
    input: &'a Repr,
    overlaps: &'a [u32],
    fired: &'a [AtomicBool],
}

impl SpatialPooler {
    /// Creates a new `SpatialPooler`.
    #[inline]
    pub fn new(local_activity: f32, column_complexity: f32, workers: usize) -> Self {
        Self {
            local_activity,
            column_complexity,
            workers,
            iteration_num: 0,
            iteration_learn_num: 0,
        }
    }

    /// Creates a `SpatialPooler` from the column and worker settings of `config`.
    #[inline]
    pub fn from_config(config: &HtmConfig) -> Self {
        Self::new(
            config.columns.local_activity,
            config.columns.column_complexity,
            config.workers,
        )
    }

    /// Processes the current `input`:
    /// - Updates iteration counters.
    /// - Recomputes the inhibition radius.
    /// - Calculates the overlap of every minicolumn.
    /// - Refreshes neighbor lists if the radius changed, then activates the local winners.
    ///
    /// If learning is enabled the winners adapt their synapse permanences.
    pub fn compute(&mut self, layer: &mut Layer, input: &Repr, learn: bool) -> Result<()> {
        layer.check_wired_input(input)?;
        self.update_iteration_number(learn);

        let partitions = Partition::split(layer.height(), layer.width(), self.workers);

        let previous = layer.inhibition_radius;
        layer.inhibition_radius = self.compute_inhibition_radius(layer, &partitions)?;
        debug!(
            radius = layer.inhibition_radius,
            previous,
            iteration = self.iteration_num,
            "inhibition radius"
        );

        self.calculate_overlaps(layer, input, &partitions)?;
        self.activate_minicolumns(layer, input, &partitions, learn)?;

        debug!(
            active = layer.active_columns(0).len(),
            total = layer.minicolumns().len(),
            "spatial pooling complete"
        );
        Ok(())
    }

    /// Increments the global iteration counters, including a separate counter if `learn` is true.
    #[inline]
    pub fn update_iteration_number(&mut self, learn: bool) {
        self.iteration_num += 1;
        if learn {
            self.iteration_learn_num += 1;
        }
    }

    /// Phase A: averages each partition's mean connected radius, then averages the partition
    /// means into the layer radius, truncated to whole minicolumns.
    pub fn compute_inhibition_radius(&self, layer: &Layer, partitions: &[Partition]) -> Result<u32> {
        let chunks = split_rows(layer.minicolumns(), partitions);

        let averages = thread::scope(|scope| {
            let mut handles = Vec::with_capacity(chunks.len());
            for (t, chunk) in chunks.into_iter().enumerate() {
                let handle = thread::Builder::new()
                    .name(format!("sp-radius-{t}"))
                    .spawn_scoped(scope, move || partition_radius(chunk))
                    .map_err(|e| spawn_error(t, "inhibition radius computation", e))?;
                handles.push(handle);
            }
            handles
                .into_iter()
                .enumerate()
                .map(|(t, handle)| {
                    handle
                        .join()
                        .map_err(|e| join_error(t, "inhibition radius computation", e))
                })
                .collect::<Result<Vec<f32>>>()
        })?;

        let mean = averages.iter().sum::<f32>() / averages.len().max(1) as f32;
        Ok(mean as u32)
    }

    /// Phase B: computes every minicolumn's overlap with `input`.
    pub fn calculate_overlaps(
        &self,
        layer: &mut Layer,
        input: &Repr,
        partitions: &[Partition],
    ) -> Result<()> {
        let column_complexity = self.column_complexity;
        let chunks = split_rows_mut(layer.minicolumns_mut(), partitions);

        thread::scope(|scope| {
            let mut handles = Vec::with_capacity(chunks.len());
            for (t, chunk) in chunks.into_iter().enumerate() {
                let handle = thread::Builder::new()
                    .name(format!("sp-overlap-{t}"))
                    .spawn_scoped(scope, move || {
                        for mc in chunk.iter_mut() {
                            mc.compute_overlap(input, column_complexity);
                        }
                        trace!(partition = t, columns = chunk.len(), "overlaps computed");
                    })
                    .map_err(|e| spawn_error(t, "overlap computation", e))?;
                handles.push(handle);
            }
            for (t, handle) in handles.into_iter().enumerate() {
                handle
                    .join()
                    .map_err(|e| join_error(t, "overlap computation", e))?;
            }
            Ok(())
        })
    }

    /// Phase C: refreshes neighbor lists when the radius moved and lets every minicolumn compete
    /// against its neighbors. Winners adapt their synapses if `learn` is set.
    pub fn activate_minicolumns(
        &self,
        layer: &mut Layer,
        input: &Repr,
        partitions: &[Partition],
        learn: bool,
    ) -> Result<()> {
        let overlaps: Vec<u32> = layer.minicolumns().iter().map(|mc| mc.overlap).collect();
        let fired: Vec<AtomicBool> = (0..overlaps.len()).map(|_| AtomicBool::new(false)).collect();
        let competition = Competition {
            grid: layer.grid(),
            radius: layer.inhibition_radius,
            local_activity: self.local_activity,
            learn,
            input,
            overlaps: &overlaps,
            fired: &fired,
        };
        let competition = &competition;
        let chunks = split_rows_mut(layer.minicolumns_mut(), partitions);

        thread::scope(|scope| {
            let mut handles = Vec::with_capacity(chunks.len());
            for (t, (chunk, partition)) in chunks.into_iter().zip(partitions).enumerate() {
                let base = partition.range().start;
                let handle = thread::Builder::new()
                    .name(format!("sp-activate-{t}"))
                    .spawn_scoped(scope, move || competition.run(chunk, base))
                    .map_err(|e| spawn_error(t, "minicolumn activation", e))?;
                handles.push(handle);
            }
            for (t, handle) in handles.into_iter().enumerate() {
                handle
                    .join()
                    .map_err(|e| join_error(t, "minicolumn activation", e))??;
            }
            Ok(())
        })
    }
}

impl Competition<'_> {
    /// Runs activation for one partition whose first minicolumn has arena index `base`.
    fn run(&self, chunk: &mut [Minicolumn], base: usize) -> Result<()> {
        for (offset, mc) in chunk.iter_mut().enumerate() {
            let index = base + offset;
            let (x, y) = self.grid.coordinates(index);

            let (neighbors, neighbor_radius) = mc.neighbor_state_mut();
            if *neighbor_radius != Some(self.radius) {
                update_neighbors(neighbors, self.grid, x, y, *neighbor_radius, self.radius)?;
                *neighbor_radius = Some(self.radius);
            }

            let active = self.is_winner(mc);
            mc.record_activity(active);
            if active {
                self.fired[index].store(true, Ordering::Relaxed);
                if self.learn {
                    mc.learn(self.input);
                }
            }
        }
        trace!(first = base, columns = chunk.len(), "minicolumns activated");
        Ok(())
    }

    /// Local k-winners-take-all: at most `max_active` neighbors may have a higher overlap or
    /// have already fired this round.
    fn is_winner(&self, mc: &Minicolumn) -> bool {
        if mc.overlap == 0 {
            return false;
        }
        let neighbors = mc.neighbors();
        let num_higher = neighbors
            .iter()
            .filter(|&&n| self.overlaps[n] > mc.overlap)
            .count();
        let num_active = neighbors
            .iter()
            .filter(|&&n| self.fired[n].load(Ordering::Relaxed))
            .count();
        let max_active = max_active(neighbors.len(), self.local_activity);
        num_active < max_active && num_higher < max_active
    }
}

/// Number of winners allowed in a neighborhood of `neighbor_count` plus the minicolumn itself.
#[inline]
pub fn max_active(neighbor_count: usize, local_activity: f32) -> usize {
    (((neighbor_count + 1) as f32 * local_activity).ceil() as usize).max(1)
}

/// Mean connected radius over one partition.
fn partition_radius(chunk: &[Minicolumn]) -> f32 {
    let sum: f32 = chunk.iter().map(Minicolumn::connected_radius).sum();
    sum / chunk.len().max(1) as f32
}

fn spawn_error(worker: usize, phase: &str, error: std::io::Error) -> HtmError {
    HtmError::Execution(format!("worker {worker} creation failed during {phase}: {error}"))
}

fn join_error(worker: usize, phase: &str, payload: Box<dyn Any + Send>) -> HtmError {
    let reason = payload
        .downcast_ref::<&str>()
        .map(|s| s.to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "unknown panic".to_string());
    HtmError::Execution(format!("worker {worker} join failed during {phase}: {reason}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn wired_layer(height: u32, width: u32, input: &Repr, fraction: f32) -> Layer {
        let mut layer = Layer::new(height, width).unwrap();
        layer.init_receptive_fields(input, fraction).unwrap();
        layer
    }

    #[test]
    fn max_active_is_at_least_one() {
        assert_eq!(max_active(0, 0.0), 1);
        assert_eq!(max_active(8, 0.0), 1);
        assert_eq!(max_active(8, 1.0), 9);
        assert_eq!(max_active(8, 0.5), 5);
        assert_eq!(max_active(3, 0.1), 1);
    }

    #[test]
    fn inhibition_radius_is_independent_of_worker_count() {
        let input = Repr::filled(24, 24);
        let layer = wired_layer(12, 12, &input, 0.1);
        let radii: Vec<u32> = [1, 2, 3, 4]
            .iter()
            .map(|&workers| {
                let sp = SpatialPooler::new(0.5, 0.0, workers);
                let partitions = Partition::split(layer.height(), layer.width(), workers);
                sp.compute_inhibition_radius(&layer, &partitions).unwrap()
            })
            .collect();
        assert!(radii.iter().all(|&r| r == radii[0]));
    }

    #[test]
    fn radius_of_layer_without_connected_synapses_is_zero() {
        let input = Repr::filled(4, 4);
        let mut layer = wired_layer(2, 2, &input, 0.5);
        let empty = Repr::new(4, 4);
        for mc in layer.minicolumns_mut() {
            mc.learn(&empty);
            mc.learn(&empty);
        }
        let sp = SpatialPooler::new(0.5, 0.0, 1);
        let radius = sp
            .compute_inhibition_radius(&layer, &Partition::split(2, 2, 1))
            .unwrap();
        assert_eq!(radius, 0);
    }

    #[test]
    fn oversized_worker_count_is_clamped_to_rows() {
        let input = Repr::filled(8, 8);
        let mut layer = wired_layer(4, 4, &input, 0.25);
        let mut sp = SpatialPooler::new(1.0, 0.0, 1usize << 32);
        sp.compute(&mut layer, &input, true).unwrap();
        assert_eq!(layer.active_columns(0).len(), 16);
    }

    #[test]
    fn worker_failures_become_execution_errors() {
        let err = join_error(2, "overlap computation", Box::new("boom"));
        assert_eq!(
            err.to_string(),
            "Pipeline execution failed: worker 2 join failed during overlap computation: boom"
        );
        assert!(matches!(
            join_error(0, "minicolumn activation", Box::new(String::from("lost"))),
            HtmError::Execution(msg) if msg == "worker 0 join failed during minicolumn activation: lost"
        ));
        assert!(matches!(
            join_error(1, "overlap computation", Box::new(7u8)),
            HtmError::Execution(msg) if msg.ends_with("unknown panic")
        ));
        assert!(matches!(
            spawn_error(3, "inhibition radius computation", std::io::Error::other("no threads")),
            HtmError::Execution(msg)
                if msg == "worker 3 creation failed during inhibition radius computation: no threads"
        ));
    }

    #[test]
    fn panicking_worker_payload_is_reported() {
        let err = thread::scope(|scope| {
            let handle = thread::Builder::new()
                .spawn_scoped(scope, || -> u32 { panic!("partition {} failed", 4) })
                .unwrap();
            handle.join().map_err(|e| join_error(0, "overlap computation", e))
        })
        .unwrap_err();
        assert!(matches!(
            err,
            HtmError::Execution(msg) if msg.ends_with("partition 4 failed")
        ));
    }

    #[test]
    fn compute_requires_wired_layer() {
        let mut layer = Layer::new(2, 2).unwrap();
        let mut sp = SpatialPooler::new(0.5, 0.0, 1);
        assert!(sp.compute(&mut layer, &Repr::new(4, 4), true).is_err());
        assert_eq!(sp.iteration_num, 0);
    }

    #[test]
    fn empty_input_leaves_every_minicolumn_inactive() {
        let input = Repr::new(8, 8);
        let mut layer = wired_layer(4, 4, &input, 0.25);
        let mut sp = SpatialPooler::new(1.0, 0.0, 2);
        sp.compute(&mut layer, &input, true).unwrap();
        assert!(layer.minicolumns().iter().all(|mc| mc.overlap == 0));
        assert!(layer.active_columns(0).is_empty());
        // inactive minicolumns do not learn
        assert!(layer
            .minicolumns()
            .iter()
            .all(|mc| mc.synapses().iter().all(|s| s.is_connected())));
    }

    #[test]
    fn learning_disabled_keeps_permanences() {
        let input = Repr::filled(8, 8);
        let mut layer = wired_layer(4, 4, &input, 0.25);
        let before: Vec<f32> = layer
            .minicolumns()
            .iter()
            .flat_map(|mc| mc.synapses().iter().map(|s| s.permanence))
            .collect();
        let mut sp = SpatialPooler::new(1.0, 0.0, 2);
        sp.compute(&mut layer, &input, false).unwrap();
        let after: Vec<f32> = layer
            .minicolumns()
            .iter()
            .flat_map(|mc| mc.synapses().iter().map(|s| s.permanence))
            .collect();
        assert_eq!(before, after);
        assert_eq!(sp.iteration_num, 1);
        assert_eq!(sp.iteration_learn_num, 0);
    }

    #[test]
    fn winners_learn_the_input() {
        let input = Repr::from_fn(8, 8, |r, _| r < 4);
        let mut layer = wired_layer(4, 4, &input, 0.25);
        let mut sp = SpatialPooler::new(1.0, 0.0, 1);
        sp.compute(&mut layer, &input, true).unwrap();

        let mc = layer.minicolumn(0, 0);
        assert!(mc.active_at(0));
        for syn in mc.synapses() {
            if syn.src_row < 4 {
                assert!(syn.permanence > 0.3);
            } else {
                assert!(!syn.is_connected());
            }
        }
    }

    #[test]
    fn neighbor_lists_follow_the_radius() {
        let input = Repr::filled(16, 16);
        let mut layer = wired_layer(8, 8, &input, 0.2);
        let mut sp = SpatialPooler::new(0.5, 0.0, 3);
        sp.compute(&mut layer, &input, true).unwrap();

        let radius = layer.inhibition_radius();
        let grid = layer.grid();
        for (index, mc) in layer.minicolumns().iter().enumerate() {
            let (x, y) = grid.coordinates(index);
            assert_eq!(mc.neighbor_radius(), Some(radius));
            assert_eq!(
                mc.neighbors().len(),
                grid.neighborhood(x, y, radius).area() - 1
            );
            assert!(!mc.neighbors().contains(&index));
        }
    }

    #[test]
    fn shrinking_radius_rebuilds_neighbor_lists() {
        let input = Repr::filled(16, 16);
        let mut layer = wired_layer(8, 8, &input, 0.5);
        let mut sp = SpatialPooler::new(1.0, 0.0, 2);
        sp.compute(&mut layer, &input, true).unwrap();
        assert!(layer.inhibition_radius() > 0);
        assert!(layer.minicolumns().iter().all(|mc| !mc.neighbors().is_empty()));

        // keep only the synapse on each minicolumn's own center connected
        for mc in layer.minicolumns_mut() {
            let (cx, cy) = mc.center;
            let frame = Repr::from_fn(16, 16, |r, c| (c, r) == (cx, cy));
            for _ in 0..3 {
                mc.learn(&frame);
            }
        }

        sp.compute(&mut layer, &input, true).unwrap();
        assert_eq!(layer.inhibition_radius(), 0);
        for mc in layer.minicolumns() {
            assert_eq!(mc.neighbor_radius(), Some(0));
            assert!(mc.neighbors().is_empty());
            assert_eq!(mc.overlap, 1);
            assert!(mc.active_at(0));
        }
    }
}
