//! Per-device memory accounting and the over-budget penalty.
//!
//! Memory pressure is never an error: a strategy that overflows a device is
//! charged a smooth penalty proportional to the excess, so the outer search
//! can move through infeasible regions instead of hitting a wall.

use crate::cache::CostCache;
use crate::machine::MachineModel;
use shardsim_model::{ModelGraph, Placement};

/// Sum each shard's memory requirement onto its assigned compute device.
/// Returns one accumulator per global compute id.
pub fn tally_device_memory(
    graph: &ModelGraph,
    placement: &Placement,
    cache: &mut CostCache,
    machine: &MachineModel,
) -> Vec<u64> {
    let mut usage = vec![0u64; machine.num_compute_devices() as usize];
    for op in graph.operators() {
        let pc = placement.config(op.id());
        let metrics = cache.get_or_measure(op, pc);
        for shard in 0..pc.num_shards() {
            usage[pc.devices[shard] as usize] += metrics.memory_requirement;
        }
    }
    usage
}

/// Penalty in seconds: `excess_bytes * penalty_per_byte` summed over every
/// device above capacity.
pub fn memory_penalty(usage: &[u64], machine: &MachineModel, penalty_per_byte: f64) -> f64 {
    let mut penalty = 0.0;
    for (gpu, &used) in usage.iter().enumerate() {
        let capacity = machine.compute(machine.compute_idx(gpu as u32)).capacity;
        if used > capacity {
            penalty += (used - capacity) as f64 * penalty_per_byte;
        }
    }
    penalty
}
