//! Expansion of the operator graph into a task DAG.
//!
//! The builder runs in ordered phases: compute tasks, data-transfer edges,
//! then (training only) the weight-synchronization overlay with its final
//! barrier layer. Later phases never mutate earlier structures except by
//! adding edges out of registered tasks. Every phase funnels data movement
//! through [`TaskGraphBuilder::transfer_chain`], the one place that knows
//! how the fabric is shaped.

use crate::arena::{TaskArena, TaskId};
use crate::cache::CostCache;
use crate::machine::MachineModel;
use crate::simulator::{CompMode, SyncMode};
use shardsim_model::{ModelGraph, OpId, Operator, ParallelConfig, Placement};

pub(crate) struct TaskGraphBuilder<'a> {
    pub machine: &'a MachineModel,
    pub graph: &'a ModelGraph,
    pub placement: &'a Placement,
    pub arena: &'a mut TaskArena,
    pub cache: &'a mut CostCache,
    pub mode: CompMode,
    /// Element size of the logical transfer type, in bytes.
    pub elem_bytes: f64,
}

impl TaskGraphBuilder<'_> {
    /// Run all phases. On return the arena holds the complete DAG and every
    /// zero-in-degree task is part of the scheduler's initial frontier.
    pub fn build(&mut self, sync: SyncMode) {
        self.add_compute_tasks();
        self.add_data_transfers();
        if self.mode == CompMode::Training && sync != SyncMode::Collectives {
            self.add_weight_sync(sync);
        }
    }

    /// Phase 1: one Forward (and in training one Backward) task per shard.
    fn add_compute_tasks(&mut self) {
        let graph = self.graph;
        for op in graph.operators() {
            let pc = self.placement.config(op.id());
            let metrics = self.cache.get_or_measure(op, pc);
            for shard in 0..pc.num_shards() {
                let device = self.machine.compute_idx(pc.devices[shard]);
                let forward = self.arena.new_forward_task(
                    op.id(),
                    shard as u32,
                    device,
                    metrics.forward_time,
                );
                if self.mode == CompMode::Training {
                    let backward = self.arena.new_backward_task(
                        op.id(),
                        shard as u32,
                        device,
                        metrics.backward_time,
                    );
                    self.arena.add_edge(forward, backward);
                }
            }
        }
    }

    /// Phase 2: transfer chains wherever a consumer shard's input footprint
    /// intersects a producer shard's output footprint. Backward chains run
    /// in the opposite direction — gradients flow consumer to producer.
    fn add_data_transfers(&mut self) {
        let graph = self.graph;
        for op in graph.operators() {
            let pc = self.placement.config(op.id());
            for input_idx in 0..op.num_inputs() {
                let Some(source) = op.input_source(input_idx) else {
                    continue;
                };
                let pre_op = graph.op(source.op);
                let pre_pc = self.placement.config(source.op);
                for dst_shard in 0..pc.num_shards() {
                    let dst_region = op.input_region(pc, input_idx, dst_shard);
                    for src_shard in 0..pre_pc.num_shards() {
                        let src_region = pre_op.output_region(pre_pc, source.output, src_shard);
                        let volume = dst_region.intersection(&src_region).volume();
                        if volume == 0 {
                            continue;
                        }
                        let src_fwd = self.arena.forward_task(source.op, src_shard as u32);
                        let dst_fwd = self.arena.forward_task(op.id(), dst_shard as u32);
                        self.transfer_chain(src_fwd, dst_fwd, volume);
                        if self.mode == CompMode::Training {
                            let dst_bwd = self.arena.backward_task(op.id(), dst_shard as u32);
                            let src_bwd = self.arena.backward_task(source.op, src_shard as u32);
                            self.transfer_chain(dst_bwd, src_bwd, volume);
                        }
                    }
                }
            }
        }
    }

    /// Phase 3 + 4: per-device final barriers, then the synchronization
    /// overlay of the selected mode. The finals are allocated first so the
    /// overlay's tail chains have their sink.
    fn add_weight_sync(&mut self, sync: SyncMode) {
        let graph = self.graph;
        let num_gpus = self.machine.num_compute_devices();
        let mut finals: Vec<TaskId> = Vec::with_capacity(num_gpus as usize);
        for gpu in 0..num_gpus {
            let device = self.machine.compute_idx(gpu);
            finals.push(self.arena.new_barrier_task(device));
        }

        match sync {
            SyncMode::Overlap => {
                // Visit layers last-to-first: updates of earlier layers can
                // overlap the still-running backward of later ones.
                for l in (0..graph.len()).rev() {
                    let op = graph.op(l as OpId);
                    let pc = self.placement.config(op.id());
                    for w in 0..op.num_weights() {
                        for class in weight_shard_classes(op, pc, w) {
                            let volume = op.weight_region(pc, w, class[0] as usize).volume();
                            let update = self
                                .arena
                                .new_update_task(self.machine.compute_idx(pc.devices[class[0] as usize]));
                            for &member in &class[1..] {
                                let backward = self.arena.backward_task(op.id(), member);
                                self.transfer_chain(backward, update, volume);
                                let final_t = finals[pc.devices[member as usize] as usize];
                                self.transfer_chain(update, final_t, volume);
                            }
                        }
                    }
                }
            }
            SyncMode::BulkSynchronous => {
                let mut barriers: Vec<TaskId> = Vec::with_capacity(num_gpus as usize);
                for gpu in 0..num_gpus {
                    let device = self.machine.compute_idx(gpu);
                    barriers.push(self.arena.new_barrier_task(device));
                }
                for op in graph.operators() {
                    let pc = self.placement.config(op.id());
                    for shard in 0..pc.num_shards() {
                        let backward = self.arena.backward_task(op.id(), shard as u32);
                        self.arena
                            .add_edge(backward, barriers[pc.devices[shard] as usize]);
                    }
                }
                for op in graph.operators() {
                    let pc = self.placement.config(op.id());
                    for w in 0..op.num_weights() {
                        for class in weight_shard_classes(op, pc, w) {
                            let volume = op.weight_region(pc, w, class[0] as usize).volume();
                            let first_gpu = pc.devices[class[0] as usize];
                            let update = self
                                .arena
                                .new_update_task(self.machine.compute_idx(first_gpu));
                            self.arena.add_edge(barriers[first_gpu as usize], update);
                            for &member in &class[1..] {
                                let gpu = pc.devices[member as usize];
                                self.transfer_chain(barriers[gpu as usize], update, volume);
                                self.transfer_chain(update, finals[gpu as usize], volume);
                            }
                        }
                    }
                }
            }
            SyncMode::Collectives => {
                unreachable!("collective sync is a post-scheduling pass, not an overlay")
            }
        }
    }

    /// The transfer-chain subroutine: connect `src` to `dst` through zero,
    /// one, or three Comm tasks depending on where the two tasks live.
    pub(crate) fn transfer_chain(&mut self, src: TaskId, dst: TaskId, volume: u64) {
        let src_dev = self.arena.task(src).device;
        let dst_dev = self.arena.task(dst).device;
        if src_dev == dst_dev {
            self.arena.add_edge(src, dst);
            return;
        }
        let s = *self.machine.compute(src_dev);
        let d = *self.machine.compute(dst_dev);
        let bytes = volume as f64 * self.elem_bytes;

        if s.node == d.node {
            let link = self.machine.intra_node_link(s.id, d.id);
            let comm = self
                .arena
                .new_comm_task(link, bytes / self.machine.link_bandwidth(link));
            self.arena.add_edge(src, comm);
            self.arena.add_edge(comm, dst);
        } else {
            let up_link = self.machine.gpu_to_dram_link(s.id);
            let up = self
                .arena
                .new_comm_task(up_link, bytes / self.machine.link_bandwidth(up_link));
            let wire_link = self.machine.inter_node_link(s.node, d.node);
            let wire = self
                .arena
                .new_comm_task(wire_link, bytes / self.machine.link_bandwidth(wire_link));
            let down_link = self.machine.dram_to_gpu_link(d.id);
            let down = self
                .arena
                .new_comm_task(down_link, bytes / self.machine.link_bandwidth(down_link));
            self.arena.add_edge(src, up);
            self.arena.add_edge(up, wire);
            self.arena.add_edge(wire, down);
            self.arena.add_edge(down, dst);
        }
    }
}

/// Partition a weight's shard indices into equivalence classes of identical
/// regions. The all-or-nothing invariant (any two shards' regions are either
/// identical or disjoint) makes a single pass against each class
/// representative sufficient.
///
/// # Panics
///
/// Panics on a partial overlap between two shards' weight regions.
pub(crate) fn weight_shard_classes(
    op: &dyn Operator,
    pc: &ParallelConfig,
    weight_idx: usize,
) -> Vec<Vec<u32>> {
    let num_shards = pc.num_shards();
    let mut assigned = vec![false; num_shards];
    let mut classes = Vec::new();
    for first in 0..num_shards {
        if assigned[first] {
            continue;
        }
        assigned[first] = true;
        let first_region = op.weight_region(pc, weight_idx, first);
        let mut class = vec![first as u32];
        for next in (first + 1)..num_shards {
            if assigned[next] {
                continue;
            }
            let next_region = op.weight_region(pc, weight_idx, next);
            if first_region.intersection(&next_region).volume() > 0 {
                assert!(
                    first_region == next_region,
                    "operator '{}' weight {}: shards {} and {} overlap partially; \
                     weight regions must fully coincide or be disjoint",
                    op.name(),
                    weight_idx,
                    first,
                    next,
                );
                assigned[next] = true;
                class.push(next as u32);
            }
        }
        classes.push(class);
    }
    classes
}
