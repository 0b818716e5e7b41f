//! The simulation entry point.
//!
//! A [`Simulator`] owns the machine model, the task arena, and the
//! measurement cache. Each call to [`Simulator::simulate`] rebuilds the task
//! DAG for one (model, placement) pair, schedules it, applies the
//! collective post-pass and the memory penalty, and returns a report. The
//! cache is the only state that survives between calls, so repeated
//! evaluations of identical placements are cheap — exactly what the outer
//! strategy search needs.

use crate::arena::{TaskArena, TaskId, TaskKind};
use crate::builder::{weight_shard_classes, TaskGraphBuilder};
use crate::cache::CostCache;
use crate::config::{ConfigError, MachineConfig};
use crate::export;
use crate::machine::MachineModel;
use crate::memory::{memory_penalty, tally_device_memory};
use crate::report::SimulationReport;
use crate::scheduler::{schedule, Timeline};
use serde::{Deserialize, Serialize};
use shardsim_model::{ModelGraph, Placement};
use std::path::Path;

/// What one simulated step computes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CompMode {
    Training,
    Inference,
}

impl CompMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            CompMode::Training => "training",
            CompMode::Inference => "inference",
        }
    }
}

/// How weight gradients are reconciled across replicated shards.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SyncMode {
    /// Updates of earlier layers overlap the backward of later layers.
    Overlap,
    /// A per-device barrier separates backward from all updates.
    BulkSynchronous,
    /// No overlay; serialized blocking collectives are charged after
    /// scheduling.
    Collectives,
}

impl SyncMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            SyncMode::Overlap => "overlap",
            SyncMode::BulkSynchronous => "bsp",
            SyncMode::Collectives => "collectives",
        }
    }
}

/// The parallel-execution cost simulator.
pub struct Simulator {
    machine: MachineModel,
    arena: TaskArena,
    cache: CostCache,
    sync_mode: SyncMode,
    penalty_per_byte: f64,
}

impl Simulator {
    pub const DEFAULT_TASK_CAPACITY: usize = 262_144;

    pub fn new(machine: MachineModel) -> Self {
        Self::with_task_capacity(machine, Self::DEFAULT_TASK_CAPACITY)
    }

    pub fn with_task_capacity(machine: MachineModel, capacity: usize) -> Self {
        Self {
            machine,
            arena: TaskArena::with_capacity(capacity),
            cache: CostCache::new(),
            sync_mode: SyncMode::BulkSynchronous,
            penalty_per_byte: 1e-6,
        }
    }

    /// Build a simulator from a validated machine configuration.
    pub fn from_config(config: &MachineConfig) -> Result<Self, ConfigError> {
        let mut sim = Self::with_task_capacity(config.machine(), config.simulation.max_tasks);
        sim.sync_mode = config.sync_mode()?;
        sim.penalty_per_byte = config.simulation.memory_penalty_per_byte;
        Ok(sim)
    }

    pub fn machine(&self) -> &MachineModel {
        &self.machine
    }

    pub fn sync_mode(&self) -> SyncMode {
        self.sync_mode
    }

    pub fn set_sync_mode(&mut self, sync_mode: SyncMode) {
        self.sync_mode = sync_mode;
    }

    pub fn set_memory_penalty_per_byte(&mut self, penalty_per_byte: f64) {
        self.penalty_per_byte = penalty_per_byte;
    }

    /// Simulate one step and return the full report.
    pub fn simulate(
        &mut self,
        graph: &ModelGraph,
        placement: &Placement,
        mode: CompMode,
    ) -> SimulationReport {
        self.execute(graph, placement, mode).0
    }

    /// Simulate one step and return its scalar cost in seconds.
    pub fn simulate_runtime(
        &mut self,
        graph: &ModelGraph,
        placement: &Placement,
        mode: CompMode,
    ) -> f64 {
        self.simulate(graph, placement, mode).total_cost
    }

    /// Simulate one step, writing the scheduled task graph as a DOT file.
    pub fn simulate_exported(
        &mut self,
        graph: &ModelGraph,
        placement: &Placement,
        mode: CompMode,
        path: &Path,
    ) -> std::io::Result<SimulationReport> {
        let (report, timeline) = self.execute(graph, placement, mode);
        export::write_dot(path, &self.arena, &timeline, graph)?;
        Ok(report)
    }

    /// Like [`Self::simulate_exported`] but returning only the scalar cost.
    pub fn simulate_runtime_exported(
        &mut self,
        graph: &ModelGraph,
        placement: &Placement,
        mode: CompMode,
        path: &Path,
    ) -> std::io::Result<f64> {
        self.simulate_exported(graph, placement, mode, path)
            .map(|report| report.total_cost)
    }

    fn execute(
        &mut self,
        graph: &ModelGraph,
        placement: &Placement,
        mode: CompMode,
    ) -> (SimulationReport, Timeline) {
        self.arena.reset();
        let mut builder = TaskGraphBuilder {
            machine: &self.machine,
            graph,
            placement,
            arena: &mut self.arena,
            cache: &mut self.cache,
            mode,
            elem_bytes: graph.transfer_dtype().size_bytes() as f64,
        };
        builder.build(self.sync_mode);

        let timeline = schedule(&mut self.arena, self.machine.device_count());

        let collective_time = if mode == CompMode::Training && self.sync_mode == SyncMode::Collectives
        {
            self.collective_sync_time(graph, placement)
        } else {
            0.0
        };

        let device_memory = tally_device_memory(graph, placement, &mut self.cache, &self.machine);
        let penalty = memory_penalty(&device_memory, &self.machine, self.penalty_per_byte);

        let comm_tasks = (0..self.arena.len() as TaskId)
            .filter(|&id| self.arena.task(id).kind == TaskKind::Comm)
            .count();

        let report = SimulationReport {
            mode: mode.as_str().to_string(),
            sync_mode: self.sync_mode.as_str().to_string(),
            total_cost: timeline.makespan + collective_time + penalty,
            makespan: timeline.makespan,
            collective_time,
            memory_penalty: penalty,
            total_tasks: self.arena.len(),
            comm_tasks,
            device_memory,
        };
        (report, timeline)
    }

    /// Serial cost of blocking collectives: for every weight-overlap class,
    /// the worst pairwise transfer among its members, summed over classes.
    /// Classes are charged independently — an approximation that ignores
    /// serialization on shared links.
    fn collective_sync_time(&self, graph: &ModelGraph, placement: &Placement) -> f64 {
        let elem = graph.transfer_dtype().size_bytes() as f64;
        let mut total = 0.0;
        for op in graph.operators() {
            let pc = placement.config(op.id());
            for w in 0..op.num_weights() {
                for class in weight_shard_classes(op, pc, w) {
                    if class.len() < 2 {
                        continue;
                    }
                    let bytes = op.weight_region(pc, w, class[0] as usize).volume() as f64 * elem;
                    let mut worst = 0.0f64;
                    for i in 0..class.len() {
                        for j in (i + 1)..class.len() {
                            let a = *self
                                .machine
                                .compute(self.machine.compute_idx(pc.devices[class[i] as usize]));
                            let b = *self
                                .machine
                                .compute(self.machine.compute_idx(pc.devices[class[j] as usize]));
                            if a.id == b.id {
                                continue;
                            }
                            let bandwidth = if a.node == b.node {
                                self.machine
                                    .link_bandwidth(self.machine.intra_node_link(a.id, b.id))
                            } else {
                                self.machine
                                    .link_bandwidth(self.machine.inter_node_link(a.node, b.node))
                            };
                            worst = worst.max(bytes / bandwidth);
                        }
                    }
                    total += worst;
                }
            }
        }
        total
    }
}
