//! ShardSim — parallel-execution cost simulator for distributed training
//! strategies.
//!
//! Given a dataflow graph of operators, a candidate parallelization per
//! operator, and a model of the cluster fabric, the simulator expands the
//! plan into a task DAG, schedules it on the modeled machine, and returns
//! the estimated step time plus a memory-overflow penalty. It is the inner
//! loop of a placement search: fast, deterministic, and free of real
//! tensor computation.
//!
//! # Architecture
//!
//! ```text
//! ┌───────────┐    ┌─────────────┐    ┌────────────┐
//! │  Model +  │───▶│   Builder   │───▶│ Scheduler  │──▶ makespan
//! │ Placement │    │ (task DAG)  │    │ (timeline) │       +
//! └───────────┘    └──────┬──────┘    └────────────┘    penalty
//!                         │
//!              ┌──────────┼───────────┐
//!              ▼          ▼           ▼
//!        ┌─────────┐ ┌─────────┐ ┌─────────┐
//!        │ Machine │ │  Task   │ │  Cost   │
//!        │  Model  │ │  Arena  │ │  Cache  │
//!        └─────────┘ └─────────┘ └─────────┘
//! ```

pub mod arena;
pub mod builder;
pub mod cache;
pub mod config;
pub mod export;
pub mod machine;
pub mod memory;
pub mod report;
pub mod scheduler;
pub mod simulator;

// Re-export key types for convenience.
pub use arena::{Task, TaskArena, TaskId, TaskKind};
pub use cache::CostCache;
pub use config::{ConfigError, MachineConfig};
pub use machine::{CommLink, ComputeDevice, Device, DeviceIdx, LinkBandwidths, MachineModel};
pub use report::{format_mode_comparison, format_report, SimulationReport};
pub use scheduler::{TaskSpan, Timeline};
pub use simulator::{CompMode, Simulator, SyncMode};

use shardsim_model::{ModelGraph, Placement};

/// Evaluate one placement on a configured machine in one call.
pub fn run_simulation(
    config: &MachineConfig,
    graph: &ModelGraph,
    placement: &Placement,
    mode: CompMode,
) -> Result<SimulationReport, ConfigError> {
    let mut sim = Simulator::from_config(config)?;
    Ok(sim.simulate(graph, placement, mode))
}

/// Evaluate the same placement under all three synchronization modes.
pub fn compare_sync_modes(
    config: &MachineConfig,
    graph: &ModelGraph,
    placement: &Placement,
) -> Result<Vec<SimulationReport>, ConfigError> {
    let mut sim = Simulator::from_config(config)?;
    let mut reports = Vec::new();
    for sync in [
        SyncMode::Overlap,
        SyncMode::BulkSynchronous,
        SyncMode::Collectives,
    ] {
        sim.set_sync_mode(sync);
        reports.push(sim.simulate(graph, placement, CompMode::Training));
    }
    Ok(reports)
}
