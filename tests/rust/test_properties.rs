//! Universal properties: determinism, causality, per-device serialization,
//! monotonicity, and measurement-cache consistency.

mod common;

use common::*;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use shardsim_core::arena::TaskArena;
use shardsim_core::scheduler::schedule;
use shardsim_core::simulator::{CompMode, Simulator, SyncMode};
use shardsim_model::{
    ComputeProfile, CostMetrics, ModelGraph, OpId, Operator, ParallelConfig, Placement, Region,
    TensorSource,
};
use std::cell::Cell;
use std::rc::Rc;

fn mixed_model() -> (ModelGraph, Placement) {
    let mut graph = ModelGraph::new(ComputeProfile::a100());
    let fc1 = graph.dense("fc1", 128, 256, 512, None);
    let act = graph.elementwise("act", shardsim_model::Activation::Relu, fc1);
    let fc2 = graph.dense("fc2", 128, 512, 256, Some(act));
    let mut placement = Placement::data_parallel(&graph, 4);
    // Make fc2 feature-split so the placement mixes replication with
    // sharding and forces real cross-device traffic.
    placement.insert(fc2, pc_shards(vec![4, 1], vec![0, 1, 2, 3]));
    (graph, placement)
}

#[test]
fn test_repeated_runs_are_bit_identical() {
    let (graph, placement) = mixed_model();
    let machine = single_node(4, 100e9, 16 << 30);

    let mut sim = Simulator::new(machine.clone());
    sim.set_sync_mode(SyncMode::Overlap);
    let first = sim.simulate(&graph, &placement, CompMode::Training);
    let second = sim.simulate(&graph, &placement, CompMode::Training);

    assert_eq!(first.total_cost.to_bits(), second.total_cost.to_bits());
    assert_eq!(first.makespan.to_bits(), second.makespan.to_bits());
    assert_eq!(first.total_tasks, second.total_tasks);
    assert_eq!(first.comm_tasks, second.comm_tasks);

    // A fresh simulator agrees too.
    let mut fresh = Simulator::new(machine);
    fresh.set_sync_mode(SyncMode::Overlap);
    let third = fresh.simulate(&graph, &placement, CompMode::Training);
    assert_eq!(first.total_cost.to_bits(), third.total_cost.to_bits());
}

#[test]
fn test_causality_and_serialization_on_random_dags() {
    let mut rng = ChaCha8Rng::seed_from_u64(7);
    for _ in 0..5 {
        let devices = 8u32;
        let n = 200u32;
        let mut arena = TaskArena::with_capacity(1024);
        for _ in 0..n {
            arena.new_comm_task(rng.gen_range(0..devices), rng.gen::<f64>());
        }
        // Edges only point forward in allocation order, so the DAG is acyclic.
        for src in 0..n {
            for dst in (src + 1)..n {
                if rng.gen_bool(0.02) {
                    arena.add_edge(src, dst);
                }
            }
        }

        let timeline = schedule(&mut arena, devices as usize);

        // Causality: an edge's head never starts before its tail ends.
        for id in 0..n {
            let end = timeline.spans[id as usize].end;
            for &succ in &arena.task(id).next {
                assert!(
                    end <= timeline.spans[succ as usize].start,
                    "edge {}->{} violates causality",
                    id,
                    succ
                );
            }
        }

        // Per-device serialization: intervals on one device never overlap.
        for device in 0..devices {
            let mut spans: Vec<_> = (0..n)
                .filter(|&id| arena.task(id).device == device)
                .map(|id| timeline.spans[id as usize])
                .collect();
            spans.sort_by(|a, b| a.start.total_cmp(&b.start));
            for pair in spans.windows(2) {
                assert!(
                    pair[0].end <= pair[1].start,
                    "device {} runs two tasks at once",
                    device
                );
            }
        }
    }
}

#[test]
fn test_makespan_monotone_in_bandwidth() {
    let a = StubOp::new(0, "a", &[100_000], 1.0, 1.0);
    let b = StubOp::new(1, "b", &[100_000], 1.0, 1.0).feeding_from(0);
    let graph = stub_graph(vec![a, b]);
    let mut placement = Placement::new();
    placement.insert(0, pc_single(1, 0));
    placement.insert(1, pc_single(1, 1));

    let mut slow = Simulator::new(single_node(2, 4e9, 16 << 30));
    let mut fast = Simulator::new(single_node(2, 8e9, 16 << 30));
    let slow_span = slow.simulate(&graph, &placement, CompMode::Training).makespan;
    let fast_span = fast.simulate(&graph, &placement, CompMode::Training).makespan;
    assert!(fast_span <= slow_span);
}

#[test]
fn test_makespan_monotone_in_compute_time() {
    let machine = single_node(2, 4e9, 16 << 30);
    let mut spans = Vec::new();
    for forward in [1.0, 2.0, 3.0] {
        let a = StubOp::new(0, "a", &[1000], forward, 1.0);
        let b = StubOp::new(1, "b", &[1000], 1.0, 1.0).feeding_from(0);
        let graph = stub_graph(vec![a, b]);
        let mut placement = Placement::new();
        placement.insert(0, pc_single(1, 0));
        placement.insert(1, pc_single(1, 1));
        let mut sim = Simulator::new(machine.clone());
        spans.push(sim.simulate(&graph, &placement, CompMode::Training).makespan);
    }
    assert!(spans[0] <= spans[1] && spans[1] <= spans[2]);
}

/// Operator that counts measurement-callback invocations.
struct CountingOp {
    id: OpId,
    calls: Rc<Cell<u32>>,
}

impl Operator for CountingOp {
    fn id(&self) -> OpId {
        self.id
    }
    fn name(&self) -> &str {
        "counting"
    }
    fn num_inputs(&self) -> usize {
        0
    }
    fn input_source(&self, _: usize) -> Option<TensorSource> {
        None
    }
    fn output_shape(&self, _: usize) -> Vec<i64> {
        vec![64]
    }
    fn input_region(&self, pc: &ParallelConfig, _: usize, shard: usize) -> Region {
        pc.shard_region(&[64], shard)
    }
    fn output_region(&self, pc: &ParallelConfig, _: usize, shard: usize) -> Region {
        pc.shard_region(&[64], shard)
    }
    fn measure_cost(&self, _pc: &ParallelConfig) -> Option<CostMetrics> {
        self.calls.set(self.calls.get() + 1);
        Some(CostMetrics {
            forward_time: 1.0,
            backward_time: 1.0,
            memory_requirement: 128,
        })
    }
}

#[test]
fn test_measurement_cache_consistency_across_runs() {
    let calls = Rc::new(Cell::new(0));
    let mut graph = ModelGraph::new(ComputeProfile::default());
    graph.add(Box::new(CountingOp {
        id: 0,
        calls: Rc::clone(&calls),
    }));
    let placement = Placement::data_parallel(&graph, 2);

    let mut sim = Simulator::new(single_node(2, 100e9, 16 << 30));
    let first = sim.simulate(&graph, &placement, CompMode::Training);
    let second = sim.simulate(&graph, &placement, CompMode::Training);

    // Phase 1 and the memory accountant both consult the cache, yet the
    // operator is measured exactly once for the configuration.
    assert_eq!(calls.get(), 1);
    assert_eq!(first.makespan.to_bits(), second.makespan.to_bits());
}
