//! End-to-end simulation scenarios.

mod common;

use common::*;
use shardsim_core::simulator::{CompMode, Simulator, SyncMode};
use shardsim_model::Placement;

#[test]
fn test_single_op_single_gpu_inference() {
    let graph = stub_graph(vec![StubOp::new(0, "op", &[64], 3.0, 0.0)]);
    let mut placement = Placement::new();
    placement.insert(0, pc_single(1, 0));

    let mut sim = Simulator::new(single_node(1, 100e9, 16 << 30));
    let report = sim.simulate(&graph, &placement, CompMode::Inference);

    assert_eq!(report.makespan, 3.0);
    assert_eq!(report.total_cost, 3.0);
    assert_eq!(report.memory_penalty, 0.0);
    assert_eq!(report.total_tasks, 1);
}

#[test]
fn test_two_ops_single_gpu_training_bsp() {
    // A (fwd 1, bwd 2) feeds B (fwd 3, bwd 4), both on device 0. The step is
    // the serial chain A.fwd, B.fwd, B.bwd, A.bwd.
    let a = StubOp::new(0, "a", &[64], 1.0, 2.0);
    let b = StubOp::new(1, "b", &[64], 3.0, 4.0).feeding_from(0);
    let graph = stub_graph(vec![a, b]);
    let mut placement = Placement::new();
    placement.insert(0, pc_single(1, 0));
    placement.insert(1, pc_single(1, 0));

    let mut sim = Simulator::new(single_node(1, 100e9, 16 << 30));
    sim.set_sync_mode(SyncMode::BulkSynchronous);
    let report = sim.simulate(&graph, &placement, CompMode::Training);

    assert_eq!(report.makespan, 10.0);
    assert_eq!(report.comm_tasks, 0);
}

#[test]
fn test_memory_penalty_is_smooth_excess() {
    // Capacity 1 GiB, requirement 1 GiB + 1 MiB: the makespan is untouched
    // and the cost gains excess_bytes * 1e-6.
    let graph = stub_graph(vec![
        StubOp::new(0, "big", &[64], 3.0, 0.0).with_memory((1 << 30) + (1 << 20))
    ]);
    let mut placement = Placement::new();
    placement.insert(0, pc_single(1, 0));

    let mut sim = Simulator::new(single_node(1, 100e9, 1 << 30));
    let report = sim.simulate(&graph, &placement, CompMode::Inference);

    assert_eq!(report.makespan, 3.0);
    assert!((report.memory_penalty - 1.048576).abs() < 1e-9);
    assert!((report.total_cost - (3.0 + 1.048576)).abs() < 1e-9);
    assert_eq!(report.device_memory[0], (1 << 30) + (1 << 20));
}

#[test]
fn test_inference_reduction_law() {
    // Inference creates exactly one task per shard: no backward, update, or
    // barrier tasks anywhere.
    let a = StubOp::new(0, "a", &[64, 8], 1.0, 2.0);
    let b = StubOp::new(1, "b", &[64, 8], 1.0, 2.0)
        .feeding_from(0)
        .with_input_style(InputStyle::Aligned)
        .with_weight(WeightStyle::Replicated(vec![64, 64]));
    let graph = stub_graph(vec![a, b]);
    let mut placement = Placement::new();
    placement.insert(0, pc_shards(vec![1, 2], vec![0, 1]));
    placement.insert(1, pc_shards(vec![1, 2], vec![0, 1]));

    let mut sim = Simulator::new(single_node(2, 100e9, 16 << 30));
    let report = sim.simulate(&graph, &placement, CompMode::Inference);

    assert_eq!(report.total_tasks, 4);
    assert_eq!(report.comm_tasks, 0);
}

#[test]
fn test_data_parallel_pure_law() {
    // A single weightless operator with no cross-device inputs costs exactly
    // forward (+ backward in training), whatever the shard count.
    let graph = stub_graph(vec![StubOp::new(0, "op", &[64, 8], 1.5, 2.5)]);
    let placement = Placement::data_parallel(&graph, 4);
    let mut sim = Simulator::new(single_node(4, 100e9, 16 << 30));

    let inference = sim.simulate(&graph, &placement, CompMode::Inference);
    assert_eq!(inference.makespan, 1.5);

    sim.set_sync_mode(SyncMode::BulkSynchronous);
    let training = sim.simulate(&graph, &placement, CompMode::Training);
    assert_eq!(training.makespan, 4.0);

    sim.set_sync_mode(SyncMode::Overlap);
    let training = sim.simulate(&graph, &placement, CompMode::Training);
    assert_eq!(training.makespan, 4.0);
}

#[test]
fn test_export_writes_dot_file() {
    let graph = stub_graph(vec![StubOp::new(0, "solo", &[8], 3.0, 0.0)]);
    let mut placement = Placement::new();
    placement.insert(0, pc_single(1, 0));

    let dir = std::env::temp_dir().join("shardsim_export_test");
    std::fs::create_dir_all(&dir).unwrap();
    let path = dir.join("step.dot");

    let mut sim = Simulator::new(single_node(1, 100e9, 16 << 30));
    let cost = sim
        .simulate_runtime_exported(&graph, &placement, CompMode::Inference, &path)
        .unwrap();
    assert_eq!(cost, 3.0);

    let dot = std::fs::read_to_string(&path).unwrap();
    assert!(dot.starts_with("digraph taskgraph {"));
    assert!(dot.contains("solo | Forward"));
    assert!(dot.contains("shape=record"));
    std::fs::remove_file(&path).unwrap();
}

#[test]
fn test_larger_shard_counts_schedule_completely() {
    // A wider sweep: 3 layers, 8 shards each, all-to-all transfers. The run
    // must schedule every allocated task (completeness is asserted inside
    // the scheduler) and report a positive makespan.
    let a = StubOp::new(0, "a", &[256, 16], 0.5, 1.0);
    let b = StubOp::new(1, "b", &[256, 16], 0.5, 1.0).feeding_from(0);
    let c = StubOp::new(2, "c", &[256, 16], 0.5, 1.0).feeding_from(1);
    let graph = stub_graph(vec![a, b, c]);
    let placement = Placement::data_parallel(&graph, 8);

    let mut sim = Simulator::new(single_node(8, 100e9, 16 << 30));
    sim.set_sync_mode(SyncMode::BulkSynchronous);
    let report = sim.simulate(&graph, &placement, CompMode::Training);

    assert!(report.makespan > 0.0);
    // 3 ops * 8 shards * (fwd + bwd) plus comm chains and sync structure.
    assert!(report.total_tasks > 48);
    assert!(report.comm_tasks > 0);
}
