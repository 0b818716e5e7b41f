//! Weight-synchronization modes: overlapped, bulk-synchronous, and
//! blocking collectives.

mod common;

use common::*;
use shardsim_core::simulator::{CompMode, Simulator, SyncMode};
use shardsim_model::{ComputeProfile, ModelGraph, Placement};

/// One data-parallel layer with a replicated weight of `volume` elements.
fn replicated_layer(volume: i64) -> (ModelGraph, Placement) {
    let op = StubOp::new(0, "layer", &[64, 8], 1.0, 2.0)
        .with_weight(WeightStyle::Replicated(vec![volume]));
    let graph = stub_graph(vec![op]);
    let mut placement = Placement::new();
    placement.insert(0, pc_shards(vec![1, 2], vec![0, 1]));
    (graph, placement)
}

#[test]
fn test_bsp_sync_chain_timing() {
    // Forward 1s, backward 2s on both devices; then the replica's gradient
    // crosses to the update device and the fresh weight crosses back:
    // makespan = 3 + 2 * (volume * 4 / bandwidth).
    let (graph, placement) = replicated_layer(100);
    let mut sim = Simulator::new(single_node(2, 4e9, 16 << 30));
    sim.set_sync_mode(SyncMode::BulkSynchronous);
    let report = sim.simulate(&graph, &placement, CompMode::Training);

    let c = 100.0 * 4.0 / 4e9;
    assert!((report.makespan - (3.0 + 2.0 * c)).abs() < 1e-12);
    assert_eq!(report.comm_tasks, 2);
}

#[test]
fn test_overlap_equals_bsp_for_single_layer() {
    // One layer offers nothing to overlap: both overlays produce the same
    // critical path.
    let (graph, placement) = replicated_layer(100);
    let mut sim = Simulator::new(single_node(2, 4e9, 16 << 30));

    sim.set_sync_mode(SyncMode::Overlap);
    let overlap = sim.simulate(&graph, &placement, CompMode::Training);
    sim.set_sync_mode(SyncMode::BulkSynchronous);
    let bsp = sim.simulate(&graph, &placement, CompMode::Training);

    assert_eq!(overlap.makespan, bsp.makespan);
}

#[test]
fn test_overlap_beats_bsp_with_two_layers() {
    // Layer 2's update traffic can ride alongside layer 1's backward in
    // overlap mode; BSP serializes everything behind the barrier.
    let a = StubOp::new(0, "l1", &[64, 8], 1.0, 1.0)
        .with_weight(WeightStyle::Replicated(vec![100]));
    let b = StubOp::new(1, "l2", &[64, 8], 1.0, 1.0)
        .feeding_from(0)
        .with_input_style(InputStyle::Aligned)
        .with_weight(WeightStyle::Replicated(vec![100]));
    let graph = stub_graph(vec![a, b]);
    let mut placement = Placement::new();
    placement.insert(0, pc_shards(vec![1, 2], vec![0, 1]));
    placement.insert(1, pc_shards(vec![1, 2], vec![0, 1]));

    let mut sim = Simulator::new(single_node(2, 4e9, 16 << 30));
    sim.set_sync_mode(SyncMode::Overlap);
    let overlap = sim.simulate(&graph, &placement, CompMode::Training);
    sim.set_sync_mode(SyncMode::BulkSynchronous);
    let bsp = sim.simulate(&graph, &placement, CompMode::Training);

    assert!(
        overlap.makespan < bsp.makespan,
        "overlap {} should beat bsp {}",
        overlap.makespan,
        bsp.makespan
    );
}

#[test]
fn test_overlap_never_worse_on_dense_model() {
    let mut graph = ModelGraph::new(ComputeProfile::a100());
    let fc1 = graph.dense("fc1", 128, 512, 512, None);
    let fc2 = graph.dense("fc2", 128, 512, 512, Some(fc1));
    let placement = Placement::data_parallel(&graph, 4);

    let mut sim = Simulator::new(single_node(4, 100e9, 16 << 30));
    sim.set_sync_mode(SyncMode::Overlap);
    let overlap = sim.simulate(&graph, &placement, CompMode::Training);
    sim.set_sync_mode(SyncMode::BulkSynchronous);
    let bsp = sim.simulate(&graph, &placement, CompMode::Training);

    assert!(overlap.makespan <= bsp.makespan);
}

#[test]
fn test_collectives_skip_the_overlay() {
    // No barriers or updates are built; only the four compute tasks run,
    // and the collective charge lands on top of the makespan.
    let (graph, placement) = replicated_layer(100);
    let mut sim = Simulator::new(single_node(2, 4e9, 16 << 30));
    sim.set_sync_mode(SyncMode::Collectives);
    let report = sim.simulate(&graph, &placement, CompMode::Training);

    assert_eq!(report.total_tasks, 4);
    assert_eq!(report.makespan, 3.0);
    let expected = 100.0 * 4.0 / 4e9;
    assert!((report.collective_time - expected).abs() < 1e-15);
    assert!((report.total_cost - (3.0 + expected)).abs() < 1e-12);
}

#[test]
fn test_collectives_use_inter_node_bandwidth() {
    let op = StubOp::new(0, "layer", &[64, 8], 1.0, 1.0)
        .with_weight(WeightStyle::Replicated(vec![1000]));
    let graph = stub_graph(vec![op]);
    let mut placement = Placement::new();
    placement.insert(0, pc_shards(vec![1, 2], vec![0, 1]));

    // Devices 0 and 1 sit on different nodes; the wire runs at 1 GB/s.
    let mut sim = Simulator::new(two_nodes(4e9, 1e9, 4e9));
    sim.set_sync_mode(SyncMode::Collectives);
    let report = sim.simulate(&graph, &placement, CompMode::Training);

    let expected = 1000.0 * 4.0 / 1e9;
    assert!((report.collective_time - expected).abs() < 1e-15);
}

#[test]
fn test_collectives_free_for_colocated_shards() {
    // Two replicas of the same weight on one device have nothing to move.
    let op = StubOp::new(0, "layer", &[64, 8], 1.0, 1.0)
        .with_weight(WeightStyle::Replicated(vec![1000]));
    let graph = stub_graph(vec![op]);
    let mut placement = Placement::new();
    placement.insert(0, pc_shards(vec![1, 2], vec![0, 0]));

    let mut sim = Simulator::new(single_node(2, 4e9, 16 << 30));
    sim.set_sync_mode(SyncMode::Collectives);
    let report = sim.simulate(&graph, &placement, CompMode::Training);

    assert_eq!(report.collective_time, 0.0);
}

#[test]
fn test_sharded_weights_need_no_sync() {
    // Disjoint weight slices form singleton classes in every mode: no sync
    // chains, no collective charge.
    let op = StubOp::new(0, "layer", &[64, 8], 1.0, 2.0)
        .with_weight(WeightStyle::Sharded(vec![1000]));
    let graph = stub_graph(vec![op]);
    let mut placement = Placement::new();
    placement.insert(0, pc_shards(vec![1, 2], vec![0, 1]));

    let mut sim = Simulator::new(single_node(2, 4e9, 16 << 30));
    for sync in [
        SyncMode::Overlap,
        SyncMode::BulkSynchronous,
        SyncMode::Collectives,
    ] {
        sim.set_sync_mode(sync);
        let report = sim.simulate(&graph, &placement, CompMode::Training);
        assert_eq!(report.comm_tasks, 0, "mode {:?}", sync);
        assert_eq!(report.makespan, 3.0, "mode {:?}", sync);
        assert_eq!(report.collective_time, 0.0, "mode {:?}", sync);
    }
}
