//! Shared fixtures for the integration suites: a scriptable operator and
//! small machine builders.
#![allow(dead_code)]

use shardsim_core::machine::{LinkBandwidths, MachineModel};
use shardsim_model::{
    ComputeProfile, CostMetrics, ModelGraph, OpId, Operator, ParallelConfig, Region, TensorSource,
};

/// How a [`StubOp`] shard's input footprint relates to its producer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputStyle {
    /// Every shard reads the producer's whole tensor.
    Full,
    /// Shard `j` reads exactly its own slice (no cross-shard traffic).
    Aligned,
    /// Shards read nothing (zero-volume footprints).
    Empty,
}

/// Weight layout of a [`StubOp`].
#[derive(Debug, Clone)]
pub enum WeightStyle {
    /// Every shard holds the full weight: one sync class of all shards.
    Replicated(Vec<i64>),
    /// Shard `j` holds slice `j` along dimension 0: singleton classes.
    Sharded(Vec<i64>),
}

/// Operator with fully scriptable costs, footprints, and weights.
pub struct StubOp {
    pub id: OpId,
    pub name: String,
    pub shape: Vec<i64>,
    pub input: Option<TensorSource>,
    pub input_style: InputStyle,
    pub weight: Option<WeightStyle>,
    pub forward_time: f64,
    pub backward_time: f64,
    pub memory: u64,
}

impl StubOp {
    pub fn new(id: OpId, name: &str, shape: &[i64], forward_time: f64, backward_time: f64) -> Self {
        Self {
            id,
            name: name.to_string(),
            shape: shape.to_vec(),
            input: None,
            input_style: InputStyle::Full,
            weight: None,
            forward_time,
            backward_time,
            memory: 0,
        }
    }

    pub fn feeding_from(mut self, producer: OpId) -> Self {
        self.input = Some(TensorSource {
            op: producer,
            output: 0,
        });
        self
    }

    pub fn with_input_style(mut self, style: InputStyle) -> Self {
        self.input_style = style;
        self
    }

    pub fn with_weight(mut self, weight: WeightStyle) -> Self {
        self.weight = Some(weight);
        self
    }

    pub fn with_memory(mut self, memory: u64) -> Self {
        self.memory = memory;
        self
    }
}

impl Operator for StubOp {
    fn id(&self) -> OpId {
        self.id
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn num_inputs(&self) -> usize {
        usize::from(self.input.is_some())
    }

    fn input_source(&self, _input_idx: usize) -> Option<TensorSource> {
        self.input
    }

    fn num_weights(&self) -> usize {
        usize::from(self.weight.is_some())
    }

    fn output_shape(&self, _output_idx: usize) -> Vec<i64> {
        self.shape.clone()
    }

    fn input_region(&self, pc: &ParallelConfig, _input_idx: usize, shard: usize) -> Region {
        match self.input_style {
            InputStyle::Full => Region::of_shape(&self.shape),
            InputStyle::Aligned => pc.shard_region(&self.shape, shard),
            InputStyle::Empty => Region::new(vec![0; self.shape.len()], vec![0; self.shape.len()]),
        }
    }

    fn output_region(&self, pc: &ParallelConfig, _output_idx: usize, shard: usize) -> Region {
        pc.shard_region(&self.shape, shard)
    }

    fn weight_region(&self, pc: &ParallelConfig, _weight_idx: usize, shard: usize) -> Region {
        match self.weight.as_ref().expect("stub has no weight") {
            WeightStyle::Replicated(shape) => Region::of_shape(shape),
            WeightStyle::Sharded(shape) => {
                let parts = pc.num_shards() as u32;
                let (lo, hi) = shardsim_model::even_chunk(shape[0], parts, shard as u32);
                let mut lo_v = vec![0; shape.len()];
                let mut hi_v = shape.clone();
                lo_v[0] = lo;
                hi_v[0] = hi;
                Region::new(lo_v, hi_v)
            }
        }
    }

    fn measure_cost(&self, _pc: &ParallelConfig) -> Option<CostMetrics> {
        Some(CostMetrics {
            forward_time: self.forward_time,
            backward_time: self.backward_time,
            memory_requirement: self.memory,
        })
    }
}

/// Graph over pre-built stub operators (ids must match their position).
pub fn stub_graph(ops: Vec<StubOp>) -> ModelGraph {
    let mut graph = ModelGraph::new(ComputeProfile::default());
    for op in ops {
        graph.add(Box::new(op));
    }
    graph
}

/// One shard on one device.
pub fn pc_single(rank: usize, device: u32) -> ParallelConfig {
    ParallelConfig {
        device_kind: shardsim_model::DeviceKind::Gpu,
        factors: vec![1; rank],
        devices: vec![device],
    }
}

/// Arbitrary factor/device assignment.
pub fn pc_shards(factors: Vec<u32>, devices: Vec<u32>) -> ParallelConfig {
    ParallelConfig {
        device_kind: shardsim_model::DeviceKind::Gpu,
        factors,
        devices,
    }
}

/// Single node of `gpus` accelerators with the given intra-node bandwidth.
pub fn single_node(gpus: u32, intra_bw: f64, capacity: u64) -> MachineModel {
    MachineModel::uniform(
        1,
        gpus,
        capacity,
        LinkBandwidths {
            intra_node: intra_bw,
            gpu_to_dram: 16e9,
            dram_to_gpu: 16e9,
            inter_node: 12.5e9,
        },
    )
}

/// Two single-GPU nodes with explicit upload/wire/download bandwidths.
pub fn two_nodes(gpu_to_dram: f64, inter_node: f64, dram_to_gpu: f64) -> MachineModel {
    MachineModel::uniform(
        2,
        1,
        16 << 30,
        LinkBandwidths {
            intra_node: 100e9,
            gpu_to_dram,
            dram_to_gpu,
            inter_node,
        },
    )
}
