//! Shape-preserving elementwise operators (activations).

use crate::cost::{ComputeProfile, CostMetrics, DataType};
use crate::operator::{OpId, Operator, TensorSource};
use crate::parallel::ParallelConfig;
use crate::region::Region;
use serde::{Deserialize, Serialize};

/// Which pointwise function the layer applies. Only affects the label; the
/// cost model is bandwidth-bound for all of them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Activation {
    Relu,
    Gelu,
    Tanh,
}

/// A pointwise map over a tensor; no weights, input and output footprints
/// coincide shard-by-shard.
pub struct ElementwiseOp {
    pub(crate) id: OpId,
    pub(crate) name: String,
    pub activation: Activation,
    pub shape: Vec<i64>,
    pub(crate) input: Option<TensorSource>,
    pub(crate) profile: ComputeProfile,
    pub(crate) dtype: DataType,
}

impl Operator for ElementwiseOp {
    fn id(&self) -> OpId {
        self.id
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn num_inputs(&self) -> usize {
        1
    }

    fn input_source(&self, input_idx: usize) -> Option<TensorSource> {
        debug_assert_eq!(input_idx, 0);
        self.input
    }

    fn output_shape(&self, _output_idx: usize) -> Vec<i64> {
        self.shape.clone()
    }

    fn input_region(&self, pc: &ParallelConfig, _input_idx: usize, shard: usize) -> Region {
        pc.shard_region(&self.shape, shard)
    }

    fn output_region(&self, pc: &ParallelConfig, _output_idx: usize, shard: usize) -> Region {
        pc.shard_region(&self.shape, shard)
    }

    fn measure_cost(&self, pc: &ParallelConfig) -> Option<CostMetrics> {
        let volume: i64 = self.shape.iter().product();
        let shard_elems = volume as f64 / pc.num_shards() as f64;
        let elem = self.dtype.size_bytes() as f64;
        // One read and one write per element, both passes.
        let time = 2.0 * shard_elems * elem / self.profile.mem_bandwidth;
        Some(CostMetrics {
            forward_time: time,
            backward_time: time,
            memory_requirement: (shard_elems * elem) as u64,
        })
    }
}
