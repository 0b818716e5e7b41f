//! The operator contract consumed by the task-graph builder.
//!
//! Operators never compute tensors here. They answer three questions about a
//! candidate parallelization: which region of each tensor a shard touches,
//! what one shard costs to run, and where each input tensor comes from. The
//! simulator is generic over this trait the same way the teacher engine is
//! generic over its plugged-in strategies.

use crate::cost::CostMetrics;
use crate::parallel::ParallelConfig;
use crate::region::Region;

/// Stable numeric operator identity, assigned at graph registration.
///
/// All registry and cache fingerprints build on this id, never on addresses,
/// so hashing is architecture-independent and caches survive relocation.
pub type OpId = u32;

/// Where an operator input comes from: a producer operator and the index of
/// the producer output that feeds it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TensorSource {
    pub op: OpId,
    pub output: usize,
}

/// One node of the dataflow graph.
pub trait Operator {
    fn id(&self) -> OpId;

    fn name(&self) -> &str;

    fn num_inputs(&self) -> usize;

    /// Producer of input `input_idx`, or `None` for an external source
    /// (model input, data loader) that the builder skips.
    fn input_source(&self, input_idx: usize) -> Option<TensorSource>;

    fn num_weights(&self) -> usize {
        0
    }

    /// Full logical shape of output `output_idx`.
    fn output_shape(&self, output_idx: usize) -> Vec<i64>;

    /// Region of input `input_idx` read by shard `shard` under `pc`, in the
    /// producer's output coordinates.
    fn input_region(&self, pc: &ParallelConfig, input_idx: usize, shard: usize) -> Region;

    /// Region of output `output_idx` written by shard `shard` under `pc`.
    fn output_region(&self, pc: &ParallelConfig, output_idx: usize, shard: usize) -> Region;

    /// Region of weight `weight_idx` held by shard `shard` under `pc`.
    ///
    /// Within one weight, any two shards' regions must be either identical
    /// or disjoint; the builder aborts on partial overlap.
    fn weight_region(&self, _pc: &ParallelConfig, _weight_idx: usize, _shard: usize) -> Region {
        panic!("operator '{}' has no weight tensors", self.name());
    }

    /// Cost of one shard under `pc`, or `None` if this operator cannot
    /// measure itself — which the simulator treats as fatal.
    fn measure_cost(&self, pc: &ParallelConfig) -> Option<CostMetrics>;
}
