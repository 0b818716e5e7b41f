//! Batched fully-connected layer.
//!
//! The only built-in operator with a weight tensor, so it is the one that
//! exercises weight synchronization. Partitioning the output-feature axis
//! (factor 0) shards the weight disjointly; partitioning the batch axis
//! (factor 1) replicates it, producing multi-member sync classes.

use crate::cost::{ComputeProfile, CostMetrics, DataType};
use crate::operator::{OpId, Operator, TensorSource};
use crate::parallel::ParallelConfig;
use crate::region::{even_chunk, Region};

/// `y[b, o] = sum_i x[b, i] * w[i, o]` over a batch.
///
/// Output shape `[out_features, batch]`, weight shape `[out_features,
/// in_features]` (dimension 0 innermost).
pub struct DenseOp {
    pub(crate) id: OpId,
    pub(crate) name: String,
    pub batch: i64,
    pub in_features: i64,
    pub out_features: i64,
    pub(crate) input: Option<TensorSource>,
    pub(crate) profile: ComputeProfile,
    pub(crate) dtype: DataType,
}

impl DenseOp {
    fn batch_chunk(&self, pc: &ParallelConfig, shard: usize) -> (i64, i64) {
        let coords = pc.shard_coords(shard);
        even_chunk(self.batch, pc.factors[1], coords[1])
    }

    fn out_chunk(&self, pc: &ParallelConfig, shard: usize) -> (i64, i64) {
        let coords = pc.shard_coords(shard);
        even_chunk(self.out_features, pc.factors[0], coords[0])
    }
}

impl Operator for DenseOp {
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

    fn num_weights(&self) -> usize {
        1
    }

    fn output_shape(&self, _output_idx: usize) -> Vec<i64> {
        vec![self.out_features, self.batch]
    }

    fn input_region(&self, pc: &ParallelConfig, _input_idx: usize, shard: usize) -> Region {
        // Every shard reads the full feature extent of its batch slice,
        // regardless of how the output features are split.
        let (b_lo, b_hi) = self.batch_chunk(pc, shard);
        Region::new(vec![0, b_lo], vec![self.in_features, b_hi])
    }

    fn output_region(&self, pc: &ParallelConfig, _output_idx: usize, shard: usize) -> Region {
        pc.shard_region(&[self.out_features, self.batch], shard)
    }

    fn weight_region(&self, pc: &ParallelConfig, _weight_idx: usize, shard: usize) -> Region {
        // Sliced along output features, replicated across batch partitions:
        // shards sharing an output chunk hold identical weight regions.
        let (o_lo, o_hi) = self.out_chunk(pc, shard);
        Region::new(vec![o_lo, 0], vec![o_hi, self.in_features])
    }

    fn measure_cost(&self, pc: &ParallelConfig) -> Option<CostMetrics> {
        let b = self.batch as f64 / pc.factors[1] as f64;
        let o = self.out_features as f64 / pc.factors[0] as f64;
        let i = self.in_features as f64;
        let flops = 2.0 * b * i * o;
        let forward_time = flops / self.profile.flops_per_sec;
        let elem = self.dtype.size_bytes() as f64;
        let memory = (o * i + o * b + i * b) * elem;
        Some(CostMetrics {
            forward_time,
            // Grad wrt input plus grad wrt weight: two matmuls of the same size.
            backward_time: 2.0 * forward_time,
            memory_requirement: memory as u64,
        })
    }
}
