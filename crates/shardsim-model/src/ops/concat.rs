//! Two-input concatenation along the feature axis.
//!
//! Concat is the built-in operator whose consumer/producer intersections are
//! genuinely partial: a shard of the concatenated output usually touches
//! only a window of one input, so it exercises the region arithmetic the
//! data-transfer phase is built on.

use crate::cost::{ComputeProfile, CostMetrics, DataType};
use crate::operator::{OpId, Operator, TensorSource};
use crate::parallel::ParallelConfig;
use crate::region::Region;

/// `y = concat(a, b)` along dimension 0, batched along the final dimension.
pub struct ConcatOp {
    pub(crate) id: OpId,
    pub(crate) name: String,
    pub batch: i64,
    /// Feature extents of the two inputs, in order.
    pub input_features: [i64; 2],
    pub(crate) inputs: [TensorSource; 2],
    pub(crate) profile: ComputeProfile,
    pub(crate) dtype: DataType,
}

impl ConcatOp {
    fn total_features(&self) -> i64 {
        self.input_features[0] + self.input_features[1]
    }

    /// Offset of input `i` inside the concatenated feature axis.
    fn input_offset(&self, i: usize) -> i64 {
        if i == 0 {
            0
        } else {
            self.input_features[0]
        }
    }
}

impl Operator for ConcatOp {
    fn id(&self) -> OpId {
        self.id
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn num_inputs(&self) -> usize {
        2
    }

    fn input_source(&self, input_idx: usize) -> Option<TensorSource> {
        Some(self.inputs[input_idx])
    }

    fn output_shape(&self, _output_idx: usize) -> Vec<i64> {
        vec![self.total_features(), self.batch]
    }

    fn input_region(&self, pc: &ParallelConfig, input_idx: usize, shard: usize) -> Region {
        let own = pc.shard_region(&[self.total_features(), self.batch], shard);
        let offset = self.input_offset(input_idx);
        let span = Region::new(
            vec![offset, 0],
            vec![offset + self.input_features[input_idx], self.batch],
        );
        // Clip the shard's output window to this input's span, then shift it
        // into the producer's coordinates.
        own.intersection(&span).translated(0, -offset)
    }

    fn output_region(&self, pc: &ParallelConfig, _output_idx: usize, shard: usize) -> Region {
        pc.shard_region(&[self.total_features(), self.batch], shard)
    }

    fn measure_cost(&self, pc: &ParallelConfig) -> Option<CostMetrics> {
        let volume = (self.total_features() * self.batch) as f64 / pc.num_shards() as f64;
        let elem = self.dtype.size_bytes() as f64;
        let time = 2.0 * volume * elem / self.profile.mem_bandwidth;
        Some(CostMetrics {
            forward_time: time,
            backward_time: time,
            memory_requirement: (volume * elem) as u64,
        })
    }
}
