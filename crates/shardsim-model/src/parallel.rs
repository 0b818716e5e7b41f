//! Per-operator parallelization choices.
//!
//! A [`ParallelConfig`] is one candidate placement for one operator: how
//! many ways each tensor dimension is partitioned, and which compute device
//! each resulting shard is assigned to. The outer strategy search mutates
//! these; the simulator only reads them.

use crate::region::{even_chunk, Region};
use serde::{Deserialize, Serialize};

/// Kind of compute device a config targets.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeviceKind {
    #[default]
    Gpu,
    Cpu,
}

/// A candidate parallelization for one operator.
///
/// `factors[d]` is the partition count along tensor dimension `d` (dimension
/// 0 innermost, final dimension = batch). The product of all factors is the
/// shard count `P`; `devices` assigns one compute-device id to each of the
/// `P` shards.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ParallelConfig {
    pub device_kind: DeviceKind,
    pub factors: Vec<u32>,
    pub devices: Vec<u32>,
}

impl ParallelConfig {
    /// Pure data parallelism: only the batch dimension is split, shard `i`
    /// on device `i`.
    pub fn data_parallel(rank: usize, num_devices: u32) -> Self {
        assert!(rank >= 1, "data-parallel config needs at least one dimension");
        let mut factors = vec![1; rank];
        factors[rank - 1] = num_devices;
        Self {
            device_kind: DeviceKind::Gpu,
            factors,
            devices: (0..num_devices).collect(),
        }
    }

    /// Total number of shards (product of the partition factors).
    pub fn num_shards(&self) -> usize {
        self.factors.iter().product::<u32>() as usize
    }

    /// Number of partitioned dimensions.
    pub fn rank(&self) -> usize {
        self.factors.len()
    }

    /// True iff only the last dimension is partitioned and the device vector
    /// is the identity `[0..P)`.
    pub fn is_data_parallel(&self) -> bool {
        let k = self.factors.len();
        if self.factors[..k - 1].iter().any(|&f| f > 1) {
            return false;
        }
        self.devices
            .iter()
            .enumerate()
            .all(|(i, &d)| d == i as u32)
    }

    /// Per-dimension chunk index of shard `shard`, dimension 0 fastest.
    pub fn shard_coords(&self, shard: usize) -> Vec<u32> {
        debug_assert!(shard < self.num_shards());
        let mut rem = shard as u32;
        self.factors
            .iter()
            .map(|&f| {
                let c = rem % f;
                rem /= f;
                c
            })
            .collect()
    }

    /// The box of `shape` owned by shard `shard` when every dimension is
    /// chunked by its factor.
    pub fn shard_region(&self, shape: &[i64], shard: usize) -> Region {
        assert_eq!(
            shape.len(),
            self.factors.len(),
            "parallel config rank {} does not match tensor rank {}",
            self.factors.len(),
            shape.len(),
        );
        let coords = self.shard_coords(shard);
        let mut lo = Vec::with_capacity(shape.len());
        let mut hi = Vec::with_capacity(shape.len());
        for d in 0..shape.len() {
            let (l, h) = even_chunk(shape[d], self.factors[d], coords[d]);
            lo.push(l);
            hi.push(h);
        }
        Region::new(lo, hi)
    }
}
