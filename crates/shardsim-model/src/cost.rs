//! Operator cost metrics and element types.

use serde::{Deserialize, Serialize};

/// Measured cost of one shard of one operator under one parallel config.
#[derive(Debug, Default, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CostMetrics {
    /// Forward-pass time in seconds.
    pub forward_time: f64,
    /// Backward-pass time in seconds.
    pub backward_time: f64,
    /// Resident memory for the shard in bytes (weights + activations).
    pub memory_requirement: u64,
}

/// Element type of tensors flowing between operators.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DataType {
    #[default]
    F32,
    F64,
    I32,
    I64,
    Bool,
}

impl DataType {
    /// Size of one element in bytes.
    pub fn size_bytes(&self) -> u64 {
        match self {
            DataType::F32 | DataType::I32 => 4,
            DataType::F64 | DataType::I64 => 8,
            DataType::Bool => 1,
        }
    }
}

/// Throughput characteristics of one accelerator, used by the built-in
/// operators' analytic cost models.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ComputeProfile {
    /// Peak dense-math throughput in FLOP/s.
    pub flops_per_sec: f64,
    /// Device memory bandwidth in bytes/s.
    pub mem_bandwidth: f64,
}

impl ComputeProfile {
    /// NVIDIA A100 SXM 80GB (312 TFLOP/s fp16, 2.0 TB/s HBM2e).
    pub fn a100() -> Self {
        Self {
            flops_per_sec: 312e12,
            mem_bandwidth: 2.0e12,
        }
    }

    /// NVIDIA H100 SXM (989 TFLOP/s fp16, 3.35 TB/s HBM3).
    pub fn h100() -> Self {
        Self {
            flops_per_sec: 989e12,
            mem_bandwidth: 3.35e12,
        }
    }
}

impl Default for ComputeProfile {
    fn default() -> Self {
        Self::a100()
    }
}
