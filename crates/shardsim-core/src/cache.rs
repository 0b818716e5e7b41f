//! Memoization of operator cost measurements.
//!
//! The only state that survives across simulation runs. Keys are composite
//! values over the operator's stable id and the shape of its parallel
//! config, so equal placements hit the cache on every outer-search
//! iteration without re-invoking the operator.

use shardsim_model::{CostMetrics, DeviceKind, OpId, Operator, ParallelConfig};
use std::collections::HashMap;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct CostKey {
    op: OpId,
    device_kind: DeviceKind,
    factors: Vec<u32>,
}

/// Cache of `(operator, parallel-config) -> CostMetrics`.
#[derive(Debug, Default)]
pub struct CostCache {
    entries: HashMap<CostKey, CostMetrics>,
}

impl CostCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Cached metrics for `(op, pc)`, measuring on first use.
    ///
    /// # Panics
    ///
    /// Panics when the operator does not implement its measurement callback.
    pub fn get_or_measure(&mut self, op: &dyn Operator, pc: &ParallelConfig) -> CostMetrics {
        let key = CostKey {
            op: op.id(),
            device_kind: pc.device_kind,
            factors: pc.factors.clone(),
        };
        if let Some(metrics) = self.entries.get(&key) {
            return *metrics;
        }
        let metrics = op.measure_cost(pc).unwrap_or_else(|| {
            panic!(
                "measure_cost not implemented for operator '{}' (id {})",
                op.name(),
                op.id(),
            )
        });
        self.entries.insert(key, metrics);
        metrics
    }

    /// Number of distinct measurements stored.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
