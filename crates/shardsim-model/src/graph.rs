//! The layer-ordered dataflow graph and per-operator placements.

use crate::cost::{ComputeProfile, DataType};
use crate::operator::{OpId, Operator, TensorSource};
use crate::ops::{Activation, ConcatOp, DenseOp, ElementwiseOp};
use crate::parallel::ParallelConfig;
use std::collections::HashMap;

/// A model as the simulator sees it: operators in layer order, each holding
/// its input wiring, plus the transfer element type and the compute profile
/// the built-in cost models are parameterized on.
pub struct ModelGraph {
    operators: Vec<Box<dyn Operator>>,
    profile: ComputeProfile,
    transfer_dtype: DataType,
}

impl ModelGraph {
    pub fn new(profile: ComputeProfile) -> Self {
        Self {
            operators: Vec::new(),
            profile,
            transfer_dtype: DataType::F32,
        }
    }

    /// Register an already-constructed operator. Most callers use the typed
    /// builder methods below instead.
    pub fn add(&mut self, op: Box<dyn Operator>) -> OpId {
        let id = self.operators.len() as OpId;
        debug_assert_eq!(op.id(), id, "operator id must match registration order");
        self.operators.push(op);
        id
    }

    fn next_id(&self) -> OpId {
        self.operators.len() as OpId
    }

    /// Append a dense layer. `input = None` reads an external source.
    pub fn dense(
        &mut self,
        name: &str,
        batch: i64,
        in_features: i64,
        out_features: i64,
        input: Option<OpId>,
    ) -> OpId {
        let id = self.next_id();
        self.operators.push(Box::new(DenseOp {
            id,
            name: name.to_string(),
            batch,
            in_features,
            out_features,
            input: input.map(|op| TensorSource { op, output: 0 }),
            profile: self.profile,
            dtype: self.transfer_dtype,
        }));
        id
    }

    /// Append an elementwise activation over the producer's output shape.
    pub fn elementwise(&mut self, name: &str, activation: Activation, input: OpId) -> OpId {
        let id = self.next_id();
        let shape = self.op(input).output_shape(0);
        self.operators.push(Box::new(ElementwiseOp {
            id,
            name: name.to_string(),
            activation,
            shape,
            input: Some(TensorSource { op: input, output: 0 }),
            profile: self.profile,
            dtype: self.transfer_dtype,
        }));
        id
    }

    /// Append a feature-axis concatenation of two rank-2 producers.
    pub fn concat(&mut self, name: &str, a: OpId, b: OpId) -> OpId {
        let id = self.next_id();
        let sa = self.op(a).output_shape(0);
        let sb = self.op(b).output_shape(0);
        assert_eq!(sa.len(), 2, "concat expects rank-2 inputs");
        assert_eq!(sb.len(), 2, "concat expects rank-2 inputs");
        assert_eq!(sa[1], sb[1], "concat inputs must share a batch extent");
        self.operators.push(Box::new(ConcatOp {
            id,
            name: name.to_string(),
            batch: sa[1],
            input_features: [sa[0], sb[0]],
            inputs: [
                TensorSource { op: a, output: 0 },
                TensorSource { op: b, output: 0 },
            ],
            profile: self.profile,
            dtype: self.transfer_dtype,
        }));
        id
    }

    pub fn op(&self, id: OpId) -> &dyn Operator {
        self.operators[id as usize].as_ref()
    }

    /// Operators in layer order.
    pub fn operators(&self) -> impl Iterator<Item = &dyn Operator> {
        self.operators.iter().map(|b| b.as_ref())
    }

    pub fn len(&self) -> usize {
        self.operators.len()
    }

    pub fn is_empty(&self) -> bool {
        self.operators.is_empty()
    }

    pub fn find(&self, name: &str) -> Option<OpId> {
        self.operators
            .iter()
            .position(|op| op.name() == name)
            .map(|i| i as OpId)
    }

    pub fn profile(&self) -> ComputeProfile {
        self.profile
    }

    pub fn transfer_dtype(&self) -> DataType {
        self.transfer_dtype
    }

    pub fn set_transfer_dtype(&mut self, dtype: DataType) {
        self.transfer_dtype = dtype;
    }
}

/// The strategy under evaluation: one [`ParallelConfig`] per operator.
#[derive(Debug, Clone, Default)]
pub struct Placement {
    configs: HashMap<OpId, ParallelConfig>,
}

impl Placement {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, op: OpId, pc: ParallelConfig) {
        self.configs.insert(op, pc);
    }

    /// Config for `op`.
    ///
    /// # Panics
    ///
    /// Panics when the placement does not cover the operator — an incomplete
    /// strategy is a configuration error, not a runtime condition.
    pub fn config(&self, op: OpId) -> &ParallelConfig {
        self.configs
            .get(&op)
            .unwrap_or_else(|| panic!("placement has no parallel config for operator {op}"))
    }

    /// The baseline strategy: every operator batch-split across `[0..n)`.
    pub fn data_parallel(graph: &ModelGraph, num_devices: u32) -> Self {
        let mut placement = Self::new();
        for op in graph.operators() {
            let rank = op.output_shape(0).len();
            placement.insert(op.id(), ParallelConfig::data_parallel(rank, num_devices));
        }
        placement
    }
}
