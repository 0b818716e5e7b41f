//! Operator layer for ShardSim.
//!
//! This crate defines everything the simulator needs to know about a model
//! without ever computing a tensor: the [`Operator`] contract, axis-aligned
//! [`Region`] geometry, per-operator [`ParallelConfig`]s, and a library of
//! built-in operators with analytic cost models:
//!
//! | Operator | Weights | Exercises |
//! |----------|---------|-----------|
//! | [`DenseOp`] | 1 | weight-sync equivalence classes (replicated vs. sliced) |
//! | [`ElementwiseOp`] | 0 | shard-aligned producer/consumer footprints |
//! | [`ConcatOp`] | 0 | partial region intersections across inputs |
//!
//! Custom operators implement [`Operator`] and plug into a [`ModelGraph`]
//! exactly like the built-ins.

pub mod cost;
pub mod graph;
pub mod loader;
pub mod operator;
pub mod ops;
pub mod parallel;
pub mod region;

pub use cost::{ComputeProfile, CostMetrics, DataType};
pub use graph::{ModelGraph, Placement};
pub use loader::{load_model, load_strategy, model_from_str, strategy_from_str, SpecError};
pub use operator::{OpId, Operator, TensorSource};
pub use ops::{available_op_kinds, Activation, ConcatOp, DenseOp, ElementwiseOp};
pub use parallel::{DeviceKind, ParallelConfig};
pub use region::{even_chunk, Region};
