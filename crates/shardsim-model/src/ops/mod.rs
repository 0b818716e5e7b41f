//! Built-in operators with analytic cost models.

pub mod concat;
pub mod dense;
pub mod elementwise;

pub use concat::ConcatOp;
pub use dense::DenseOp;
pub use elementwise::{Activation, ElementwiseOp};

/// Names of the built-in operator kinds, as accepted by model-spec files.
pub fn available_op_kinds() -> Vec<&'static str> {
    vec!["dense", "elementwise", "concat"]
}
