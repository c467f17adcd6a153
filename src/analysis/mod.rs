//! Whole-expression analyses built on the iterator and the operator handlers.
pub mod eval;
pub mod structure;
pub mod topology;

pub use eval::{evaluate, fold_constant};
pub use structure::{curvature, hash_expr, monotonicity};
pub use topology::{check_acyclic, to_digraph, to_dot, topological_order};
