//! Expression DAGs over real variables with interval bound propagation.
//!
//! Expressions are built in an [`ExprGraph`], an arena of reference-counted
//! nodes whose operator behaviour comes from an [`OperatorTable`] of
//! [`ExprHandler`]s. [`ExprIter`] walks a graph depth first, breadth first or
//! children-before-parents without recursion. [`Propagator`] computes node
//! activities bottom-up and pushes constraint bounds back down to the
//! variables.

pub mod analysis;
pub mod config;
pub mod display;
pub mod graph;
pub mod interval;
pub mod iter;
pub mod ops;
pub mod propagate;

pub use config::{ConfigError, PropagationConfig};
pub use graph::{ExprGraph, GraphError, NodeId, NodeKind, OpKind, VarId};
pub use interval::Interval;
pub use iter::{ExprIter, IterMode, Stage, StageSet};
pub use ops::{Curvature, ExprHandler, Feasibility, Monotonicity, OperatorTable};
pub use propagate::{
    BoundChange, BoundTable, Constraint, PropagationOutcome, PropagationStats, Propagator, VarBounds,
};
