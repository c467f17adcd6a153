//! Defines the expression DAG: node kinds, the columnar arena, and the
//! traversal context shared with iterators.
pub mod context;
pub mod dag;
pub mod error;
pub mod node;
pub mod storage;

// Re-export key types for convenient access
pub use context::{EpochCounter, IterContext, SlotLease, MAX_ACTIVE_ITERATORS};
pub use dag::ExprGraph;
pub use error::GraphError;
pub use node::{NodeKind, OpKind, VarId};
pub use storage::{IterSlot, NodeId, Registry};
