//! Builder errors. Contract violations (touching a released node and the
//! like) panic instead.

use super::{NodeId, OpKind};
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum GraphError {
    #[error("{op:?} takes {expected} children, got {got}")]
    ChildCount { op: OpKind, expected: usize, got: usize },
    #[error("Sum has {children} children but {coefs} coefficients")]
    CoefficientCount { children: usize, coefs: usize },
    #[error("Cannot append a child to {op:?} node {node:?}: operator is not associative")]
    NotAssociative { node: NodeId, op: OpKind },
    #[error("Appending {child:?} under {parent:?} would create a cycle")]
    WouldCreateCycle { parent: NodeId, child: NodeId },
    #[error("Cycle detected involving node {node:?}")]
    CycleDetected { node: NodeId },
}
