//! Defines `NodeKind`, the operator tag plus node-local data of an expression
//! node, and the fieldless `OpKind` used to look up its handler.

use smallvec::SmallVec;
use std::hash::{Hash, Hasher};

/// Index of a variable in the external bound store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct VarId(pub u32);

impl VarId {
    #[inline(always)]
    pub fn index(&self) -> usize {
        self.0 as usize
    }
}

/// Operator tag without payload; indexes the `OperatorTable`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum OpKind {
    Var = 0,
    Value = 1,
    Sum = 2,
    Product = 3,
    Pow = 4,
    Exp = 5,
    Log = 6,
    Sin = 7,
    Cos = 8,
    Abs = 9,
    Entropy = 10,
}

impl OpKind {
    pub const ALL: [OpKind; 11] = [
        OpKind::Var,
        OpKind::Value,
        OpKind::Sum,
        OpKind::Product,
        OpKind::Pow,
        OpKind::Exp,
        OpKind::Log,
        OpKind::Sin,
        OpKind::Cos,
        OpKind::Abs,
        OpKind::Entropy,
    ];

    #[inline(always)]
    pub fn index(self) -> usize {
        self as usize
    }
}

/// The operator of a node together with its node-local data.
///
/// Children live in the registry, not here. The number of children is fixed
/// by the kind: none for leaves, one for unary functions and powers, any
/// number for sums and products (which may also grow after creation).
#[derive(Debug, Clone, PartialEq)]
pub enum NodeKind {
    Var(VarId),
    Value(f64),
    /// `constant + Σ coefs[i] · child[i]`; one coefficient per child.
    Sum { coefs: SmallVec<[f64; 4]>, constant: f64 },
    /// `coef · Π child[i]`.
    Product { coef: f64 },
    Pow { exponent: f64 },
    Exp,
    Log,
    Sin,
    Cos,
    Abs,
    /// `-x ln x`.
    Entropy,
}

impl NodeKind {
    pub fn op(&self) -> OpKind {
        match self {
            NodeKind::Var(_) => OpKind::Var,
            NodeKind::Value(_) => OpKind::Value,
            NodeKind::Sum { .. } => OpKind::Sum,
            NodeKind::Product { .. } => OpKind::Product,
            NodeKind::Pow { .. } => OpKind::Pow,
            NodeKind::Exp => OpKind::Exp,
            NodeKind::Log => OpKind::Log,
            NodeKind::Sin => OpKind::Sin,
            NodeKind::Cos => OpKind::Cos,
            NodeKind::Abs => OpKind::Abs,
            NodeKind::Entropy => OpKind::Entropy,
        }
    }

    /// Required child count, or `None` for variadic kinds.
    pub fn arity(&self) -> Option<usize> {
        match self {
            NodeKind::Var(_) | NodeKind::Value(_) => Some(0),
            NodeKind::Sum { .. } | NodeKind::Product { .. } => None,
            _ => Some(1),
        }
    }

    /// Associative kinds accept `append_child` after creation.
    pub fn is_associative(&self) -> bool {
        self.arity().is_none()
    }

    pub fn is_leaf(&self) -> bool {
        self.arity() == Some(0)
    }

    /// Feeds the node-local data into a hasher (floats by bit pattern).
    pub fn hash_data<H: Hasher>(&self, state: &mut H) {
        self.op().hash(state);
        match self {
            NodeKind::Var(var) => var.hash(state),
            NodeKind::Value(v) => v.to_bits().hash(state),
            NodeKind::Sum { constant, .. } => constant.to_bits().hash(state),
            NodeKind::Product { coef } => coef.to_bits().hash(state),
            NodeKind::Pow { exponent } => exponent.to_bits().hash(state),
            _ => {}
        }
    }
}
