//! Human-readable renderings of expressions.
pub mod trace;

pub use trace::{format_expr, format_trace, node_label};
