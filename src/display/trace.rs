use crate::graph::{ExprGraph, NodeId, NodeKind};
use crate::iter::{ExprIter, IterMode, Stage, StageSet};
use std::collections::HashMap;
use std::fmt::Write;

const WALK_STAGES: StageSet = StageSet::ENTER.union(StageSet::VISITING_CHILD).union(StageSet::LEAVE);

/// Short name of a single node: `x3` for variables, the number for
/// constants, the handler name (with exponent or coefficient) otherwise.
pub fn node_label(graph: &ExprGraph, id: NodeId) -> String {
    match graph.kind(id) {
        NodeKind::Var(var) => format!("x{}", var.0),
        NodeKind::Value(v) => format!("{}", v),
        NodeKind::Pow { exponent } => format!("pow({})", exponent),
        NodeKind::Product { coef } if *coef != 1.0 => format!("prod({})", coef),
        kind => graph.handlers().for_kind(kind).name().to_string(),
    }
}

/// Infix rendering of the expression below `root`, e.g.
/// `(2*x0 - x1 + 0.5)`. Shared subexpressions are written out at every use.
pub fn format_expr(graph: &mut ExprGraph, root: NodeId) -> String {
    let mut out = String::new();
    let mut it = ExprIter::new(graph);
    it.set_dfs_stop_stages(WALK_STAGES);
    let mut node = it.init(graph, Some(root), IterMode::Dfs, true);
    while let Some(id) = node {
        match it.stage() {
            Stage::Enter => write_open(&mut out, graph, id),
            Stage::VisitingChild => write_separator(&mut out, graph.kind(id), it.child_index(graph)),
            Stage::Leave => write_close(&mut out, graph, id),
            Stage::VisitedChild => {}
        }
        node = it.next(graph);
    }
    out
}

fn write_open(out: &mut String, graph: &ExprGraph, id: NodeId) {
    match graph.kind(id) {
        NodeKind::Var(var) => {
            let _ = write!(out, "x{}", var.0);
        }
        NodeKind::Value(v) if *v < 0.0 => {
            let _ = write!(out, "({})", v);
        }
        NodeKind::Value(v) => {
            let _ = write!(out, "{}", v);
        }
        NodeKind::Sum { .. } => out.push('('),
        NodeKind::Pow { .. } => {}
        NodeKind::Product { coef } => {
            out.push('(');
            if *coef != 1.0 {
                let _ = write!(out, "{}", coef);
                if graph.child_count(id) > 0 {
                    out.push('*');
                }
            }
        }
        kind => {
            let _ = write!(out, "{}(", graph.handlers().for_kind(kind).name());
        }
    }
}

fn write_separator(out: &mut String, kind: &NodeKind, index: usize) {
    match kind {
        NodeKind::Sum { coefs, .. } => {
            let c = coefs[index];
            if index == 0 {
                if c == -1.0 {
                    out.push('-');
                } else if c != 1.0 {
                    let _ = write!(out, "{}*", c);
                }
            } else {
                out.push_str(if c < 0.0 { " - " } else { " + " });
                if c.abs() != 1.0 {
                    let _ = write!(out, "{}*", c.abs());
                }
            }
        }
        NodeKind::Product { .. } if index > 0 => out.push('*'),
        _ => {}
    }
}

fn write_close(out: &mut String, graph: &ExprGraph, id: NodeId) {
    match graph.kind(id) {
        NodeKind::Var(_) | NodeKind::Value(_) => {}
        NodeKind::Sum { constant, .. } => {
            if graph.child_count(id) == 0 {
                let _ = write!(out, "{}", constant);
            } else if *constant != 0.0 {
                let sign = if *constant < 0.0 { '-' } else { '+' };
                let _ = write!(out, " {} {}", sign, constant.abs());
            }
            out.push(')');
        }
        NodeKind::Product { coef } => {
            if graph.child_count(id) == 0 && *coef == 1.0 {
                out.push('1');
            }
            out.push(')');
        }
        NodeKind::Pow { exponent } => {
            let _ = write!(out, "^{}", exponent);
        }
        _ => out.push(')'),
    }
}

/// Tree dump of the expression below `target` with every node's cached
/// value, activity and current-round propagated bounds. A node already
/// printed is shown as a reference to the level it first appeared at.
pub fn format_trace(graph: &mut ExprGraph, target: NodeId) -> String {
    let mut output = String::new();
    if !graph.is_alive(target) {
        let _ = writeln!(output, "Error: Invalid Node ID {:?}", target);
        return output;
    }
    let _ = writeln!(output, "AUDIT TRACE for node '{}':", node_label(graph, target));
    let _ = writeln!(output, "--------------------------------------------------");

    let mut visited_at_level: HashMap<NodeId, usize> = HashMap::new();
    let mut stems: Vec<String> = Vec::new();
    let mut prefix = String::new();

    let mut it = ExprIter::new(graph);
    it.set_dfs_stop_stages(WALK_STAGES);
    let mut node = it.init(graph, Some(target), IterMode::Dfs, true);
    while let Some(id) = node {
        match it.stage() {
            Stage::Enter => {
                let level = stems.len() + 1;
                stems.push(build_child_stem(&prefix));
                if let Some(&first_seen) = visited_at_level.get(&id) {
                    let _ = writeln!(output, "{}-> (Ref to L{})", prefix, first_seen);
                    node = it.skip(graph);
                    continue;
                }
                visited_at_level.insert(id, level);
                let _ = writeln!(output, "{}{}", prefix, line_header(graph, id, level));
            }
            Stage::VisitingChild => {
                let is_last_child = it.child_index(graph) + 1 == graph.child_count(id);
                let connector = if is_last_child { "`--" } else { "|--" };
                prefix = format!("{}{}", stems.last().map_or("", String::as_str), connector);
            }
            Stage::Leave => {
                stems.pop();
            }
            Stage::VisitedChild => {}
        }
        node = it.next(graph);
    }
    output
}

fn line_header(graph: &ExprGraph, id: NodeId, level: usize) -> String {
    let mut line = format!("[L{}] {}", level, node_label(graph, id));
    if let Some(v) = graph.value_of(id) {
        let _ = write!(line, "[{:.3}]", v);
    }
    let _ = write!(line, " act={}", graph.activity(id));
    if let Some(bounds) = graph.prop_bounds(id) {
        let _ = write!(line, " prop={}", bounds);
    }
    line
}

fn build_child_stem(current_prefix: &str) -> String {
    current_prefix.replace("`--", "   ").replace("|--", "|  ")
}
