//! Task-graph export.
//!
//! Renders the scheduled DAG as a Graphviz DOT file: one record-shaped node
//! per task labeled with its operator, kind, and `[start | end]` times, and
//! one edge per DAG edge. Everything is buffered in memory and flushed with
//! a single write at the end of the run.

use crate::arena::{TaskArena, TaskId};
use crate::scheduler::Timeline;
use shardsim_model::ModelGraph;
use std::fmt::Write as _;
use std::path::Path;

/// Render the arena's DAG with its scheduled spans into DOT text.
pub fn render_dot(arena: &TaskArena, timeline: &Timeline, graph: &ModelGraph) -> String {
    let mut out = String::new();
    out.push_str("digraph taskgraph {\n");
    for id in 0..arena.len() as TaskId {
        let task = arena.task(id);
        let span = timeline.spans[id as usize];
        let mut label = String::new();
        label.push('{');
        if let Some(op) = task.op {
            let _ = write!(label, "{} | ", graph.op(op).name());
        }
        let _ = write!(
            label,
            "{} | {{ {:.6} | {:.6} }}",
            task.kind.as_str(),
            span.start,
            span.end,
        );
        label.push('}');
        let _ = writeln!(out, "  t{id} [label=\"{label}\", shape=record];");
    }
    for id in 0..arena.len() as TaskId {
        for &succ in &arena.task(id).next {
            let _ = writeln!(out, "  t{id} -> t{succ};");
        }
    }
    out.push_str("}\n");
    out
}

/// Render and write the DOT file in one flush.
pub fn write_dot(
    path: &Path,
    arena: &TaskArena,
    timeline: &Timeline,
    graph: &ModelGraph,
) -> std::io::Result<()> {
    std::fs::write(path, render_dot(arena, timeline, graph))
}
