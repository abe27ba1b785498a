//! Depth-first rendering of the task forest for `hearth list`.

use crate::core::state::HearthState;
use crate::core::types::{Task, TaskStatus};

pub fn status_icon(status: TaskStatus) -> &'static str {
    match status {
        TaskStatus::Todo => "○",
        TaskStatus::InProgress => "→",
        TaskStatus::Completed => "✓",
    }
}

/// One line per task in execution order, indented two spaces per level.
///
/// With a `filter`, only matching tasks are printed, but each keeps the
/// indentation of its full depth so the shape of the tree stays readable.
pub fn render_tree(state: &HearthState, filter: Option<TaskStatus>) -> Vec<String> {
    let mut lines = Vec::new();
    for root in state.roots() {
        render_node(state, root, 0, filter, &mut lines);
    }
    lines
}

fn render_node(
    state: &HearthState,
    task: &Task,
    depth: usize,
    filter: Option<TaskStatus>,
    lines: &mut Vec<String>,
) {
    if filter.is_none_or(|status| task.status == status) {
        lines.push(format!(
            "{}{} [{}] {}",
            "  ".repeat(depth),
            status_icon(task.status),
            task.id,
            task.title
        ));
    }
    for child in state.children(&task.id) {
        render_node(state, child, depth + 1, filter, lines);
    }
}
