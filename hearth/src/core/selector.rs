//! Deterministic depth-first selection of the next task to execute.

use crate::core::state::HearthState;
use crate::core::types::{Task, TaskStatus};

pub const REASON_NEXT: &str = "depth-first-next";
pub const REASON_NONE: &str = "no eligible tasks";

/// Outcome of one scheduling pass, as recorded in `NextTaskSelected`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selection {
    pub task_id: Option<String>,
    pub reason: String,
}

pub fn select(state: &HearthState) -> Selection {
    match next_task(state) {
        Some(task) => Selection {
            task_id: Some(task.id.clone()),
            reason: REASON_NEXT.to_string(),
        },
        None => Selection {
            task_id: None,
            reason: REASON_NONE.to_string(),
        },
    }
}

/// Find the first eligible leaf via depth-first traversal of roots in creation order.
///
/// Nodes with children are never returned; they finish through their descendants.
/// Returns `None` when nothing is eligible (the forest is drained or blocked).
pub fn next_task(state: &HearthState) -> Option<&Task> {
    state
        .roots()
        .into_iter()
        .find_map(|root| first_eligible_leaf(state, root))
}

fn first_eligible_leaf<'a>(state: &'a HearthState, node: &'a Task) -> Option<&'a Task> {
    if !state.has_children(&node.id) {
        return is_eligible(state, node).then_some(node);
    }

    for child in state.children(&node.id) {
        if let Some(found) = first_eligible_leaf(state, child) {
            return Some(found);
        }
    }

    None
}

/// A leaf is eligible when it is `todo` and its dependency, if any, is completed.
pub fn is_eligible(state: &HearthState, task: &Task) -> bool {
    if task.status != TaskStatus::Todo {
        return false;
    }
    match task.depends_on.as_deref() {
        None => true,
        Some(dep) => state.task(dep).is_some_and(Task::is_completed),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::events::EventPayload;
    use crate::test_support::{EventLog, created, created_under, depends_on};

    fn next_id(log: &EventLog) -> Option<String> {
        let state = HearthState::replay(log.events());
        next_task(&state).map(|task| task.id.clone())
    }

    #[test]
    fn drains_subtree_before_next_sibling() {
        let mut log = EventLog::new();
        log.push(created("R", "root"));
        log.push(created_under("A", "a", "R"));
        log.push(created_under("B", "b", "R"));
        log.push(created_under("GA1", "ga1", "A"));
        log.push(created_under("GA2", "ga2", "A"));

        assert_eq!(next_id(&log).as_deref(), Some("GA1"));
        log.push(EventPayload::task_completed("GA1"));
        assert_eq!(next_id(&log).as_deref(), Some("GA2"));
        log.push(EventPayload::task_completed("GA2"));
        assert_eq!(next_id(&log).as_deref(), Some("B"));
        log.push(EventPayload::task_completed("B"));
        // A and R still todo, but they have children, so they are never selected.
        assert_eq!(next_id(&log), None);
    }

    #[test]
    fn roots_are_visited_in_creation_order() {
        let mut log = EventLog::new();
        log.push(created("zeta", "first"));
        log.push(created("alpha", "second"));

        assert_eq!(next_id(&log).as_deref(), Some("zeta"));
    }

    #[test]
    fn dependency_gates_eligibility() {
        let mut log = EventLog::new();
        log.push(depends_on(created("T2", "blocked"), "T1"));
        // T2 was created first but depends on a task created later; replay
        // tolerates the ordering so the gate is exercised in isolation.
        log.push(created("T1", "blocker"));

        assert_eq!(next_id(&log).as_deref(), Some("T1"));
        log.push(EventPayload::task_completed("T1"));
        assert_eq!(next_id(&log).as_deref(), Some("T2"));
    }

    #[test]
    fn in_progress_leaf_is_skipped() {
        let mut log = EventLog::new();
        log.push(created("T1", "one"));
        log.push(created("T2", "two"));
        log.push(EventPayload::TaskStarted {
            task_id: "T1".to_string(),
        });

        assert_eq!(next_id(&log).as_deref(), Some("T2"));
    }

    #[test]
    fn select_reports_reason() {
        let state = HearthState::new();
        let selection = select(&state);
        assert_eq!(selection.task_id, None);
        assert_eq!(selection.reason, REASON_NONE);
    }
}
