//! Log-level invariants that JSON Schema cannot express.

use std::collections::HashMap;

use crate::core::events::{Event, EventPayload};
use crate::core::merge::{MergeKey, merge_key};
use crate::core::state::HearthState;
use crate::core::types::TaskStatus;
use crate::core::validator::validate_event;

/// Check an event log for semantic violations:
/// - every event would have been admitted at its position in the log
///   (unique ids, known parents and dependencies, no completion with open
///   children)
/// - no start or selection of a task that has already moved past `todo`
/// - no parent cycles in the projected forest
/// - no two events sharing a merge key `(kind, timestamp)`
pub fn validate_invariants(events: &[Event]) -> Vec<String> {
    let mut errors = Vec::new();
    let mut state = HearthState::new();
    let mut keys: HashMap<MergeKey, usize> = HashMap::new();

    for (index, event) in events.iter().enumerate() {
        if let Some(first) = keys.insert(merge_key(event), index) {
            errors.push(format!(
                "event {index}: {} at {} collides with event {first}",
                event.kind(),
                event.timestamp.to_rfc3339()
            ));
        }

        if let Err(rejection) = validate_event(&state, &event.payload) {
            errors.push(format!("event {index}: {rejection}"));
        } else if let Some(task_id) = regressing_start(&state, &event.payload) {
            errors.push(format!(
                "event {index}: {} for task '{task_id}' which is no longer todo",
                event.kind()
            ));
        }

        state.apply_mut(event);
    }

    for task in state.tasks().values() {
        if state.depth(&task.id) >= state.tasks().len() {
            errors.push(format!("task '{}' is its own ancestor", task.id));
        }
    }

    errors
}

fn regressing_start<'a>(state: &HearthState, payload: &'a EventPayload) -> Option<&'a str> {
    let task_id = match payload {
        EventPayload::TaskStarted { task_id }
        | EventPayload::NextTaskSelected {
            task_id: Some(task_id),
            ..
        } => task_id,
        _ => return None,
    };
    let task = state.task(task_id)?;
    (task.status != TaskStatus::Todo).then_some(task_id.as_str())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{EventLog, created, created_under};

    #[test]
    fn clean_log_has_no_errors() {
        let mut log = EventLog::new();
        log.push(created("P", "parent"));
        log.push(created_under("C", "child", "P"));
        log.push(EventPayload::task_completed("C"));
        log.push(EventPayload::task_completed("P"));

        assert!(validate_invariants(log.events()).is_empty());
    }

    #[test]
    fn reports_admission_violations() {
        let mut log = EventLog::new();
        log.push(created("P", "parent"));
        log.push(created("P", "duplicate"));
        log.push(created_under("C", "child", "P"));
        log.push(created_under("X", "orphan", "missing"));
        log.push(EventPayload::task_completed("P"));

        let errors = validate_invariants(log.events());
        assert!(errors.iter().any(|err| err.contains("already exists")));
        assert!(errors.iter().any(|err| err.contains("parent 'missing'")));
        assert!(errors.iter().any(|err| err.contains("open subtasks: C")));
    }

    #[test]
    fn reports_status_regression_attempts() {
        let mut log = EventLog::new();
        log.push(created("T", "task"));
        log.push(EventPayload::task_completed("T"));
        log.push(EventPayload::TaskStarted {
            task_id: "T".to_string(),
        });

        let errors = validate_invariants(log.events());
        assert_eq!(errors.len(), 1);
        assert!(errors[0].contains("no longer todo"));
    }

    #[test]
    fn reports_merge_key_collisions() {
        let mut log = EventLog::new();
        log.push(created("A", "a"));
        let stamp = log.events()[0].timestamp;
        let mut events = log.events().to_vec();
        events.push(Event::new(EventPayload::task_created("B", "b"), stamp));

        let errors = validate_invariants(&events);
        assert!(errors.iter().any(|err| err.contains("collides with event 0")));
    }

    #[test]
    fn self_parent_is_rejected() {
        let mut log = EventLog::new();
        log.push(created_under("A", "a", "A"));

        let errors = validate_invariants(log.events());
        assert!(errors.iter().any(|err| err.contains("parent 'A'")));
        assert!(errors.iter().any(|err| err.contains("its own ancestor")));
    }
}
