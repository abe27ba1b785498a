//! Admission rules evaluated before an event is appended to the log.
//!
//! Reducers are tolerant so historical logs always replay; this module is the
//! strict gate for new events.

use thiserror::Error;

use crate::core::events::{EventKind, EventPayload};
use crate::core::state::HearthState;

/// Why an event was refused. The event is never appended and no state changes.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{kind} rejected for task '{task_id}': {reason}")]
pub struct Rejection {
    pub kind: EventKind,
    pub task_id: String,
    pub reason: String,
}

impl Rejection {
    fn new(kind: EventKind, task_id: &str, reason: impl Into<String>) -> Self {
        Self {
            kind,
            task_id: task_id.to_string(),
            reason: reason.into(),
        }
    }
}

/// Check `payload` against the current state.
pub fn validate_event(state: &HearthState, payload: &EventPayload) -> Result<(), Rejection> {
    let kind = payload.kind();
    match payload {
        EventPayload::TaskCompleted { task_id } => validate_completion(state, task_id),
        EventPayload::TaskCreated {
            task_id,
            parent_id,
            depends_on,
            ..
        } => {
            if task_id.trim().is_empty() {
                return Err(Rejection::new(kind, task_id, "task id must not be empty"));
            }
            if state.task(task_id).is_some() {
                return Err(Rejection::new(kind, task_id, "task id already exists"));
            }
            if let Some(parent_id) = parent_id
                && state.task(parent_id).is_none()
            {
                return Err(Rejection::new(
                    kind,
                    task_id,
                    format!("parent '{parent_id}' does not exist"),
                ));
            }
            if let Some(depends_on) = depends_on
                && state.task(depends_on).is_none()
            {
                return Err(Rejection::new(
                    kind,
                    task_id,
                    format!("dependency '{depends_on}' does not exist"),
                ));
            }
            Ok(())
        }
        EventPayload::TaskStarted { task_id }
        | EventPayload::TaskExecuted { task_id, .. }
        | EventPayload::NextTaskSelected {
            task_id: Some(task_id),
            ..
        }
        | EventPayload::SummaryRequested {
            parent_task_id: task_id,
        }
        | EventPayload::SummaryGenerated {
            parent_task_id: task_id,
            ..
        } => require_known(state, kind, task_id),
        EventPayload::NextTaskSelected { task_id: None, .. }
        | EventPayload::ExecuteTasksRequested {} => Ok(()),
    }
}

/// The completion guard: a task with any open child cannot be completed directly.
///
/// Completing an already completed task is admitted; the reducer keeps the
/// first completion time.
pub fn validate_completion(state: &HearthState, task_id: &str) -> Result<(), Rejection> {
    let kind = EventKind::TaskCompleted;
    if state.task(task_id).is_none() {
        return Err(Rejection::new(kind, task_id, "task does not exist"));
    }
    let open = state.open_children(task_id);
    if !open.is_empty() {
        let ids: Vec<&str> = open.iter().map(|child| child.id.as_str()).collect();
        return Err(Rejection::new(
            kind,
            task_id,
            format!("open subtasks: {}", ids.join(", ")),
        ));
    }
    Ok(())
}

fn require_known(state: &HearthState, kind: EventKind, task_id: &str) -> Result<(), Rejection> {
    if state.task(task_id).is_none() {
        return Err(Rejection::new(kind, task_id, "task does not exist"));
    }
    Ok(())
}
