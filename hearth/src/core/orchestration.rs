//! Event-chaining transition table for the orchestration loop.
//!
//! Given the state *after* an event was applied, decide which follow-up events
//! the engine must produce. The table is pure; materializing a follow-up
//! (running the scheduler, calling the executor) happens in [`crate::engine`].
//!
//! ```text
//! ExecuteTasksRequested -> NextTaskSelected
//! NextTaskSelected(id)  -> TaskExecuted(id)          (none: halt)
//! TaskExecuted(id)      -> NextTaskSelected          (id gained children)
//!                       -> TaskCompleted(id)         (otherwise)
//! TaskCompleted(id)     -> SummaryRequested(parent)  (all siblings completed)
//!                       -> NextTaskSelected          (previous entry was TaskExecuted(id))
//! SummaryRequested(p)   -> SummaryGenerated(p)
//! SummaryGenerated(p)   -> TaskCompleted(p)
//! ```

use crate::core::events::EventPayload;
use crate::core::state::HearthState;

/// A follow-up event the engine must materialize, in emission order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FollowUp {
    /// Run the scheduler and emit `NextTaskSelected`.
    SelectNext,
    /// Execute a task and emit `TaskExecuted`.
    Execute { task_id: String },
    /// Emit `TaskCompleted`.
    Complete { task_id: String },
    /// Emit `SummaryRequested`.
    RequestSummary { parent_task_id: String },
    /// Summarize a parent and emit `SummaryGenerated`.
    GenerateSummary { parent_task_id: String },
}

/// Follow-ups for `payload`, which has just been applied to `state`.
///
/// `previous` is the log entry immediately preceding `payload`; it is the
/// causality check that separates loop-driven completions from manual ones.
pub fn follow_ups(
    state: &HearthState,
    payload: &EventPayload,
    previous: Option<&EventPayload>,
) -> Vec<FollowUp> {
    match payload {
        EventPayload::ExecuteTasksRequested {} => vec![FollowUp::SelectNext],
        EventPayload::NextTaskSelected {
            task_id: Some(task_id),
            ..
        } => vec![FollowUp::Execute {
            task_id: task_id.clone(),
        }],
        EventPayload::NextTaskSelected { task_id: None, .. } => Vec::new(),
        EventPayload::TaskExecuted { task_id, .. } => {
            if state.has_children(task_id) {
                vec![FollowUp::SelectNext]
            } else {
                vec![FollowUp::Complete {
                    task_id: task_id.clone(),
                }]
            }
        }
        EventPayload::TaskCompleted { task_id } => {
            let mut next = Vec::new();
            if let Some(parent_id) = summary_ready_parent(state, task_id) {
                next.push(FollowUp::RequestSummary {
                    parent_task_id: parent_id.to_string(),
                });
            }
            if is_loop_completion(task_id, previous) {
                next.push(FollowUp::SelectNext);
            }
            next
        }
        EventPayload::SummaryRequested { parent_task_id } => vec![FollowUp::GenerateSummary {
            parent_task_id: parent_task_id.clone(),
        }],
        EventPayload::SummaryGenerated { parent_task_id, .. } => vec![FollowUp::Complete {
            task_id: parent_task_id.clone(),
        }],
        EventPayload::TaskCreated { .. } | EventPayload::TaskStarted { .. } => Vec::new(),
    }
}

/// The parent of `task_id`, if every one of its children is now completed and
/// the parent itself is still open.
fn summary_ready_parent<'a>(state: &'a HearthState, task_id: &str) -> Option<&'a str> {
    let parent_id = state.task(task_id)?.parent_id.as_deref()?;
    let parent = state.task(parent_id)?;
    if parent.is_completed() || !state.open_children(parent_id).is_empty() {
        return None;
    }
    Some(parent.id.as_str())
}

fn is_loop_completion(task_id: &str, previous: Option<&EventPayload>) -> bool {
    matches!(
        previous,
        Some(EventPayload::TaskExecuted { task_id: executed, .. }) if executed == task_id
    )
}
