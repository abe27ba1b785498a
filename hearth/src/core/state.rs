//! Projection of the event log into the task forest.
//!
//! Reducers are pure: the same event sequence always produces the same
//! [`HearthState`]. Reducers never fail and never reach across tasks; cascade
//! completion is a controller concern (see [`crate::core::orchestration`]).

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::core::events::{Event, EventPayload};
use crate::core::types::{Task, TaskStatus};

/// Tasks keyed by id, plus a parent -> children adjacency index kept sorted
/// by `(created_at, id)` and the latest result file recorded per task.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HearthState {
    tasks: BTreeMap<String, Task>,
    children: BTreeMap<String, Vec<String>>,
    results: BTreeMap<String, PathBuf>,
}

impl HearthState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold `events` in log order starting from an empty state.
    pub fn replay(events: &[Event]) -> Self {
        let mut state = Self::new();
        for event in events {
            state.apply_mut(event);
        }
        state
    }

    pub fn apply_mut(&mut self, event: &Event) {
        match &event.payload {
            EventPayload::TaskCreated {
                task_id,
                title,
                description,
                parent_id,
                depends_on,
            } => {
                if self.tasks.contains_key(task_id) {
                    debug!(task_id = %task_id, "ignoring duplicate task_created");
                    return;
                }
                let task = Task {
                    id: task_id.clone(),
                    title: title.clone(),
                    description: description.clone(),
                    parent_id: parent_id.clone(),
                    depends_on: depends_on.clone(),
                    status: TaskStatus::Todo,
                    created_at: event.timestamp,
                    completed_at: None,
                };
                if let Some(parent_id) = parent_id {
                    self.index_child(parent_id, &task);
                }
                self.tasks.insert(task_id.clone(), task);
            }
            EventPayload::TaskStarted { task_id } => self.start(task_id),
            EventPayload::NextTaskSelected {
                task_id: Some(task_id),
                ..
            } => self.start(task_id),
            EventPayload::TaskCompleted { task_id } => {
                if let Some(task) = self.tasks.get_mut(task_id)
                    && task.status != TaskStatus::Completed
                {
                    task.status = TaskStatus::Completed;
                    task.completed_at = Some(event.timestamp);
                }
            }
            EventPayload::NextTaskSelected { task_id: None, .. }
            | EventPayload::ExecuteTasksRequested {}
            | EventPayload::SummaryRequested { .. } => {}
            // Task fields are untouched; the path is kept for prompt context.
            // A summary replaces the parent's own result. A missing path keeps
            // whatever was recorded before.
            EventPayload::TaskExecuted {
                task_id,
                result_path: path,
            }
            | EventPayload::SummaryGenerated {
                parent_task_id: task_id,
                summary_path: path,
            } => {
                if let Some(path) = path
                    && self.tasks.contains_key(task_id)
                {
                    self.results.insert(task_id.clone(), path.clone());
                }
            }
        }
    }

    fn start(&mut self, task_id: &str) {
        if let Some(task) = self.tasks.get_mut(task_id)
            && task.status == TaskStatus::Todo
        {
            task.status = TaskStatus::InProgress;
        }
    }

    fn index_child(&mut self, parent_id: &str, child: &Task) {
        let siblings = self.children.entry(parent_id.to_string()).or_default();
        let tasks = &self.tasks;
        let position = siblings
            .iter()
            .position(|id| {
                tasks
                    .get(id)
                    .is_some_and(|sibling| sibling.creation_key() > child.creation_key())
            })
            .unwrap_or(siblings.len());
        siblings.insert(position, child.id.clone());
    }

    pub fn task(&self, id: &str) -> Option<&Task> {
        self.tasks.get(id)
    }

    pub fn tasks(&self) -> &BTreeMap<String, Task> {
        &self.tasks
    }

    /// Workspace-relative result file last recorded for `id`.
    pub fn result_path(&self, id: &str) -> Option<&Path> {
        self.results.get(id).map(PathBuf::as_path)
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    /// Direct children of `parent_id` in creation order.
    pub fn children(&self, parent_id: &str) -> impl Iterator<Item = &Task> {
        self.children
            .get(parent_id)
            .into_iter()
            .flatten()
            .filter_map(|id| self.tasks.get(id))
    }

    pub fn has_children(&self, id: &str) -> bool {
        self.children.get(id).is_some_and(|ids| !ids.is_empty())
    }

    /// Children of `parent_id` that are not yet completed.
    pub fn open_children(&self, parent_id: &str) -> Vec<&Task> {
        self.children(parent_id)
            .filter(|child| !child.is_completed())
            .collect()
    }

    /// Tasks without a parent, in creation order.
    pub fn roots(&self) -> Vec<&Task> {
        let mut roots: Vec<&Task> = self
            .tasks
            .values()
            .filter(|task| task.parent_id.is_none())
            .collect();
        roots.sort_by(|a, b| a.creation_key().cmp(&b.creation_key()));
        roots
    }

    /// Ancestors of `id` from the immediate parent up to the root.
    pub fn ancestors(&self, id: &str) -> Vec<&Task> {
        let mut chain = Vec::new();
        let mut current = self.tasks.get(id);
        while let Some(parent_id) = current.and_then(|task| task.parent_id.as_deref()) {
            let Some(parent) = self.tasks.get(parent_id) else {
                break;
            };
            if chain.len() > self.tasks.len() {
                break;
            }
            chain.push(parent);
            current = Some(parent);
        }
        chain
    }

    /// Depth of `id` below its root (roots are at depth 0).
    pub fn depth(&self, id: &str) -> usize {
        self.ancestors(id).len()
    }
}
