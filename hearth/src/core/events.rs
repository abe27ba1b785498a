//! Domain events. The event log is the only durable state; everything else is
//! projected from it.
//!
//! On disk every event is a flat JSON object: a `type` discriminator, the
//! kind-specific fields and a `timestamp`.

use std::fmt;
use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// An immutable, timestamped fact.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Event {
    #[serde(flatten)]
    pub payload: EventPayload,
    pub timestamp: DateTime<Utc>,
}

impl Event {
    pub fn new(payload: EventPayload, timestamp: DateTime<Utc>) -> Self {
        Self { payload, timestamp }
    }

    pub fn kind(&self) -> EventKind {
        self.payload.kind()
    }
}

/// Kind-specific event data.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EventPayload {
    TaskCreated {
        task_id: String,
        title: String,
        #[serde(default)]
        description: String,
        #[serde(default)]
        parent_id: Option<String>,
        #[serde(default)]
        depends_on: Option<String>,
    },
    TaskStarted {
        task_id: String,
    },
    TaskCompleted {
        task_id: String,
    },
    ExecuteTasksRequested {},
    /// `task_id: None` means the scheduler found nothing eligible and the loop halts.
    NextTaskSelected {
        task_id: Option<String>,
        reason: String,
    },
    TaskExecuted {
        task_id: String,
        /// Workspace-relative artifact path; `None` when execution failed.
        result_path: Option<PathBuf>,
    },
    SummaryRequested {
        parent_task_id: String,
    },
    SummaryGenerated {
        parent_task_id: String,
        summary_path: Option<PathBuf>,
    },
}

impl EventPayload {
    pub fn kind(&self) -> EventKind {
        match self {
            EventPayload::TaskCreated { .. } => EventKind::TaskCreated,
            EventPayload::TaskStarted { .. } => EventKind::TaskStarted,
            EventPayload::TaskCompleted { .. } => EventKind::TaskCompleted,
            EventPayload::ExecuteTasksRequested {} => EventKind::ExecuteTasksRequested,
            EventPayload::NextTaskSelected { .. } => EventKind::NextTaskSelected,
            EventPayload::TaskExecuted { .. } => EventKind::TaskExecuted,
            EventPayload::SummaryRequested { .. } => EventKind::SummaryRequested,
            EventPayload::SummaryGenerated { .. } => EventKind::SummaryGenerated,
        }
    }

    /// The task this event is about, if any.
    pub fn task_id(&self) -> Option<&str> {
        match self {
            EventPayload::TaskCreated { task_id, .. }
            | EventPayload::TaskStarted { task_id }
            | EventPayload::TaskCompleted { task_id }
            | EventPayload::TaskExecuted { task_id, .. } => Some(task_id),
            EventPayload::NextTaskSelected { task_id, .. } => task_id.as_deref(),
            EventPayload::SummaryRequested { parent_task_id }
            | EventPayload::SummaryGenerated { parent_task_id, .. } => Some(parent_task_id),
            EventPayload::ExecuteTasksRequested {} => None,
        }
    }

    pub fn task_created(task_id: impl Into<String>, title: impl Into<String>) -> Self {
        EventPayload::TaskCreated {
            task_id: task_id.into(),
            title: title.into(),
            description: String::new(),
            parent_id: None,
            depends_on: None,
        }
    }

    pub fn task_completed(task_id: impl Into<String>) -> Self {
        EventPayload::TaskCompleted {
            task_id: task_id.into(),
        }
    }
}

/// Event discriminator, matching the `type` field on disk.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum EventKind {
    TaskCreated,
    TaskStarted,
    TaskCompleted,
    ExecuteTasksRequested,
    NextTaskSelected,
    TaskExecuted,
    SummaryRequested,
    SummaryGenerated,
}

impl EventKind {
    pub fn as_str(self) -> &'static str {
        match self {
            EventKind::TaskCreated => "task_created",
            EventKind::TaskStarted => "task_started",
            EventKind::TaskCompleted => "task_completed",
            EventKind::ExecuteTasksRequested => "execute_tasks_requested",
            EventKind::NextTaskSelected => "next_task_selected",
            EventKind::TaskExecuted => "task_executed",
            EventKind::SummaryRequested => "summary_requested",
            EventKind::SummaryGenerated => "summary_generated",
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
