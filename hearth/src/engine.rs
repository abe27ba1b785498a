//! The `Hearth` engine: the single mutation entry point plus read-only queries.
//!
//! Every call to [`Hearth::process`] runs to quiescence on the caller's stack:
//! the event is validated, persisted and projected, then the orchestration
//! table is consulted and each follow-up is materialized the same way, depth
//! first, until no follow-ups remain. Only one task is ever in flight.

use std::collections::BTreeMap;
use std::path::PathBuf;

use tracing::{debug, info, warn};

use crate::core::clock::{Clock, SystemClock};
use crate::core::events::{Event, EventPayload};
use crate::core::orchestration::{FollowUp, follow_ups};
use crate::core::selector;
use crate::core::state::HearthState;
use crate::core::types::Task;
use crate::core::validator::validate_event;
use crate::error::HearthError;
use crate::execution::TaskExecutor;
use crate::io::event_store::{EventStore, FileEventStore};
use crate::io::paths::HearthPaths;

pub struct Hearth<S: EventStore> {
    store: S,
    executor: Option<Box<dyn TaskExecutor>>,
    clock: Box<dyn Clock>,
    events: Vec<Event>,
    state: HearthState,
}

impl Hearth<FileEventStore> {
    /// Open the event log of the workspace at `paths`.
    pub fn open_workspace(paths: &HearthPaths) -> Result<Self, HearthError> {
        Self::open(FileEventStore::new(&paths.events_path))
    }
}

impl<S: EventStore> Hearth<S> {
    /// Load and replay `store`. Fails if the log cannot be read or parsed; no
    /// partial state is ever built.
    pub fn open(store: S) -> Result<Self, HearthError> {
        let mut hearth = Self {
            store,
            executor: None,
            clock: Box::new(SystemClock::new()),
            events: Vec::new(),
            state: HearthState::new(),
        };
        hearth.reload()?;
        Ok(hearth)
    }

    pub fn with_executor(mut self, executor: impl TaskExecutor + 'static) -> Self {
        self.executor = Some(Box::new(executor));
        self
    }

    pub fn with_clock(mut self, clock: impl Clock + 'static) -> Self {
        self.clock = Box::new(clock);
        self
    }

    /// Re-read the store and rebuild state from scratch.
    pub fn reload(&mut self) -> Result<(), HearthError> {
        let events = self.store.get_all()?;
        self.state = HearthState::replay(&events);
        self.events = events;
        debug!(
            events = self.events.len(),
            tasks = self.state.tasks().len(),
            "replayed event log"
        );
        Ok(())
    }

    /// Stamp `payload` with the engine clock.
    pub fn emit(&self, payload: EventPayload) -> Event {
        Event::new(payload, self.clock.now())
    }

    /// Process one event and every follow-up it triggers.
    ///
    /// Returns the rejection of `payload` itself, or a store failure. A
    /// follow-up that is rejected is logged and dropped; the chain it would
    /// have started does not run.
    pub fn process(&mut self, payload: EventPayload) -> Result<(), HearthError> {
        self.reload()?;
        let mut stack = Vec::new();
        push_follow_ups(&mut stack, self.append(payload)?);

        while let Some(follow_up) = stack.pop() {
            let payload = self.materialize(follow_up)?;
            match self.append(payload) {
                Ok(next) => push_follow_ups(&mut stack, next),
                Err(HearthError::EventRejected(rejection)) => {
                    warn!(%rejection, "skipping rejected follow-up event");
                }
                Err(err) => return Err(err),
            }
        }
        Ok(())
    }

    /// Validate, persist and project one event, returning its follow-ups.
    ///
    /// Admission is checked against the state as of the last reload, outside
    /// the store lock. An event another process appends in between is not
    /// seen by the check; replay tolerates the resulting log.
    fn append(&mut self, payload: EventPayload) -> Result<Vec<FollowUp>, HearthError> {
        validate_event(&self.state, &payload)?;
        let event = self.emit(payload);
        self.store.add(&event)?;
        self.state.apply_mut(&event);
        debug!(kind = %event.kind(), task_id = ?event.payload.task_id(), "applied event");

        let previous = self.events.last().map(|prev| &prev.payload);
        let next = follow_ups(&self.state, &event.payload, previous);
        self.events.push(event);
        Ok(next)
    }

    fn materialize(&mut self, follow_up: FollowUp) -> Result<EventPayload, HearthError> {
        let payload = match follow_up {
            FollowUp::SelectNext => {
                let selection = selector::select(&self.state);
                match selection.task_id.as_deref().and_then(|id| self.state.task(id)) {
                    Some(task) => info!(task_id = %task.id, title = %task.title, "selected next task"),
                    None => info!(reason = %selection.reason, "no task selected"),
                }
                EventPayload::NextTaskSelected {
                    task_id: selection.task_id,
                    reason: selection.reason,
                }
            }
            FollowUp::Execute { task_id } => {
                let result_path = self.run_executor(&task_id, ExecutorCall::Task)?;
                info!(task_id = %task_id, result = ?result_path, "task executed");
                EventPayload::TaskExecuted {
                    task_id,
                    result_path,
                }
            }
            FollowUp::Complete { task_id } => {
                info!(task_id = %task_id, "completing task");
                EventPayload::TaskCompleted { task_id }
            }
            FollowUp::RequestSummary { parent_task_id } => {
                info!(parent_task_id = %parent_task_id, "all subtasks completed");
                EventPayload::SummaryRequested { parent_task_id }
            }
            FollowUp::GenerateSummary { parent_task_id } => {
                let summary_path = self.run_executor(&parent_task_id, ExecutorCall::Summary)?;
                info!(parent_task_id = %parent_task_id, summary = ?summary_path, "summary generated");
                EventPayload::SummaryGenerated {
                    parent_task_id,
                    summary_path,
                }
            }
        };
        Ok(payload)
    }

    /// Run the executor, then reload so side effects of the call (new
    /// subtasks) are visible. Executor failures become `None`.
    fn run_executor(
        &mut self,
        task_id: &str,
        call: ExecutorCall,
    ) -> Result<Option<PathBuf>, HearthError> {
        let Some(executor) = &self.executor else {
            return Ok(match call {
                ExecutorCall::Task => Some(HearthPaths::result_rel_path(task_id)),
                ExecutorCall::Summary => None,
            });
        };

        let outcome = match call {
            ExecutorCall::Task => executor.execute_task(&self.state, task_id),
            ExecutorCall::Summary => executor.summarize(&self.state, task_id),
        };
        let path = match outcome {
            Ok(path) => Some(path),
            Err(err) => {
                warn!(task_id, err = %format!("{err:#}"), "executor failed");
                None
            }
        };
        self.reload()?;
        Ok(path)
    }

    pub fn task(&self, id: &str) -> Option<&Task> {
        self.state.task(id)
    }

    pub fn tasks(&self) -> &BTreeMap<String, Task> {
        self.state.tasks()
    }

    /// Direct children of `parent_id` in creation order.
    pub fn child_tasks(&self, parent_id: &str) -> Vec<&Task> {
        self.state.children(parent_id).collect()
    }

    pub fn next_task(&self) -> Option<&Task> {
        selector::next_task(&self.state)
    }

    pub fn events(&self) -> &[Event] {
        &self.events
    }

    pub fn state(&self) -> &HearthState {
        &self.state
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Replace the whole log and replay it.
    pub fn replace_events(&mut self, events: &[Event]) -> Result<(), HearthError> {
        self.store.set_all(events)?;
        self.reload()
    }
}

#[derive(Debug, Clone, Copy)]
enum ExecutorCall {
    Task,
    Summary,
}

/// Push in reverse so the first follow-up is processed first.
fn push_follow_ups(stack: &mut Vec<FollowUp>, next: Vec<FollowUp>) {
    stack.extend(next.into_iter().rev());
}
