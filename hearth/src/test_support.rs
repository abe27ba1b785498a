//! Test-only helpers: event builders, a deterministic clock, scripted model
//! callers and executors, and throwaway workspaces.

use std::collections::{HashMap, HashSet, VecDeque};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};

use anyhow::{Result, anyhow};
use chrono::{DateTime, TimeDelta, Utc};

use crate::core::clock::Clock;
use crate::core::events::{Event, EventPayload};
use crate::core::state::HearthState;
use crate::engine::Hearth;
use crate::error::HearthError;
use crate::execution::TaskExecutor;
use crate::io::caller::Caller;
use crate::io::event_store::{EventStore, FileEventStore};
use crate::io::paths::HearthPaths;

/// `TaskCreated` for a root task with an empty description.
pub fn created(id: &str, title: &str) -> EventPayload {
    EventPayload::task_created(id, title)
}

/// `TaskCreated` for a child of `parent`.
pub fn created_under(id: &str, title: &str, parent: &str) -> EventPayload {
    with_task_fields(created(id, title), |_, parent_id, _| {
        *parent_id = Some(parent.to_string());
    })
}

/// Add a dependency to a `TaskCreated` payload.
pub fn depends_on(payload: EventPayload, dependency: &str) -> EventPayload {
    with_task_fields(payload, |_, _, depends_on| {
        *depends_on = Some(dependency.to_string());
    })
}

/// Set the description of a `TaskCreated` payload.
pub fn described(payload: EventPayload, text: &str) -> EventPayload {
    with_task_fields(payload, |description, _, _| {
        *description = text.to_string();
    })
}

fn with_task_fields(
    mut payload: EventPayload,
    edit: impl FnOnce(&mut String, &mut Option<String>, &mut Option<String>),
) -> EventPayload {
    if let EventPayload::TaskCreated {
        description,
        parent_id,
        depends_on,
        ..
    } = &mut payload
    {
        edit(description, parent_id, depends_on);
    }
    payload
}

/// Clock that starts at a fixed instant and advances by a fixed step per reading.
#[derive(Debug)]
pub struct FixedClock {
    next: Mutex<DateTime<Utc>>,
    step: TimeDelta,
}

impl Default for FixedClock {
    fn default() -> Self {
        Self::new()
    }
}

impl FixedClock {
    /// Starts at 2024-01-01T00:00:00Z and steps one second.
    pub fn new() -> Self {
        let start = DateTime::from_timestamp(1_704_067_200, 0).unwrap_or(DateTime::UNIX_EPOCH);
        Self::starting_at(start, TimeDelta::seconds(1))
    }

    pub fn starting_at(start: DateTime<Utc>, step: TimeDelta) -> Self {
        Self {
            next: Mutex::new(start),
            step,
        }
    }
}

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        let mut next = self.next.lock().unwrap_or_else(PoisonError::into_inner);
        let now = *next;
        *next = now + self.step;
        now
    }
}

/// An in-memory event sequence stamped by a [`FixedClock`], without validation.
#[derive(Debug, Default)]
pub struct EventLog {
    clock: FixedClock,
    events: Vec<Event>,
}

impl EventLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, payload: EventPayload) -> &Event {
        let index = self.events.len();
        self.events.push(Event::new(payload, self.clock.now()));
        &self.events[index]
    }

    pub fn events(&self) -> &[Event] {
        &self.events
    }
}

/// Caller returning canned responses in order and recording every prompt.
#[derive(Debug)]
pub struct ScriptedCaller {
    responses: Mutex<VecDeque<std::result::Result<String, String>>>,
    prompts: Arc<Mutex<Vec<String>>>,
}

impl ScriptedCaller {
    pub fn new(responses: Vec<std::result::Result<String, String>>) -> Self {
        Self {
            responses: Mutex::new(responses.into()),
            prompts: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Handle to the prompts received so far.
    pub fn prompts(&self) -> Arc<Mutex<Vec<String>>> {
        Arc::clone(&self.prompts)
    }
}

impl Caller for ScriptedCaller {
    fn call(&self, prompt: &str, _workdir: &Path) -> Result<String> {
        self.prompts
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(prompt.to_string());
        let next = self
            .responses
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .pop_front();
        match next {
            Some(Ok(response)) => Ok(response),
            Some(Err(message)) => Err(anyhow!(message)),
            None => Err(anyhow!("no scripted response left")),
        }
    }
}

/// Executor that records `execute <id>` / `summarize <id>` calls, optionally
/// creates subtasks or completes the task through the shared store while
/// "executing", and can be told to fail for specific tasks.
pub struct RecordingExecutor<S: EventStore> {
    store: Arc<S>,
    clock: Arc<FixedClock>,
    spawns: HashMap<String, Vec<String>>,
    completions: HashSet<String>,
    failures: HashSet<String>,
    calls: Arc<Mutex<Vec<String>>>,
}

impl<S: EventStore + 'static> RecordingExecutor<S> {
    pub fn new(store: Arc<S>, clock: Arc<FixedClock>) -> Self {
        Self {
            store,
            clock,
            spawns: HashMap::new(),
            completions: HashSet::new(),
            failures: HashSet::new(),
            calls: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Create `children` under `task_id` when it is executed.
    pub fn spawning(mut self, task_id: &str, children: &[&str]) -> Self {
        self.spawns.insert(
            task_id.to_string(),
            children.iter().map(|child| child.to_string()).collect(),
        );
        self
    }

    /// Complete `task_id` through the shared store while it is executed, the
    /// way a model calling `hearth complete` would.
    pub fn completing(mut self, task_id: &str) -> Self {
        self.completions.insert(task_id.to_string());
        self
    }

    /// Fail execution of `task_id`.
    pub fn failing(mut self, task_id: &str) -> Self {
        self.failures.insert(task_id.to_string());
        self
    }

    /// Handle to the calls recorded so far.
    pub fn calls(&self) -> Arc<Mutex<Vec<String>>> {
        Arc::clone(&self.calls)
    }

    fn record(&self, call: String) {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(call);
    }
}

impl<S: EventStore + 'static> TaskExecutor for RecordingExecutor<S> {
    fn execute_task(&self, _state: &HearthState, task_id: &str) -> Result<PathBuf> {
        self.record(format!("execute {task_id}"));
        if self.failures.contains(task_id) {
            return Err(anyhow!("scripted failure for {task_id}"));
        }
        let children = self.spawns.get(task_id);
        let completes = self.completions.contains(task_id);
        if children.is_some() || completes {
            let mut hearth =
                Hearth::open(Arc::clone(&self.store))?.with_clock(Arc::clone(&self.clock));
            for child in children.into_iter().flatten() {
                hearth.process(created_under(child, child, task_id))?;
            }
            if completes {
                hearth.process(EventPayload::task_completed(task_id))?;
            }
        }
        Ok(HearthPaths::result_rel_path(task_id))
    }

    fn summarize(&self, _state: &HearthState, parent_id: &str) -> Result<PathBuf> {
        self.record(format!("summarize {parent_id}"));
        Ok(HearthPaths::result_rel_path(parent_id))
    }
}

/// A temporary workspace directory with its `.hearth/` paths.
pub struct TestWorkspace {
    _dir: tempfile::TempDir,
    pub paths: HearthPaths,
}

impl TestWorkspace {
    pub fn new() -> Result<Self> {
        let dir = tempfile::tempdir()?;
        let paths = HearthPaths::new(dir.path());
        Ok(Self { _dir: dir, paths })
    }

    pub fn path(&self) -> &Path {
        &self.paths.root
    }

    pub fn store(&self) -> FileEventStore {
        FileEventStore::new(&self.paths.events_path)
    }

    pub fn open(&self) -> Result<Hearth<FileEventStore>, HearthError> {
        Hearth::open_workspace(&self.paths)
    }
}
