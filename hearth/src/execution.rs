//! The execution capability invoked by the orchestration loop.
//!
//! The engine hands a [`TaskExecutor`] the current state and a task id; the
//! executor produces an artifact and returns its workspace-relative path. The
//! executor may create subtasks as a side effect (through the event store),
//! which the engine picks up by reloading after the call.

use std::path::PathBuf;

use anyhow::{Context, Result};
use tracing::{info, instrument};

use crate::core::state::HearthState;
use crate::io::caller::Caller;
use crate::io::config::HearthConfig;
use crate::io::paths::HearthPaths;
use crate::io::prompt::PromptEngine;
use crate::io::results::store_result;

pub trait TaskExecutor {
    /// Execute `task_id` and return the path of its stored result.
    fn execute_task(&self, state: &HearthState, task_id: &str) -> Result<PathBuf>;

    /// Synthesize the results of `parent_id`'s children and return the path of
    /// the stored summary. The summary replaces the parent's own result.
    fn summarize(&self, state: &HearthState, parent_id: &str) -> Result<PathBuf>;
}

/// Executor that renders prompts, sends them to a model [`Caller`] and stores
/// the responses under `.hearth/results/`.
pub struct LlmExecutor<C: Caller> {
    caller: C,
    paths: HearthPaths,
    prompts: PromptEngine,
    preview_chars: usize,
}

impl<C: Caller> LlmExecutor<C> {
    pub fn new(caller: C, paths: HearthPaths, config: &HearthConfig) -> Self {
        Self {
            caller,
            paths,
            prompts: PromptEngine::new(),
            preview_chars: config.description_preview_chars,
        }
    }
}

impl<C: Caller> TaskExecutor for LlmExecutor<C> {
    #[instrument(skip_all, fields(task_id = %task_id))]
    fn execute_task(&self, state: &HearthState, task_id: &str) -> Result<PathBuf> {
        let prompt = self.prompts.render_task(state, task_id)?;
        if let Some(task) = state.task(task_id) {
            info!(
                title = %task.title,
                description = %preview(&task.description, self.preview_chars),
                "executing task"
            );
        }
        let response = self
            .caller
            .call(&prompt, &self.paths.root)
            .with_context(|| format!("execute task {task_id}"))?;
        store_result(&self.paths, task_id, &response)
    }

    #[instrument(skip_all, fields(parent_id = %parent_id))]
    fn summarize(&self, state: &HearthState, parent_id: &str) -> Result<PathBuf> {
        let prompt = self.prompts.render_summary(state, parent_id)?;
        info!("summarizing subtask results");
        let response = self
            .caller
            .call(&prompt, &self.paths.root)
            .with_context(|| format!("summarize task {parent_id}"))?;
        store_result(&self.paths, parent_id, &response)
    }
}

/// First `max_chars` characters of `text` on one line, with an ellipsis when cut.
pub fn preview(text: &str, max_chars: usize) -> String {
    let flat = text.split_whitespace().collect::<Vec<_>>().join(" ");
    if flat.chars().count() <= max_chars {
        return flat;
    }
    let mut cut: String = flat.chars().take(max_chars).collect();
    cut.push_str("...");
    cut
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::events::EventPayload;
    use crate::io::results::read_result;
    use crate::test_support::{EventLog, ScriptedCaller, created, created_under};

    fn state() -> HearthState {
        let mut log = EventLog::new();
        log.push(created("P", "Parent"));
        log.push(created_under("C", "Child", "P"));
        log.push(EventPayload::TaskExecuted {
            task_id: "C".to_string(),
            result_path: Some(PathBuf::from(".hearth/results/C.md")),
        });
        log.push(EventPayload::task_completed("C"));
        HearthState::replay(log.events())
    }

    #[test]
    fn execute_stores_response_and_returns_relative_path() {
        let temp = tempfile::tempdir().expect("tempdir");
        let paths = HearthPaths::new(temp.path());
        let caller = ScriptedCaller::new(vec![Ok("child result".to_string())]);
        let prompts = caller.prompts();
        let executor = LlmExecutor::new(caller, paths.clone(), &HearthConfig::default());

        let path = executor.execute_task(&state(), "C").expect("execute");
        assert_eq!(path, PathBuf::from(".hearth/results/C.md"));
        assert_eq!(
            read_result(&paths, "C").expect("read").as_deref(),
            Some("child result")
        );
        let sent = prompts.lock().expect("prompts");
        assert!(sent[0].contains("CURRENT TASK ID: C"));
    }

    #[test]
    fn summary_overwrites_parent_result() {
        let temp = tempfile::tempdir().expect("tempdir");
        let paths = HearthPaths::new(temp.path());
        let caller = ScriptedCaller::new(vec![
            Ok("parent draft".to_string()),
            Ok("parent summary".to_string()),
        ]);
        let prompts = caller.prompts();
        let executor = LlmExecutor::new(caller, paths.clone(), &HearthConfig::default());

        executor.execute_task(&state(), "P").expect("execute");
        let path = executor.summarize(&state(), "P").expect("summarize");
        assert_eq!(path, PathBuf::from(".hearth/results/P.md"));
        assert_eq!(
            read_result(&paths, "P").expect("read").as_deref(),
            Some("parent summary")
        );
        let sent = prompts.lock().expect("prompts");
        assert!(sent[1].contains("ORIGINAL TASK: Parent"));
        assert!(sent[1].contains(".hearth/results/C.md"));
    }

    #[test]
    fn caller_failure_is_an_error_and_stores_nothing() {
        let temp = tempfile::tempdir().expect("tempdir");
        let paths = HearthPaths::new(temp.path());
        let caller = ScriptedCaller::new(vec![Err("model unavailable".to_string())]);
        let executor = LlmExecutor::new(caller, paths.clone(), &HearthConfig::default());

        let err = executor.execute_task(&state(), "C").unwrap_err();
        assert!(format!("{err:#}").contains("model unavailable"));
        assert_eq!(read_result(&paths, "C").expect("read"), None);
    }

    #[test]
    fn preview_flattens_and_truncates() {
        assert_eq!(preview("a\n  b", 10), "a b");
        assert_eq!(preview("abcdef", 3), "abc...");
    }
}
