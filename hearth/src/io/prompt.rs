//! Prompt rendering for task execution and parent summaries.
//!
//! Context is assembled from the projected state: the root goal, the chain of
//! intermediate parents, and the result files of siblings or children that
//! already completed.

use anyhow::{Result, anyhow};
use minijinja::{Environment, context};
use serde::Serialize;

use crate::core::state::HearthState;
use crate::core::types::Task;

const TASK_TEMPLATE: &str = include_str!("prompts/task.md");
const SUMMARY_TEMPLATE: &str = include_str!("prompts/summary.md");
const INSTRUCTIONS_TEMPLATE: &str = include_str!("prompts/instructions.md");
const HELLO_PRESET: &str = include_str!("prompts/presets/hello.md");
const CODE_QUALITY_PRESET: &str = include_str!("prompts/presets/code_quality.md");

const NO_RESULT: &str = "(no result recorded)";

/// A canned root task for `hearth run --preset`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Preset {
    pub name: &'static str,
    pub title: &'static str,
    pub description: &'static str,
}

pub const PRESETS: [Preset; 2] = [
    Preset {
        name: "hello",
        title: "Hello World Test",
        description: HELLO_PRESET,
    },
    Preset {
        name: "code-quality",
        title: "Code Quality Analysis",
        description: CODE_QUALITY_PRESET,
    },
];

pub fn preset(name: &str) -> Option<Preset> {
    PRESETS.into_iter().find(|preset| preset.name == name)
}

#[derive(Debug, Serialize)]
struct TaskRef<'a> {
    id: &'a str,
    title: &'a str,
}

#[derive(Debug, Serialize)]
struct RootContext<'a> {
    title: &'a str,
    description: &'a str,
}

#[derive(Debug, Serialize)]
struct ChainEntry<'a> {
    indent: String,
    id: &'a str,
    title: &'a str,
}

#[derive(Debug, Serialize)]
struct ResultRef<'a> {
    id: &'a str,
    title: &'a str,
    path: String,
}

impl<'a> ResultRef<'a> {
    /// Points at the result path recorded in the log for `task`.
    fn new(state: &HearthState, task: &'a Task) -> Self {
        let path = match state.result_path(&task.id) {
            Some(path) => path.display().to_string(),
            None => NO_RESULT.to_string(),
        };
        Self {
            id: &task.id,
            title: &task.title,
            path,
        }
    }
}

/// Template engine wrapper around minijinja.
pub struct PromptEngine {
    env: Environment<'static>,
}

impl Default for PromptEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl PromptEngine {
    pub fn new() -> Self {
        let mut env = Environment::new();
        env.set_trim_blocks(true);
        env.add_template("instructions.md", INSTRUCTIONS_TEMPLATE)
            .expect("instructions template should be valid");
        env.add_template("task.md", TASK_TEMPLATE)
            .expect("task template should be valid");
        env.add_template("summary.md", SUMMARY_TEMPLATE)
            .expect("summary template should be valid");
        Self { env }
    }

    /// Prompt for executing `task_id`: ancestor and sibling context, the task
    /// header, its body, and the system instructions.
    pub fn render_task(&self, state: &HearthState, task_id: &str) -> Result<String> {
        let task = state
            .task(task_id)
            .ok_or_else(|| anyhow!("task not found: {task_id}"))?;

        // Immediate parent first, root last.
        let ancestors = state.ancestors(task_id);
        let root = ancestors.last().map(|root| RootContext {
            title: &root.title,
            description: root.description.trim(),
        });
        let chain: Vec<ChainEntry<'_>> = if ancestors.len() > 1 {
            ancestors
                .iter()
                .rev()
                .enumerate()
                .map(|(depth, parent)| ChainEntry {
                    indent: "  ".repeat(depth),
                    id: &parent.id,
                    title: &parent.title,
                })
                .collect()
        } else {
            Vec::new()
        };

        let siblings: Vec<ResultRef<'_>> = match task.parent_id.as_deref() {
            Some(parent_id) => state
                .children(parent_id)
                .filter(|sibling| sibling.id != task.id && sibling.is_completed())
                .map(|sibling| ResultRef::new(state, sibling))
                .collect(),
            None => Vec::new(),
        };

        let template = self.env.get_template("task.md")?;
        let rendered = template.render(context! {
            root => root,
            chain => chain,
            siblings => siblings,
            task => TaskRef { id: &task.id, title: &task.title },
            body => task.body(),
        })?;
        Ok(rendered)
    }

    /// Prompt asking the model to synthesize the results of `parent_id`'s
    /// completed children into a final answer for the parent.
    pub fn render_summary(&self, state: &HearthState, parent_id: &str) -> Result<String> {
        let parent = state
            .task(parent_id)
            .ok_or_else(|| anyhow!("task not found: {parent_id}"))?;
        let children: Vec<ResultRef<'_>> = state
            .children(parent_id)
            .filter(|child| child.is_completed())
            .map(|child| ResultRef::new(state, child))
            .collect();

        let template = self.env.get_template("summary.md")?;
        let rendered = template.render(context! {
            task => TaskRef { id: &parent.id, title: &parent.title },
            body => parent.body(),
            children => children,
        })?;
        Ok(rendered)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::events::EventPayload;
    use crate::test_support::{EventLog, created, created_under, described};
    use std::path::PathBuf;

    fn forest() -> HearthState {
        let mut log = EventLog::new();
        log.push(described(created("R", "Root title"), "Ship the release"));
        log.push(created_under("A", "Branch", "R"));
        log.push(created_under("A1", "First leaf", "A"));
        log.push(described(created_under("A2", "Second leaf", "A"), "Do A2 work"));
        log.push(EventPayload::TaskExecuted {
            task_id: "A1".to_string(),
            result_path: Some(PathBuf::from(".hearth/results/A1.md")),
        });
        log.push(EventPayload::task_completed("A1"));
        HearthState::replay(log.events())
    }

    #[test]
    fn task_prompt_includes_root_chain_and_sibling_results() {
        let prompt = PromptEngine::new()
            .render_task(&forest(), "A2")
            .expect("render");

        assert!(prompt.contains("ROOT TASK: Root title\n"));
        assert!(prompt.contains("ROOT GOAL: Ship the release\n"));
        assert!(prompt.contains("PARENT CHAIN:\n└─ R \"Root title\"\n  └─ A \"Branch\"\n"));
        assert!(prompt.contains("- A1 \"First leaf\" → Result: .hearth/results/A1.md\n"));
        assert!(prompt.contains("---\n\nCURRENT TASK: Second leaf\nCURRENT TASK ID: A2\n"));
        assert!(prompt.contains("\nDo A2 work\n"));
        assert!(prompt.contains("hearth add --parent A2"));
    }

    #[test]
    fn root_task_prompt_has_no_context_block() {
        let prompt = PromptEngine::new()
            .render_task(&forest(), "R")
            .expect("render");

        assert!(prompt.starts_with("CURRENT TASK: Root title\n"));
        assert!(!prompt.contains("ROOT TASK"));
        assert!(!prompt.contains("PREVIOUS SIBLING RESULTS"));
        assert!(prompt.contains("\nShip the release\n"));
    }

    #[test]
    fn direct_child_has_root_but_no_chain() {
        let prompt = PromptEngine::new()
            .render_task(&forest(), "A")
            .expect("render");

        assert!(prompt.contains("ROOT TASK: Root title"));
        assert!(!prompt.contains("PARENT CHAIN"));
        // Title stands in for an empty description.
        assert!(prompt.contains("\nBranch\n"));
    }

    #[test]
    fn summary_prompt_lists_completed_children() {
        let prompt = PromptEngine::new()
            .render_summary(&forest(), "A")
            .expect("render");

        assert!(prompt.starts_with("ORIGINAL TASK: Branch\nTASK ID: A\n"));
        assert!(prompt.contains("- A1 \"First leaf\" → Result: .hearth/results/A1.md\n"));
        assert!(!prompt.contains("A2"));
        assert!(prompt.contains("synthesize them into a final answer"));
    }

    #[test]
    fn result_refs_use_recorded_paths() {
        let mut log = EventLog::new();
        log.push(created("P", "Parent"));
        log.push(created_under("C1", "Moved", "P"));
        log.push(created_under("C2", "Failed", "P"));
        log.push(EventPayload::TaskExecuted {
            task_id: "C1".to_string(),
            result_path: Some(PathBuf::from("reports/c1.md")),
        });
        log.push(EventPayload::task_completed("C1"));
        log.push(EventPayload::TaskExecuted {
            task_id: "C2".to_string(),
            result_path: None,
        });
        log.push(EventPayload::task_completed("C2"));
        let state = HearthState::replay(log.events());

        let prompt = PromptEngine::new()
            .render_summary(&state, "P")
            .expect("render");
        assert!(prompt.contains("- C1 \"Moved\" → Result: reports/c1.md\n"));
        assert!(prompt.contains("- C2 \"Failed\" → Result: (no result recorded)\n"));
        assert!(!prompt.contains(".hearth/results/C1.md"));
    }

    #[test]
    fn unknown_task_is_an_error() {
        let err = PromptEngine::new()
            .render_task(&HearthState::new(), "missing")
            .unwrap_err();
        assert!(err.to_string().contains("task not found"));
    }

    #[test]
    fn presets_are_resolvable_by_name() {
        assert_eq!(preset("hello").map(|p| p.title), Some("Hello World Test"));
        assert!(preset("code-quality").is_some());
        assert!(preset("nope").is_none());
    }
}
