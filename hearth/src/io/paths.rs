//! Canonical locations inside a workspace's `.hearth/` directory.

use std::path::{Path, PathBuf};

pub const HEARTH_DIR: &str = ".hearth";

/// All canonical paths within `.hearth/` for a workspace root.
#[derive(Debug, Clone)]
pub struct HearthPaths {
    pub root: PathBuf,
    pub hearth_dir: PathBuf,
    pub events_path: PathBuf,
    pub results_dir: PathBuf,
    pub config_path: PathBuf,
}

impl HearthPaths {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        let root = root.into();
        let hearth_dir = root.join(HEARTH_DIR);
        Self {
            root: root.clone(),
            hearth_dir: hearth_dir.clone(),
            events_path: hearth_dir.join("events.json"),
            results_dir: hearth_dir.join("results"),
            config_path: hearth_dir.join("config.toml"),
        }
    }

    /// Workspace-relative location of a task's result artifact.
    pub fn result_rel_path(task_id: &str) -> PathBuf {
        Path::new(HEARTH_DIR)
            .join("results")
            .join(format!("{task_id}.md"))
    }

    pub fn result_path(&self, task_id: &str) -> PathBuf {
        self.root.join(Self::result_rel_path(task_id))
    }
}
