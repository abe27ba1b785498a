//! Markdown result artifacts under `.hearth/results/`.

use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result};
use tracing::debug;

use crate::io::paths::HearthPaths;

/// Write `content` as the result of `task_id`, replacing any previous result.
///
/// Returns the workspace-relative path recorded in events.
pub fn store_result(paths: &HearthPaths, task_id: &str, content: &str) -> Result<PathBuf> {
    fs::create_dir_all(&paths.results_dir)
        .with_context(|| format!("create results dir {}", paths.results_dir.display()))?;
    let path = paths.result_path(task_id);
    fs::write(&path, content).with_context(|| format!("write result {}", path.display()))?;
    debug!(task_id, path = %path.display(), bytes = content.len(), "stored result");
    Ok(HearthPaths::result_rel_path(task_id))
}

/// Read the stored result of `task_id`, if any.
pub fn read_result(paths: &HearthPaths, task_id: &str) -> Result<Option<String>> {
    let path = paths.result_path(task_id);
    if !path.exists() {
        return Ok(None);
    }
    let contents =
        fs::read_to_string(&path).with_context(|| format!("read result {}", path.display()))?;
    Ok(Some(contents))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn store_overwrites_and_returns_relative_path() {
        let temp = tempfile::tempdir().expect("tempdir");
        let paths = HearthPaths::new(temp.path());

        let rel = store_result(&paths, "T-1", "first").expect("store");
        assert_eq!(rel, PathBuf::from(".hearth/results/T-1.md"));
        store_result(&paths, "T-1", "second").expect("store again");

        let stored = read_result(&paths, "T-1").expect("read");
        assert_eq!(stored.as_deref(), Some("second"));
        assert_eq!(read_result(&paths, "missing").expect("read"), None);
    }
}
