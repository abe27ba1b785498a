//! Workspace configuration stored under `.hearth/config.toml`.

use std::fs;
use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result, anyhow};
use serde::{Deserialize, Serialize};

/// Hearth configuration (TOML).
///
/// Missing fields default to the values below, so an absent file is a valid
/// configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct HearthConfig {
    /// Truncate task descriptions in selection log lines beyond this many characters.
    pub description_preview_chars: usize,

    pub caller: CallerConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct CallerConfig {
    /// Argv prefix of the LLM CLI. The prompt is appended as the last argument.
    pub command: Vec<String>,

    /// Wall-clock limit for one call, in seconds.
    pub timeout_secs: u64,

    /// Truncate captured stdout/stderr beyond this many bytes.
    pub output_limit_bytes: usize,
}

impl Default for CallerConfig {
    fn default() -> Self {
        Self {
            command: vec![
                "claude".to_string(),
                "--print".to_string(),
                "--dangerously-skip-permissions".to_string(),
            ],
            timeout_secs: 30 * 60,
            output_limit_bytes: 1_000_000,
        }
    }
}

impl CallerConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl Default for HearthConfig {
    fn default() -> Self {
        Self {
            description_preview_chars: 100,
            caller: CallerConfig::default(),
        }
    }
}

impl HearthConfig {
    pub fn validate(&self) -> Result<()> {
        if self.caller.command.is_empty() || self.caller.command[0].trim().is_empty() {
            return Err(anyhow!("caller.command must be a non-empty array"));
        }
        if self.caller.timeout_secs == 0 {
            return Err(anyhow!("caller.timeout_secs must be > 0"));
        }
        if self.caller.output_limit_bytes == 0 {
            return Err(anyhow!("caller.output_limit_bytes must be > 0"));
        }
        Ok(())
    }
}

/// Load config from a TOML file.
///
/// If the file is missing, returns `HearthConfig::default()`.
pub fn load_config(path: &Path) -> Result<HearthConfig> {
    if !path.exists() {
        let cfg = HearthConfig::default();
        cfg.validate()?;
        return Ok(cfg);
    }
    let contents = fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
    let cfg: HearthConfig =
        toml::from_str(&contents).with_context(|| format!("parse {}", path.display()))?;
    cfg.validate()
        .with_context(|| format!("invalid config {}", path.display()))?;
    Ok(cfg)
}

/// Atomically write config to disk (temp file + rename).
pub fn write_config(path: &Path, cfg: &HearthConfig) -> Result<()> {
    cfg.validate()?;
    let mut buf = toml::to_string_pretty(cfg).context("serialize config toml")?;
    buf.push('\n');
    write_atomic(path, &buf)
}

fn write_atomic(path: &Path, contents: &str) -> Result<()> {
    let parent = path
        .parent()
        .with_context(|| format!("config path missing parent {}", path.display()))?;
    fs::create_dir_all(parent).with_context(|| format!("create directory {}", parent.display()))?;
    let tmp_path = path.with_extension("toml.tmp");
    fs::write(&tmp_path, contents)
        .with_context(|| format!("write temp config {}", tmp_path.display()))?;
    fs::rename(&tmp_path, path).with_context(|| format!("replace config {}", path.display()))?;
    Ok(())
}
