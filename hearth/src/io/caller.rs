//! LLM invocation backend.
//!
//! The [`Caller`] trait decouples execution from the actual model CLI. Tests
//! use scripted callers that return canned responses without spawning
//! processes.

use std::path::Path;
use std::process::Command;

use anyhow::{Context, Result, anyhow};
use tracing::{debug, info, instrument};

use crate::io::config::CallerConfig;
use crate::io::process::run_command_with_timeout;

pub trait Caller: Send + Sync {
    /// Send `prompt` to the model with `workdir` as its working directory and
    /// return the response text.
    fn call(&self, prompt: &str, workdir: &Path) -> Result<String>;
}

/// Caller that spawns the configured CLI, passing the prompt as the last argument.
#[derive(Debug, Clone)]
pub struct CommandCaller {
    config: CallerConfig,
}

impl CommandCaller {
    pub fn new(config: CallerConfig) -> Self {
        Self { config }
    }
}

impl Caller for CommandCaller {
    #[instrument(skip_all, fields(workdir = %workdir.display(), prompt_bytes = prompt.len()))]
    fn call(&self, prompt: &str, workdir: &Path) -> Result<String> {
        let (program, args) = self
            .config
            .command
            .split_first()
            .ok_or_else(|| anyhow!("caller.command must be a non-empty array"))?;
        info!(program = %program, "calling model");

        let mut cmd = Command::new(program);
        cmd.args(args).arg(prompt).current_dir(workdir);

        let output = run_command_with_timeout(
            cmd,
            self.config.timeout(),
            self.config.output_limit_bytes,
        )
        .with_context(|| format!("run {program}"))?;
        output.ensure_success(program)?;

        let response = output.stdout_text();
        debug!(response_bytes = response.len(), "model responded");
        Ok(response)
    }
}
