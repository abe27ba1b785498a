//! Validation of a workspace's event log and configuration for `hearth validate`.

use std::path::Path;

use anyhow::{Context, Result, anyhow};
use jsonschema::Draft;
use serde_json::Value;

use crate::core::events::Event;
use crate::core::invariants::validate_invariants;
use crate::core::state::HearthState;
use crate::io::config::load_config;
use crate::io::event_store::FileEventStore;
use crate::io::paths::HearthPaths;

const EVENTS_SCHEMA: &str = include_str!("../schemas/events.schema.json");

/// Summary of a log that passed validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidateOutcome {
    pub events: usize,
    pub tasks: usize,
    pub completed: usize,
}

/// Validate config, then the event log against the schema and the log invariants.
///
/// A missing log is valid and empty.
pub fn validate_workspace(root: &Path) -> Result<ValidateOutcome> {
    let paths = HearthPaths::new(root);
    load_config(&paths.config_path).with_context(|| "load config.toml")?;

    if !paths.events_path.exists() {
        return Ok(ValidateOutcome {
            events: 0,
            tasks: 0,
            completed: 0,
        });
    }
    let raw = FileEventStore::new(&paths.events_path)
        .read_raw()
        .with_context(|| format!("read {}", paths.events_path.display()))?;
    let events = parse_events(&raw)
        .with_context(|| format!("validate {}", paths.events_path.display()))?;

    let errors = validate_invariants(&events);
    if !errors.is_empty() {
        return Err(anyhow!(
            "invariant violations:\n- {}",
            errors.join("\n- ")
        ));
    }

    let state = HearthState::replay(&events);
    Ok(ValidateOutcome {
        events: events.len(),
        tasks: state.tasks().len(),
        completed: state.tasks().values().filter(|task| task.is_completed()).count(),
    })
}

/// Parse a raw log, checking it against the JSON Schema first so errors point
/// at the offending field.
pub fn parse_events(raw: &str) -> Result<Vec<Event>> {
    if raw.trim().is_empty() {
        return Ok(Vec::new());
    }
    let value: Value = serde_json::from_str(raw).context("parse event log json")?;
    validate_schema(&value)?;
    let events: Vec<Event> = serde_json::from_value(value).context("deserialize events")?;
    Ok(events)
}

fn validate_schema(instance: &Value) -> Result<()> {
    let schema: Value = serde_json::from_str(EVENTS_SCHEMA).context("parse events schema")?;
    let compiled = jsonschema::options()
        .with_draft(Draft::Draft202012)
        .build(&schema)
        .context("compile events schema")?;
    let messages: Vec<String> = compiled
        .iter_errors(instance)
        .map(|err| err.to_string())
        .collect();
    if !messages.is_empty() {
        return Err(anyhow!(
            "schema validation failed:\n- {}",
            messages.join("\n- ")
        ));
    }
    Ok(())
}
