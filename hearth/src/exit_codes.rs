//! Stable exit codes for hearth CLI commands.

/// Command succeeded, or `hearth next` found an eligible task.
pub const OK: i32 = 0;
/// Command failed: unreadable workspace, invalid config or log, unknown task, bad arguments.
pub const INVALID: i32 = 1;
/// `hearth next` found no eligible task.
pub const COMPLETE: i32 = 2;
/// The event was refused by the validator (e.g. completing a task with open subtasks).
pub const REJECTED: i32 = 3;
