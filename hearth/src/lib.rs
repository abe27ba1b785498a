//! Event-sourced task orchestration.
//!
//! Every change to the task forest is an immutable event in an append-only
//! log; current state is a projection of that log. The architecture keeps a
//! strict separation:
//!
//! - **[`core`]**: Pure, deterministic logic (projection, validation, depth-first
//!   selection, the orchestration transition table, log merging). No I/O.
//! - **[`io`]**: Side-effecting operations (the locked file event store, config,
//!   process execution, prompts, result artifacts).
//!
//! [`engine::Hearth`] ties them together: it is the single mutation entry point
//! and drives each event to quiescence. [`execution`] supplies the model-backed
//! executor, and [`list`] and [`validate`] back the matching CLI commands.

pub mod core;
pub mod engine;
pub mod error;
pub mod execution;
pub mod exit_codes;
pub mod io;
pub mod list;
pub mod logging;
#[cfg(any(test, feature = "test-support"))]
pub mod test_support;
pub mod validate;
