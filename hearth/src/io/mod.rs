//! Side-effecting helpers: workspace files, the event store, configuration and
//! the external model CLI.

pub mod caller;
pub mod config;
pub mod event_store;
pub mod paths;
pub mod process;
pub mod prompt;
pub mod results;
