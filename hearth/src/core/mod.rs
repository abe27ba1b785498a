//! Deterministic, pure logic for the orchestration engine.
//!
//! Core modules must be free of I/O side effects. They operate on in-memory
//! data structures and return deterministic outputs suitable for tests.

pub mod clock;
pub mod events;
pub mod invariants;
pub mod merge;
pub mod orchestration;
pub mod selector;
pub mod state;
pub mod types;
pub mod validator;
