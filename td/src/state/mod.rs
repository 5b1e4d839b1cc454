//! Task Store with actor pattern
//!
//! StateManager owns the TaskStore and processes messages via channels,
//! providing serialized access to the persisted task list and rate-limit
//! record for one identity.

mod manager;
mod messages;
pub mod ordering;

pub use manager::{RATE_LIMIT_KEY, StateManager, TASKS_KEY};
pub use messages::{StateCommand, StateError, StateResponse};
