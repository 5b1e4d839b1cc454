//! Task lifecycle
//!
//! Optimistic board, write-behind persistence and the controller that ties
//! classification, research and progress together.

mod board;
mod controller;
mod error;
mod persist;

pub use board::TaskBoard;
pub use controller::{AddedTask, LifecycleController, RESEARCH_FAILED, ResearchJob};
pub use error::LifecycleError;
pub use persist::{PersistOp, PersistQueue};
