//! Simulated research progress
//!
//! Real research latency is unpredictable, so progress is faked: a fixed
//! sequence of stages advanced on a timer, capped below 100%, and cleared when
//! the real call completes.

mod simulator;
mod stages;

pub use simulator::{ProgressHandle, ProgressSimulator};
pub use stages::{LAST_STAGE, PROGRESS_STAGES, ProgressStage, ProgressStatus};
