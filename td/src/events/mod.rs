//! Event bus for live observability
//!
//! Every state change a UI could care about is published on a tokio broadcast
//! channel: task list mutations, simulated research progress, research
//! failures, and write-behind persistence failures.
//!
//! # Usage
//!
//! ```rust,ignore
//! use todone::events::{EventBus, TdEvent};
//!
//! let bus = std::sync::Arc::new(EventBus::with_default_capacity());
//! let mut rx = bus.subscribe();
//! while let Ok(event) = rx.recv().await {
//!     println!("Event: {:?}", event);
//! }
//! ```

mod bus;
mod types;

pub use bus::{DEFAULT_CHANNEL_CAPACITY, EventBus, create_event_bus};
pub use types::TdEvent;
