//! Domain types for todone
//!
//! Core domain types: Task, Research, Feedback, ChatMessage.
//! Tasks and their embedded research serialize in camelCase so the stored
//! JSON matches what the HTTP boundary serves.

mod chat;
mod id;
mod quota;
mod research;
mod task;

pub use chat::{ChatMessage, ChatRole};
pub use id::{IdResolver, generate_task_id};
pub use quota::RateLimitInfo;
pub use research::{Action, ActionType, Confidence, OptionCard, QuickInfo, Research, SourceReference, SourceType, UiType};
pub use task::{Feedback, FeedbackType, Task, TaskAction, TaskError, TaskStatus};
