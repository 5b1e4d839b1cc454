//! todone - a task list that researches your tasks for you
//!
//! Each non-personal task is sent to a web-search-capable LLM which returns a
//! structured briefing: a summary, quick contact info, suggested actions,
//! sources, and optional comparison cards.
//!
//! # Core Concepts
//!
//! - **Optimistic board**: lifecycle changes apply in memory first and are
//!   written behind to the task store
//! - **Governed research**: personal titles skip the model, repeat titles hit
//!   a 24h cache, and everything else counts against a daily quota
//! - **Lenient parsing**: whatever the model returns is normalized into a
//!   well-formed [`domain::Research`]
//!
//! # Modules
//!
//! - [`lifecycle`] - Task lifecycle controller and write-behind queue
//! - [`governor`] - Cache and rate limiter in front of research
//! - [`research`] - Research client and response parser
//! - [`progress`] - Simulated research progress
//! - [`state`] - Task store actor
//! - [`server`] - HTTP API for research and chat
//! - [`cli`] - Command-line interface

pub mod app;
pub mod chat;
pub mod classifier;
pub mod cli;
pub mod config;
pub mod domain;
pub mod events;
pub mod governor;
pub mod lifecycle;
pub mod llm;
pub mod progress;
pub mod prompts;
pub mod research;
pub mod server;
pub mod state;

// Re-export commonly used types
pub use app::App;
pub use chat::{ChatRequest, ChatService, ChatSession};
pub use classifier::is_personal_task;
pub use config::{Config, LlmConfig};
pub use domain::{Feedback, FeedbackType, RateLimitInfo, Research, Task, TaskError, TaskStatus};
pub use events::{EventBus, TdEvent, create_event_bus};
pub use governor::{Governor, GovernorConfig, GovernorReply, ResearchResponse};
pub use lifecycle::{AddedTask, LifecycleController, LifecycleError, ResearchJob};
pub use llm::{CompletionRequest, CompletionResponse, GeminiClient, LlmClient, LlmError, create_client};
pub use progress::{ProgressSimulator, ProgressStatus};
pub use prompts::PromptLoader;
pub use research::{ParsedResearch, ResearchClient};
pub use state::{StateError, StateManager};
