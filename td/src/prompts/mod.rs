//! Prompt Template System
//!
//! Loads and renders `.pmt` (prompt template) files for research and chat.
//!
//! Template loading chain:
//! 1. `.todone/prompts/{name}.pmt` (user override)
//! 2. Embedded fallback in code
//!
//! Templates use Handlebars syntax for variable substitution.

pub mod embedded;
mod loader;

pub use loader::{ChatPromptContext, PromptLoader, ResearchPromptContext};
