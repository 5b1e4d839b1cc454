//! Prompt Loader
//!
//! Loads prompt templates from files or falls back to embedded defaults.

use std::path::{Path, PathBuf};

use eyre::{Result, eyre};
use handlebars::Handlebars;
use serde::Serialize;
use tracing::debug;

use super::embedded;
use crate::domain::Research;

/// Placeholder for quick-info fields the briefing lacks
const NOT_AVAILABLE: &str = "Not available";

/// Context for the per-task research prompt
#[derive(Debug, Clone, Serialize)]
pub struct ResearchPromptContext {
    pub title: String,
}

/// Context for the opening turn of a task chat
#[derive(Debug, Clone, Serialize)]
pub struct ChatPromptContext {
    pub title: String,
    pub has_research: bool,
    pub summary: String,
    pub phone: String,
    pub hours: String,
    pub address: String,
    pub website: String,
    pub raw_markdown: String,
}

impl ChatPromptContext {
    pub fn new(title: &str, research: Option<&Research>) -> Self {
        debug!(%title, has_research = research.is_some(), "ChatPromptContext::new: called");
        let quick_info = research.and_then(|r| r.quick_info.clone()).unwrap_or_default();
        let or_na = |field: Option<String>| field.unwrap_or_else(|| NOT_AVAILABLE.to_string());

        Self {
            title: title.to_string(),
            has_research: research.is_some(),
            summary: research.map(|r| r.summary.clone()).unwrap_or_default(),
            phone: or_na(quick_info.phone_formatted),
            hours: or_na(quick_info.hours),
            address: or_na(quick_info.address),
            website: or_na(quick_info.website),
            raw_markdown: research.map(|r| r.raw_markdown.clone()).unwrap_or_default(),
        }
    }
}

/// Loads and renders prompt templates
pub struct PromptLoader {
    /// Handlebars template engine
    hbs: Handlebars<'static>,
    /// User override directory (e.g., `.todone/prompts/`)
    user_dir: Option<PathBuf>,
}

impl PromptLoader {
    /// Create a loader that honours overrides under `{root}/.todone/prompts/`
    pub fn new(root: impl AsRef<Path>) -> Self {
        let user_dir = root.as_ref().join(".todone/prompts");
        let user_dir_exists = user_dir.exists();
        debug!(?user_dir, %user_dir_exists, "PromptLoader::new: called");

        Self {
            hbs: Self::engine(),
            user_dir: if user_dir_exists { Some(user_dir) } else { None },
        }
    }

    /// Create a loader that only uses embedded prompts
    pub fn embedded_only() -> Self {
        debug!("PromptLoader::embedded_only: called");
        Self {
            hbs: Self::engine(),
            user_dir: None,
        }
    }

    /// Prompts are plain text, not HTML
    fn engine() -> Handlebars<'static> {
        let mut hbs = Handlebars::new();
        hbs.register_escape_fn(handlebars::no_escape);
        hbs
    }

    /// Load a template by name
    ///
    /// Checks the user override directory first, then the embedded copy.
    fn load_template(&self, name: &str) -> Result<String> {
        debug!(%name, "PromptLoader::load_template: called");
        if let Some(ref user_dir) = self.user_dir {
            let path = user_dir.join(format!("{}.pmt", name));
            if path.exists() {
                debug!(?path, "PromptLoader::load_template: found in user override");
                return std::fs::read_to_string(&path)
                    .map_err(|e| eyre!("Failed to read user prompt {}: {}", path.display(), e));
            }
        }

        if let Some(content) = embedded::get_embedded(name) {
            debug!(%name, "PromptLoader::load_template: found in embedded");
            return Ok(content.to_string());
        }

        Err(eyre!("Prompt template not found: {}", name))
    }

    /// Render a template with the given context
    pub fn render<T: Serialize>(&self, template_name: &str, context: &T) -> Result<String> {
        debug!(%template_name, "PromptLoader::render: called");
        let template = self.load_template(template_name)?;
        self.hbs
            .render_template(&template, context)
            .map_err(|e| eyre!("Failed to render template {}: {}", template_name, e))
    }

    /// System instruction for research calls
    pub fn research_system_prompt(&self) -> Result<String> {
        self.load_template("research-system")
    }

    /// User turn asking for research on one task
    pub fn research_prompt(&self, title: &str) -> Result<String> {
        self.render(
            "research",
            &ResearchPromptContext {
                title: title.to_string(),
            },
        )
    }

    /// Opening context turn for a task chat
    pub fn chat_context_prompt(&self, title: &str, research: Option<&Research>) -> Result<String> {
        self.render("chat-context", &ChatPromptContext::new(title, research))
    }
}
