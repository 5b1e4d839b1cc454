//! Embedded prompts
//!
//! These are compiled into the binary from .pmt files at build time.

use tracing::debug;

/// System instruction for research calls: output schema and domain rules
pub const RESEARCH_SYSTEM: &str = include_str!("../../prompts/research-system.pmt");

/// Per-task research request
pub const RESEARCH: &str = include_str!("../../prompts/research.pmt");

/// Opening context for a task chat
pub const CHAT_CONTEXT: &str = include_str!("../../prompts/chat-context.pmt");

/// Get the embedded prompt by name
pub fn get_embedded(name: &str) -> Option<&'static str> {
    debug!(%name, "get_embedded: called");
    match name {
        "research-system" => Some(RESEARCH_SYSTEM),
        "research" => Some(RESEARCH),
        "chat-context" => Some(CHAT_CONTEXT),
        _ => {
            debug!("get_embedded: no match found");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_get_embedded_research_system() {
        let system = get_embedded("research-system").unwrap();
        assert!(system.contains("isPersonal"));
        assert!(system.contains("keyActions"));
        assert!(system.contains("quickInfo"));
        assert!(system.contains("tel:+1"));
    }

    #[test]
    fn test_get_embedded_templates() {
        assert!(get_embedded("research").unwrap().contains("{{title}}"));
        assert!(get_embedded("chat-context").unwrap().contains("No research available for this task."));
    }

    #[test]
    fn test_get_embedded_unknown() {
        assert!(get_embedded("unknown-template").is_none());
    }
}
