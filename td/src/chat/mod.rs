//! Follow-up chat about a researched task
//!
//! Chat never mutates the stored briefing; messages live only as long as the
//! session that holds them.

mod service;
mod session;

pub use service::{
    CONTEXT_ACK, ChatError, ChatReply, ChatRequest, ChatService, ERROR_REPLY, MISSING_MESSAGE_REPLY,
};
pub use session::{ChatSession, EMPTY_REPLY, FAILED_REPLY};
