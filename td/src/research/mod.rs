//! Research pipeline: model invocation and response normalization

mod client;
mod error;
pub mod parser;

pub use client::ResearchClient;
pub use error::{ParseError, ResearchError};
pub use parser::{ParsedResearch, parse};
