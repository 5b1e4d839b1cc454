//! CLI command definitions and subcommands

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing::debug;

use crate::domain::{FeedbackType, TaskStatus};

/// todone - a task list that researches your tasks for you
#[derive(Parser)]
#[command(
    name = "td",
    about = "Task manager that researches each task with a web-search-capable LLM",
    version
)]
pub struct Cli {
    /// Path to config file
    #[arg(short, long, global = true, help = "Path to config file")]
    pub config: Option<PathBuf>,

    /// Log level (TRACE, DEBUG, INFO, WARN, ERROR)
    #[arg(
        short = 'l',
        long = "log-level",
        global = true,
        help = "Log level (TRACE, DEBUG, INFO, WARN, ERROR)"
    )]
    pub log_level: Option<String>,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Option<Command>,
}

/// CLI subcommands
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Serve the research and chat HTTP API
    Serve {
        /// Address to bind (overrides config)
        #[arg(long)]
        host: Option<String>,

        /// Port to bind (overrides config)
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Add a task and research it
    Add {
        /// Task title
        #[arg(required = true, num_args = 1..)]
        title: Vec<String>,
    },

    /// List tasks
    List {
        /// Only tasks with this status (pending, researching, ready, personal, completed, archived)
        #[arg(short, long)]
        status: Option<TaskStatus>,

        /// Include completed and archived tasks
        #[arg(short, long)]
        all: bool,

        /// Output format
        #[arg(short, long, default_value = "text")]
        format: OutputFormat,
    },

    /// Show a task and its briefing
    Show {
        /// Task ID (or partial match)
        id: String,

        /// Output format
        #[arg(short, long, default_value = "text")]
        format: OutputFormat,
    },

    /// Mark a task completed
    Complete {
        /// Task ID (or partial match)
        id: String,
    },

    /// Archive a task
    Archive {
        /// Task ID (or partial match)
        id: String,
    },

    /// Restore a completed or archived task
    Restore {
        /// Task ID (or partial match)
        id: String,
    },

    /// Delete a task
    Delete {
        /// Task ID (or partial match)
        id: String,
    },

    /// Research a pending task again
    Retry {
        /// Task ID (or partial match)
        id: String,
    },

    /// Change a task's title
    Rename {
        /// Task ID (or partial match)
        id: String,

        /// New title
        #[arg(required = true, num_args = 1..)]
        title: Vec<String>,
    },

    /// Put tasks first, in the given order
    Reorder {
        /// Task IDs (or partial matches)
        #[arg(required = true, num_args = 1..)]
        ids: Vec<String>,
    },

    /// Move a task to the top of the list
    Top {
        /// Task ID (or partial match)
        id: String,
    },

    /// Move a task to the bottom of the list
    Bottom {
        /// Task ID (or partial match)
        id: String,
    },

    /// Rate a task's briefing
    Feedback {
        /// Task ID (or partial match)
        id: String,

        /// positive or negative
        kind: FeedbackType,

        /// Optional comment
        #[arg(short = 'm', long)]
        comment: Option<String>,
    },

    /// Ask a follow-up question about a task
    Chat {
        /// Task ID (or partial match)
        id: String,

        /// Question
        #[arg(required = true, num_args = 1..)]
        message: Vec<String>,
    },

    /// Show remaining research requests
    Quota,

    /// Remove every task and the stored quota
    Clear {
        /// Skip the confirmation check
        #[arg(long)]
        yes: bool,
    },
}

/// Output format for list/show commands
#[derive(Clone, Debug, Default)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

impl std::str::FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        debug!(%s, "OutputFormat::from_str: called");
        match s.to_lowercase().as_str() {
            "text" | "plain" => Ok(Self::Text),
            "json" => Ok(Self::Json),
            _ => {
                debug!(%s, "OutputFormat::from_str: unknown format");
                Err(format!("Unknown format: {}. Use: text or json", s))
            }
        }
    }
}

pub fn get_log_path() -> PathBuf {
    debug!("get_log_path: called");
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("todone")
        .join("logs")
        .join("todone.log")
}
