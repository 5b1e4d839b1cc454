//! Fixed simulated research stages

use serde::{Deserialize, Serialize};

/// One simulated phase of research
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProgressStage {
    Analyzing,
    Searching,
    Synthesizing,
    Formatting,
}

/// What a UI shows while research is outstanding
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ProgressStatus {
    pub stage: ProgressStage,
    pub message: &'static str,
    /// Percentage; never reaches 100
    pub progress: u8,
}

/// Stages in order, with strictly increasing percentages
pub const PROGRESS_STAGES: [ProgressStatus; 4] = [
    ProgressStatus {
        stage: ProgressStage::Analyzing,
        message: "Analyzing your task...",
        progress: 15,
    },
    ProgressStatus {
        stage: ProgressStage::Searching,
        message: "Searching for relevant information...",
        progress: 45,
    },
    ProgressStatus {
        stage: ProgressStage::Synthesizing,
        message: "Synthesizing insights...",
        progress: 75,
    },
    ProgressStatus {
        stage: ProgressStage::Formatting,
        message: "Preparing your briefing...",
        progress: 95,
    },
];

/// Index of the final stage
pub const LAST_STAGE: usize = PROGRESS_STAGES.len() - 1;
