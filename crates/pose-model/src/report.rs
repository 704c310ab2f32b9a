//! End-of-video analysis results.

use serde::{Deserialize, Serialize};

use crate::event::ErrorEvent;
use crate::exercise::ExerciseKind;

/// Repetition counters, shaped per exercise.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RepCounters {
    /// Two independently counted sides (bicep curl).
    Bilateral { left_counter: u32, right_counter: u32 },
    /// A single counter (squat, lunge).
    Single(u32),
    /// The exercise does not count repetitions (plank).
    None,
}

impl RepCounters {
    /// Sum over all sides.
    pub fn total(&self) -> u32 {
        match *self {
            Self::Bilateral {
                left_counter,
                right_counter,
            } => left_counter + right_counter,
            Self::Single(counter) => counter,
            Self::None => 0,
        }
    }
}

/// Events plus counters returned once a video has been fully analyzed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisResults {
    pub details: Vec<ErrorEvent>,
    pub counter: RepCounters,
}

/// Report emitted by drivers for one analyzed video.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisReport {
    pub exercise: ExerciseKind,

    /// Identifier of the analyzed video (typically its file name).
    pub video: String,

    /// Error events, in detection order.
    pub details: Vec<ErrorEvent>,

    pub counter: RepCounters,

    /// Frames handed to the analyzer.
    pub frames_analyzed: u64,

    /// Frames dropped before analysis (no pose, out of order) or skipped by it.
    pub frames_skipped: u64,

    /// Report creation time (RFC 3339).
    pub generated_at: String,
}

impl AnalysisReport {
    pub fn new(exercise: ExerciseKind, video: impl Into<String>, results: AnalysisResults) -> Self {
        Self {
            exercise,
            video: video.into(),
            details: results.details,
            counter: results.counter,
            frames_analyzed: 0,
            frames_skipped: 0,
            generated_at: chrono::Utc::now().to_rfc3339(),
        }
    }
}
