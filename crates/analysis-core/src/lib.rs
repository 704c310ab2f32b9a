//! Formcheck Analysis Core — per-exercise posture analysis
//!
//! Turns a stream of per-frame pose keypoints into repetition counts and
//! debounced form-error events:
//! - **Plank:** Back posture classification (low back / high back)
//! - **Bicep Curl:** Two-armed rep counting, loose upper arm, missed peak
//!   contraction, leaning back
//! - **Squat:** Rep counting plus foot and knee placement ratios
//! - **Lunge:** Rep counting, knee-over-toe and knee angle, once per rep
//!
//! This crate is pure computation. The only I/O is loading classifier
//! artifacts into a [`ModelRegistry`] at startup; frame persistence goes
//! through the [`FrameStore`] trait.

pub mod analyzer;
pub mod bicep_curl;
pub mod classifier;
pub mod config;
pub mod event_log;
pub mod features;
pub mod geometry;
pub mod latch;
pub mod lunge;
pub mod plank;
pub mod registry;
pub mod squat;

#[cfg(test)]
mod test_support;

pub use analyzer::{Analyzer, ExerciseAnalyzer, FrameAnalysis};
pub use classifier::{Classifier, LinearModel, Prediction, ScriptedClassifier};
pub use config::AnalysisConfig;
pub use event_log::{EventLog, FrameStore};
pub use registry::{ModelKey, ModelRegistry};
