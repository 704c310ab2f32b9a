//! Plank posture analysis.
//!
//! A single classifier labels the whole-body posture as correct (`C`), low
//! back (`L`) or high back (`H`). An event is recorded when the posture
//! enters an error stage from any other stage.

use std::sync::Arc;

use formcheck_common::clock::TimestampMs;
use formcheck_common::error::FormcheckResult;
use formcheck_pose_model::event::{ErrorCategory, ErrorEvent};
use formcheck_pose_model::exercise::ExerciseKind;
use formcheck_pose_model::frame::{FrameHandle, PoseFrame};
use formcheck_pose_model::report::RepCounters;

use crate::analyzer::{require_pose, soft_fail, ExerciseAnalyzer, FrameAnalysis};
use crate::classifier::Classifier;
use crate::config::PlankConfig;
use crate::event_log::EventLog;
use crate::features::{FeatureExtractor, PLANK_LANDMARKS};
use crate::latch::TransitionLatch;
use crate::registry::{ModelKey, ModelRegistry};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlankStage {
    Unknown,
    Correct,
    LowBack,
    HighBack,
}

impl PlankStage {
    fn from_label(label: &str) -> Self {
        match label {
            "C" => Self::Correct,
            "L" => Self::LowBack,
            "H" => Self::HighBack,
            _ => Self::Unknown,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Unknown => "unknown",
            Self::Correct => "correct",
            Self::LowBack => "low back",
            Self::HighBack => "high back",
        }
    }

    pub fn error(self) -> Option<ErrorCategory> {
        match self {
            Self::LowBack => Some(ErrorCategory::LowBack),
            Self::HighBack => Some(ErrorCategory::HighBack),
            Self::Unknown | Self::Correct => None,
        }
    }
}

#[derive(Debug)]
pub struct PlankAnalyzer {
    config: PlankConfig,
    classifier: Arc<dyn Classifier>,
    features: FeatureExtractor,
    previous_stage: PlankStage,
    error_latch: TransitionLatch<ErrorCategory>,
    log: EventLog,
}

impl PlankAnalyzer {
    pub fn new(registry: &ModelRegistry, config: PlankConfig) -> FormcheckResult<Self> {
        config.validate()?;
        let features = FeatureExtractor::new(PLANK_LANDMARKS);
        let classifier = registry.require(ModelKey::PlankPosture, features.input_len())?;
        Ok(Self {
            config,
            classifier,
            features,
            previous_stage: PlankStage::Unknown,
            error_latch: TransitionLatch::new(),
            log: EventLog::new(),
        })
    }

    /// Stage of the last analyzed frame.
    pub fn stage(&self) -> PlankStage {
        self.previous_stage
    }

    fn analyze(
        &mut self,
        pose: &PoseFrame,
        frame: &FrameHandle,
        timestamp: TimestampMs,
    ) -> FormcheckResult<FrameAnalysis> {
        require_pose(pose)?;
        let row = self.features.extract(pose)?;
        let prediction = self.classifier.predict(&row)?;

        let stage = prediction
            .confident(self.config.prediction_probability_threshold)
            .map(PlankStage::from_label)
            .unwrap_or(PlankStage::Unknown);

        let error = stage.error();
        if self.error_latch.observe(error) {
            if let Some(category) = error {
                self.log
                    .push(ErrorEvent::new(category, frame.clone(), timestamp));
            }
        }
        if stage != self.previous_stage {
            tracing::debug!(
                from = self.previous_stage.name(),
                to = stage.name(),
                confidence = prediction.confidence,
                "Plank stage changed"
            );
        }
        self.previous_stage = stage;

        Ok(FrameAnalysis {
            stage: stage.name().to_string(),
            counters: RepCounters::None,
            active_errors: error.into_iter().collect(),
            has_error: error.is_some(),
        })
    }
}

impl ExerciseAnalyzer for PlankAnalyzer {
    fn kind(&self) -> ExerciseKind {
        ExerciseKind::Plank
    }

    fn detect(
        &mut self,
        pose: &PoseFrame,
        frame: &FrameHandle,
        timestamp: TimestampMs,
    ) -> Option<FrameAnalysis> {
        let result = self.analyze(pose, frame, timestamp);
        soft_fail(self.kind(), frame, result)
    }

    fn event_log(&self) -> &EventLog {
        &self.log
    }

    fn event_log_mut(&mut self) -> &mut EventLog {
        &mut self.log
    }

    fn counters(&self) -> RepCounters {
        RepCounters::None
    }

    fn reset(&mut self) {
        self.previous_stage = PlankStage::Unknown;
        self.error_latch.reset();
        self.log.clear();
    }
}
