//! Squat analysis.
//!
//! The stage classifier drives the rep counter (`down` then `up` counts one
//! rep). Independently, foot and knee placement are measured as width
//! ratios and checked against configured bands:
//!
//! - foot width / shoulder width against one band;
//! - knee width / foot width against a band that depends on the phase.
//!
//! Placement events are debounced per category: a label fires when it
//! differs from the last error label seen for that category, and a correct
//! or unknown frame clears the memory.

use std::sync::Arc;

use formcheck_common::clock::TimestampMs;
use formcheck_common::error::FormcheckResult;
use formcheck_pose_model::event::{ErrorCategory, ErrorEvent};
use formcheck_pose_model::exercise::ExerciseKind;
use formcheck_pose_model::frame::{FrameHandle, PoseFrame};
use formcheck_pose_model::landmark::Landmark;
use formcheck_pose_model::report::RepCounters;

use crate::analyzer::{require_pose, soft_fail, ExerciseAnalyzer, FrameAnalysis};
use crate::classifier::Classifier;
use crate::config::{Band, BandPosition, KneeFootBands, SquatConfig};
use crate::event_log::EventLog;
use crate::features::{FeatureExtractor, SQUAT_LANDMARKS};
use crate::geometry::{distance, round_to};
use crate::latch::TransitionLatch;
use crate::registry::{ModelKey, ModelRegistry};

/// Widths below this are treated as degenerate.
const MIN_WIDTH: f64 = 1e-6;

/// Rep stage driven by the classifier. `Unset` until the first `down`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SquatStage {
    Unset,
    Down,
    Up,
}

impl SquatStage {
    pub fn name(self) -> &'static str {
        match self {
            Self::Unset => "",
            Self::Down => "down",
            Self::Up => "up",
        }
    }
}

/// Phase selecting the knee / foot band.
///
/// `Middle` is never produced by the rep stage machine; it is only
/// reachable by calling [`classify_knee_placement`] directly.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KneePhase {
    Up,
    Middle,
    Down,
}

impl KneePhase {
    fn from_stage(stage: SquatStage) -> Option<Self> {
        match stage {
            SquatStage::Unset => None,
            SquatStage::Down => Some(Self::Down),
            SquatStage::Up => Some(Self::Up),
        }
    }

    fn band(self, bands: &KneeFootBands) -> Band {
        match self {
            Self::Up => bands.up,
            Self::Middle => bands.middle,
            Self::Down => bands.down,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Placement {
    Unknown,
    Correct,
    TooTight,
    TooWide,
}

impl Placement {
    fn from_band(band: Band, ratio: f64) -> Self {
        match band.classify(ratio) {
            BandPosition::Below => Self::TooTight,
            BandPosition::Within => Self::Correct,
            BandPosition::Above => Self::TooWide,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Unknown => "unknown",
            Self::Correct => "correct",
            Self::TooTight => "too tight",
            Self::TooWide => "too wide",
        }
    }

    fn is_error(self) -> bool {
        matches!(self, Self::TooTight | Self::TooWide)
    }
}

/// Foot and knee placement of one frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlacementAnalysis {
    pub foot_shoulder_ratio: Option<f64>,
    pub knee_foot_ratio: Option<f64>,
    pub feet: Placement,
    pub knees: Placement,
}

impl PlacementAnalysis {
    fn unknown() -> Self {
        Self {
            foot_shoulder_ratio: None,
            knee_foot_ratio: None,
            feet: Placement::Unknown,
            knees: Placement::Unknown,
        }
    }
}

/// Classify a knee / foot ratio for a given phase.
pub fn classify_knee_placement(ratio: f64, phase: KneePhase, bands: &KneeFootBands) -> Placement {
    Placement::from_band(phase.band(bands), ratio)
}

/// Measure foot and knee placement.
///
/// Both foot indices and both knees must pass the visibility gate, or both
/// checks are unknown. The knee check is also unknown before the first
/// classified stage.
pub fn analyze_placement(pose: &PoseFrame, stage: SquatStage, config: &SquatConfig) -> PlacementAnalysis {
    let Some([left_foot, right_foot, left_knee, right_knee]) = pose.visible_points(
        [
            Landmark::LeftFootIndex,
            Landmark::RightFootIndex,
            Landmark::LeftKnee,
            Landmark::RightKnee,
        ],
        config.visibility_threshold,
    ) else {
        return PlacementAnalysis::unknown();
    };
    let (Some(left_shoulder), Some(right_shoulder)) = (
        pose.point(Landmark::LeftShoulder),
        pose.point(Landmark::RightShoulder),
    ) else {
        return PlacementAnalysis::unknown();
    };

    let shoulder_width = distance(left_shoulder, right_shoulder);
    let foot_width = distance(left_foot, right_foot);
    let knee_width = distance(left_knee, right_knee);

    let mut analysis = PlacementAnalysis::unknown();

    if shoulder_width > MIN_WIDTH {
        let ratio = round_to(foot_width / shoulder_width, 1);
        analysis.foot_shoulder_ratio = Some(ratio);
        analysis.feet = Placement::from_band(config.foot_shoulder_ratio, ratio);
    }

    if foot_width > MIN_WIDTH {
        let ratio = round_to(knee_width / foot_width, 1);
        analysis.knee_foot_ratio = Some(ratio);
        if let Some(phase) = KneePhase::from_stage(stage) {
            analysis.knees = classify_knee_placement(ratio, phase, &config.knee_foot_ratio);
        }
    }

    analysis
}

#[derive(Debug)]
pub struct SquatAnalyzer {
    config: SquatConfig,
    classifier: Arc<dyn Classifier>,
    features: FeatureExtractor,
    stage: SquatStage,
    counter: u32,
    feet_latch: TransitionLatch<ErrorCategory>,
    knee_latch: TransitionLatch<ErrorCategory>,
    log: EventLog,
}

impl SquatAnalyzer {
    pub fn new(registry: &ModelRegistry, config: SquatConfig) -> FormcheckResult<Self> {
        config.validate()?;
        let features = FeatureExtractor::new(SQUAT_LANDMARKS);
        let classifier = registry.require(ModelKey::SquatStage, features.input_len())?;
        Ok(Self {
            config,
            classifier,
            features,
            stage: SquatStage::Unset,
            counter: 0,
            feet_latch: TransitionLatch::new(),
            knee_latch: TransitionLatch::new(),
            log: EventLog::new(),
        })
    }

    pub fn counter(&self) -> u32 {
        self.counter
    }

    pub fn stage(&self) -> SquatStage {
        self.stage
    }

    fn analyze(
        &mut self,
        pose: &PoseFrame,
        frame: &FrameHandle,
        timestamp: TimestampMs,
    ) -> FormcheckResult<FrameAnalysis> {
        require_pose(pose)?;
        let row = self.features.extract(pose)?;
        let prediction = self.classifier.predict(&row)?.rounded();

        match prediction.confident(self.config.prediction_probability_threshold) {
            Some("down") => self.stage = SquatStage::Down,
            Some("up") if self.stage == SquatStage::Down => {
                self.stage = SquatStage::Up;
                self.counter += 1;
                tracing::debug!(counter = self.counter, "Squat counted");
            }
            _ => {}
        }

        let placement = analyze_placement(pose, self.stage, &self.config);

        let feet_error = match placement.feet {
            Placement::TooTight => Some(ErrorCategory::FeetTooTight),
            Placement::TooWide => Some(ErrorCategory::FeetTooWide),
            Placement::Unknown | Placement::Correct => None,
        };
        let knee_error = match placement.knees {
            Placement::TooTight => Some(ErrorCategory::KneeTooTight),
            Placement::TooWide => Some(ErrorCategory::KneeTooWide),
            Placement::Unknown | Placement::Correct => None,
        };

        for (latch, error) in [
            (&mut self.feet_latch, feet_error),
            (&mut self.knee_latch, knee_error),
        ] {
            if latch.observe(error) {
                if let Some(category) = error {
                    self.log
                        .push(ErrorEvent::new(category, frame.clone(), timestamp));
                }
            }
        }

        let active_errors: Vec<_> = feet_error.into_iter().chain(knee_error).collect();
        tracing::trace!(
            feet = placement.feet.name(),
            knees = placement.knees.name(),
            foot_shoulder_ratio = ?placement.foot_shoulder_ratio,
            knee_foot_ratio = ?placement.knee_foot_ratio,
            "Squat placement"
        );

        Ok(FrameAnalysis {
            stage: self.stage.name().to_string(),
            counters: self.counters(),
            has_error: placement.feet.is_error() || placement.knees.is_error(),
            active_errors,
        })
    }
}

impl ExerciseAnalyzer for SquatAnalyzer {
    fn kind(&self) -> ExerciseKind {
        ExerciseKind::Squat
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
        RepCounters::Single(self.counter)
    }

    fn reset(&mut self) {
        self.stage = SquatStage::Unset;
        self.counter = 0;
        self.feet_latch.reset();
        self.knee_latch.reset();
        self.log.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classifier::ScriptedClassifier;
    use crate::test_support::{full_pose, place};
    use formcheck_common::error::FormcheckError;

    /// Shoulders 0.2 apart, feet `feet` apart, knees `knees` apart.
    fn stance(feet: f64, knees: f64) -> PoseFrame {
        let mut pose = full_pose(0.9);
        place(&mut pose, Landmark::LeftShoulder, 0.4, 0.3, 0.9);
        place(&mut pose, Landmark::RightShoulder, 0.6, 0.3, 0.9);
        place(&mut pose, Landmark::LeftKnee, 0.5 - knees / 2.0, 0.7, 0.9);
        place(&mut pose, Landmark::RightKnee, 0.5 + knees / 2.0, 0.7, 0.9);
        place(&mut pose, Landmark::LeftFootIndex, 0.5 - feet / 2.0, 0.95, 0.9);
        place(&mut pose, Landmark::RightFootIndex, 0.5 + feet / 2.0, 0.95, 0.9);
        pose
    }

    fn analyzer(script: &[(&str, f64)]) -> SquatAnalyzer {
        let registry = ModelRegistry::new().with(
            ModelKey::SquatStage,
            Arc::new(ScriptedClassifier::from_pairs(script.iter().copied())),
        );
        SquatAnalyzer::new(&registry, SquatConfig::default()).unwrap()
    }

    #[test]
    fn test_foot_placement_ratio() {
        let config = SquatConfig::default();
        let tight = analyze_placement(&stance(0.18, 0.15), SquatStage::Unset, &config);
        assert_eq!(tight.foot_shoulder_ratio, Some(0.9));
        assert_eq!(tight.feet, Placement::TooTight);
        assert_eq!(tight.knees, Placement::Unknown);

        let wide = analyze_placement(&stance(0.6, 0.5), SquatStage::Down, &config);
        assert_eq!(wide.feet, Placement::TooWide);
        assert_eq!(wide.knee_foot_ratio, Some(0.8));
        assert_eq!(wide.knees, Placement::Correct);
    }

    #[test]
    fn test_ratio_rounding_at_band_edge() {
        // Knees 0.46 apart over feet 0.4 apart is 1.1499..., which stays
        // inside the down band once rounded.
        let edge = analyze_placement(&stance(0.4, 0.46), SquatStage::Down, &SquatConfig::default());
        assert_eq!(edge.knee_foot_ratio, Some(1.1));
        assert_eq!(edge.knees, Placement::Correct);
    }

    #[test]
    fn test_knee_events_debounced_through_analyzer() {
        let mut squat = analyzer(&[("down", 0.9); 5]);
        let frames = [
            stance(0.3, 0.36),
            stance(0.3, 0.36),
            stance(0.3, 0.25),
            stance(0.3, 0.36),
            stance(0.3, 0.36),
        ];
        let results: Vec<_> = frames
            .iter()
            .enumerate()
            .map(|(i, pose)| {
                squat
                    .detect(pose, &FrameHandle::keypoints_only(i as u64), i as u64 * 10)
                    .unwrap()
            })
            .collect();

        let has_error: Vec<_> = results.iter().map(|r| r.has_error).collect();
        assert_eq!(has_error, vec![true, true, false, true, true]);
        assert_eq!(results[0].active_errors, vec![ErrorCategory::KneeTooWide]);
        assert!(results[2].active_errors.is_empty());

        let events: Vec<_> = squat
            .events()
            .iter()
            .map(|e| (e.category, e.timestamp))
            .collect();
        assert_eq!(
            events,
            vec![(ErrorCategory::KneeTooWide, 0), (ErrorCategory::KneeTooWide, 30)]
        );
    }

    #[test]
    fn test_invalid_thresholds_rejected_at_construction() {
        let registry = ModelRegistry::new().with(
            ModelKey::SquatStage,
            Arc::new(ScriptedClassifier::from_pairs([("up", 0.9)])),
        );
        let config = SquatConfig {
            foot_shoulder_ratio: Band::new(2.8, 1.2),
            ..SquatConfig::default()
        };
        let err = SquatAnalyzer::new(&registry, config).unwrap_err();
        assert!(matches!(err, FormcheckError::Config { .. }));
    }

    #[test]
    fn test_low_visibility_is_unknown() {
        let mut pose = stance(0.18, 0.15);
        place(&mut pose, Landmark::RightKnee, 0.55, 0.7, 0.2);
        let analysis = analyze_placement(&pose, SquatStage::Down, &SquatConfig::default());
        assert_eq!(analysis, PlacementAnalysis::unknown());
    }

    #[test]
    fn test_knee_band_depends_on_phase() {
        let bands = KneeFootBands::default();
        assert_eq!(classify_knee_placement(0.6, KneePhase::Up, &bands), Placement::Correct);
        assert_eq!(classify_knee_placement(0.6, KneePhase::Middle, &bands), Placement::TooTight);
        assert_eq!(classify_knee_placement(1.1, KneePhase::Down, &bands), Placement::Correct);
        assert_eq!(classify_knee_placement(1.1, KneePhase::Up, &bands), Placement::TooWide);
    }

    #[test]
    fn test_counter_requires_down_then_up() {
        let mut squat = analyzer(&[
            ("up", 0.9),
            ("down", 0.9),
            ("down", 0.8),
            ("up", 0.65),
            ("up", 0.9),
            ("up", 0.9),
        ]);
        let pose = stance(0.3, 0.25);
        for i in 0..6 {
            squat.detect(&pose, &FrameHandle::keypoints_only(i), i * 33);
        }
        assert_eq!(squat.counter(), 1);
        assert_eq!(squat.stage(), SquatStage::Up);
    }

    #[test]
    fn test_confidence_rounding() {
        // 0.696 rounds to 0.70 and passes the 0.7 threshold.
        let mut squat = analyzer(&[("down", 0.696)]);
        squat.detect(&stance(0.3, 0.25), &FrameHandle::keypoints_only(0), 0);
        assert_eq!(squat.stage(), SquatStage::Down);
    }

    #[test]
    fn test_feet_events_debounced() {
        let mut squat = analyzer(&[("up", 0.1); 4]);
        let frames = [
            stance(0.18, 0.15),
            stance(0.18, 0.15),
            stance(0.3, 0.25),
            stance(0.18, 0.15),
        ];
        for (i, pose) in frames.iter().enumerate() {
            squat.detect(pose, &FrameHandle::keypoints_only(i as u64), i as u64 * 10);
        }
        let timestamps: Vec<_> = squat
            .events()
            .iter()
            .filter(|e| e.category == ErrorCategory::FeetTooTight)
            .map(|e| e.timestamp)
            .collect();
        assert_eq!(timestamps, vec![0, 30]);
        assert!(squat.events().iter().all(|e| e.rep_index.is_none()));
    }
}
