//! Lunge analysis.
//!
//! A stage classifier (`I`nit, `M`id, `D`own) drives the rep counter. While
//! down, a second classifier checks knee-over-toe (`L` incorrect, `C`
//! correct), and when that is not active both knee angles are checked
//! against a band. Both error categories fire at most once per rep.

use std::sync::Arc;

use formcheck_common::clock::TimestampMs;
use formcheck_common::error::FormcheckResult;
use formcheck_pose_model::event::{ErrorCategory, ErrorEvent};
use formcheck_pose_model::exercise::ExerciseKind;
use formcheck_pose_model::frame::{FrameHandle, PoseFrame};
use formcheck_pose_model::landmark::Side;
use formcheck_pose_model::report::RepCounters;

use crate::analyzer::{require_pose, soft_fail, ExerciseAnalyzer, FrameAnalysis};
use crate::classifier::{Classifier, Prediction};
use crate::config::{Band, LungeConfig};
use crate::event_log::EventLog;
use crate::features::{FeatureExtractor, LUNGE_LANDMARKS};
use crate::geometry::angle;
use crate::registry::{ModelKey, ModelRegistry};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LungeStage {
    Unset,
    Init,
    Mid,
    Down,
}

impl LungeStage {
    pub fn name(self) -> &'static str {
        match self {
            Self::Unset => "",
            Self::Init => "init",
            Self::Mid => "mid",
            Self::Down => "down",
        }
    }
}

/// Knee angles of one frame (degrees).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct KneeAngles {
    pub left: f64,
    pub right: f64,
}

impl KneeAngles {
    /// Measure both knees; `None` if any hip, knee or ankle is not visible.
    pub fn measure(pose: &PoseFrame, visibility_threshold: f64) -> Option<Self> {
        let knee = |side: Side| {
            pose.visible_points([side.hip(), side.knee(), side.ankle()], visibility_threshold)
                .map(|[hip, knee, ankle]| angle(hip, knee, ankle))
        };
        Some(Self {
            left: knee(Side::Left)?,
            right: knee(Side::Right)?,
        })
    }

    pub fn within(&self, band: Band) -> bool {
        band.contains(self.left) && band.contains(self.right)
    }
}

#[derive(Debug)]
pub struct LungeAnalyzer {
    config: LungeConfig,
    stage_classifier: Arc<dyn Classifier>,
    error_classifier: Arc<dyn Classifier>,
    features: FeatureExtractor,
    stage: LungeStage,
    counter: u32,
    knee_over_toe: bool,
    log: EventLog,
}

impl LungeAnalyzer {
    pub fn new(registry: &ModelRegistry, config: LungeConfig) -> FormcheckResult<Self> {
        config.validate()?;
        let features = FeatureExtractor::new(LUNGE_LANDMARKS);
        let stage_classifier = registry.require(ModelKey::LungeStage, features.input_len())?;
        let error_classifier =
            registry.require(ModelKey::LungeKneeOverToe, features.input_len())?;
        Ok(Self {
            config,
            stage_classifier,
            error_classifier,
            features,
            stage: LungeStage::Unset,
            counter: 0,
            knee_over_toe: false,
            log: EventLog::new(),
        })
    }

    pub fn counter(&self) -> u32 {
        self.counter
    }

    pub fn stage(&self) -> LungeStage {
        self.stage
    }

    pub fn knee_over_toe_active(&self) -> bool {
        self.knee_over_toe
    }

    fn next_stage(&self, prediction: &Prediction) -> (LungeStage, bool) {
        match prediction.confident(self.config.prediction_probability_threshold) {
            Some("I") => (LungeStage::Init, false),
            Some("M") => (LungeStage::Mid, false),
            Some("D") => (
                LungeStage::Down,
                matches!(self.stage, LungeStage::Init | LungeStage::Mid),
            ),
            _ => (self.stage, false),
        }
    }

    fn record_once_per_rep(&mut self, category: ErrorCategory, frame: &FrameHandle, timestamp: TimestampMs) {
        if !self.log.fired_for_rep(category, self.counter) {
            self.log
                .push(ErrorEvent::for_rep(category, frame.clone(), timestamp, self.counter));
        }
    }

    fn analyze(
        &mut self,
        pose: &PoseFrame,
        frame: &FrameHandle,
        timestamp: TimestampMs,
    ) -> FormcheckResult<FrameAnalysis> {
        require_pose(pose)?;
        let row = self.features.extract(pose)?;
        let stage_prediction = self.stage_classifier.predict(&row)?.rounded();
        let (stage, counted) = self.next_stage(&stage_prediction);

        let error_prediction = if stage == LungeStage::Down {
            Some(self.error_classifier.predict(&row)?.rounded())
        } else {
            None
        };

        if counted {
            self.counter += 1;
            tracing::debug!(counter = self.counter, "Lunge counted");
        }
        self.stage = stage;

        let mut active_errors = Vec::new();

        match error_prediction {
            Some(prediction) => {
                match prediction.confident(self.config.prediction_probability_threshold) {
                    Some("L") => {
                        self.knee_over_toe = true;
                        self.record_once_per_rep(ErrorCategory::KneeOverToe, frame, timestamp);
                    }
                    Some("C") => self.knee_over_toe = false,
                    _ => {}
                }
            }
            None => self.knee_over_toe = false,
        }

        if self.knee_over_toe {
            active_errors.push(ErrorCategory::KneeOverToe);
        } else if self.stage == LungeStage::Down {
            let angles = KneeAngles::measure(pose, self.config.visibility_threshold);
            if let Some(angles) = angles.filter(|a| !a.within(self.config.knee_angle)) {
                tracing::trace!(left = angles.left, right = angles.right, "Knee angle out of range");
                active_errors.push(ErrorCategory::KneeAngle);
                self.record_once_per_rep(ErrorCategory::KneeAngle, frame, timestamp);
            }
        }

        Ok(FrameAnalysis {
            stage: self.stage.name().to_string(),
            counters: self.counters(),
            has_error: !active_errors.is_empty(),
            active_errors,
        })
    }
}

impl ExerciseAnalyzer for LungeAnalyzer {
    fn kind(&self) -> ExerciseKind {
        ExerciseKind::Lunge
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
        self.stage = LungeStage::Unset;
        self.counter = 0;
        self.knee_over_toe = false;
        self.log.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classifier::ScriptedClassifier;
    use crate::test_support::{full_pose, place};
    use formcheck_pose_model::landmark::Landmark;

    /// Pose with both knees bent to `knee` degrees.
    fn kneeling(knee: f64) -> PoseFrame {
        let mut pose = full_pose(0.9);
        let bend = knee.to_radians();
        for (side, x) in [(Side::Left, 0.4), (Side::Right, 0.6)] {
            place(&mut pose, side.hip(), x, 0.5, 0.9);
            place(&mut pose, side.knee(), x, 0.7, 0.9);
            // Rotate the knee -> hip direction (straight up) by `bend`.
            place(
                &mut pose,
                side.ankle(),
                x + 0.2 * bend.sin(),
                0.7 - 0.2 * bend.cos(),
                0.9,
            );
        }
        pose
    }

    fn analyzer(stages: &[(&str, f64)], errors: &[(&str, f64)]) -> LungeAnalyzer {
        let registry = ModelRegistry::new()
            .with(
                ModelKey::LungeStage,
                Arc::new(ScriptedClassifier::from_pairs(stages.iter().copied())),
            )
            .with(
                ModelKey::LungeKneeOverToe,
                Arc::new(ScriptedClassifier::from_pairs(errors.iter().copied())),
            );
        LungeAnalyzer::new(&registry, LungeConfig::default()).unwrap()
    }

    fn run(lunge: &mut LungeAnalyzer, poses: &[PoseFrame]) -> Vec<Option<FrameAnalysis>> {
        poses
            .iter()
            .enumerate()
            .map(|(i, pose)| lunge.detect(pose, &FrameHandle::keypoints_only(i as u64), i as u64 * 100))
            .collect()
    }

    #[test]
    fn test_knee_angle_measure() {
        let angles = KneeAngles::measure(&kneeling(90.0), 0.6).unwrap();
        assert!((angles.left - 90.0).abs() < 1e-6);
        assert!((angles.right - 90.0).abs() < 1e-6);

        let mut hidden = kneeling(90.0);
        place(&mut hidden, Landmark::LeftAnkle, 0.5, 0.9, 0.3);
        assert!(KneeAngles::measure(&hidden, 0.6).is_none());
    }

    #[test]
    fn test_counter_follows_stage_sequence() {
        let mut lunge = analyzer(
            &[("I", 0.9), ("M", 0.9), ("D", 0.9), ("M", 0.9), ("D", 0.9)],
            &[("C", 0.9), ("C", 0.9)],
        );
        let poses = vec![kneeling(90.0); 5];
        let results = run(&mut lunge, &poses);

        let counters: Vec<_> = results
            .iter()
            .map(|r| r.as_ref().unwrap().counters.total())
            .collect();
        assert_eq!(counters, vec![0, 0, 1, 1, 2]);
        assert!(lunge.events().is_empty());
    }

    #[test]
    fn test_down_from_unset_does_not_count() {
        let mut lunge = analyzer(&[("D", 0.9), ("D", 0.9)], &[("C", 0.9), ("C", 0.9)]);
        run(&mut lunge, &vec![kneeling(90.0); 2]);
        assert_eq!(lunge.counter(), 0);
        assert_eq!(lunge.stage(), LungeStage::Down);
    }

    #[test]
    fn test_knee_over_toe_once_per_rep_and_excludes_knee_angle() {
        let mut lunge = analyzer(
            &[("M", 0.9), ("D", 0.9), ("D", 0.9), ("D", 0.9), ("M", 0.9), ("D", 0.9)],
            &[("L", 0.9), ("L", 0.9), ("C", 0.9), ("L", 0.9)],
        );
        // Knee angle 150 is out of range on every frame.
        let results = run(&mut lunge, &vec![kneeling(150.0); 6]);

        let events: Vec<_> = lunge
            .events()
            .iter()
            .map(|e| (e.category, e.rep_index))
            .collect();
        assert_eq!(
            events,
            vec![
                (ErrorCategory::KneeOverToe, Some(1)),
                (ErrorCategory::KneeAngle, Some(1)),
                (ErrorCategory::KneeOverToe, Some(2)),
            ]
        );

        let second = results[2].as_ref().unwrap();
        assert_eq!(second.active_errors, vec![ErrorCategory::KneeOverToe]);
        // Last frame is down with `L`.
        assert!(lunge.knee_over_toe_active());
        let fourth = results[3].as_ref().unwrap();
        assert_eq!(fourth.active_errors, vec![ErrorCategory::KneeAngle]);
        assert!(!results[4].as_ref().unwrap().has_error);
    }

    #[test]
    fn test_error_classifier_failure_leaves_state_untouched() {
        let mut lunge = analyzer(&[("I", 0.9), ("D", 0.9)], &[]);
        let results = run(&mut lunge, &vec![kneeling(90.0); 2]);
        assert!(results[1].is_none());
        assert_eq!(lunge.stage(), LungeStage::Init);
        assert_eq!(lunge.counter(), 0);
    }
}
