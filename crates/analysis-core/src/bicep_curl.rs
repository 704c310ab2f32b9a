//! Bicep curl analysis.
//!
//! Each arm runs its own angle-based state machine ([`ArmState`]): reps are
//! counted on the lowered-to-raised edge, a loose upper arm is reported once
//! per loose interval, and a rep whose deepest contraction stays above the
//! peak threshold is reported when the arm is lowered again.
//!
//! A whole-body posture classifier runs first on every frame. While it
//! reports leaning back, arm errors are suppressed for that frame and a
//! single "lean too far back" event marks the start of the interval.

use std::sync::Arc;

use formcheck_common::clock::TimestampMs;
use formcheck_common::error::FormcheckResult;
use formcheck_pose_model::event::{ErrorCategory, ErrorEvent};
use formcheck_pose_model::exercise::ExerciseKind;
use formcheck_pose_model::frame::{FrameHandle, PoseFrame};
use formcheck_pose_model::landmark::Side;
use formcheck_pose_model::report::RepCounters;

use crate::analyzer::{require_pose, soft_fail, ExerciseAnalyzer, FrameAnalysis};
use crate::classifier::Classifier;
use crate::config::BicepCurlConfig;
use crate::event_log::EventLog;
use crate::features::{FeatureExtractor, BICEP_CURL_POSTURE_LANDMARKS};
use crate::geometry::{angle, vertical_projection};
use crate::latch::TransitionLatch;
use crate::registry::{ModelKey, ModelRegistry};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArmStage {
    Down,
    Up,
}

impl ArmStage {
    pub fn name(self) -> &'static str {
        match self {
            Self::Down => "down",
            Self::Up => "up",
        }
    }
}

/// Angles measured for one arm in one frame (degrees).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ArmReading {
    /// Angle at the elbow between shoulder and wrist.
    pub curl_angle: f64,
    /// Angle between the upper arm and the vertical through the shoulder.
    pub upper_arm_angle: f64,
}

/// What one arm contributed to a frame.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ArmOutcome {
    /// `None` when the arm was not visible enough to measure.
    pub reading: Option<ArmReading>,
    pub events: Vec<ErrorEvent>,
}

/// Per-arm rep counter and error tracker.
#[derive(Debug, Clone)]
pub struct ArmState {
    side: Side,
    stage: ArmStage,
    counter: u32,
    loose_upper_arm: bool,
    /// Smallest curl angle seen while raised; infinite when no rep is tracked.
    peak_contraction_angle: f64,
    peak_contraction_frame: Option<FrameHandle>,
}

impl ArmState {
    pub fn new(side: Side) -> Self {
        Self {
            side,
            stage: ArmStage::Down,
            counter: 0,
            loose_upper_arm: false,
            peak_contraction_angle: f64::INFINITY,
            peak_contraction_frame: None,
        }
    }

    pub fn side(&self) -> Side {
        self.side
    }

    pub fn stage(&self) -> ArmStage {
        self.stage
    }

    pub fn counter(&self) -> u32 {
        self.counter
    }

    pub fn is_loose(&self) -> bool {
        self.loose_upper_arm
    }

    /// Advance this arm by one frame. With `errors_suppressed` the stage and
    /// counter still advance but no error is evaluated or emitted.
    pub fn analyze(
        &mut self,
        pose: &PoseFrame,
        frame: &FrameHandle,
        timestamp: TimestampMs,
        config: &BicepCurlConfig,
        errors_suppressed: bool,
    ) -> ArmOutcome {
        let side = self.side;
        let Some([shoulder, elbow, wrist]) = pose.points_above(
            [side.shoulder(), side.elbow(), side.wrist()],
            config.visibility_threshold,
        ) else {
            return ArmOutcome::default();
        };

        let curl_angle = angle(shoulder, elbow, wrist);
        if curl_angle > config.stage_down_threshold {
            self.stage = ArmStage::Down;
        } else if curl_angle < config.stage_up_threshold && self.stage == ArmStage::Down {
            self.stage = ArmStage::Up;
            self.counter += 1;
            tracing::debug!(side = ?side, counter = self.counter, "Curl counted");
        }

        let upper_arm_angle = angle(elbow, shoulder, vertical_projection(shoulder));
        let mut events = Vec::new();

        if !errors_suppressed {
            if upper_arm_angle > config.loose_upper_arm_angle_threshold {
                if !self.loose_upper_arm {
                    self.loose_upper_arm = true;
                    events.push(ErrorEvent::new(
                        ErrorCategory::LooseUpperArm,
                        frame.clone(),
                        timestamp,
                    ));
                }
            } else {
                self.loose_upper_arm = false;
            }
        }

        match self.stage {
            ArmStage::Up => {
                if curl_angle < self.peak_contraction_angle {
                    self.peak_contraction_angle = curl_angle;
                    self.peak_contraction_frame = Some(frame.clone());
                }
            }
            ArmStage::Down => {
                let peak_frame = self.peak_contraction_frame.take();
                if !errors_suppressed
                    && self.peak_contraction_angle.is_finite()
                    && self.peak_contraction_angle >= config.peak_contraction_threshold
                {
                    events.push(ErrorEvent::new(
                        ErrorCategory::PeakContraction,
                        peak_frame.unwrap_or_else(|| frame.clone()),
                        timestamp,
                    ));
                }
                self.peak_contraction_angle = f64::INFINITY;
            }
        }

        ArmOutcome {
            reading: Some(ArmReading {
                curl_angle,
                upper_arm_angle,
            }),
            events,
        }
    }

    pub fn reset(&mut self) {
        *self = Self::new(self.side);
    }
}

/// Result of the whole-body posture classifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StandPosture {
    Correct,
    LeaningBack,
}

impl StandPosture {
    pub fn name(self) -> &'static str {
        match self {
            Self::Correct => "correct",
            Self::LeaningBack => "lean too far back",
        }
    }
}

#[derive(Debug)]
pub struct BicepCurlAnalyzer {
    config: BicepCurlConfig,
    classifier: Arc<dyn Classifier>,
    features: FeatureExtractor,
    left: ArmState,
    right: ArmState,
    stand_posture: StandPosture,
    lean_latch: TransitionLatch<ErrorCategory>,
    log: EventLog,
}

impl BicepCurlAnalyzer {
    pub fn new(registry: &ModelRegistry, config: BicepCurlConfig) -> FormcheckResult<Self> {
        config.validate()?;
        let features = FeatureExtractor::new(BICEP_CURL_POSTURE_LANDMARKS);
        let classifier = registry.require(ModelKey::BicepCurlPosture, features.input_len())?;
        Ok(Self {
            config,
            classifier,
            features,
            left: ArmState::new(Side::Left),
            right: ArmState::new(Side::Right),
            stand_posture: StandPosture::Correct,
            lean_latch: TransitionLatch::new(),
            log: EventLog::new(),
        })
    }

    pub fn left_arm(&self) -> &ArmState {
        &self.left
    }

    pub fn right_arm(&self) -> &ArmState {
        &self.right
    }

    /// `(left, right)` repetition counts.
    pub fn counters_by_side(&self) -> (u32, u32) {
        (self.left.counter(), self.right.counter())
    }

    pub fn stand_posture(&self) -> StandPosture {
        self.stand_posture
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

        // Below the threshold the previous posture holds.
        match prediction.confident(self.config.posture_error_threshold) {
            Some("C") => self.stand_posture = StandPosture::Correct,
            Some("L") => self.stand_posture = StandPosture::LeaningBack,
            _ => {}
        }
        let leaning_back = self.stand_posture == StandPosture::LeaningBack;

        let left = self
            .left
            .analyze(pose, frame, timestamp, &self.config, leaning_back);
        let right = self
            .right
            .analyze(pose, frame, timestamp, &self.config, leaning_back);

        let mut active_errors = Vec::new();
        let loose = !leaning_back
            && ((left.reading.is_some() && self.left.is_loose())
                || (right.reading.is_some() && self.right.is_loose()));
        if loose {
            active_errors.push(ErrorCategory::LooseUpperArm);
        }
        let peak_missed = left
            .events
            .iter()
            .chain(&right.events)
            .any(|e| e.category == ErrorCategory::PeakContraction);
        if peak_missed {
            active_errors.push(ErrorCategory::PeakContraction);
        }

        self.log.extend(left.events);
        self.log.extend(right.events);

        let lean = leaning_back.then_some(ErrorCategory::LeanTooFarBack);
        if self.lean_latch.observe(lean) {
            self.log.push(ErrorEvent::new(
                ErrorCategory::LeanTooFarBack,
                frame.clone(),
                timestamp,
            ));
        }
        if leaning_back {
            active_errors.push(ErrorCategory::LeanTooFarBack);
        }

        Ok(FrameAnalysis {
            stage: self.stand_posture.name().to_string(),
            counters: self.counters(),
            has_error: !active_errors.is_empty(),
            active_errors,
        })
    }
}

impl ExerciseAnalyzer for BicepCurlAnalyzer {
    fn kind(&self) -> ExerciseKind {
        ExerciseKind::BicepCurl
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
        RepCounters::Bilateral {
            left_counter: self.left.counter(),
            right_counter: self.right.counter(),
        }
    }

    fn reset(&mut self) {
        self.left.reset();
        self.right.reset();
        self.stand_posture = StandPosture::Correct;
        self.lean_latch.reset();
        self.log.clear();
    }
}
