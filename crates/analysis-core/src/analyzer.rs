//! The analyzer capability interface and the closed set of analyzers.

use serde::Serialize;

use formcheck_common::clock::TimestampMs;
use formcheck_common::error::{FormcheckError, FormcheckResult};
use formcheck_pose_model::event::{ErrorCategory, ErrorEvent};
use formcheck_pose_model::exercise::ExerciseKind;
use formcheck_pose_model::frame::{FrameHandle, PoseFrame};
use formcheck_pose_model::report::{AnalysisResults, RepCounters};

use crate::bicep_curl::BicepCurlAnalyzer;
use crate::config::AnalysisConfig;
use crate::event_log::{EventLog, FrameStore};
use crate::lunge::LungeAnalyzer;
use crate::plank::PlankAnalyzer;
use crate::registry::ModelRegistry;
use crate::squat::SquatAnalyzer;

/// Outcome of one analyzed frame, for display by downstream consumers.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FrameAnalysis {
    /// Current stage name (e.g. `down`, `low back`, `unknown`).
    pub stage: String,
    pub counters: RepCounters,
    /// Error categories active in this frame.
    pub active_errors: Vec<ErrorCategory>,
    pub has_error: bool,
}

/// Uniform interface over the per-exercise state machines.
///
/// One analyzer processes one video at a time: `detect` once per frame in
/// timestamp order, then `handle_results`, then `reset` before the next
/// video.
pub trait ExerciseAnalyzer {
    fn kind(&self) -> ExerciseKind;

    /// Analyze one frame.
    ///
    /// Returns `None` when the frame had to be skipped (missing landmark,
    /// classifier failure). A skipped frame leaves the state untouched.
    fn detect(
        &mut self,
        pose: &PoseFrame,
        frame: &FrameHandle,
        timestamp: TimestampMs,
    ) -> Option<FrameAnalysis>;

    fn event_log(&self) -> &EventLog;

    fn event_log_mut(&mut self) -> &mut EventLog;

    fn counters(&self) -> RepCounters;

    /// Return to the initial state and clear the event log. Loaded
    /// classifiers are kept.
    fn reset(&mut self);

    fn events(&self) -> &[ErrorEvent] {
        self.event_log().as_slice()
    }

    /// Persist evidence frames under names derived from `video` and return
    /// the events with their counters.
    fn handle_results(&mut self, video: &str, store: &dyn FrameStore) -> AnalysisResults {
        self.event_log_mut().persist(video, store);
        AnalysisResults {
            details: self.events().to_vec(),
            counter: self.counters(),
        }
    }
}

/// Turn a per-frame failure into a logged skip.
pub(crate) fn soft_fail(
    kind: ExerciseKind,
    frame: &FrameHandle,
    result: FormcheckResult<FrameAnalysis>,
) -> Option<FrameAnalysis> {
    match result {
        Ok(analysis) => Some(analysis),
        Err(e) => {
            tracing::warn!(
                exercise = kind.name(),
                frame = frame.index,
                error = %e,
                "Skipping frame"
            );
            None
        }
    }
}

/// One analyzer per supported exercise.
#[derive(Debug)]
pub enum Analyzer {
    Plank(PlankAnalyzer),
    BicepCurl(BicepCurlAnalyzer),
    Squat(SquatAnalyzer),
    Lunge(LungeAnalyzer),
}

impl Analyzer {
    /// Build the analyzer for `kind`, fetching its classifiers from
    /// `registry`.
    ///
    /// Fails if thresholds are invalid or a classifier is missing or
    /// incompatible; no partially built analyzer is ever returned.
    pub fn new(
        kind: ExerciseKind,
        registry: &ModelRegistry,
        config: &AnalysisConfig,
    ) -> FormcheckResult<Self> {
        config.validate()?;
        let analyzer = match kind {
            ExerciseKind::Plank => Self::Plank(PlankAnalyzer::new(registry, config.plank.clone())?),
            ExerciseKind::BicepCurl => {
                Self::BicepCurl(BicepCurlAnalyzer::new(registry, config.bicep_curl.clone())?)
            }
            ExerciseKind::Squat => Self::Squat(SquatAnalyzer::new(registry, config.squat.clone())?),
            ExerciseKind::Lunge => Self::Lunge(LungeAnalyzer::new(registry, config.lunge.clone())?),
        };
        tracing::info!(exercise = kind.name(), "Analyzer ready");
        Ok(analyzer)
    }

    /// Repetitions counted so far; `None` for exercises without reps.
    pub fn counter(&self) -> Option<u32> {
        match self {
            Self::Plank(_) => None,
            Self::BicepCurl(a) => {
                let (left, right) = a.counters_by_side();
                Some(left + right)
            }
            Self::Squat(a) => Some(a.counter()),
            Self::Lunge(a) => Some(a.counter()),
        }
    }

    fn inner(&self) -> &dyn ExerciseAnalyzer {
        match self {
            Self::Plank(a) => a,
            Self::BicepCurl(a) => a,
            Self::Squat(a) => a,
            Self::Lunge(a) => a,
        }
    }

    fn inner_mut(&mut self) -> &mut dyn ExerciseAnalyzer {
        match self {
            Self::Plank(a) => a,
            Self::BicepCurl(a) => a,
            Self::Squat(a) => a,
            Self::Lunge(a) => a,
        }
    }
}

impl ExerciseAnalyzer for Analyzer {
    fn kind(&self) -> ExerciseKind {
        self.inner().kind()
    }

    fn detect(
        &mut self,
        pose: &PoseFrame,
        frame: &FrameHandle,
        timestamp: TimestampMs,
    ) -> Option<FrameAnalysis> {
        self.inner_mut().detect(pose, frame, timestamp)
    }

    fn event_log(&self) -> &EventLog {
        self.inner().event_log()
    }

    fn event_log_mut(&mut self) -> &mut EventLog {
        self.inner_mut().event_log_mut()
    }

    fn counters(&self) -> RepCounters {
        self.inner().counters()
    }

    fn reset(&mut self) {
        self.inner_mut().reset();
        tracing::info!(exercise = self.kind().name(), "Analyzer reset");
    }
}

/// Frame-level pose guard shared by analyzers.
pub(crate) fn require_pose(pose: &PoseFrame) -> FormcheckResult<()> {
    if pose.is_empty() {
        Err(FormcheckError::MissingPose)
    } else {
        Ok(())
    }
}
