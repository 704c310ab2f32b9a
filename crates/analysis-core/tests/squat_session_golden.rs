use std::path::PathBuf;

use formcheck_analysis_core::{Analyzer, AnalysisConfig, ExerciseAnalyzer, ModelRegistry};
use formcheck_common::clock::FrameClock;
use formcheck_pose_model::event::ErrorCategory;
use formcheck_pose_model::exercise::ExerciseKind;
use formcheck_pose_model::frame::{parse_pose_stream, FrameHandle};
use formcheck_pose_model::report::RepCounters;

fn fixture_dir() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("..")
        .join("..")
        .join("fixtures")
        .join("squat-session")
}

#[test]
fn squat_fixture_session_is_stable() {
    let dir = fixture_dir();
    let registry = ModelRegistry::load_dir(&dir.join("models")).expect("fixture models should load");
    let mut analyzer = Analyzer::new(ExerciseKind::Squat, &registry, &AnalysisConfig::default())
        .expect("squat analyzer should build from fixture models");

    let content =
        std::fs::read_to_string(dir.join("poses.jsonl")).expect("fixture poses should be readable");
    let records = parse_pose_stream(&content).expect("fixture poses should parse");
    assert_eq!(records.len(), 24);

    let clock = FrameClock::new(30.0);
    let mut analyzed = 0;
    for (line, record) in records.iter().enumerate() {
        let Some(pose) = record.landmarks.as_ref().filter(|_| record.has_pose()) else {
            continue;
        };
        let index = record.frame.unwrap_or(line as u64);
        let timestamp = record.timestamp_ms.unwrap_or_else(|| clock.timestamp_ms(index));
        assert!(analyzer
            .detect(pose, &FrameHandle::keypoints_only(index), timestamp)
            .is_some());
        analyzed += 1;
    }

    assert_eq!(analyzed, 23);
    assert_eq!(analyzer.counters(), RepCounters::Single(2));

    let events: Vec<_> = analyzer
        .events()
        .iter()
        .map(|e| (e.category, e.timestamp))
        .collect();
    assert_eq!(events, vec![(ErrorCategory::FeetTooTight, 400)]);
}
