//! Analyze a recorded pose stream for one exercise.

use std::path::{Path, PathBuf};

use tokio::io::{AsyncBufReadExt, BufReader};

use formcheck_analysis_core::{Analyzer, ExerciseAnalyzer, ModelRegistry};
use formcheck_common::clock::{FrameClock, TimestampGuard};
use formcheck_pose_model::exercise::ExerciseKind;
use formcheck_pose_model::frame::{parse_pose_line, FrameHandle, PoseRecord};
use formcheck_pose_model::report::AnalysisReport;
use formcheck_storage::writer::TraceHeader;
use formcheck_storage::{write_report, DirectoryFrameStore, TraceWriter};

pub struct AnalyzeOptions {
    pub exercise: ExerciseKind,
    pub poses: PathBuf,
    pub video_name: Option<String>,
    pub models_dir: PathBuf,
    pub images_dir: PathBuf,
    pub thresholds: Option<PathBuf>,
    pub fps: f64,
    pub output: Option<PathBuf>,
    pub trace: Option<PathBuf>,
}

/// Frame handle for a record, resolving relative image paths against the
/// stream's directory.
fn frame_handle(record: &PoseRecord, index: u64, stream_dir: &Path) -> FrameHandle {
    match &record.image {
        Some(image) if image.is_absolute() => FrameHandle::file(index, image.clone()),
        Some(image) => FrameHandle::file(index, stream_dir.join(image)),
        None => FrameHandle::keypoints_only(index),
    }
}

pub async fn run(opts: AnalyzeOptions) -> anyhow::Result<()> {
    let thresholds = super::load_thresholds(opts.thresholds.as_deref())?;
    let registry = ModelRegistry::load_dir(&opts.models_dir)
        .map_err(|e| anyhow::anyhow!("Failed to load models: {e}"))?;
    let mut analyzer = Analyzer::new(opts.exercise, &registry, &thresholds)
        .map_err(|e| anyhow::anyhow!("Cannot analyze {}: {e}", opts.exercise))?;

    let video = opts.video_name.clone().unwrap_or_else(|| {
        opts.poses
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "video".to_string())
    });
    let stream_dir = opts
        .poses
        .parent()
        .map(Path::to_path_buf)
        .unwrap_or_default();

    let file = tokio::fs::File::open(&opts.poses)
        .await
        .map_err(|e| anyhow::anyhow!("Cannot open {}: {e}", opts.poses.display()))?;
    let mut lines = BufReader::new(file).lines();

    let mut trace = match &opts.trace {
        Some(path) => Some(TraceWriter::new(
            path.clone(),
            &TraceHeader::new(opts.exercise, video.clone()),
        )?),
        None => None,
    };

    tracing::info!(
        exercise = opts.exercise.name(),
        video = %video,
        poses = %opts.poses.display(),
        "Analysis started"
    );

    let clock = FrameClock::new(opts.fps);
    let mut guard = TimestampGuard::new();
    let mut record_index: u64 = 0;
    let mut analyzed: u64 = 0;
    let mut skipped: u64 = 0;

    while let Some(line) = lines.next_line().await? {
        let record = match parse_pose_line(&line) {
            None => continue,
            Some(Ok(record)) => record,
            Some(Err(e)) => {
                tracing::warn!(line = record_index, error = %e, "Unreadable pose record");
                record_index += 1;
                skipped += 1;
                continue;
            }
        };

        let index = record.frame.unwrap_or(record_index);
        record_index += 1;
        let timestamp = record
            .timestamp_ms
            .unwrap_or_else(|| clock.timestamp_ms(index));

        if !guard.accept(timestamp) {
            skipped += 1;
            continue;
        }
        let Some(pose) = record.landmarks.as_ref().filter(|_| record.has_pose()) else {
            tracing::debug!(frame = index, "No pose detected, frame skipped");
            skipped += 1;
            continue;
        };

        let handle = frame_handle(&record, index, &stream_dir);
        match analyzer.detect(pose, &handle, timestamp) {
            Some(analysis) => {
                analyzed += 1;
                if let Some(trace) = trace.as_mut() {
                    trace.write_frame(index, timestamp, &analysis)?;
                }
            }
            None => skipped += 1,
        }
    }

    if let Some(mut trace) = trace {
        trace.flush()?;
        println!(
            "  Trace: {} frames -> {}",
            trace.frames_written(),
            trace.path().display()
        );
    }

    let store = DirectoryFrameStore::new(&opts.images_dir);
    let results = analyzer.handle_results(&video, &store);
    analyzer.reset();

    let mut report = AnalysisReport::new(opts.exercise, video, results);
    report.frames_analyzed = analyzed;
    report.frames_skipped = skipped;

    let frames_saved = report
        .details
        .iter()
        .filter_map(|event| event.frame.persisted_name())
        .count();
    tracing::info!(
        analyzed,
        skipped,
        events = report.details.len(),
        frames_saved,
        "Analysis finished"
    );
    if opts.exercise.counts_reps() {
        eprintln!("  Reps: {}", report.counter.total());
    }

    match &opts.output {
        Some(path) => {
            write_report(path, &report)
                .map_err(|e| anyhow::anyhow!("Failed to write report: {e}"))?;
            println!("Report written to: {}", path.display());
        }
        None => println!("{}", serde_json::to_string_pretty(&report)?),
    }

    Ok(())
}
