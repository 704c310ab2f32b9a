//! Append-only per-frame trace writer and report output.

use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use serde::Serialize;

use formcheck_analysis_core::analyzer::FrameAnalysis;
use formcheck_common::clock::TimestampMs;
use formcheck_common::error::{FormcheckError, FormcheckResult};
use formcheck_pose_model::exercise::ExerciseKind;
use formcheck_pose_model::report::AnalysisReport;

/// First line of a trace file, written as a `#` comment.
#[derive(Debug, Clone, Serialize)]
pub struct TraceHeader {
    pub schema_version: String,
    pub exercise: ExerciseKind,
    pub video: String,
    pub started_at: String,
}

impl TraceHeader {
    pub fn new(exercise: ExerciseKind, video: impl Into<String>) -> Self {
        Self {
            schema_version: "1.0".to_string(),
            exercise,
            video: video.into(),
            started_at: chrono::Utc::now().to_rfc3339(),
        }
    }
}

#[derive(Serialize)]
struct TraceLine<'a> {
    frame: u64,
    t: TimestampMs,
    #[serde(flatten)]
    analysis: &'a FrameAnalysis,
}

/// Writes one JSONL line per analyzed frame.
pub struct TraceWriter {
    writer: BufWriter<File>,
    path: PathBuf,
    frames_written: u64,
}

impl TraceWriter {
    /// Create (truncating) a trace file and write its header line.
    pub fn new(path: PathBuf, header: &TraceHeader) -> FormcheckResult<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let file = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(true)
            .open(&path)?;
        let mut writer = BufWriter::new(file);

        let header_json = serde_json::to_string(header)?;
        writeln!(writer, "# {header_json}")
            .map_err(|e| FormcheckError::persistence(format!("Failed to write trace header: {e}")))?;

        Ok(Self {
            writer,
            path,
            frames_written: 0,
        })
    }

    pub fn write_frame(
        &mut self,
        frame: u64,
        timestamp: TimestampMs,
        analysis: &FrameAnalysis,
    ) -> FormcheckResult<()> {
        let line = TraceLine {
            frame,
            t: timestamp,
            analysis,
        };
        let json = serde_json::to_string(&line)?;
        writeln!(self.writer, "{json}")
            .map_err(|e| FormcheckError::persistence(format!("Failed to write trace line: {e}")))?;
        self.frames_written += 1;

        if self.frames_written % 500 == 0 {
            self.flush()?;
        }
        Ok(())
    }

    pub fn flush(&mut self) -> FormcheckResult<()> {
        self.writer
            .flush()
            .map_err(|e| FormcheckError::persistence(format!("Failed to flush trace: {e}")))
    }

    pub fn frames_written(&self) -> u64 {
        self.frames_written
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for TraceWriter {
    fn drop(&mut self) {
        let _ = self.flush();
    }
}

/// Write `report` as pretty JSON, creating parent directories.
pub fn write_report(path: &Path, report: &AnalysisReport) -> FormcheckResult<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    let json = serde_json::to_string_pretty(report)?;
    std::fs::write(path, json)?;
    tracing::info!(path = %path.display(), events = report.details.len(), "Report written");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use formcheck_pose_model::event::ErrorCategory;
    use formcheck_pose_model::report::{AnalysisResults, RepCounters};

    #[test]
    fn test_trace_writer_lines() {
        let dir = std::env::temp_dir().join("formcheck_test_trace");
        let _ = std::fs::remove_dir_all(&dir);
        let path = dir.join("trace.jsonl");

        {
            let header = TraceHeader::new(ExerciseKind::Lunge, "lunge.mp4");
            let mut writer = TraceWriter::new(path.clone(), &header).unwrap();
            let analysis = FrameAnalysis {
                stage: "down".to_string(),
                counters: RepCounters::Single(1),
                active_errors: vec![ErrorCategory::KneeAngle],
                has_error: true,
            };
            writer.write_frame(12, 400, &analysis).unwrap();
            writer.write_frame(13, 433, &analysis).unwrap();
            assert_eq!(writer.frames_written(), 2);
        }

        let content = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines.len(), 3);
        assert!(lines[0].starts_with("# "));

        let first: serde_json::Value = serde_json::from_str(lines[1]).unwrap();
        assert_eq!(first["frame"], 12);
        assert_eq!(first["t"], 400);
        assert_eq!(first["stage"], "down");
        assert_eq!(first["counters"], 1);
        assert_eq!(first["active_errors"][0], "knee angle");

        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_write_report() {
        let dir = std::env::temp_dir().join("formcheck_test_report");
        let _ = std::fs::remove_dir_all(&dir);
        let path = dir.join("out").join("report.json");

        let report = AnalysisReport::new(
            ExerciseKind::BicepCurl,
            "curl.mp4",
            AnalysisResults {
                details: Vec::new(),
                counter: RepCounters::Bilateral {
                    left_counter: 3,
                    right_counter: 2,
                },
            },
        );
        write_report(&path, &report).unwrap();

        let value: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(value["exercise"], "bicep_curl");
        assert_eq!(value["counter"]["left_counter"], 3);

        std::fs::remove_dir_all(&dir).ok();
    }
}
