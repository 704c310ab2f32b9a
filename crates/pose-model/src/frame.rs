//! Per-frame pose data.
//!
//! A `PoseFrame` is read-only input to an analyzer: one keypoint per
//! detected landmark. The image the keypoints came from travels alongside
//! as an opaque `FrameHandle` that analyzers clone into error events
//! without ever inspecting it.

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use formcheck_common::clock::TimestampMs;

use crate::landmark::Landmark;

/// A 2D normalized point.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Point2D {
    pub x: f64,
    pub y: f64,
}

impl Point2D {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// A single landmark detection.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Keypoint {
    /// Normalized horizontal position.
    pub x: f64,
    /// Normalized vertical position (downward).
    pub y: f64,
    /// Relative depth; zero when the estimator is 2D only.
    #[serde(default)]
    pub z: f64,
    /// Estimator confidence that the joint is visible, in `[0, 1]`.
    pub visibility: f64,
}

impl Keypoint {
    pub fn new(x: f64, y: f64, z: f64, visibility: f64) -> Self {
        Self {
            x,
            y,
            z,
            visibility,
        }
    }

    /// Planar position, dropping depth.
    pub fn point(&self) -> Point2D {
        Point2D::new(self.x, self.y)
    }
}

/// All keypoints detected in one frame.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PoseFrame {
    landmarks: BTreeMap<Landmark, Keypoint>,
}

impl PoseFrame {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a frame from estimator output in landmark index order.
    /// Extra entries beyond the known landmark set are ignored.
    pub fn from_indexed(keypoints: &[Keypoint]) -> Self {
        let landmarks = keypoints
            .iter()
            .enumerate()
            .filter_map(|(i, kp)| Landmark::from_index(i).map(|lm| (lm, *kp)))
            .collect();
        Self { landmarks }
    }

    /// Builder-style insert.
    pub fn with(mut self, landmark: Landmark, keypoint: Keypoint) -> Self {
        self.landmarks.insert(landmark, keypoint);
        self
    }

    pub fn insert(&mut self, landmark: Landmark, keypoint: Keypoint) {
        self.landmarks.insert(landmark, keypoint);
    }

    pub fn get(&self, landmark: Landmark) -> Option<&Keypoint> {
        self.landmarks.get(&landmark)
    }

    pub fn is_empty(&self) -> bool {
        self.landmarks.is_empty()
    }

    pub fn len(&self) -> usize {
        self.landmarks.len()
    }

    /// 2D position of `landmark`, if present.
    pub fn point(&self, landmark: Landmark) -> Option<Point2D> {
        self.get(landmark).map(Keypoint::point)
    }

    /// Positions of `landmarks`, only if all of them have visibility at or
    /// above `threshold`.
    pub fn visible_points<const N: usize>(
        &self,
        landmarks: [Landmark; N],
        threshold: f64,
    ) -> Option<[Point2D; N]> {
        self.gated_points(landmarks, |visibility| visibility >= threshold)
    }

    /// Like [`visible_points`](Self::visible_points), but a visibility equal
    /// to `threshold` fails the gate.
    pub fn points_above<const N: usize>(
        &self,
        landmarks: [Landmark; N],
        threshold: f64,
    ) -> Option<[Point2D; N]> {
        self.gated_points(landmarks, |visibility| visibility > threshold)
    }

    fn gated_points<const N: usize>(
        &self,
        landmarks: [Landmark; N],
        passes: impl Fn(f64) -> bool,
    ) -> Option<[Point2D; N]> {
        let mut points = [Point2D::default(); N];
        for (slot, landmark) in points.iter_mut().zip(landmarks) {
            let keypoint = self.get(landmark).filter(|kp| passes(kp.visibility))?;
            *slot = keypoint.point();
        }
        Some(points)
    }
}

/// Where the image behind a frame handle lives.
#[derive(Debug, Clone, PartialEq)]
pub enum FrameSource {
    /// Encoded image bytes held in memory.
    Encoded(Arc<[u8]>),
    /// An image file already on disk.
    File(PathBuf),
    /// Keypoints only; no image is available.
    Absent,
}

/// Opaque, cheaply clonable reference to the video frame an analysis came from.
#[derive(Debug, Clone, PartialEq)]
pub struct FrameHandle {
    /// Zero-based frame index within the video.
    pub index: u64,
    pub source: FrameSource,
}

impl FrameHandle {
    pub fn new(index: u64, source: FrameSource) -> Self {
        Self { index, source }
    }

    /// Handle for a frame with no image attached.
    pub fn keypoints_only(index: u64) -> Self {
        Self::new(index, FrameSource::Absent)
    }

    pub fn encoded(index: u64, bytes: impl Into<Arc<[u8]>>) -> Self {
        Self::new(index, FrameSource::Encoded(bytes.into()))
    }

    pub fn file(index: u64, path: impl Into<PathBuf>) -> Self {
        Self::new(index, FrameSource::File(path.into()))
    }

    /// File extension to use when persisting this frame.
    pub fn extension(&self) -> &str {
        match &self.source {
            FrameSource::File(path) => path
                .extension()
                .and_then(|ext| ext.to_str())
                .unwrap_or("jpg"),
            _ => "jpg",
        }
    }
}

/// One line of a recorded pose stream (JSONL).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PoseRecord {
    /// Timestamp in milliseconds. Derived from `frame` and the stream fps
    /// when absent.
    #[serde(rename = "t", default, skip_serializing_if = "Option::is_none")]
    pub timestamp_ms: Option<TimestampMs>,

    /// Zero-based frame index. Defaults to the record's line position.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub frame: Option<u64>,

    /// Optional path to the frame image on disk.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<PathBuf>,

    /// Detected keypoints; `None` when the estimator found no pose.
    #[serde(default)]
    pub landmarks: Option<PoseFrame>,
}

impl PoseRecord {
    /// Whether the estimator detected a pose in this frame.
    pub fn has_pose(&self) -> bool {
        self.landmarks
            .as_ref()
            .map(|frame| !frame.is_empty())
            .unwrap_or(false)
    }
}

/// Parse a single pose-stream line. Blank lines and `#` comments yield `None`.
pub fn parse_pose_line(line: &str) -> Option<Result<PoseRecord, serde_json::Error>> {
    let trimmed = line.trim();
    if trimmed.is_empty() || trimmed.starts_with('#') {
        return None;
    }
    Some(serde_json::from_str(trimmed))
}

/// Parse a whole pose stream from JSONL content.
pub fn parse_pose_stream(jsonl: &str) -> Result<Vec<PoseRecord>, serde_json::Error> {
    jsonl.lines().filter_map(parse_pose_line).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_indexed_maps_positions() {
        let kps: Vec<Keypoint> = (0..35)
            .map(|i| Keypoint::new(i as f64 / 100.0, 0.5, 0.0, 0.9))
            .collect();
        let frame = PoseFrame::from_indexed(&kps);
        assert_eq!(frame.len(), 33);
        assert_eq!(frame.get(Landmark::LeftShoulder).unwrap().x, 0.11);
    }

    #[test]
    fn test_visible_points_gate() {
        let frame = PoseFrame::new()
            .with(Landmark::LeftKnee, Keypoint::new(0.4, 0.6, 0.0, 0.9))
            .with(Landmark::RightKnee, Keypoint::new(0.6, 0.7, 0.0, 0.3));

        let [left, right] = frame
            .visible_points([Landmark::LeftKnee, Landmark::RightKnee], 0.2)
            .unwrap();
        assert_eq!(left, Point2D::new(0.4, 0.6));
        assert_eq!(right, Point2D::new(0.6, 0.7));
        assert!(frame
            .visible_points([Landmark::LeftKnee, Landmark::RightKnee], 0.5)
            .is_none());
    }

    #[test]
    fn test_points_above_excludes_threshold() {
        let frame = PoseFrame::new().with(Landmark::LeftWrist, Keypoint::new(0.3, 0.4, 0.0, 0.65));
        assert!(frame.visible_points([Landmark::LeftWrist], 0.65).is_some());
        assert!(frame.points_above([Landmark::LeftWrist], 0.65).is_none());
        assert!(frame.points_above([Landmark::LeftWrist], 0.6).is_some());
    }

    #[test]
    fn test_frame_handle_extension() {
        assert_eq!(FrameHandle::keypoints_only(0).extension(), "jpg");
        assert_eq!(FrameHandle::file(3, "/tmp/f/0003.png").extension(), "png");
        assert_eq!(FrameHandle::encoded(1, vec![1u8, 2, 3]).extension(), "jpg");
    }

    #[test]
    fn test_parse_pose_stream() {
        let jsonl = r#"# recorded with blazepose
{"t":0,"frame":0,"landmarks":{"nose":{"x":0.5,"y":0.1,"z":-0.2,"visibility":0.99}}}
{"t":33,"frame":1,"landmarks":null}

{"frame":2,"image":"frames/0002.jpg","landmarks":{"left_knee":{"x":0.4,"y":0.7,"visibility":0.8}}}
"#;
        let records = parse_pose_stream(jsonl).unwrap();
        assert_eq!(records.len(), 3);

        assert!(records[0].has_pose());
        assert_eq!(records[0].timestamp_ms, Some(0));
        assert!(!records[1].has_pose());
        assert_eq!(records[2].timestamp_ms, None);
        assert_eq!(
            records[2].image.as_deref(),
            Some(std::path::Path::new("frames/0002.jpg"))
        );
        let knee = records[2]
            .landmarks
            .as_ref()
            .unwrap()
            .get(Landmark::LeftKnee)
            .unwrap();
        assert_eq!(knee.z, 0.0);
    }

    #[test]
    fn test_unknown_landmark_name_is_rejected() {
        let line = r#"{"landmarks":{"left_tail":{"x":0.1,"y":0.1,"visibility":1.0}}}"#;
        assert!(parse_pose_line(line).unwrap().is_err());
    }
}
