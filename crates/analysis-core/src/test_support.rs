//! Pose builders shared by unit tests.

use formcheck_pose_model::frame::{Keypoint, PoseFrame};
use formcheck_pose_model::landmark::Landmark;

/// Every landmark present with the given visibility, stacked vertically.
pub fn full_pose(visibility: f64) -> PoseFrame {
    let keypoints: Vec<Keypoint> = (0..Landmark::ALL.len())
        .map(|i| Keypoint::new(0.5, i as f64 / 40.0, 0.0, visibility))
        .collect();
    PoseFrame::from_indexed(&keypoints)
}

/// Overwrite the 2D position of `landmark`, keeping everything else.
pub fn place(pose: &mut PoseFrame, landmark: Landmark, x: f64, y: f64, visibility: f64) {
    pose.insert(landmark, Keypoint::new(x, y, 0.0, visibility));
}
