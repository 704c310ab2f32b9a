//! Classifier feature extraction.
//!
//! A feature vector is four values `(x, y, z, visibility)` per landmark, in
//! the order of a fixed landmark list. A trained classifier is only valid
//! for the exact list it was trained with, so these lists must not be
//! reordered once a model has been paired with them.

use formcheck_common::error::{FormcheckError, FormcheckResult};
use formcheck_pose_model::frame::PoseFrame;
use formcheck_pose_model::landmark::Landmark;

/// Values contributed by each landmark.
pub const VALUES_PER_LANDMARK: usize = 4;

pub const PLANK_LANDMARKS: &[Landmark] = &[
    Landmark::Nose,
    Landmark::LeftShoulder,
    Landmark::RightShoulder,
    Landmark::LeftElbow,
    Landmark::RightElbow,
    Landmark::LeftWrist,
    Landmark::RightWrist,
    Landmark::LeftHip,
    Landmark::RightHip,
    Landmark::LeftKnee,
    Landmark::RightKnee,
    Landmark::LeftAnkle,
    Landmark::RightAnkle,
    Landmark::LeftHeel,
    Landmark::RightHeel,
    Landmark::LeftFootIndex,
    Landmark::RightFootIndex,
];

// Elbows and wrists are right-before-left here; the posture model was
// trained on this order.
pub const BICEP_CURL_POSTURE_LANDMARKS: &[Landmark] = &[
    Landmark::Nose,
    Landmark::LeftShoulder,
    Landmark::RightShoulder,
    Landmark::RightElbow,
    Landmark::LeftElbow,
    Landmark::RightWrist,
    Landmark::LeftWrist,
    Landmark::LeftHip,
    Landmark::RightHip,
];

pub const SQUAT_LANDMARKS: &[Landmark] = &[
    Landmark::Nose,
    Landmark::LeftShoulder,
    Landmark::RightShoulder,
    Landmark::LeftHip,
    Landmark::RightHip,
    Landmark::LeftKnee,
    Landmark::RightKnee,
    Landmark::LeftAnkle,
    Landmark::RightAnkle,
];

pub const LUNGE_LANDMARKS: &[Landmark] = &[
    Landmark::Nose,
    Landmark::LeftShoulder,
    Landmark::RightShoulder,
    Landmark::LeftHip,
    Landmark::RightHip,
    Landmark::LeftKnee,
    Landmark::RightKnee,
    Landmark::LeftAnkle,
    Landmark::RightAnkle,
    Landmark::LeftHeel,
    Landmark::RightHeel,
    Landmark::LeftFootIndex,
    Landmark::RightFootIndex,
];

/// Flattens a frame's keypoints into a classifier input.
#[derive(Debug, Clone, Copy)]
pub struct FeatureExtractor {
    landmarks: &'static [Landmark],
}

impl FeatureExtractor {
    pub const fn new(landmarks: &'static [Landmark]) -> Self {
        Self { landmarks }
    }

    pub fn landmarks(&self) -> &'static [Landmark] {
        self.landmarks
    }

    /// Length of the vectors produced by `extract`.
    pub fn input_len(&self) -> usize {
        self.landmarks.len() * VALUES_PER_LANDMARK
    }

    /// Column names in vector order (`nose_x`, `nose_y`, `nose_z`, `nose_v`, ...).
    pub fn column_names(&self) -> Vec<String> {
        self.landmarks
            .iter()
            .flat_map(|lm| {
                ["x", "y", "z", "v"]
                    .into_iter()
                    .map(move |axis| format!("{}_{axis}", lm.name()))
            })
            .collect()
    }

    /// Build the feature vector for `pose`.
    ///
    /// Fails with `MissingLandmark` if any listed landmark is absent.
    pub fn extract(&self, pose: &PoseFrame) -> FormcheckResult<Vec<f64>> {
        let mut features = Vec::with_capacity(self.input_len());
        for landmark in self.landmarks {
            let kp = pose
                .get(*landmark)
                .ok_or_else(|| FormcheckError::missing_landmark(landmark.name()))?;
            features.extend_from_slice(&[kp.x, kp.y, kp.z, kp.visibility]);
        }
        Ok(features)
    }
}
