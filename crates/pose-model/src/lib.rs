//! Formcheck Pose Model
//!
//! Defines the core data contracts shared by analyzers and their drivers:
//! - **Landmarks:** The 33 named body joints produced by the pose estimator
//! - **Frames:** Per-frame keypoints plus an opaque reference to the image
//! - **Events:** Timestamped form-error events and their wire format
//! - **Reports:** End-of-video results (events + repetition counters)
//!
//! Keypoint coordinates are normalized to roughly `[0.0, 1.0]` relative to
//! the video frame, with `y` growing downward.

pub mod event;
pub mod exercise;
pub mod frame;
pub mod landmark;
pub mod report;

pub use event::*;
pub use exercise::*;
pub use frame::*;
pub use landmark::*;
pub use report::*;
