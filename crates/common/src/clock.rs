//! Frame timing utilities for pose streams.
//!
//! Analyzers assume frames arrive in non-decreasing timestamp order. This
//! module provides utilities for:
//! - Deriving millisecond timestamps from frame indices
//! - Rejecting out-of-order frames before they reach an analyzer

/// Millisecond timestamp relative to the start of a video.
pub type TimestampMs = u64;

/// Converts frame indices to timestamps for a fixed frame rate.
#[derive(Debug, Clone, Copy)]
pub struct FrameClock {
    fps: f64,
}

impl FrameClock {
    /// Create a clock for the given frame rate. Non-positive rates fall
    /// back to 30 fps.
    pub fn new(fps: f64) -> Self {
        let fps = if fps.is_finite() && fps > 0.0 {
            fps
        } else {
            30.0
        };
        Self { fps }
    }

    /// Frame rate used by this clock.
    pub fn fps(&self) -> f64 {
        self.fps
    }

    /// Timestamp (ms) of the frame with the given zero-based index.
    pub fn timestamp_ms(&self, frame_index: u64) -> TimestampMs {
        (frame_index as f64 * 1000.0 / self.fps).round() as TimestampMs
    }

    /// Convert a millisecond timestamp to seconds.
    pub fn ms_to_secs(ms: TimestampMs) -> f64 {
        ms as f64 / 1000.0
    }
}

/// Enforces the non-decreasing timestamp ordering analyzers rely on.
#[derive(Debug, Default)]
pub struct TimestampGuard {
    last_ms: Option<TimestampMs>,
    rejected: u64,
}

impl TimestampGuard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns true and records the timestamp if it does not go backwards.
    /// Equal timestamps are accepted.
    pub fn accept(&mut self, timestamp_ms: TimestampMs) -> bool {
        match self.last_ms {
            Some(last) if timestamp_ms < last => {
                self.rejected += 1;
                tracing::warn!(
                    "Dropping out-of-order frame at {}ms (last accepted {}ms)",
                    timestamp_ms,
                    last
                );
                false
            }
            _ => {
                self.last_ms = Some(timestamp_ms);
                true
            }
        }
    }

    /// Number of frames rejected so far.
    pub fn rejected(&self) -> u64 {
        self.rejected
    }

    /// Forget all history, e.g. between videos.
    pub fn reset(&mut self) {
        self.last_ms = None;
        self.rejected = 0;
    }
}
