//! Form-error events.
//!
//! Analyzers append events to an append-only log while a video is being
//! processed. The only mutation after append is swapping the captured frame
//! for the name it was persisted under (or marking it unavailable).
//!
//! The serialized shape (`stage`, `frame`, `timestamp`, optional `counter`)
//! is consumed by existing clients and must stay stable.

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use formcheck_common::clock::TimestampMs;

use crate::frame::FrameHandle;

/// Kind of form error an event reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorCategory {
    #[serde(rename = "low back")]
    LowBack,
    #[serde(rename = "high back")]
    HighBack,
    #[serde(rename = "loose upper arm")]
    LooseUpperArm,
    #[serde(rename = "peak contraction")]
    PeakContraction,
    #[serde(rename = "lean too far back")]
    LeanTooFarBack,
    #[serde(rename = "feet too tight")]
    FeetTooTight,
    #[serde(rename = "feet too wide")]
    FeetTooWide,
    #[serde(rename = "knee too tight")]
    KneeTooTight,
    #[serde(rename = "knee too wide")]
    KneeTooWide,
    #[serde(rename = "knee angle")]
    KneeAngle,
    #[serde(rename = "knee over toe")]
    KneeOverToe,
}

impl ErrorCategory {
    /// Wire label, identical to the serialized form.
    pub fn label(self) -> &'static str {
        match self {
            Self::LowBack => "low back",
            Self::HighBack => "high back",
            Self::LooseUpperArm => "loose upper arm",
            Self::PeakContraction => "peak contraction",
            Self::LeanTooFarBack => "lean too far back",
            Self::FeetTooTight => "feet too tight",
            Self::FeetTooWide => "feet too wide",
            Self::KneeTooTight => "knee too tight",
            Self::KneeTooWide => "knee too wide",
            Self::KneeAngle => "knee angle",
            Self::KneeOverToe => "knee over toe",
        }
    }

    /// Categories limited to one event per repetition index.
    pub fn is_rep_scoped(self) -> bool {
        matches!(self, Self::KneeAngle | Self::KneeOverToe)
    }
}

impl std::fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// The frame attached to an event.
#[derive(Debug, Clone, PartialEq)]
pub enum EventFrame {
    /// Frame captured during analysis, not yet persisted.
    Captured(FrameHandle),
    /// Name the frame was persisted under.
    Persisted(String),
    /// Persistence failed or no frame exists.
    Unavailable,
}

impl EventFrame {
    pub fn persisted_name(&self) -> Option<&str> {
        match self {
            Self::Persisted(name) => Some(name),
            _ => None,
        }
    }
}

// Only persisted names are meaningful to clients; anything else is `null`.
impl Serialize for EventFrame {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Persisted(name) => serializer.serialize_some(name),
            _ => serializer.serialize_none(),
        }
    }
}

impl<'de> Deserialize<'de> for EventFrame {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Ok(match Option::<String>::deserialize(deserializer)? {
            Some(name) => Self::Persisted(name),
            None => Self::Unavailable,
        })
    }
}

/// A single form-error occurrence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorEvent {
    #[serde(rename = "stage")]
    pub category: ErrorCategory,

    pub frame: EventFrame,

    /// Milliseconds since the start of the video.
    pub timestamp: TimestampMs,

    /// Repetition index the event belongs to, for rep-scoped categories.
    #[serde(rename = "counter", default, skip_serializing_if = "Option::is_none")]
    pub rep_index: Option<u32>,
}

impl ErrorEvent {
    pub fn new(category: ErrorCategory, frame: FrameHandle, timestamp: TimestampMs) -> Self {
        Self {
            category,
            frame: EventFrame::Captured(frame),
            timestamp,
            rep_index: None,
        }
    }

    /// Event tied to a repetition index.
    pub fn for_rep(
        category: ErrorCategory,
        frame: FrameHandle,
        timestamp: TimestampMs,
        rep_index: u32,
    ) -> Self {
        Self {
            rep_index: Some(rep_index),
            ..Self::new(category, frame, timestamp)
        }
    }
}

/// True if `events` already holds an event of `category` for `rep_index`.
pub fn fired_for_rep(events: &[ErrorEvent], category: ErrorCategory, rep_index: u32) -> bool {
    events
        .iter()
        .any(|e| e.category == category && e.rep_index == Some(rep_index))
}
