//! Per-analyzer append-only error event log and frame persistence seam.

use std::path::Path;

use formcheck_common::error::FormcheckResult;
use formcheck_pose_model::event::{fired_for_rep, ErrorCategory, ErrorEvent, EventFrame};
use formcheck_pose_model::frame::FrameHandle;

/// Durable storage for evidence frames.
pub trait FrameStore {
    /// Persist `frame` under `name`.
    fn save(&self, frame: &FrameHandle, name: &str) -> FormcheckResult<()>;
}

/// Ordered error events for one video.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EventLog {
    events: Vec<ErrorEvent>,
}

impl EventLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, event: ErrorEvent) {
        tracing::debug!(
            stage = event.category.label(),
            timestamp = event.timestamp,
            rep = ?event.rep_index,
            "Form error recorded"
        );
        self.events.push(event);
    }

    pub fn extend(&mut self, events: impl IntoIterator<Item = ErrorEvent>) {
        for event in events {
            self.push(event);
        }
    }

    pub fn as_slice(&self) -> &[ErrorEvent] {
        &self.events
    }

    pub fn fired_for_rep(&self, category: ErrorCategory, rep_index: u32) -> bool {
        fired_for_rep(&self.events, category, rep_index)
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn clear(&mut self) {
        self.events.clear();
    }

    /// Persist every captured frame as `<video stem>_<index>.<ext>` and
    /// swap it for that name.
    ///
    /// A failed save is logged and leaves the event without a frame; later
    /// events are still persisted. Events persisted by an earlier call are
    /// left as they are.
    pub fn persist(&mut self, video: &str, store: &dyn FrameStore) {
        let stem = Path::new(video)
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or(video);

        for (index, event) in self.events.iter_mut().enumerate() {
            let EventFrame::Captured(handle) = &event.frame else {
                continue;
            };
            let name = format!("{stem}_{index}.{}", handle.extension());
            let persisted = match store.save(handle, &name) {
                Ok(()) => EventFrame::Persisted(name),
                Err(e) => {
                    tracing::warn!(
                        frame = handle.index,
                        name = %name,
                        error = %e,
                        "Failed to persist event frame"
                    );
                    EventFrame::Unavailable
                }
            };
            event.frame = persisted;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use formcheck_common::error::FormcheckError;
    use std::cell::RefCell;

    #[derive(Default)]
    struct RecordingStore {
        saved: RefCell<Vec<String>>,
    }

    impl FrameStore for RecordingStore {
        fn save(&self, frame: &FrameHandle, name: &str) -> FormcheckResult<()> {
            if frame.index == 13 {
                return Err(FormcheckError::persistence("disk full"));
            }
            self.saved.borrow_mut().push(name.to_string());
            Ok(())
        }
    }

    fn event(frame: u64) -> ErrorEvent {
        ErrorEvent::new(
            ErrorCategory::LowBack,
            FrameHandle::encoded(frame, vec![0u8; 4]),
            frame * 33,
        )
    }

    #[test]
    fn test_persist_names_and_failures() {
        let mut log = EventLog::new();
        log.push(event(1));
        log.push(event(13));
        log.push(event(20));

        let store = RecordingStore::default();
        log.persist("uploads/session.mp4", &store);

        let frames: Vec<_> = log.as_slice().iter().map(|e| e.frame.clone()).collect();
        assert_eq!(
            frames,
            vec![
                EventFrame::Persisted("session_0.jpg".into()),
                EventFrame::Unavailable,
                EventFrame::Persisted("session_2.jpg".into()),
            ]
        );
        assert_eq!(store.saved.borrow().len(), 2);

        // A second pass has nothing left to save.
        log.persist("uploads/session.mp4", &store);
        assert_eq!(store.saved.borrow().len(), 2);
    }

    #[test]
    fn test_rep_lookup() {
        let mut log = EventLog::new();
        log.push(ErrorEvent::for_rep(
            ErrorCategory::KneeAngle,
            FrameHandle::keypoints_only(3),
            100,
            2,
        ));
        assert!(log.fired_for_rep(ErrorCategory::KneeAngle, 2));
        assert!(!log.fired_for_rep(ErrorCategory::KneeAngle, 3));
        assert!(!log.fired_for_rep(ErrorCategory::KneeOverToe, 2));
        log.clear();
        assert!(log.is_empty());
    }
}
