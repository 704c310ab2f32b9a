//! Rising-edge debounce for per-frame labels.

/// Remembers the last observed label and reports when a new, different
/// label appears.
///
/// `None` means "no error label this frame" and clears the memory, so the
/// same label fires again after an intervening clear frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransitionLatch<T> {
    previous: Option<T>,
}

impl<T> Default for TransitionLatch<T> {
    fn default() -> Self {
        Self { previous: None }
    }
}

impl<T: PartialEq + Copy> TransitionLatch<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record this frame's label. Returns `true` when an event should fire.
    pub fn observe(&mut self, current: Option<T>) -> bool {
        let fired = current.is_some() && current != self.previous;
        self.previous = current;
        fired
    }

    pub fn previous(&self) -> Option<T> {
        self.previous
    }

    pub fn reset(&mut self) {
        self.previous = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_fires_once_per_interval() {
        let mut latch = TransitionLatch::new();
        assert!(latch.observe(Some('L')));
        assert!(!latch.observe(Some('L')));
        assert!(latch.observe(Some('H')));
        assert!(!latch.observe(None));
        assert!(latch.observe(Some('H')));
        assert_eq!(latch.previous(), Some('H'));
    }

    #[test]
    fn test_reset_forgets_previous() {
        let mut latch = TransitionLatch::new();
        latch.observe(Some(1));
        latch.reset();
        assert!(latch.observe(Some(1)));
    }

    proptest! {
        #[test]
        fn prop_no_two_consecutive_fires_share_a_label(
            labels in proptest::collection::vec(proptest::option::of(0u8..3), 0..64)
        ) {
            let mut latch = TransitionLatch::new();
            let mut last_fired: Option<u8> = None;
            let mut cleared_since = true;
            for label in labels {
                if latch.observe(label) {
                    let label = label.unwrap();
                    prop_assert!(cleared_since || last_fired != Some(label));
                    last_fired = Some(label);
                    cleared_since = false;
                } else if label.is_none() {
                    cleared_since = true;
                }
            }
        }
    }
}
