//! Consistency debounce of classifier labels

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use comms_if::eqpt::cam::ObjectLabel;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Counts consecutive identical labels.
///
/// A label is committed on the frame its run reaches the threshold, and only
/// on that frame.
#[derive(Debug, Clone)]
pub struct Debouncer {
    threshold: u32,
    candidate: Option<ObjectLabel>,
    count: u32,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Debouncer {
    pub fn new(threshold: u32) -> Self {
        Self {
            threshold: threshold.max(1),
            candidate: None,
            count: 0,
        }
    }

    /// Observe one label, returning `true` if it is now committed.
    ///
    /// A label different to the current candidate restarts the run at 1.
    pub fn observe(&mut self, label: &ObjectLabel) -> bool {
        match &self.candidate {
            Some(c) if c == label => self.count += 1,
            _ => {
                self.candidate = Some(label.clone());
                self.count = 1;
            }
        }

        self.count == self.threshold
    }

    pub fn reset(&mut self) {
        self.candidate = None;
        self.count = 0;
    }

    pub fn count(&self) -> u32 {
        self.count
    }

    pub fn candidate(&self) -> Option<&ObjectLabel> {
        self.candidate.as_ref()
    }
}
