//! Transition detection

use crate::status::Status;

/// Result of comparing a fresh observation with the last known status
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Change {
    /// Status differs from the previous one; carries the new status
    Changed(Status),
    Unchanged,
}

impl Change {
    pub fn is_changed(&self) -> bool {
        matches!(self, Change::Changed(_))
    }
}

/// Decides whether a transition occurred
///
/// A single differing observation is enough. There is no debouncing, so a
/// status that flips for one cycle and back produces two transitions.
#[derive(Debug, Default, Clone, Copy)]
pub struct ChangeDetector;

impl ChangeDetector {
    pub fn compare(current: Status, previous: Status) -> Change {
        if current == previous {
            Change::Unchanged
        } else {
            Change::Changed(current)
        }
    }
}
