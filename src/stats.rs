/*!
Running statistics over an in-progress run.

[`AcceptanceTracker`] keeps a rolling window of accept flags so progress
reporting can show the recent acceptance probability instead of the
whole-run average, which reacts too slowly once the chain is long.
*/

use std::collections::VecDeque;

/// Rolling acceptance probability over the last `capacity` steps.
#[derive(Debug, Clone, PartialEq)]
pub struct AcceptanceTracker {
    window: VecDeque<bool>,
    capacity: usize,
}

impl AcceptanceTracker {
    /// Creates a tracker remembering the last `capacity` accept flags.
    pub fn new(capacity: usize) -> Self {
        Self {
            window: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Records one accept flag, dropping the oldest once full.
    pub fn observe(&mut self, accepted: bool) {
        if self.window.len() == self.capacity {
            self.window.pop_front();
        }
        self.window.push_back(accepted);
    }

    /// Acceptance probability over the current window; `0.0` while empty.
    pub fn rate(&self) -> f32 {
        if self.window.is_empty() {
            return 0.0;
        }
        let accepted = self.window.iter().filter(|&&a| a).count();
        accepted as f32 / self.window.len() as f32
    }
}
