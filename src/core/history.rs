//! Bounded history of exited states.
//!
//! The history is what `go_back` walks. Entries are kept most recent first
//! and the list is trimmed automatically once it grows past a threshold.

use super::state::StateId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

/// Number of entries kept before trimming, unless configured otherwise.
pub const DEFAULT_TRIM_THRESHOLD: usize = 100;

/// Lowest accepted trim threshold; smaller values are raised to this.
pub const MIN_TRIM_THRESHOLD: usize = 10;

/// A state that was left, and when.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(bound = "")]
pub struct HistoryEntry<S: StateId> {
    /// The state that was exited
    pub state: S,
    /// When it was exited
    pub exited_at: DateTime<Utc>,
}

/// Ordered, trimmable log of previously occupied states.
///
/// # Example
///
/// ```rust
/// use solid_state::core::StateHistory;
/// # use solid_state::state_ids;
/// # state_ids! { pub enum Step { A, B, C } }
///
/// let mut history = StateHistory::new();
/// history.push(Step::A);
/// history.push(Step::B);
///
/// assert_eq!(history.states(), vec![Step::B, Step::A]);
/// assert_eq!(history.pop(), Some(Step::B));
/// ```
#[derive(Clone, Debug)]
pub struct StateHistory<S: StateId> {
    entries: VecDeque<HistoryEntry<S>>,
    trim_threshold: usize,
}

impl<S: StateId> Default for StateHistory<S> {
    fn default() -> Self {
        Self::new()
    }
}

impl<S: StateId> StateHistory<S> {
    /// Create an empty history with the default trim threshold.
    pub fn new() -> Self {
        Self::with_trim_threshold(DEFAULT_TRIM_THRESHOLD)
    }

    /// Create an empty history with a custom trim threshold.
    ///
    /// Values below [`MIN_TRIM_THRESHOLD`] are raised to it.
    pub fn with_trim_threshold(threshold: usize) -> Self {
        Self {
            entries: VecDeque::new(),
            trim_threshold: threshold.max(MIN_TRIM_THRESHOLD),
        }
    }

    /// Record an exited state as the most recent entry, trimming if needed.
    pub fn push(&mut self, state: S) {
        self.entries.push_front(HistoryEntry {
            state,
            exited_at: Utc::now(),
        });
        self.trim();
    }

    /// Remove and return the most recent entry.
    pub fn pop(&mut self) -> Option<S> {
        self.entries.pop_front().map(|entry| entry.state)
    }

    /// The current trim threshold.
    pub fn trim_threshold(&self) -> usize {
        self.trim_threshold
    }

    /// Change the trim threshold and trim right away if the history is now
    /// over it.
    pub fn set_trim_threshold(&mut self, threshold: usize) {
        self.trim_threshold = threshold.max(MIN_TRIM_THRESHOLD);
        self.trim();
    }

    /// State identities, most recent first.
    pub fn states(&self) -> Vec<S> {
        self.entries.iter().map(|entry| entry.state).collect()
    }

    /// Full entries with exit timestamps, most recent first.
    pub fn entries(&self) -> Vec<HistoryEntry<S>> {
        self.entries.iter().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    // Once over the threshold, drop the oldest entries down to 90% of it.
    fn trim(&mut self) {
        if self.entries.len() > self.trim_threshold {
            let keep = self.trim_threshold * 9 / 10;
            self.entries.truncate(keep);
        }
    }
}
