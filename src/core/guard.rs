//! Guard predicates for controlling state transitions.
//!
//! Guards are boolean functions that decide which of several transitions
//! configured on the same trigger applies. They are evaluated after the
//! source state has been exited, so they may observe what its `exiting`
//! callback changed.

use std::fmt;
use std::sync::Arc;

/// Predicate that gates a guarded transition.
///
/// Guards take no arguments: whatever they inspect is captured by the
/// closure (a flag, a shared counter, the host context).
///
/// # Example
///
/// ```rust
/// use solid_state::core::Guard;
/// use std::sync::atomic::{AtomicBool, Ordering};
/// use std::sync::Arc;
///
/// let line_ok = Arc::new(AtomicBool::new(false));
/// let flag = Arc::clone(&line_ok);
/// let guard = Guard::new(move || flag.load(Ordering::SeqCst));
///
/// assert!(!guard.check());
/// line_ok.store(true, Ordering::SeqCst);
/// assert!(guard.check());
/// ```
#[derive(Clone)]
pub struct Guard {
    predicate: Arc<dyn Fn() -> bool + Send + Sync>,
}

impl Guard {
    /// Create a guard from a predicate.
    ///
    /// The predicate must be thread-safe (Send + Sync) since triggers may be
    /// drained on any thread.
    pub fn new<F>(predicate: F) -> Self
    where
        F: Fn() -> bool + Send + Sync + 'static,
    {
        Guard {
            predicate: Arc::new(predicate),
        }
    }

    /// Evaluate the guard.
    pub fn check(&self) -> bool {
        (self.predicate)()
    }
}

impl fmt::Debug for Guard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Guard(..)")
    }
}
