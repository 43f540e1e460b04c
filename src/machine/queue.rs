//! FIFO dispatch of runtime actions.
//!
//! Every runtime operation becomes an [`Action`] on one queue. Whoever
//! finds the queue idle becomes the drainer and runs actions until the queue
//! is empty; everyone else (other threads, and callbacks running on the
//! drainer's own thread) only enqueues.

use crate::core::{StateId, TriggerValue};
use crate::error::Result;
use crate::machine::state_machine::{Lifecycle, SolidMachine};
use parking_lot::Mutex;
use std::collections::VecDeque;

#[derive(Debug)]
pub(crate) enum Action<T> {
    Start,
    Trigger(T),
    GoBack,
    Stop,
}

pub(crate) struct Dispatch<T> {
    pub lifecycle: Lifecycle,
    pub queue: VecDeque<Action<T>>,
    pub processing: bool,
}

impl<T> Dispatch<T> {
    pub fn new() -> Self {
        Self {
            lifecycle: Lifecycle::Unconfigured,
            queue: VecDeque::new(),
            processing: false,
        }
    }
}

/// Clears the processing flag if the drainer leaves early, on error or
/// panic.
struct DrainGuard<'a, T> {
    dispatch: &'a Mutex<Dispatch<T>>,
    armed: bool,
}

impl<T> Drop for DrainGuard<'_, T> {
    fn drop(&mut self) {
        if self.armed {
            self.dispatch.lock().processing = false;
        }
    }
}

impl<S: StateId, T: TriggerValue, C: Send + Sync + 'static> SolidMachine<S, T, C> {
    /// Drain the queue unless someone else already is.
    ///
    /// On failure the drain stops, the error is returned, and actions that
    /// were still queued stay queued for the next drain.
    pub(crate) fn process_queue(&self) -> Result<()> {
        {
            let mut dispatch = self.dispatch.lock();
            if dispatch.processing {
                tracing::trace!(machine = %self.id, "drain already in progress");
                return Ok(());
            }
            dispatch.processing = true;
        }

        let mut guard = DrainGuard {
            dispatch: &self.dispatch,
            armed: true,
        };

        loop {
            let action = {
                let mut dispatch = self.dispatch.lock();
                match dispatch.queue.pop_front() {
                    Some(action) => action,
                    None => {
                        // Must be cleared under the lock that saw the queue empty.
                        dispatch.processing = false;
                        guard.armed = false;
                        return Ok(());
                    }
                }
            };

            tracing::trace!(machine = %self.id, ?action, "running action");
            self.run_action(action)?;
        }
    }

    fn run_action(&self, action: Action<T>) -> Result<()> {
        match action {
            Action::Start => self.enter_initial(),
            Action::Trigger(trigger) => self.handle_trigger(&trigger),
            Action::GoBack => self.go_back_now(),
            Action::Stop => self.stop_now(),
        }
    }
}
