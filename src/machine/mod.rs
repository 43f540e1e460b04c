//! Runtime: the machine handle, its dispatch queue and transition executor.
//!
//! All runtime work goes through one FIFO queue:
//! - `start` queues the entry into the initial state
//! - `trigger` and `go_back` queue their action
//! - `stop` discards whatever is pending and queues the final exits
//!
//! The caller that finds the queue idle drains it; calls made while a drain
//! is running (from other threads, or from state callbacks) only enqueue.

mod executor;
mod queue;
mod snapshot;
mod state_machine;
mod validation;

pub use snapshot::{MachineSnapshot, StateSummary};
pub use state_machine::{Lifecycle, SolidMachine, Transitioned};
