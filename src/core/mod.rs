//! Core types shared by configuration and runtime.
//!
//! This module contains the vocabulary of the engine:
//! - State identities and trigger values
//! - The `SolidState` capability trait and the context it receives
//! - Guard predicates for choosing between transitions
//! - The bounded state history used by `go_back`
//! - Instantiation policy and the state resolver seam

mod context;
mod guard;
mod history;
mod instantiation;
mod state;

pub use context::StateContext;
pub use guard::Guard;
pub use history::{HistoryEntry, StateHistory, DEFAULT_TRIM_THRESHOLD, MIN_TRIM_THRESHOLD};
pub use instantiation::{InstantiationMode, StateResolver};
pub use state::{BoxedState, SolidState, StateId, TriggerValue};

pub(crate) use instantiation::StateFactory;
