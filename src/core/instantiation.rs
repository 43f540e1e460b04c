//! How state instances are created and cached.

use super::state::{BoxedState, StateId, TriggerValue};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Instance caching policy for state behavior objects.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InstantiationMode {
    /// One instance per state, created on first entry and reused afterwards.
    #[default]
    Singleton,

    /// A fresh instance on every entry, dropped when the state is exited.
    PerTransition,
}

/// Host-supplied factory for state instances.
///
/// When a resolver is set it takes precedence over every per-state factory.
/// Returning `None` is reported as
/// [`MachineError::ResolverReturnedNull`](crate::error::MachineError::ResolverReturnedNull).
///
/// Any `Fn(S) -> Option<BoxedState<S, T, C>>` closure is a resolver.
pub trait StateResolver<S: StateId, T: TriggerValue, C: Send + Sync + 'static>:
    Send + Sync
{
    fn resolve(&self, state: S) -> Option<BoxedState<S, T, C>>;
}

impl<S, T, C, F> StateResolver<S, T, C> for F
where
    S: StateId,
    T: TriggerValue,
    C: Send + Sync + 'static,
    F: Fn(S) -> Option<BoxedState<S, T, C>> + Send + Sync,
{
    fn resolve(&self, state: S) -> Option<BoxedState<S, T, C>> {
        self(state)
    }
}

/// Zero-argument constructor registered for a single state.
pub(crate) type StateFactory<S, T, C> = Arc<dyn Fn() -> BoxedState<S, T, C> + Send + Sync>;
