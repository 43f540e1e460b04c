//! Context handed to state callbacks.

use super::state::{StateId, TriggerValue};
use crate::error::Result;
use crate::machine::SolidMachine;
use std::sync::Arc;

/// What a state sees while its `entering`/`exiting` callback runs.
///
/// The machine handle is always present; the host context object is present
/// only when one was supplied with [`SolidMachine::with_context`] or
/// [`SolidMachine::set_context`].
pub struct StateContext<'a, S: StateId, T: TriggerValue, C: Send + Sync + 'static = ()> {
    machine: &'a SolidMachine<S, T, C>,
    data: Option<Arc<C>>,
}

impl<'a, S: StateId, T: TriggerValue, C: Send + Sync + 'static> StateContext<'a, S, T, C> {
    pub(crate) fn new(machine: &'a SolidMachine<S, T, C>, data: Option<Arc<C>>) -> Self {
        Self { machine, data }
    }

    /// The machine running the callback.
    pub fn machine(&self) -> &'a SolidMachine<S, T, C> {
        self.machine
    }

    /// The host context object, if one was set.
    pub fn data(&self) -> Option<&C> {
        self.data.as_deref()
    }

    /// Queue a trigger on the running machine.
    ///
    /// Inside a callback this only enqueues; the trigger is processed after
    /// the transition in progress completes.
    pub fn trigger(&self, trigger: T) -> Result<()> {
        self.machine.trigger(trigger)
    }
}
