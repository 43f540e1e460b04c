//! Fluent configuration of the target(s) of a trigger.

use crate::builder::registry::Targets;
use crate::builder::state::StateConfiguration;
use crate::core::{Guard, StateId, TriggerValue};
use crate::error::Result;

/// A trigger on a state whose target has not been declared yet.
///
/// Finishing it with one of the target methods records the transition and
/// returns the source state's configuration for further chaining. Dropping
/// it without a target records nothing.
pub struct TriggerConfiguration<'m, S: StateId, T: TriggerValue, C: Send + Sync + 'static = ()> {
    source: StateConfiguration<'m, S, T, C>,
    trigger: T,
    guard: Option<Guard>,
}

impl<'m, S: StateId, T: TriggerValue, C: Send + Sync + 'static> TriggerConfiguration<'m, S, T, C> {
    pub(crate) fn new(source: StateConfiguration<'m, S, T, C>, trigger: T, guard: Option<Guard>) -> Self {
        Self {
            source,
            trigger,
            guard,
        }
    }

    /// Transition to a single target on the source state's path.
    pub fn goes_to(self, target: S) -> Result<StateConfiguration<'m, S, T, C>> {
        self.link(Targets::Single(target))
    }

    /// Fork into two concurrent paths.
    pub fn forks_to(self, first: S, second: S) -> Result<StateConfiguration<'m, S, T, C>> {
        self.link(Targets::Fork(vec![first, second]))
    }

    /// Fork into three concurrent paths.
    pub fn forks_to3(self, first: S, second: S, third: S) -> Result<StateConfiguration<'m, S, T, C>> {
        self.link(Targets::Fork(vec![first, second, third]))
    }

    /// Join into `target`, which is entered only after every path joining
    /// into it has fired its join trigger.
    pub fn joins_to(self, target: S) -> Result<StateConfiguration<'m, S, T, C>> {
        self.link(Targets::Join(target))
    }

    fn link(self, targets: Targets<S>) -> Result<StateConfiguration<'m, S, T, C>> {
        let Self {
            source,
            trigger,
            guard,
        } = self;
        let node = source.node();
        source
            .machine()
            .configure(|registry| registry.add_edge(node, trigger, guard, targets))?;
        Ok(source)
    }
}
