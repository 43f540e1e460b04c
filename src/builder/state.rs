//! Fluent configuration of a single state.

use crate::builder::registry::NodeId;
use crate::builder::transition::TriggerConfiguration;
use crate::core::{Guard, StateId, TriggerValue};
use crate::error::Result;
use crate::machine::SolidMachine;

/// Handle for configuring one state, returned by [`SolidMachine::state`]
/// and [`SolidMachine::state_with`].
///
/// Each call consumes the handle and hands it back, so configuration reads
/// as one chain per state:
///
/// ```rust
/// use solid_state::machine::SolidMachine;
/// use solid_state::state_ids;
///
/// state_ids! { pub enum Phone { Idle, Dialling, Ringing } }
///
/// # fn main() -> solid_state::error::Result<()> {
/// let machine: SolidMachine<Phone, &str> = SolidMachine::new();
/// machine
///     .state(Phone::Idle)?
///     .on("pick_up")?
///     .goes_to(Phone::Dialling)?
///     .on("incoming")?
///     .goes_to(Phone::Ringing)?;
/// # Ok(())
/// # }
/// ```
pub struct StateConfiguration<'m, S: StateId, T: TriggerValue, C: Send + Sync + 'static = ()> {
    machine: &'m SolidMachine<S, T, C>,
    node: NodeId,
    id: S,
}

impl<'m, S: StateId, T: TriggerValue, C: Send + Sync + 'static> StateConfiguration<'m, S, T, C> {
    pub(crate) fn new(machine: &'m SolidMachine<S, T, C>, node: NodeId, id: S) -> Self {
        Self { machine, node, id }
    }

    /// The state being configured.
    pub fn id(&self) -> S {
        self.id
    }

    pub(crate) fn machine(&self) -> &'m SolidMachine<S, T, C> {
        self.machine
    }

    pub(crate) fn node(&self) -> NodeId {
        self.node
    }

    /// Make this state the initial state. May be called for one state only.
    pub fn is_initial_state(self) -> Result<Self> {
        let node = self.node;
        self.machine.configure(|registry| registry.mark_initial(node))?;
        Ok(self)
    }

    /// Start a guardless transition on `trigger`.
    pub fn on(self, trigger: T) -> Result<TriggerConfiguration<'m, S, T, C>> {
        self.begin(trigger, None)
    }

    /// Start a guarded transition on `trigger`.
    pub fn on_guard(self, trigger: T, guard: Guard) -> Result<TriggerConfiguration<'m, S, T, C>> {
        self.begin(trigger, Some(guard))
    }

    /// Start a guarded transition on `trigger` using a closure as the guard.
    pub fn on_when<F>(self, trigger: T, predicate: F) -> Result<TriggerConfiguration<'m, S, T, C>>
    where
        F: Fn() -> bool + Send + Sync + 'static,
    {
        self.begin(trigger, Some(Guard::new(predicate)))
    }

    fn begin(self, trigger: T, guard: Option<Guard>) -> Result<TriggerConfiguration<'m, S, T, C>> {
        let node = self.node;
        let guarded = guard.is_some();
        self.machine
            .configure(|registry| registry.check_trigger(node, &trigger, guarded))?;
        Ok(TriggerConfiguration::new(self, trigger, guard))
    }
}
