//! Configuration API for declaring states and their transitions.
//!
//! States are declared through [`SolidMachine::state`](crate::machine::SolidMachine::state)
//! (or `state_with` to attach behavior) and configured with a fluent chain:
//! `on`/`on_when` names the trigger, then `goes_to`, `forks_to`, `forks_to3`
//! or `joins_to` names the target(s). Every step validates immediately and
//! returns a [`MachineError`](crate::error::MachineError) on violation.

pub mod macros;
pub(crate) mod registry;
pub mod settings;
pub mod state;
pub mod transition;

pub use settings::MachineSettings;
pub use state::StateConfiguration;
pub use transition::TriggerConfiguration;
