//! State identities, trigger values and the state capability trait.
//!
//! A machine is configured in terms of *identities* (`StateId`), cheap
//! copyable keys such as a fieldless enum. The behavior attached to an
//! identity lives in a separate instance implementing [`SolidState`],
//! created on demand by the machine.

use super::context::StateContext;
use crate::error::StateError;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fmt::Debug;
use std::hash::Hash;

/// Key identifying a configured state.
///
/// All methods are pure. Identities are compared, hashed and copied freely
/// by the engine, so they should be small values (typically enum variants).
///
/// # Example
///
/// ```rust
/// use solid_state::core::StateId;
/// use serde::{Deserialize, Serialize};
///
/// #[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Serialize, Deserialize)]
/// enum Phone {
///     Idle,
///     Ringing,
/// }
///
/// impl StateId for Phone {
///     fn name(&self) -> &str {
///         match self {
///             Self::Idle => "Idle",
///             Self::Ringing => "Ringing",
///         }
///     }
/// }
///
/// assert_eq!(Phone::Ringing.name(), "Ringing");
/// ```
pub trait StateId:
    Copy + Eq + Hash + Debug + Serialize + DeserializeOwned + Send + Sync + 'static
{
    /// Get the state's name for errors and logging.
    fn name(&self) -> &str;
}

/// Value that can be fired at a machine to cause transitions.
///
/// Implemented for every type with the required bounds, so plain enums,
/// integers and strings all work as triggers.
pub trait TriggerValue: Clone + PartialEq + Debug + Send + Sync + 'static {}

impl<T> TriggerValue for T where T: Clone + PartialEq + Debug + Send + Sync + 'static {}

/// Behavior attached to a state.
///
/// The machine calls `entering` after the state has become current and
/// `exiting` before it is left. Both receive a [`StateContext`] giving access
/// to the machine itself (to fire follow-up triggers) and to the optional host
/// context object. Triggers fired from inside a callback are queued and run
/// once the current transition has finished.
///
/// Both methods default to doing nothing, so an implementation only
/// overrides what it needs.
///
/// # Example
///
/// ```rust
/// use solid_state::core::{SolidState, StateContext};
/// use solid_state::error::StateError;
/// # use solid_state::state_ids;
/// # state_ids! { pub enum Door { Open, Closed } }
///
/// #[derive(Default)]
/// struct OpenDoor {
///     times_opened: usize,
/// }
///
/// impl SolidState<Door, &'static str> for OpenDoor {
///     fn entering(&mut self, _context: &StateContext<'_, Door, &'static str>) -> Result<(), StateError> {
///         self.times_opened += 1;
///         Ok(())
///     }
/// }
/// ```
pub trait SolidState<S: StateId, T: TriggerValue, C: Send + Sync + 'static = ()>: Send {
    /// Called when the machine enters this state.
    fn entering(&mut self, _context: &StateContext<'_, S, T, C>) -> Result<(), StateError> {
        Ok(())
    }

    /// Called when the machine leaves this state.
    fn exiting(&mut self, _context: &StateContext<'_, S, T, C>) -> Result<(), StateError> {
        Ok(())
    }
}

/// Owned, type-erased state instance.
pub type BoxedState<S, T, C = ()> = Box<dyn SolidState<S, T, C>>;
