//! Solid State: a declaratively configured state machine engine
//!
//! Machines are configured in terms of state identities and trigger values,
//! then started and driven by firing triggers. Beyond plain transitions the
//! engine supports guards, forks into concurrent paths, joins that wait for
//! every path, a bounded history with `go_back`, and pluggable state
//! instantiation.
//!
//! # Core Concepts
//!
//! - **State identity**: a small copyable key, usually an enum generated
//!   with [`state_ids!`]
//! - **State behavior**: a [`SolidState`](crate::core::SolidState) instance notified
//!   on entry and exit
//! - **Guards**: predicates choosing between transitions on the same trigger
//! - **Paths**: forks create concurrent paths, joins collapse them
//! - **Queue**: triggers fired from callbacks run after the current
//!   transition, in firing order
//!
//! # Example
//!
//! ```rust
//! use solid_state::core::{SolidState, StateContext};
//! use solid_state::error::StateError;
//! use solid_state::machine::SolidMachine;
//! use solid_state::state_ids;
//!
//! state_ids! {
//!     pub enum Phone {
//!         Idle,
//!         Ringing,
//!         Talking,
//!     }
//! }
//!
//! #[derive(Debug, Clone, Copy, PartialEq)]
//! enum Event {
//!     IncomingCall,
//!     Answer,
//!     HangUp,
//! }
//!
//! struct Quiet;
//! impl SolidState<Phone, Event> for Quiet {}
//!
//! struct Bell;
//! impl SolidState<Phone, Event> for Bell {
//!     fn entering(&mut self, _context: &StateContext<'_, Phone, Event>) -> Result<(), StateError> {
//!         println!("ring ring");
//!         Ok(())
//!     }
//! }
//!
//! # fn main() -> solid_state::error::Result<()> {
//! let phone: SolidMachine<Phone, Event> = SolidMachine::new();
//! phone
//!     .state_with(Phone::Idle, || Quiet)?
//!     .on(Event::IncomingCall)?
//!     .goes_to(Phone::Ringing)?;
//! phone
//!     .state_with(Phone::Ringing, || Bell)?
//!     .on(Event::Answer)?
//!     .goes_to(Phone::Talking)?
//!     .on(Event::HangUp)?
//!     .goes_to(Phone::Idle)?;
//! phone
//!     .state_with(Phone::Talking, || Quiet)?
//!     .on(Event::HangUp)?
//!     .goes_to(Phone::Idle)?;
//!
//! phone.start()?;
//! phone.trigger(Event::IncomingCall)?;
//! phone.trigger(Event::Answer)?;
//! assert_eq!(phone.current_state()?, Some(Phone::Talking));
//! assert_eq!(phone.state_history(), vec![Phone::Ringing, Phone::Idle]);
//! # Ok(())
//! # }
//! ```

pub mod builder;
pub mod core;
pub mod error;
pub mod machine;

// Re-export commonly used types
pub use builder::MachineSettings;
pub use crate::core::{Guard, InstantiationMode, SolidState, StateContext, StateId, StateResolver};
pub use error::{MachineError, Result};
pub use machine::{Lifecycle, SolidMachine, Transitioned};
