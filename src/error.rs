//! Error taxonomy for configuration and runtime violations.

use thiserror::Error;

/// Error raised by a state's `entering`/`exiting` callback.
pub type StateError = Box<dyn std::error::Error + Send + Sync>;

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, MachineError>;

/// Which state callback was running when a [`MachineError::StateCallback`] occurred.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallbackPhase {
    Entering,
    Exiting,
}

impl std::fmt::Display for CallbackPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Entering => f.write_str("entering"),
            Self::Exiting => f.write_str("exiting"),
        }
    }
}

/// Every failure the engine can report.
///
/// Each variant is a distinct cause; callers should branch on the variant
/// (or on [`MachineError::code`]) and never on the message text.
#[derive(Debug, Error)]
pub enum MachineError {
    #[error("State machine is not started")]
    NotStarted,

    #[error("There are multiple parallel paths to state {state}, check the machine configuration")]
    DuplicateParallelPath { state: String },

    #[error("Cannot create a transition from state {from} to state {to}, they are on different paths")]
    CrossPathTransition { from: String, to: String },

    #[error("State resolver returned no instance for state '{state}'")]
    ResolverReturnedNull { state: String },

    #[error("No states have been configured")]
    NoStatesConfigured,

    #[error("States [{}] have no factory; register one with state_with() or set a state resolver", .states.join(", "))]
    ResolverRequired { states: Vec<String> },

    #[error("CurrentState cannot be used while the machine occupies parallel states")]
    CurrentStateUnavailableWhenParallel,

    #[error("The instantiation mode must be set before the machine is started")]
    PolicyChangeAfterStart,

    #[error("The machine cannot have multiple initial states")]
    MultipleInitialStates,

    #[error("State {state} cannot mix guarded and guardless transitions on trigger {trigger}")]
    MixedGuardedUnguarded { state: String, trigger: String },

    #[error("Trigger {trigger} has already been configured for state {state}")]
    DuplicateUnguardedTrigger { state: String, trigger: String },

    #[error("Trigger {trigger} is not valid for state {state}")]
    InvalidTrigger { trigger: String, state: String },

    #[error("State {state}, trigger {trigger} has multiple guards that evaluate to true")]
    MultipleGuardsTrue { state: String, trigger: String },

    #[error("State {state}, trigger {trigger} has no guard that evaluates to true")]
    NoGuardTrue { state: String, trigger: String },

    #[error("Cannot go back while the machine occupies parallel states")]
    CannotGoBackWhenParallel,

    #[error("Trigger {trigger} is not valid for any of the current states: {}", .states.join(", "))]
    InvalidTriggerForAnyState { trigger: String, states: Vec<String> },

    #[error("State machine has already been started")]
    AlreadyStarted,

    #[error("Configuration is frozen once the machine has been started")]
    ConfigurationAfterStart,

    #[error("State {state} failed while {phase}: {source}")]
    StateCallback {
        state: String,
        phase: CallbackPhase,
        #[source]
        source: StateError,
    },
}

impl MachineError {
    /// Stable numeric id for the error kind.
    pub fn code(&self) -> u16 {
        match self {
            Self::NotStarted => 1000,
            Self::DuplicateParallelPath { .. } => 1001,
            Self::CrossPathTransition { .. } => 1002,
            Self::ResolverReturnedNull { .. } => 1003,
            Self::NoStatesConfigured => 1004,
            Self::ResolverRequired { .. } => 1005,
            Self::CurrentStateUnavailableWhenParallel => 1006,
            Self::PolicyChangeAfterStart => 1007,
            Self::MultipleInitialStates => 1008,
            Self::MixedGuardedUnguarded { .. } => 1009,
            Self::DuplicateUnguardedTrigger { .. } => 1010,
            Self::InvalidTrigger { .. } => 1012,
            Self::MultipleGuardsTrue { .. } => 1013,
            Self::NoGuardTrue { .. } => 1014,
            Self::CannotGoBackWhenParallel => 1015,
            Self::InvalidTriggerForAnyState { .. } => 1016,
            Self::AlreadyStarted => 1017,
            Self::ConfigurationAfterStart => 1018,
            Self::StateCallback { .. } => 1019,
        }
    }

    /// True for errors raised while configuring rather than while running.
    pub fn is_configuration_error(&self) -> bool {
        matches!(
            self,
            Self::MultipleInitialStates
                | Self::MixedGuardedUnguarded { .. }
                | Self::DuplicateUnguardedTrigger { .. }
                | Self::CrossPathTransition { .. }
                | Self::ConfigurationAfterStart
                | Self::PolicyChangeAfterStart
        )
    }
}
