//! The machine handle: configuration entry points, lifecycle and queries.

use crate::builder::registry::Registry;
use crate::builder::{MachineSettings, StateConfiguration};
use crate::core::{
    BoxedState, HistoryEntry, InstantiationMode, SolidState, StateFactory, StateHistory, StateId,
    StateResolver, TriggerValue,
};
use crate::error::{MachineError, Result};
use crate::machine::queue::{Action, Dispatch};
use crate::machine::validation;
use chrono::{DateTime, Utc};
use parking_lot::{Mutex, RwLock};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use uuid::Uuid;

/// Lifecycle of the machine itself.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Lifecycle {
    /// Accepting configuration; not yet started.
    Unconfigured,
    /// Running; configuration is frozen.
    Started,
    /// Stopped for good. There is no restart.
    Stopped,
}

impl fmt::Display for Lifecycle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unconfigured => f.write_str("unconfigured"),
            Self::Started => f.write_str("started"),
            Self::Stopped => f.write_str("stopped"),
        }
    }
}

/// Notification sent to listeners once per state entry or final exit.
///
/// `source` is `None` for the initial entry on start. `target` is `None`
/// for exits performed by [`SolidMachine::stop`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(bound = "")]
pub struct Transitioned<S: StateId> {
    pub source: Option<S>,
    pub target: Option<S>,
}

pub(crate) type InvalidTriggerHandler<S, T> = Arc<dyn Fn(S, &T) + Send + Sync>;
pub(crate) type TransitionListener<S> = Arc<dyn Fn(&Transitioned<S>) + Send + Sync>;

/// Host-supplied callbacks and context. Cloned out before use so no lock is
/// held while host code runs.
pub(crate) struct Hooks<S: StateId, T: TriggerValue, C: Send + Sync + 'static> {
    pub resolver: Option<Arc<dyn StateResolver<S, T, C>>>,
    pub invalid_trigger: Option<InvalidTriggerHandler<S, T>>,
    pub listeners: Vec<TransitionListener<S>>,
    pub context: Option<Arc<C>>,
}

impl<S: StateId, T: TriggerValue, C: Send + Sync + 'static> Default for Hooks<S, T, C> {
    fn default() -> Self {
        Self {
            resolver: None,
            invalid_trigger: None,
            listeners: Vec::new(),
            context: None,
        }
    }
}

/// A declaratively configured state machine.
///
/// `S` is the state identity, `T` the trigger type and `C` an optional host
/// context object handed to every state callback.
///
/// The machine is `Send + Sync`; share it behind an `Arc` to fire triggers
/// from other threads. Triggers are serialized through a single FIFO queue,
/// so triggers fired from inside state callbacks run after the current
/// transition completes, in the order they were fired.
///
/// # Example
///
/// ```rust
/// use solid_state::core::SolidState;
/// use solid_state::machine::SolidMachine;
/// use solid_state::state_ids;
///
/// state_ids! { pub enum Door { Closed, Open } }
///
/// struct Plain;
/// impl SolidState<Door, &'static str> for Plain {}
///
/// # fn main() -> solid_state::error::Result<()> {
/// let machine: SolidMachine<Door, &'static str> = SolidMachine::new();
/// machine.state_with(Door::Closed, || Plain)?.on("open")?.goes_to(Door::Open)?;
/// machine.state_with(Door::Open, || Plain)?.on("close")?.goes_to(Door::Closed)?;
///
/// machine.start()?;
/// machine.trigger("open")?;
/// assert!(machine.is_in_state(Door::Open));
///
/// machine.go_back()?;
/// assert_eq!(machine.current_state()?, Some(Door::Closed));
/// # Ok(())
/// # }
/// ```
pub struct SolidMachine<S: StateId, T: TriggerValue, C: Send + Sync + 'static = ()> {
    pub(crate) id: Uuid,
    pub(crate) created_at: DateTime<Utc>,
    pub(crate) registry: Mutex<Registry<S, T, C>>,
    pub(crate) dispatch: Mutex<Dispatch<T>>,
    pub(crate) history: Mutex<StateHistory<S>>,
    pub(crate) hooks: RwLock<Hooks<S, T, C>>,
}

impl<S: StateId, T: TriggerValue, C: Send + Sync + 'static> Default for SolidMachine<S, T, C> {
    fn default() -> Self {
        Self::new()
    }
}

impl<S: StateId, T: TriggerValue, C: Send + Sync + 'static> fmt::Debug for SolidMachine<S, T, C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SolidMachine")
            .field("id", &self.id)
            .field("lifecycle", &self.lifecycle())
            .field("current_states", &self.current_states())
            .finish_non_exhaustive()
    }
}

impl<S: StateId, T: TriggerValue, C: Send + Sync + 'static> SolidMachine<S, T, C> {
    /// Create an unconfigured machine with default settings.
    pub fn new() -> Self {
        Self::with_settings(MachineSettings::default())
    }

    /// Create an unconfigured machine with the given settings.
    pub fn with_settings(settings: MachineSettings) -> Self {
        let settings = settings.normalized();
        Self {
            id: Uuid::new_v4(),
            created_at: Utc::now(),
            registry: Mutex::new(Registry::new(settings.instantiation_mode)),
            dispatch: Mutex::new(Dispatch::new()),
            history: Mutex::new(StateHistory::with_trim_threshold(
                settings.history_trim_threshold,
            )),
            hooks: RwLock::new(Hooks::default()),
        }
    }

    /// Create an unconfigured machine whose states receive `context`.
    pub fn with_context(context: C) -> Self {
        let machine = Self::new();
        machine.set_context(context);
        machine
    }

    // ---- configuration ----

    /// Declare (or revisit) a state and configure its transitions.
    ///
    /// Declaring a state does not give it behavior; unless a resolver is
    /// set, every state needs a factory from [`state_with`](Self::state_with)
    /// before the machine can start.
    pub fn state(&self, id: S) -> Result<StateConfiguration<'_, S, T, C>> {
        let node = self.configure(|registry| Ok(registry.declare(id)))?;
        Ok(StateConfiguration::new(self, node, id))
    }

    /// Declare a state together with the factory that builds its behavior.
    ///
    /// Registering a factory again for the same state replaces it.
    pub fn state_with<X, F>(&self, id: S, factory: F) -> Result<StateConfiguration<'_, S, T, C>>
    where
        X: SolidState<S, T, C> + 'static,
        F: Fn() -> X + Send + Sync + 'static,
    {
        let node = self.configure(|registry| {
            let node = registry.declare(id);
            let factory: StateFactory<S, T, C> =
                Arc::new(move || -> BoxedState<S, T, C> { Box::new(factory()) });
            registry.node_mut(node).factory = Some(factory);
            Ok(node)
        })?;
        Ok(StateConfiguration::new(self, node, id))
    }

    /// Declare a state whose behavior is built with `X::default()`.
    pub fn state_default<X>(&self, id: S) -> Result<StateConfiguration<'_, S, T, C>>
    where
        X: SolidState<S, T, C> + Default + 'static,
    {
        self.state_with(id, X::default)
    }

    pub(crate) fn configure<R>(
        &self,
        f: impl FnOnce(&mut Registry<S, T, C>) -> Result<R>,
    ) -> Result<R> {
        let dispatch = self.dispatch.lock();
        if dispatch.lifecycle != Lifecycle::Unconfigured {
            return Err(MachineError::ConfigurationAfterStart);
        }
        let mut registry = self.registry.lock();
        f(&mut registry)
    }

    /// Current instantiation policy.
    pub fn instantiation_mode(&self) -> InstantiationMode {
        self.registry.lock().mode
    }

    /// Change the instantiation policy. Only allowed before `start`.
    pub fn set_instantiation_mode(&self, mode: InstantiationMode) -> Result<()> {
        let dispatch = self.dispatch.lock();
        if dispatch.lifecycle != Lifecycle::Unconfigured {
            return Err(MachineError::PolicyChangeAfterStart);
        }
        self.registry.lock().mode = mode;
        Ok(())
    }

    /// Install a resolver. It takes precedence over per-state factories.
    pub fn set_state_resolver<R>(&self, resolver: R)
    where
        R: StateResolver<S, T, C> + 'static,
    {
        self.hooks.write().resolver = Some(Arc::new(resolver));
    }

    pub fn clear_state_resolver(&self) {
        self.hooks.write().resolver = None;
    }

    /// Route unmatched triggers to `handler` instead of failing.
    ///
    /// The handler receives the state that did not accept the trigger.
    pub fn on_invalid_trigger<F>(&self, handler: F)
    where
        F: Fn(S, &T) + Send + Sync + 'static,
    {
        self.hooks.write().invalid_trigger = Some(Arc::new(handler));
    }

    pub fn clear_invalid_trigger_handler(&self) {
        self.hooks.write().invalid_trigger = None;
    }

    /// Subscribe to transition notifications.
    pub fn on_transitioned<F>(&self, listener: F)
    where
        F: Fn(&Transitioned<S>) + Send + Sync + 'static,
    {
        self.hooks.write().listeners.push(Arc::new(listener));
    }

    /// Set the context object passed to state callbacks.
    pub fn set_context(&self, context: C) {
        self.hooks.write().context = Some(Arc::new(context));
    }

    pub fn context(&self) -> Option<Arc<C>> {
        self.hooks.read().context.clone()
    }

    // ---- lifecycle ----

    /// Freeze configuration and enter the initial state.
    ///
    /// Fails with `NoStatesConfigured` when nothing was declared and with
    /// `ResolverRequired` when states lack a way to be instantiated.
    pub fn start(&self) -> Result<()> {
        {
            let mut dispatch = self.dispatch.lock();
            if dispatch.lifecycle != Lifecycle::Unconfigured {
                return Err(MachineError::AlreadyStarted);
            }

            let registry = self.registry.lock();
            let has_resolver = self.hooks.read().resolver.is_some();
            validation::check_startup(&registry, has_resolver)?;

            dispatch.lifecycle = Lifecycle::Started;
            dispatch.queue.push_back(Action::Start);
        }

        tracing::info!(machine = %self.id, "machine started");
        self.process_queue()
    }

    /// Exit every current state and stop the machine for good.
    ///
    /// Pending actions are discarded. Does nothing unless the machine is
    /// started.
    pub fn stop(&self) -> Result<()> {
        {
            let mut dispatch = self.dispatch.lock();
            if dispatch.lifecycle != Lifecycle::Started {
                return Ok(());
            }
            dispatch.lifecycle = Lifecycle::Stopped;
            let discarded = dispatch.queue.len();
            dispatch.queue.clear();
            dispatch.queue.push_back(Action::Stop);
            tracing::debug!(machine = %self.id, discarded, "pending actions discarded");
        }

        self.process_queue()
    }

    /// Fire a trigger.
    ///
    /// Returns once the trigger and everything it caused to be queued has
    /// been processed, or immediately if another call is already draining
    /// the queue (including calls made from inside state callbacks).
    pub fn trigger(&self, trigger: T) -> Result<()> {
        self.enqueue(Action::Trigger(trigger))?;
        self.process_queue()
    }

    /// Return to the most recently exited state, ignoring guards and joins.
    ///
    /// Does nothing when the history is empty.
    pub fn go_back(&self) -> Result<()> {
        self.enqueue(Action::GoBack)?;
        self.process_queue()
    }

    fn enqueue(&self, action: Action<T>) -> Result<()> {
        let mut dispatch = self.dispatch.lock();
        if dispatch.lifecycle != Lifecycle::Started {
            return Err(MachineError::NotStarted);
        }
        dispatch.queue.push_back(action);
        tracing::trace!(
            machine = %self.id,
            pending = dispatch.queue.len(),
            "action queued"
        );
        Ok(())
    }

    // ---- queries ----

    pub fn machine_id(&self) -> Uuid {
        self.id
    }

    pub fn lifecycle(&self) -> Lifecycle {
        self.dispatch.lock().lifecycle
    }

    /// The state entered on `start`, if any state has been declared.
    pub fn initial_state(&self) -> Option<S> {
        let registry = self.registry.lock();
        registry.initial().map(|node| registry.node(node).id)
    }

    pub fn is_in_state(&self, id: S) -> bool {
        let registry = self.registry.lock();
        registry
            .lookup(&id)
            .is_some_and(|node| registry.current.contains(&node))
    }

    /// Every occupied state, in the order they were entered.
    pub fn current_states(&self) -> Vec<S> {
        self.registry.lock().current_ids()
    }

    /// The single occupied state.
    ///
    /// Fails with `CurrentStateUnavailableWhenParallel` while more than one
    /// state is occupied.
    pub fn current_state(&self) -> Result<Option<S>> {
        let current = self.current_states();
        if current.len() > 1 {
            return Err(MachineError::CurrentStateUnavailableWhenParallel);
        }
        Ok(current.first().copied())
    }

    /// Distinct triggers accepted by at least one current state.
    pub fn valid_triggers(&self) -> Vec<T> {
        self.registry.lock().valid_triggers()
    }

    /// Previously exited states, most recent first.
    pub fn state_history(&self) -> Vec<S> {
        self.history.lock().states()
    }

    /// Like [`state_history`](Self::state_history), with exit timestamps.
    pub fn history_entries(&self) -> Vec<HistoryEntry<S>> {
        self.history.lock().entries()
    }

    pub fn history_trim_threshold(&self) -> usize {
        self.history.lock().trim_threshold()
    }

    /// Change the trim threshold, trimming immediately if it was lowered.
    pub fn set_history_trim_threshold(&self, threshold: usize) {
        self.history.lock().set_trim_threshold(threshold);
    }
}
