//! Processing of queued actions: trigger handling, exits, entries, joins.
//!
//! Locks are taken only around registry, history and hook bookkeeping.
//! State instances are moved out of their node while their callback runs
//! and moved back afterwards, so callbacks can query the machine and fire
//! triggers freely.

use crate::builder::registry::{EdgeSnapshot, NodeId};
use crate::core::{BoxedState, Guard, InstantiationMode, StateContext, StateId, TriggerValue};
use crate::error::{CallbackPhase, MachineError, Result};
use crate::machine::state_machine::{SolidMachine, Transitioned};

impl<S: StateId, T: TriggerValue, C: Send + Sync + 'static> SolidMachine<S, T, C> {
    pub(crate) fn enter_initial(&self) -> Result<()> {
        let initial = self
            .registry
            .lock()
            .initial()
            .ok_or(MachineError::NoStatesConfigured)?;
        self.enter_state(None, initial)
    }

    pub(crate) fn handle_trigger(&self, trigger: &T) -> Result<()> {
        let (snapshot, evaluated) = {
            let registry = self.registry.lock();
            (registry.current.clone(), registry.current_ids())
        };
        let invalid_handler = self.hooks.read().invalid_trigger.clone();
        let mut handled = false;

        for node in snapshot {
            let (id, path, edges) = {
                let registry = self.registry.lock();
                let state = registry.node(node);
                (state.id, state.path, registry.matching_edges(node, trigger))
            };

            if edges.is_empty() {
                if let Some(handler) = &invalid_handler {
                    tracing::warn!(
                        machine = %self.id,
                        state = id.name(),
                        ?trigger,
                        "trigger routed to invalid-trigger handler"
                    );
                    handler(id, trigger);
                    continue;
                }
                // Forked paths may legitimately ignore a trigger.
                if path.is_none() {
                    return Err(MachineError::InvalidTrigger {
                        trigger: format!("{trigger:?}"),
                        state: id.name().to_string(),
                    });
                }
                continue;
            }

            if let [edge] = edges.as_slice() {
                if edge.guard.is_none() {
                    self.exit_state(node, true)?;
                    self.enter_states(Some(id), edge)?;
                    handled = true;
                    continue;
                }
            }

            // Guarded: exit first, guards may observe exit side effects.
            self.exit_state(node, true)?;
            let passing: Vec<&EdgeSnapshot> = edges
                .iter()
                .filter(|edge| edge.guard.as_ref().is_some_and(Guard::check))
                .collect();

            match passing.as_slice() {
                [edge] => {
                    self.enter_states(Some(id), edge)?;
                    handled = true;
                }
                [] if path.is_some() => {
                    tracing::debug!(
                        machine = %self.id,
                        state = id.name(),
                        ?trigger,
                        "no guard passed on forked path"
                    );
                }
                [] => {
                    return Err(MachineError::NoGuardTrue {
                        state: id.name().to_string(),
                        trigger: format!("{trigger:?}"),
                    });
                }
                _ => {
                    return Err(MachineError::MultipleGuardsTrue {
                        state: id.name().to_string(),
                        trigger: format!("{trigger:?}"),
                    });
                }
            }
        }

        if !handled && invalid_handler.is_none() {
            let states = evaluated
                .iter()
                .map(|state| state.name().to_string())
                .collect();
            return Err(MachineError::InvalidTriggerForAnyState {
                trigger: format!("{trigger:?}"),
                states,
            });
        }
        Ok(())
    }

    fn enter_states(&self, previous: Option<S>, edge: &EdgeSnapshot) -> Result<()> {
        for &target in &edge.targets {
            {
                let mut registry = self.registry.lock();
                if registry.current.contains(&target) {
                    return Err(MachineError::DuplicateParallelPath {
                        state: registry.node(target).name(),
                    });
                }

                if edge.is_join {
                    let node = registry.node_mut(target);
                    node.join_counter = node.join_counter.saturating_sub(1);
                    if node.join_counter > 0 {
                        tracing::debug!(
                            machine = %self.id,
                            state = node.id.name(),
                            remaining = node.join_counter,
                            "join waiting for paths"
                        );
                        continue;
                    }
                }
            }
            self.enter_state(previous, target)?;
        }
        Ok(())
    }

    /// Make `target` current and run its `entering` callback. Every entry,
    /// joined or direct, rearms the target's join counter.
    fn enter_state(&self, previous: Option<S>, target: NodeId) -> Result<()> {
        let mut instance = self.instantiate(target)?;
        let id = {
            let mut registry = self.registry.lock();
            registry.current.push(target);
            let node = registry.node_mut(target);
            node.join_counter = node.total_joins;
            node.id
        };
        tracing::debug!(
            machine = %self.id,
            state = id.name(),
            from = previous.as_ref().map(StateId::name),
            "entering state"
        );

        let result = instance.entering(&self.state_context());
        self.registry.lock().node_mut(target).instance = Some(instance);
        result.map_err(|source| MachineError::StateCallback {
            state: id.name().to_string(),
            phase: CallbackPhase::Entering,
            source,
        })?;

        self.notify(&Transitioned {
            source: previous,
            target: Some(id),
        });
        Ok(())
    }

    /// Run `node`'s `exiting` callback and remove it from the current set.
    ///
    /// The exit is recorded in history only when `record` is set and
    /// `node` is the sole current state.
    fn exit_state(&self, node: NodeId, record: bool) -> Result<S> {
        let (id, instance, record, mode) = {
            let mut registry = self.registry.lock();
            let record = record && registry.current.len() == 1;
            let mode = registry.mode;
            let state = registry.node_mut(node);
            (state.id, state.instance.take(), record, mode)
        };
        tracing::debug!(machine = %self.id, state = id.name(), "exiting state");

        if let Some(mut instance) = instance {
            let result = instance.exiting(&self.state_context());
            // A failed exit leaves the state current, so it keeps its instance.
            if mode == InstantiationMode::Singleton || result.is_err() {
                self.registry.lock().node_mut(node).instance = Some(instance);
            }
            result.map_err(|source| MachineError::StateCallback {
                state: id.name().to_string(),
                phase: CallbackPhase::Exiting,
                source,
            })?;
        }

        if record {
            self.history.lock().push(id);
        }
        self.registry.lock().current.retain(|&current| current != node);
        Ok(id)
    }

    pub(crate) fn go_back_now(&self) -> Result<()> {
        let current = self.registry.lock().current.clone();
        if current.len() > 1 {
            return Err(MachineError::CannotGoBackWhenParallel);
        }
        if self.history.lock().is_empty() {
            tracing::trace!(machine = %self.id, "history empty, nothing to go back to");
            return Ok(());
        }

        let source = match current.first() {
            Some(&node) => Some(self.exit_state(node, false)?),
            None => None,
        };

        let Some(previous) = self.history.lock().pop() else {
            return Ok(());
        };
        let Some(target) = self.registry.lock().lookup(&previous) else {
            return Ok(());
        };

        tracing::debug!(machine = %self.id, state = previous.name(), "going back");
        self.enter_state(source, target)
    }

    pub(crate) fn stop_now(&self) -> Result<()> {
        let current = self.registry.lock().current.clone();
        for node in current {
            let id = self.exit_state(node, false)?;
            self.notify(&Transitioned {
                source: Some(id),
                target: None,
            });
        }
        tracing::info!(machine = %self.id, "machine stopped");
        Ok(())
    }

    /// Produce the instance to enter `node` with: the cached one under
    /// singleton mode, otherwise from the resolver or the state's factory.
    fn instantiate(&self, node: NodeId) -> Result<BoxedState<S, T, C>> {
        let (id, cached, factory) = {
            let mut registry = self.registry.lock();
            let singleton = registry.mode == InstantiationMode::Singleton;
            let state = registry.node_mut(node);
            let cached = state.instance.take().filter(|_| singleton);
            (state.id, cached, state.factory.clone())
        };
        if let Some(instance) = cached {
            return Ok(instance);
        }

        let resolver = self.hooks.read().resolver.clone();
        if let Some(resolver) = resolver {
            return resolver
                .resolve(id)
                .ok_or_else(|| MachineError::ResolverReturnedNull {
                    state: id.name().to_string(),
                });
        }

        match factory {
            Some(factory) => Ok(factory()),
            None => Err(MachineError::ResolverRequired {
                states: vec![id.name().to_string()],
            }),
        }
    }

    fn state_context(&self) -> StateContext<'_, S, T, C> {
        StateContext::new(self, self.hooks.read().context.clone())
    }

    fn notify(&self, event: &Transitioned<S>) {
        let listeners = self.hooks.read().listeners.clone();
        for listener in listeners {
            listener(event);
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::core::{InstantiationMode, SolidState, StateContext};
    use crate::error::{CallbackPhase, MachineError, StateError};
    use crate::machine::{SolidMachine, Transitioned};
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};

    crate::state_ids! {
        enum Call {
            Idle,
            Ringing,
            Talking,
            Voicemail,
        }
    }

    type Machine = SolidMachine<Call, &'static str>;
    type Ctx<'a> = StateContext<'a, Call, &'static str>;

    struct Plain;

    impl SolidState<Call, &'static str> for Plain {}

    /// Counts constructions, entries and exits across all instances.
    #[derive(Clone, Default)]
    struct Counters {
        built: Arc<AtomicUsize>,
        entered: Arc<AtomicUsize>,
        exited: Arc<AtomicUsize>,
    }

    struct Counted {
        counters: Counters,
    }

    impl SolidState<Call, &'static str> for Counted {
        fn entering(&mut self, _context: &Ctx<'_>) -> Result<(), StateError> {
            self.counters.entered.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }

        fn exiting(&mut self, _context: &Ctx<'_>) -> Result<(), StateError> {
            self.counters.exited.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    fn counted_machine(mode: InstantiationMode) -> (Machine, Counters) {
        let machine = Machine::new();
        machine.set_instantiation_mode(mode).unwrap();
        let counters = Counters::default();

        let c = counters.clone();
        machine
            .state_with(Call::Idle, move || {
                c.built.fetch_add(1, Ordering::SeqCst);
                Counted {
                    counters: c.clone(),
                }
            })
            .unwrap()
            .on("ring")
            .unwrap()
            .goes_to(Call::Ringing)
            .unwrap();
        machine
            .state_with(Call::Ringing, || Plain)
            .unwrap()
            .on("hang_up")
            .unwrap()
            .goes_to(Call::Idle)
            .unwrap();
        (machine, counters)
    }

    #[test]
    fn singleton_instances_are_reused() {
        let (machine, counters) = counted_machine(InstantiationMode::Singleton);
        machine.start().unwrap();
        for _ in 0..3 {
            machine.trigger("ring").unwrap();
            machine.trigger("hang_up").unwrap();
        }

        assert_eq!(counters.built.load(Ordering::SeqCst), 1);
        assert_eq!(counters.entered.load(Ordering::SeqCst), 4);
        assert_eq!(counters.exited.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn per_transition_instances_are_rebuilt_on_every_entry() {
        let (machine, counters) = counted_machine(InstantiationMode::PerTransition);
        machine.start().unwrap();
        for _ in 0..3 {
            machine.trigger("ring").unwrap();
            machine.trigger("hang_up").unwrap();
        }

        assert_eq!(counters.built.load(Ordering::SeqCst), 4);
        assert_eq!(counters.entered.load(Ordering::SeqCst), 4);
        assert_eq!(counters.exited.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn resolver_takes_precedence_over_factories() {
        let machine = Machine::new();
        let from_factory = Arc::new(AtomicBool::new(false));
        let flag = from_factory.clone();
        machine
            .state_with(Call::Idle, move || {
                flag.store(true, Ordering::SeqCst);
                Plain
            })
            .unwrap();
        machine.set_state_resolver(|_: Call| -> Option<crate::core::BoxedState<Call, &'static str>> {
            Some(Box::new(Plain))
        });

        machine.start().unwrap();
        assert!(!from_factory.load(Ordering::SeqCst));
        assert!(machine.is_in_state(Call::Idle));
    }

    #[test]
    fn resolver_returning_none_fails_the_entry() {
        let machine = Machine::new();
        machine
            .state(Call::Idle)
            .unwrap()
            .on("ring")
            .unwrap()
            .goes_to(Call::Ringing)
            .unwrap();
        machine.set_state_resolver(|state: Call| -> Option<crate::core::BoxedState<Call, &'static str>> {
            match state {
                Call::Idle => Some(Box::new(Plain)),
                _ => None,
            }
        });

        machine.start().unwrap();
        let err = machine.trigger("ring").unwrap_err();
        assert!(matches!(err, MachineError::ResolverReturnedNull { ref state } if state == "Ringing"));
        // Exit happened, entry did not.
        assert!(machine.current_states().is_empty());
    }

    #[test]
    fn missing_factories_fail_start() {
        let machine = Machine::new();
        machine
            .state_with(Call::Idle, || Plain)
            .unwrap()
            .on("ring")
            .unwrap()
            .goes_to(Call::Ringing)
            .unwrap();

        match machine.start() {
            Err(MachineError::ResolverRequired { states }) => assert_eq!(states, vec!["Ringing"]),
            other => panic!("expected ResolverRequired, got {other:?}"),
        }
    }

    #[test]
    fn guards_see_exit_side_effects() {
        let machine = Machine::new();
        let exited = Arc::new(AtomicBool::new(false));

        struct Marks(Arc<AtomicBool>);
        impl SolidState<Call, &'static str> for Marks {
            fn exiting(&mut self, _context: &Ctx<'_>) -> Result<(), StateError> {
                self.0.store(true, Ordering::SeqCst);
                Ok(())
            }
        }

        let mark = exited.clone();
        let after_exit = exited.clone();
        let before_exit = exited.clone();
        machine
            .state_with(Call::Ringing, move || Marks(mark.clone()))
            .unwrap()
            .on_when("timeout", move || after_exit.load(Ordering::SeqCst))
            .unwrap()
            .goes_to(Call::Voicemail)
            .unwrap()
            .on_when("timeout", move || !before_exit.load(Ordering::SeqCst))
            .unwrap()
            .goes_to(Call::Talking)
            .unwrap();
        machine.state_with(Call::Voicemail, || Plain).unwrap();
        machine.state_with(Call::Talking, || Plain).unwrap();

        machine.start().unwrap();
        machine.trigger("timeout").unwrap();
        assert!(machine.is_in_state(Call::Voicemail));
    }

    #[test]
    fn failed_guards_leave_the_source_exited() {
        let machine = Machine::new();
        machine
            .state_with(Call::Ringing, || Plain)
            .unwrap()
            .on_when("answer", || false)
            .unwrap()
            .goes_to(Call::Talking)
            .unwrap()
            .on_when("answer", || false)
            .unwrap()
            .goes_to(Call::Voicemail)
            .unwrap();
        machine.state_with(Call::Talking, || Plain).unwrap();
        machine.state_with(Call::Voicemail, || Plain).unwrap();

        machine.start().unwrap();
        let err = machine.trigger("answer").unwrap_err();
        assert!(matches!(err, MachineError::NoGuardTrue { .. }));
        assert!(machine.current_states().is_empty());
        assert_eq!(machine.state_history(), vec![Call::Ringing]);
    }

    #[test]
    fn multiple_passing_guards_are_an_error() {
        let machine = Machine::new();
        machine
            .state_with(Call::Ringing, || Plain)
            .unwrap()
            .on_when("answer", || true)
            .unwrap()
            .goes_to(Call::Talking)
            .unwrap()
            .on_when("answer", || true)
            .unwrap()
            .goes_to(Call::Voicemail)
            .unwrap();
        machine.state_with(Call::Talking, || Plain).unwrap();
        machine.state_with(Call::Voicemail, || Plain).unwrap();

        machine.start().unwrap();
        assert!(matches!(
            machine.trigger("answer"),
            Err(MachineError::MultipleGuardsTrue { .. })
        ));
    }

    #[test]
    fn callback_errors_carry_state_and_phase() {
        struct Broken;
        impl SolidState<Call, &'static str> for Broken {
            fn exiting(&mut self, _context: &Ctx<'_>) -> Result<(), StateError> {
                Err("line dead".into())
            }
        }

        let machine = Machine::new();
        machine
            .state_with(Call::Idle, || Broken)
            .unwrap()
            .on("ring")
            .unwrap()
            .goes_to(Call::Ringing)
            .unwrap();
        machine.state_with(Call::Ringing, || Plain).unwrap();
        machine.start().unwrap();

        match machine.trigger("ring") {
            Err(MachineError::StateCallback { state, phase, source }) => {
                assert_eq!(state, "Idle");
                assert_eq!(phase, CallbackPhase::Exiting);
                assert_eq!(source.to_string(), "line dead");
            }
            other => panic!("expected StateCallback, got {other:?}"),
        }
        assert!(machine.is_in_state(Call::Idle));
    }

    #[test]
    fn stop_notifies_each_exit_with_no_target() {
        let machine = Machine::new();
        machine
            .state_with(Call::Idle, || Plain)
            .unwrap()
            .on("ring")
            .unwrap()
            .goes_to(Call::Ringing)
            .unwrap();
        machine.state_with(Call::Ringing, || Plain).unwrap();

        let events = Arc::new(Mutex::new(Vec::new()));
        let sink = events.clone();
        machine.on_transitioned(move |event| sink.lock().unwrap().push(*event));

        machine.start().unwrap();
        machine.trigger("ring").unwrap();
        machine.stop().unwrap();

        let events = events.lock().unwrap();
        assert_eq!(
            *events,
            vec![
                Transitioned {
                    source: None,
                    target: Some(Call::Idle)
                },
                Transitioned {
                    source: Some(Call::Idle),
                    target: Some(Call::Ringing)
                },
                Transitioned {
                    source: Some(Call::Ringing),
                    target: None
                },
            ]
        );
        assert_eq!(machine.state_history(), vec![Call::Idle]);
    }
}
