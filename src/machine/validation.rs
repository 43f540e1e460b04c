//! Checks run by `start` before the machine leaves the unconfigured state.
//!
//! Uses `Validation` so that every state lacking a way to be instantiated is
//! reported at once rather than one per attempt.

use crate::builder::registry::{Registry, StateNode};
use crate::core::{StateId, TriggerValue};
use crate::error::{MachineError, Result};
use stillwater::validation::Validation;
use stillwater::NonEmptyVec;

/// A state can be instantiated if a resolver is set or it has a factory.
fn check_instantiable<S, T, C>(
    node: &StateNode<S, T, C>,
    has_resolver: bool,
) -> Validation<(), NonEmptyVec<String>>
where
    S: StateId,
    T: TriggerValue,
    C: Send + Sync + 'static,
{
    if has_resolver || node.factory.is_some() {
        Validation::success(())
    } else {
        Validation::fail(node.name())
    }
}

/// Validate the registry for start-up.
pub(crate) fn check_startup<S, T, C>(registry: &Registry<S, T, C>, has_resolver: bool) -> Result<()>
where
    S: StateId,
    T: TriggerValue,
    C: Send + Sync + 'static,
{
    if registry.is_empty() {
        return Err(MachineError::NoStatesConfigured);
    }

    let checks: Vec<Validation<(), NonEmptyVec<String>>> = registry
        .nodes()
        .map(|node| check_instantiable(node, has_resolver))
        .collect();

    match Validation::all_vec(checks) {
        Validation::Success(_) => Ok(()),
        Validation::Failure(missing) => Err(MachineError::ResolverRequired {
            states: missing.iter().cloned().collect(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::registry::Targets;
    use crate::core::{BoxedState, InstantiationMode, SolidState};
    use std::sync::Arc;

    crate::state_ids! {
        enum Room {
            Hall,
            Kitchen,
            Cellar,
        }
    }

    struct Empty;

    impl SolidState<Room, char> for Empty {}

    fn with_factory(registry: &mut Registry<Room, char, ()>, id: Room) {
        let node = registry.declare(id);
        registry.node_mut(node).factory =
            Some(Arc::new(|| -> BoxedState<Room, char> { Box::new(Empty) }));
    }

    #[test]
    fn empty_registry_has_no_states() {
        let registry: Registry<Room, char, ()> = Registry::new(InstantiationMode::Singleton);
        assert!(matches!(
            check_startup(&registry, true),
            Err(MachineError::NoStatesConfigured)
        ));
    }

    #[test]
    fn every_state_without_a_factory_is_reported() {
        let mut registry: Registry<Room, char, ()> = Registry::new(InstantiationMode::Singleton);
        with_factory(&mut registry, Room::Hall);
        let hall = registry.declare(Room::Hall);
        registry
            .add_edge(hall, 'k', None, Targets::Single(Room::Kitchen))
            .unwrap();
        registry
            .add_edge(hall, 'c', None, Targets::Single(Room::Cellar))
            .unwrap();

        match check_startup(&registry, false) {
            Err(MachineError::ResolverRequired { states }) => {
                assert_eq!(states, vec!["Kitchen".to_string(), "Cellar".to_string()]);
            }
            other => panic!("expected ResolverRequired, got {other:?}"),
        }
    }

    #[test]
    fn resolver_covers_states_without_factories() {
        let mut registry: Registry<Room, char, ()> = Registry::new(InstantiationMode::Singleton);
        registry.declare(Room::Hall);
        registry.declare(Room::Kitchen);
        assert!(check_startup(&registry, true).is_ok());
    }

    #[test]
    fn fully_built_registry_passes() {
        let mut registry: Registry<Room, char, ()> = Registry::new(InstantiationMode::Singleton);
        with_factory(&mut registry, Room::Hall);
        with_factory(&mut registry, Room::Kitchen);
        assert!(check_startup(&registry, false).is_ok());
    }
}
