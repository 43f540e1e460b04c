//! Serializable point-in-time view of a machine, for diagnostics.

use crate::core::{HistoryEntry, InstantiationMode, StateId, TriggerValue};
use crate::machine::state_machine::{Lifecycle, SolidMachine};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Per-state configuration and runtime counters.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(bound = "")]
pub struct StateSummary<S: StateId> {
    pub state: S,
    /// Path index; `None` is the main path
    pub path: Option<u32>,
    /// Number of join edges into this state
    pub total_joins: usize,
    /// Join triggers still needed before the state is entered
    pub pending_joins: usize,
    /// Number of configured trigger edges
    pub edges: usize,
    pub has_factory: bool,
}

/// Snapshot of a machine.
///
/// There is no restore: the snapshot is for logging, inspection and tests.
///
/// # Example
///
/// ```rust
/// use solid_state::core::SolidState;
/// use solid_state::machine::{Lifecycle, SolidMachine};
/// use solid_state::state_ids;
///
/// state_ids! { pub enum Lamp { Off, On } }
///
/// struct Plain;
/// impl SolidState<Lamp, u8> for Plain {}
///
/// # fn main() -> solid_state::error::Result<()> {
/// let machine: SolidMachine<Lamp, u8> = SolidMachine::new();
/// machine.state_with(Lamp::Off, || Plain)?.on(1)?.goes_to(Lamp::On)?;
/// machine.state_with(Lamp::On, || Plain)?;
/// machine.start()?;
///
/// let snapshot = machine.snapshot();
/// assert_eq!(snapshot.lifecycle, Lifecycle::Started);
/// assert_eq!(snapshot.current_states, vec![Lamp::Off]);
/// assert!(serde_json::to_string(&snapshot).is_ok());
/// # Ok(())
/// # }
/// ```
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(bound = "")]
pub struct MachineSnapshot<S: StateId> {
    pub machine_id: Uuid,
    pub created_at: DateTime<Utc>,
    pub taken_at: DateTime<Utc>,
    pub lifecycle: Lifecycle,
    pub instantiation_mode: InstantiationMode,
    pub initial_state: Option<S>,
    pub current_states: Vec<S>,
    pub history: Vec<HistoryEntry<S>>,
    pub history_trim_threshold: usize,
    /// Actions queued but not yet processed
    pub pending_actions: usize,
    pub states: Vec<StateSummary<S>>,
}

impl<S: StateId> MachineSnapshot<S> {
    /// Summary for `state`, if it was declared.
    pub fn state(&self, state: S) -> Option<&StateSummary<S>> {
        self.states.iter().find(|summary| summary.state == state)
    }

    pub fn is_parallel(&self) -> bool {
        self.current_states.len() > 1
    }
}

impl<S: StateId, T: TriggerValue, C: Send + Sync + 'static> SolidMachine<S, T, C> {
    /// Capture the machine's current configuration and runtime state.
    pub fn snapshot(&self) -> MachineSnapshot<S> {
        let (lifecycle, pending_actions) = {
            let dispatch = self.dispatch.lock();
            (dispatch.lifecycle, dispatch.queue.len())
        };

        let (instantiation_mode, initial_state, current_states, states) = {
            let registry = self.registry.lock();
            let states = registry
                .nodes()
                .map(|node| StateSummary {
                    state: node.id,
                    path: node.path,
                    total_joins: node.total_joins,
                    pending_joins: node.join_counter,
                    edges: node.edges.len(),
                    has_factory: node.factory.is_some(),
                })
                .collect();
            (
                registry.mode,
                registry.initial().map(|node| registry.node(node).id),
                registry.current_ids(),
                states,
            )
        };

        let (history, history_trim_threshold) = {
            let history = self.history.lock();
            (history.entries(), history.trim_threshold())
        };

        MachineSnapshot {
            machine_id: self.id,
            created_at: self.created_at,
            taken_at: Utc::now(),
            lifecycle,
            instantiation_mode,
            initial_state,
            current_states,
            history,
            history_trim_threshold,
            pending_actions,
            states,
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::core::SolidState;
    use crate::machine::{Lifecycle, MachineSnapshot, SolidMachine};

    crate::state_ids! {
        enum Job {
            Queued,
            Fetch,
            Parse,
            Store,
        }
    }

    struct Plain;

    impl SolidState<Job, &'static str> for Plain {}

    fn forked() -> SolidMachine<Job, &'static str> {
        let machine = SolidMachine::new();
        machine
            .state_with(Job::Queued, || Plain)
            .unwrap()
            .on("run")
            .unwrap()
            .forks_to(Job::Fetch, Job::Parse)
            .unwrap();
        machine
            .state_with(Job::Fetch, || Plain)
            .unwrap()
            .on("done")
            .unwrap()
            .joins_to(Job::Store)
            .unwrap();
        machine
            .state_with(Job::Parse, || Plain)
            .unwrap()
            .on("done")
            .unwrap()
            .joins_to(Job::Store)
            .unwrap();
        machine.state_with(Job::Store, || Plain).unwrap();
        machine
    }

    #[test]
    fn snapshot_reports_configuration_before_start() {
        let snapshot = forked().snapshot();

        assert_eq!(snapshot.lifecycle, Lifecycle::Unconfigured);
        assert_eq!(snapshot.initial_state, Some(Job::Queued));
        assert!(snapshot.current_states.is_empty());
        assert_eq!(snapshot.states.len(), 4);

        let store = snapshot.state(Job::Store).unwrap();
        assert_eq!(store.total_joins, 2);
        assert_eq!(store.path, None);
        assert!(snapshot.state(Job::Fetch).unwrap().path.is_some());
        assert_eq!(snapshot.state(Job::Queued).unwrap().path, None);
    }

    #[test]
    fn snapshot_tracks_pending_joins() {
        let machine = forked();
        machine.start().unwrap();
        machine.trigger("run").unwrap();

        let snapshot = machine.snapshot();
        assert!(snapshot.is_parallel());
        assert_eq!(snapshot.state(Job::Store).unwrap().pending_joins, 2);
    }

    #[test]
    fn snapshot_serializes_to_json() {
        let machine = forked();
        machine.start().unwrap();
        machine.trigger("run").unwrap();

        let snapshot = machine.snapshot();
        let json = serde_json::to_string(&snapshot).unwrap();
        let back: MachineSnapshot<Job> = serde_json::from_str(&json).unwrap();
        assert_eq!(back, snapshot);
    }
}
