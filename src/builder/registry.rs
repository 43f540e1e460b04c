//! Arena of configured states and the fork/join path graph.
//!
//! Every state identity maps to one [`StateNode`] in a flat arena; edges and
//! the current-state set refer to nodes by index. Path indices partition
//! the graph into concurrent regions: `None` is the main path, forks mint a
//! fresh index per target and remember the path they forked from, joins
//! collapse back to that enclosing path.

use crate::core::{BoxedState, Guard, InstantiationMode, StateFactory, StateId, TriggerValue};
use crate::error::{MachineError, Result};
use std::collections::HashMap;

pub(crate) type NodeId = usize;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum EdgeKind {
    Single,
    Fork,
    Join,
}

/// Target declaration for a new edge, by identity.
pub(crate) enum Targets<S> {
    Single(S),
    Fork(Vec<S>),
    Join(S),
}

pub(crate) struct TriggerEdge<T> {
    pub trigger: T,
    pub guard: Option<Guard>,
    pub targets: Vec<NodeId>,
    pub kind: EdgeKind,
}

/// Copy of an edge taken so guards can run without the registry locked.
#[derive(Clone, Debug)]
pub(crate) struct EdgeSnapshot {
    pub guard: Option<Guard>,
    pub targets: Vec<NodeId>,
    pub is_join: bool,
}

/// Path changes an edge would make, staged so nothing is applied until the
/// whole edge has been checked.
#[derive(Default)]
struct PathPlan {
    labels: HashMap<NodeId, Option<u32>>,
    minted: Vec<Option<u32>>,
}

impl PathPlan {
    fn path<S: StateId, T: TriggerValue, C: Send + Sync + 'static>(
        &self,
        registry: &Registry<S, T, C>,
        node: NodeId,
    ) -> Option<u32> {
        match self.labels.get(&node) {
            Some(&path) => path,
            None => registry.nodes[node].path,
        }
    }

    fn mint<S: StateId, T: TriggerValue, C: Send + Sync + 'static>(
        &mut self,
        registry: &Registry<S, T, C>,
        parent: Option<u32>,
    ) -> u32 {
        let path = registry.fork_parents.len() + self.minted.len();
        self.minted.push(parent);
        path as u32
    }

    fn parent<S: StateId, T: TriggerValue, C: Send + Sync + 'static>(
        &self,
        registry: &Registry<S, T, C>,
        path: u32,
    ) -> Option<u32> {
        let index = path as usize;
        match registry.fork_parents.get(index) {
            Some(&parent) => parent,
            None => self
                .minted
                .get(index - registry.fork_parents.len())
                .copied()
                .flatten(),
        }
    }

    /// `path` followed by each enclosing path out to the main path.
    fn lineage<S: StateId, T: TriggerValue, C: Send + Sync + 'static>(
        &self,
        registry: &Registry<S, T, C>,
        path: Option<u32>,
    ) -> Vec<Option<u32>> {
        let mut lineage = vec![path];
        let mut current = path;
        while let Some(inner) = current {
            current = self.parent(registry, inner);
            lineage.push(current);
        }
        lineage
    }

    /// Innermost path enclosing both `a` and `b`.
    fn enclosing<S: StateId, T: TriggerValue, C: Send + Sync + 'static>(
        &self,
        registry: &Registry<S, T, C>,
        a: Option<u32>,
        b: Option<u32>,
    ) -> Option<u32> {
        let outer = self.lineage(registry, b);
        self.lineage(registry, a)
            .into_iter()
            .find(|path| outer.contains(path))
            .flatten()
    }
}

pub(crate) struct StateNode<S: StateId, T: TriggerValue, C: Send + Sync + 'static> {
    pub id: S,
    pub edges: Vec<TriggerEdge<T>>,
    pub path: Option<u32>,
    pub total_joins: usize,
    pub join_counter: usize,
    pub factory: Option<StateFactory<S, T, C>>,
    pub instance: Option<BoxedState<S, T, C>>,
}

impl<S: StateId, T: TriggerValue, C: Send + Sync + 'static> StateNode<S, T, C> {
    fn new(id: S) -> Self {
        Self {
            id,
            edges: Vec::new(),
            path: None,
            total_joins: 0,
            join_counter: 0,
            factory: None,
            instance: None,
        }
    }

    pub fn name(&self) -> String {
        self.id.name().to_string()
    }
}

pub(crate) struct Registry<S: StateId, T: TriggerValue, C: Send + Sync + 'static> {
    nodes: Vec<StateNode<S, T, C>>,
    index: HashMap<S, NodeId>,
    initial: Option<NodeId>,
    explicit_initial: bool,
    /// Enclosing path of every minted fork path, indexed by path.
    fork_parents: Vec<Option<u32>>,
    pub current: Vec<NodeId>,
    pub mode: InstantiationMode,
}

impl<S: StateId, T: TriggerValue, C: Send + Sync + 'static> Registry<S, T, C> {
    pub fn new(mode: InstantiationMode) -> Self {
        Self {
            nodes: Vec::new(),
            index: HashMap::new(),
            initial: None,
            explicit_initial: false,
            fork_parents: Vec::new(),
            current: Vec::new(),
            mode,
        }
    }

    /// Return the node for `id`, creating it if needed. The first node ever
    /// created becomes the implicit initial state.
    pub fn declare(&mut self, id: S) -> NodeId {
        if let Some(&node) = self.index.get(&id) {
            return node;
        }

        let node = self.nodes.len();
        self.nodes.push(StateNode::new(id));
        self.index.insert(id, node);
        if self.initial.is_none() {
            self.initial = Some(node);
        }
        node
    }

    pub fn lookup(&self, id: &S) -> Option<NodeId> {
        self.index.get(id).copied()
    }

    pub fn node(&self, node: NodeId) -> &StateNode<S, T, C> {
        &self.nodes[node]
    }

    pub fn node_mut(&mut self, node: NodeId) -> &mut StateNode<S, T, C> {
        &mut self.nodes[node]
    }

    pub fn nodes(&self) -> impl Iterator<Item = &StateNode<S, T, C>> {
        self.nodes.iter()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn initial(&self) -> Option<NodeId> {
        self.initial
    }

    pub fn mark_initial(&mut self, node: NodeId) -> Result<()> {
        if self.explicit_initial {
            return Err(MachineError::MultipleInitialStates);
        }
        self.initial = Some(node);
        self.explicit_initial = true;
        Ok(())
    }

    /// Validate that a new edge on `trigger` may be added to `node`.
    pub fn check_trigger(&self, node: NodeId, trigger: &T, guarded: bool) -> Result<()> {
        let existing: Vec<&TriggerEdge<T>> = self.nodes[node]
            .edges
            .iter()
            .filter(|edge| edge.trigger == *trigger)
            .collect();

        let Some(first) = existing.first() else {
            return Ok(());
        };

        let state = self.nodes[node].name();
        let trigger = format!("{trigger:?}");
        match (guarded, first.guard.is_some()) {
            (false, false) => Err(MachineError::DuplicateUnguardedTrigger { state, trigger }),
            (false, true) | (true, false) => {
                Err(MachineError::MixedGuardedUnguarded { state, trigger })
            }
            (true, true) => Ok(()),
        }
    }

    /// Add an edge from `source`, linking (and creating) its targets and
    /// assigning path indices. A rejected edge leaves the registry as it was.
    pub fn add_edge(
        &mut self,
        source: NodeId,
        trigger: T,
        guard: Option<Guard>,
        targets: Targets<S>,
    ) -> Result<()> {
        self.check_trigger(source, &trigger, guard.is_some())?;

        let declared = self.nodes.len();
        let (kind, targets) = match targets {
            Targets::Single(id) => (EdgeKind::Single, vec![self.declare(id)]),
            Targets::Fork(ids) => (
                EdgeKind::Fork,
                ids.into_iter().map(|id| self.declare(id)).collect(),
            ),
            Targets::Join(id) => (EdgeKind::Join, vec![self.declare(id)]),
        };

        let mut plan = PathPlan::default();
        let planned = targets.iter().try_for_each(|&target| match kind {
            EdgeKind::Single => self.link_single(&mut plan, source, target),
            EdgeKind::Fork => self.link_fork(&mut plan, source, target),
            EdgeKind::Join => self.link_join(&mut plan, source, target),
        });
        if let Err(error) = planned {
            self.forget_declared(declared);
            return Err(error);
        }

        self.commit(source, plan);
        if kind == EdgeKind::Join {
            for &target in &targets {
                let node = &mut self.nodes[target];
                node.total_joins += 1;
                node.join_counter = node.total_joins;
            }
        }
        self.nodes[source].edges.push(TriggerEdge {
            trigger,
            guard,
            targets,
            kind,
        });
        Ok(())
    }

    fn link_single(&self, plan: &mut PathPlan, source: NodeId, target: NodeId) -> Result<()> {
        let source_path = plan.path(self, source);
        match plan.path(self, target) {
            None => self.assign_path(plan, target, source_path),
            Some(path) if Some(path) == source_path => Ok(()),
            Some(_) => Err(self.cross_path(source, target)),
        }
    }

    fn link_fork(&self, plan: &mut PathPlan, source: NodeId, target: NodeId) -> Result<()> {
        if plan.path(self, target).is_some() {
            return Err(self.cross_path(source, target));
        }
        let parent = plan.path(self, source);
        let path = plan.mint(self, parent);
        self.assign_path(plan, target, Some(path))
    }

    // A join leaves the forked path it arrives on for that fork's enclosing
    // path. Sources arriving from different depths meet on the innermost
    // path enclosing all of them.
    fn link_join(&self, plan: &mut PathPlan, source: NodeId, target: NodeId) -> Result<()> {
        let outer = plan
            .path(self, source)
            .and_then(|path| plan.parent(self, path));
        let joined = match plan.path(self, target) {
            None if self.nodes[target].total_joins == 0 => outer,
            current => plan.enclosing(self, current, outer),
        };
        self.assign_path(plan, target, joined)
    }

    // Relabel `start` and every state reachable from it over single-target
    // edges that was unassigned or shared its previous path.
    fn assign_path(&self, plan: &mut PathPlan, start: NodeId, to: Option<u32>) -> Result<()> {
        let from = plan.path(self, start);
        if from == to {
            return Ok(());
        }

        plan.labels.insert(start, to);
        let mut pending = vec![start];
        while let Some(current) = pending.pop() {
            let followers = self.nodes[current]
                .edges
                .iter()
                .filter(|edge| edge.kind == EdgeKind::Single)
                .flat_map(|edge| edge.targets.iter().copied());

            for next in followers {
                let path = plan.path(self, next);
                if path == to {
                    continue;
                }
                if path.is_none() || path == from {
                    plan.labels.insert(next, to);
                    pending.push(next);
                } else {
                    return Err(self.cross_path(current, next));
                }
            }
        }
        Ok(())
    }

    fn commit(&mut self, source: NodeId, plan: PathPlan) {
        for parent in plan.minted {
            tracing::trace!(
                from = self.nodes[source].id.name(),
                path = self.fork_parents.len(),
                ?parent,
                "fork path assigned"
            );
            self.fork_parents.push(parent);
        }
        for (node, path) in plan.labels {
            self.nodes[node].path = path;
        }
    }

    fn forget_declared(&mut self, from: usize) {
        for node in self.nodes.drain(from..) {
            self.index.remove(&node.id);
        }
    }

    fn cross_path(&self, source: NodeId, target: NodeId) -> MachineError {
        MachineError::CrossPathTransition {
            from: self.nodes[source].name(),
            to: self.nodes[target].name(),
        }
    }

    /// Edges on `node` that react to `trigger`, in configuration order.
    pub fn matching_edges(&self, node: NodeId, trigger: &T) -> Vec<EdgeSnapshot> {
        self.nodes[node]
            .edges
            .iter()
            .filter(|edge| edge.trigger == *trigger)
            .map(|edge| EdgeSnapshot {
                guard: edge.guard.clone(),
                targets: edge.targets.clone(),
                is_join: edge.kind == EdgeKind::Join,
            })
            .collect()
    }

    /// Distinct triggers accepted by any current state.
    pub fn valid_triggers(&self) -> Vec<T> {
        let mut triggers: Vec<T> = Vec::new();
        for &node in &self.current {
            for edge in &self.nodes[node].edges {
                if !triggers.contains(&edge.trigger) {
                    triggers.push(edge.trigger.clone());
                }
            }
        }
        triggers
    }

    pub fn current_ids(&self) -> Vec<S> {
        self.current.iter().map(|&node| self.nodes[node].id).collect()
    }
}
