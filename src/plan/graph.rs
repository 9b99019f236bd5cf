//! Arena-backed plan DAG.
//!
//! Nodes live in a slot vector and are addressed by [`NodeIdx`]; edges are
//! plain handles, never ownership. A node superseded by a rewrite simply
//! becomes unreachable from the root set and is reclaimed by
//! [`PlanGraph::prune_unreachable`].

use std::collections::BTreeSet;
use std::ops::{Index, IndexMut};

use rustc_hash::{FxHashMap, FxHashSet};
use serde::{Deserialize, Serialize};

use crate::error::{PlanError, Result};
use crate::plan::bounds::Time;
use crate::plan::node::{NodeFlavor, NodeId, NodeIdx, PlanNode, ProcedureSpec};

/// Scheduling priority requested for a query.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    /// Run before normal queries.
    High,
    /// Default.
    #[default]
    Normal,
    /// Run when nothing else is waiting.
    Low,
}

/// Resource limits carried unchanged through planning.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
pub struct ResourceLimits {
    /// Maximum concurrent workers; zero means unlimited.
    pub concurrency_quota: usize,
    /// Maximum memory in bytes; zero means "use the planner default".
    pub memory_bytes_quota: u64,
    /// Scheduling priority.
    pub priority: Priority,
}

/// Query plan: the node arena, the root set, and global metadata.
#[derive(Debug, Default)]
pub struct PlanGraph {
    nodes: Vec<Option<PlanNode>>,
    roots: BTreeSet<NodeIdx>,
    /// Logical "current time" relative bounds were resolved against.
    pub now: Time,
    /// Resource limits for execution.
    pub resources: ResourceLimits,
}

impl PlanGraph {
    /// Creates an empty plan.
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a logical node with no edges.
    pub fn add_node(&mut self, id: impl Into<NodeId>, spec: Box<dyn ProcedureSpec>) -> NodeIdx {
        self.insert(PlanNode::new(id.into(), spec, NodeFlavor::Logical))
    }

    /// Inserts a physical node with no edges.
    pub fn add_physical_node(
        &mut self,
        id: impl Into<NodeId>,
        spec: Box<dyn ProcedureSpec>,
    ) -> NodeIdx {
        self.insert(PlanNode::new(id.into(), spec, NodeFlavor::Physical))
    }

    pub(crate) fn insert(&mut self, node: PlanNode) -> NodeIdx {
        let idx = NodeIdx(self.nodes.len() as u32);
        self.nodes.push(Some(node));
        idx
    }

    /// Adds the edge `pred -> succ`, appending to both edge lists.
    pub fn add_edge(&mut self, pred: NodeIdx, succ: NodeIdx) {
        self[pred].successors.push(succ);
        self[succ].predecessors.push(pred);
    }

    /// Returns the node behind `idx` if its slot is live.
    pub fn get(&self, idx: NodeIdx) -> Option<&PlanNode> {
        self.nodes.get(idx.0 as usize).and_then(Option::as_ref)
    }

    /// Mutable access to a live node.
    pub fn get_mut(&mut self, idx: NodeIdx) -> Option<&mut PlanNode> {
        self.nodes.get_mut(idx.0 as usize).and_then(Option::as_mut)
    }

    /// Number of live slots, including unreachable nodes not yet pruned.
    pub fn len(&self) -> usize {
        self.nodes.iter().filter(|slot| slot.is_some()).count()
    }

    /// True when the arena holds no live node.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Finds the live node with the given ID.
    pub fn node_by_id(&self, id: &str) -> Option<NodeIdx> {
        self.nodes.iter().enumerate().find_map(|(i, slot)| match slot {
            Some(node) if node.id().as_str() == id => Some(NodeIdx(i as u32)),
            _ => None,
        })
    }

    /// Marks `idx` as a plan output.
    pub fn add_root(&mut self, idx: NodeIdx) {
        self.roots.insert(idx);
    }

    /// Root set; iteration follows handle order, not ID order.
    pub fn roots(&self) -> &BTreeSet<NodeIdx> {
        &self.roots
    }

    /// Roots sorted by ascending node ID.
    pub fn sorted_roots(&self) -> Vec<NodeIdx> {
        let mut roots: Vec<NodeIdx> = self.roots.iter().copied().collect();
        roots.sort_by(|a, b| self[*a].id().cmp(self[*b].id()));
        roots
    }

    /// Makes every live node without successors a root.
    pub fn roots_from_sinks(&mut self) {
        let sinks: Vec<NodeIdx> = self
            .live()
            .filter(|(_, node)| node.successors().is_empty())
            .map(|(idx, _)| idx)
            .collect();
        self.roots.extend(sinks);
    }

    /// Replaces `old` with `new` in the root set.
    pub fn replace_root(&mut self, old: NodeIdx, new: NodeIdx) {
        self.roots.remove(&old);
        self.roots.insert(new);
    }

    /// Moves `old`'s outward edges to `new`.
    ///
    /// Every successor's predecessor entry for `old` is retargeted to `new`
    /// and `new` takes over `old`'s successor list; when `old` had no
    /// successors it was a root and `new` replaces it in the root set.
    /// `new`'s previous successors are discarded. Nothing is modified when a
    /// successor lacks the back edge.
    pub fn relink_successors(&mut self, old: NodeIdx, new: NodeIdx) -> Result<()> {
        let successors = self[old].successors.clone();
        for succ in &successors {
            if !self[*succ].predecessors.contains(&old) {
                return Err(PlanError::Integrity(format!(
                    "{} is successor of {}, but {} is not predecessor of {}",
                    self[*succ].id(),
                    self[old].id(),
                    self[old].id(),
                    self[*succ].id()
                )));
            }
        }

        self[new].successors.clear();
        if successors.is_empty() {
            self.replace_root(old, new);
            return Ok(());
        }
        for succ in &successors {
            for pred in self[*succ].predecessors.iter_mut() {
                if *pred == old {
                    *pred = new;
                }
            }
        }
        self[new].successors = successors;
        self[old].successors.clear();
        Ok(())
    }

    /// Frees every slot not reachable from the root set, returning how many were freed.
    pub fn prune_unreachable(&mut self) -> usize {
        let mut reachable = FxHashSet::default();
        let mut stack: Vec<NodeIdx> = self.roots.iter().copied().collect();
        while let Some(idx) = stack.pop() {
            if reachable.insert(idx) {
                stack.extend(self[idx].predecessors.iter().copied());
            }
        }
        let mut freed = 0;
        for (i, slot) in self.nodes.iter_mut().enumerate() {
            if slot.is_some() && !reachable.contains(&NodeIdx(i as u32)) {
                *slot = None;
                freed += 1;
            }
        }
        freed
    }

    /// Iterates live nodes in handle order.
    pub fn live(&self) -> impl Iterator<Item = (NodeIdx, &PlanNode)> {
        self.nodes
            .iter()
            .enumerate()
            .filter_map(|(i, slot)| slot.as_ref().map(|node| (NodeIdx(i as u32), node)))
    }

    /// Verifies the graph's structural invariants.
    ///
    /// Walks predecessors from the roots (reporting cycles), checks edge
    /// symmetry on every visited node, then walks successors from the
    /// sources found on the way. Also checks that roots have no successors
    /// and that reachable IDs are unique.
    ///
    /// Asymmetries are only found on nodes reachable from the roots, so a
    /// node that lists a plan node as successor without being listed back
    /// is detected only when it is itself reachable through some other path.
    pub fn check_integrity(&self) -> Result<()> {
        for root in &self.roots {
            let node = self
                .get(*root)
                .ok_or_else(|| PlanError::Integrity(format!("root {root} is not a live node")))?;
            if !node.successors().is_empty() {
                return Err(PlanError::Integrity(format!(
                    "root {} has {} successors",
                    node.id(),
                    node.successors().len()
                )));
            }
        }

        let sinks = self.sorted_roots();
        let mut sources = Vec::new();
        let mut ids: FxHashMap<&NodeId, NodeIdx> = FxHashMap::default();
        self.walk_predecessors(&sinks, |idx, node| {
            if let Some(other) = ids.insert(self[idx].id(), idx) {
                if other != idx {
                    return Err(PlanError::Integrity(format!(
                        "node id {} is used by more than one node",
                        node.id()
                    )));
                }
            }
            if node.predecessors().is_empty() {
                sources.push(idx);
            }
            self.symmetry_check(idx)
        })?;

        self.walk_successors(&sources, |idx, _| self.symmetry_check(idx))
    }

    fn symmetry_check(&self, idx: NodeIdx) -> Result<()> {
        let node = &self[idx];
        for pred in node.predecessors() {
            let pred_node = self.get(*pred).ok_or_else(|| {
                PlanError::Integrity(format!("{} has a dangling predecessor {pred}", node.id()))
            })?;
            if !pred_node.successors().contains(&idx) {
                return Err(PlanError::Integrity(format!(
                    "{} is predecessor of {}, but {} is not successor of {}",
                    pred_node.id(),
                    node.id(),
                    node.id(),
                    pred_node.id()
                )));
            }
        }
        for succ in node.successors() {
            let succ_node = self.get(*succ).ok_or_else(|| {
                PlanError::Integrity(format!("{} has a dangling successor {succ}", node.id()))
            })?;
            if !succ_node.predecessors().contains(&idx) {
                return Err(PlanError::Integrity(format!(
                    "{} is successor of {}, but {} is not predecessor of {}",
                    succ_node.id(),
                    node.id(),
                    node.id(),
                    succ_node.id()
                )));
            }
        }
        Ok(())
    }
}

impl Index<NodeIdx> for PlanGraph {
    type Output = PlanNode;

    fn index(&self, idx: NodeIdx) -> &PlanNode {
        match self.get(idx) {
            Some(node) => node,
            None => panic!("stale plan node handle {idx}"),
        }
    }
}

impl IndexMut<NodeIdx> for PlanGraph {
    fn index_mut(&mut self, idx: NodeIdx) -> &mut PlanNode {
        match self.get_mut(idx) {
            Some(node) => node,
            None => panic!("stale plan node handle {idx}"),
        }
    }
}
