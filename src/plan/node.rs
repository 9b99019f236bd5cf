//! Plan nodes and the procedure specs they carry.

use std::any::Any;
use std::fmt;

use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

use crate::plan::bounds::{Bounds, BoundsAwareSpec};

/// Open-world tag naming the operation a spec performs.
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Debug, Serialize)]
pub struct ProcedureKind(pub &'static str);

/// Kind reported by wildcard patterns.
pub const ANY_KIND: ProcedureKind = ProcedureKind("*** any procedure kind ***");

impl fmt::Display for ProcedureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.0)
    }
}

/// String identity of a node, unique among the reachable nodes of a graph.
#[derive(Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Debug, Serialize, Deserialize)]
pub struct NodeId(pub String);

impl NodeId {
    /// Returns the identifier text.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for NodeId {
    fn from(value: &str) -> Self {
        NodeId(value.to_owned())
    }
}

impl From<String> for NodeId {
    fn from(value: String) -> Self {
        NodeId(value)
    }
}

/// Arena handle of a node inside one [`PlanGraph`](crate::plan::PlanGraph).
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Debug)]
pub struct NodeIdx(pub u32);

impl fmt::Display for NodeIdx {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Edge list; most operators have one or two neighbours.
pub type Edges = SmallVec<[NodeIdx; 2]>;

/// Estimated execution cost reported by physical specs.
#[derive(Copy, Clone, Debug, Default, PartialEq, Serialize)]
pub struct Cost {
    /// Estimated memory footprint.
    pub memory_bytes: u64,
    /// Estimated CPU work in abstract units.
    pub cpu: f64,
}

/// Statistics about the data a node produces.
#[derive(Copy, Clone, Debug, Default, PartialEq, Serialize)]
pub struct PlanStats {
    /// Estimated number of rows.
    pub rows: u64,
}

/// Capability of specs that describe an executable operator.
pub trait PhysicalSpec {
    /// Returns the cost of this operator and the stats of its output given its inputs' stats.
    fn cost(&self, inputs: &[PlanStats]) -> (Cost, PlanStats) {
        let rows = inputs.iter().map(|s| s.rows).sum();
        (Cost::default(), PlanStats { rows })
    }
}

/// Opaque payload describing what a plan node does.
///
/// The graph layer only needs [`kind`](ProcedureSpec::kind) and
/// [`copy_spec`](ProcedureSpec::copy_spec); everything else is a capability
/// query with a default answer.
pub trait ProcedureSpec: fmt::Debug + Send + Sync + 'static {
    /// Kind used to index rules.
    fn kind(&self) -> ProcedureKind;

    /// Deep copy of this spec.
    fn copy_spec(&self) -> Box<dyn ProcedureSpec>;

    /// Downcast hook for rules that need the concrete spec.
    fn as_any(&self) -> &dyn Any;

    /// Bounds transform, for specs that influence time bounds.
    fn as_bounds_aware(&self) -> Option<&dyn BoundsAwareSpec> {
        None
    }

    /// Physical operator view, for specs that can be executed directly.
    fn as_physical(&self) -> Option<&dyn PhysicalSpec> {
        None
    }

    /// Result name when this spec yields a query result.
    fn yield_name(&self) -> Option<&str> {
        None
    }

    /// True when the spec produces an effect outside the query result.
    fn has_side_effect(&self) -> bool {
        false
    }
}

impl dyn ProcedureSpec {
    /// Returns the concrete spec if it is a `T`.
    pub fn downcast_ref<T: ProcedureSpec>(&self) -> Option<&T> {
        self.as_any().downcast_ref::<T>()
    }
}

/// Whether a node has been selected as an executable operator.
#[derive(Copy, Clone, Eq, PartialEq, Debug, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeFlavor {
    /// Produced by the logical builder or logical rules.
    Logical,
    /// Carries a physical spec chosen by the physical planner.
    Physical,
}

/// Node of a plan graph.
#[derive(Debug)]
pub struct PlanNode {
    id: NodeId,
    spec: Box<dyn ProcedureSpec>,
    flavor: NodeFlavor,
    bounds: Option<Bounds>,
    pub(crate) predecessors: Edges,
    pub(crate) successors: Edges,
}

impl PlanNode {
    pub(crate) fn new(id: NodeId, spec: Box<dyn ProcedureSpec>, flavor: NodeFlavor) -> Self {
        Self {
            id,
            spec,
            flavor,
            bounds: None,
            predecessors: Edges::new(),
            successors: Edges::new(),
        }
    }

    /// Node identity.
    pub fn id(&self) -> &NodeId {
        &self.id
    }

    /// Kind of the node's spec.
    pub fn kind(&self) -> ProcedureKind {
        self.spec.kind()
    }

    /// The node's spec.
    pub fn spec(&self) -> &dyn ProcedureSpec {
        self.spec.as_ref()
    }

    /// Replaces the spec, returning the previous one.
    pub fn replace_spec(&mut self, spec: Box<dyn ProcedureSpec>) -> Box<dyn ProcedureSpec> {
        std::mem::replace(&mut self.spec, spec)
    }

    /// Logical or physical.
    pub fn flavor(&self) -> NodeFlavor {
        self.flavor
    }

    pub(crate) fn set_flavor(&mut self, flavor: NodeFlavor) {
        self.flavor = flavor;
    }

    /// Bounds computed by [`compute_bounds`](crate::plan::compute_bounds).
    pub fn bounds(&self) -> Option<Bounds> {
        self.bounds
    }

    /// Overrides the node's bounds.
    pub fn set_bounds(&mut self, bounds: Option<Bounds>) {
        self.bounds = bounds;
    }

    /// Nodes that feed this node, in input order.
    pub fn predecessors(&self) -> &[NodeIdx] {
        &self.predecessors
    }

    /// Nodes consuming this node's output.
    pub fn successors(&self) -> &[NodeIdx] {
        &self.successors
    }

    /// Copy of this node with the same spec and flavor, a `_copy` suffixed ID,
    /// and no edges or bounds.
    pub fn shallow_copy(&self) -> PlanNode {
        PlanNode::new(
            NodeId(format!("{}_copy", self.id)),
            self.spec.copy_spec(),
            self.flavor,
        )
    }
}
