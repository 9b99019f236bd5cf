//! Helpers for testing rules and planners.
//!
//! Provides mock procedure specs and a declarative [`PlanSpec`] for building
//! graphs from a node list and index edges.

use std::any::Any;

use crate::plan::{
    Bounds, BoundsAwareSpec, Duration, NodeFlavor, NodeIdx, PhysicalSpec, PlanGraph, ProcedureKind,
    ProcedureSpec, ResourceLimits, Time,
};

/// Spec with a kind and nothing else.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MockSpec {
    /// Reported kind.
    pub kind: ProcedureKind,
}

impl MockSpec {
    /// Boxed mock of `kind`.
    pub fn boxed(kind: &'static str) -> Box<dyn ProcedureSpec> {
        Box::new(MockSpec {
            kind: ProcedureKind(kind),
        })
    }
}

impl ProcedureSpec for MockSpec {
    fn kind(&self) -> ProcedureKind {
        self.kind
    }

    fn copy_spec(&self) -> Box<dyn ProcedureSpec> {
        Box::new(self.clone())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// Mock spec that the physical planner accepts as an operator.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PhysicalMockSpec {
    /// Reported kind.
    pub kind: ProcedureKind,
}

impl PhysicalMockSpec {
    /// Boxed physical mock of `kind`.
    pub fn boxed(kind: &'static str) -> Box<dyn ProcedureSpec> {
        Box::new(PhysicalMockSpec {
            kind: ProcedureKind(kind),
        })
    }
}

impl ProcedureSpec for PhysicalMockSpec {
    fn kind(&self) -> ProcedureKind {
        self.kind
    }

    fn copy_spec(&self) -> Box<dyn ProcedureSpec> {
        Box::new(self.clone())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_physical(&self) -> Option<&dyn PhysicalSpec> {
        Some(self)
    }
}

impl PhysicalSpec for PhysicalMockSpec {}

/// Kind of [`IntersectBoundsSpec`].
pub const INTERSECT_BOUNDS_KIND: ProcedureKind = ProcedureKind("mock-intersect-bounds");

/// Kind of [`ShiftBoundsSpec`].
pub const SHIFT_BOUNDS_KIND: ProcedureKind = ProcedureKind("mock-shift-bounds");

/// Physical spec restricting its input to fixed bounds.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct IntersectBoundsSpec {
    /// Bounds intersected with the input's.
    pub bounds: Bounds,
}

impl ProcedureSpec for IntersectBoundsSpec {
    fn kind(&self) -> ProcedureKind {
        INTERSECT_BOUNDS_KIND
    }

    fn copy_spec(&self) -> Box<dyn ProcedureSpec> {
        Box::new(self.clone())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_bounds_aware(&self) -> Option<&dyn BoundsAwareSpec> {
        Some(self)
    }

    fn as_physical(&self) -> Option<&dyn PhysicalSpec> {
        Some(self)
    }
}

impl BoundsAwareSpec for IntersectBoundsSpec {
    fn time_bounds(&self, predecessor_bounds: Option<Bounds>) -> Option<Bounds> {
        Some(match predecessor_bounds {
            Some(bounds) => bounds.intersect(&self.bounds),
            None => self.bounds,
        })
    }
}

impl PhysicalSpec for IntersectBoundsSpec {}

/// Logical spec shifting its input's bounds.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ShiftBoundsSpec {
    /// Shift applied to the input's bounds.
    pub by: Duration,
}

impl ProcedureSpec for ShiftBoundsSpec {
    fn kind(&self) -> ProcedureKind {
        SHIFT_BOUNDS_KIND
    }

    fn copy_spec(&self) -> Box<dyn ProcedureSpec> {
        Box::new(self.clone())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_bounds_aware(&self) -> Option<&dyn BoundsAwareSpec> {
        Some(self)
    }
}

impl BoundsAwareSpec for ShiftBoundsSpec {
    fn time_bounds(&self, predecessor_bounds: Option<Bounds>) -> Option<Bounds> {
        predecessor_bounds.map(|bounds| bounds.shift(self.by))
    }
}

/// Bounds `[start, stop)` from raw nanoseconds.
pub fn bounds(start: i64, stop: i64) -> Bounds {
    Bounds::new(Time(start), Time(stop))
}

/// Node entry of a [`PlanSpec`].
#[derive(Debug)]
pub struct NodeSpec {
    /// Node ID.
    pub id: String,
    /// Node spec.
    pub spec: Box<dyn ProcedureSpec>,
    /// Node flavor.
    pub flavor: NodeFlavor,
}

/// Logical node entry.
pub fn logical_node(id: impl Into<String>, spec: Box<dyn ProcedureSpec>) -> NodeSpec {
    NodeSpec {
        id: id.into(),
        spec,
        flavor: NodeFlavor::Logical,
    }
}

/// Physical node entry.
pub fn physical_node(id: impl Into<String>, spec: Box<dyn ProcedureSpec>) -> NodeSpec {
    NodeSpec {
        id: id.into(),
        spec,
        flavor: NodeFlavor::Physical,
    }
}

/// Logical [`MockSpec`] node entry of kind `mock`.
pub fn mock_node(id: impl Into<String>) -> NodeSpec {
    logical_node(id, MockSpec::boxed("mock"))
}

/// Physical [`PhysicalMockSpec`] node entry of kind `mock`.
pub fn physical_mock_node(id: impl Into<String>) -> NodeSpec {
    physical_node(id, PhysicalMockSpec::boxed("mock"))
}

/// Declarative plan: nodes plus `(predecessor, successor)` index pairs.
///
/// Nodes without successors become roots.
#[derive(Debug, Default)]
pub struct PlanSpec {
    /// Nodes in index order.
    pub nodes: Vec<NodeSpec>,
    /// Edges as indices into `nodes`.
    pub edges: Vec<(usize, usize)>,
    /// Plan resources.
    pub resources: ResourceLimits,
    /// Plan time.
    pub now: Time,
}

impl PlanSpec {
    /// Plan from nodes and edges with default metadata.
    pub fn new(nodes: Vec<NodeSpec>, edges: impl IntoIterator<Item = (usize, usize)>) -> Self {
        Self {
            nodes,
            edges: edges.into_iter().collect(),
            ..Self::default()
        }
    }

    /// Builds the graph; the returned handles follow `nodes` order.
    ///
    /// # Panics
    ///
    /// Panics when an edge references a missing node.
    pub fn build(self) -> (PlanGraph, Vec<NodeIdx>) {
        let mut graph = PlanGraph::new();
        graph.now = self.now;
        graph.resources = self.resources;
        let handles: Vec<NodeIdx> = self
            .nodes
            .into_iter()
            .map(|node| match node.flavor {
                NodeFlavor::Logical => graph.add_node(node.id, node.spec),
                NodeFlavor::Physical => graph.add_physical_node(node.id, node.spec),
            })
            .collect();
        for (pred, succ) in self.edges {
            graph.add_edge(handles[pred], handles[succ]);
        }
        graph.roots_from_sinks();
        (graph, handles)
    }

    /// Builds the graph, discarding the handles.
    pub fn create_plan(self) -> PlanGraph {
        self.build().0
    }
}

/// Comparable view of one node: ID, kind, flavor, bounds, spec debug text,
/// and predecessor IDs.
#[derive(Clone, Debug, PartialEq)]
pub struct NodeAttrs {
    /// Node ID.
    pub id: String,
    /// Spec kind.
    pub kind: ProcedureKind,
    /// Flavor.
    pub flavor: NodeFlavor,
    /// Computed bounds.
    pub bounds: Option<Bounds>,
    /// `Debug` rendering of the spec.
    pub spec: String,
    /// Predecessor IDs in input order.
    pub predecessors: Vec<String>,
}

/// Attributes of every reachable node in bottom-up order.
pub fn node_attrs(graph: &PlanGraph) -> Vec<NodeAttrs> {
    graph
        .bottom_up_order()
        .into_iter()
        .map(|idx| {
            let node = &graph[idx];
            NodeAttrs {
                id: node.id().to_string(),
                kind: node.kind(),
                flavor: node.flavor(),
                bounds: node.bounds(),
                spec: format!("{:?}", node.spec()),
                predecessors: node
                    .predecessors()
                    .iter()
                    .map(|p| graph[*p].id().to_string())
                    .collect(),
            }
        })
        .collect()
}

/// Asserts two plans have the same nodes, specs, and edges in the same walk order.
///
/// # Panics
///
/// Panics with both attribute lists when they differ.
pub fn assert_plans_equal(want: &PlanGraph, got: &PlanGraph) {
    let want_attrs = node_attrs(want);
    let got_attrs = node_attrs(got);
    assert_eq!(
        want_attrs, got_attrs,
        "plans differ\nwant: {want_attrs:#?}\ngot: {got_attrs:#?}"
    );
    assert_eq!(want.resources, got.resources, "plan resources differ");
}
