//! Human- and machine-readable renderings of a plan.

use serde::Serialize;
use serde_json::{Map, Value};

use crate::error::{PlanError, Result};
use crate::plan::bounds::{Bounds, Time};
use crate::plan::graph::{PlanGraph, ResourceLimits};
use crate::plan::node::{NodeFlavor, NodeIdx, NodeId, ProcedureKind};

/// Flat, serializable description of a plan.
#[derive(Clone, Debug, Serialize)]
pub struct PlanSummary {
    /// Nodes in bottom-up order.
    pub nodes: Vec<NodeSummary>,
    /// Root IDs, sorted.
    pub roots: Vec<NodeId>,
    /// Logical current time.
    pub now: Time,
    /// Resource limits.
    pub resources: ResourceLimits,
}

/// One node of a [`PlanSummary`].
#[derive(Clone, Debug, Serialize)]
pub struct NodeSummary {
    /// Node ID.
    pub id: NodeId,
    /// Spec kind.
    pub kind: ProcedureKind,
    /// Logical or physical.
    pub flavor: NodeFlavor,
    /// Computed bounds, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bounds: Option<Bounds>,
    /// Predecessor IDs in input order.
    pub predecessors: Vec<NodeId>,
}

impl PlanSummary {
    /// Summarizes every node reachable from the roots.
    pub fn new(graph: &PlanGraph) -> Self {
        let ids = |edges: &[NodeIdx]| -> Vec<NodeId> {
            edges.iter().map(|i| graph[*i].id().clone()).collect()
        };
        let nodes = graph
            .bottom_up_order()
            .into_iter()
            .map(|idx| {
                let node = &graph[idx];
                NodeSummary {
                    id: node.id().clone(),
                    kind: node.kind(),
                    flavor: node.flavor(),
                    bounds: node.bounds(),
                    predecessors: ids(node.predecessors()),
                }
            })
            .collect();
        Self {
            nodes,
            roots: ids(&graph.sorted_roots()),
            now: graph.now,
            resources: graph.resources,
        }
    }

    /// Pretty-printed JSON.
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self)
            .map_err(|e| PlanError::invalid(format!("plan summary serialization failed: {e}")))
    }
}

/// Explain view of a plan: sorted root IDs plus every reachable node once,
/// top-down, with its inputs referenced by ID.
///
/// ```text
/// {"roots": ["yield2"],
///  "nodes": [{"id": "yield2", "kind": "yield", "inputs": ["filter1"]}, ...]}
/// ```
pub fn explain_value(graph: &PlanGraph) -> Value {
    let roots = graph
        .sorted_roots()
        .into_iter()
        .map(|root| Value::String(graph[root].id().to_string()))
        .collect();
    let nodes = graph
        .top_down_order()
        .into_iter()
        .map(|idx| explain_node_value(graph, idx))
        .collect();
    let mut map = Map::new();
    map.insert("roots".into(), Value::Array(roots));
    map.insert("nodes".into(), Value::Array(nodes));
    Value::Object(map)
}

fn explain_node_value(graph: &PlanGraph, idx: NodeIdx) -> Value {
    let node = &graph[idx];
    let mut map = Map::new();
    map.insert("id".into(), Value::String(node.id().to_string()));
    map.insert("kind".into(), Value::String(node.kind().to_string()));
    if let Some(bounds) = node.bounds() {
        map.insert("bounds".into(), Value::String(bounds.to_string()));
    }
    let inputs = node
        .predecessors()
        .iter()
        .map(|pred| Value::String(graph[*pred].id().to_string()))
        .collect();
    map.insert("inputs".into(), Value::Array(inputs));
    Value::Object(map)
}

/// Graphviz rendering; edges point from predecessor to successor.
pub fn dot(graph: &PlanGraph) -> String {
    let order = graph.top_down_order();
    let mut out = String::from("digraph {\n");
    for idx in &order {
        let node = &graph[*idx];
        let shape = match node.flavor() {
            NodeFlavor::Logical => "ellipse",
            NodeFlavor::Physical => "box",
        };
        out.push_str(&format!(
            "  \"{id}\" [label=\"{id}\\n{kind}\" shape={shape}];\n",
            id = node.id(),
            kind = node.kind()
        ));
    }
    for idx in &order {
        let node = &graph[*idx];
        for pred in node.predecessors() {
            out.push_str(&format!("  \"{}\" -> \"{}\";\n", graph[*pred].id(), node.id()));
        }
    }
    out.push_str("}\n");
    out
}
