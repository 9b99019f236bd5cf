//! Local, invariant-preserving graph mutations used by rule implementations.
//!
//! None of these primitives wire the outward edges of the node they return;
//! the planner does that after the rule finishes.

use crate::error::{PlanError, Result};
use crate::plan::graph::PlanGraph;
use crate::plan::node::{NodeId, NodeIdx, PlanNode, ProcedureSpec};

const MERGED_PREFIX: &str = "merged_";

/// Merges `top` and its sole predecessor `bottom` into a new node carrying `spec`.
///
/// ```text
///     V1     V2       V1            V2       <-- successors
///       \   /
///        top             merged
///         |      ==>        |
///       bottom              W
///         |
///         W
/// ```
///
/// The merged node takes `bottom`'s predecessors; its successors are left
/// empty. Fails without modifying anything unless `top` has exactly one
/// predecessor, that predecessor is `bottom`, and `bottom` has exactly one
/// successor.
pub fn merge_nodes(
    graph: &mut PlanGraph,
    top: NodeIdx,
    bottom: NodeIdx,
    spec: Box<dyn ProcedureSpec>,
) -> Result<NodeIdx> {
    let top_node = &graph[top];
    let bottom_node = &graph[bottom];
    if top_node.predecessors() != [bottom] || bottom_node.successors().len() != 1 {
        return Err(PlanError::InvalidTopology {
            op: "merge",
            top: top_node.id().clone(),
            bottom: bottom_node.id().clone(),
        });
    }

    let id = merge_ids(top_node.id(), bottom_node.id());
    let flavor = top_node.flavor();
    let predecessors = bottom_node.predecessors.clone();

    let merged = graph.insert(PlanNode::new(id, spec, flavor));
    for pred in &predecessors {
        for succ in graph[*pred].successors.iter_mut() {
            if *succ == bottom {
                *succ = merged;
            }
        }
    }
    graph[merged].predecessors = predecessors;
    Ok(merged)
}

/// ID of a merged node: `merged_<bottom>_<top>` with any existing
/// `merged_` prefixes removed first, so repeated merges stay flat.
pub fn merge_ids(top: &NodeId, bottom: &NodeId) -> NodeId {
    let top = top.as_str().strip_prefix(MERGED_PREFIX).unwrap_or(top.as_str());
    let bottom = bottom
        .as_str()
        .strip_prefix(MERGED_PREFIX)
        .unwrap_or(bottom.as_str());
    NodeId(format!("{MERGED_PREFIX}{bottom}_{top}"))
}

/// Commutes `top` and its sole predecessor `bottom`.
///
/// ```text
///     V1   V2        V1   V2
///       \ /
///        A              B
///        |     ==>      |
///        B          copy of A
///        |              |
///        W              W
/// ```
///
/// A copy of `top` is installed between `bottom`'s predecessor and `bottom`,
/// and `bottom` is returned as the new top with no successors; the original
/// `top` is left behind for the planner to replace. Fails without modifying
/// anything unless `top`'s only predecessor is `bottom` and `bottom` has
/// exactly one successor and one predecessor.
pub fn swap_nodes(graph: &mut PlanGraph, top: NodeIdx, bottom: NodeIdx) -> Result<NodeIdx> {
    let top_node = &graph[top];
    let bottom_node = &graph[bottom];
    if top_node.predecessors() != [bottom]
        || bottom_node.successors().len() != 1
        || bottom_node.predecessors().len() != 1
    {
        return Err(PlanError::InvalidTopology {
            op: "swap",
            top: top_node.id().clone(),
            bottom: bottom_node.id().clone(),
        });
    }

    let below = bottom_node.predecessors()[0];
    let copy = top_node.shallow_copy();
    let new_bottom = graph.insert(copy);
    graph[new_bottom].successors.push(bottom);
    graph[new_bottom].predecessors.push(below);
    if let Some(slot) = graph[below].successors.iter_mut().find(|s| **s == bottom) {
        *slot = new_bottom;
    }

    let bottom_node = &mut graph[bottom];
    bottom_node.predecessors.clear();
    bottom_node.predecessors.push(new_bottom);
    bottom_node.successors.clear();
    Ok(bottom)
}

/// Gives `new` the predecessors of `old` and detaches `old` from them.
///
/// ```text
///     S1   S2        S1   S2
///       \ /
///       old    =>    new
///       / \          / \
///     P1   P2      P1   P2
/// ```
///
/// `new` ends up with no successors; the planner attaches them.
pub fn replace_node(graph: &mut PlanGraph, old: NodeIdx, new: NodeIdx) {
    let predecessors = std::mem::take(&mut graph[old].predecessors);
    for pred in &predecessors {
        for succ in graph[*pred].successors.iter_mut() {
            if *succ == old {
                *succ = new;
            }
        }
    }
    let new_node = &mut graph[new];
    new_node.successors.clear();
    new_node.predecessors = predecessors;
}
