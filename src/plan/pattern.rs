//! Structural matchers used to trigger rewrite rules.

use crate::plan::graph::PlanGraph;
use crate::plan::node::{NodeIdx, ProcedureKind, ANY_KIND};

/// Tree shape matched against a node and its predecessors.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Pattern {
    /// Matches any node; says nothing about its inputs.
    Any,
    /// Matches a node of `kind` whose predecessors match `predecessors` positionally.
    Kind {
        /// Required kind.
        kind: ProcedureKind,
        /// One pattern per expected predecessor.
        predecessors: Vec<Pattern>,
    },
}

/// Pattern rooted at `kind` with the given predecessor patterns.
pub fn pat(kind: ProcedureKind, predecessors: impl IntoIterator<Item = Pattern>) -> Pattern {
    Pattern::Kind {
        kind,
        predecessors: predecessors.into_iter().collect(),
    }
}

/// Pattern matching a source node of `kind`.
pub fn leaf(kind: ProcedureKind) -> Pattern {
    pat(kind, [])
}

/// Wildcard pattern.
pub fn any() -> Pattern {
    Pattern::Any
}

impl Pattern {
    /// Kind the pattern is rooted at; [`ANY_KIND`] for the wildcard.
    pub fn root(&self) -> ProcedureKind {
        match self {
            Pattern::Any => ANY_KIND,
            Pattern::Kind { kind, .. } => *kind,
        }
    }

    /// Tests the pattern against `node` without touching the graph.
    ///
    /// Every predecessor of a kind-matched node must have exactly one
    /// successor: a rule may only rewrite a subgraph nobody else consumes.
    pub fn matches(&self, graph: &PlanGraph, node: NodeIdx) -> bool {
        let (kind, patterns) = match self {
            Pattern::Any => return true,
            Pattern::Kind { kind, predecessors } => (kind, predecessors),
        };
        let Some(plan_node) = graph.get(node) else {
            return false;
        };
        if plan_node.kind() != *kind {
            return false;
        }
        let preds = plan_node.predecessors();
        if preds.len() != patterns.len() {
            return false;
        }
        if preds
            .iter()
            .any(|pred| graph.get(*pred).map_or(true, |p| p.successors().len() != 1))
        {
            return false;
        }
        patterns
            .iter()
            .zip(preds)
            .all(|(pattern, pred)| pattern.matches(graph, *pred))
    }
}
