//! Logical planning: operation graph to rewritten logical plan.

use rustc_hash::FxHashMap;
use tracing::debug;

use crate::config::{PlannerConfig, PlannerOption};
use crate::error::{PlanError, Result};
use crate::plan::graph::PlanGraph;
use crate::plan::heuristic::HeuristicPlanner;
use crate::plan::node::NodeIdx;
use crate::plan::operation::{
    GeneratedYieldSpec, OperationGraph, DEFAULT_YIELD_NAME, GENERATED_YIELD_ID,
};
use crate::plan::registry::{create_procedure_spec, logical_rules};
use crate::plan::rule::RuleSet;

/// Options accepted by [`LogicalPlanner::new`].
pub type LogicalOption = PlannerOption;

/// Builds logical plans and rewrites them with the logical rules.
pub struct LogicalPlanner {
    heuristic: HeuristicPlanner,
    check_integrity: bool,
}

impl LogicalPlanner {
    /// Planner over the registered logical rules, adjusted by `options`.
    ///
    /// Unless `OnlyRules` is given, this snapshots and freezes the global
    /// logical rule registry.
    pub fn new(options: impl IntoIterator<Item = LogicalOption>) -> Self {
        Self::from_config(PlannerConfig::from_options(options))
    }

    /// Planner built from resolved settings.
    pub fn from_config(config: PlannerConfig) -> Self {
        let mut rules = match config.only_rules {
            Some(rules) => RuleSet::new(rules),
            None => RuleSet::new(logical_rules().snapshot()),
        };
        rules.remove(&config.removed_rules);
        Self {
            heuristic: HeuristicPlanner::with_rule_set(rules).with_max_passes(config.max_passes),
            check_integrity: config.check_integrity,
        }
    }

    /// Builds the initial plan for `operations` and rewrites it.
    pub fn plan(&self, operations: &OperationGraph) -> Result<PlanGraph> {
        let graph = build_logical_plan(operations)?;
        self.plan_graph(graph)
    }

    /// Rewrites an already built logical plan.
    pub fn plan_graph(&self, graph: PlanGraph) -> Result<PlanGraph> {
        let graph = self.heuristic.plan(graph)?;
        if self.check_integrity {
            graph.check_integrity()?;
        }
        Ok(graph)
    }
}

/// Translates `operations` into a logical plan with one node per operation.
///
/// Node IDs are operation IDs and edges keep their order. A sink that
/// neither yields nor has a side effect gets a `generated_yield` successor;
/// at most one sink may need one.
pub fn build_logical_plan(operations: &OperationGraph) -> Result<PlanGraph> {
    operations.validate()?;

    let mut graph = PlanGraph::new();
    graph.now = operations.now;
    graph.resources = operations.resources;

    let mut by_id: FxHashMap<&str, NodeIdx> = FxHashMap::default();
    for op in &operations.operations {
        let spec = create_procedure_spec(op.spec.as_ref(), operations)?;
        let idx = graph.add_node(op.id.as_str(), spec);
        if by_id.insert(op.id.as_str(), idx).is_some() {
            return Err(PlanError::invalid(format!("duplicate operation id {}", op.id)));
        }
    }
    for (parent, child) in &operations.edges {
        graph.add_edge(by_id[parent.as_str()], by_id[child.as_str()]);
    }

    let mut unyielded = None;
    for op in &operations.operations {
        let idx = by_id[op.id.as_str()];
        let node = &graph[idx];
        if !node.successors().is_empty() {
            continue;
        }
        if node.spec().yield_name().is_some() || node.spec().has_side_effect() {
            graph.add_root(idx);
            continue;
        }
        if unyielded.replace(idx).is_some() {
            return Err(PlanError::MultipleGeneratedYields);
        }
    }

    if let Some(sink) = unyielded {
        let generated = graph.add_node(
            GENERATED_YIELD_ID,
            Box::new(GeneratedYieldSpec {
                name: DEFAULT_YIELD_NAME.to_owned(),
            }),
        );
        graph.add_edge(sink, generated);
        graph.add_root(generated);
        debug!(sink = %graph[sink].id(), "appended generated yield");
    }
    Ok(graph)
}
