//! Physical planning: select executable operators, then annotate the plan.

use std::sync::Arc;

use tracing::debug;

use crate::config::{PlannerConfig, PlannerOption};
use crate::error::{PlanError, Result};
use crate::plan::bounds::compute_bounds;
use crate::plan::graph::PlanGraph;
use crate::plan::heuristic::HeuristicPlanner;
use crate::plan::node::{NodeFlavor, NodeIdx};
use crate::plan::pattern::{any, Pattern};
use crate::plan::registry::physical_rules;
use crate::plan::rule::{Rule, RuleSet};

/// Options accepted by [`PhysicalPlanner::new`].
pub type PhysicalOption = PlannerOption;

/// Name of the rule marking logical nodes with executable specs as physical.
pub const PHYSICAL_CONVERTER_RULE: &str = "physicalConverterRule";

/// Turns a logical plan into a validated physical plan.
pub struct PhysicalPlanner {
    heuristic: HeuristicPlanner,
    validate: bool,
    default_memory_limit: u64,
}

impl PhysicalPlanner {
    /// Planner over the converter rule and the registered physical rules.
    ///
    /// Unless `OnlyRules` is given, this snapshots and freezes the global
    /// physical rule registry. The converter rule is always first and can
    /// only be dropped with `RemoveRules`.
    pub fn new(options: impl IntoIterator<Item = PhysicalOption>) -> Self {
        Self::from_config(PlannerConfig::from_options(options))
    }

    /// Planner built from resolved settings.
    pub fn from_config(config: PlannerConfig) -> Self {
        let mut rules = RuleSet::new([Arc::new(PhysicalConverterRule) as Arc<dyn Rule>]);
        let extra = match config.only_rules {
            Some(rules) => rules,
            None => physical_rules().snapshot(),
        };
        for rule in extra {
            rules.add(rule);
        }
        rules.remove(&config.removed_rules);
        Self {
            heuristic: HeuristicPlanner::with_rule_set(rules).with_max_passes(config.max_passes),
            validate: config.check_integrity,
            default_memory_limit: config.default_memory_limit,
        }
    }

    /// Rewrites `graph`, computes bounds, validates, and fills in the memory quota.
    pub fn plan(&self, graph: PlanGraph) -> Result<PlanGraph> {
        let mut graph = self.heuristic.plan(graph)?;
        compute_bounds(&mut graph)?;

        if self.validate {
            graph.check_integrity()?;
            validate_physical_plan(&graph)?;
        }

        if graph.resources.memory_bytes_quota == 0 {
            graph.resources.memory_bytes_quota = self.default_memory_limit;
        }
        debug!(
            nodes = graph.len(),
            memory_bytes_quota = graph.resources.memory_bytes_quota,
            "physical plan ready"
        );
        Ok(graph)
    }
}

fn validate_physical_plan(graph: &PlanGraph) -> Result<()> {
    graph.bottom_up_walk(|_, node| match node.flavor() {
        NodeFlavor::Physical => Ok(()),
        NodeFlavor::Logical => Err(PlanError::NotPhysical(node.id().clone())),
    })
}

/// Marks logical nodes whose spec has a physical view as physical.
struct PhysicalConverterRule;

impl Rule for PhysicalConverterRule {
    fn name(&self) -> &str {
        PHYSICAL_CONVERTER_RULE
    }

    fn pattern(&self) -> Pattern {
        any()
    }

    fn rewrite(&self, graph: &mut PlanGraph, node: NodeIdx) -> Result<(NodeIdx, bool)> {
        let plan_node = &mut graph[node];
        if plan_node.flavor() == NodeFlavor::Physical || plan_node.spec().as_physical().is_none() {
            return Ok((node, false));
        }
        plan_node.set_flavor(NodeFlavor::Physical);
        Ok((node, true))
    }
}
