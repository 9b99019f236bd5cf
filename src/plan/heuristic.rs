//! Rule-driven fixed-point rewriting shared by the logical and physical planners.

use std::sync::Arc;

use rustc_hash::FxHashSet;
use tracing::{debug, trace};

use crate::error::{PlanError, Result};
use crate::plan::graph::PlanGraph;
use crate::plan::node::NodeIdx;
use crate::plan::rule::{Rule, RuleSet};
use crate::profile::{
    profile_timer, record_profile_timer, record_rewrite, record_rule_error, PlannerProfileKind,
};

/// Applies a rule set to every reachable node until a pass makes no change.
#[derive(Clone, Default)]
pub struct HeuristicPlanner {
    rules: RuleSet,
    max_passes: Option<usize>,
}

impl HeuristicPlanner {
    /// Planner over `rules` with no pass cap.
    pub fn new(rules: impl IntoIterator<Item = Arc<dyn Rule>>) -> Self {
        Self {
            rules: RuleSet::new(rules),
            max_passes: None,
        }
    }

    /// Planner over an already indexed rule set.
    pub fn with_rule_set(rules: RuleSet) -> Self {
        Self {
            rules,
            max_passes: None,
        }
    }

    /// Caps the number of passes; exceeding it fails with `NotConverged`.
    /// `None` or `Some(0)` leaves planning uncapped.
    pub fn with_max_passes(mut self, max_passes: Option<usize>) -> Self {
        self.max_passes = max_passes.filter(|&max| max > 0);
        self
    }

    /// Appends rules after the existing ones.
    pub fn add_rules(&mut self, rules: impl IntoIterator<Item = Arc<dyn Rule>>) {
        for rule in rules {
            self.rules.add(rule);
        }
    }

    /// Drops the named rules.
    pub fn remove_rules(&mut self, names: &[String]) {
        self.rules.remove(names);
    }

    /// Indexed rules used by this planner.
    pub fn rules(&self) -> &RuleSet {
        &self.rules
    }

    /// Rewrites `graph` to a fixed point.
    ///
    /// Each pass visits reachable nodes depth-first from the roots (smallest
    /// ID first, predecessors in input order), offering each node to the
    /// wildcard rules and then to the rules of its kind. A rule error aborts
    /// planning. Superseded nodes are pruned before returning.
    pub fn plan(&self, mut graph: PlanGraph) -> Result<PlanGraph> {
        let timer = profile_timer();
        if self.rules.is_empty() {
            record_profile_timer(PlannerProfileKind::Plan, timer);
            return Ok(graph);
        }

        let mut passes = 0usize;
        loop {
            if let Some(max) = self.max_passes {
                if passes >= max {
                    return Err(PlanError::NotConverged { passes });
                }
            }
            passes += 1;
            let pass_timer = profile_timer();
            let changed = self.pass(&mut graph)?;
            record_profile_timer(PlannerProfileKind::Pass, pass_timer);
            trace!(pass = passes, changed, "heuristic pass finished");
            if !changed {
                break;
            }
        }

        let pruned = graph.prune_unreachable();
        debug!(passes, pruned, nodes = graph.len(), "heuristic planning converged");
        record_profile_timer(PlannerProfileKind::Plan, timer);
        Ok(graph)
    }

    fn pass(&self, graph: &mut PlanGraph) -> Result<bool> {
        let mut stack = graph.sorted_roots();
        stack.reverse();
        let mut visited = FxHashSet::default();
        let mut any_changed = false;

        while let Some(node) = stack.pop() {
            if !visited.insert(node) {
                continue;
            }

            let (new_node, changed) = self.match_rules(graph, node)?;
            any_changed |= changed;
            if new_node != node {
                graph.relink_successors(node, new_node)?;
                visited.insert(new_node);
            }

            let preds = graph[new_node].predecessors();
            stack.extend(preds.iter().rev().copied());
        }
        Ok(any_changed)
    }

    fn match_rules(&self, graph: &mut PlanGraph, node: NodeIdx) -> Result<(NodeIdx, bool)> {
        let mut any_changed = false;
        let mut current = node;

        for rule in self.rules.wildcard() {
            let (next, changed) = apply_rule(rule.as_ref(), graph, current)?;
            any_changed |= changed;
            current = next;
        }

        let kind = graph[current].kind();
        for rule in self.rules.for_kind(kind) {
            let (next, changed) = apply_rule(rule.as_ref(), graph, current)?;
            any_changed |= changed;
            current = next;
        }
        Ok((current, any_changed))
    }
}

fn apply_rule(rule: &dyn Rule, graph: &mut PlanGraph, node: NodeIdx) -> Result<(NodeIdx, bool)> {
    if !rule.pattern().matches(graph, node) {
        return Ok((node, false));
    }
    match rule.rewrite(graph, node) {
        Ok((next, changed)) => {
            if changed {
                record_rewrite();
                debug!(
                    rule = rule.name(),
                    from = %graph[node].id(),
                    to = %graph[next].id(),
                    "rule rewrote node"
                );
            }
            Ok((next, changed))
        }
        Err(err) => {
            record_rule_error();
            Err(PlanError::rule(rule.name(), err))
        }
    }
}
