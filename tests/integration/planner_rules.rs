#![allow(missing_docs)]

mod support;

use std::sync::Arc;

use flowplan::plan::{
    any, merge_nodes, pat, register_logical_rules, HeuristicPlanner, LogicalPlanner, NodeIdx,
    Pattern, PlanGraph, Rule,
};
use flowplan::plantest::{assert_plans_equal, logical_node, node_attrs, NodeSpec, PlanSpec};
use flowplan::{PlanError, PlannerOption, Result};

use support::*;

fn plan_spec(nodes: Vec<NodeSpec>) -> PlanSpec {
    let edges: Vec<(usize, usize)> = (1..nodes.len()).map(|i| (i - 1, i)).collect();
    PlanSpec::new(nodes, edges)
}

fn only(rules: Vec<Arc<dyn Rule>>) -> LogicalPlanner {
    LogicalPlanner::new([PlannerOption::OnlyRules(rules)])
}

fn filter_node(id: &str, pred: &str) -> NodeSpec {
    logical_node(id, filter_spec(leaf_pred(pred)))
}

#[test]
fn merge_filters_collapses_chain() -> Result<()> {
    let input = plan_spec(vec![
        logical_node("from0", from_spec("telegraf")),
        filter_node("filter1", "cpu"),
        filter_node("filter2", "gt"),
        filter_node("filter3", "lt"),
        logical_node("yield4", yield_spec("result")),
    ])
    .create_plan();

    let planner = only(vec![Arc::new(MergeFiltersRule)]);
    let got = planner.plan_graph(input)?;

    let want = plan_spec(vec![
        logical_node("from0", from_spec("telegraf")),
        logical_node(
            "merged_filter1_filter2_filter3",
            filter_spec(and(and(leaf_pred("lt"), leaf_pred("gt")), leaf_pred("cpu"))),
        ),
        logical_node("yield4", yield_spec("result")),
    ])
    .create_plan();
    assert_plans_equal(&want, &got);
    assert_eq!(got.len(), 3, "superseded nodes are pruned");
    Ok(())
}

#[test]
fn filter_is_pushed_below_map() -> Result<()> {
    let input = plan_spec(vec![
        logical_node("from0", from_spec("telegraf")),
        logical_node("map1", map_spec("r._value * 2.0")),
        filter_node("filter2", "r._value < 10.0"),
        logical_node("yield3", yield_spec("result")),
    ])
    .create_plan();

    let planner = only(vec![Arc::new(PushFilterThroughMapRule)]);
    let got = planner.plan_graph(input)?;

    let want = plan_spec(vec![
        logical_node("from0", from_spec("telegraf")),
        filter_node("filter2_copy", "r._value < 10.0"),
        logical_node("map1", map_spec("r._value * 2.0")),
        logical_node("yield3", yield_spec("result")),
    ])
    .create_plan();
    assert_plans_equal(&want, &got);
    Ok(())
}

#[test]
fn rules_work_together() -> Result<()> {
    let input = plan_spec(vec![
        logical_node("from0", from_spec("telegraf")),
        filter_node("filter1", "r._value != 0"),
        logical_node("map2", map_spec("r._value * 10")),
        filter_node("filter3", "r._value < 100"),
        logical_node("yield4", yield_spec("result")),
    ])
    .create_plan();

    let planner = only(vec![
        Arc::new(MergeFiltersRule),
        Arc::new(PushFilterThroughMapRule),
    ]);
    let got = planner.plan_graph(input)?;

    let want = plan_spec(vec![
        logical_node("from0", from_spec("telegraf")),
        logical_node(
            "merged_filter1_filter3_copy",
            filter_spec(and(
                leaf_pred("r._value < 100"),
                leaf_pred("r._value != 0"),
            )),
        ),
        logical_node("map2", map_spec("r._value * 10")),
        logical_node("yield4", yield_spec("result")),
    ])
    .create_plan();
    assert_plans_equal(&want, &got);
    Ok(())
}

#[test]
fn shared_filter_is_not_merged() -> Result<()> {
    // filter1 also feeds yield3, so it cannot be merged into filter2.
    let input = PlanSpec::new(
        vec![
            logical_node("from0", from_spec("telegraf")),
            filter_node("filter1", "a"),
            filter_node("filter2", "b"),
            logical_node("yield3", yield_spec("all")),
            logical_node("yield4", yield_spec("some")),
        ],
        [(0, 1), (1, 2), (1, 3), (2, 4)],
    )
    .create_plan();
    let before = node_attrs(&input);

    let got = only(vec![Arc::new(MergeFiltersRule)]).plan_graph(input)?;
    assert_eq!(node_attrs(&got), before);
    Ok(())
}

#[test]
fn planning_is_deterministic() -> Result<()> {
    let build = || {
        plan_spec(vec![
            logical_node("from0", from_spec("telegraf")),
            filter_node("filter1", "a"),
            logical_node("map2", map_spec("m")),
            filter_node("filter3", "b"),
            filter_node("filter4", "c"),
            logical_node("yield5", yield_spec("result")),
        ])
        .create_plan()
    };
    let planner = only(vec![
        Arc::new(MergeFiltersRule),
        Arc::new(PushFilterThroughMapRule),
    ]);
    let first = planner.plan_graph(build())?;
    let second = planner.plan_graph(build())?;
    assert_eq!(node_attrs(&first), node_attrs(&second));
    Ok(())
}

#[test]
fn removed_rules_are_skipped() -> Result<()> {
    let input = plan_spec(vec![
        logical_node("from0", from_spec("telegraf")),
        filter_node("filter1", "a"),
        filter_node("filter2", "b"),
        logical_node("yield3", yield_spec("result")),
    ])
    .create_plan();
    let before = node_attrs(&input);

    let planner = LogicalPlanner::new([
        PlannerOption::OnlyRules(vec![Arc::new(MergeFiltersRule)]),
        PlannerOption::RemoveRules(vec!["mergeFilters".into()]),
    ]);
    assert_eq!(node_attrs(&planner.plan_graph(input)?), before);
    Ok(())
}

#[test]
fn oscillating_rules_hit_the_pass_cap() {
    let input = plan_spec(vec![
        logical_node("from0", from_spec("telegraf")),
        logical_node("map1", map_spec("m")),
        filter_node("filter2", "f"),
        logical_node("yield3", yield_spec("result")),
    ])
    .create_plan();

    let planner = LogicalPlanner::new([
        PlannerOption::OnlyRules(vec![
            Arc::new(PushFilterThroughMapRule),
            Arc::new(PushMapThroughFilterRule),
        ]),
        PlannerOption::MaxPasses(5),
    ]);
    match planner.plan_graph(input) {
        Err(PlanError::NotConverged { passes }) => assert_eq!(passes, 5),
        other => panic!("unexpected planning result: {other:?}"),
    }
}

struct RejectingRule;

impl Rule for RejectingRule {
    fn name(&self) -> &str {
        "rejecting"
    }

    fn pattern(&self) -> Pattern {
        pat(FILTER, [any()])
    }

    fn rewrite(&self, graph: &mut PlanGraph, node: NodeIdx) -> Result<(NodeIdx, bool)> {
        // Merging a filter with its successor violates the merge preconditions.
        let succ = graph[node].successors()[0];
        let spec = graph[node].spec().copy_spec();
        let merged = merge_nodes(graph, succ, node, spec)?;
        Ok((merged, true))
    }
}

#[test]
fn rule_error_aborts_planning() {
    let input = PlanSpec::new(
        vec![
            logical_node("from0", from_spec("telegraf")),
            filter_node("filter1", "a"),
            logical_node("yield2", yield_spec("result")),
            logical_node("yield3", yield_spec("other")),
        ],
        [(0, 1), (1, 2), (1, 3)],
    );

    let err = HeuristicPlanner::new([Arc::new(RejectingRule) as Arc<dyn Rule>])
        .plan(input.create_plan())
        .unwrap_err();
    match err {
        PlanError::Rule { rule, source } => {
            assert_eq!(rule, "rejecting");
            assert!(matches!(*source, PlanError::InvalidTopology { op: "merge", .. }));
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[test]
fn registered_rules_are_used_and_then_frozen() -> Result<()> {
    register_logical_rules([Arc::new(MergeFiltersRule) as Arc<dyn Rule>]);
    let planner = LogicalPlanner::new([]);

    let input = plan_spec(vec![
        logical_node("from0", from_spec("telegraf")),
        filter_node("filter1", "a"),
        filter_node("filter2", "b"),
        logical_node("yield3", yield_spec("result")),
    ])
    .create_plan();
    let got = planner.plan_graph(input)?;
    assert!(got.node_by_id("merged_filter1_filter2").is_some());

    let late = std::panic::catch_unwind(|| {
        register_logical_rules([Arc::new(PushFilterThroughMapRule) as Arc<dyn Rule>]);
    });
    assert!(late.is_err(), "registration after planner construction must panic");
    Ok(())
}
