#![allow(missing_docs)]

use flowplan::plan::{NodeIdx, PlanGraph};
use flowplan::plantest::{mock_node, PlanSpec};
use flowplan::{PlanError, Result};

// Sources 6, 7, 8 feed 3, 4, 5, which feed the roots 0, 1, 2.
fn diamond() -> PlanGraph {
    let nodes = (0..9).map(|i| mock_node(i.to_string())).collect();
    PlanSpec::new(
        nodes,
        [
            (6, 3),
            (6, 4),
            (7, 4),
            (7, 5),
            (8, 3),
            (8, 5),
            (3, 0),
            (3, 2),
            (4, 0),
            (4, 1),
            (5, 1),
            (5, 2),
        ],
    )
    .create_plan()
}

fn ids(graph: &PlanGraph, order: &[NodeIdx]) -> Vec<String> {
    order.iter().map(|idx| graph[*idx].id().to_string()).collect()
}

#[test]
fn bottom_up_walk_visits_predecessors_first() -> Result<()> {
    let graph = diamond();
    let mut seen = Vec::new();
    graph.bottom_up_walk(|_, node| {
        seen.push(node.id().to_string());
        Ok(())
    })?;
    assert_eq!(seen, ["6", "8", "3", "7", "4", "0", "5", "1", "2"]);
    assert_eq!(ids(&graph, &graph.bottom_up_order()), seen);
    Ok(())
}

#[test]
fn top_down_walk_visits_nodes_before_predecessors() -> Result<()> {
    let graph = diamond();
    let mut seen = Vec::new();
    graph.top_down_walk(|_, node| {
        seen.push(node.id().to_string());
        Ok(())
    })?;
    assert_eq!(seen, ["0", "3", "6", "8", "4", "7", "1", "5", "2"]);
    assert_eq!(ids(&graph, &graph.top_down_order()), seen);
    Ok(())
}

#[test]
fn topological_walk_runs_in_reverse_completion_order() -> Result<()> {
    let graph = diamond();
    let mut seen = Vec::new();
    graph.topological_walk(|_, node| {
        seen.push(node.id().to_string());
        Ok(())
    })?;
    assert_eq!(seen, ["2", "1", "5", "0", "4", "7", "3", "8", "6"]);
    Ok(())
}

#[test]
fn every_node_appears_after_all_its_successors_in_topological_order() -> Result<()> {
    let graph = diamond();
    let mut position = std::collections::HashMap::new();
    let mut i = 0;
    graph.topological_walk(|idx, _| {
        position.insert(idx, i);
        i += 1;
        Ok(())
    })?;
    for (idx, node) in graph.live() {
        for succ in node.successors() {
            assert!(
                position[succ] < position[&idx],
                "{} must precede {}",
                graph[*succ].id(),
                node.id()
            );
        }
    }
    Ok(())
}

#[test]
fn walks_are_independent_of_insertion_order() -> Result<()> {
    let forward = diamond();

    // Same graph with nodes inserted in reverse.
    let nodes = (0..9).rev().map(|i| mock_node(i.to_string())).collect();
    let at = |i: usize| 8 - i;
    let edges = [
        (6, 3),
        (6, 4),
        (7, 4),
        (7, 5),
        (8, 3),
        (8, 5),
        (3, 0),
        (3, 2),
        (4, 0),
        (4, 1),
        (5, 1),
        (5, 2),
    ]
    .map(|(p, s)| (at(p), at(s)));
    let reversed = PlanSpec::new(nodes, edges).create_plan();

    assert_eq!(
        ids(&forward, &forward.bottom_up_order()),
        ids(&reversed, &reversed.bottom_up_order())
    );
    assert_eq!(
        ids(&forward, &forward.top_down_order()),
        ids(&reversed, &reversed.top_down_order())
    );
    Ok(())
}

#[test]
fn cycle_aborts_topological_walk_without_callbacks() {
    let (mut graph, handles) = PlanSpec::new(
        vec![mock_node("a"), mock_node("b"), mock_node("c"), mock_node("root")],
        [(0, 1), (1, 2), (2, 3)],
    )
    .build();
    graph.add_edge(handles[2], handles[0]);

    let mut calls = 0;
    let err = graph
        .topological_walk(|_, _| {
            calls += 1;
            Ok(())
        })
        .unwrap_err();
    assert!(matches!(err, PlanError::Cycle { .. }), "unexpected error: {err:?}");
    assert_eq!(calls, 0);
    assert!(graph.check_integrity().is_err());
}

#[test]
fn callback_error_stops_topological_walk() {
    let graph = diamond();
    let mut calls = 0;
    let err = graph
        .topological_walk(|_, node| {
            calls += 1;
            if node.id().as_str() == "0" {
                return Err(PlanError::Invalid("stop".into()));
            }
            Ok(())
        })
        .unwrap_err();
    assert_eq!(err, PlanError::Invalid("stop".into()));
    assert_eq!(calls, 4);
}
