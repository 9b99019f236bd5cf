#![allow(missing_docs)]

use std::collections::BTreeMap;

use flowplan::plan::{compute_bounds, Bounds, Duration, PlanGraph};
use flowplan::plantest::{
    bounds, logical_node, physical_mock_node, physical_node, IntersectBoundsSpec, NodeSpec,
    PlanSpec, ShiftBoundsSpec,
};
use flowplan::Result;

fn intersect_node(id: &str, start: i64, stop: i64) -> NodeSpec {
    physical_node(
        id,
        Box::new(IntersectBoundsSpec {
            bounds: bounds(start, stop),
        }),
    )
}

fn shift_node(id: &str, by: i64) -> NodeSpec {
    logical_node(id, Box::new(ShiftBoundsSpec { by: Duration(by) }))
}

fn computed(nodes: Vec<NodeSpec>, edges: &[(usize, usize)]) -> Result<PlanGraph> {
    let mut graph = PlanSpec::new(nodes, edges.iter().copied()).create_plan();
    compute_bounds(&mut graph)?;
    Ok(graph)
}

fn bounds_by_id(graph: &PlanGraph) -> BTreeMap<String, Option<Bounds>> {
    graph
        .bottom_up_order()
        .into_iter()
        .map(|idx| (graph[idx].id().to_string(), graph[idx].bounds()))
        .collect()
}

fn want(entries: &[(&str, Option<Bounds>)]) -> BTreeMap<String, Option<Bounds>> {
    entries
        .iter()
        .map(|(id, b)| ((*id).to_owned(), *b))
        .collect()
}

const CHAIN: [(usize, usize); 4] = [(0, 1), (1, 2), (2, 3), (3, 4)];

#[test]
fn no_bounds() -> Result<()> {
    let graph = computed(vec![physical_mock_node("0")], &[])?;
    assert_eq!(bounds_by_id(&graph), want(&[("0", None)]));
    Ok(())
}

#[test]
fn single_intersect_propagates_downstream() -> Result<()> {
    let graph = computed(
        vec![
            physical_mock_node("0"),
            physical_mock_node("1"),
            intersect_node("2", 5, 10),
            physical_mock_node("3"),
            physical_mock_node("4"),
        ],
        &CHAIN,
    )?;
    let b = Some(bounds(5, 10));
    assert_eq!(
        bounds_by_id(&graph),
        want(&[("0", None), ("1", None), ("2", b), ("3", b), ("4", b)])
    );
    Ok(())
}

#[test]
fn multiple_intersects_narrow() -> Result<()> {
    let graph = computed(
        vec![
            physical_mock_node("0"),
            intersect_node("1", 5, 10),
            physical_mock_node("2"),
            intersect_node("3", 7, 11),
            physical_mock_node("4"),
        ],
        &CHAIN,
    )?;
    let outer = Some(bounds(5, 10));
    let inner = Some(bounds(7, 10));
    assert_eq!(
        bounds_by_id(&graph),
        want(&[("0", None), ("1", outer), ("2", outer), ("3", inner), ("4", inner)])
    );
    Ok(())
}

#[test]
fn shift_without_bounds_stays_unbounded() -> Result<()> {
    let graph = computed(
        vec![
            physical_mock_node("0"),
            shift_node("1", 5),
            physical_mock_node("2"),
        ],
        &[(0, 1), (1, 2)],
    )?;
    assert_eq!(
        bounds_by_id(&graph),
        want(&[("0", None), ("1", None), ("2", None)])
    );
    Ok(())
}

#[test]
fn shift_after_intersect() -> Result<()> {
    let graph = computed(
        vec![
            physical_mock_node("0"),
            intersect_node("1", 5, 10),
            physical_mock_node("2"),
            shift_node("3", 5),
            physical_mock_node("4"),
        ],
        &CHAIN,
    )?;
    let before = Some(bounds(5, 10));
    let after = Some(bounds(10, 15));
    assert_eq!(
        bounds_by_id(&graph),
        want(&[("0", None), ("1", before), ("2", before), ("3", after), ("4", after)])
    );
    Ok(())
}

#[test]
fn join_takes_union_of_inputs() -> Result<()> {
    let graph = computed(
        vec![
            intersect_node("0", 5, 10),
            intersect_node("1", 12, 20),
            physical_mock_node("2"),
        ],
        &[(0, 2), (1, 2)],
    )?;
    assert_eq!(
        bounds_by_id(&graph),
        want(&[
            ("0", Some(bounds(5, 10))),
            ("1", Some(bounds(12, 20))),
            ("2", Some(bounds(5, 20))),
        ])
    );
    Ok(())
}

#[test]
fn bounds_reach_every_yield() -> Result<()> {
    let graph = computed(
        vec![
            physical_mock_node("0"),
            intersect_node("1", 5, 10),
            physical_mock_node("2"),
            physical_mock_node("3"),
            physical_mock_node("4"),
        ],
        &[(0, 1), (0, 2), (1, 3), (1, 4)],
    )?;
    let b = Some(bounds(5, 10));
    assert_eq!(
        bounds_by_id(&graph),
        want(&[("0", None), ("1", b), ("2", None), ("3", b), ("4", b)])
    );
    Ok(())
}

#[test]
fn recomputing_bounds_is_stable() -> Result<()> {
    let mut graph = computed(
        vec![
            physical_mock_node("0"),
            intersect_node("1", 5, 10),
            shift_node("2", 5),
        ],
        &[(0, 1), (1, 2)],
    )?;
    let first = bounds_by_id(&graph);
    compute_bounds(&mut graph)?;
    assert_eq!(bounds_by_id(&graph), first);
    Ok(())
}
