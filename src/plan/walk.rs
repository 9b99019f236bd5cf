//! Deterministic traversals over a plan graph.
//!
//! All walks start from the root set sorted by node ID, so two graphs with
//! the same shape and IDs are always visited in the same order. Walks are
//! iterative; deep plans do not grow the call stack.

use rustc_hash::FxHashSet;

use crate::error::{PlanError, Result};
use crate::plan::graph::PlanGraph;
use crate::plan::node::{NodeIdx, PlanNode};

#[derive(Copy, Clone)]
enum Direction {
    Predecessors,
    Successors,
}

impl Direction {
    fn edges(self, node: &PlanNode) -> &[NodeIdx] {
        match self {
            Direction::Predecessors => node.predecessors(),
            Direction::Successors => node.successors(),
        }
    }
}

impl PlanGraph {
    /// Nodes in post-order: every node after all of its predecessors.
    pub fn bottom_up_order(&self) -> Vec<NodeIdx> {
        self.depth_first(true)
    }

    /// Nodes in pre-order: every node before descending into its predecessors.
    pub fn top_down_order(&self) -> Vec<NodeIdx> {
        self.depth_first(false)
    }

    /// Calls `f` on every reachable node once, predecessors first.
    pub fn bottom_up_walk<F>(&self, mut f: F) -> Result<()>
    where
        F: FnMut(NodeIdx, &PlanNode) -> Result<()>,
    {
        for idx in self.bottom_up_order() {
            f(idx, &self[idx])?;
        }
        Ok(())
    }

    /// Calls `f` on every reachable node once, before its predecessors.
    pub fn top_down_walk<F>(&self, mut f: F) -> Result<()>
    where
        F: FnMut(NodeIdx, &PlanNode) -> Result<()>,
    {
        for idx in self.top_down_order() {
            f(idx, &self[idx])?;
        }
        Ok(())
    }

    /// Topological walk over predecessors of the sorted root set.
    pub fn topological_walk<F>(&self, f: F) -> Result<()>
    where
        F: FnMut(NodeIdx, &PlanNode) -> Result<()>,
    {
        let roots = self.sorted_roots();
        self.walk_predecessors(&roots, f)
    }

    /// Topological walk following predecessor edges from `roots`.
    ///
    /// `f` runs only once the whole walk is known to be acyclic, in reverse
    /// completion order; on a cycle it is never called.
    pub fn walk_predecessors<F>(&self, roots: &[NodeIdx], f: F) -> Result<()>
    where
        F: FnMut(NodeIdx, &PlanNode) -> Result<()>,
    {
        self.topological(roots, Direction::Predecessors, f)
    }

    /// Topological walk following successor edges from `roots`.
    pub fn walk_successors<F>(&self, roots: &[NodeIdx], f: F) -> Result<()>
    where
        F: FnMut(NodeIdx, &PlanNode) -> Result<()>,
    {
        self.topological(roots, Direction::Successors, f)
    }

    fn depth_first(&self, post_order: bool) -> Vec<NodeIdx> {
        let mut visited = FxHashSet::default();
        let mut order = Vec::new();
        for root in self.sorted_roots() {
            if !visited.insert(root) {
                continue;
            }
            if !post_order {
                order.push(root);
            }
            let mut stack: Vec<(NodeIdx, usize)> = vec![(root, 0)];
            while let Some(frame) = stack.last_mut() {
                let (idx, next) = *frame;
                let preds = self[idx].predecessors();
                if next < preds.len() {
                    frame.1 += 1;
                    let pred = preds[next];
                    if visited.insert(pred) {
                        if !post_order {
                            order.push(pred);
                        }
                        stack.push((pred, 0));
                    }
                } else {
                    stack.pop();
                    if post_order {
                        order.push(idx);
                    }
                }
            }
        }
        order
    }

    fn topological<F>(&self, roots: &[NodeIdx], direction: Direction, mut f: F) -> Result<()>
    where
        F: FnMut(NodeIdx, &PlanNode) -> Result<()>,
    {
        let mut temporary = FxHashSet::default();
        let mut permanent = FxHashSet::default();
        let mut completed = Vec::new();

        for &root in roots {
            if permanent.contains(&root) {
                continue;
            }
            temporary.insert(root);
            let mut stack: Vec<(NodeIdx, usize)> = vec![(root, 0)];
            while let Some(frame) = stack.last_mut() {
                let (idx, next) = *frame;
                let edges = direction.edges(&self[idx]);
                if next < edges.len() {
                    frame.1 += 1;
                    let child = edges[next];
                    if permanent.contains(&child) {
                        continue;
                    }
                    if !temporary.insert(child) {
                        return Err(PlanError::Cycle {
                            node: self[child].id().clone(),
                        });
                    }
                    stack.push((child, 0));
                } else {
                    stack.pop();
                    temporary.remove(&idx);
                    permanent.insert(idx);
                    completed.push(idx);
                }
            }
        }

        for &idx in completed.iter().rev() {
            f(idx, &self[idx])?;
        }
        Ok(())
    }
}
