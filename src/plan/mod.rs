//! Plan graph, rewrite machinery, and the logical and physical planners.

pub mod bounds;
pub mod format;
pub mod graph;
pub mod heuristic;
pub mod logical;
pub mod mutate;
pub mod node;
pub mod operation;
pub mod pattern;
pub mod physical;
pub mod registry;
pub mod rule;
mod walk;

pub use bounds::{compute_bounds, Bounds, BoundsAwareSpec, BoundsSpec, Duration, Time, TimeSpec};
pub use format::{dot, explain_value, NodeSummary, PlanSummary};
pub use graph::{PlanGraph, Priority, ResourceLimits};
pub use heuristic::HeuristicPlanner;
pub use logical::{build_logical_plan, LogicalOption, LogicalPlanner};
pub use mutate::{merge_ids, merge_nodes, replace_node, swap_nodes};
pub use node::{
    Cost, Edges, NodeFlavor, NodeId, NodeIdx, PhysicalSpec, PlanNode, PlanStats, ProcedureKind,
    ProcedureSpec, ANY_KIND,
};
pub use operation::{
    Administration, GeneratedYieldSpec, Operation, OperationGraph, OperationKind, OperationSpec,
    DEFAULT_YIELD_NAME, GENERATED_YIELD_ID, GENERATED_YIELD_KIND,
};
pub use pattern::{any, leaf, pat, Pattern};
pub use physical::{PhysicalOption, PhysicalPlanner, PHYSICAL_CONVERTER_RULE};
pub use registry::{
    create_procedure_spec, finalize_registrations, register_logical_rules,
    register_physical_rules, register_procedure_spec, CreateProcedureSpec,
};
pub use rule::{Rule, RuleRegistry, RuleSet};
