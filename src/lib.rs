//! Rule-based query planner core for a dataflow query language.
//!
//! A compiled [`OperationGraph`](plan::OperationGraph) becomes a logical
//! [`PlanGraph`](plan::PlanGraph) through the
//! [`LogicalPlanner`](plan::LogicalPlanner), which rewrites it to a fixed
//! point with the registered logical rules. The
//! [`PhysicalPlanner`](plan::PhysicalPlanner) then selects executable
//! operators, propagates time bounds, and validates the result.

#![warn(missing_docs)]

pub mod config;
pub mod error;
pub mod logging;
pub mod plan;
pub mod plantest;
pub mod profile;

pub use config::{PlannerConfig, PlannerOption};
pub use error::{PlanError, Result};
pub use logging::init_logging;
pub use profile::{profile_snapshot, PlannerProfileSnapshot};
