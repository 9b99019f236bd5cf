//! Compiled operation graph handed to the logical planner.

use std::any::Any;
use std::fmt;

use crate::error::{PlanError, Result};
use crate::plan::bounds::Time;
use crate::plan::graph::ResourceLimits;
use crate::plan::node::{PhysicalSpec, ProcedureKind, ProcedureSpec};

/// Open-world tag naming a compiled operation.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub struct OperationKind(pub &'static str);

impl fmt::Display for OperationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.0)
    }
}

/// Arguments of one compiled operation, as produced by the compiler.
pub trait OperationSpec: fmt::Debug + Send + Sync + 'static {
    /// Kind used to find the procedure spec factory.
    fn kind(&self) -> OperationKind;

    /// Downcast hook for factories.
    fn as_any(&self) -> &dyn Any;
}

impl dyn OperationSpec {
    /// Returns the concrete spec if it is a `T`.
    pub fn downcast_ref<T: OperationSpec>(&self) -> Option<&T> {
        self.as_any().downcast_ref::<T>()
    }
}

/// Context available to procedure spec factories.
pub trait Administration {
    /// Logical current time of the query.
    fn now(&self) -> Time;
}

/// One operation of a compiled query.
#[derive(Debug)]
pub struct Operation {
    /// Operation ID; becomes the plan node ID.
    pub id: String,
    /// Operation arguments.
    pub spec: Box<dyn OperationSpec>,
}

/// Compiled query: operations, the edges between them, and query metadata.
#[derive(Debug, Default)]
pub struct OperationGraph {
    /// Operations in compilation order.
    pub operations: Vec<Operation>,
    /// `(parent, child)` operation ID pairs; data flows from parent to child.
    pub edges: Vec<(String, String)>,
    /// Logical current time.
    pub now: Time,
    /// Resource limits copied onto the plan.
    pub resources: ResourceLimits,
}

impl OperationGraph {
    /// Empty graph evaluated at `now`.
    pub fn new(now: Time) -> Self {
        Self {
            now,
            ..Self::default()
        }
    }

    /// Appends an operation.
    pub fn add_operation(&mut self, id: impl Into<String>, spec: Box<dyn OperationSpec>) {
        self.operations.push(Operation {
            id: id.into(),
            spec,
        });
    }

    /// Appends an edge from `parent` to `child`.
    pub fn add_edge(&mut self, parent: impl Into<String>, child: impl Into<String>) {
        self.edges.push((parent.into(), child.into()));
    }

    /// Checks that every edge endpoint names an operation.
    pub fn validate(&self) -> Result<()> {
        for (parent, child) in &self.edges {
            for id in [parent, child] {
                if !self.operations.iter().any(|op| &op.id == id) {
                    return Err(PlanError::invalid(format!(
                        "edge {parent} -> {child} references unknown operation {id}"
                    )));
                }
            }
        }
        Ok(())
    }
}

impl Administration for OperationGraph {
    fn now(&self) -> Time {
        self.now
    }
}

/// Kind of the yield the logical builder appends to an unnamed result.
pub const GENERATED_YIELD_KIND: ProcedureKind = ProcedureKind("generatedYield");

/// Node ID given to the generated yield.
pub const GENERATED_YIELD_ID: &str = "generated_yield";

/// Result name used by the generated yield.
pub const DEFAULT_YIELD_NAME: &str = "_result";

/// Yield appended to a query's only result when the query names none.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GeneratedYieldSpec {
    /// Result name.
    pub name: String,
}

impl ProcedureSpec for GeneratedYieldSpec {
    fn kind(&self) -> ProcedureKind {
        GENERATED_YIELD_KIND
    }

    fn copy_spec(&self) -> Box<dyn ProcedureSpec> {
        Box::new(self.clone())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_physical(&self) -> Option<&dyn PhysicalSpec> {
        Some(self)
    }

    fn yield_name(&self) -> Option<&str> {
        Some(&self.name)
    }
}

impl PhysicalSpec for GeneratedYieldSpec {}
