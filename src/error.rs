//! Planner error type and result alias.

use thiserror::Error;

use crate::plan::NodeId;

/// Result alias used throughout the planner.
pub type Result<T> = std::result::Result<T, PlanError>;

/// Errors raised while building, rewriting, or inspecting a plan graph.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PlanError {
    /// A rewrite rule failed; planning was aborted.
    #[error("rule '{rule}' failed: {source}")]
    Rule {
        /// Name of the failing rule.
        rule: String,
        /// Error returned by the rule.
        source: Box<PlanError>,
    },
    /// A mutation primitive was applied to nodes that are not connected as required.
    #[error("cannot {op} {top} and {bottom} due to topological issues")]
    InvalidTopology {
        /// Primitive that rejected the pair (`merge`, `swap`).
        op: &'static str,
        /// Upper node of the pair.
        top: NodeId,
        /// Lower node of the pair.
        bottom: NodeId,
    },
    /// A topological walk found a back edge.
    #[error("cycle detected at node {node}")]
    Cycle {
        /// Node that was reached twice on the current path.
        node: NodeId,
    },
    /// Edge symmetry, root, or identity invariants do not hold.
    #[error("integrity violated: {0}")]
    Integrity(String),
    /// No procedure spec factory is registered for an operation kind.
    #[error("no procedure spec registered for operation kind '{0}'")]
    UnknownOperation(String),
    /// More than one unyielded result would need a generated yield.
    #[error("query must specify explicit yields when there is more than one result")]
    MultipleGeneratedYields,
    /// A node survived physical planning without a physical spec.
    #[error("node {0} does not have a physical procedure spec")]
    NotPhysical(NodeId),
    /// The fixed-point loop hit the configured pass cap.
    #[error("plan did not converge after {passes} passes")]
    NotConverged {
        /// Number of passes that were run.
        passes: usize,
    },
    /// Invalid argument or unexpected spec shape.
    #[error("invalid argument: {0}")]
    Invalid(String),
    /// Installing the tracing subscriber failed.
    #[error("logging: {0}")]
    Logging(String),
}

impl PlanError {
    /// Wraps an error returned by the named rule.
    pub fn rule(rule: impl Into<String>, source: PlanError) -> Self {
        PlanError::Rule {
            rule: rule.into(),
            source: Box::new(source),
        }
    }

    pub(crate) fn invalid(msg: impl Into<String>) -> Self {
        PlanError::Invalid(msg.into())
    }
}
