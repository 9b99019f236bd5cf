//! Tracing subscriber setup for binaries and tests embedding the planner.

use tracing_subscriber::{fmt, EnvFilter};

use crate::error::{PlanError, Result};

/// Installs a global `fmt` subscriber filtered by `level`.
///
/// `level` is any `EnvFilter` directive, e.g. `"info"` or
/// `"flowplan::plan::heuristic=trace"`. Fails if the directive does not
/// parse or a global subscriber is already set.
pub fn init_logging(level: &str) -> Result<()> {
    let filter = EnvFilter::try_new(level)
        .map_err(|e| PlanError::Logging(format!("invalid log level: {e}")))?;
    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(true)
        .try_init()
        .map_err(|_| PlanError::Logging("logging already initialized".into()))
}
