//! Planner configuration.

use std::sync::Arc;

use tracing::warn;

use crate::plan::Rule;

/// Environment variable capping the number of fixed-point passes.
pub const MAX_PASSES_ENV: &str = "FLOWPLAN_MAX_PASSES";

/// Configuration toggles accepted by planner constructors.
#[derive(Clone, Debug)]
pub enum PlannerOption {
    /// Use exactly these rules instead of the registered ones.
    OnlyRules(Vec<Arc<dyn Rule>>),
    /// Skip the named rules.
    RemoveRules(Vec<String>),
    /// Do not run the integrity check (and, for the physical planner, plan validation).
    DisableIntegrityChecks,
    /// Fail with `NotConverged` after this many passes; zero removes the cap.
    MaxPasses(usize),
    /// Memory quota applied by the physical planner when the plan sets none.
    DefaultMemoryLimit(u64),
}

/// Resolved planner settings.
#[derive(Clone, Debug)]
pub struct PlannerConfig {
    /// Rules replacing the registry snapshot, if any.
    pub only_rules: Option<Vec<Arc<dyn Rule>>>,
    /// Rule names to skip.
    pub removed_rules: Vec<String>,
    /// Whether to check graph integrity after planning.
    pub check_integrity: bool,
    /// Pass cap; `None` runs until a pass makes no change.
    pub max_passes: Option<usize>,
    /// Memory quota used when a plan has none.
    pub default_memory_limit: u64,
}

impl Default for PlannerConfig {
    fn default() -> Self {
        Self {
            only_rules: None,
            removed_rules: Vec::new(),
            check_integrity: true,
            max_passes: None,
            default_memory_limit: u64::MAX,
        }
    }
}

impl PlannerConfig {
    /// Defaults overridden by `FLOWPLAN_MAX_PASSES` when it is set.
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Some(raw) = std::env::var_os(MAX_PASSES_ENV) {
            match raw.to_str().and_then(|s| s.trim().parse::<usize>().ok()) {
                Some(passes) => config.max_passes = (passes > 0).then_some(passes),
                None => warn!(value = ?raw, "ignoring unparsable {MAX_PASSES_ENV}"),
            }
        }
        config
    }

    /// Environment defaults with `options` applied in order.
    pub fn from_options(options: impl IntoIterator<Item = PlannerOption>) -> Self {
        let mut config = Self::from_env();
        for option in options {
            config.apply(option);
        }
        config
    }

    /// Applies a single option.
    pub fn apply(&mut self, option: PlannerOption) {
        match option {
            PlannerOption::OnlyRules(rules) => self.only_rules = Some(rules),
            PlannerOption::RemoveRules(names) => self.removed_rules.extend(names),
            PlannerOption::DisableIntegrityChecks => self.check_integrity = false,
            PlannerOption::MaxPasses(passes) => self.max_passes = (passes > 0).then_some(passes),
            PlannerOption::DefaultMemoryLimit(limit) => self.default_memory_limit = limit,
        }
    }
}
