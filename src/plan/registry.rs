//! Process-wide registries populated during start-up.
//!
//! Rules and procedure spec factories are registered once, before the first
//! planner is built. Building a planner snapshots the rule registries and
//! freezes them; [`finalize_registrations`] freezes everything explicitly.

use std::sync::{Arc, OnceLock};

use parking_lot::RwLock;
use rustc_hash::FxHashMap;
use tracing::debug;

use crate::error::{PlanError, Result};
use crate::plan::node::ProcedureSpec;
use crate::plan::operation::{Administration, OperationKind, OperationSpec};
use crate::plan::rule::{Rule, RuleRegistry};

/// Factory turning an operation into the spec of its plan node.
pub type CreateProcedureSpec =
    fn(&dyn OperationSpec, &dyn Administration) -> Result<Box<dyn ProcedureSpec>>;

static LOGICAL_RULES: OnceLock<RuleRegistry> = OnceLock::new();
static PHYSICAL_RULES: OnceLock<RuleRegistry> = OnceLock::new();
static PROCEDURE_SPECS: OnceLock<RwLock<SpecRegistry>> = OnceLock::new();

#[derive(Default)]
struct SpecRegistry {
    factories: FxHashMap<&'static str, CreateProcedureSpec>,
    finalized: bool,
}

pub(crate) fn logical_rules() -> &'static RuleRegistry {
    LOGICAL_RULES.get_or_init(|| RuleRegistry::new("logical"))
}

pub(crate) fn physical_rules() -> &'static RuleRegistry {
    PHYSICAL_RULES.get_or_init(|| RuleRegistry::new("physical"))
}

fn procedure_specs() -> &'static RwLock<SpecRegistry> {
    PROCEDURE_SPECS.get_or_init(|| RwLock::new(SpecRegistry::default()))
}

/// Adds rules to the logical planner's global registry.
///
/// # Panics
///
/// Panics on a duplicate rule name or after the registry was frozen.
pub fn register_logical_rules(rules: impl IntoIterator<Item = Arc<dyn Rule>>) {
    logical_rules().register(rules);
}

/// Adds rules to the physical planner's global registry.
///
/// # Panics
///
/// Panics on a duplicate rule name or after the registry was frozen.
pub fn register_physical_rules(rules: impl IntoIterator<Item = Arc<dyn Rule>>) {
    physical_rules().register(rules);
}

/// Registers the factory for operations of `kind`.
///
/// # Panics
///
/// Panics when `kind` already has a factory or registrations were finalized.
pub fn register_procedure_spec(kind: OperationKind, create: CreateProcedureSpec) {
    let mut registry = procedure_specs().write();
    if registry.finalized {
        panic!("procedure spec registration for '{kind}' attempted after finalization");
    }
    if registry.factories.insert(kind.0, create).is_some() {
        panic!("duplicate registration for procedure spec '{kind}'");
    }
    debug!(kind = kind.0, "procedure spec registered");
}

/// Freezes every registry; further registration panics.
pub fn finalize_registrations() {
    logical_rules().finalize();
    physical_rules().finalize();
    procedure_specs().write().finalized = true;
}

/// Builds the procedure spec for `spec` with its registered factory.
pub fn create_procedure_spec(
    spec: &dyn OperationSpec,
    admin: &dyn Administration,
) -> Result<Box<dyn ProcedureSpec>> {
    let kind = spec.kind();
    let create = procedure_specs()
        .read()
        .factories
        .get(kind.0)
        .copied()
        .ok_or_else(|| PlanError::UnknownOperation(kind.0.to_owned()))?;
    create(spec, admin)
}
