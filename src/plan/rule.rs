//! Rewrite rules, the append-only rule registry, and the per-planner rule index.

use std::fmt;
use std::sync::Arc;

use parking_lot::RwLock;
use rustc_hash::{FxHashMap, FxHashSet};
use tracing::debug;

use crate::error::Result;
use crate::plan::graph::PlanGraph;
use crate::plan::node::{NodeIdx, ProcedureKind, ANY_KIND};
use crate::plan::pattern::Pattern;

/// Named, pattern-guarded graph rewrite.
///
/// `rewrite` is only called on nodes matching `pattern()`. It returns the
/// node that now stands where `node` stood and whether anything changed.
/// When the returned node differs from `node`, the planner moves `node`'s
/// successors onto it; the rule must not touch anything outside the matched
/// subgraph.
pub trait Rule: Send + Sync {
    /// Globally unique rule name.
    fn name(&self) -> &str;

    /// Shape that triggers the rule.
    fn pattern(&self) -> Pattern;

    /// Applies the rule to a matched node.
    fn rewrite(&self, graph: &mut PlanGraph, node: NodeIdx) -> Result<(NodeIdx, bool)>;
}

impl fmt::Debug for dyn Rule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Rule").field("name", &self.name()).finish()
    }
}

#[derive(Default)]
struct RegistryState {
    rules: Vec<Arc<dyn Rule>>,
    names: FxHashSet<String>,
    finalized: bool,
}

/// Append-only list of rules with duplicate-name rejection and a freeze step.
pub struct RuleRegistry {
    label: &'static str,
    state: RwLock<RegistryState>,
}

impl RuleRegistry {
    /// Creates an empty, open registry; `label` names it in diagnostics.
    pub fn new(label: &'static str) -> Self {
        Self {
            label,
            state: RwLock::new(RegistryState::default()),
        }
    }

    /// Appends rules in order.
    ///
    /// # Panics
    ///
    /// Panics if a rule name is already registered or the registry has been
    /// finalized; both are programming errors.
    pub fn register(&self, rules: impl IntoIterator<Item = Arc<dyn Rule>>) {
        let mut state = self.state.write();
        if state.finalized {
            panic!(
                "{} rule registration attempted after the registry was finalized",
                self.label
            );
        }
        for rule in rules {
            let name = rule.name().to_owned();
            if !state.names.insert(name.clone()) {
                panic!("duplicate registration for {} rule '{name}'", self.label);
            }
            debug!(registry = self.label, rule = %name, "rule registered");
            state.rules.push(rule);
        }
    }

    /// Freezes the registry; later registrations panic.
    pub fn finalize(&self) {
        self.state.write().finalized = true;
    }

    /// True once the registry is frozen.
    pub fn is_finalized(&self) -> bool {
        self.state.read().finalized
    }

    /// Returns the registered rules in registration order and freezes the registry.
    pub fn snapshot(&self) -> Vec<Arc<dyn Rule>> {
        let mut state = self.state.write();
        state.finalized = true;
        state.rules.clone()
    }

    /// Number of registered rules.
    pub fn len(&self) -> usize {
        self.state.read().rules.len()
    }

    /// True when no rule is registered.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Rules indexed for the planner: a wildcard bucket plus one bucket per root kind.
#[derive(Default, Clone)]
pub struct RuleSet {
    wildcard: Vec<Arc<dyn Rule>>,
    by_kind: FxHashMap<ProcedureKind, Vec<Arc<dyn Rule>>>,
}

impl RuleSet {
    /// Indexes `rules`, preserving their order within each bucket.
    pub fn new(rules: impl IntoIterator<Item = Arc<dyn Rule>>) -> Self {
        let mut set = RuleSet::default();
        for rule in rules {
            set.add(rule);
        }
        set
    }

    /// Appends a rule to the bucket of its pattern's root kind.
    pub fn add(&mut self, rule: Arc<dyn Rule>) {
        let kind = rule.pattern().root();
        if kind == ANY_KIND {
            self.wildcard.push(rule);
        } else {
            self.by_kind.entry(kind).or_default().push(rule);
        }
    }

    /// Drops every rule whose name is in `names`.
    pub fn remove(&mut self, names: &[String]) {
        let removed = |rule: &Arc<dyn Rule>| names.iter().any(|n| n == rule.name());
        self.wildcard.retain(|rule| !removed(rule));
        for bucket in self.by_kind.values_mut() {
            bucket.retain(|rule| !removed(rule));
        }
        self.by_kind.retain(|_, bucket| !bucket.is_empty());
    }

    /// Rules rooted at the wildcard, tried first at every node.
    pub fn wildcard(&self) -> &[Arc<dyn Rule>] {
        &self.wildcard
    }

    /// Rules rooted at `kind`.
    pub fn for_kind(&self, kind: ProcedureKind) -> &[Arc<dyn Rule>] {
        self.by_kind.get(&kind).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Total number of rules.
    pub fn len(&self) -> usize {
        self.wildcard.len() + self.by_kind.values().map(Vec::len).sum::<usize>()
    }

    /// True when the set holds no rule.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
