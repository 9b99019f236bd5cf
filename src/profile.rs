//! Env-gated profiling counters for planning work.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::OnceLock;
use std::time::Instant;

/// A snapshot of planner profiling metrics.
///
/// Profiling is enabled via the `FLOWPLAN_PROFILE` environment variable and
/// tracks how much rewriting work planning calls perform.
#[derive(Debug, Clone, Copy, Default)]
pub struct PlannerProfileSnapshot {
    /// Total nanoseconds spent in heuristic `plan` calls.
    pub plan_ns: u64,
    /// Number of heuristic `plan` calls.
    pub plan_count: u64,
    /// Total nanoseconds spent in individual passes.
    pub pass_ns: u64,
    /// Number of passes run.
    pub pass_count: u64,
    /// Number of rule applications that reported a change.
    pub rewrite_count: u64,
    /// Number of rule applications that failed.
    pub rule_error_count: u64,
    /// Total nanoseconds spent in bounds propagation.
    pub bounds_ns: u64,
    /// Number of bounds propagation runs.
    pub bounds_count: u64,
}

#[derive(Default)]
struct PlannerProfileCounters {
    plan_ns: AtomicU64,
    plan_count: AtomicU64,
    pass_ns: AtomicU64,
    pass_count: AtomicU64,
    rewrite_count: AtomicU64,
    rule_error_count: AtomicU64,
    bounds_ns: AtomicU64,
    bounds_count: AtomicU64,
}

static PROFILE_ENABLED: OnceLock<bool> = OnceLock::new();
static PROFILE_COUNTERS: OnceLock<PlannerProfileCounters> = OnceLock::new();

fn profiling_enabled() -> bool {
    *PROFILE_ENABLED.get_or_init(|| std::env::var_os("FLOWPLAN_PROFILE").is_some())
}

fn counters() -> Option<&'static PlannerProfileCounters> {
    profiling_enabled().then(|| PROFILE_COUNTERS.get_or_init(PlannerProfileCounters::default))
}

pub(crate) fn profile_timer() -> Option<Instant> {
    profiling_enabled().then(Instant::now)
}

pub(crate) enum PlannerProfileKind {
    /// A whole heuristic planning call.
    Plan,
    /// One pass of the fixed-point loop.
    Pass,
    /// One bounds propagation run.
    Bounds,
}

pub(crate) fn record_profile_timer(kind: PlannerProfileKind, start: Option<Instant>) {
    let Some(start) = start else {
        return;
    };
    let Some(counters) = counters() else {
        return;
    };
    let nanos = start.elapsed().as_nanos().min(u64::MAX as u128) as u64;
    let (ns, count) = match kind {
        PlannerProfileKind::Plan => (&counters.plan_ns, &counters.plan_count),
        PlannerProfileKind::Pass => (&counters.pass_ns, &counters.pass_count),
        PlannerProfileKind::Bounds => (&counters.bounds_ns, &counters.bounds_count),
    };
    ns.fetch_add(nanos, Ordering::Relaxed);
    count.fetch_add(1, Ordering::Relaxed);
}

pub(crate) fn record_rewrite() {
    if let Some(counters) = counters() {
        counters.rewrite_count.fetch_add(1, Ordering::Relaxed);
    }
}

pub(crate) fn record_rule_error() {
    if let Some(counters) = counters() {
        counters.rule_error_count.fetch_add(1, Ordering::Relaxed);
    }
}

/// Retrieves a snapshot of current planner profiling metrics.
///
/// When `reset` is true the counters are zeroed after reading. Returns
/// `None` unless `FLOWPLAN_PROFILE` is set.
pub fn profile_snapshot(reset: bool) -> Option<PlannerProfileSnapshot> {
    let counters = counters()?;
    let load = |counter: &AtomicU64| {
        if reset {
            counter.swap(0, Ordering::Relaxed)
        } else {
            counter.load(Ordering::Relaxed)
        }
    };
    Some(PlannerProfileSnapshot {
        plan_ns: load(&counters.plan_ns),
        plan_count: load(&counters.plan_count),
        pass_ns: load(&counters.pass_ns),
        pass_count: load(&counters.pass_count),
        rewrite_count: load(&counters.rewrite_count),
        rule_error_count: load(&counters.rule_error_count),
        bounds_ns: load(&counters.bounds_ns),
        bounds_count: load(&counters.bounds_count),
    })
}
