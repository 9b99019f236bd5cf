//! Time values and half-open time bounds.
//!
//! Bounds are propagated bottom-up through a plan graph by
//! [`compute_bounds`]; most specs pass them through untouched while a few
//! (range selection, time shifts, windowing) narrow or move them.

use std::fmt;
use std::ops::{Add, Sub};
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use time::format_description::well_known::Rfc3339;
use time::OffsetDateTime;

use crate::error::{PlanError, Result};
use crate::plan::graph::PlanGraph;
use crate::profile::{profile_timer, record_profile_timer, PlannerProfileKind};

/// Point in time, in nanoseconds since the Unix epoch.
#[derive(
    Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Debug, Default, Serialize, Deserialize,
)]
pub struct Time(pub i64);

/// Signed span of time in nanoseconds.
#[derive(
    Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Debug, Default, Serialize, Deserialize,
)]
pub struct Duration(pub i64);

impl Time {
    /// Converts a calendar timestamp.
    ///
    /// Fails with [`PlanError::Invalid`] outside the `i64` nanosecond range
    /// (roughly years 1677 to 2262).
    pub fn from_datetime(dt: OffsetDateTime) -> Result<Self> {
        i64::try_from(dt.unix_timestamp_nanos())
            .map(Time)
            .map_err(|_| PlanError::invalid(format!("timestamp {dt} is out of range")))
    }

    /// Returns the calendar timestamp for this time, if representable.
    pub fn to_datetime(self) -> Option<OffsetDateTime> {
        OffsetDateTime::from_unix_timestamp_nanos(self.0 as i128).ok()
    }
}

impl FromStr for Time {
    type Err = PlanError;

    /// Parses an RFC 3339 timestamp such as `2018-08-14T11:00:00Z`.
    fn from_str(s: &str) -> Result<Self> {
        let dt = OffsetDateTime::parse(s, &Rfc3339)
            .map_err(|e| PlanError::invalid(format!("invalid timestamp {s:?}: {e}")))?;
        Time::from_datetime(dt)
    }
}

impl Duration {
    /// Builds a duration from whole seconds.
    pub const fn seconds(secs: i64) -> Self {
        Duration(secs.saturating_mul(1_000_000_000))
    }

    /// Builds a duration from whole minutes.
    pub const fn minutes(mins: i64) -> Self {
        Duration::seconds(mins.saturating_mul(60))
    }

    /// Builds a duration from whole hours.
    pub const fn hours(hours: i64) -> Self {
        Duration::minutes(hours.saturating_mul(60))
    }
}

impl Add<Duration> for Time {
    type Output = Time;

    fn add(self, rhs: Duration) -> Time {
        Time(self.0.saturating_add(rhs.0))
    }
}

impl Sub<Time> for Time {
    type Output = Duration;

    fn sub(self, rhs: Time) -> Duration {
        Duration(self.0.saturating_sub(rhs.0))
    }
}

impl fmt::Display for Time {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.to_datetime().and_then(|dt| dt.format(&Rfc3339).ok()) {
            Some(text) => f.write_str(&text),
            None => write!(f, "{}ns", self.0),
        }
    }
}

impl fmt::Display for Duration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}ns", self.0)
    }
}

/// Half-open interval `[start, stop)`.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug, Serialize, Deserialize)]
pub struct Bounds {
    /// Inclusive lower edge.
    pub start: Time,
    /// Exclusive upper edge.
    pub stop: Time,
}

impl Bounds {
    /// Canonical empty bounds returned by set operations on empty operands.
    pub const EMPTY: Bounds = Bounds {
        start: Time(0),
        stop: Time(0),
    };

    /// Creates bounds from raw edges.
    pub const fn new(start: Time, stop: Time) -> Self {
        Bounds { start, stop }
    }

    /// True when the interval holds at most one instant.
    pub fn is_empty(&self) -> bool {
        self.start >= self.stop
    }

    /// Smallest interval containing both operands; empty if either is empty.
    pub fn union(&self, other: &Bounds) -> Bounds {
        if self.is_empty() || other.is_empty() {
            return Bounds::EMPTY;
        }
        Bounds {
            start: self.start.min(other.start),
            stop: self.stop.max(other.stop),
        }
    }

    /// Largest common interval; empty if either operand is empty or they do not overlap.
    pub fn intersect(&self, other: &Bounds) -> Bounds {
        if self.is_empty() || other.is_empty() || !self.overlaps(other) {
            return Bounds::EMPTY;
        }
        Bounds {
            start: self.start.max(other.start),
            stop: self.stop.min(other.stop),
        }
    }

    /// `start <= t < stop`.
    pub fn contains(&self, t: Time) -> bool {
        self.start <= t && t < self.stop
    }

    /// True when the two non-empty intervals share at least one instant.
    pub fn overlaps(&self, other: &Bounds) -> bool {
        !self.is_empty()
            && !other.is_empty()
            && self.start < other.stop
            && other.start < self.stop
    }

    /// Moves both edges by `d`.
    pub fn shift(&self, d: Duration) -> Bounds {
        Bounds {
            start: self.start + d,
            stop: self.stop + d,
        }
    }

    /// Length of the interval; zero when empty.
    pub fn duration(&self) -> Duration {
        if self.is_empty() {
            return Duration(0);
        }
        self.stop - self.start
    }
}

impl fmt::Display for Bounds {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {})", self.start, self.stop)
    }
}

/// Time that is either absolute or relative to the query's `now`.
#[derive(Copy, Clone, Eq, PartialEq, Debug, Serialize, Deserialize)]
pub enum TimeSpec {
    /// Fixed instant.
    Absolute(Time),
    /// Offset from `now`; `Relative(Duration(0))` is `now` itself.
    Relative(Duration),
}

impl TimeSpec {
    /// Resolves the time against `now`.
    pub fn resolve(&self, now: Time) -> Time {
        match self {
            TimeSpec::Absolute(t) => *t,
            TimeSpec::Relative(d) => now + *d,
        }
    }
}

/// Bounds whose edges may be relative to `now`.
#[derive(Copy, Clone, Eq, PartialEq, Debug, Serialize, Deserialize)]
pub struct BoundsSpec {
    /// Lower edge.
    pub start: TimeSpec,
    /// Upper edge.
    pub stop: TimeSpec,
}

impl BoundsSpec {
    /// Resolves both edges against `now`.
    pub fn resolve(&self, now: Time) -> Bounds {
        Bounds {
            start: self.start.resolve(now),
            stop: self.stop.resolve(now),
        }
    }
}

/// Capability of specs that transform the bounds flowing into them.
pub trait BoundsAwareSpec {
    /// Returns this node's bounds given the union of its predecessors' bounds
    /// (`None` when no predecessor carries bounds).
    fn time_bounds(&self, predecessor_bounds: Option<Bounds>) -> Option<Bounds>;
}

/// Annotates every reachable node with its bounds, bottom-up.
pub fn compute_bounds(graph: &mut PlanGraph) -> Result<()> {
    let timer = profile_timer();
    for idx in graph.bottom_up_order() {
        let node = &graph[idx];
        let mut bounds: Option<Bounds> = None;
        for pred in node.predecessors() {
            if let Some(pred_bounds) = graph[*pred].bounds() {
                bounds = Some(match bounds {
                    Some(acc) => acc.union(&pred_bounds),
                    None => pred_bounds,
                });
            }
        }
        if let Some(aware) = node.spec().as_bounds_aware() {
            bounds = aware.time_bounds(bounds);
        }
        graph[idx].set_bounds(bounds);
    }
    record_profile_timer(PlannerProfileKind::Bounds, timer);
    Ok(())
}
