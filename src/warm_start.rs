//! Initial route sets for the master problem.
//!
//! Column generation starts from a feasible selection so that the first master
//! LP already has a solution. [`GreedyHeuristic`] computes one in process,
//! [`ExternalHeuristic`] delegates to the stand-alone greedy program.

pub mod external;
pub mod greedy;

use std::collections::BTreeSet;
use std::time::Duration;

use crate::error::Result;
use crate::problem::{Goal, Instance, RouteId};

pub use external::ExternalHeuristic;
pub use greedy::GreedyHeuristic;

/// Routes picked by a warm start and the time it took to pick them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WarmStartOutcome {
    pub elapsed: Duration,
    pub routes: BTreeSet<RouteId>,
}

/// A heuristic producing an initial route selection.
///
/// Implementations run to completion; the caller does not bound their time.
pub trait WarmStart {
    fn select(&self, instance: &Instance, goal: Goal, seed: u64) -> Result<WarmStartOutcome>;
}
