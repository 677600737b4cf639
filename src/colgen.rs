//! Column generation over candidate routes.
//!
//! The master LP holds one continuous variable per active route, a cover row
//! per node and, for the 1id goal, a separation row per node pair. Pricing scores
//! every route against the master duals and proposes the best improving ones.
//! The loop ends when nothing improves or the budget is spent, and the final
//! master is then solved over binaries.
//!
//! # Examples
//!
//! ```
//! use pathsel::colgen::ColumnGenerationSolver;
//! use pathsel::problem::{Goal, Instance};
//! use pathsel::warm_start::GreedyHeuristic;
//!
//! let instance: Instance = "3 2\n0 1 | 0 1\n1 2 | 1 2\n".parse().unwrap();
//! let report = ColumnGenerationSolver::default()
//!     .solve(&instance, Goal::Cover, &GreedyHeuristic::new())
//!     .unwrap();
//!
//! assert_eq!(report.solution.len(), 2);
//! ```

mod branching;
mod controller;
mod master;
mod pricing;

#[cfg(test)]
mod tests;

pub use branching::{BranchingConstraint, BranchingSet, Polarity};
pub use controller::{fallback_solution, ColumnGenerationConfig, ColumnGenerationSolver};
pub use master::{DualPrices, IntegerOutcome, MasterState, RestrictedMaster, RmpOutcome};
pub use pricing::{route_scores, Pricer, DEFAULT_COLUMNS, PRICING_TOLERANCE};
