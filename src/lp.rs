//! Boundary to the LP/MILP engine.
//!
//! The column generation loop and the plain ILP formulation only talk to the
//! engine through [`LpModel`], so any solver able to add `>=` rows, add columns
//! against existing rows, report duals and switch variable domains can be used.
//! [`DenseModel`] is the bundled engine for covering programs.

pub mod branch_and_bound;
pub mod dense;
pub mod simplex;

use std::fmt;
use std::time::Duration;

use crate::error::Result;

pub use dense::DenseModel;

/// Handle to a variable, assigned in creation order.
pub type VarId = usize;

/// Handle to a constraint row, assigned in creation order.
pub type ConstrId = usize;

/// Default time limit applied to fresh models.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(1800);

/// Default random seed for solver tie-breaking.
pub const RANDOM_SEED: u64 = 1_863_947;

/// Domain of a decision variable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VarKind {
    /// Non-negative real.
    Continuous,
    /// Zero or one.
    Binary,
}

/// Outcome of [`LpModel::optimize`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModelStatus {
    Optimal,
    Infeasible,
    /// The time limit was reached. An incumbent may still be available.
    TimeLimit,
    /// The soft memory cap was reached.
    MemoryLimit,
}

impl fmt::Display for ModelStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ModelStatus::Optimal => "Optimality",
            ModelStatus::Infeasible => "Infeasible",
            ModelStatus::TimeLimit => "Timeout",
            ModelStatus::MemoryLimit => "MEM_LIMIT",
        };
        f.write_str(name)
    }
}

/// Engine parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct ModelParams {
    /// Wall-clock limit for one call to `optimize`
    pub time_limit: Duration,
    /// Seed for any randomised choice inside the engine
    pub seed: u64,
    /// Number of worker threads the engine may use
    pub threads: usize,
    /// Soft memory cap in gigabytes
    pub soft_mem_limit_gb: f64,
}

impl Default for ModelParams {
    fn default() -> Self {
        Self {
            time_limit: DEFAULT_TIMEOUT,
            seed: RANDOM_SEED,
            threads: 1,
            soft_mem_limit_gb: 20.0,
        }
    }
}

/// A minimisation model made of `>=` rows.
///
/// Values and duals refer to the last call to [`LpModel::optimize`]. Duals are
/// only available when every variable is continuous and the status is optimal.
pub trait LpModel {
    fn set_params(&mut self, params: &ModelParams);

    fn set_time_limit(&mut self, limit: Duration);

    /// Adds a variable with the given objective coefficient, placing `column`
    /// coefficients into already existing rows.
    fn add_var(&mut self, objective: f64, kind: VarKind, column: &[(ConstrId, f64)])
        -> Result<VarId>;

    /// Adds the row `sum(coef * var) >= rhs`.
    fn add_constr(&mut self, terms: &[(VarId, f64)], rhs: f64) -> Result<ConstrId>;

    fn set_var_kind(&mut self, var: VarId, kind: VarKind) -> Result<()>;

    fn var_count(&self) -> usize;

    fn constr_count(&self) -> usize;

    fn optimize(&mut self) -> Result<ModelStatus>;

    fn objective_value(&self) -> Option<f64>;

    fn value(&self, var: VarId) -> Option<f64>;

    fn dual(&self, constr: ConstrId) -> Option<f64>;

    /// Relative gap between incumbent and bound after a MIP solve.
    fn mip_gap(&self) -> Option<f64> {
        None
    }

    /// Wall-clock time spent in the last `optimize` call.
    fn runtime(&self) -> Duration;
}
