use std::time::{Duration, Instant};

use log::debug;

use super::branch_and_bound::{self, Fixing};
use super::simplex::{self, CoveringProgram, SimplexStatus};
use super::{ConstrId, LpModel, ModelParams, ModelStatus, VarId, VarKind};
use crate::error::{Error, Result};

const BYTES_PER_GB: f64 = 1e9;

/// In-memory engine for covering programs.
///
/// Rows are stored sparsely and densified on every `optimize` call. Continuous
/// models go straight to [`simplex::minimize`]; as soon as one variable is binary
/// the model is handed to [`branch_and_bound::solve`]. Objective coefficients
/// must be non-negative, which is what lets the simplex start without a phase
/// one.
#[derive(Debug, Clone, Default)]
pub struct DenseModel {
    params: ModelParams,
    objective: Vec<f64>,
    kinds: Vec<VarKind>,
    rows: Vec<Vec<(VarId, f64)>>,
    rhs: Vec<f64>,
    values: Vec<f64>,
    duals: Vec<f64>,
    objective_value: Option<f64>,
    mip_gap: Option<f64>,
    runtime: Duration,
}

/// A densified copy of the model under a set of fixings.
#[derive(Debug, Clone)]
pub(crate) struct Relaxation {
    pub program: CoveringProgram<f64>,
    /// Model variable behind each program column
    pub columns: Vec<VarId>,
}

impl Relaxation {
    /// Spreads program values back onto model variables; dropped ones are zero.
    pub fn scatter(&self, primal: &[f64], var_count: usize) -> Vec<f64> {
        let mut values = vec![0.0; var_count];
        for (&var, &x) in self.columns.iter().zip(primal) {
            values[var] = x;
        }
        values
    }
}

impl DenseModel {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_params(params: ModelParams) -> Self {
        Self {
            params,
            ..Self::default()
        }
    }

    pub fn params(&self) -> &ModelParams {
        &self.params
    }

    pub(crate) fn objective(&self) -> &[f64] {
        &self.objective
    }

    pub(crate) fn kinds(&self) -> &[VarKind] {
        &self.kinds
    }

    pub(crate) fn memory_cap_bytes(&self) -> f64 {
        self.params.soft_mem_limit_gb * BYTES_PER_GB
    }

    /// Densifies the model.
    ///
    /// Variables fixed to zero are dropped, variables fixed to one get an `x ≥ 1`
    /// row, and with `bound_binaries` every remaining binary gets `-x ≥ -1`.
    pub(crate) fn relaxation(&self, fixings: &[Fixing], bound_binaries: bool) -> Relaxation {
        let var_count = self.objective.len();
        let mut fixed = vec![None; var_count];
        for fixing in fixings {
            fixed[fixing.var] = Some(fixing.value);
        }

        let columns: Vec<VarId> = (0..var_count)
            .filter(|&v| fixed[v] != Some(false))
            .collect();
        let mut position = vec![None; var_count];
        for (k, &var) in columns.iter().enumerate() {
            position[var] = Some(k);
        }
        let width = columns.len();

        let mut constraints = Vec::with_capacity(self.rows.len());
        let mut rhs = Vec::with_capacity(self.rows.len());
        for (row, &b) in self.rows.iter().zip(&self.rhs) {
            let mut dense = vec![0.0; width];
            for &(var, coef) in row {
                if let Some(k) = position[var] {
                    dense[k] += coef;
                }
            }
            constraints.push(dense);
            rhs.push(b);
        }

        let mut unit_row = |k: usize, sign: f64, b: f64| {
            let mut dense = vec![0.0; width];
            dense[k] = sign;
            constraints.push(dense);
            rhs.push(b);
        };
        if bound_binaries {
            for (k, &var) in columns.iter().enumerate() {
                if self.kinds[var] == VarKind::Binary {
                    unit_row(k, -1.0, -1.0);
                }
            }
        }
        for fixing in fixings.iter().filter(|f| f.value) {
            if let Some(k) = position[fixing.var] {
                unit_row(k, 1.0, 1.0);
            }
        }

        Relaxation {
            program: CoveringProgram {
                objective: columns.iter().map(|&v| self.objective[v]).collect(),
                constraints,
                rhs,
            },
            columns,
        }
    }

    fn solve_lp(&mut self, deadline: Option<Instant>) -> ModelStatus {
        let relaxation = self.relaxation(&[], false);
        if relaxation.program.tableau_bytes() as f64 > self.memory_cap_bytes() {
            return ModelStatus::MemoryLimit;
        }

        let result = simplex::minimize(&relaxation.program, deadline);
        debug!(
            "simplex finished after {} pivots with {:?}",
            result.iterations, result.status
        );
        match result.status {
            SimplexStatus::Optimal => {
                self.values = relaxation.scatter(&result.primal, self.objective.len());
                self.duals = result.duals;
                self.objective_value = Some(result.objective);
                ModelStatus::Optimal
            }
            SimplexStatus::Infeasible => ModelStatus::Infeasible,
            SimplexStatus::TimeLimit => ModelStatus::TimeLimit,
        }
    }

    fn solve_mip(&mut self, deadline: Option<Instant>) -> ModelStatus {
        let outcome = branch_and_bound::solve(self, deadline);
        if let Some(incumbent) = outcome.incumbent {
            self.values = incumbent.values;
            self.objective_value = Some(incumbent.objective);
        }
        self.mip_gap = outcome.gap;
        outcome.status
    }

    fn check_var(&self, var: VarId) -> Result<()> {
        if var < self.objective.len() {
            Ok(())
        } else {
            Err(Error::UnknownVariable(var))
        }
    }
}

impl LpModel for DenseModel {
    fn set_params(&mut self, params: &ModelParams) {
        if params.threads > 1 {
            debug!(
                "dense backend is single-threaded, ignoring threads = {}",
                params.threads
            );
        }
        self.params = params.clone();
    }

    fn set_time_limit(&mut self, limit: Duration) {
        self.params.time_limit = limit;
    }

    fn add_var(
        &mut self,
        objective: f64,
        kind: VarKind,
        column: &[(ConstrId, f64)],
    ) -> Result<VarId> {
        if !objective.is_finite() || objective < 0.0 {
            return Err(Error::UnsupportedModel(format!(
                "objective coefficient {objective} must be finite and non-negative"
            )));
        }
        if let Some(&(constr, _)) = column.iter().find(|(c, _)| *c >= self.rows.len()) {
            return Err(Error::UnknownConstraint(constr));
        }

        let var = self.objective.len();
        self.objective.push(objective);
        self.kinds.push(kind);
        for &(constr, coef) in column {
            if coef != 0.0 {
                self.rows[constr].push((var, coef));
            }
        }
        Ok(var)
    }

    fn add_constr(&mut self, terms: &[(VarId, f64)], rhs: f64) -> Result<ConstrId> {
        for &(var, _) in terms {
            self.check_var(var)?;
        }
        let constr = self.rows.len();
        self.rows
            .push(terms.iter().copied().filter(|&(_, c)| c != 0.0).collect());
        self.rhs.push(rhs);
        Ok(constr)
    }

    fn set_var_kind(&mut self, var: VarId, kind: VarKind) -> Result<()> {
        self.check_var(var)?;
        self.kinds[var] = kind;
        Ok(())
    }

    fn var_count(&self) -> usize {
        self.objective.len()
    }

    fn constr_count(&self) -> usize {
        self.rows.len()
    }

    fn optimize(&mut self) -> Result<ModelStatus> {
        let start = Instant::now();
        let deadline = start.checked_add(self.params.time_limit);
        self.values.clear();
        self.duals.clear();
        self.objective_value = None;
        self.mip_gap = None;

        let status = if self.kinds.contains(&VarKind::Binary) {
            self.solve_mip(deadline)
        } else {
            self.solve_lp(deadline)
        };

        self.runtime = start.elapsed();
        Ok(status)
    }

    fn objective_value(&self) -> Option<f64> {
        self.objective_value
    }

    fn value(&self, var: VarId) -> Option<f64> {
        self.values.get(var).copied()
    }

    fn dual(&self, constr: ConstrId) -> Option<f64> {
        self.duals.get(constr).copied()
    }

    fn mip_gap(&self) -> Option<f64> {
        self.mip_gap
    }

    fn runtime(&self) -> Duration {
        self.runtime
    }
}
