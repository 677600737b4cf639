//! The full binary program over every route.

use std::time::Instant;

use log::{debug, info};

use crate::error::Result;
use crate::lp::{DenseModel, LpModel, ModelParams, ModelStatus, VarId, VarKind};
use crate::problem::{pairs, Goal, Instance, Solution};
use crate::report::{SolveReport, SolveStatus, SolverKind, SolverStats};

/// Settings of the plain ILP solver.
#[derive(Debug, Clone, PartialEq)]
pub struct IlpConfig {
    pub params: ModelParams,
}

impl Default for IlpConfig {
    fn default() -> Self {
        Self {
            params: ModelParams {
                soft_mem_limit_gb: 50.0,
                ..ModelParams::default()
            },
        }
    }
}

/// One binary variable per route, the same cover and pair rows as the
/// column generation master, and a single optimize call.
#[derive(Debug, Clone, Default)]
pub struct IntegerProgramSolver {
    config: IlpConfig,
}

impl IntegerProgramSolver {
    pub fn new(config: IlpConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &IlpConfig {
        &self.config
    }

    pub fn solve(&self, instance: &Instance, goal: Goal) -> Result<SolveReport> {
        self.solve_with(DenseModel::new(), instance, goal)
    }

    pub fn solve_with<M: LpModel>(
        &self,
        mut model: M,
        instance: &Instance,
        goal: Goal,
    ) -> Result<SolveReport> {
        let start = Instant::now();
        model.set_params(&self.config.params);

        let vars = instance
            .route_ids()
            .map(|_| model.add_var(1.0, VarKind::Binary, &[]))
            .collect::<Result<Vec<VarId>>>()?;

        for node in instance.nodes() {
            let terms: Vec<(VarId, f64)> = instance
                .symptom(node)
                .iter()
                .map(|&route| (vars[route], 1.0))
                .collect();
            model.add_constr(&terms, 1.0)?;
        }
        if goal.needs_pairs() {
            for (a, b, _) in pairs(instance.node_count()) {
                let terms: Vec<(VarId, f64)> = instance
                    .separating_routes(a, b)
                    .map(|route| (vars[route], 1.0))
                    .collect();
                model.add_constr(&terms, 1.0)?;
            }
        }
        info!(
            "ILP built with {} variables and {} rows",
            model.var_count(),
            model.constr_count()
        );

        let model_status = model.optimize()?;
        debug!("ILP optimize returned {model_status}");
        let objective = model.objective_value();
        let solution = if objective.is_some() {
            Solution::from_weights(
                vars.iter()
                    .enumerate()
                    .map(|(route, &var)| (route, model.value(var).unwrap_or(0.0))),
            )
        } else {
            Solution::new()
        };

        let status = match model_status {
            ModelStatus::Optimal => SolveStatus::Optimal,
            ModelStatus::TimeLimit => SolveStatus::Unfinished,
            ModelStatus::Infeasible => SolveStatus::Infeasible,
            ModelStatus::MemoryLimit => SolveStatus::MemoryLimit,
        };
        info!(
            "ILP finished with {status} after {:.3}s",
            start.elapsed().as_secs_f64()
        );

        Ok(SolveReport {
            solver: SolverKind::Ilp,
            status,
            objective,
            solution,
            solving_time: model.runtime(),
            total_time: None,
            stats: SolverStats::Ilp {
                mip_gap: model.mip_gap(),
            },
        })
    }
}
