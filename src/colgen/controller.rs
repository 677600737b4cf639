use std::collections::BTreeSet;
use std::time::{Duration, Instant};

use log::{debug, info, warn};

use super::branching::BranchingSet;
use super::master::{MasterState, RestrictedMaster, RmpOutcome};
use super::pricing::{Pricer, DEFAULT_COLUMNS};
use crate::error::{Error, Result};
use crate::lp::{DenseModel, LpModel, ModelParams, ModelStatus};
use crate::problem::{Goal, Instance, RouteId, Solution};
use crate::report::{ColumnGenerationStats, SolveReport, SolveStatus, SolverKind, SolverStats};
use crate::warm_start::{WarmStart, WarmStartOutcome};

/// Settings of a column generation run.
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnGenerationConfig {
    /// Routes added per pricing round at most
    pub columns_per_iteration: usize,
    /// Engine parameters; `time_limit` is the budget of the whole run after the
    /// warm start
    pub params: ModelParams,
}

impl ColumnGenerationConfig {
    /// An empty pricing round reads as convergence, so each round must be
    /// allowed at least one column.
    pub fn validate(&self) -> Result<()> {
        if self.columns_per_iteration == 0 {
            return Err(Error::InvalidArgument(
                "columns per iteration must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

impl Default for ColumnGenerationConfig {
    fn default() -> Self {
        Self {
            columns_per_iteration: DEFAULT_COLUMNS,
            params: ModelParams::default(),
        }
    }
}

/// Column generation at the root, followed by an integer conversion.
///
/// The master starts on the warm start routes. Each round solves the master
/// LP, prices the routes against its duals and adds the best ones, until
/// pricing finds nothing or the budget is spent. If budget is left, the
/// columns are then made binary and the master is re-optimized.
#[derive(Debug, Clone, Default)]
pub struct ColumnGenerationSolver {
    config: ColumnGenerationConfig,
}

impl ColumnGenerationSolver {
    pub fn new(config: ColumnGenerationConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ColumnGenerationConfig {
        &self.config
    }

    /// Solves with the bundled [`DenseModel`].
    pub fn solve(
        &self,
        instance: &Instance,
        goal: Goal,
        warm_start: &dyn WarmStart,
    ) -> Result<SolveReport> {
        self.solve_with(DenseModel::new(), instance, goal, warm_start)
    }

    pub fn solve_with<M: LpModel>(
        &self,
        model: M,
        instance: &Instance,
        goal: Goal,
        warm_start: &dyn WarmStart,
    ) -> Result<SolveReport> {
        self.config.validate()?;
        let initial = warm_start.select(instance, goal, self.config.params.seed)?;
        info!(
            "warm start selected {} routes in {:.3}s",
            initial.routes.len(),
            initial.elapsed.as_secs_f64()
        );
        self.solve_from(model, instance, goal, &initial)
    }

    /// Runs column generation from an already computed warm start.
    pub fn solve_from<M: LpModel>(
        &self,
        mut model: M,
        instance: &Instance,
        goal: Goal,
        initial: &WarmStartOutcome,
    ) -> Result<SolveReport> {
        self.config.validate()?;
        let budget = self.config.params.time_limit;
        let start = Instant::now();
        let remaining = || budget.saturating_sub(start.elapsed());

        model.set_params(&self.config.params);
        let mut master = RestrictedMaster::new(instance, goal, model);
        master.initialize(&initial.routes, BranchingSet::new())?;
        info!(
            "master problem built on {} routes for goal {goal}",
            initial.routes.len()
        );

        let mut pricer = Pricer::new(instance, goal);
        let mut finished = false;
        master.set_time_limit(remaining());
        let mut outcome = master.solve()?;

        let aborted = loop {
            let duals = match outcome {
                RmpOutcome::Solved(duals) => duals,
                RmpOutcome::Infeasible => break Some(SolveStatus::Infeasible),
                RmpOutcome::MemoryExhausted => break Some(SolveStatus::MemoryLimit),
                RmpOutcome::TimedOut => break None,
            };

            let new_routes = pricer.price(
                &duals,
                master.active_routes(),
                master.branching(),
                self.config.columns_per_iteration,
            );
            if new_routes.is_empty() {
                finished = true;
                break None;
            }
            if remaining().is_zero() {
                break None;
            }

            master.add_columns(&new_routes)?;
            debug!(
                "iteration {}: {} columns, LP objective {:?}",
                pricer.rounds(),
                master.active_routes().len(),
                master.objective()
            );
            master.set_time_limit(remaining());
            outcome = master.solve()?;
        };
        let column_generation_time = start.elapsed();

        let mut stats = ColumnGenerationStats {
            warm_start_time: initial.elapsed,
            warm_start_routes: initial.routes.len(),
            column_generation_time,
            conversion_time: None,
            columns: master.active_routes().len(),
            lp_objective: master.objective(),
            lp_weight: master.solution().total_weight(),
            iterations: pricer.rounds(),
            zero_cover_duals: pricer.zero_cover_fraction(),
            zero_pair_duals: pricer.zero_pair_fraction(),
        };
        let fallback = fallback_solution(master.solution(), &initial.routes);

        let (status, solution) = match aborted {
            Some(SolveStatus::Infeasible) => {
                warn!("master problem is infeasible on the warm start routes");
                (SolveStatus::Infeasible, Solution::new())
            }
            Some(status) => {
                warn!("column generation stopped with {status}");
                (status, fallback)
            }
            None => {
                if finished {
                    info!(
                        "column generation converged after {} rounds with {} columns",
                        pricer.rounds(),
                        stats.columns
                    );
                } else {
                    warn!("time budget exhausted before convergence");
                }
                let left = remaining();
                if left.is_zero() || master.state() != MasterState::Solved {
                    (unconverted(finished), fallback)
                } else {
                    let conversion_start = Instant::now();
                    let integer = master.finalize_integer(left)?;
                    stats.conversion_time = Some(conversion_start.elapsed());
                    info!("integer conversion ended with {}", integer.status);

                    let status = match integer.status {
                        ModelStatus::Optimal if finished => SolveStatus::Optimal,
                        ModelStatus::Optimal | ModelStatus::TimeLimit => unconverted(finished),
                        ModelStatus::Infeasible => SolveStatus::Infeasible,
                        ModelStatus::MemoryLimit => SolveStatus::MemoryLimit,
                    };
                    (status, integer.solution.unwrap_or(fallback))
                }
            }
        };

        let objective = (status != SolveStatus::Infeasible).then(|| solution.len() as f64);
        Ok(SolveReport {
            solver: SolverKind::ColumnGeneration,
            status,
            objective,
            solution,
            solving_time: initial.elapsed + start.elapsed(),
            total_time: None,
            stats: SolverStats::ColumnGeneration(stats),
        })
    }
}

fn unconverted(finished: bool) -> SolveStatus {
    if finished {
        SolveStatus::Converged
    } else {
        SolveStatus::Unfinished
    }
}

/// The smaller of the rounded-up LP support and the warm start routes.
///
/// Both are feasible: every master row is a "sum >= 1" over some routes, which
/// rounding positive weights up to one preserves.
pub fn fallback_solution(lp: &Solution, warm_start: &BTreeSet<RouteId>) -> Solution {
    let rounded = lp.rounded_up();
    if !rounded.is_empty() && rounded.len() < warm_start.len() {
        rounded
    } else {
        Solution::from_routes(warm_start.iter().copied())
    }
}

// Convenience for callers that only hold a time limit.
impl From<Duration> for ColumnGenerationConfig {
    fn from(time_limit: Duration) -> Self {
        Self {
            params: ModelParams {
                time_limit,
                ..ModelParams::default()
            },
            ..Self::default()
        }
    }
}
