use std::collections::BTreeSet;
use std::time::Duration;

use approx::assert_abs_diff_eq;

use crate::colgen::{
    fallback_solution, BranchingConstraint, BranchingSet, ColumnGenerationConfig,
    ColumnGenerationSolver, DualPrices, MasterState, Pricer, RestrictedMaster, RmpOutcome,
    DEFAULT_COLUMNS,
};
use crate::error::{Error, Result};
use crate::lp::{ConstrId, DenseModel, LpModel, ModelParams, ModelStatus, VarId, VarKind};
use crate::problem::{pair_count, Goal, Instance, Route, RouteId, Solution};
use crate::report::{SolveStatus, SolverStats};
use crate::warm_start::{GreedyHeuristic, WarmStart, WarmStartOutcome};

struct Fixed(Vec<RouteId>);

impl WarmStart for Fixed {
    fn select(&self, _: &Instance, _: Goal, _: u64) -> Result<WarmStartOutcome> {
        Ok(WarmStartOutcome {
            elapsed: Duration::ZERO,
            routes: self.0.iter().copied().collect(),
        })
    }
}

// Delegates to `DenseModel` but runs out of time once any variable is binary,
// leaving no incumbent.
struct StalledConversion {
    inner: DenseModel,
    stalled: bool,
}

impl StalledConversion {
    fn new() -> Self {
        Self {
            inner: DenseModel::new(),
            stalled: false,
        }
    }
}

impl LpModel for StalledConversion {
    fn set_params(&mut self, params: &ModelParams) {
        self.inner.set_params(params);
    }

    fn set_time_limit(&mut self, limit: Duration) {
        self.inner.set_time_limit(limit);
    }

    fn add_var(
        &mut self,
        objective: f64,
        kind: VarKind,
        column: &[(ConstrId, f64)],
    ) -> Result<VarId> {
        self.inner.add_var(objective, kind, column)
    }

    fn add_constr(&mut self, terms: &[(VarId, f64)], rhs: f64) -> Result<ConstrId> {
        self.inner.add_constr(terms, rhs)
    }

    fn set_var_kind(&mut self, var: VarId, kind: VarKind) -> Result<()> {
        self.stalled |= kind == VarKind::Binary;
        self.inner.set_var_kind(var, kind)
    }

    fn var_count(&self) -> usize {
        self.inner.var_count()
    }

    fn constr_count(&self) -> usize {
        self.inner.constr_count()
    }

    fn optimize(&mut self) -> Result<ModelStatus> {
        if self.stalled {
            return Ok(ModelStatus::TimeLimit);
        }
        self.inner.optimize()
    }

    fn objective_value(&self) -> Option<f64> {
        (!self.stalled).then(|| self.inner.objective_value()).flatten()
    }

    fn value(&self, var: VarId) -> Option<f64> {
        (!self.stalled).then(|| self.inner.value(var)).flatten()
    }

    fn dual(&self, constr: ConstrId) -> Option<f64> {
        (!self.stalled).then(|| self.inner.dual(constr)).flatten()
    }

    fn runtime(&self) -> Duration {
        self.inner.runtime()
    }
}

fn two_routes() -> Instance {
    Instance::new(3, vec![Route::new(0, 1, [0, 1]), Route::new(1, 2, [1, 2])]).unwrap()
}

// Same as `two_routes` plus a route crossing all three nodes.
fn with_shortcut() -> Instance {
    Instance::new(
        3,
        vec![
            Route::new(0, 1, [0, 1]),
            Route::new(1, 2, [1, 2]),
            Route::new(0, 2, [0, 1, 2]),
        ],
    )
    .unwrap()
}

fn spans(n: usize) -> Instance {
    let mut routes = Vec::new();
    for a in 0..n {
        for b in a..n {
            routes.push(Route::new(a, b, a..=b));
        }
    }
    Instance::new(n, routes).unwrap()
}

fn cg_stats(status: &SolverStats) -> &crate::report::ColumnGenerationStats {
    match status {
        SolverStats::ColumnGeneration(stats) => stats,
        SolverStats::Ilp { .. } => panic!("expected column generation stats"),
    }
}

// Runs the master/pricing loop by hand and returns the master once pricing
// finds nothing.
fn converge<'a>(
    instance: &'a Instance,
    goal: Goal,
    initial: &[RouteId],
) -> (RestrictedMaster<'a, DenseModel>, Pricer<'a>, Vec<BTreeSet<RouteId>>) {
    let mut master = RestrictedMaster::new(instance, goal, DenseModel::new());
    master
        .initialize(&initial.iter().copied().collect(), BranchingSet::new())
        .unwrap();
    let mut pricer = Pricer::new(instance, goal);
    let mut history = vec![master.active_routes().clone()];

    loop {
        let RmpOutcome::Solved(duals) = master.solve().unwrap() else {
            panic!("master should solve");
        };
        let new_routes = pricer.price(
            &duals,
            master.active_routes(),
            master.branching(),
            DEFAULT_COLUMNS,
        );
        if new_routes.is_empty() {
            return (master, pricer, history);
        }
        master.add_columns(&new_routes).unwrap();
        history.push(master.active_routes().clone());
    }
}

#[test]
fn test_three_node_cover_needs_two_paths() {
    let instance = two_routes();
    let report = ColumnGenerationSolver::default()
        .solve(&instance, Goal::Cover, &GreedyHeuristic::new())
        .unwrap();

    assert_eq!(report.status, SolveStatus::Optimal);
    assert_eq!(report.objective, Some(2.0));
    assert_eq!(report.solution.support(), BTreeSet::from([0, 1]));
    assert!(instance.is_covered(&report.solution));
}

#[test]
fn test_first_round_without_columns_is_converged() {
    // the warm start is already optimal, so the very first pricing round is empty
    let instance = two_routes();
    let report = ColumnGenerationSolver::default()
        .solve(&instance, Goal::Cover, &Fixed(vec![0, 1]))
        .unwrap();

    let stats = cg_stats(&report.stats);
    assert_eq!(stats.iterations, 1);
    assert_eq!(stats.columns, 2);
    assert!(stats.conversion_time.is_some());
    assert_eq!(report.status, SolveStatus::Optimal);
}

#[test]
fn test_pricing_adds_improving_route() {
    let instance = with_shortcut();
    let report = ColumnGenerationSolver::default()
        .solve(&instance, Goal::Cover, &Fixed(vec![0, 1]))
        .unwrap();

    let stats = cg_stats(&report.stats);
    assert_eq!(report.status, SolveStatus::Optimal);
    assert_eq!(report.solution.support(), BTreeSet::from([2]));
    assert_eq!(stats.columns, 3);
    assert_eq!(stats.iterations, 2);
    assert_abs_diff_eq!(stats.lp_objective.unwrap(), 1.0, epsilon = 1e-9);
    assert_eq!(stats.warm_start_routes, 2);
}

#[test]
fn test_zero_duals_price_nothing() {
    let instance = with_shortcut();
    let n = instance.node_count();
    let duals = DualPrices::new(vec![0.0; n + pair_count(n)], n, pair_count(n));
    let mut pricer = Pricer::new(&instance, Goal::OneId);

    assert_eq!(pricer.rounds(), 0);
    let routes = pricer.price(&duals, &BTreeSet::new(), &BranchingSet::new(), DEFAULT_COLUMNS);
    assert!(routes.is_empty());
}

#[test]
fn test_empty_symptom_is_infeasible_before_pricing() {
    // node 3 lies on no route
    let instance = Instance::new(
        4,
        vec![Route::new(0, 1, [0, 1]), Route::new(1, 2, [1, 2])],
    )
    .unwrap();

    let mut master = RestrictedMaster::new(&instance, Goal::Cover, DenseModel::new());
    master
        .initialize(&BTreeSet::from([0, 1]), BranchingSet::new())
        .unwrap();
    assert_eq!(master.solve().unwrap(), RmpOutcome::Infeasible);

    let report = ColumnGenerationSolver::default()
        .solve(&instance, Goal::Cover, &Fixed(vec![0, 1]))
        .unwrap();
    assert_eq!(report.status, SolveStatus::Infeasible);
    assert_eq!(report.objective, None);
    assert_eq!(cg_stats(&report.stats).iterations, 0);
}

#[test]
fn test_convergence_is_idempotent() {
    let instance = spans(5);
    let initial: Vec<RouteId> = (0..instance.route_count())
        .filter(|&r| instance.route_nodes(r).len() == 1)
        .collect();
    let (mut master, mut pricer, _) = converge(&instance, Goal::OneId, &initial);

    let RmpOutcome::Solved(duals) = master.solve().unwrap() else {
        panic!("master should solve");
    };
    let again = pricer.price(
        &duals,
        master.active_routes(),
        master.branching(),
        DEFAULT_COLUMNS,
    );
    assert!(again.is_empty());
}

#[test]
fn test_active_routes_only_grow() {
    let instance = spans(5);
    let initial: Vec<RouteId> = (0..instance.route_count())
        .filter(|&r| instance.route_nodes(r).len() == 1)
        .collect();
    let (master, _, history) = converge(&instance, Goal::OneId, &initial);

    for window in history.windows(2) {
        assert!(window[0].is_subset(&window[1]));
        assert!(window[0].len() < window[1].len());
    }
    assert!(history[0].is_subset(master.active_routes()));
}

#[test]
fn test_integer_objective_bounded_by_lp() {
    let instance = spans(5);
    let initial: Vec<RouteId> = (0..instance.route_count())
        .filter(|&r| instance.route_nodes(r).len() == 1)
        .collect();
    let (mut master, _, _) = converge(&instance, Goal::OneId, &initial);
    let lp = master.objective().unwrap();

    let integer = master.finalize_integer(Duration::from_secs(60)).unwrap();

    assert_eq!(integer.status, ModelStatus::Optimal);
    assert!(integer.objective.unwrap() >= lp - 1e-9);
    let solution = integer.solution.unwrap();
    assert!(instance.is_covered(&solution));
    assert!(instance.is_one_id(&solution));
    assert_eq!(master.state(), MasterState::Finalized);
}

#[test]
fn test_one_id_run_is_verified() {
    let instance = spans(4);
    let report = ColumnGenerationSolver::new(ColumnGenerationConfig::from(Duration::from_secs(60)))
        .solve(&instance, Goal::OneId, &GreedyHeuristic::new())
        .unwrap();

    let stats = cg_stats(&report.stats);
    assert!(matches!(
        report.status,
        SolveStatus::Optimal | SolveStatus::Converged
    ));
    assert!(instance.is_covered(&report.solution));
    assert!(instance.is_one_id(&report.solution));
    assert!(report.solution.len() <= stats.warm_start_routes);
    assert!(report.solution.is_integral());
}

#[test]
fn test_zero_budget_returns_warm_start() {
    let instance = with_shortcut();
    let solver = ColumnGenerationSolver::new(ColumnGenerationConfig::from(Duration::ZERO));

    let report = solver
        .solve(&instance, Goal::Cover, &Fixed(vec![0, 1]))
        .unwrap();

    assert_eq!(report.status, SolveStatus::Unfinished);
    assert_eq!(report.solution, Solution::from_routes([0, 1]));
    assert_eq!(report.objective, Some(2.0));
    assert_eq!(cg_stats(&report.stats).conversion_time, None);
}

#[test]
fn test_exclude_branch_forbids_route() {
    let instance = with_shortcut();
    let mut master = RestrictedMaster::new(&instance, Goal::Cover, DenseModel::new());
    let branching: BranchingSet = [BranchingConstraint::exclude([2])].into_iter().collect();
    master
        .initialize(&BTreeSet::from([0, 1, 2]), branching)
        .unwrap();

    let RmpOutcome::Solved(duals) = master.solve().unwrap() else {
        panic!("master should solve");
    };

    assert_abs_diff_eq!(master.objective().unwrap(), 2.0, epsilon = 1e-9);
    assert!(!master.solution().contains(2));
    assert_eq!(duals.branching_duals().len(), 1);
}

#[test]
fn test_include_branch_keeps_subset() {
    let instance = with_shortcut();
    let mut master = RestrictedMaster::new(&instance, Goal::Cover, DenseModel::new());
    let branching: BranchingSet = [BranchingConstraint::include([0])].into_iter().collect();
    master
        .initialize(&BTreeSet::from([0, 1, 2]), branching)
        .unwrap();

    assert!(matches!(master.solve().unwrap(), RmpOutcome::Solved(_)));
    assert!(master.solution().weight(0) >= 1.0 - 1e-9);
}

#[test]
fn test_state_machine_rejects_out_of_order_calls() {
    let instance = two_routes();
    let mut master = RestrictedMaster::new(&instance, Goal::Cover, DenseModel::new());

    assert!(matches!(master.solve(), Err(Error::InvalidState(_))));
    assert!(matches!(
        master.add_columns(&BTreeSet::from([0])),
        Err(Error::InvalidState(_))
    ));

    master
        .initialize(&BTreeSet::from([0, 1]), BranchingSet::new())
        .unwrap();
    assert!(matches!(
        master.initialize(&BTreeSet::new(), BranchingSet::new()),
        Err(Error::InvalidState(_))
    ));
    assert!(matches!(
        master.finalize_integer(Duration::from_secs(1)),
        Err(Error::InvalidState(_))
    ));

    master.solve().unwrap();
    master.finalize_integer(Duration::from_secs(1)).unwrap();
    assert!(matches!(master.solve(), Err(Error::InvalidState(_))));
    assert!(matches!(
        master.add_columns(&BTreeSet::from([1])),
        Err(Error::InvalidState(_))
    ));
}

#[test]
fn test_unknown_route_is_rejected() {
    let instance = two_routes();
    let mut master = RestrictedMaster::new(&instance, Goal::Cover, DenseModel::new());

    assert!(matches!(
        master.initialize(&BTreeSet::from([0, 7]), BranchingSet::new()),
        Err(Error::InvalidArgument(_))
    ));
}

#[test]
fn test_pair_rows_follow_cover_rows() {
    let instance = with_shortcut();
    let mut master = RestrictedMaster::new(&instance, Goal::OneId, DenseModel::new());
    master
        .initialize(&BTreeSet::from([0, 1, 2]), BranchingSet::new())
        .unwrap();

    let RmpOutcome::Solved(duals) = master.solve().unwrap() else {
        panic!("master should solve");
    };

    assert_eq!(duals.cover_duals().len(), 3);
    assert_eq!(duals.pair_duals().len(), 3);
    assert!(duals.branching_duals().is_empty());
    assert!(instance.is_one_id(master.solution()));
}

#[test]
fn test_fallback_prefers_smaller_set() {
    let lp = Solution::from_weights([(4, 0.5), (5, 0.5)]);

    assert_eq!(
        fallback_solution(&lp, &BTreeSet::from([1, 2, 3])),
        Solution::from_routes([4, 5])
    );
    assert_eq!(
        fallback_solution(&lp, &BTreeSet::from([1])),
        Solution::from_routes([1])
    );
    assert_eq!(
        fallback_solution(&Solution::new(), &BTreeSet::from([1, 2, 3])),
        Solution::from_routes([1, 2, 3])
    );
}

#[test]
fn test_zero_columns_per_iteration_is_rejected() {
    let solver = ColumnGenerationSolver::new(ColumnGenerationConfig {
        columns_per_iteration: 0,
        ..ColumnGenerationConfig::default()
    });

    let result = solver.solve(&with_shortcut(), Goal::Cover, &Fixed(vec![0, 1]));
    assert!(matches!(result, Err(Error::InvalidArgument(_))));

    let initial = WarmStartOutcome {
        elapsed: Duration::ZERO,
        routes: BTreeSet::from([0, 1]),
    };
    let result = solver.solve_from(DenseModel::new(), &with_shortcut(), Goal::Cover, &initial);
    assert!(matches!(result, Err(Error::InvalidArgument(_))));
}

#[test]
fn test_memory_limit_is_reported_with_warm_start() {
    let solver = ColumnGenerationSolver::new(ColumnGenerationConfig {
        params: ModelParams {
            soft_mem_limit_gb: 1e-12,
            ..ModelParams::default()
        },
        ..ColumnGenerationConfig::default()
    });

    let report = solver
        .solve(&with_shortcut(), Goal::Cover, &Fixed(vec![0, 1]))
        .unwrap();

    assert_eq!(report.status, SolveStatus::MemoryLimit);
    assert_eq!(report.solution, Solution::from_routes([0, 1]));
    assert_eq!(report.objective, Some(2.0));
    assert_eq!(cg_stats(&report.stats).conversion_time, None);
}

#[test]
fn test_conversion_time_out_falls_back_to_lp_support() {
    let instance = with_shortcut();
    let initial = WarmStartOutcome {
        elapsed: Duration::ZERO,
        routes: BTreeSet::from([0, 1]),
    };

    let report = ColumnGenerationSolver::default()
        .solve_from(StalledConversion::new(), &instance, Goal::Cover, &initial)
        .unwrap();

    // pricing converged on route 2, but the conversion found no incumbent
    assert_eq!(report.status, SolveStatus::Converged);
    assert_eq!(report.solution, Solution::from_routes([2]));
    assert_eq!(report.objective, Some(1.0));
    assert!(cg_stats(&report.stats).conversion_time.is_some());
    assert!(instance.is_covered(&report.solution));
}
