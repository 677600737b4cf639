use std::collections::{BTreeMap, BTreeSet};
use std::time::Duration;

use log::{debug, warn};

use super::branching::BranchingSet;
use crate::error::{Error, Result};
use crate::lp::{ConstrId, LpModel, ModelStatus, VarId, VarKind};
use crate::problem::{hash_pair, pair_count, Goal, Instance, NodeId, RouteId, Solution, WEIGHT_EPSILON};

/// Lifecycle of a [`RestrictedMaster`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MasterState {
    Empty,
    Built,
    Solved,
    /// Columns were added since the last successful solve
    Extended,
    /// Variables are binary; the master no longer accepts columns
    Finalized,
}

/// Dual prices of every master row, in row-creation order.
///
/// The cover block holds one price per node, the pair block one price per pair
/// key (empty for the cover goal), and the branching block one price per entry
/// of the branching set.
#[derive(Debug, Clone, PartialEq)]
pub struct DualPrices {
    values: Vec<f64>,
    node_count: usize,
    pair_count: usize,
}

impl DualPrices {
    pub fn new(values: Vec<f64>, node_count: usize, pair_count: usize) -> Self {
        debug_assert!(values.len() >= node_count + pair_count);
        Self {
            values,
            node_count,
            pair_count,
        }
    }

    pub fn cover(&self, node: NodeId) -> f64 {
        self.values[node]
    }

    pub fn pair(&self, key: usize) -> f64 {
        self.values[self.node_count + key]
    }

    pub fn cover_duals(&self) -> &[f64] {
        &self.values[..self.node_count]
    }

    pub fn pair_duals(&self) -> &[f64] {
        &self.values[self.node_count..self.node_count + self.pair_count]
    }

    pub fn branching_duals(&self) -> &[f64] {
        &self.values[self.node_count + self.pair_count..]
    }

    pub fn as_slice(&self) -> &[f64] {
        &self.values
    }
}

/// Result of solving the master LP.
#[derive(Debug, Clone, PartialEq)]
pub enum RmpOutcome {
    Solved(DualPrices),
    Infeasible,
    TimedOut,
    MemoryExhausted,
}

/// Result of the integer conversion.
#[derive(Debug, Clone)]
pub struct IntegerOutcome {
    pub status: ModelStatus,
    /// Best integer selection, if the engine found one
    pub solution: Option<Solution>,
    pub objective: Option<f64>,
    pub mip_gap: Option<f64>,
}

/// The restricted master problem over the active routes.
///
/// Rows are created once in [`RestrictedMaster::initialize`]: one cover row per
/// node, then one row per pair key for the 1id goal, then one row per branching
/// constraint. Every later route enters as a column against those rows, so the
/// engine keeps its model between solves.
pub struct RestrictedMaster<'a, M: LpModel> {
    instance: &'a Instance,
    goal: Goal,
    model: M,
    state: MasterState,
    active: BTreeSet<RouteId>,
    vars: BTreeMap<RouteId, VarId>,
    branching: BranchingSet,
    branching_rows: Vec<ConstrId>,
    lp_objective: Option<f64>,
    solution: Solution,
}

impl<'a, M: LpModel> RestrictedMaster<'a, M> {
    pub fn new(instance: &'a Instance, goal: Goal, model: M) -> Self {
        Self {
            instance,
            goal,
            model,
            state: MasterState::Empty,
            active: BTreeSet::new(),
            vars: BTreeMap::new(),
            branching: BranchingSet::new(),
            branching_rows: Vec::new(),
            lp_objective: None,
            solution: Solution::new(),
        }
    }

    /// Builds the rows and one continuous column per route of `routes`.
    ///
    /// # Errors
    ///
    /// * [`Error::InvalidState`] unless the master is empty
    /// * [`Error::InvalidArgument`] if a route index is out of range
    pub fn initialize(&mut self, routes: &BTreeSet<RouteId>, branching: BranchingSet) -> Result<()> {
        if self.state != MasterState::Empty {
            return Err(Error::InvalidState("master problem is already built"));
        }
        self.check_routes(routes)?;

        for _ in self.instance.nodes() {
            self.model.add_constr(&[], 1.0)?;
        }
        if self.goal.needs_pairs() {
            for _ in 0..pair_count(self.instance.node_count()) {
                self.model.add_constr(&[], 1.0)?;
            }
        }
        for constraint in branching.iter() {
            let row = self.model.add_constr(&[], constraint.rhs())?;
            self.branching_rows.push(row);
        }
        self.branching = branching;

        for &route in routes {
            self.push_column(route)?;
        }
        self.state = MasterState::Built;
        debug!(
            "master built with {} rows and {} columns",
            self.model.constr_count(),
            self.active.len()
        );
        Ok(())
    }

    /// Optimizes the LP and returns the dual price of every row.
    ///
    /// Infeasibility, time-out and the memory cap come back as distinct
    /// outcomes. They leave the master in its previous state.
    pub fn solve(&mut self) -> Result<RmpOutcome> {
        match self.state {
            MasterState::Built | MasterState::Solved | MasterState::Extended => {}
            MasterState::Empty => return Err(Error::InvalidState("master problem is not built")),
            MasterState::Finalized => {
                return Err(Error::InvalidState("master problem was converted to integers"))
            }
        }

        match self.model.optimize()? {
            ModelStatus::Optimal => {}
            ModelStatus::Infeasible => {
                warn!("master problem is infeasible");
                return Ok(RmpOutcome::Infeasible);
            }
            ModelStatus::TimeLimit => return Ok(RmpOutcome::TimedOut),
            ModelStatus::MemoryLimit => return Ok(RmpOutcome::MemoryExhausted),
        }

        let duals = (0..self.model.constr_count())
            .map(|row| {
                self.model
                    .dual(row)
                    .ok_or(Error::InvalidState("engine returned no dual prices"))
            })
            .collect::<Result<Vec<_>>>()?;
        self.solution = self.read_solution();
        self.lp_objective = self.model.objective_value();
        self.state = MasterState::Solved;

        Ok(RmpOutcome::Solved(DualPrices::new(
            duals,
            self.instance.node_count(),
            self.pair_rows(),
        )))
    }

    /// Adds a continuous column for every route of `routes` not yet active.
    ///
    /// Returns the number of columns actually added.
    pub fn add_columns(&mut self, routes: &BTreeSet<RouteId>) -> Result<usize> {
        match self.state {
            MasterState::Built | MasterState::Solved | MasterState::Extended => {}
            MasterState::Empty => return Err(Error::InvalidState("master problem is not built")),
            MasterState::Finalized => {
                return Err(Error::InvalidState("master problem was converted to integers"))
            }
        }
        self.check_routes(routes)?;

        let mut added = 0;
        for &route in routes {
            if !self.active.contains(&route) {
                self.push_column(route)?;
                added += 1;
            }
        }
        if added > 0 {
            self.state = MasterState::Extended;
        }
        Ok(added)
    }

    /// Makes every column binary and re-optimizes.
    ///
    /// A row `sum(x) >= z_lp` holds the objective at the last LP value, which
    /// is a valid lower bound for every integer selection of the active routes.
    pub fn finalize_integer(&mut self, time_limit: Duration) -> Result<IntegerOutcome> {
        if self.state != MasterState::Solved {
            return Err(Error::InvalidState(
                "integer conversion needs a freshly solved master problem",
            ));
        }
        let lower_bound = self
            .lp_objective
            .ok_or(Error::InvalidState("master problem has no LP objective"))?;

        let vars: Vec<VarId> = self.vars.values().copied().collect();
        for &var in &vars {
            self.model.set_var_kind(var, VarKind::Binary)?;
        }
        let terms: Vec<(VarId, f64)> = vars.iter().map(|&v| (v, 1.0)).collect();
        self.model
            .add_constr(&terms, (lower_bound - WEIGHT_EPSILON).max(0.0))?;
        self.state = MasterState::Finalized;

        self.model.set_time_limit(time_limit);
        let status = self.model.optimize()?;
        let objective = self.model.objective_value();
        let solution = objective.map(|_| self.read_solution());
        debug!("integer conversion finished with {status}");

        Ok(IntegerOutcome {
            status,
            solution,
            objective,
            mip_gap: self.model.mip_gap(),
        })
    }

    pub fn set_time_limit(&mut self, limit: Duration) {
        self.model.set_time_limit(limit);
    }

    pub fn state(&self) -> MasterState {
        self.state
    }

    pub fn goal(&self) -> Goal {
        self.goal
    }

    pub fn active_routes(&self) -> &BTreeSet<RouteId> {
        &self.active
    }

    /// Objective of the last optimal LP solve.
    pub fn objective(&self) -> Option<f64> {
        self.lp_objective
    }

    /// Weights of the last optimal LP solve.
    pub fn solution(&self) -> &Solution {
        &self.solution
    }

    pub fn branching(&self) -> &BranchingSet {
        &self.branching
    }

    pub fn model(&self) -> &M {
        &self.model
    }

    fn pair_rows(&self) -> usize {
        if self.goal.needs_pairs() {
            pair_count(self.instance.node_count())
        } else {
            0
        }
    }

    fn check_routes(&self, routes: &BTreeSet<RouteId>) -> Result<()> {
        match routes.last() {
            Some(&route) if route >= self.instance.route_count() => Err(Error::InvalidArgument(
                format!(
                    "route {route} does not exist, the instance has {} routes",
                    self.instance.route_count()
                ),
            )),
            _ => Ok(()),
        }
    }

    fn push_column(&mut self, route: RouteId) -> Result<()> {
        let column = self.column(route)?;
        let var = self.model.add_var(1.0, VarKind::Continuous, &column)?;
        self.vars.insert(route, var);
        self.active.insert(route);
        Ok(())
    }

    // Coefficient 1 in the row of every node the route crosses and of every pair
    // it separates, plus the branching coefficient of every subset holding it.
    fn column(&self, route: RouteId) -> Result<Vec<(ConstrId, f64)>> {
        let n = self.instance.node_count();
        let nodes = self.instance.route_nodes(route);
        let mut column: Vec<(ConstrId, f64)> = nodes.iter().map(|&v| (v, 1.0)).collect();

        if self.goal.needs_pairs() {
            for &a in nodes {
                for b in self.instance.nodes().filter(|b| !nodes.contains(b)) {
                    column.push((n + hash_pair(a, b, n)?, 1.0));
                }
            }
        }

        for (constraint, &row) in self.branching.iter().zip(&self.branching_rows) {
            if constraint.routes.contains(&route) {
                column.push((row, constraint.coefficient()));
            }
        }
        Ok(column)
    }

    fn read_solution(&self) -> Solution {
        Solution::from_weights(
            self.vars
                .iter()
                .map(|(&route, &var)| (route, self.model.value(var).unwrap_or(0.0))),
        )
    }
}
