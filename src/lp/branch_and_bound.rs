use std::time::Instant;

use log::{debug, trace};
use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

use super::dense::DenseModel;
use super::simplex::{self, SimplexStatus};
use super::{ModelStatus, VarId, VarKind};

const INTEGRALITY_TOLERANCE: f64 = 1e-6;
const BOUND_TOLERANCE: f64 = 1e-9;

/// A binary variable pinned to zero or one in a subproblem.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Fixing {
    pub var: VarId,
    pub value: bool,
}

#[derive(Debug, Clone)]
pub struct Incumbent {
    pub objective: f64,
    pub values: Vec<f64>,
}

#[derive(Debug, Clone)]
pub struct MipOutcome {
    pub status: ModelStatus,
    pub incumbent: Option<Incumbent>,
    /// Relative gap between incumbent and best remaining bound
    pub gap: Option<f64>,
    pub nodes: usize,
}

#[derive(Debug, Clone)]
struct Subproblem {
    fixings: Vec<Fixing>,
    /// Objective of the parent relaxation
    bound: f64,
}

/// Depth-first branch and bound over the binary variables of `model`.
///
/// Each subproblem is the LP relaxation with binaries bounded by one and the
/// fixings applied. Subproblems whose parent bound cannot beat the incumbent are
/// pruned. When every objective coefficient of an all-binary model is integral
/// the bound is rounded up before comparing. The branching variable is the most
/// fractional binary; ties are broken with a `ChaCha8Rng` seeded from the model
/// parameters so that runs are reproducible.
///
/// The deadline is checked before every subproblem and inside every simplex
/// run. Hitting it, or the memory cap, returns the incumbent found so far.
pub fn solve(model: &DenseModel, deadline: Option<Instant>) -> MipOutcome {
    let mut rng = ChaCha8Rng::seed_from_u64(model.params().seed);
    let var_count = model.objective().len();
    let integral_objective = model.kinds().iter().all(|&k| k == VarKind::Binary)
        && model.objective().iter().all(|c| c.fract() == 0.0);
    let memory_cap = model.memory_cap_bytes();

    let mut stack = vec![Subproblem {
        fixings: Vec::new(),
        bound: f64::NEG_INFINITY,
    }];
    let mut incumbent: Option<Incumbent> = None;
    let mut nodes = 0;

    while let Some(node) = stack.pop() {
        if deadline.is_some_and(|d| Instant::now() >= d) {
            stack.push(node);
            return interrupted(ModelStatus::TimeLimit, incumbent, &stack, nodes);
        }
        if !improves(node.bound, incumbent.as_ref(), integral_objective) {
            continue;
        }

        let relaxation = model.relaxation(&node.fixings, true);
        if relaxation.program.tableau_bytes() as f64 > memory_cap {
            stack.push(node);
            return interrupted(ModelStatus::MemoryLimit, incumbent, &stack, nodes);
        }

        let result = simplex::minimize(&relaxation.program, deadline);
        nodes += 1;
        match result.status {
            SimplexStatus::Optimal => {}
            SimplexStatus::Infeasible => continue,
            SimplexStatus::TimeLimit => {
                stack.push(node);
                return interrupted(ModelStatus::TimeLimit, incumbent, &stack, nodes);
            }
        }
        if !improves(result.objective, incumbent.as_ref(), integral_objective) {
            continue;
        }

        let values = relaxation.scatter(&result.primal, var_count);
        match branching_variable(model.kinds(), &values, &mut rng) {
            Some(var) => {
                trace!("branching on x{var} = {:.4}", values[var]);
                for value in [false, true] {
                    let mut fixings = node.fixings.clone();
                    fixings.push(Fixing { var, value });
                    stack.push(Subproblem {
                        fixings,
                        bound: result.objective,
                    });
                }
            }
            None => {
                let candidate = rounded(model, values);
                debug!(
                    "new incumbent {:.4} after {nodes} nodes",
                    candidate.objective
                );
                incumbent = Some(candidate);
            }
        }
    }

    debug!("branch and bound exhausted after {nodes} nodes");
    MipOutcome {
        status: if incumbent.is_some() {
            ModelStatus::Optimal
        } else {
            ModelStatus::Infeasible
        },
        gap: incumbent.as_ref().map(|_| 0.0),
        incumbent,
        nodes,
    }
}

fn improves(bound: f64, incumbent: Option<&Incumbent>, integral_objective: bool) -> bool {
    let Some(incumbent) = incumbent else {
        return true;
    };
    let bound = if integral_objective && bound.is_finite() {
        (bound - BOUND_TOLERANCE).ceil()
    } else {
        bound
    };
    bound < incumbent.objective - BOUND_TOLERANCE
}

fn branching_variable(kinds: &[VarKind], values: &[f64], rng: &mut ChaCha8Rng) -> Option<VarId> {
    let mut best = INTEGRALITY_TOLERANCE;
    let mut candidates = Vec::new();
    for (var, (&kind, &x)) in kinds.iter().zip(values).enumerate() {
        if kind != VarKind::Binary {
            continue;
        }
        let fractionality = (x - x.floor()).min(x.ceil() - x);
        if fractionality > best + BOUND_TOLERANCE {
            best = fractionality;
            candidates.clear();
            candidates.push(var);
        } else if fractionality >= best - BOUND_TOLERANCE && fractionality > INTEGRALITY_TOLERANCE {
            candidates.push(var);
        }
    }
    candidates.choose(rng).copied()
}

// Snaps binaries to 0/1 and recomputes the objective from the snapped values.
fn rounded(model: &DenseModel, mut values: Vec<f64>) -> Incumbent {
    for (x, &kind) in values.iter_mut().zip(model.kinds()) {
        if kind == VarKind::Binary {
            *x = x.round();
        }
    }
    let objective = values
        .iter()
        .zip(model.objective())
        .map(|(x, c)| x * c)
        .sum();
    Incumbent { objective, values }
}

fn interrupted(
    status: ModelStatus,
    incumbent: Option<Incumbent>,
    open: &[Subproblem],
    nodes: usize,
) -> MipOutcome {
    let bound = open
        .iter()
        .map(|node| node.bound)
        .fold(f64::INFINITY, f64::min);
    let gap = incumbent.as_ref().and_then(|inc| {
        let bound = bound.min(inc.objective);
        if !bound.is_finite() {
            None
        } else if inc.objective.abs() < BOUND_TOLERANCE {
            Some(0.0)
        } else {
            Some((inc.objective - bound) / inc.objective.abs())
        }
    });
    debug!("branch and bound interrupted ({status}) after {nodes} nodes");
    MipOutcome {
        status,
        incumbent,
        gap,
        nodes,
    }
}
