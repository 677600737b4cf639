use std::collections::BTreeSet;

use crate::problem::RouteId;

/// Direction of a branching decision on a subset of routes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Polarity {
    /// At least one route of the subset is selected.
    Include,
    /// No route of the subset is selected.
    Exclude,
}

/// A single branching decision.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BranchingConstraint {
    pub routes: BTreeSet<RouteId>,
    pub polarity: Polarity,
}

impl BranchingConstraint {
    pub fn include<I: IntoIterator<Item = RouteId>>(routes: I) -> Self {
        Self {
            routes: routes.into_iter().collect(),
            polarity: Polarity::Include,
        }
    }

    pub fn exclude<I: IntoIterator<Item = RouteId>>(routes: I) -> Self {
        Self {
            routes: routes.into_iter().collect(),
            polarity: Polarity::Exclude,
        }
    }

    /// Coefficient of a member route in the constraint row.
    pub fn coefficient(&self) -> f64 {
        match self.polarity {
            Polarity::Include => 1.0,
            Polarity::Exclude => -1.0,
        }
    }

    /// Right-hand side of the `>=` row: `sum >= 1` or `-sum >= 0`.
    pub fn rhs(&self) -> f64 {
        match self.polarity {
            Polarity::Include => 1.0,
            Polarity::Exclude => 0.0,
        }
    }
}

/// Stack of branching decisions active in a master problem.
///
/// The rows of these constraints follow the cover and pair rows, in push order.
/// Column generation at the root never pushes anything; a branch-and-price
/// search would push one entry per tree level.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BranchingSet {
    constraints: Vec<BranchingConstraint>,
}

impl BranchingSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, constraint: BranchingConstraint) {
        self.constraints.push(constraint);
    }

    pub fn len(&self) -> usize {
        self.constraints.len()
    }

    pub fn is_empty(&self) -> bool {
        self.constraints.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &BranchingConstraint> {
        self.constraints.iter()
    }

    /// Routes pricing must never propose: the union of all exclude subsets.
    pub fn forbidden_routes(&self) -> BTreeSet<RouteId> {
        self.constraints
            .iter()
            .filter(|c| c.polarity == Polarity::Exclude)
            .flat_map(|c| c.routes.iter().copied())
            .collect()
    }
}

impl FromIterator<BranchingConstraint> for BranchingSet {
    fn from_iter<I: IntoIterator<Item = BranchingConstraint>>(iter: I) -> Self {
        Self {
            constraints: iter.into_iter().collect(),
        }
    }
}
