use std::collections::{BTreeMap, BTreeSet};

use super::RouteId;

/// Weights below this are treated as zero when a solver hands back values.
pub const WEIGHT_EPSILON: f64 = 1e-9;

/// A selection of routes with their weights.
///
/// Only strictly positive weights are kept. LP stages produce fractional weights,
/// the integer stage and the heuristics produce weights of exactly one.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Solution {
    weights: BTreeMap<RouteId, f64>,
}

impl Solution {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a solution from raw solver values, dropping non-positive entries.
    pub fn from_weights<I>(weights: I) -> Self
    where
        I: IntoIterator<Item = (RouteId, f64)>,
    {
        let weights = weights
            .into_iter()
            .filter(|&(_, w)| w > WEIGHT_EPSILON)
            .collect();
        Self { weights }
    }

    /// Builds an integral solution selecting each route once.
    pub fn from_routes<I>(routes: I) -> Self
    where
        I: IntoIterator<Item = RouteId>,
    {
        Self {
            weights: routes.into_iter().map(|r| (r, 1.0)).collect(),
        }
    }

    pub fn weight(&self, route: RouteId) -> f64 {
        self.weights.get(&route).copied().unwrap_or(0.0)
    }

    pub fn contains(&self, route: RouteId) -> bool {
        self.weights.contains_key(&route)
    }

    pub fn len(&self) -> usize {
        self.weights.len()
    }

    pub fn is_empty(&self) -> bool {
        self.weights.is_empty()
    }

    pub fn routes(&self) -> impl Iterator<Item = RouteId> + '_ {
        self.weights.keys().copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = (RouteId, f64)> + '_ {
        self.weights.iter().map(|(&r, &w)| (r, w))
    }

    pub fn total_weight(&self) -> f64 {
        self.weights.values().sum()
    }

    /// The selected routes as a set.
    pub fn support(&self) -> BTreeSet<RouteId> {
        self.weights.keys().copied().collect()
    }

    /// Rounds every positive weight up to one.
    ///
    /// Any constraint of the form "sum of weights >= 1 over a set" that holds for
    /// this solution also holds for the rounded one.
    pub fn rounded_up(&self) -> Self {
        Self::from_routes(self.routes())
    }

    pub fn is_integral(&self) -> bool {
        self.weights
            .values()
            .all(|w| (w - w.round()).abs() <= WEIGHT_EPSILON)
    }
}
