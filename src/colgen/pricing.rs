use std::collections::BTreeSet;

use log::debug;

use super::branching::{BranchingSet, Polarity};
use super::master::DualPrices;
use crate::problem::{pairs, Goal, Instance, RouteId};

/// Default number of routes returned by one pricing round.
pub const DEFAULT_COLUMNS: usize = 10;

/// Slack on the improvement threshold, absorbing round-off in the duals.
pub const PRICING_TOLERANCE: f64 = 1e-9;

/// Reduced-cost scores of every route of `instance`.
///
/// A route collects the dual price of every node it crosses and, for the 1id
/// goal, of every pair it separates, plus the price of every include-branching
/// subset it belongs to while not yet active. Rows with a zero price are
/// skipped, which is most of them on large instances.
pub fn route_scores(
    instance: &Instance,
    goal: Goal,
    duals: &DualPrices,
    active: &BTreeSet<RouteId>,
    branching: &BranchingSet,
) -> Vec<f64> {
    let mut scores = vec![0.0; instance.route_count()];

    for node in instance.nodes() {
        let price = duals.cover(node);
        if price != 0.0 {
            for &route in instance.symptom(node) {
                scores[route] += price;
            }
        }
    }

    if goal.needs_pairs() {
        for (a, b, key) in pairs(instance.node_count()) {
            let price = duals.pair(key);
            if price != 0.0 {
                for route in instance.separating_routes(a, b) {
                    scores[route] += price;
                }
            }
        }
    }

    for (constraint, &price) in branching.iter().zip(duals.branching_duals()) {
        if constraint.polarity == Polarity::Include && price != 0.0 {
            for route in constraint.routes.difference(active) {
                scores[*route] += price;
            }
        }
    }

    scores
}

/// Greedy pricing of candidate routes.
///
/// Every route has objective coefficient one, so a route improves the master
/// when its score exceeds one. The pricer also keeps the running average of the
/// share of zero duals per row family, across rounds.
#[derive(Debug, Clone)]
pub struct Pricer<'a> {
    instance: &'a Instance,
    goal: Goal,
    rounds: usize,
    zero_cover: f64,
    zero_pair: f64,
}

impl<'a> Pricer<'a> {
    pub fn new(instance: &'a Instance, goal: Goal) -> Self {
        Self {
            instance,
            goal,
            rounds: 0,
            zero_cover: 0.0,
            zero_pair: 0.0,
        }
    }

    /// Returns up to `k` inactive, non-forbidden routes whose score exceeds one,
    /// best first. Ties keep ascending route order.
    ///
    /// An empty result means no column can improve the master.
    pub fn price(
        &mut self,
        duals: &DualPrices,
        active: &BTreeSet<RouteId>,
        branching: &BranchingSet,
        k: usize,
    ) -> BTreeSet<RouteId> {
        self.record(duals);

        let scores = route_scores(self.instance, self.goal, duals, active, branching);
        let forbidden = branching.forbidden_routes();

        let mut candidates: Vec<(RouteId, f64)> = scores
            .into_iter()
            .enumerate()
            .filter(|&(route, score)| {
                score > 1.0 + PRICING_TOLERANCE
                    && !active.contains(&route)
                    && !forbidden.contains(&route)
            })
            .collect();
        candidates.sort_by(|a, b| b.1.total_cmp(&a.1));

        let selected: BTreeSet<RouteId> =
            candidates.into_iter().take(k).map(|(route, _)| route).collect();
        debug!(
            "pricing round {}: {} improving routes",
            self.rounds,
            selected.len()
        );
        selected
    }

    pub fn rounds(&self) -> usize {
        self.rounds
    }

    /// Average share of zero cover duals over all rounds so far.
    pub fn zero_cover_fraction(&self) -> f64 {
        self.zero_cover
    }

    /// Average share of zero pair duals over all rounds so far.
    pub fn zero_pair_fraction(&self) -> f64 {
        self.zero_pair
    }

    fn record(&mut self, duals: &DualPrices) {
        self.rounds += 1;
        let rounds = self.rounds as f64;
        let cover = zero_share(duals.cover_duals());
        let pair = zero_share(duals.pair_duals());
        self.zero_cover += (cover - self.zero_cover) / rounds;
        self.zero_pair += (pair - self.zero_pair) / rounds;
    }
}

fn zero_share(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().filter(|&&v| v == 0.0).count() as f64 / values.len() as f64
}
