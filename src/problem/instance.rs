use std::collections::{BTreeMap, BTreeSet};
use std::fmt::Write as _;
use std::fs;
use std::ops::Range;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use log::debug;
use rayon::prelude::*;

use super::{NodeId, RouteId, Solution, WEIGHT_EPSILON};
use crate::error::{Error, Result};

/// A candidate measurement path between two endpoints.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Route {
    pub source: NodeId,
    pub destination: NodeId,
    pub nodes: BTreeSet<NodeId>,
}

impl Route {
    pub fn new<I>(source: NodeId, destination: NodeId, nodes: I) -> Self
    where
        I: IntoIterator<Item = NodeId>,
    {
        Self {
            source,
            destination,
            nodes: nodes.into_iter().collect(),
        }
    }

    /// Whether this route crosses exactly one of `a` and `b`.
    pub fn separates(&self, a: NodeId, b: NodeId) -> bool {
        self.nodes.contains(&a) != self.nodes.contains(&b)
    }
}

/// A path selection instance: nodes, candidate routes and node symptoms.
///
/// Immutable once built. `symptoms[v]` lists the routes crossing node `v` and is
/// derived from the route list, so both always share the same route indexing.
#[derive(Debug, Clone)]
pub struct Instance {
    node_count: usize,
    routes: Vec<Route>,
    symptoms: Vec<BTreeSet<RouteId>>,
    source: Option<PathBuf>,
}

impl Instance {
    /// Builds an instance from its routes.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidArgument`] if an endpoint or a node of any route is
    /// not below `node_count`.
    pub fn new(node_count: usize, routes: Vec<Route>) -> Result<Self> {
        for (index, route) in routes.iter().enumerate() {
            if let Some(node) = route
                .nodes
                .iter()
                .chain([&route.source, &route.destination])
                .find(|&&v| v >= node_count)
            {
                return Err(Error::InvalidArgument(format!(
                    "route {index} references node {node} but the instance has {node_count} nodes"
                )));
            }
        }
        let symptoms = compute_symptoms(node_count, &routes);
        Ok(Self {
            node_count,
            routes,
            symptoms,
            source: None,
        })
    }

    /// Reads an instance file.
    ///
    /// The first line holds `node_count route_count`, followed by one line per
    /// route of the form `<src> <dst> | <node> <node> ...`.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|e| Error::io(path, e))?;
        let mut instance: Instance = text.parse()?;
        instance.source = Some(path.to_path_buf());
        debug!(
            "loaded {} with {} nodes and {} routes",
            path.display(),
            instance.node_count,
            instance.route_count()
        );
        Ok(instance)
    }

    pub fn node_count(&self) -> usize {
        self.node_count
    }

    pub fn route_count(&self) -> usize {
        self.routes.len()
    }

    pub fn nodes(&self) -> Range<NodeId> {
        0..self.node_count
    }

    pub fn route_ids(&self) -> Range<RouteId> {
        0..self.routes.len()
    }

    pub fn route(&self, route: RouteId) -> &Route {
        &self.routes[route]
    }

    pub fn symptom(&self, node: NodeId) -> &BTreeSet<RouteId> {
        &self.symptoms[node]
    }

    pub fn endpoints(&self, route: RouteId) -> (NodeId, NodeId) {
        let r = &self.routes[route];
        (r.source, r.destination)
    }

    pub fn route_nodes(&self, route: RouteId) -> &BTreeSet<NodeId> {
        &self.routes[route].nodes
    }

    /// The file this instance was read from, if any.
    pub fn source_path(&self) -> Option<&Path> {
        self.source.as_deref()
    }

    /// First route whose endpoints are `(source, destination)`.
    pub fn route_by_endpoints(&self, source: NodeId, destination: NodeId) -> Option<RouteId> {
        self.routes
            .iter()
            .position(|r| r.source == source && r.destination == destination)
    }

    /// Routes crossing exactly one of `a` and `b`.
    pub fn separating_routes(
        &self,
        a: NodeId,
        b: NodeId,
    ) -> impl Iterator<Item = RouteId> + '_ {
        self.symptoms[a]
            .symmetric_difference(&self.symptoms[b])
            .copied()
    }

    /// Every node is crossed by a route with positive weight.
    pub fn is_covered(&self, solution: &Solution) -> bool {
        self.symptoms
            .iter()
            .all(|symptom| symptom.iter().any(|&r| solution.weight(r) > 0.0))
    }

    /// Every pair of nodes is separated by routes of total weight at least one.
    pub fn is_one_id(&self, solution: &Solution) -> bool {
        let n = self.node_count;
        (0..n).into_par_iter().all(|a| {
            (a + 1..n).all(|b| {
                let weight: f64 = solution
                    .iter()
                    .filter(|&(r, _)| self.routes[r].separates(a, b))
                    .map(|(_, w)| w)
                    .sum();
                weight >= 1.0 - WEIGHT_EPSILON
            })
        })
    }

    /// Number of selected routes per source node.
    pub fn source_loads(&self, solution: &Solution) -> BTreeMap<NodeId, usize> {
        let mut loads = BTreeMap::new();
        for route in solution.routes() {
            *loads.entry(self.routes[route].source).or_insert(0) += 1;
        }
        loads
    }

    /// Renders a solution in the solution file format.
    pub fn format_solution(&self, solution: &Solution) -> String {
        let mut out = format!("{}\n", self.node_count);
        for route in solution.routes() {
            let r = &self.routes[route];
            let _ = write!(out, "{} {} |", r.source, r.destination);
            for node in &r.nodes {
                let _ = write!(out, " {node}");
            }
            out.push('\n');
        }
        out
    }

    pub fn write_solution(&self, path: impl AsRef<Path>, solution: &Solution) -> Result<()> {
        let path = path.as_ref();
        fs::write(path, self.format_solution(solution)).map_err(|e| Error::io(path, e))
    }
}

impl FromStr for Instance {
    type Err = Error;

    fn from_str(text: &str) -> Result<Self> {
        let mut lines = text.lines().enumerate().map(|(i, line)| (i + 1, line));

        let (line_no, header) = lines
            .next()
            .ok_or_else(|| Error::malformed(1, "empty instance"))?;
        let header = parse_numbers(header, line_no)?;
        let [node_count, route_count] = header[..] else {
            return Err(Error::malformed(
                line_no,
                format!("expected 'node_count route_count', found {} values", header.len()),
            ));
        };

        let mut routes = Vec::new();
        for _ in 0..route_count {
            let (line_no, line) = lines.next().ok_or_else(|| {
                Error::malformed(
                    routes.len() + 2,
                    format!("expected {route_count} routes, found {}", routes.len()),
                )
            })?;
            routes.push(parse_route(line, line_no, node_count)?);
        }

        Instance::new(node_count, routes)
    }
}

fn parse_route(line: &str, line_no: usize, node_count: usize) -> Result<Route> {
    let (ends, nodes) = line
        .split_once('|')
        .ok_or_else(|| Error::malformed(line_no, "expected '|' separator"))?;
    let ends = parse_numbers(ends, line_no)?;
    let [source, destination] = ends[..] else {
        return Err(Error::malformed(
            line_no,
            format!("expected 2 endpoints, found {}", ends.len()),
        ));
    };
    let nodes = parse_numbers(nodes, line_no)?;
    if let Some(&node) = [source, destination]
        .iter()
        .chain(nodes.iter())
        .find(|&&v| v >= node_count)
    {
        return Err(Error::malformed(
            line_no,
            format!("node {node} out of range for {node_count} nodes"),
        ));
    }
    Ok(Route::new(source, destination, nodes))
}

fn parse_numbers(text: &str, line_no: usize) -> Result<Vec<usize>> {
    text.split_whitespace()
        .map(|token| {
            token
                .parse::<usize>()
                .map_err(|_| Error::malformed(line_no, format!("invalid index '{token}'")))
        })
        .collect()
}

/// Computes, for each node, the set of routes crossing it.
pub fn compute_symptoms(node_count: usize, routes: &[Route]) -> Vec<BTreeSet<RouteId>> {
    let mut symptoms = vec![BTreeSet::new(); node_count];
    for (index, route) in routes.iter().enumerate() {
        for &node in &route.nodes {
            symptoms[node].insert(index);
        }
    }
    symptoms
}
