use std::collections::BTreeSet;
use std::path::PathBuf;
use std::process::Command;
use std::time::Duration;

use log::{debug, info};

use super::{WarmStart, WarmStartOutcome};
use crate::error::{Error, Result};
use crate::problem::{Goal, Instance};

/// Runs the stand-alone greedy program on the instance file.
///
/// The program is invoked as
/// `java -Xmx<heap> -jar <jar> --routes <file> --print-solution --seed <seed>`
/// and prints its running time in seconds, the node count, then one
/// `src dst | nodes` line per selected route. It always targets 1id, so the goal
/// is ignored. Routes are mapped back to instance indices by their endpoints.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExternalHeuristic {
    pub jar: PathBuf,
    pub java: PathBuf,
    pub heap: String,
}

impl ExternalHeuristic {
    pub fn new(jar: impl Into<PathBuf>) -> Self {
        Self {
            jar: jar.into(),
            java: PathBuf::from("java"),
            heap: "20g".to_string(),
        }
    }

    pub fn with_heap(mut self, heap: impl Into<String>) -> Self {
        self.heap = heap.into();
        self
    }

    pub fn with_java(mut self, java: impl Into<PathBuf>) -> Self {
        self.java = java.into();
        self
    }
}

impl WarmStart for ExternalHeuristic {
    fn select(&self, instance: &Instance, _goal: Goal, seed: u64) -> Result<WarmStartOutcome> {
        let routes_file = instance.source_path().ok_or_else(|| {
            Error::WarmStart("the external heuristic needs an instance read from a file".into())
        })?;

        info!("running external heuristic {}", self.jar.display());
        let output = Command::new(&self.java)
            .arg(format!("-Xmx{}", self.heap))
            .arg("-jar")
            .arg(&self.jar)
            .arg("--routes")
            .arg(routes_file)
            .arg("--print-solution")
            .arg("--seed")
            .arg(seed.to_string())
            .output()
            .map_err(|e| Error::WarmStart(format!("cannot run {}: {e}", self.java.display())))?;

        if !output.status.success() {
            return Err(Error::WarmStart(format!(
                "heuristic exited with {}: {}",
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }
        parse_output(instance, &String::from_utf8_lossy(&output.stdout))
    }
}

/// Parses the heuristic's standard output against `instance`.
pub fn parse_output(instance: &Instance, stdout: &str) -> Result<WarmStartOutcome> {
    let mut lines = stdout.lines().map(str::trim).filter(|l| !l.is_empty());

    let elapsed = lines
        .next()
        .and_then(|l| l.parse::<f64>().ok())
        .and_then(|secs| Duration::try_from_secs_f64(secs).ok())
        .ok_or_else(|| Error::WarmStart("missing running time".into()))?;
    let node_count: usize = lines
        .next()
        .and_then(|l| l.parse().ok())
        .ok_or_else(|| Error::WarmStart("missing node count".into()))?;
    if node_count != instance.node_count() {
        return Err(Error::WarmStart(format!(
            "heuristic saw {node_count} nodes, the instance has {}",
            instance.node_count()
        )));
    }

    let mut routes = BTreeSet::new();
    for line in lines {
        let (endpoints, _) = line
            .split_once('|')
            .ok_or_else(|| Error::WarmStart(format!("no separator in '{line}'")))?;
        let mut ends = endpoints.split_whitespace().map(str::parse::<usize>);
        let (Some(Ok(source)), Some(Ok(destination)), None) = (ends.next(), ends.next(), ends.next())
        else {
            return Err(Error::WarmStart(format!("bad endpoints in '{line}'")));
        };
        let route = instance
            .route_by_endpoints(source, destination)
            .ok_or_else(|| {
                Error::WarmStart(format!("no route from {source} to {destination}"))
            })?;
        routes.insert(route);
    }

    debug!("external heuristic returned {} routes", routes.len());
    Ok(WarmStartOutcome { elapsed, routes })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::problem::Route;

    fn instance() -> Instance {
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

    #[test]
    fn test_parse_output() {
        let stdout = "0.25\n3\n0 1 | 0 1 \n1 2 | 1 2 \n";

        let outcome = parse_output(&instance(), stdout).unwrap();

        assert_eq!(outcome.elapsed, Duration::from_millis(250));
        assert_eq!(outcome.routes, BTreeSet::from([0, 1]));
    }

    #[test]
    fn test_parse_rejects_unknown_route() {
        let stdout = "0.1\n3\n2 0 | 0 1 2\n";

        assert!(matches!(
            parse_output(&instance(), stdout),
            Err(Error::WarmStart(_))
        ));
    }

    #[test]
    fn test_parse_rejects_wrong_node_count() {
        assert!(parse_output(&instance(), "0.1\n4\n").is_err());
        assert!(parse_output(&instance(), "").is_err());
        assert!(parse_output(&instance(), "0.1\n3\n0 1 0 1\n").is_err());
    }

    #[test]
    fn test_needs_instance_file() {
        let heuristic = ExternalHeuristic::new("greedy.jar");

        assert!(matches!(
            heuristic.select(&instance(), Goal::OneId, 1),
            Err(Error::WarmStart(_))
        ));
    }

    #[test]
    fn test_missing_java() {
        let path = std::env::temp_dir().join("pathsel_external_missing_java.txt");
        std::fs::write(&path, "2 1\n0 1 | 0 1\n").unwrap();
        let instance = Instance::from_path(&path).unwrap();
        let heuristic = ExternalHeuristic::new("greedy.jar")
            .with_java("/nonexistent/bin/java")
            .with_heap("1g");

        let result = heuristic.select(&instance, Goal::OneId, 1);

        std::fs::remove_file(&path).unwrap();
        assert!(matches!(result, Err(Error::WarmStart(_))));
    }
}
