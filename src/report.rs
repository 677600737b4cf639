//! Solve reports, verification and output rows.

use std::collections::BTreeMap;
use std::fmt;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

use crate::error::{Error, Result};
use crate::problem::{Goal, Instance, NodeId, Solution};

/// Which formulation solved the instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SolverKind {
    Ilp,
    ColumnGeneration,
}

impl fmt::Display for SolverKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SolverKind::Ilp => write!(f, "ilp"),
            SolverKind::ColumnGeneration => write!(f, "column_generation"),
        }
    }
}

impl FromStr for SolverKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "ilp" => Ok(SolverKind::Ilp),
            "column_generation" => Ok(SolverKind::ColumnGeneration),
            other => Err(Error::InvalidArgument(format!(
                "unknown solver '{other}', expected 'ilp' or 'column_generation'"
            ))),
        }
    }
}

/// Terminal state of a solve.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum SolveStatus {
    #[default]
    NotRun,
    /// Proven optimal over the routes the model holds
    Optimal,
    /// Column generation converged but the integer conversion was not proven
    Converged,
    /// The time budget ran out first
    Unfinished,
    Infeasible,
    MemoryLimit,
}

impl fmt::Display for SolveStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SolveStatus::NotRun => "NotRun",
            SolveStatus::Optimal => "Optimal",
            SolveStatus::Converged => "Converged",
            SolveStatus::Unfinished => "Unfinished",
            SolveStatus::Infeasible => "Infeasible",
            SolveStatus::MemoryLimit => "MemoryLimit",
        };
        f.write_str(name)
    }
}

/// Figures specific to a column generation run.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ColumnGenerationStats {
    pub warm_start_time: Duration,
    pub warm_start_routes: usize,
    pub column_generation_time: Duration,
    /// `None` when the budget left nothing for the integer conversion
    pub conversion_time: Option<Duration>,
    pub columns: usize,
    pub lp_objective: Option<f64>,
    /// Weight sum of the last LP solution
    pub lp_weight: f64,
    pub iterations: usize,
    pub zero_cover_duals: f64,
    pub zero_pair_duals: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SolverStats {
    Ilp { mip_gap: Option<f64> },
    ColumnGeneration(ColumnGenerationStats),
}

#[derive(Debug, Clone, PartialEq)]
pub struct SolveReport {
    pub solver: SolverKind,
    pub status: SolveStatus,
    /// Number of selected routes, or the engine objective when no selection exists
    pub objective: Option<f64>,
    pub solution: Solution,
    pub solving_time: Duration,
    pub total_time: Option<Duration>,
    pub stats: SolverStats,
}

/// Properties of a solution checked against its instance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Verification {
    pub covered: bool,
    pub one_id: bool,
    pub source_loads: BTreeMap<NodeId, usize>,
}

impl Verification {
    pub fn check(instance: &Instance, solution: &Solution) -> Self {
        Self {
            covered: instance.is_covered(solution),
            one_id: instance.is_one_id(solution),
            source_loads: instance.source_loads(solution),
        }
    }

    pub fn source_count(&self) -> usize {
        self.source_loads.len()
    }

    pub fn max_source_load(&self) -> Option<usize> {
        self.source_loads.values().copied().max()
    }
}

/// A finished run with the context needed to print or log it.
#[derive(Debug, Clone)]
pub struct RunSummary<'a> {
    pub input: &'a str,
    pub goal: Goal,
    pub seed: u64,
    pub time_limit: Duration,
    pub instance: &'a Instance,
    pub report: &'a SolveReport,
    pub verification: Verification,
}

impl<'a> RunSummary<'a> {
    pub fn new(
        input: &'a str,
        goal: Goal,
        seed: u64,
        time_limit: Duration,
        instance: &'a Instance,
        report: &'a SolveReport,
    ) -> Self {
        Self {
            input,
            goal,
            seed,
            time_limit,
            instance,
            report,
            verification: Verification::check(instance, &report.solution),
        }
    }

    /// The `;`-separated statistics row, without a trailing newline.
    pub fn csv_row(&self) -> String {
        let report = self.report;
        let mut fields = vec![
            self.input.to_string(),
            report.solver.to_string(),
            self.goal.to_string(),
            self.seed.to_string(),
            optional(report.objective),
            secs(report.solving_time),
            report.total_time.map_or_else(|| "None".to_string(), secs),
            report.status.to_string(),
            self.verification.covered.to_string(),
            self.verification.one_id.to_string(),
            secs(self.time_limit),
            self.verification.source_count().to_string(),
            self.verification
                .max_source_load()
                .map_or_else(|| "-1".to_string(), |load| load.to_string()),
        ];

        match &report.stats {
            SolverStats::Ilp { mip_gap } => fields.push(optional(*mip_gap)),
            SolverStats::ColumnGeneration(stats) => fields.extend([
                secs(stats.warm_start_time),
                secs(stats.column_generation_time),
                stats.conversion_time.map_or_else(|| "-1".to_string(), secs),
                stats.warm_start_routes.to_string(),
                stats.columns.to_string(),
                optional(stats.lp_objective),
                stats.lp_weight.to_string(),
                stats.iterations.to_string(),
                stats.zero_cover_duals.to_string(),
                stats.zero_pair_duals.to_string(),
            ]),
        }
        fields.join(";")
    }

    /// Appends [`RunSummary::csv_row`] to `path`, creating the file if needed.
    pub fn append_csv(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .map_err(|e| Error::io(path, e))?;
        writeln!(file, "{}", self.csv_row()).map_err(|e| Error::io(path, e))
    }
}

impl fmt::Display for RunSummary<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let report = self.report;
        writeln!(f, "Status : {}", report.status)?;
        writeln!(f, "Number of paths : {}", optional(report.objective))?;
        writeln!(f, "Number of sources : {}", self.verification.source_count())?;
        match self.verification.max_source_load() {
            Some(load) => writeln!(f, "Maximal load on source : {load}")?,
            None => writeln!(f, "Maximal load on source : -")?,
        }
        writeln!(f, "Covered : {}", self.verification.covered)?;
        writeln!(f, "1id : {}", self.verification.one_id)?;
        writeln!(f, "Solving Time (s) : {}", secs(report.solving_time))?;
        match report.total_time {
            Some(total) => writeln!(f, "Total Time (s) : {}", secs(total))?,
            None => writeln!(f, "Total Time (s) : None")?,
        }
        for route in report.solution.routes() {
            let (source, destination) = self.instance.endpoints(route);
            writeln!(f, "{route}: {source} -> {destination}")?;
        }
        Ok(())
    }
}

fn secs(duration: Duration) -> String {
    duration.as_secs_f64().to_string()
}

fn optional(value: Option<f64>) -> String {
    value.map_or_else(|| "-1".to_string(), |v| v.to_string())
}
