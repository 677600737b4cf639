use std::path::PathBuf;
use std::process;
use std::time::Duration;

use clap::{arg, value_parser, ArgMatches, Command};
use log::{error, info};

use pathsel::colgen::{ColumnGenerationConfig, ColumnGenerationSolver};
use pathsel::ilp::{IlpConfig, IntegerProgramSolver};
use pathsel::lp::ModelParams;
use pathsel::report::RunSummary;
use pathsel::warm_start::{ExternalHeuristic, GreedyHeuristic, WarmStart};
use pathsel::{Error, Goal, Instance, Result, SolverKind};

fn cli() -> Command {
    Command::new("pathsel")
        .about("Selects measurement paths that cover or 1-identify a network")
        .arg(
            arg!(--solver <SOLVER> "Formulation to solve")
                .value_parser(["ilp", "column_generation"]),
        )
        .arg(arg!(-i --input <FILE> "Instance file").value_parser(value_parser!(PathBuf)))
        .arg(
            arg!(-g --goal [GOAL] "Goal of the model")
                .value_parser(["cover", "1id"])
                .default_value("1id"),
        )
        .arg(
            arg!(--timelimit [SECONDS] "Time limit for solving the instance")
                .value_parser(value_parser!(f64))
                .default_value("180.0"),
        )
        .arg(
            arg!(--solfile [FILE] "Path to store the solution")
                .value_parser(value_parser!(PathBuf)),
        )
        .arg(
            arg!(--csv [FILE] "CSV file to append statistics to")
                .value_parser(value_parser!(PathBuf)),
        )
        .arg(
            arg!(--seed [SEED] "Random seed")
                .value_parser(value_parser!(u64))
                .default_value("1863947"),
        )
        .arg(
            arg!(--columns [COUNT] "Routes added per pricing round")
                .value_parser(value_parser!(u64).range(1..))
                .default_value("10"),
        )
        .arg(
            arg!(--"greedy-jar" [JAR] "Warm start with the external greedy program")
                .value_parser(value_parser!(PathBuf)),
        )
        .arg(arg!(--"java-heap" [SIZE] "Heap size of the external greedy").default_value("20g"))
}

fn main() {
    env_logger::init();
    let matches = cli().get_matches();

    if let Err(e) = run(&matches) {
        error!("{e}");
        eprintln!("Error: {e}");
        process::exit(1);
    }
}

fn run(matches: &ArgMatches) -> Result<()> {
    let solver: SolverKind = value::<String>(matches, "solver")?.parse()?;
    let input = value::<PathBuf>(matches, "input")?;
    let goal: Goal = value::<String>(matches, "goal")?.parse()?;
    let seed = *value::<u64>(matches, "seed")?;
    let seconds = *value::<f64>(matches, "timelimit")?;
    let time_limit = Duration::try_from_secs_f64(seconds)
        .map_err(|_| Error::InvalidArgument(format!("invalid time limit {seconds}")))?;
    let params = ModelParams {
        time_limit,
        seed,
        ..ModelParams::default()
    };

    info!("loading {}", input.display());
    let instance = Instance::from_path(input)?;

    info!("solving with {solver}");
    let report = match solver {
        SolverKind::Ilp => {
            let config = IlpConfig {
                params: ModelParams {
                    soft_mem_limit_gb: IlpConfig::default().params.soft_mem_limit_gb,
                    ..params
                },
            };
            IntegerProgramSolver::new(config).solve(&instance, goal)?
        }
        SolverKind::ColumnGeneration => {
            let config = ColumnGenerationConfig {
                columns_per_iteration: usize::try_from(*value::<u64>(matches, "columns")?)
                    .map_err(|_| Error::InvalidArgument("--columns is too large".to_string()))?,
                params,
            };
            let warm_start: Box<dyn WarmStart> = match matches.get_one::<PathBuf>("greedy-jar") {
                Some(jar) => Box::new(
                    ExternalHeuristic::new(jar)
                        .with_heap(value::<String>(matches, "java-heap")?.as_str()),
                ),
                None => Box::new(GreedyHeuristic::new()),
            };
            ColumnGenerationSolver::new(config).solve(&instance, goal, warm_start.as_ref())?
        }
    };
    info!("instance solved with status {}", report.status);

    if let Some(path) = matches.get_one::<PathBuf>("solfile") {
        instance.write_solution(path, &report.solution)?;
    }

    let input_name = input.display().to_string();
    let summary = RunSummary::new(&input_name, goal, seed, time_limit, &instance, &report);
    match matches.get_one::<PathBuf>("csv") {
        Some(path) => summary.append_csv(path)?,
        None => print!("{summary}"),
    }
    Ok(())
}

fn value<'a, T>(matches: &'a ArgMatches, id: &str) -> Result<&'a T>
where
    T: Clone + Send + Sync + 'static,
{
    matches
        .get_one::<T>(id)
        .ok_or_else(|| Error::InvalidArgument(format!("missing --{id}")))
}
