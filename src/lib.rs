pub mod colgen;
pub mod error;
pub mod ilp;
pub mod lp;
pub mod problem;
pub mod report;
pub mod warm_start;

pub use colgen::{ColumnGenerationConfig, ColumnGenerationSolver};
pub use error::{Error, PairError, Result};
pub use ilp::{IlpConfig, IntegerProgramSolver};
pub use problem::{Goal, Instance, Solution};
pub use report::{SolveReport, SolveStatus, SolverKind};
