use std::fmt::Debug;
use std::time::Instant;

use ndarray::{Array2, Axis};
use num_traits::Float;

/// A covering program.
///
/// minimize   c^T x
/// subject to A x ≥ b
///            x ≥ 0
///
/// with `c ≥ 0`. The sign of `A` and `b` is unrestricted.
#[derive(Debug, Clone)]
pub struct CoveringProgram<T>
where
    T: Float + Debug,
{
    /// The objective function coefficients (c in min c^T x)
    pub objective: Vec<T>,
    /// The constraint matrix, one row per constraint (A in Ax ≥ b)
    pub constraints: Vec<Vec<T>>,
    /// The right-hand side vector (b in Ax ≥ b)
    pub rhs: Vec<T>,
}

impl<T> CoveringProgram<T>
where
    T: Float + Debug,
{
    /// Size in bytes of the tableau [`minimize`] allocates for this program.
    pub fn tableau_bytes(&self) -> usize {
        let n = self.objective.len();
        let m = self.rhs.len();
        (n + 1) * (m + n + 1) * std::mem::size_of::<T>()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SimplexStatus {
    Optimal,
    Infeasible,
    TimeLimit,
}

#[derive(Debug, Clone)]
pub struct SimplexResult<T> {
    pub status: SimplexStatus,
    /// Optimal x, empty unless optimal
    pub primal: Vec<T>,
    /// Optimal dual price of each row, empty unless optimal
    pub duals: Vec<T>,
    pub objective: T,
    pub iterations: usize,
}

const EPSILON: f64 = 1e-10;

/// Minimizes a covering program with the simplex method.
///
/// The primal simplex runs on the dual packing program
///
/// maximize   b^T y
/// subject to A^T y ≤ c
///            y ≥ 0
///
/// whose slack basis is feasible because `c ≥ 0`, so no phase one is needed.
/// At optimality the basic `y` are the dual prices of the covering rows and the
/// reduced costs of the slack columns are the covering solution `x`. An unbounded
/// packing program means the covering program is infeasible.
///
/// Bland's rule is used for both the entering and the leaving variable, which
/// rules out cycling on the heavily degenerate programs that set covering
/// produces.
///
/// # Arguments
///
/// * `program` - The covering program to solve
/// * `deadline` - Stop with [`SimplexStatus::TimeLimit`] once this instant has
///   passed; checked before every pivot
///
/// # Examples
///
/// ```
/// use pathsel::lp::simplex::{minimize, CoveringProgram, SimplexStatus};
///
/// // minimize x + y + z
/// // subject to x + y ≥ 1, y + z ≥ 1, x + z ≥ 1
/// let program = CoveringProgram {
///     objective: vec![1.0_f64, 1.0, 1.0],
///     constraints: vec![
///         vec![1.0, 1.0, 0.0],
///         vec![0.0, 1.0, 1.0],
///         vec![1.0, 0.0, 1.0],
///     ],
///     rhs: vec![1.0, 1.0, 1.0],
/// };
///
/// let result = minimize(&program, None);
/// assert_eq!(result.status, SimplexStatus::Optimal);
/// assert!((result.objective - 1.5).abs() < 1e-9);
/// ```
pub fn minimize<T>(program: &CoveringProgram<T>, deadline: Option<Instant>) -> SimplexResult<T>
where
    T: Float + Debug,
{
    let n = program.objective.len();
    let m = program.rhs.len();
    let rhs_col = m + n;
    let eps = T::from(EPSILON).unwrap_or_else(T::epsilon);

    let mut tableau = initialize_tableau(program);
    // basis[r] is the column basic in tableau row r + 1
    let mut basis: Vec<usize> = (m..m + n).collect();
    let mut iterations = 0;

    loop {
        if deadline.is_some_and(|d| Instant::now() >= d) {
            return unsolved(SimplexStatus::TimeLimit, iterations);
        }

        // Bland: first column with a negative reduced cost
        let Some(entering) = (0..m + n).find(|&j| tableau[[0, j]] < -eps) else {
            break;
        };

        // Minimum ratio test, ties broken by smallest basic column
        let mut leaving: Option<(usize, T)> = None;
        for r in 1..=n {
            let coef = tableau[[r, entering]];
            if coef <= eps {
                continue;
            }
            let ratio = tableau[[r, rhs_col]] / coef;
            leaving = match leaving {
                Some((best, best_ratio))
                    if ratio > best_ratio + eps
                        || ((ratio - best_ratio).abs() <= eps && basis[r - 1] > basis[best - 1]) =>
                {
                    Some((best, best_ratio))
                }
                _ => Some((r, ratio)),
            };
        }

        let Some((leaving, _)) = leaving else {
            return unsolved(SimplexStatus::Infeasible, iterations);
        };

        pivot(&mut tableau, leaving, entering, eps);
        basis[leaving - 1] = entering;
        iterations += 1;
    }

    let primal = (0..n).map(|k| tableau[[0, m + k]]).collect();
    let mut duals = vec![T::zero(); m];
    for (r, &column) in basis.iter().enumerate() {
        if column < m {
            duals[column] = tableau[[r + 1, rhs_col]];
        }
    }

    SimplexResult {
        status: SimplexStatus::Optimal,
        primal,
        duals,
        objective: tableau[[0, rhs_col]],
        iterations,
    }
}

fn unsolved<T: Float>(status: SimplexStatus, iterations: usize) -> SimplexResult<T> {
    SimplexResult {
        status,
        primal: Vec::new(),
        duals: Vec::new(),
        objective: T::nan(),
        iterations,
    }
}

// Tableau of the packing program: row 0 holds the reduced costs, rows 1..=n one
// packing constraint each. Columns are the m dual variables, the n slacks, and
// the right-hand side.
fn initialize_tableau<T>(program: &CoveringProgram<T>) -> Array2<T>
where
    T: Float + Debug,
{
    let n = program.objective.len();
    let m = program.rhs.len();
    let mut tableau = Array2::zeros((n + 1, m + n + 1));

    for (i, &b) in program.rhs.iter().enumerate() {
        tableau[[0, i]] = -b;
    }
    for (i, row) in program.constraints.iter().enumerate() {
        for (k, &a) in row.iter().enumerate() {
            tableau[[k + 1, i]] = a;
        }
    }
    for (k, &c) in program.objective.iter().enumerate() {
        tableau[[k + 1, m + k]] = T::one();
        tableau[[k + 1, m + n]] = c;
    }

    tableau
}

fn pivot<T>(tableau: &mut Array2<T>, leaving_row: usize, entering_col: usize, eps: T)
where
    T: Float + Debug,
{
    let scale = T::one() / tableau[[leaving_row, entering_col]];
    tableau
        .row_mut(leaving_row)
        .mapv_inplace(|v| clean(v * scale, eps));
    let pivot_row = tableau.row(leaving_row).to_owned();

    for (i, mut row) in tableau.axis_iter_mut(Axis(0)).enumerate() {
        if i == leaving_row {
            continue;
        }
        let factor = row[entering_col];
        if factor == T::zero() {
            continue;
        }
        row.zip_mut_with(&pivot_row, |v, &p| *v = clean(*v - factor * p, eps));
    }

    // Keep the pivot column an exact unit vector
    tableau.column_mut(entering_col).fill(T::zero());
    tableau[[leaving_row, entering_col]] = T::one();
}

fn clean<T: Float>(value: T, eps: T) -> T {
    if value.abs() < eps {
        T::zero()
    } else {
        value
    }
}
