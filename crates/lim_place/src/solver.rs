//! Solver backends.
//!
//! The placement model is solved either in-process with `good_lp`'s pure
//! Rust `microlp` backend or by an external `cbc` / `glpsol` process that
//! reads the model as CPLEX LP text. Every call is blocking and bounded by
//! a time limit; a timeout or a non-zero exit is a solver failure.
//!
//! The in-process backend cannot be interrupted, so it runs on a worker
//! thread. When the limit passes the caller gets the failure at once and the
//! abandoned worker finishes in the background.

use crate::error::PlaceError;
use crate::lp::{parse_cbc_solution, parse_glpk_solution, write_lp};
use crate::model::{IlpModel, Sense, Solution, VarKind};
use good_lp::{variable, Expression, ProblemVariables, ResolutionError, SolverModel, Variable};
use lim_config::{PlacementConfig, SolverKind};
use std::path::Path;
use std::process::{Command, Stdio};
use std::sync::mpsc::{self, RecvTimeoutError};
use std::time::{Duration, Instant};

/// A mixed-integer solver.
pub trait IlpSolver {
    /// Short backend name for logs.
    fn name(&self) -> &'static str;

    /// Solves `model` to optimality.
    ///
    /// Infeasibility is reported as [`PlaceError::Infeasible`], everything
    /// else that prevents an optimal answer as [`PlaceError::Solver`].
    fn solve(&self, model: &IlpModel) -> Result<Solution, PlaceError>;
}

/// Returns the backend selected by `config`.
pub fn solver_for(config: &PlacementConfig) -> Box<dyn IlpSolver> {
    let limit = Duration::from_secs(config.time_limit_secs);
    match config.solver {
        SolverKind::Builtin => Box::new(MicroLpSolver::new(limit)),
        SolverKind::Cbc => Box::new(ExternalSolver::new(ExternalProgram::Cbc, limit)),
        SolverKind::Glpk => Box::new(ExternalSolver::new(ExternalProgram::Glpk, limit)),
    }
}

/// In-process branch and bound via `good_lp`.
#[derive(Debug, Clone, Copy)]
pub struct MicroLpSolver {
    time_limit: Duration,
}

impl MicroLpSolver {
    /// A solver that gives up after `time_limit` of wall-clock time.
    pub fn new(time_limit: Duration) -> Self {
        Self { time_limit }
    }
}

impl Default for MicroLpSolver {
    fn default() -> Self {
        Self::new(Duration::from_secs(60))
    }
}

impl IlpSolver for MicroLpSolver {
    fn name(&self) -> &'static str {
        "microlp"
    }

    fn solve(&self, model: &IlpModel) -> Result<Solution, PlaceError> {
        let started = Instant::now();
        let (tx, rx) = mpsc::channel();
        let owned = model.clone();
        std::thread::Builder::new()
            .name("lim-microlp".into())
            .spawn(move || {
                // The receiver is gone once the caller has timed out.
                let _ = tx.send(solve_in_process(&owned));
            })?;

        match rx.recv_timeout(self.time_limit) {
            Ok(result) if started.elapsed() < self.time_limit => result,
            Ok(_) | Err(RecvTimeoutError::Timeout) => {
                tracing::warn!(
                    limit_ms = self.time_limit.as_millis() as u64,
                    variables = model.variables.len(),
                    "microlp hit its time limit"
                );
                Err(PlaceError::Solver(format!(
                    "microlp exceeded the {:.3}s time limit",
                    self.time_limit.as_secs_f64()
                )))
            }
            Err(RecvTimeoutError::Disconnected) => Err(PlaceError::Solver(
                "microlp worker stopped without an answer".into(),
            )),
        }
    }
}

fn solve_in_process(model: &IlpModel) -> Result<Solution, PlaceError> {
    let mut vars = ProblemVariables::new();
    let handles: Vec<Variable> = model
        .variables
        .iter()
        .map(|def| {
            let mut v = variable().name(def.name.clone());
            if def.kind == VarKind::Binary {
                v = v.binary();
            } else {
                if def.lower.is_finite() {
                    v = v.min(def.lower);
                }
                if let Some(upper) = def.upper.filter(|u| u.is_finite()) {
                    v = v.max(upper);
                }
            }
            vars.add(v)
        })
        .collect();

    let objective: Expression = model
        .objective
        .iter()
        .map(|&(v, c)| c * handles[v.index()])
        .sum();
    let mut problem = vars
        .minimise(objective)
        .using(good_lp::solvers::microlp::microlp);
    for row in &model.constraints {
        let lhs: Expression = row
            .terms
            .iter()
            .map(|&(v, c)| c * handles[v.index()])
            .sum();
        let constraint = match row.sense {
            Sense::Le => good_lp::constraint::leq(lhs, row.rhs),
            Sense::Ge => good_lp::constraint::geq(lhs, row.rhs),
            Sense::Eq => good_lp::constraint::eq(lhs, row.rhs),
        };
        problem.add_constraint(constraint);
    }

    let solution = problem.solve().map_err(|e| match e {
        ResolutionError::Infeasible => PlaceError::Infeasible("microlp: infeasible".into()),
        other => PlaceError::Solver(format!("microlp: {other}")),
    })?;
    let values = handles
        .iter()
        .map(|&h| good_lp::Solution::value(&solution, h))
        .collect();
    Ok(Solution::new(values))
}

/// External solver executable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExternalProgram {
    /// COIN-OR CBC.
    Cbc,
    /// GLPK's `glpsol`.
    Glpk,
}

/// Runs an external solver on a CPLEX LP file in a scratch directory.
#[derive(Debug, Clone)]
pub struct ExternalSolver {
    program: ExternalProgram,
    executable: String,
    time_limit: Duration,
}

/// Extra wall-clock time granted beyond the solver's own limit before the
/// process is killed.
const KILL_GRACE: Duration = Duration::from_secs(5);

impl ExternalSolver {
    /// Uses the program's default executable name from `PATH`.
    pub fn new(program: ExternalProgram, time_limit: Duration) -> Self {
        let executable = match program {
            ExternalProgram::Cbc => "cbc",
            ExternalProgram::Glpk => "glpsol",
        };
        Self {
            program,
            executable: executable.to_string(),
            time_limit,
        }
    }

    /// Overrides the executable path.
    pub fn with_executable(mut self, executable: impl Into<String>) -> Self {
        self.executable = executable.into();
        self
    }

    fn command(&self, model: &Path, solution: &Path) -> Command {
        let secs = self.time_limit.as_secs().max(1).to_string();
        let mut cmd = Command::new(&self.executable);
        match self.program {
            ExternalProgram::Cbc => {
                cmd.arg(model)
                    .args(["sec", &secs, "solve", "solu"])
                    .arg(solution);
            }
            ExternalProgram::Glpk => {
                cmd.arg("--lp")
                    .arg(model)
                    .args(["--tmlim", &secs, "-w"])
                    .arg(solution);
            }
        }
        cmd.stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null());
        cmd
    }
}

impl IlpSolver for ExternalSolver {
    fn name(&self) -> &'static str {
        match self.program {
            ExternalProgram::Cbc => "cbc",
            ExternalProgram::Glpk => "glpk",
        }
    }

    fn solve(&self, model: &IlpModel) -> Result<Solution, PlaceError> {
        let dir = tempfile::tempdir()?;
        let model_path = dir.path().join("placement.lp");
        let solution_path = dir.path().join("placement.sol");
        std::fs::write(&model_path, write_lp(model))?;

        let mut child = self
            .command(&model_path, &solution_path)
            .spawn()
            .map_err(|e| PlaceError::Solver(format!("cannot start `{}`: {e}", self.executable)))?;
        let deadline = Instant::now() + self.time_limit + KILL_GRACE;
        let status = loop {
            if let Some(status) = child.try_wait()? {
                break status;
            }
            if Instant::now() >= deadline {
                let _ = child.kill();
                let _ = child.wait();
                return Err(PlaceError::Solver(format!(
                    "`{}` exceeded the {}s time limit",
                    self.executable,
                    self.time_limit.as_secs()
                )));
            }
            std::thread::sleep(Duration::from_millis(20));
        };
        if !status.success() {
            return Err(PlaceError::Solver(format!(
                "`{}` exited with {status}",
                self.executable
            )));
        }

        let text = std::fs::read_to_string(&solution_path)?;
        match self.program {
            ExternalProgram::Cbc => parse_cbc_solution(&text, model),
            ExternalProgram::Glpk => parse_glpk_solution(&text, model),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn microlp_solves_small_mip() {
        // min x + y  s.t. x + y >= 1.5, x <= 2b, y <= 2(1-b)
        let mut m = IlpModel::new();
        let x = m.continuous("x", 0.0, Some(5.0));
        let y = m.continuous("y", 0.0, Some(5.0));
        let b = m.binary("b");
        m.constrain("sum", vec![(x, 1.0), (y, 1.0)], Sense::Ge, 1.5);
        m.constrain("xb", vec![(x, 1.0), (b, -2.0)], Sense::Le, 0.0);
        m.constrain("yb", vec![(y, 1.0), (b, 2.0)], Sense::Le, 2.0);
        m.minimize(x, 1.0);
        m.minimize(y, 1.0);
        let sol = MicroLpSolver::default().solve(&m).unwrap();
        assert!((sol.objective(&m) - 1.5).abs() < 1e-6);
        assert!(sol.max_violation(&m) < 1e-6);
        let bv = sol.value(b);
        assert!(bv.abs() < 1e-6 || (bv - 1.0).abs() < 1e-6);
    }

    #[test]
    fn microlp_reports_infeasible() {
        let mut m = IlpModel::new();
        let x = m.continuous("x", 0.0, Some(1.0));
        m.constrain("big", vec![(x, 1.0)], Sense::Ge, 2.0);
        assert!(matches!(
            MicroLpSolver::default().solve(&m),
            Err(PlaceError::Infeasible(_))
        ));
    }

    #[test]
    fn microlp_without_time_budget_fails_as_solver_error() {
        let mut m = IlpModel::new();
        let x = m.continuous("x", 0.0, Some(1.0));
        m.minimize(x, 1.0);
        let err = MicroLpSolver::new(Duration::ZERO).solve(&m).unwrap_err();
        assert!(matches!(err, PlaceError::Solver(ref msg) if msg.contains("time limit")));
    }

    #[test]
    fn missing_executable_is_solver_failure() {
        let solver = ExternalSolver::new(ExternalProgram::Cbc, Duration::from_secs(1))
            .with_executable("lim-no-such-solver-binary");
        let mut m = IlpModel::new();
        let x = m.continuous("x", 0.0, None);
        m.minimize(x, 1.0);
        assert!(matches!(solver.solve(&m), Err(PlaceError::Solver(_))));
    }

    #[test]
    fn selection_follows_config() {
        let mut config = PlacementConfig::default();
        assert_eq!(solver_for(&config).name(), "microlp");
        config.solver = SolverKind::Glpk;
        assert_eq!(solver_for(&config).name(), "glpk");
    }
}
