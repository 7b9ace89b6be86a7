//! Solver-independent mixed-integer linear model.
//!
//! The placement formulation is built once as an [`IlpModel`] and handed to
//! any [`IlpSolver`](crate::solver::IlpSolver) backend, which returns one
//! value per variable.

/// Handle of a model variable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Var(pub(crate) usize);

impl Var {
    /// Position in [`IlpModel::variables`].
    pub fn index(self) -> usize {
        self.0
    }
}

/// Integrality of a variable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VarKind {
    /// Real-valued.
    Continuous,
    /// 0 or 1.
    Binary,
}

/// A variable definition.
#[derive(Debug, Clone, PartialEq)]
pub struct VarDef {
    /// Name used in written models; unique within the model.
    pub name: String,
    /// Integrality.
    pub kind: VarKind,
    /// Lower bound.
    pub lower: f64,
    /// Upper bound, `None` for unbounded.
    pub upper: Option<f64>,
}

/// Relation between the left-hand side and the constant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Sense {
    /// `lhs <= rhs`
    Le,
    /// `lhs >= rhs`
    Ge,
    /// `lhs == rhs`
    Eq,
}

/// A linear constraint `Σ coef·var  sense  rhs`.
#[derive(Debug, Clone, PartialEq)]
pub struct Constraint {
    /// Row name.
    pub name: String,
    /// Coefficients.
    pub terms: Vec<(Var, f64)>,
    /// Relation.
    pub sense: Sense,
    /// Constant right-hand side.
    pub rhs: f64,
}

/// A minimization problem.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct IlpModel {
    /// Variables in creation order.
    pub variables: Vec<VarDef>,
    /// Rows in creation order.
    pub constraints: Vec<Constraint>,
    /// Objective coefficients (minimized).
    pub objective: Vec<(Var, f64)>,
}

impl IlpModel {
    /// Creates an empty model.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a continuous variable with the given bounds.
    pub fn continuous(&mut self, name: impl Into<String>, lower: f64, upper: Option<f64>) -> Var {
        self.add_var(VarDef {
            name: name.into(),
            kind: VarKind::Continuous,
            lower,
            upper,
        })
    }

    /// Adds a binary variable.
    pub fn binary(&mut self, name: impl Into<String>) -> Var {
        self.add_var(VarDef {
            name: name.into(),
            kind: VarKind::Binary,
            lower: 0.0,
            upper: Some(1.0),
        })
    }

    fn add_var(&mut self, def: VarDef) -> Var {
        self.variables.push(def);
        Var(self.variables.len() - 1)
    }

    /// Adds a constraint row.
    pub fn constrain(
        &mut self,
        name: impl Into<String>,
        terms: Vec<(Var, f64)>,
        sense: Sense,
        rhs: f64,
    ) {
        self.constraints.push(Constraint {
            name: name.into(),
            terms,
            sense,
            rhs,
        });
    }

    /// Adds `coef·var` to the objective.
    pub fn minimize(&mut self, var: Var, coef: f64) {
        self.objective.push((var, coef));
    }

    /// Looks up a variable by name.
    pub fn var_named(&self, name: &str) -> Option<Var> {
        self.variables.iter().position(|v| v.name == name).map(Var)
    }
}

/// Variable values returned by a solver.
#[derive(Debug, Clone, PartialEq)]
pub struct Solution {
    values: Vec<f64>,
}

impl Solution {
    /// Wraps one value per model variable.
    pub fn new(values: Vec<f64>) -> Self {
        Self { values }
    }

    /// Value of `var`, zero if the solver did not report it.
    pub fn value(&self, var: Var) -> f64 {
        self.values.get(var.0).copied().unwrap_or(0.0)
    }

    /// Objective value of this solution under `model`.
    pub fn objective(&self, model: &IlpModel) -> f64 {
        model.objective.iter().map(|&(v, c)| c * self.value(v)).sum()
    }

    /// Largest violation of any bound or row, for sanity checks.
    pub fn max_violation(&self, model: &IlpModel) -> f64 {
        let mut worst: f64 = 0.0;
        for (i, def) in model.variables.iter().enumerate() {
            let v = self.value(Var(i));
            worst = worst.max(def.lower - v);
            if let Some(upper) = def.upper {
                worst = worst.max(v - upper);
            }
        }
        for row in &model.constraints {
            let lhs: f64 = row.terms.iter().map(|&(v, c)| c * self.value(v)).sum();
            let gap = match row.sense {
                Sense::Le => lhs - row.rhs,
                Sense::Ge => row.rhs - lhs,
                Sense::Eq => (lhs - row.rhs).abs(),
            };
            worst = worst.max(gap);
        }
        worst
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builds_and_evaluates() {
        let mut m = IlpModel::new();
        let x = m.continuous("x", 0.0, Some(10.0));
        let b = m.binary("b");
        m.constrain("c0", vec![(x, 1.0), (b, -5.0)], Sense::Le, 0.0);
        m.minimize(x, -1.0);
        assert_eq!(m.var_named("b"), Some(b));

        let good = Solution::new(vec![5.0, 1.0]);
        assert_eq!(good.objective(&m), -5.0);
        assert!(good.max_violation(&m) <= 0.0);

        let bad = Solution::new(vec![5.0, 0.0]);
        assert_eq!(bad.max_violation(&m), 5.0);
    }
}
