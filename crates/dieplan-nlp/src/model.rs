use dieplan::diag::{bail, StrResult};

use crate::expr::{ExprArena, ExprId, VarId};
use crate::solve;

/// A box-bounded decision variable.
#[derive(Debug, Copy, Clone)]
pub(crate) struct VarSpec {
    pub lb: f64,
    pub ub: f64,
    pub init: f64,
    pub fixed: bool,
}

/// A nonlinear program: variables with box bounds, equality and inequality
/// constraints over an expression DAG, and an objective to minimize.
#[derive(Debug, Default)]
pub struct Model {
    /// The expression arena the model's constraints and objective live in.
    pub arena: ExprArena,
    pub(crate) vars: Vec<VarSpec>,
    pub(crate) constraints: Vec<ExprId>,
    pub(crate) objective: Option<ExprId>,
    node_budget: Option<usize>,
}

impl Model {
    /// Create an empty model.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty model whose expression DAG may not exceed the given
    /// node count. Exceeding the budget surfaces as an error from
    /// [`minimize`](Self::minimize) and [`constrain`](Self::constrain).
    pub fn with_node_budget(budget: usize) -> Self {
        Self { node_budget: Some(budget), ..Self::default() }
    }

    /// Add a decision variable with the given bounds and initial value.
    pub fn var(&mut self, lb: f64, ub: f64, init: f64) -> VarId {
        let id = VarId(self.vars.len() as u32);
        self.vars.push(VarSpec { lb, ub, init: init.clamp(lb, ub), fixed: false });
        id
    }

    /// The number of variables.
    pub fn num_vars(&self) -> usize {
        self.vars.len()
    }

    /// The initial value of a variable.
    pub fn init(&self, var: VarId) -> f64 {
        self.vars[var.index()].init
    }

    /// Pin a variable to a value: it keeps that value through the solve.
    pub fn fix(&mut self, var: VarId, value: f64) {
        let spec = &mut self.vars[var.index()];
        spec.init = value;
        spec.fixed = true;
    }

    /// Add a constraint. The expression must be a comparison node.
    pub fn constrain(&mut self, cmp: ExprId) -> StrResult<()> {
        if self.arena.cmp_op(cmp).is_none() {
            bail!("constraints must be comparison expressions");
        }
        self.constraints.push(cmp);
        self.check_budget()?;
        Ok(())
    }

    /// Add a term to the objective.
    pub fn minimize(&mut self, term: ExprId) -> StrResult<()> {
        self.objective = Some(match self.objective {
            Some(objective) => self.arena.add(objective, term),
            None => term,
        });
        self.check_budget()
    }

    /// Solve the program.
    pub fn solve(&self, options: SolveOptions) -> Solution {
        solve::solve(self, options)
    }

    fn check_budget(&self) -> StrResult<()> {
        if let Some(budget) = self.node_budget {
            if self.arena.len() > budget {
                bail!(
                    "optimization model grew past {budget} expression nodes; \
                     the problem is too large for this formulation"
                );
            }
        }
        Ok(())
    }
}

/// Knobs for the augmented-Lagrangian solver.
#[derive(Debug, Copy, Clone)]
pub struct SolveOptions {
    /// The total budget of inner gradient steps.
    pub max_iter: usize,
    /// The feasibility and stationarity tolerance.
    pub tolerance: f64,
}

impl Default for SolveOptions {
    fn default() -> Self {
        Self { max_iter: 2000, tolerance: 1e-6 }
    }
}

/// The outcome of a solve.
#[derive(Debug, Clone)]
pub struct Solution {
    pub(crate) values: Vec<f64>,
    /// Whether the solver reached feasibility and stationarity within its
    /// iteration budget.
    pub converged: bool,
    /// The number of inner gradient steps taken.
    pub iterations: usize,
    /// The objective value at the returned point.
    pub objective: f64,
}

impl Solution {
    /// The value of a variable at the returned point.
    pub fn value(&self, var: VarId) -> f64 {
        self.values[var.index()]
    }

    /// All variable values, indexed by variable.
    pub fn values(&self) -> &[f64] {
        &self.values
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bound_constrained_quadratic() {
        // minimize (x - 3)² subject to x ≤ 2 via the box bound.
        let mut model = Model::new();
        let x = model.var(0.0, 2.0, 0.5);
        let xe = model.arena.var(x);
        let three = model.arena.constant(3.0);
        let diff = model.arena.sub(xe, three);
        let sq = model.arena.sq(diff);
        model.minimize(sq).unwrap();

        let solution = model.solve(SolveOptions::default());
        assert!(solution.converged);
        assert!((solution.value(x) - 2.0).abs() < 1e-4);
    }

    #[test]
    fn test_equality_constrained_quadratic() {
        // minimize x² + y² subject to x + y = 2: optimum at (1, 1).
        let mut model = Model::new();
        let x = model.var(-10.0, 10.0, 3.0);
        let y = model.var(-10.0, 10.0, -1.0);
        let xe = model.arena.var(x);
        let ye = model.arena.var(y);
        let xsq = model.arena.sq(xe);
        let ysq = model.arena.sq(ye);
        let obj = model.arena.add(xsq, ysq);
        model.minimize(obj).unwrap();

        let sum = model.arena.add(xe, ye);
        let two = model.arena.constant(2.0);
        let eq = model.arena.eq(sum, two);
        model.constrain(eq).unwrap();

        let solution = model.solve(SolveOptions::default());
        assert!(solution.converged);
        assert!((solution.value(x) - 1.0).abs() < 1e-3);
        assert!((solution.value(y) - 1.0).abs() < 1e-3);
    }

    #[test]
    fn test_inequality_constraint() {
        // minimize (x + 1)² subject to x ≥ 1.
        let mut model = Model::new();
        let x = model.var(-10.0, 10.0, 5.0);
        let xe = model.arena.var(x);
        let one = model.arena.constant(1.0);
        let shifted = model.arena.add(xe, one);
        let sq = model.arena.sq(shifted);
        model.minimize(sq).unwrap();
        let ge = model.arena.ge(xe, one);
        model.constrain(ge).unwrap();

        let solution = model.solve(SolveOptions::default());
        assert!(solution.converged);
        assert!((solution.value(x) - 1.0).abs() < 1e-3);
    }

    #[test]
    fn test_fixed_variables_do_not_move() {
        let mut model = Model::new();
        let x = model.var(-10.0, 10.0, 0.0);
        let y = model.var(-10.0, 10.0, 0.0);
        model.fix(y, 4.0);
        let xe = model.arena.var(x);
        let ye = model.arena.var(y);
        let diff = model.arena.sub(xe, ye);
        let sq = model.arena.sq(diff);
        model.minimize(sq).unwrap();

        let solution = model.solve(SolveOptions::default());
        assert_eq!(solution.value(y), 4.0);
        assert!((solution.value(x) - 4.0).abs() < 1e-4);
    }

    #[test]
    fn test_node_budget_is_enforced() {
        let mut model = Model::with_node_budget(2);
        let x = model.var(0.0, 1.0, 0.0);
        let xe = model.arena.var(x);
        let sq = model.arena.sq(xe);
        let sum = model.arena.add(sq, xe);
        assert!(model.minimize(sum).is_err());
    }

    #[test]
    fn test_exhausted_budget_reports_not_converged() {
        let mut model = Model::new();
        let x = model.var(-100.0, 100.0, 90.0);
        let xe = model.arena.var(x);
        let sq = model.arena.sq(xe);
        model.minimize(sq).unwrap();

        let solution = model.solve(SolveOptions { max_iter: 1, tolerance: 1e-12 });
        assert!(!solution.converged);
    }
}
