//! The augmented-Lagrangian solver.
//!
//! The inner loop minimizes the augmented Lagrangian over the box bounds
//! with projected gradient descent and Armijo backtracking; the outer loop
//! updates the multipliers and grows the penalty when feasibility stalls.

use tracing::{debug, warn};

use crate::expr::{CmpOp, ExprId};
use crate::model::{Model, Solution, SolveOptions};

/// The Armijo sufficient-decrease factor.
const ARMIJO: f64 = 1e-4;

/// The penalty growth factor applied when infeasibility stalls.
const PENALTY_GROWTH: f64 = 4.0;

/// The largest admissible penalty.
const PENALTY_MAX: f64 = 1e8;

pub(crate) fn solve(model: &Model, options: SolveOptions) -> Solution {
    Solver::new(model, options).run()
}

struct Solver<'a> {
    model: &'a Model,
    options: SolveOptions,
    /// Current point, one entry per variable.
    x: Vec<f64>,
    /// Equality constraints and their multipliers.
    eqs: Vec<ExprId>,
    eq_lambda: Vec<f64>,
    /// Inequality constraints (residual ≥ 0 feasible) and multipliers.
    ineqs: Vec<ExprId>,
    in_lambda: Vec<f64>,
    /// Penalty weight.
    mu: f64,
    /// Scratch buffers for arena sweeps.
    values: Vec<f64>,
    adjoints: Vec<f64>,
    grad: Vec<f64>,
    seeds: Vec<(ExprId, f64)>,
    /// Total inner steps taken.
    iterations: usize,
}

impl<'a> Solver<'a> {
    fn new(model: &'a Model, options: SolveOptions) -> Self {
        let x = model.vars.iter().map(|v| v.init.clamp(v.lb, v.ub)).collect();
        let mut eqs = vec![];
        let mut ineqs = vec![];
        for &c in &model.constraints {
            match model.arena.cmp_op(c) {
                Some(CmpOp::Eq) => eqs.push(c),
                Some(_) => ineqs.push(c),
                None => unreachable!("constraints are comparison nodes"),
            }
        }
        let num_vars = model.vars.len();
        Self {
            model,
            options,
            x,
            eq_lambda: vec![0.0; eqs.len()],
            in_lambda: vec![0.0; ineqs.len()],
            eqs,
            ineqs,
            mu: 10.0,
            values: vec![],
            adjoints: vec![],
            grad: vec![0.0; num_vars],
            seeds: vec![],
            iterations: 0,
        }
    }

    fn run(mut self) -> Solution {
        let tol = self.options.tolerance;
        let mut converged = false;
        let mut infeasibility = f64::INFINITY;

        // The outer bound guards against a point that is stationary for
        // every multiplier setting yet never becomes feasible.
        let mut outer = 0;
        while self.iterations < self.options.max_iter && outer < 64 {
            outer += 1;
            let stationary = self.minimize_inner();

            self.refresh_values();
            let infeas = self.infeasibility();
            debug!(
                iterations = self.iterations,
                mu = self.mu,
                infeasibility = infeas,
                "augmented Lagrangian outer step"
            );

            if stationary && infeas <= tol {
                converged = true;
                break;
            }

            // First-order multiplier updates.
            for (i, &c) in self.eqs.iter().enumerate() {
                self.eq_lambda[i] += self.mu * self.values[c.index()];
            }
            for (i, &g) in self.ineqs.iter().enumerate() {
                self.in_lambda[i] =
                    (self.in_lambda[i] - self.mu * self.values[g.index()]).max(0.0);
            }

            // Grow the penalty when feasibility stalls.
            if infeas > 0.25 * infeasibility && self.mu < PENALTY_MAX {
                self.mu *= PENALTY_GROWTH;
            }
            infeasibility = infeas;
        }

        self.refresh_values();
        let objective = self
            .model
            .objective
            .map(|o| self.values[o.index()])
            .unwrap_or(0.0);

        if !converged {
            warn!(
                iterations = self.iterations,
                objective, "solver exhausted its iteration budget"
            );
        }

        Solution { values: self.x, converged, iterations: self.iterations, objective }
    }

    /// Minimize the augmented Lagrangian over the box with projected
    /// gradient descent. Returns whether a stationary point was reached.
    fn minimize_inner(&mut self) -> bool {
        let tol = self.options.tolerance;
        let mut step = 1.0;

        while self.iterations < self.options.max_iter {
            let merit = self.merit_and_gradient();

            // The projected gradient step measures stationarity over the
            // box: at a bound, only the inward component counts.
            let trial: Vec<f64> = self.projected(1.0);
            let pnorm: f64 = self
                .x
                .iter()
                .zip(&trial)
                .map(|(&a, &b)| (a - b) * (a - b))
                .sum::<f64>()
                .sqrt();
            if pnorm <= tol {
                return true;
            }

            // Backtracking line search along the projected path.
            let mut t = step;
            let mut accepted = false;
            while t > 1e-14 {
                let candidate = self.projected(t);
                let decrease: f64 = self
                    .grad
                    .iter()
                    .zip(self.x.iter().zip(&candidate))
                    .map(|(&g, (&a, &b))| g * (a - b))
                    .sum();
                if self.merit_at(&candidate) <= merit - ARMIJO * decrease {
                    self.x = candidate;
                    accepted = true;
                    break;
                }
                t /= 2.0;
            }

            self.iterations += 1;
            if !accepted {
                // No descent direction left at this scale.
                return true;
            }
            step = (t * 2.0).min(1.0);
        }

        false
    }

    /// The candidate point after a projected gradient step of length `t`.
    fn projected(&self, t: f64) -> Vec<f64> {
        self.model
            .vars
            .iter()
            .enumerate()
            .map(|(i, v)| {
                if v.fixed {
                    self.x[i]
                } else {
                    (self.x[i] - t * self.grad[i]).clamp(v.lb, v.ub)
                }
            })
            .collect()
    }

    fn refresh_values(&mut self) {
        self.model.arena.eval_all(&self.x, &mut self.values);
    }

    /// The largest constraint violation at the current values.
    fn infeasibility(&self) -> f64 {
        let eq = self
            .eqs
            .iter()
            .map(|c| self.values[c.index()].abs())
            .fold(0.0, f64::max);
        let ineq = self
            .ineqs
            .iter()
            .map(|g| (-self.values[g.index()]).max(0.0))
            .fold(0.0, f64::max);
        eq.max(ineq)
    }

    /// Evaluate the augmented Lagrangian and its gradient at `self.x`.
    fn merit_and_gradient(&mut self) -> f64 {
        self.refresh_values();
        let merit = self.merit_from_values();

        // One combined reverse sweep: seed every root with its weight in
        // the augmented Lagrangian.
        self.seeds.clear();
        if let Some(objective) = self.model.objective {
            self.seeds.push((objective, 1.0));
        }
        for (i, &c) in self.eqs.iter().enumerate() {
            let residual = self.values[c.index()];
            self.seeds.push((c, self.eq_lambda[i] + self.mu * residual));
        }
        for (i, &g) in self.ineqs.iter().enumerate() {
            let residual = self.values[g.index()];
            let active = (self.in_lambda[i] - self.mu * residual).max(0.0);
            if active > 0.0 {
                self.seeds.push((g, -active));
            }
        }
        self.model.arena.backprop(
            &self.values,
            &self.seeds,
            &mut self.adjoints,
            &mut self.grad,
        );

        merit
    }

    /// Evaluate the augmented Lagrangian at an arbitrary point.
    fn merit_at(&mut self, x: &[f64]) -> f64 {
        self.model.arena.eval_all(x, &mut self.values);
        self.merit_from_values()
    }

    fn merit_from_values(&self) -> f64 {
        let mut merit = self
            .model
            .objective
            .map(|o| self.values[o.index()])
            .unwrap_or(0.0);
        for (i, &c) in self.eqs.iter().enumerate() {
            let residual = self.values[c.index()];
            merit += self.eq_lambda[i] * residual + 0.5 * self.mu * residual * residual;
        }
        for (i, &g) in self.ineqs.iter().enumerate() {
            let residual = self.values[g.index()];
            let shifted = (self.in_lambda[i] - self.mu * residual).max(0.0);
            merit += (shifted * shifted - self.in_lambda[i] * self.in_lambda[i])
                / (2.0 * self.mu);
        }
        merit
    }
}
