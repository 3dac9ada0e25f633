//! The nonlinear optimization backend of the dieplan floorplanner.
//!
//! Both the global floorplanner and the legalizer pose their problems as
//! smooth nonlinear programs: decision variables with box bounds, equality
//! and inequality constraints, and an objective to minimize. This crate
//! provides the two layers they build on:
//!
//! - [`ExprArena`], an arena-allocated algebraic expression DAG with
//!   constant folding, structural deduplication, cached subtree sizes and
//!   reverse-mode gradients.
//! - [`Model`], which owns an arena, the variables and the constraints, and
//!   solves the program with an augmented-Lagrangian method (projected
//!   gradient descent with backtracking in the inner loop).
//!
//! Running out of the iteration budget is a normal outcome: the solution
//! reports `converged = false` and carries the best variable values found,
//! and the caller decides whether to accept them.

mod expr;
mod model;
mod solve;

pub use self::expr::{CmpOp, ExprArena, ExprId, VarId};
pub use self::model::{Model, SolveOptions, Solution};
