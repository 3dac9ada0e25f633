//! The global floorplanner.
//!
//! Starting from an initial fractional allocation of module area to die
//! cells, the floorplanner alternates a nonlinear optimization pass (which
//! jointly minimizes wire length and dispersion while moving module
//! centroids and occupancies) with a refinement pass (which subdivides the
//! cells whose occupancies are still fractional). The loop stops when no
//! cell needs refinement or the iteration budget is exhausted.

mod model;

use dieplan::alloc::Allocation;
use dieplan::diag::{bail, StrResult};
use dieplan::die::Die;
use dieplan::geom::{split_until, Point, Rect};
use dieplan::netlist::Netlist;
use dieplan_nlp::SolveOptions;

/// Parameters of the global floorplanner.
#[derive(Debug, Copy, Clone)]
pub struct Options {
    /// The tradeoff between wire length and dispersion: one is pure wire
    /// length, zero pure dispersion.
    pub alpha: f64,
    /// Occupancies strictly inside `(1 - threshold, threshold)` count as
    /// fractional and trigger refinement.
    pub threshold: f64,
    /// The maximum number of optimization passes, or `None` to run until
    /// no refinement is needed.
    pub max_iter: Option<usize>,
    /// Tile the die into a regular grid of this many rows and columns.
    /// Only legal on a die without regions, blockages or fixed
    /// rectangles; by default, the die's ground decomposition is used
    /// instead.
    pub grid: Option<(usize, usize)>,
    /// The maximum aspect ratio of the initial cells derived from the
    /// ground decomposition.
    pub max_aspect: f64,
    /// The minimum number of initial cells derived from the ground
    /// decomposition.
    pub num_rectangles: usize,
    /// The iteration budget and tolerance of each solve.
    pub solver: SolveOptions,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            alpha: 0.5,
            threshold: 0.95,
            max_iter: None,
            grid: None,
            max_aspect: 2.0,
            num_rectangles: 8,
            solver: SolveOptions::default(),
        }
    }
}

/// Compute a refined allocation for the netlist on the die, updating the
/// module centers in place.
pub fn glbfloor(
    netlist: &mut Netlist,
    die: &Die,
    options: &Options,
) -> StrResult<Allocation> {
    if !(0.0..=1.0).contains(&options.alpha) {
        bail!("alpha must lie between 0 and 1");
    }
    if !(0.0..=1.0).contains(&options.threshold) {
        bail!("threshold must lie between 0 and 1");
    }
    if options.max_iter == Some(0) {
        bail!("the maximum number of iterations must be positive");
    }

    let fallback = die.bounding_rect().center;
    netlist.create_squares(fallback);

    let cells = initial_cells(die, options)?;
    let mut allocation = Allocation::initial(cells, netlist, true)?;
    let mut dispersions = calculate_dispersions(netlist, &allocation);

    let mut pass = 0;
    loop {
        let result = model::optimize_pass(
            netlist,
            &allocation,
            &dispersions,
            options.alpha,
            options.threshold,
            options.solver,
        )?;

        for (m, &center) in result.centers.iter().enumerate() {
            if !netlist.module(m).is_fixed() {
                netlist.module_mut(m).set_center(center);
            }
        }
        allocation = result.allocation;
        dispersions = result.dispersions;
        pass += 1;

        tracing::info!(
            pass,
            cells = allocation.num_cells(),
            converged = result.converged,
            "global floorplanning pass finished"
        );

        if options.max_iter.is_some_and(|max| pass >= max) {
            break;
        }
        if !allocation.must_be_refined(options.threshold) {
            break;
        }
        allocation = allocation.refine(options.threshold);
    }

    Ok(allocation)
}

/// The initial cell rectangles: a regular grid when requested (and the die
/// is free of obstacles), otherwise the ground decomposition postprocessed
/// to bounded aspect ratios and a minimum cell count.
fn initial_cells(die: &Die, options: &Options) -> StrResult<Vec<Rect>> {
    if let Some((rows, cols)) = options.grid {
        if rows == 0 || cols == 0 {
            bail!("the initial grid must have positive dimensions");
        }
        if !die.regions().is_empty()
            || !die.blockages().is_empty()
            || !die.fixed().is_empty()
        {
            bail!(
                "a regular grid cannot tile a die with regions, blockages \
                 or fixed rectangles; omit the grid to use the ground \
                 decomposition"
            );
        }
        Ok(die.bounding_rect().grid(rows, cols))
    } else {
        Ok(split_until(
            die.ground_regions().to_vec(),
            options.max_aspect,
            options.num_rectangles,
        ))
    }
}

/// The dispersion of every module around its center under the given
/// allocation. Fixed modules disperse nothing.
fn calculate_dispersions(netlist: &Netlist, allocation: &Allocation) -> Vec<(f64, f64)> {
    netlist
        .modules()
        .map(|module| {
            let (center, movable) = match (module.center(), module.is_fixed()) {
                (Some(center), false) => (center, true),
                _ => (Point::zero(), false),
            };
            if !movable {
                return (0.0, 0.0);
            }
            let mut dx = 0.0;
            let mut dy = 0.0;
            for cell in allocation.cells() {
                let mass = cell.rect().area() * cell.occupancy(module.name());
                dx += mass * (center.x - cell.rect().center.x).powi(2);
                dy += mass * (center.y - cell.rect().center.y).powi(2);
            }
            (dx, dy)
        })
        .collect()
}
