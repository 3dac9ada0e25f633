//! Construction and readout of one optimization pass.

use dieplan::alloc::{Allocation, Cell};
use dieplan::diag::{bail, StrResult};
use dieplan::geom::Point;
use dieplan::netlist::Netlist;
use dieplan_nlp::{ExprId, Model, SolveOptions, VarId};

/// The outcome of one optimization pass.
pub(crate) struct PassResult {
    /// The allocation with the optimized occupancies.
    pub allocation: Allocation,
    /// The per-module dispersions at the optimum.
    pub dispersions: Vec<(f64, f64)>,
    /// The per-module centroids at the optimum (fixed modules keep their
    /// input centers).
    pub centers: Vec<Point>,
    /// Whether the solver converged.
    pub converged: bool,
}

/// The variables of one movable module.
struct ModuleVars {
    x: VarId,
    y: VarId,
    dx: VarId,
    dy: VarId,
    occupancy: Vec<VarId>,
}

/// Build, solve and read out the nonlinear program of one pass.
pub(crate) fn optimize_pass(
    netlist: &Netlist,
    allocation: &Allocation,
    dispersions: &[(f64, f64)],
    alpha: f64,
    threshold: f64,
    solver: SolveOptions,
) -> StrResult<PassResult> {
    let cells = allocation.cells();
    let bbox = allocation.bounding_box();
    let (ll, ur) = bbox.bounding_box();
    let max_depth = allocation.max_depth();
    let epsilon = 1e-9 * bbox.shape.w.min(bbox.shape.h);
    let neighbours: Vec<Vec<usize>> =
        (0..cells.len()).map(|c| allocation.neighbours(c, epsilon)).collect();

    let mut model = Model::new();

    // Variables: centroid, dispersion and occupancies per movable module.
    let mut vars: Vec<Option<ModuleVars>> = vec![];
    for (m, module) in netlist.modules().enumerate() {
        if module.is_fixed() {
            vars.push(None);
            continue;
        }
        let Some(center) = module.center() else {
            bail!("module {} has no center; run a placement pass first", module.name());
        };
        let (dx0, dy0) = dispersions[m];
        let column = allocation.module_column(module.name());
        vars.push(Some(ModuleVars {
            x: model.var(ll.x, ur.x, center.x),
            y: model.var(ll.y, ur.y, center.y),
            dx: model.var(0.0, f64::INFINITY, dx0),
            dy: model.var(0.0, f64::INFINITY, dy0),
            occupancy: column
                .iter()
                .map(|&ratio| model.var(0.0, 1.0, ratio))
                .collect(),
        }));
    }

    // Freezing: occupancies of cells below the maximum refinement depth
    // are pinned, and so are occupancies inside a saturated neighbourhood
    // (the cell and all its edge-neighbours strictly above `threshold`, or
    // all strictly below `1 - threshold`). A module with every occupancy
    // pinned has its centroid and dispersion pinned too.
    for (m, module) in netlist.modules().enumerate() {
        let Some(mvars) = &vars[m] else { continue };
        let column = allocation.module_column(module.name());
        let mut all_frozen = true;
        for (c, cell) in cells.iter().enumerate() {
            let ratio = column[c];
            let saturated = |bound: f64, above: bool| {
                let hit = |v: f64| if above { v > bound } else { v < bound };
                hit(ratio) && neighbours[c].iter().all(|&n| hit(column[n]))
            };
            let frozen = cell.depth() != max_depth
                || saturated(threshold, true)
                || saturated(1.0 - threshold, false);
            if frozen {
                model.fix(mvars.occupancy[c], ratio);
            } else {
                all_frozen = false;
            }
        }
        if all_frozen {
            let center = module.center().expect("movable module has a center");
            let (dx0, dy0) = dispersions[m];
            model.fix(mvars.x, center.x);
            model.fix(mvars.y, center.y);
            model.fix(mvars.dx, dx0);
            model.fix(mvars.dy, dy0);
        }
    }

    // Cells cannot be over-occupied.
    for c in 0..cells.len() {
        let terms: Vec<ExprId> = vars
            .iter()
            .flatten()
            .map(|mvars| model.arena.var(mvars.occupancy[c]))
            .collect();
        let sum = model.arena.sum(terms);
        let one = model.arena.constant(1.0);
        let le = model.arena.le(sum, one);
        model.constrain(le)?;
    }

    // Sufficient area, centroid definition and dispersion definition per
    // movable module.
    for (m, module) in netlist.modules().enumerate() {
        let Some(mvars) = &vars[m] else { continue };
        let area = module.ground_area();

        let mut area_terms = vec![];
        let mut cx_terms = vec![];
        let mut cy_terms = vec![];
        let mut dx_terms = vec![];
        let mut dy_terms = vec![];
        for (c, cell) in cells.iter().enumerate() {
            let a = model.arena.var(mvars.occupancy[c]);
            let cell_area = model.arena.constant(cell.rect().area());
            let mass = model.arena.mul(cell_area, a);
            area_terms.push(mass);

            let cx = model.arena.constant(cell.rect().center.x);
            let cy = model.arena.constant(cell.rect().center.y);
            cx_terms.push(model.arena.mul(mass, cx));
            cy_terms.push(model.arena.mul(mass, cy));

            let x = model.arena.var(mvars.x);
            let y = model.arena.var(mvars.y);
            let xdiff = model.arena.sub(x, cx);
            let ydiff = model.arena.sub(y, cy);
            let xdiff2 = model.arena.sq(xdiff);
            let ydiff2 = model.arena.sq(ydiff);
            dx_terms.push(model.arena.mul(mass, xdiff2));
            dy_terms.push(model.arena.mul(mass, ydiff2));
        }

        let total = model.arena.sum(area_terms);
        let required = model.arena.constant(area);
        let ge = model.arena.ge(total, required);
        model.constrain(ge)?;

        let x = model.arena.var(mvars.x);
        let y = model.arena.var(mvars.y);
        let cx_sum = model.arena.sum(cx_terms);
        let cy_sum = model.arena.sum(cy_terms);
        let scaled_x = model.arena.mul(required, x);
        let scaled_y = model.arena.mul(required, y);
        let eq_x = model.arena.eq(cx_sum, scaled_x);
        let eq_y = model.arena.eq(cy_sum, scaled_y);
        model.constrain(eq_x)?;
        model.constrain(eq_y)?;

        let dx = model.arena.var(mvars.dx);
        let dy = model.arena.var(mvars.dy);
        let dx_sum = model.arena.sum(dx_terms);
        let dy_sum = model.arena.sum(dy_terms);
        let eq_dx = model.arena.eq(dx_sum, dx);
        let eq_dy = model.arena.eq(dy_sum, dy);
        model.constrain(eq_dx)?;
        model.constrain(eq_dy)?;
    }

    // The centroid of a module as an expression: a variable for movable
    // modules, the (constant) input center for fixed ones.
    let centroid = |model: &mut Model, m: usize| -> StrResult<(ExprId, ExprId)> {
        match &vars[m] {
            Some(mvars) => Ok((model.arena.var(mvars.x), model.arena.var(mvars.y))),
            None => {
                let Some(center) = netlist.module(m).center() else {
                    bail!("fixed module {} has no center", netlist.module(m).name());
                };
                Ok((
                    model.arena.constant(center.x),
                    model.arena.constant(center.y),
                ))
            }
        }
    };

    // Wire length: the two-pin square distance, or the star model over the
    // edge's centroid for larger edges.
    let alpha_c = model.arena.constant(alpha);
    for edge in netlist.edges() {
        let weight = model.arena.constant(edge.weight);
        let scale = model.arena.mul(alpha_c, weight);
        if let [m0, m1] = edge.modules[..] {
            let (x0, y0) = centroid(&mut model, m0)?;
            let (x1, y1) = centroid(&mut model, m1)?;
            let dx = model.arena.sub(x0, x1);
            let dy = model.arena.sub(y0, y1);
            let dx2 = model.arena.sq(dx);
            let dy2 = model.arena.sq(dy);
            let dist = model.arena.add(dx2, dy2);
            let half = model.arena.constant(0.5);
            let halved = model.arena.mul(dist, half);
            let term = model.arena.mul(scale, halved);
            model.minimize(term)?;
        } else {
            // Auxiliary variables for the edge centroid.
            let k = edge.modules.len() as f64;
            let mut init = Point::zero();
            let mut xs = vec![];
            let mut ys = vec![];
            for &m in &edge.modules {
                let (x, y) = centroid(&mut model, m)?;
                xs.push(x);
                ys.push(y);
                init += netlist.module(m).center().unwrap_or(bbox.center) / k;
            }
            let ex = model.var(ll.x, ur.x, init.x);
            let ey = model.var(ll.y, ur.y, init.y);
            let inv_k = model.arena.constant(1.0 / k);
            for (sum_terms, aux) in [(xs.clone(), ex), (ys.clone(), ey)] {
                let sum = model.arena.sum(sum_terms);
                let mean = model.arena.mul(sum, inv_k);
                let aux = model.arena.var(aux);
                let eq = model.arena.eq(mean, aux);
                model.constrain(eq)?;
            }
            let exv = model.arena.var(ex);
            let eyv = model.arena.var(ey);
            for (&x, &y) in xs.iter().zip(&ys) {
                let dx = model.arena.sub(exv, x);
                let dy = model.arena.sub(eyv, y);
                let dx2 = model.arena.sq(dx);
                let dy2 = model.arena.sq(dy);
                let dist = model.arena.add(dx2, dy2);
                let term = model.arena.mul(scale, dist);
                model.minimize(term)?;
            }
        }
    }

    // Total dispersion.
    let beta = model.arena.constant(1.0 - alpha);
    let spread_terms: Vec<ExprId> = vars
        .iter()
        .flatten()
        .map(|mvars| {
            let dx = model.arena.var(mvars.dx);
            let dy = model.arena.var(mvars.dy);
            model.arena.add(dx, dy)
        })
        .collect();
    let spread = model.arena.sum(spread_terms);
    let weighted = model.arena.mul(beta, spread);
    model.minimize(weighted)?;

    // Solve and read out.
    let solution = model.solve(solver);

    let new_cells: Vec<Cell> = cells
        .iter()
        .enumerate()
        .map(|(c, cell)| {
            let mut out = Cell::new(cell.rect().clone(), cell.depth());
            for (m, module) in netlist.modules().enumerate() {
                if let Some(mvars) = &vars[m] {
                    let ratio = solution.value(mvars.occupancy[c]).clamp(0.0, 1.0);
                    out.set_occupancy(module.name().clone(), ratio);
                }
            }
            out
        })
        .collect();

    let mut centers = vec![];
    let mut new_dispersions = vec![];
    for (m, module) in netlist.modules().enumerate() {
        match &vars[m] {
            Some(mvars) => {
                centers.push(Point::new(
                    solution.value(mvars.x),
                    solution.value(mvars.y),
                ));
                new_dispersions
                    .push((solution.value(mvars.dx), solution.value(mvars.dy)));
            }
            None => {
                centers.push(module.center().unwrap_or(bbox.center));
                new_dispersions.push((0.0, 0.0));
            }
        }
    }

    Ok(PassResult {
        allocation: Allocation::new(new_cells),
        dispersions: new_dispersions,
        centers,
        converged: solution.converged,
    })
}
