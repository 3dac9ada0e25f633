//! The legalization model: per-rectangle position and shape variables,
//! attachment and ordering constraints, smooth-max separation between
//! modules, and the centroid dispersion objective.

use dieplan::diag::StrResult;
use dieplan::geom::{Point, Rect, Shape};
use dieplan::netlist::Netlist;
use dieplan_nlp::{ExprArena, ExprId, Model, SolveOptions, Solution, VarId};

use crate::skeleton::Skeleton;

/// The variables of one module: parallel x/y/w/h lists with the trunk at
/// index zero, plus the satellite indices per direction.
struct ModuleVars {
    xs: Vec<VarId>,
    ys: Vec<VarId>,
    ws: Vec<VarId>,
    hs: Vec<VarId>,
    north: Vec<usize>,
    south: Vec<usize>,
    east: Vec<usize>,
    west: Vec<usize>,
}

pub(crate) struct LegalModel {
    model: Model,
    modules: Vec<ModuleVars>,
}

impl LegalModel {
    /// Build the model for the given skeletons over the die.
    pub fn build(
        netlist: &Netlist,
        skeletons: &[Skeleton],
        die_shape: Shape,
        max_ratio: f64,
        node_budget: usize,
    ) -> StrResult<Self> {
        let (dw, dh) = (die_shape.w, die_shape.h);
        let min_side = 1e-2 * dw.min(dh);
        let tau = 0.01 * dw.min(dh) / skeletons.len().max(1) as f64;

        let mut model = Model::with_node_budget(node_budget);

        // Define all rectangle variables, with die containment and the
        // aspect bound; satellites also get their attachment constraints.
        let mut modules: Vec<ModuleVars> = vec![];
        for skeleton in skeletons {
            let mut mvars = ModuleVars {
                xs: vec![],
                ys: vec![],
                ws: vec![],
                hs: vec![],
                north: vec![],
                south: vec![],
                east: vec![],
                west: vec![],
            };

            define_rect(&mut model, &mut mvars, &skeleton.trunk, dw, dh, min_side, max_ratio)?;

            for (rects, dir) in [
                (&skeleton.north, Dir::North),
                (&skeleton.south, Dir::South),
                (&skeleton.east, Dir::East),
                (&skeleton.west, Dir::West),
            ] {
                for rect in rects {
                    let i =
                        define_rect(&mut model, &mut mvars, rect, dw, dh, min_side, max_ratio)?;
                    match dir {
                        Dir::North => mvars.north.push(i),
                        Dir::South => mvars.south.push(i),
                        Dir::East => mvars.east.push(i),
                        Dir::West => mvars.west.push(i),
                    }
                    attach(&mut model, &mvars, i, dir)?;
                }
            }

            modules.push(mvars);
        }

        // Sufficient area per module.
        for (mvars, module) in modules.iter().zip(netlist.modules()) {
            let terms: Vec<ExprId> = (0..mvars.xs.len())
                .map(|i| {
                    let w = model.arena.var(mvars.ws[i]);
                    let h = model.arena.var(mvars.hs[i]);
                    model.arena.mul(w, h)
                })
                .collect();
            let area = model.arena.sum(terms);
            let required = model.arena.constant(module.total_area());
            let ge = model.arena.ge(area, required);
            model.constrain(ge)?;
        }

        // Intra-module ordering: within a direction, satellites sorted by
        // the initial value of their free coordinate must stay disjoint
        // along that coordinate. The order is fixed at build time.
        for mvars in &modules {
            for (indices, horizontal) in [
                (&mvars.north, true),
                (&mvars.south, true),
                (&mvars.east, false),
                (&mvars.west, false),
            ] {
                let mut sorted = indices.clone();
                let key = |i: usize| {
                    if horizontal { model.init(mvars.xs[i]) } else { model.init(mvars.ys[i]) }
                };
                sorted.sort_by(|&a, &b| key(a).total_cmp(&key(b)));
                for pair in sorted.windows(2) {
                    let (lo, hi) = (pair[0], pair[1]);
                    let (c_lo, s_lo, c_hi, s_hi) = if horizontal {
                        (mvars.xs[lo], mvars.ws[lo], mvars.xs[hi], mvars.ws[hi])
                    } else {
                        (mvars.ys[lo], mvars.hs[lo], mvars.ys[hi], mvars.hs[hi])
                    };
                    let lhs = edge_expr(&mut model.arena, c_lo, s_lo, 0.5);
                    let rhs = edge_expr(&mut model.arena, c_hi, s_hi, -0.5);
                    let le = model.arena.le(lhs, rhs);
                    model.constrain(le)?;
                }
            }
        }

        // Inter-module separation: every rectangle pair from different
        // modules must be separated horizontally or vertically; the smooth
        // max keeps the disjunction differentiable.
        for m in 0..modules.len() {
            for n in m + 1..modules.len() {
                for i in 0..modules[m].xs.len() {
                    for j in 0..modules[n].xs.len() {
                        let t1 = separation(
                            &mut model.arena,
                            modules[m].xs[i],
                            modules[m].ws[i],
                            modules[n].xs[j],
                            modules[n].ws[j],
                        );
                        let t2 = separation(
                            &mut model.arena,
                            modules[m].ys[i],
                            modules[m].hs[i],
                            modules[n].ys[j],
                            modules[n].hs[j],
                        );
                        let apart = smax(&mut model.arena, t1, t2, tau);
                        let zero = model.arena.constant(0.0);
                        let ge = model.arena.ge(apart, zero);
                        model.constrain(ge)?;
                    }
                }
            }
        }

        // Fixing policy: a fixed module pins its trunk position, every
        // shape, and the satellite offsets relative to the trunk; a hard
        // module pins only the shapes.
        for ((mvars, module), skeleton) in
            modules.iter().zip(netlist.modules()).zip(skeletons)
        {
            if !module.is_hard() {
                continue;
            }
            let inits: Vec<Rect> = skeleton.rects().cloned().collect();
            for (i, rect) in inits.iter().enumerate() {
                model.fix(mvars.ws[i], rect.shape.w);
                model.fix(mvars.hs[i], rect.shape.h);
            }
            if module.is_fixed() {
                model.fix(mvars.xs[0], inits[0].center.x);
                model.fix(mvars.ys[0], inits[0].center.y);
                for (i, rect) in inits.iter().enumerate().skip(1) {
                    let offset = rect.center - inits[0].center;
                    pin_offset(&mut model, mvars.xs[i], mvars.xs[0], offset.x)?;
                    pin_offset(&mut model, mvars.ys[i], mvars.ys[0], offset.y)?;
                }
            }
        }

        // Objective: for every hyperedge, the spread of each member's
        // rectangles around the module centroid plus the distance of the
        // module centroid to the edge centroid, weighted by the squared
        // edge weight. The τ term keeps pressure on the smooth max.
        for edge in netlist.edges() {
            let k = edge.modules.len() as f64;
            let mut centroids = vec![];
            for &m in &edge.modules {
                centroids.push(centroid(&mut model, &modules[m]));
            }
            let inv_k = model.arena.constant(1.0 / k);
            let ex_sum = model.arena.sum(centroids.iter().map(|&(x, _)| x));
            let ey_sum = model.arena.sum(centroids.iter().map(|&(_, y)| y));
            let ex = model.arena.mul(ex_sum, inv_k);
            let ey = model.arena.mul(ey_sum, inv_k);

            let weight_sq = model.arena.constant(edge.weight * edge.weight);
            for (&m, &(mx, my)) in edge.modules.iter().zip(&centroids) {
                let mvars = &modules[m];
                let mut spread_terms = vec![];
                for i in 0..mvars.xs.len() {
                    let x = model.arena.var(mvars.xs[i]);
                    let y = model.arena.var(mvars.ys[i]);
                    let dx = model.arena.sub(x, mx);
                    let dy = model.arena.sub(y, my);
                    let dx2 = model.arena.sq(dx);
                    let dy2 = model.arena.sq(dy);
                    spread_terms.push(model.arena.add(dx2, dy2));
                }
                let dx = model.arena.sub(mx, ex);
                let dy = model.arena.sub(my, ey);
                let dx2 = model.arena.sq(dx);
                let dy2 = model.arena.sq(dy);
                spread_terms.push(model.arena.add(dx2, dy2));

                let spread = model.arena.sum(spread_terms);
                let term = model.arena.mul(weight_sq, spread);
                model.minimize(term)?;
            }
        }
        let pressure = model.arena.constant(tau);
        model.minimize(pressure)?;

        Ok(Self { model, modules })
    }

    /// Solve the model.
    pub fn solve(&self, options: SolveOptions) -> Solution {
        self.model.solve(options)
    }

    /// Materialize the rectangles of one module from the solution.
    pub fn rects_of(&self, solution: &Solution, m: usize) -> Vec<Rect> {
        let mvars = &self.modules[m];
        (0..mvars.xs.len())
            .map(|i| {
                Rect::new(
                    Point::new(
                        solution.value(mvars.xs[i]),
                        solution.value(mvars.ys[i]),
                    ),
                    Shape::new(
                        solution.value(mvars.ws[i]),
                        solution.value(mvars.hs[i]),
                    ),
                )
            })
            .collect()
    }
}

#[derive(Copy, Clone)]
enum Dir {
    North,
    South,
    East,
    West,
}

/// Add the variables of one rectangle with die containment and the aspect
/// bound. Returns the rectangle's index within the module.
fn define_rect(
    model: &mut Model,
    mvars: &mut ModuleVars,
    rect: &Rect,
    dw: f64,
    dh: f64,
    min_side: f64,
    max_ratio: f64,
) -> StrResult<usize> {
    let i = mvars.xs.len();
    let x = model.var(0.0, dw, rect.center.x);
    let y = model.var(0.0, dh, rect.center.y);
    let w = model.var(min_side, dw, rect.shape.w);
    let h = model.var(min_side, dh, rect.shape.h);
    mvars.xs.push(x);
    mvars.ys.push(y);
    mvars.ws.push(w);
    mvars.hs.push(h);

    // The rectangle must stay inside the die.
    let arena = &mut model.arena;
    let zero = arena.constant(0.0);
    let dwc = arena.constant(dw);
    let dhc = arena.constant(dh);
    let left = edge_expr(arena, x, w, -0.5);
    let right = edge_expr(arena, x, w, 0.5);
    let bottom = edge_expr(arena, y, h, -0.5);
    let top = edge_expr(arena, y, h, 0.5);
    let c1 = arena.ge(left, zero);
    let c2 = arena.le(right, dwc);
    let c3 = arena.ge(bottom, zero);
    let c4 = arena.le(top, dhc);
    for c in [c1, c2, c3, c4] {
        model.constrain(c)?;
    }

    // The aspect ratio cannot exceed the maximum: thin is monotone in
    // squareness, so thin(w, h) ≥ thin(max_ratio, 1) bounds it.
    let arena = &mut model.arena;
    let wv = arena.var(w);
    let hv = arena.var(h);
    let lhs = thin(arena, wv, hv);
    let rhs = arena.constant(max_ratio / (max_ratio * max_ratio + 1.0));
    let aspect = arena.ge(lhs, rhs);
    model.constrain(aspect)?;

    Ok(i)
}

/// The expression `var(center) + sign · var(size)`, e.g. a rectangle edge
/// coordinate for `sign = ±0.5`.
fn edge_expr(arena: &mut ExprArena, center: VarId, size: VarId, sign: f64) -> ExprId {
    let c = arena.var(center);
    let s = arena.var(size);
    let half = arena.constant(sign);
    let offset = arena.mul(half, s);
    arena.add(c, offset)
}

/// Attach satellite `i` to the trunk edge named by `dir`: its position is
/// pinned along the attachment axis and ranges over the trunk's extent on
/// the other.
fn attach(model: &mut Model, mvars: &ModuleVars, i: usize, dir: Dir) -> StrResult<()> {
    let arena = &mut model.arena;
    let (trunk_c, trunk_s, sat_c, sat_s, sign) = match dir {
        Dir::North => (mvars.ys[0], mvars.hs[0], mvars.ys[i], mvars.hs[i], 0.5),
        Dir::South => (mvars.ys[0], mvars.hs[0], mvars.ys[i], mvars.hs[i], -0.5),
        Dir::East => (mvars.xs[0], mvars.ws[0], mvars.xs[i], mvars.ws[i], 0.5),
        Dir::West => (mvars.xs[0], mvars.ws[0], mvars.xs[i], mvars.ws[i], -0.5),
    };

    // Pinned to the trunk edge along the attachment axis.
    let trunk_edge = edge_expr(arena, trunk_c, trunk_s, sign);
    let sat_half = edge_expr(arena, sat_c, sat_s, -sign);
    let eq = arena.eq(sat_half, trunk_edge);
    model.constrain(eq)?;

    // Within the trunk's orthogonal extent.
    let arena = &mut model.arena;
    let (free_t, size_t, free_s, size_s) = match dir {
        Dir::North | Dir::South => {
            (mvars.xs[0], mvars.ws[0], mvars.xs[i], mvars.ws[i])
        }
        Dir::East | Dir::West => (mvars.ys[0], mvars.hs[0], mvars.ys[i], mvars.hs[i]),
    };
    let lo_t = edge_expr(arena, free_t, size_t, -0.5);
    let lo_s = edge_expr(arena, free_s, size_s, -0.5);
    let hi_t = edge_expr(arena, free_t, size_t, 0.5);
    let hi_s = edge_expr(arena, free_s, size_s, 0.5);
    let c1 = arena.ge(lo_s, lo_t);
    let c2 = arena.le(hi_s, hi_t);
    model.constrain(c1)?;
    model.constrain(c2)?;
    Ok(())
}

/// The constraint `x_sat == x_trunk + offset`.
fn pin_offset(
    model: &mut Model,
    sat: VarId,
    trunk: VarId,
    offset: f64,
) -> StrResult<()> {
    let arena = &mut model.arena;
    let s = arena.var(sat);
    let t = arena.var(trunk);
    let o = arena.constant(offset);
    let shifted = arena.add(t, o);
    let eq = arena.eq(s, shifted);
    model.constrain(eq)
}

/// The separation term along one axis: `(c_i − c_j)² − ¼(s_i + s_j)²`,
/// positive iff the two intervals are disjoint.
fn separation(
    arena: &mut ExprArena,
    ci: VarId,
    si: VarId,
    cj: VarId,
    sj: VarId,
) -> ExprId {
    let ci = arena.var(ci);
    let cj = arena.var(cj);
    let si = arena.var(si);
    let sj = arena.var(sj);
    let dc = arena.sub(ci, cj);
    let dc2 = arena.sq(dc);
    let ssum = arena.add(si, sj);
    let ssum2 = arena.sq(ssum);
    let quarter = arena.constant(0.25);
    let penalty = arena.mul(quarter, ssum2);
    arena.sub(dc2, penalty)
}

/// The smooth maximum `½(a + b + √((a − b)² + 4τ²))`.
fn smax(arena: &mut ExprArena, a: ExprId, b: ExprId, tau: f64) -> ExprId {
    let diff = arena.sub(a, b);
    let diff2 = arena.sq(diff);
    let shift = arena.constant(4.0 * tau * tau);
    let under = arena.add(diff2, shift);
    let root = arena.sqrt(under);
    let sum = arena.add(a, b);
    let total = arena.add(sum, root);
    let half = arena.constant(0.5);
    arena.mul(half, total)
}

/// The aspect proxy `w·h / (w² + h²)`, maximal at ¼ for squares.
fn thin(arena: &mut ExprArena, w: ExprId, h: ExprId) -> ExprId {
    let wh = arena.mul(w, h);
    let w2 = arena.sq(w);
    let h2 = arena.sq(h);
    let denom = arena.add(w2, h2);
    arena.div(wh, denom)
}

/// The area-weighted centroid of a module as a pair of expressions.
fn centroid(model: &mut Model, mvars: &ModuleVars) -> (ExprId, ExprId) {
    let arena = &mut model.arena;
    let mut area_terms = vec![];
    let mut x_terms = vec![];
    let mut y_terms = vec![];
    for i in 0..mvars.xs.len() {
        let x = arena.var(mvars.xs[i]);
        let y = arena.var(mvars.ys[i]);
        let w = arena.var(mvars.ws[i]);
        let h = arena.var(mvars.hs[i]);
        let wh = arena.mul(w, h);
        area_terms.push(wh);
        x_terms.push(arena.mul(x, wh));
        y_terms.push(arena.mul(y, wh));
    }
    let area = arena.sum(area_terms);
    let xsum = arena.sum(x_terms);
    let ysum = arena.sum(y_terms);
    (arena.div(xsum, area), arena.div(ysum, area))
}
