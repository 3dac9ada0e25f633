//! The legalizer.
//!
//! Given a netlist whose modules carry skeletons (a trunk rectangle plus
//! cardinal satellites) and a die, the legalizer builds a nonlinear model
//! whose variables are the position and shape of every rectangle, and whose
//! constraints enforce die containment, bounded aspect ratios, sufficient
//! module area, trunk attachment, intra-module ordering and pairwise
//! module separation. Solving it yields a legal set of non-overlapping
//! rectangles, which are written back into a new netlist.

mod model;
mod skeleton;

use dieplan::diag::{bail, StrResult};
use dieplan::die::Die;
use dieplan::geom::Point;
use dieplan::netlist::Netlist;
use dieplan_nlp::SolveOptions;

pub use self::skeleton::{Cardinal, Skeleton};

/// Parameters of the legalizer.
#[derive(Debug, Copy, Clone)]
pub struct Options {
    /// The maximum allowable aspect ratio for any rectangle.
    pub max_ratio: f64,
    /// The node budget of the expression DAG; a model growing past it is
    /// rejected instead of consuming unbounded memory.
    pub node_budget: usize,
    /// The iteration budget and tolerance of the solve.
    pub solver: SolveOptions,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            max_ratio: 2.0,
            node_budget: 1_000_000,
            solver: SolveOptions::default(),
        }
    }
}

/// Legalize the netlist on the die.
///
/// Returns a new netlist in which every module's rectangles are taken from
/// the solved model. Modules keep their fixed/hard/soft annotation, which
/// is also the degree of pinning that was enforced during the solve. A
/// non-converged solve is reported as a warning and still yields the best
/// placement found.
pub fn legalfloor(netlist: &Netlist, die: &Die, options: &Options) -> StrResult<Netlist> {
    if options.max_ratio <= 1.0 {
        bail!("the maximum aspect ratio must exceed 1");
    }

    let fallback = die.bounding_rect().center;
    let epsilon = 1e-6 * die.width().min(die.height());
    let skeletons: Vec<Skeleton> = netlist
        .modules()
        .map(|module| Skeleton::from_module(module, fallback, epsilon))
        .collect::<StrResult<_>>()?;

    let legal = model::LegalModel::build(
        netlist,
        &skeletons,
        die.shape(),
        options.max_ratio,
        options.node_budget,
    )?;

    let solution = legal.solve(options.solver);
    if !solution.converged {
        tracing::warn!(
            iterations = solution.iterations,
            objective = solution.objective,
            "legalization did not converge; returning the best placement found"
        );
    }

    let mut out = netlist.clone();
    for m in 0..netlist.num_modules() {
        let rects = legal.rects_of(&solution, m);
        let area: f64 = rects.iter().map(|r| r.area()).sum();
        let centroid = rects
            .iter()
            .fold(Point::zero(), |sum, r| sum + r.center * r.area())
            / area;
        let module = out.module_mut(m);
        module.set_rectangles(rects);
        module.set_center(centroid);
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use dieplan::geom::{Point, Rect, Shape};
    use dieplan::netlist::Module;

    /// A fixed 4x3 module at (2, 2) and a soft module of area 12 on a 7x7
    /// die, connected by one edge.
    fn fixture() -> (Netlist, Die) {
        let mut fixed = Module::new("rom").unwrap();
        fixed.set_fixed();
        fixed
            .add_rectangle(Rect::new(Point::new(2.0, 2.0), Shape::new(4.0, 3.0)))
            .unwrap();

        let mut soft = Module::soft("cpu", 12.0).unwrap();
        soft.set_center(Point::new(5.0, 5.0));

        let netlist = Netlist::new(
            vec![fixed, soft],
            vec![(vec!["rom".into(), "cpu".into()], 1.0)],
        )
        .unwrap();
        let die = Die::new(Shape::splat(7.0), vec![], vec![]).unwrap();
        (netlist, die)
    }

    #[test]
    fn test_fixed_module_stays_put() {
        let (netlist, die) = fixture();
        let out = legalfloor(&netlist, &die, &Options::default()).unwrap();
        let rom = out.by_name("rom").unwrap();
        assert_eq!(rom.rectangles().len(), 1);
        let rect = &rom.rectangles()[0];
        assert!((rect.center.x - 2.0).abs() < 1e-6);
        assert!((rect.center.y - 2.0).abs() < 1e-6);
        assert!((rect.shape.w - 4.0).abs() < 1e-6);
        assert!((rect.shape.h - 3.0).abs() < 1e-6);
        assert!(rom.is_fixed());
    }

    #[test]
    fn test_soft_module_is_placed_legally() {
        let (netlist, die) = fixture();
        let options = Options {
            solver: dieplan_nlp::SolveOptions { max_iter: 6000, tolerance: 1e-6 },
            ..Options::default()
        };
        let out = legalfloor(&netlist, &die, &options).unwrap();

        let cpu = out.by_name("cpu").unwrap();
        let rom = out.by_name("rom").unwrap();
        assert_eq!(cpu.rectangles().len(), 1);
        let rect = &cpu.rectangles()[0];

        // Inside the die, with a little numerical slack.
        let (ll, ur) = rect.bounding_box();
        assert!(ll.x > -0.05 && ll.y > -0.05 && ur.x < 7.05 && ur.y < 7.05);

        // Sufficient area and bounded aspect.
        assert!(rect.area() > 11.5, "area {}", rect.area());
        assert!(rect.aspect_ratio() < 2.1, "aspect {}", rect.aspect_ratio());

        // No overlap with the fixed module (up to solver tolerance).
        let overlap = rect.area_overlap(&rom.rectangles()[0]);
        assert!(overlap < 0.1, "overlap {overlap}");
    }

    #[test]
    fn test_rejects_degenerate_max_ratio() {
        let (netlist, die) = fixture();
        let options = Options { max_ratio: 1.0, ..Options::default() };
        assert!(legalfloor(&netlist, &die, &options).is_err());
    }

    #[test]
    fn test_satellites_remain_attached() {
        // A module with one north satellite; after legalization the
        // satellite still sits on the trunk's top edge.
        let mut module = Module::new("stairs").unwrap();
        module.set_hard();
        module
            .add_rectangle(Rect::new(Point::new(3.0, 2.0), Shape::new(4.0, 2.0)))
            .unwrap();
        module
            .add_rectangle(Rect::new(Point::new(2.0, 3.5), Shape::new(2.0, 1.0)))
            .unwrap();
        let netlist = Netlist::new(vec![module], vec![]).unwrap();
        let die = Die::new(Shape::splat(8.0), vec![], vec![]).unwrap();

        let out = legalfloor(&netlist, &die, &Options::default()).unwrap();
        let rects = out.by_name("stairs").unwrap().rectangles().to_vec();
        assert_eq!(rects.len(), 2);
        let (trunk, sat) = (&rects[0], &rects[1]);
        let trunk_top = trunk.center.y + trunk.shape.h / 2.0;
        let sat_bottom = sat.center.y - sat.shape.h / 2.0;
        assert!((trunk_top - sat_bottom).abs() < 0.05);
        // Hard module: shapes are pinned.
        assert!((trunk.shape.w - 4.0).abs() < 1e-6);
        assert!((sat.shape.h - 1.0).abs() < 1e-6);
    }
}
