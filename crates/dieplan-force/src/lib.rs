//! Force-directed pre-placement.
//!
//! A Fruchterman–Reingold pass over the netlist's modules: connected
//! modules attract, all modules repel, with forces scaled by module area.
//! Displacements are clipped by a linearly cooling temperature and
//! positions by the die. The result is a set of module centers that later
//! passes start from; fixed modules do not move.

use dieplan::die::Die;
use dieplan::geom::Point;
use dieplan::netlist::Netlist;

/// Parameters of the force-directed pass.
#[derive(Debug, Copy, Clone)]
pub struct Options {
    /// The number of iterations.
    pub max_iter: usize,
    /// The seed of the deterministic scatter applied to modules without a
    /// center.
    pub seed: u64,
}

impl Default for Options {
    fn default() -> Self {
        Self { max_iter: 100, seed: 0 }
    }
}

/// The minimum distance used when two modules (nearly) coincide, to keep
/// the force directions bounded.
const MIN_DIST: f64 = 0.01;

/// Relocate the module centers of the netlist with the Fruchterman–Reingold
/// algorithm. Fixed modules keep their position.
pub fn force_layout(netlist: &mut Netlist, die: &Die, options: &Options) {
    let n = netlist.num_modules();
    if n == 0 {
        return;
    }

    let half = Point::new(die.width() / 2.0, die.height() / 2.0);

    // Positions relative to the die center; unplaced modules get a
    // deterministic scatter so coincident modules can separate.
    let mut rng = fastrand::Rng::with_seed(options.seed);
    let mut pos: Vec<Point> = netlist
        .modules()
        .map(|module| match module.center() {
            Some(center) => center - half,
            None => Point::new(
                (rng.f64() - 0.5) * die.width() / 2.0,
                (rng.f64() - 0.5) * die.height() / 2.0,
            ),
        })
        .collect();

    let mut t = die.width().max(die.height()) * 0.1;
    let dt = t / (options.max_iter + 1) as f64;
    let k = (die.area() / n as f64).sqrt();

    let areas: Vec<f64> = netlist.modules().map(|m| m.total_area()).collect();
    let attraction = |dist: f64, area: f64| dist * dist / (k * area);
    let repulsion = |dist: f64, area: f64| (k * area).powi(2) / dist;

    let mut disp = vec![Point::zero(); n];
    for iteration in 0..options.max_iter {
        // Repulsion between every pair of modules.
        for v in 0..n {
            disp[v] = Point::zero();
            for u in 0..n {
                if u != v {
                    let diff = pos[v] - pos[u];
                    let dist = diff.hypot().max(MIN_DIST);
                    disp[v] += diff / dist * repulsion(dist, areas[v]);
                }
            }
        }

        // Attraction along every hyperedge, pairwise over its members.
        for edge in netlist.edges() {
            for (i, &v) in edge.modules.iter().enumerate() {
                for &u in &edge.modules[i + 1..] {
                    let diff = pos[v] - pos[u];
                    let dist = diff.hypot().max(MIN_DIST);
                    disp[v] -= diff / dist * attraction(dist, areas[v]);
                    disp[u] += diff / dist * attraction(dist, areas[u]);
                }
            }
        }

        // Move, clipped by the temperature and the die.
        for (v, module) in netlist.modules().enumerate() {
            if module.is_fixed() {
                continue;
            }
            let norm = disp[v].hypot().max(MIN_DIST);
            let step = pos[v] + disp[v] / norm * norm.min(t);
            pos[v] = Point::new(
                step.x.clamp(-half.x, half.x),
                step.y.clamp(-half.y, half.y),
            );
        }

        t -= dt;
        tracing::trace!(iteration, temperature = t, "force iteration");
    }

    for (v, position) in pos.iter().enumerate() {
        if !netlist.module(v).is_fixed() {
            netlist.module_mut(v).set_center(*position + half);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dieplan::geom::{Rect, Shape};
    use dieplan::netlist::Module;

    fn netlist3() -> Netlist {
        let mut a = Module::soft("a", 4.0).unwrap();
        a.set_center(Point::new(1.0, 1.0));
        let mut b = Module::soft("b", 4.0).unwrap();
        b.set_center(Point::new(1.2, 1.0));
        let c = Module::soft("c", 4.0).unwrap();
        Netlist::new(
            vec![a, b, c],
            vec![(vec!["a".into(), "b".into()], 1.0)],
        )
        .unwrap()
    }

    #[test]
    fn test_positions_stay_inside_the_die() {
        let mut netlist = netlist3();
        let die = Die::new(Shape::splat(10.0), vec![], vec![]).unwrap();
        force_layout(&mut netlist, &die, &Options::default());
        for module in netlist.modules() {
            let center = module.center().unwrap();
            assert!(center.x >= 0.0 && center.x <= 10.0);
            assert!(center.y >= 0.0 && center.y <= 10.0);
        }
    }

    #[test]
    fn test_fixed_modules_do_not_move() {
        let mut fixed = Module::new("rom").unwrap();
        fixed.set_fixed();
        fixed
            .add_rectangle(Rect::new(Point::new(2.0, 2.0), Shape::new(2.0, 2.0)))
            .unwrap();
        let soft = Module::soft("cpu", 4.0).unwrap();
        let mut netlist = Netlist::new(
            vec![fixed, soft],
            vec![(vec!["rom".into(), "cpu".into()], 1.0)],
        )
        .unwrap();
        let die = Die::new(Shape::splat(10.0), vec![], vec![]).unwrap();
        force_layout(&mut netlist, &die, &Options::default());
        assert_eq!(
            netlist.by_name("rom").unwrap().center(),
            Some(Point::new(2.0, 2.0))
        );
    }

    #[test]
    fn test_scatter_is_deterministic() {
        let die = Die::new(Shape::splat(10.0), vec![], vec![]).unwrap();
        let mut first = netlist3();
        force_layout(&mut first, &die, &Options::default());
        let mut second = netlist3();
        force_layout(&mut second, &die, &Options::default());
        for (a, b) in first.modules().zip(second.modules()) {
            assert_eq!(a.center(), b.center());
        }
    }
}
