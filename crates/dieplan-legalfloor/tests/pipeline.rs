//! End-to-end run of the floorplanning pipeline: global floorplanning on a
//! small netlist, then legalization of the resulting placement.

use dieplan::die::Die;
use dieplan::geom::Shape;
use dieplan::netlist::Netlist;

const NETLIST: &str = "\
Modules:
  cpu:
    area: 12
    center: [2, 2]
  mem:
    area: 16
    center: [6, 6]
  io:
    area: 6
    center: [6, 2]
Nets:
  - [cpu, mem]
  - [cpu, io, 2]
";

#[test]
fn glbfloor_then_legalfloor() {
    let mut netlist = Netlist::from_yaml(NETLIST).unwrap();
    let die = Die::new(Shape::splat(8.0), vec![], vec![]).unwrap();

    let options = dieplan_glbfloor::Options {
        alpha: 0.3,
        grid: Some((2, 2)),
        max_iter: Some(1),
        ..dieplan_glbfloor::Options::default()
    };
    let allocation = dieplan_glbfloor::glbfloor(&mut netlist, &die, &options).unwrap();
    assert_eq!(allocation.num_cells(), 4);

    // Every module now has a center and a rectangle to legalize from.
    for module in netlist.modules() {
        assert!(module.center().is_some());
        assert!(!module.rectangles().is_empty());
    }

    let legal = dieplan_legalfloor::legalfloor(
        &netlist,
        &die,
        &dieplan_legalfloor::Options::default(),
    )
    .unwrap();

    let outline = die.bounding_rect();
    let rects: Vec<_> = legal
        .modules()
        .flat_map(|module| module.rectangles().iter().cloned())
        .collect();
    assert_eq!(rects.len(), 3);

    // Legal up to solver tolerance: inside the die, pairwise disjoint.
    for rect in &rects {
        let (ll, ur) = rect.bounding_box();
        assert!(ll.x > -0.1 && ll.y > -0.1);
        assert!(ur.x < outline.shape.w + 0.1 && ur.y < outline.shape.h + 0.1);
    }
    for (i, a) in rects.iter().enumerate() {
        for b in &rects[i + 1..] {
            assert!(a.area_overlap(b) < 0.2, "{a:?} overlaps {b:?}");
        }
    }
}
