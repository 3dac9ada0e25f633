//! Module skeletons: one trunk rectangle plus ordered satellite lists for
//! the four cardinal directions.

use dieplan::diag::{bail, StrResult};
use dieplan::geom::{Point, Rect, Shape};
use dieplan::netlist::Module;

/// A cardinal direction, naming the trunk edge a satellite attaches to.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Cardinal {
    North,
    South,
    East,
    West,
}

/// The shape schema of a module: a trunk rectangle and, per cardinal
/// direction, an ordered list of satellites attached to that trunk edge.
#[derive(Debug, Clone)]
pub struct Skeleton {
    /// The trunk rectangle.
    pub trunk: Rect,
    /// Satellites attached to the top edge.
    pub north: Vec<Rect>,
    /// Satellites attached to the bottom edge.
    pub south: Vec<Rect>,
    /// Satellites attached to the right edge.
    pub east: Vec<Rect>,
    /// Satellites attached to the left edge.
    pub west: Vec<Rect>,
}

impl Skeleton {
    /// Build a skeleton from a module's pre-placed rectangles.
    ///
    /// The first rectangle is the trunk. Every further rectangle must
    /// touch exactly one trunk edge (within `epsilon`) and lie within the
    /// trunk's extent along that edge; the touched edge determines its
    /// direction. A module without rectangles gets a bare square trunk of
    /// its area, centered at its center (or the fallback point).
    pub fn from_module(
        module: &Module,
        fallback: Point,
        epsilon: f64,
    ) -> StrResult<Self> {
        let rects = module.rectangles();
        let Some(trunk) = rects.first() else {
            let center = module.center().unwrap_or(fallback);
            let side = module.total_area().sqrt();
            return Ok(Self::bare(Rect::new(center, Shape::splat(side))));
        };

        let mut skeleton = Self::bare(trunk.clone());
        for rect in &rects[1..] {
            match direction_of(trunk, rect, epsilon) {
                Some(Cardinal::North) => skeleton.north.push(rect.clone()),
                Some(Cardinal::South) => skeleton.south.push(rect.clone()),
                Some(Cardinal::East) => skeleton.east.push(rect.clone()),
                Some(Cardinal::West) => skeleton.west.push(rect.clone()),
                None => bail!(
                    "module {}: rectangle {rect:?} is not attached to an \
                     edge of the trunk {trunk:?}",
                    module.name()
                ),
            }
        }
        Ok(skeleton)
    }

    fn bare(trunk: Rect) -> Self {
        Self { trunk, north: vec![], south: vec![], east: vec![], west: vec![] }
    }

    /// All rectangles: the trunk first, then the satellites by direction.
    pub fn rects(&self) -> impl Iterator<Item = &Rect> {
        std::iter::once(&self.trunk)
            .chain(&self.north)
            .chain(&self.south)
            .chain(&self.east)
            .chain(&self.west)
    }

    /// The number of rectangles, trunk included.
    pub fn num_rects(&self) -> usize {
        1 + self.north.len() + self.south.len() + self.east.len() + self.west.len()
    }
}

/// Which trunk edge a rectangle is attached to, if any: it must touch the
/// edge within `epsilon` and fit the trunk's orthogonal extent.
fn direction_of(trunk: &Rect, rect: &Rect, epsilon: f64) -> Option<Cardinal> {
    let (tll, tur) = trunk.bounding_box();
    let (rll, rur) = rect.bounding_box();
    let in_x = rll.x >= tll.x - epsilon && rur.x <= tur.x + epsilon;
    let in_y = rll.y >= tll.y - epsilon && rur.y <= tur.y + epsilon;

    if (rll.y - tur.y).abs() <= epsilon && in_x {
        Some(Cardinal::North)
    } else if (rur.y - tll.y).abs() <= epsilon && in_x {
        Some(Cardinal::South)
    } else if (rll.x - tur.x).abs() <= epsilon && in_y {
        Some(Cardinal::East)
    } else if (rur.x - tll.x).abs() <= epsilon && in_y {
        Some(Cardinal::West)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rect(x: f64, y: f64, w: f64, h: f64) -> Rect {
        Rect::new(Point::new(x, y), Shape::new(w, h))
    }

    fn module_with(rects: Vec<Rect>) -> Module {
        let mut module = Module::soft("m", 16.0).unwrap();
        for r in rects {
            module.add_rectangle(r).unwrap();
        }
        module
    }

    #[test]
    fn test_satellites_are_classified_by_edge() {
        // A trunk at (3, 4) sized 3x4 with a south satellite and two west
        // satellites, mirroring a staircase skeleton.
        let module = module_with(vec![
            rect(3.0, 4.0, 3.0, 4.0),
            rect(2.5, 1.5, 2.0, 1.0),
            rect(1.0, 5.5, 1.0, 1.0),
            rect(1.0, 4.5, 1.0, 1.0),
        ]);
        let skeleton =
            Skeleton::from_module(&module, Point::zero(), 1e-9).unwrap();
        assert_eq!(skeleton.south.len(), 1);
        assert_eq!(skeleton.west.len(), 2);
        assert_eq!(skeleton.north.len(), 0);
        assert_eq!(skeleton.east.len(), 0);
        assert_eq!(skeleton.num_rects(), 4);
    }

    #[test]
    fn test_detached_rectangle_is_rejected() {
        let module = module_with(vec![
            rect(3.0, 4.0, 3.0, 4.0),
            rect(10.0, 10.0, 1.0, 1.0),
        ]);
        assert!(Skeleton::from_module(&module, Point::zero(), 1e-9).is_err());
    }

    #[test]
    fn test_bare_square_for_missing_rectangles() {
        let module = module_with(vec![]);
        let skeleton =
            Skeleton::from_module(&module, Point::new(3.5, 3.5), 1e-9).unwrap();
        assert_eq!(skeleton.num_rects(), 1);
        assert_eq!(skeleton.trunk.shape, Shape::splat(4.0));
        assert_eq!(skeleton.trunk.center, Point::new(3.5, 3.5));
    }
}
