//! The die: the outline modules are placed on, its tagged regions and
//! blockages, and the decomposition of the remaining free area into maximal
//! ground rectangles.

mod decompose;
mod yaml;

use crate::diag::{bail, StrResult};
use crate::geom::{Point, Rect, Shape, Tag};

/// The die outline with its tagged regions, blockages, fixed rectangles
/// and the derived ground decomposition.
///
/// The decomposition is computed eagerly at construction and immutable
/// afterwards. The rectangles of a die tile it exactly: regions, ground
/// regions, blockages and fixed rectangles are pairwise non-overlapping and
/// their areas sum to the die area.
#[derive(Debug, Clone)]
pub struct Die {
    shape: Shape,
    regions: Vec<Rect>,
    blockages: Vec<Rect>,
    fixed: Vec<Rect>,
    ground: Vec<Rect>,
    epsilon: f64,
}

impl Die {
    /// Create a die from its shape, its tagged rectangles (regions and
    /// blockages) and the fixed rectangles of the associated netlist.
    pub fn new(shape: Shape, rects: Vec<Rect>, fixed: Vec<Rect>) -> StrResult<Self> {
        if !(shape.w > 0.0 && shape.h > 0.0) {
            bail!("die dimensions must be positive");
        }

        let epsilon = 1e-12 * shape.w.min(shape.h);
        let mut regions = vec![];
        let mut blockages = vec![];
        for rect in rects {
            match rect.tag {
                Tag::Ground => bail!("die rectangles must carry a non-ground tag"),
                Tag::Blockage => blockages.push(rect),
                Tag::Named(_) => regions.push(rect),
            }
        }

        let mut die = Self { shape, regions, blockages, fixed, ground: vec![], epsilon };
        die.validate_input()?;
        die.ground = decompose::ground_rectangles(shape, &die.obstacles(), epsilon);
        die.check_rectangles();
        Ok(die)
    }

    /// Parse a die from its YAML description.
    pub fn from_yaml(src: &str, fixed: Vec<Rect>) -> StrResult<Self> {
        let (shape, rects) = yaml::parse_die(src)?;
        Self::new(shape, rects, fixed)
    }

    /// The width of the die.
    pub fn width(&self) -> f64 {
        self.shape.w
    }

    /// The height of the die.
    pub fn height(&self) -> f64 {
        self.shape.h
    }

    /// The shape of the die.
    pub fn shape(&self) -> Shape {
        self.shape
    }

    /// The area of the die.
    pub fn area(&self) -> f64 {
        self.shape.area()
    }

    /// The coordinate precision, relative to the die dimensions.
    pub fn epsilon(&self) -> f64 {
        self.epsilon
    }

    /// The non-ground, non-blockage tagged regions.
    pub fn regions(&self) -> &[Rect] {
        &self.regions
    }

    /// The blockages.
    pub fn blockages(&self) -> &[Rect] {
        &self.blockages
    }

    /// The fixed rectangles, taken from the netlist's fixed modules.
    pub fn fixed(&self) -> &[Rect] {
        &self.fixed
    }

    /// The maximal rectangles of free die area.
    pub fn ground_regions(&self) -> &[Rect] {
        &self.ground
    }

    /// A rectangle covering the whole die.
    pub fn bounding_rect(&self) -> Rect {
        Rect::new(Point::new(self.shape.w / 2.0, self.shape.h / 2.0), self.shape)
    }

    /// All obstacles the ground decomposition must tile around.
    fn obstacles(&self) -> Vec<Rect> {
        let mut obstacles = self.regions.clone();
        obstacles.extend(self.blockages.iter().cloned());
        obstacles.extend(self.fixed.iter().cloned());
        obstacles
    }

    /// Check that the given rectangles are inside the die and pairwise
    /// non-overlapping. These are input errors.
    fn validate_input(&self) -> StrResult<()> {
        let outline = self.bounding_rect();
        let obstacles = self.obstacles();
        for rect in &obstacles {
            if !rect.is_inside(&outline) {
                bail!("rectangle {rect:?} lies outside of the die");
            }
        }
        for (i, a) in obstacles.iter().enumerate() {
            for b in &obstacles[i + 1..] {
                if a.overlaps(b) {
                    bail!("die rectangles {a:?} and {b:?} overlap");
                }
            }
        }
        Ok(())
    }

    /// Check the global die invariant: all rectangles inside, pairwise
    /// non-overlapping, areas summing to the die area. A violation after
    /// decomposition is a programming error.
    fn check_rectangles(&self) {
        let outline = self.bounding_rect();
        let all: Vec<&Rect> = self
            .regions
            .iter()
            .chain(&self.ground)
            .chain(&self.blockages)
            .chain(&self.fixed)
            .collect();

        for rect in &all {
            assert!(rect.is_inside(&outline), "die rectangle outside of the die");
        }
        for (i, a) in all.iter().enumerate() {
            for b in &all[i + 1..] {
                assert!(!a.overlaps(b), "die rectangles overlap");
            }
        }

        let sum: f64 = all.iter().map(|r| r.area()).sum();
        assert!(
            (sum - self.area()).abs() <= 1e-9 * self.area().max(1.0),
            "die rectangle areas do not sum to the die area"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geom::Tag;

    fn rect(x: f64, y: f64, w: f64, h: f64) -> Rect {
        Rect::new(Point::new(x, y), Shape::new(w, h))
    }

    #[test]
    fn test_empty_die_is_one_ground_rectangle() {
        let die = Die::new(Shape::splat(10.0), vec![], vec![]).unwrap();
        assert_eq!(die.ground_regions(), [rect(5.0, 5.0, 10.0, 10.0)]);
    }

    #[test]
    fn test_center_blockage_tiles_into_four_rectangles() {
        let blockage = rect(5.0, 5.0, 2.0, 2.0).with_tag(Tag::Blockage);
        let die = Die::new(Shape::splat(10.0), vec![blockage], vec![]).unwrap();
        let ground = die.ground_regions();
        assert_eq!(ground.len(), 4);
        let total: f64 = ground.iter().map(|r| r.area()).sum();
        assert!((total - 96.0).abs() < 1e-9);
        for (i, a) in ground.iter().enumerate() {
            for b in &ground[i + 1..] {
                assert_eq!(a.area_overlap(b), 0.0);
            }
        }
    }

    #[test]
    fn test_rejects_out_of_die_rectangles() {
        let region = rect(9.0, 9.0, 4.0, 4.0).with_tag(Tag::parse("io").unwrap());
        assert!(Die::new(Shape::splat(10.0), vec![region], vec![]).is_err());
    }

    #[test]
    fn test_rejects_overlapping_obstacles() {
        let a = rect(3.0, 3.0, 4.0, 4.0).with_tag(Tag::Blockage);
        let b = rect(4.0, 4.0, 4.0, 4.0).with_tag(Tag::Blockage);
        assert!(Die::new(Shape::splat(10.0), vec![a, b], vec![]).is_err());
    }

    #[test]
    fn test_fixed_rectangles_participate_in_decomposition() {
        let fixed = rect(2.0, 2.0, 4.0, 4.0).with_fixed(true).with_hard(true);
        let die = Die::new(Shape::splat(8.0), vec![], vec![fixed]).unwrap();
        let total: f64 = die.ground_regions().iter().map(|r| r.area()).sum();
        assert!((total - 48.0).abs() < 1e-9);
    }
}
