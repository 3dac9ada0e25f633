use std::fmt::{self, Debug, Formatter};

use crate::geom::{Point, Shape, Tag};

/// An axis-aligned rectangle, described by its center and shape.
#[derive(Clone, PartialEq)]
pub struct Rect {
    /// The center of the rectangle.
    pub center: Point,
    /// The width and height of the rectangle.
    pub shape: Shape,
    /// The region of the die the rectangle belongs to.
    pub tag: Tag,
    /// Whether the rectangle may neither move nor change shape.
    pub fixed: bool,
    /// Whether the rectangle may move but not change shape.
    pub hard: bool,
}

impl Rect {
    /// Create a movable, soft ground rectangle.
    ///
    /// Panics if the shape is not strictly positive.
    pub fn new(center: Point, shape: Shape) -> Self {
        assert!(shape.w > 0.0 && shape.h > 0.0, "rectangle shape must be positive");
        Self { center, shape, tag: Tag::Ground, fixed: false, hard: false }
    }

    /// Set the region tag.
    pub fn with_tag(mut self, tag: Tag) -> Self {
        self.tag = tag;
        self
    }

    /// Set the fixed flag.
    pub fn with_fixed(mut self, fixed: bool) -> Self {
        self.fixed = fixed;
        self
    }

    /// Set the hard flag.
    pub fn with_hard(mut self, hard: bool) -> Self {
        self.hard = hard;
        self
    }

    /// The lower-left and upper-right corners.
    pub fn bounding_box(&self) -> (Point, Point) {
        let half = self.shape.to_point() / 2.0;
        (self.center - half, self.center + half)
    }

    /// The area of the rectangle.
    pub fn area(&self) -> f64 {
        self.shape.area()
    }

    /// The aspect ratio, normalized to be at least one.
    pub fn aspect_ratio(&self) -> f64 {
        self.shape.aspect_ratio()
    }

    /// Whether a point lies inside the closed rectangle (the boundary
    /// counts as inside).
    pub fn contains(&self, p: Point) -> bool {
        let (ll, ur) = self.bounding_box();
        ll.x <= p.x && p.x <= ur.x && ll.y <= p.y && p.y <= ur.y
    }

    /// Whether this rectangle lies fully inside another one.
    pub fn is_inside(&self, other: &Rect) -> bool {
        let (ll, ur) = self.bounding_box();
        other.contains(ll) && other.contains(ur)
    }

    /// The area of the intersection with another rectangle.
    ///
    /// Rectangles that merely share an edge have zero overlap.
    pub fn area_overlap(&self, other: &Rect) -> f64 {
        let (ll1, ur1) = self.bounding_box();
        let (ll2, ur2) = other.bounding_box();
        let w = ur1.x.min(ur2.x) - ll1.x.max(ll2.x);
        if w <= 0.0 {
            return 0.0;
        }
        let h = ur1.y.min(ur2.y) - ll1.y.max(ll2.y);
        if h <= 0.0 {
            return 0.0;
        }
        w * h
    }

    /// Whether the two rectangles overlap with positive area.
    pub fn overlaps(&self, other: &Rect) -> bool {
        self.area_overlap(other) > 0.0
    }

    /// The intersection with another rectangle.
    ///
    /// Returns `None` if the tags differ or the intersection has no area.
    pub fn intersection(&self, other: &Rect) -> Option<Rect> {
        if self.tag != other.tag {
            return None;
        }
        let (ll1, ur1) = self.bounding_box();
        let (ll2, ur2) = other.bounding_box();
        let ll = ll1.max(ll2);
        let ur = ur1.min(ur2);
        let shape = Shape::new(ur.x - ll.x, ur.y - ll.y);
        if shape.w <= 0.0 || shape.h <= 0.0 {
            return None;
        }
        Some(
            Rect::new((ll + ur) / 2.0, shape)
                .with_tag(self.tag.clone()),
        )
    }

    /// Split the rectangle with a vertical cut at the given x coordinate
    /// (the mid line when `None`), yielding the left and right pieces.
    ///
    /// Panics if the cut is not strictly inside the rectangle.
    pub fn split_horizontal(&self, x: Option<f64>) -> (Rect, Rect) {
        let x = x.unwrap_or(self.center.x);
        let (ll, ur) = self.bounding_box();
        assert!(ll.x < x && x < ur.x, "cut coordinate outside of rectangle");
        let left = Self {
            center: Point::new((ll.x + x) / 2.0, self.center.y),
            shape: Shape::new(x - ll.x, self.shape.h),
            ..self.clone()
        };
        let right = Self {
            center: Point::new((x + ur.x) / 2.0, self.center.y),
            shape: Shape::new(ur.x - x, self.shape.h),
            ..self.clone()
        };
        (left, right)
    }

    /// Split the rectangle with a horizontal cut at the given y coordinate
    /// (the mid line when `None`), yielding the bottom and top pieces.
    ///
    /// Panics if the cut is not strictly inside the rectangle.
    pub fn split_vertical(&self, y: Option<f64>) -> (Rect, Rect) {
        let y = y.unwrap_or(self.center.y);
        let (ll, ur) = self.bounding_box();
        assert!(ll.y < y && y < ur.y, "cut coordinate outside of rectangle");
        let bottom = Self {
            center: Point::new(self.center.x, (ll.y + y) / 2.0),
            shape: Shape::new(self.shape.w, y - ll.y),
            ..self.clone()
        };
        let top = Self {
            center: Point::new(self.center.x, (y + ur.y) / 2.0),
            shape: Shape::new(self.shape.w, ur.y - y),
            ..self.clone()
        };
        (bottom, top)
    }

    /// Split the rectangle into two halves, perpendicular to its longer
    /// side.
    pub fn split(&self) -> (Rect, Rect) {
        if self.shape.w >= self.shape.h {
            self.split_horizontal(None)
        } else {
            self.split_vertical(None)
        }
    }

    /// Whether a vertical cut at x leaves two pieces that are both wider
    /// than `ratio` times the height.
    pub fn x_cuttable(&self, x: f64, ratio: f64) -> bool {
        let (ll, ur) = self.bounding_box();
        let min = ratio * self.shape.h;
        x - ll.x > min && ur.x - x > min
    }

    /// Whether a horizontal cut at y leaves two pieces that are both taller
    /// than `ratio` times the width.
    pub fn y_cuttable(&self, y: f64, ratio: f64) -> bool {
        let (ll, ur) = self.bounding_box();
        let min = ratio * self.shape.w;
        y - ll.y > min && ur.y - y > min
    }

    /// Tile the rectangle into a row-major grid of identically shaped
    /// cells. Row zero is the bottom row. The cells inherit the tag and the
    /// fixed flag.
    pub fn grid(&self, rows: usize, cols: usize) -> Vec<Rect> {
        assert!(rows > 0 && cols > 0, "grid must have at least one cell");
        let (ll, _) = self.bounding_box();
        let cell = Shape::new(self.shape.w / cols as f64, self.shape.h / rows as f64);
        let mut cells = Vec::with_capacity(rows * cols);
        for r in 0..rows {
            for c in 0..cols {
                let center = Point::new(
                    ll.x + (c as f64 + 0.5) * cell.w,
                    ll.y + (r as f64 + 0.5) * cell.h,
                );
                cells.push(Rect {
                    center,
                    shape: cell,
                    tag: self.tag.clone(),
                    fixed: self.fixed,
                    hard: false,
                });
            }
        }
        cells
    }
}

impl Debug for Rect {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        write!(
            f,
            "Rect({:?}, {:?}, {}{}{})",
            self.center,
            self.shape,
            self.tag,
            if self.fixed { ", fixed" } else { "" },
            if self.hard { ", hard" } else { "" },
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rect(x: f64, y: f64, w: f64, h: f64) -> Rect {
        Rect::new(Point::new(x, y), Shape::new(w, h))
    }

    #[test]
    fn test_touching_rectangles_do_not_overlap() {
        let a = rect(1.0, 1.0, 2.0, 2.0);
        let b = rect(3.0, 1.0, 2.0, 2.0);
        assert_eq!(a.area_overlap(&b), 0.0);
        assert!(!a.overlaps(&b));
        // The shared edge still counts as inside for both.
        assert!(a.contains(Point::new(2.0, 1.0)));
        assert!(b.contains(Point::new(2.0, 1.0)));
    }

    #[test]
    fn test_area_overlap() {
        let a = rect(2.0, 2.0, 4.0, 4.0);
        let b = rect(4.0, 4.0, 4.0, 4.0);
        assert_eq!(a.area_overlap(&b), 4.0);
        let c = a.intersection(&b).unwrap();
        assert_eq!(c.center, Point::new(3.0, 3.0));
        assert_eq!(c.shape, Shape::splat(2.0));
    }

    #[test]
    fn test_intersection_requires_matching_tags() {
        let a = rect(2.0, 2.0, 4.0, 4.0);
        let b = rect(3.0, 3.0, 4.0, 4.0).with_tag(Tag::Blockage);
        assert_eq!(a.intersection(&b), None);
    }

    #[test]
    fn test_split_horizontal() {
        let (left, right) = rect(2.0, 1.0, 4.0, 2.0).split_horizontal(Some(1.0));
        assert_eq!(left.center, Point::new(0.5, 1.0));
        assert_eq!(left.shape, Shape::new(1.0, 2.0));
        assert_eq!(right.center, Point::new(2.5, 1.0));
        assert_eq!(right.shape, Shape::new(3.0, 2.0));
    }

    #[test]
    fn test_split_is_perpendicular_to_longer_side() {
        let (a, b) = rect(0.0, 0.0, 2.0, 6.0).split();
        assert_eq!(a.shape, Shape::new(2.0, 3.0));
        assert_eq!(b.shape, Shape::new(2.0, 3.0));
        assert_eq!(a.center, Point::new(0.0, -1.5));
        assert_eq!(b.center, Point::new(0.0, 1.5));
    }

    #[test]
    #[should_panic(expected = "outside of rectangle")]
    fn test_split_at_boundary_panics() {
        rect(2.0, 1.0, 4.0, 2.0).split_horizontal(Some(4.0));
    }

    #[test]
    fn test_split_reduces_high_aspects() {
        // Halving a rectangle of aspect α > √2 yields children of aspect
        // max(α/2, 2/α) ≤ max(α/2, 2).
        for aspect in [1.5, 2.0, 3.0, 7.0, 40.0] {
            let r = rect(0.0, 0.0, aspect, 1.0);
            let (a, b) = r.split();
            let bound = (aspect / 2.0).max(2.0);
            assert!(a.aspect_ratio() <= bound + 1e-12);
            assert!(b.aspect_ratio() <= bound + 1e-12);
        }
    }

    #[test]
    fn test_grid_is_row_major_from_the_bottom() {
        let cells = rect(2.0, 1.0, 4.0, 2.0).grid(2, 2);
        assert_eq!(cells.len(), 4);
        assert_eq!(cells[0].center, Point::new(1.0, 0.5));
        assert_eq!(cells[1].center, Point::new(3.0, 0.5));
        assert_eq!(cells[2].center, Point::new(1.0, 1.5));
        assert_eq!(cells[3].center, Point::new(3.0, 1.5));
        assert!(cells.iter().all(|c| c.shape == Shape::new(2.0, 1.0)));
    }

    #[test]
    fn test_cuttable() {
        let r = rect(5.0, 5.0, 10.0, 2.0);
        assert!(r.x_cuttable(5.0, 0.01));
        assert!(!r.x_cuttable(0.01, 0.01));
        assert!(!r.x_cuttable(9.999, 0.01));
        assert!(r.y_cuttable(5.0, 0.01));
        assert!(!r.y_cuttable(4.05, 0.01));
    }
}
