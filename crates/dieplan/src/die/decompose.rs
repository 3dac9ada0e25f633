//! Decomposition of the free die area into maximal empty rectangles.
//!
//! All obstacle boundaries are gathered into a strip grid, so every maximal
//! empty rectangle is a union of grid cells and the search runs on a small
//! boolean matrix instead of raw coordinates.

use std::collections::{HashSet, VecDeque};

use crate::geom::{Point, Rect, Shape};
use crate::Scalar;

/// Compute the maximal free rectangles of a die of the given shape around
/// the given obstacles (tagged regions, blockages and fixed rectangles).
///
/// Rectangles are emitted greedily, largest area first; ties go to the
/// candidate generated first (lowest row, then lowest column).
pub(super) fn ground_rectangles(
    shape: Shape,
    obstacles: &[Rect],
    epsilon: f64,
) -> Vec<Rect> {
    let mut grid = StripGrid::new(shape, obstacles, epsilon);
    let mut ground = vec![];
    while let Some(rect) = grid.take_largest_free() {
        ground.push(rect);
    }
    ground
}

/// A contiguous block of free cells, in inclusive row/column bounds.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
struct Span {
    rmin: usize,
    rmax: usize,
    cmin: usize,
    cmax: usize,
}

/// The strip grid spanned by the obstacle boundaries.
struct StripGrid {
    /// The sorted, deduplicated x coordinates of the vertical strips.
    xs: Vec<f64>,
    /// The sorted, deduplicated y coordinates of the horizontal strips.
    ys: Vec<f64>,
    /// Row-major occupancy, `cells[row][col]`, row zero at the bottom.
    cells: Vec<Vec<bool>>,
}

impl StripGrid {
    fn new(shape: Shape, obstacles: &[Rect], epsilon: f64) -> Self {
        let mut xs = vec![0.0, shape.w];
        let mut ys = vec![0.0, shape.h];
        for rect in obstacles {
            let (ll, ur) = rect.bounding_box();
            xs.extend([ll.x, ur.x]);
            ys.extend([ll.y, ur.y]);
        }
        let xs = crate::geom::dedup_sorted(xs, epsilon);
        let ys = crate::geom::dedup_sorted(ys, epsilon);

        // Mark a cell occupied iff its center lies inside an obstacle.
        // Because all obstacle edges are on the strip boundaries, sampling
        // the center is exact.
        let mut cells = vec![vec![false; xs.len() - 1]; ys.len() - 1];
        for (row, cells) in cells.iter_mut().enumerate() {
            for (col, cell) in cells.iter_mut().enumerate() {
                let center = Point::new(
                    (xs[col] + xs[col + 1]) / 2.0,
                    (ys[row] + ys[row + 1]) / 2.0,
                );
                *cell = obstacles.iter().any(|r| r.contains(center));
            }
        }

        Self { xs, ys, cells }
    }

    fn rows(&self) -> usize {
        self.cells.len()
    }

    fn cols(&self) -> usize {
        self.xs.len() - 1
    }

    fn area(&self, span: Span) -> f64 {
        let w = self.xs[span.cmax + 1] - self.xs[span.cmin];
        let h = self.ys[span.rmax + 1] - self.ys[span.rmin];
        w * h
    }

    /// Find the largest free rectangle, mark its cells occupied, and return
    /// it. Returns `None` once every cell is occupied.
    fn take_largest_free(&mut self) -> Option<Rect> {
        let mut best: Option<(Scalar, Span)> = None;
        for row in 0..self.rows() {
            for col in 0..self.cols() {
                if self.cells[row][col] {
                    continue;
                }
                let seed = Span { rmin: row, rmax: row, cmin: col, cmax: col };
                for span in self.expand(seed) {
                    let area = Scalar::new(self.area(span));
                    // Strict comparison keeps the first-encountered maximum.
                    if best.is_none_or(|(max, _)| area > max) {
                        best = Some((area, span));
                    }
                }
            }
        }

        let (_, span) = best?;
        for row in span.rmin..=span.rmax {
            for col in span.cmin..=span.cmax {
                self.cells[row][col] = true;
            }
        }

        let ll = Point::new(self.xs[span.cmin], self.ys[span.rmin]);
        let ur = Point::new(self.xs[span.cmax + 1], self.ys[span.rmax + 1]);
        Some(Rect::new((ll + ur) / 2.0, Shape::new(ur.x - ll.x, ur.y - ll.y)))
    }

    /// Enumerate all free spans reachable from the seed by repeatedly
    /// adding one free row or one free column, in breadth-first order.
    fn expand(&self, seed: Span) -> Vec<Span> {
        let mut spans = vec![seed];
        let mut seen: HashSet<Span> = spans.iter().copied().collect();
        let mut pending: VecDeque<Span> = spans.iter().copied().collect();

        while let Some(span) = pending.pop_front() {
            if span.rmax + 1 < self.rows() {
                let row = span.rmax + 1;
                if (span.cmin..=span.cmax).all(|col| !self.cells[row][col]) {
                    let grown = Span { rmax: row, ..span };
                    if seen.insert(grown) {
                        spans.push(grown);
                        pending.push_back(grown);
                    }
                }
            }
            if span.cmax + 1 < self.cols() {
                let col = span.cmax + 1;
                if (span.rmin..=span.rmax).all(|row| !self.cells[row][col]) {
                    let grown = Span { cmax: col, ..span };
                    if seen.insert(grown) {
                        spans.push(grown);
                        pending.push_back(grown);
                    }
                }
            }
        }

        spans
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geom::Tag;

    fn decompose(shape: Shape, obstacles: Vec<Rect>) -> (Vec<Rect>, StripGrid) {
        let epsilon = 1e-12 * shape.w.min(shape.h);
        let grid = StripGrid::new(shape, &obstacles, epsilon);
        (ground_rectangles(shape, &obstacles, epsilon), grid)
    }

    #[test]
    fn test_largest_rectangle_is_emitted_first() {
        // A blockage in the lower-left corner leaves an L. Both maximal
        // rectangles have area 60; the candidate discovered first (seeded
        // at the lowest row) wins the tie.
        let blockage = Rect::new(Point::new(2.0, 2.0), Shape::splat(4.0))
            .with_tag(Tag::Blockage);
        let (ground, _) = decompose(Shape::new(10.0, 10.0), vec![blockage]);
        assert_eq!(ground.len(), 2);
        assert_eq!(ground[0].shape, Shape::new(6.0, 10.0));
        assert_eq!(ground[0].center, Point::new(7.0, 5.0));
        assert_eq!(ground[1].shape, Shape::new(4.0, 6.0));
        assert_eq!(ground[1].center, Point::new(2.0, 7.0));
    }

    #[test]
    fn test_ground_rectangles_are_maximal() {
        // Growing any emitted rectangle by one strip row or column must hit
        // an occupied cell or the die boundary.
        let blockage = Rect::new(Point::new(5.0, 5.0), Shape::splat(2.0))
            .with_tag(Tag::Blockage);
        let shape = Shape::new(10.0, 10.0);
        let obstacles = vec![blockage];
        let epsilon = 1e-12_f64 * 10.0;
        let ground = ground_rectangles(shape, &obstacles, epsilon);

        // Rebuild the *initial* occupancy (obstacles only) and check each
        // ground rectangle's strip span for maximality.
        let grid = StripGrid::new(shape, &obstacles, epsilon);
        for rect in &ground {
            let (ll, ur) = rect.bounding_box();
            let cmin = grid.xs.iter().position(|&x| (x - ll.x).abs() < 1e-9).unwrap();
            let cmax = grid.xs.iter().position(|&x| (x - ur.x).abs() < 1e-9).unwrap() - 1;
            let rmin = grid.ys.iter().position(|&y| (y - ll.y).abs() < 1e-9).unwrap();
            let rmax = grid.ys.iter().position(|&y| (y - ur.y).abs() < 1e-9).unwrap() - 1;

            // A maximal rectangle may be blocked by *other* ground
            // rectangles as well, since extraction is sequential; occupancy
            // therefore includes every other emitted rectangle.
            let occupied = |row: usize, col: usize| {
                let center = Point::new(
                    (grid.xs[col] + grid.xs[col + 1]) / 2.0,
                    (grid.ys[row] + grid.ys[row + 1]) / 2.0,
                );
                obstacles.iter().any(|r| r.contains(center))
                    || ground
                        .iter()
                        .filter(|r| *r != rect)
                        .any(|r| r.contains(center))
            };

            if rmax + 1 < grid.rows() {
                assert!((cmin..=cmax).any(|col| occupied(rmax + 1, col)));
            }
            if rmin > 0 {
                assert!((cmin..=cmax).any(|col| occupied(rmin - 1, col)));
            }
            if cmax + 1 < grid.cols() {
                assert!((rmin..=rmax).any(|row| occupied(row, cmax + 1)));
            }
            if cmin > 0 {
                assert!((rmin..=rmax).any(|row| occupied(row, cmin - 1)));
            }
        }
    }
}
