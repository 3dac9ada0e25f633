use std::cmp::Ordering;
use std::collections::BinaryHeap;

use crate::geom::Rect;
use crate::Scalar;

/// Gather the sorted x and y coordinates of the bounding-box edges of a
/// list of rectangles, deduplicated up to `epsilon`.
pub fn gather_boundaries(rects: &[Rect], epsilon: f64) -> (Vec<f64>, Vec<f64>) {
    let mut xs = Vec::with_capacity(2 * rects.len());
    let mut ys = Vec::with_capacity(2 * rects.len());
    for rect in rects {
        let (ll, ur) = rect.bounding_box();
        xs.extend([ll.x, ur.x]);
        ys.extend([ll.y, ur.y]);
    }
    (dedup_sorted(xs, epsilon), dedup_sorted(ys, epsilon))
}

/// Sort coordinates and collapse values closer than `epsilon`.
pub(crate) fn dedup_sorted(mut values: Vec<f64>, epsilon: f64) -> Vec<f64> {
    values.sort_by_key(|&v| Scalar::new(v));
    let mut uniq: Vec<f64> = Vec::with_capacity(values.len());
    for value in values {
        if uniq.last().is_none_or(|&last| value > last + epsilon) {
            uniq.push(value);
        }
    }
    uniq
}

/// Split rectangles until all of them have an aspect ratio of at most
/// `max_aspect` and there are at least `min_count` of them.
///
/// A rectangle of aspect α > `max_aspect` is sliced perpendicular to its
/// long side into ⌈α / max_aspect⌉ equal pieces. For `max_aspect` > √2 the
/// slices are guaranteed to satisfy the bound, which is why the bound on
/// the argument is asserted. Afterwards, the largest rectangle by area is
/// halved until the requested count is reached.
pub fn split_until(rects: Vec<Rect>, max_aspect: f64, min_count: usize) -> Vec<Rect> {
    assert!(
        max_aspect > std::f64::consts::SQRT_2,
        "maximum aspect ratio must exceed sqrt(2)"
    );

    let mut heap = BinaryHeap::new();
    let mut seq = 0;
    let mut push = |heap: &mut BinaryHeap<ByArea>, rect: Rect| {
        heap.push(ByArea { area: Scalar::new(rect.area()), seq, rect });
        seq += 1;
    };

    for rect in rects {
        let aspect = rect.aspect_ratio();
        if aspect > max_aspect {
            let slices = (aspect / max_aspect).ceil() as usize;
            let (rows, cols) =
                if rect.shape.w >= rect.shape.h { (1, slices) } else { (slices, 1) };
            for slice in rect.grid(rows, cols) {
                push(&mut heap, slice);
            }
        } else {
            push(&mut heap, rect);
        }
    }

    while heap.len() < min_count {
        let largest = heap.pop().expect("heap cannot be empty");
        let (a, b) = largest.rect.split();
        push(&mut heap, a);
        push(&mut heap, b);
    }

    // Restore a deterministic emission order.
    let mut out: Vec<_> = heap.into_vec();
    out.sort_by_key(|entry| entry.seq);
    out.into_iter().map(|entry| entry.rect).collect()
}

/// A heap entry ordered by area, with ties broken towards the earliest
/// inserted rectangle.
struct ByArea {
    area: Scalar,
    seq: usize,
    rect: Rect,
}

impl PartialEq for ByArea {
    fn eq(&self, other: &Self) -> bool {
        self.area == other.area && self.seq == other.seq
    }
}

impl Eq for ByArea {}

impl Ord for ByArea {
    fn cmp(&self, other: &Self) -> Ordering {
        self.area.cmp(&other.area).then(other.seq.cmp(&self.seq))
    }
}

impl PartialOrd for ByArea {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}
