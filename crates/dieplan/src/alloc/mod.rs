//! The allocation grid: a refinable tiling of the die's free area into
//! cells, each annotated with the fraction of its area every module
//! occupies.
//!
//! Allocations are immutable values: refinement produces a new allocation
//! at a greater depth.

mod yaml;

use ecow::EcoString;
use indexmap::IndexMap;

use crate::diag::{bail, StrResult};
use crate::geom::{Point, Rect, Shape};
use crate::netlist::Netlist;

/// One cell of an allocation.
#[derive(Debug, Clone)]
pub struct Cell {
    rect: Rect,
    depth: u32,
    occupancy: IndexMap<EcoString, f64>,
}

impl Cell {
    /// Create a cell over the given rectangle at the given refinement
    /// depth, with no occupancies.
    pub fn new(rect: Rect, depth: u32) -> Self {
        Self { rect, depth, occupancy: IndexMap::new() }
    }

    /// The rectangle covered by the cell.
    pub fn rect(&self) -> &Rect {
        &self.rect
    }

    /// The refinement depth (zero for a root cell).
    pub fn depth(&self) -> u32 {
        self.depth
    }

    /// The fraction of the cell's area occupied by the given module.
    pub fn occupancy(&self, module: &str) -> f64 {
        self.occupancy.get(module).copied().unwrap_or(0.0)
    }

    /// Set the fraction of the cell's area occupied by a module.
    pub fn set_occupancy(&mut self, module: EcoString, ratio: f64) {
        self.occupancy.insert(module, ratio);
    }

    /// Iterate over the stored (module, occupancy) pairs.
    pub fn occupancies(&self) -> impl Iterator<Item = (&EcoString, f64)> {
        self.occupancy.iter().map(|(name, &ratio)| (name, ratio))
    }

    /// The sum of all module occupancies in this cell.
    pub fn total_occupancy(&self) -> f64 {
        self.occupancy.values().sum()
    }

    /// Whether any occupancy lies strictly inside the fractional band
    /// `(1 - threshold, threshold)`.
    fn is_fractional(&self, threshold: f64) -> bool {
        self.occupancy
            .values()
            .any(|&ratio| ratio > 1.0 - threshold && ratio < threshold)
    }
}

/// An ordered list of non-overlapping cells covering the allocatable area
/// of a die.
#[derive(Debug, Clone)]
pub struct Allocation {
    cells: Vec<Cell>,
}

impl Allocation {
    /// Create an allocation from its cells.
    pub fn new(cells: Vec<Cell>) -> Self {
        debug_assert!(
            cells.iter().enumerate().all(|(i, a)| {
                cells[i + 1..].iter().all(|b| !a.rect.overlaps(&b.rect))
            }),
            "allocation cells overlap"
        );
        Self { cells }
    }

    /// Build the initial allocation of a netlist over the given cell
    /// rectangles.
    ///
    /// Every movable module receives, per cell, the fraction of the cell
    /// its pre-placed ground rectangles cover; the column is then rescaled
    /// so that the module's allocated area matches its ground area exactly.
    /// With `include_area_zero`, cells keep explicit zero entries for every
    /// movable module, which downstream optimization requires.
    pub fn initial(
        rects: Vec<Rect>,
        netlist: &Netlist,
        include_area_zero: bool,
    ) -> StrResult<Self> {
        let mut cells: Vec<Cell> =
            rects.into_iter().map(|rect| Cell::new(rect, 0)).collect();

        for module in netlist.modules() {
            if module.is_fixed() || module.ground_area() == 0.0 {
                continue;
            }

            let mut allocated = 0.0;
            for cell in &mut cells {
                let overlap: f64 = module
                    .rectangles()
                    .iter()
                    .filter(|r| r.tag.is_ground())
                    .map(|r| r.area_overlap(&cell.rect))
                    .sum();
                let ratio = overlap / cell.rect.area();
                if ratio > 0.0 || include_area_zero {
                    cell.set_occupancy(module.name().clone(), ratio);
                }
                allocated += overlap;
            }

            if allocated <= 0.0 {
                bail!(
                    "module {} does not overlap the allocation cells",
                    module.name()
                );
            }

            // Rescale so the allocated area matches the ground area.
            let scale = module.ground_area() / allocated;
            for cell in &mut cells {
                if let Some(ratio) = cell.occupancy.get_mut(module.name().as_str()) {
                    *ratio *= scale;
                }
            }
        }

        for cell in &cells {
            let total = cell.total_occupancy();
            if total > 1.0 + 1e-9 {
                tracing::warn!(
                    cell = ?cell.rect,
                    total,
                    "initial allocation over-occupies a cell"
                );
            }
        }

        Ok(Self::new(cells))
    }

    /// The cells, in emission order.
    pub fn cells(&self) -> &[Cell] {
        &self.cells
    }

    /// The number of cells.
    pub fn num_cells(&self) -> usize {
        self.cells.len()
    }

    /// The occupancy of one module across all cells, as a dense column.
    pub fn module_column(&self, module: &str) -> Vec<f64> {
        self.cells.iter().map(|cell| cell.occupancy(module)).collect()
    }

    /// The bounding box of all cells.
    pub fn bounding_box(&self) -> Rect {
        let mut ll = Point::splat(f64::INFINITY);
        let mut ur = Point::splat(f64::NEG_INFINITY);
        for cell in &self.cells {
            let (cll, cur) = cell.rect.bounding_box();
            ll = ll.min(cll);
            ur = ur.max(cur);
        }
        Rect::new((ll + ur) / 2.0, Shape::new(ur.x - ll.x, ur.y - ll.y))
    }

    /// The total area covered by the cells.
    pub fn total_area(&self) -> f64 {
        self.cells.iter().map(|cell| cell.rect.area()).sum()
    }

    /// The maximum refinement depth over all cells.
    pub fn max_depth(&self) -> u32 {
        self.cells.iter().map(Cell::depth).max().unwrap_or(0)
    }

    /// Whether any cell at the maximum refinement depth holds a fractional
    /// occupancy, i.e. one strictly inside `(1 - threshold, threshold)`.
    pub fn must_be_refined(&self, threshold: f64) -> bool {
        let depth = self.max_depth();
        self.cells
            .iter()
            .any(|cell| cell.depth == depth && cell.is_fractional(threshold))
    }

    /// Refine the allocation: every fractional cell at the maximum depth is
    /// replaced by its 2×2 subdivision, with the parent's occupancies
    /// copied verbatim into each child. All other cells pass through
    /// unchanged.
    pub fn refine(&self, threshold: f64) -> Self {
        let depth = self.max_depth();
        let mut cells = Vec::with_capacity(self.cells.len());
        for cell in &self.cells {
            if cell.depth == depth && cell.is_fractional(threshold) {
                for rect in cell.rect.grid(2, 2) {
                    cells.push(Cell {
                        rect,
                        depth: cell.depth + 1,
                        occupancy: cell.occupancy.clone(),
                    });
                }
            } else {
                cells.push(cell.clone());
            }
        }
        Self::new(cells)
    }

    /// The indices of the cells sharing an edge with the given cell, under
    /// ε-touch.
    pub fn neighbours(&self, index: usize, epsilon: f64) -> Vec<usize> {
        let (all, aur) = self.cells[index].rect.bounding_box();
        let mut out = vec![];
        for (i, other) in self.cells.iter().enumerate() {
            if i == index {
                continue;
            }
            let (bll, bur) = other.rect.bounding_box();
            let x_overlap = aur.x.min(bur.x) - all.x.max(bll.x) > epsilon;
            let y_overlap = aur.y.min(bur.y) - all.y.max(bll.y) > epsilon;
            let x_touch =
                (aur.x - bll.x).abs() <= epsilon || (bur.x - all.x).abs() <= epsilon;
            let y_touch =
                (aur.y - bll.y).abs() <= epsilon || (bur.y - all.y).abs() <= epsilon;
            if (x_touch && y_overlap) || (y_touch && x_overlap) {
                out.push(i);
            }
        }
        out
    }

    /// Parse an allocation from its YAML description.
    pub fn from_yaml(src: &str) -> StrResult<Self> {
        yaml::parse_allocation(src)
    }

    /// Serialize the allocation to YAML.
    pub fn to_yaml(&self) -> EcoString {
        yaml::write_allocation(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::netlist::Module;

    fn netlist_with_square(name: &str, x: f64, y: f64, side: f64) -> Netlist {
        let mut module = Module::soft(name, side * side).unwrap();
        module
            .add_rectangle(Rect::new(Point::new(x, y), Shape::splat(side)))
            .unwrap();
        Netlist::new(vec![module], vec![]).unwrap()
    }

    fn die_cells(w: f64, h: f64, rows: usize, cols: usize) -> Vec<Rect> {
        Rect::new(Point::new(w / 2.0, h / 2.0), Shape::new(w, h)).grid(rows, cols)
    }

    #[test]
    fn test_initial_allocation_conserves_area() {
        let netlist = netlist_with_square("m", 2.0, 2.0, 4.0);
        let alloc =
            Allocation::initial(die_cells(8.0, 8.0, 2, 2), &netlist, true).unwrap();

        // The module covers exactly the lower-left cell.
        assert_eq!(alloc.module_column("m"), vec![1.0, 0.0, 0.0, 0.0]);
        let conserved: f64 = alloc
            .cells()
            .iter()
            .map(|c| c.rect().area() * c.occupancy("m"))
            .sum();
        assert!((conserved - 16.0).abs() < 1e-9);
    }

    #[test]
    fn test_initial_allocation_rescales_to_ground_area() {
        // The module's square sticks out of the die, so the overlapping
        // part is scaled up to conserve its area.
        let netlist = netlist_with_square("m", 0.0, 0.0, 4.0);
        let alloc =
            Allocation::initial(die_cells(8.0, 8.0, 2, 2), &netlist, true).unwrap();
        let conserved: f64 = alloc
            .cells()
            .iter()
            .map(|c| c.rect().area() * c.occupancy("m"))
            .sum();
        assert!((conserved - 16.0).abs() < 1e-9);
    }

    #[test]
    fn test_refinement_trigger() {
        let netlist = netlist_with_square("m", 2.0, 1.0, 2.0);
        let alloc =
            Allocation::initial(die_cells(8.0, 8.0, 2, 2), &netlist, true).unwrap();

        // Occupancy 0.25 in the lower-left cell is fractional at 0.95.
        assert_eq!(alloc.module_column("m")[0], 0.25);
        assert!(alloc.must_be_refined(0.95));

        let refined = alloc.refine(0.95);
        assert_eq!(refined.num_cells(), 7);
        assert_eq!(refined.max_depth(), 1);

        // The children copy the parent's occupancies and cover its area.
        let children: Vec<_> =
            refined.cells().iter().filter(|c| c.depth() == 1).collect();
        assert_eq!(children.len(), 4);
        assert!(children.iter().all(|c| c.occupancy("m") == 0.25));
        assert!((refined.total_area() - alloc.total_area()).abs() < 1e-9);
        assert_eq!(
            refined.bounding_box().bounding_box(),
            alloc.bounding_box().bounding_box()
        );
    }

    #[test]
    fn test_saturated_allocation_needs_no_refinement() {
        let netlist = netlist_with_square("m", 2.0, 2.0, 4.0);
        let alloc =
            Allocation::initial(die_cells(8.0, 8.0, 2, 2), &netlist, true).unwrap();
        assert!(!alloc.must_be_refined(0.95));
    }

    #[test]
    fn test_neighbours_share_an_edge() {
        let netlist = netlist_with_square("m", 2.0, 2.0, 4.0);
        let alloc =
            Allocation::initial(die_cells(8.0, 8.0, 2, 2), &netlist, true).unwrap();
        // Cells are row-major from the bottom: 0 and 3 only touch
        // diagonally at a corner.
        assert_eq!(alloc.neighbours(0, 1e-9), vec![1, 2]);
        assert_eq!(alloc.neighbours(3, 1e-9), vec![1, 2]);
    }
}
