use std::fmt::{self, Debug, Formatter};

use ecow::EcoString;
use indexmap::IndexMap;

use crate::diag::{bail, StrResult};
use crate::geom::{is_identifier, Point, Rect, Shape, Tag};

/// A logical unit to be placed on the die.
///
/// A module is *soft* (the floorplanner decides its shape), *hard* (fixed
/// shape, free position) or *fixed* (fixed shape and position). Its area
/// can be split over several die regions; the distinguished ground entry is
/// the part placed on free die area.
#[derive(Clone)]
pub struct Module {
    name: EcoString,
    area: IndexMap<Tag, f64>,
    center: Option<Point>,
    min_shape: Option<Shape>,
    fixed: bool,
    hard: bool,
    rects: Vec<Rect>,
}

impl Module {
    /// Create an empty module with the given name.
    pub fn new(name: &str) -> StrResult<Self> {
        if !is_identifier(name) {
            bail!("module name {name:?} is not a valid identifier");
        }
        Ok(Self {
            name: name.into(),
            area: IndexMap::new(),
            center: None,
            min_shape: None,
            fixed: false,
            hard: false,
            rects: vec![],
        })
    }

    /// Create a soft module with the given ground area.
    pub fn soft(name: &str, area: f64) -> StrResult<Self> {
        let mut module = Self::new(name)?;
        module.set_area(Tag::Ground, area)?;
        Ok(module)
    }

    /// The name of the module.
    pub fn name(&self) -> &EcoString {
        &self.name
    }

    /// Set the area the module requires in a region.
    pub fn set_area(&mut self, tag: Tag, area: f64) -> StrResult<()> {
        if tag.is_blockage() {
            bail!("module {}: no area can be assigned to blockages", self.name);
        }
        if area <= 0.0 {
            bail!("module {}: area must be positive", self.name);
        }
        self.area.insert(tag, area);
        Ok(())
    }

    /// The area the module requires in the given region.
    pub fn area(&self, tag: &Tag) -> f64 {
        self.area.get(tag).copied().unwrap_or(0.0)
    }

    /// The area the module requires on free die area.
    pub fn ground_area(&self) -> f64 {
        self.area(&Tag::Ground)
    }

    /// The total area over all regions.
    pub fn total_area(&self) -> f64 {
        self.area.values().sum()
    }

    /// The per-region area requirements.
    pub fn area_map(&self) -> &IndexMap<Tag, f64> {
        &self.area
    }

    /// The center of the module, if known.
    pub fn center(&self) -> Option<Point> {
        self.center
    }

    /// Update the center of the module.
    pub fn set_center(&mut self, center: Point) {
        self.center = Some(center);
    }

    /// The minimum bounding shape the module must be able to inhabit.
    pub fn min_shape(&self) -> Option<Shape> {
        self.min_shape
    }

    /// Set the minimum bounding shape.
    pub fn set_min_shape(&mut self, shape: Shape) -> StrResult<()> {
        if !(shape.w > 0.0 && shape.h > 0.0) {
            bail!("module {}: min_shape must be positive", self.name);
        }
        self.min_shape = Some(shape);
        Ok(())
    }

    /// Whether the module has fixed shape and position.
    pub fn is_fixed(&self) -> bool {
        self.fixed
    }

    /// Whether the module has a fixed shape. Fixed modules are hard.
    pub fn is_hard(&self) -> bool {
        self.hard || self.fixed
    }

    /// Whether the module is soft.
    pub fn is_soft(&self) -> bool {
        !self.is_hard()
    }

    /// Mark the module as fixed (implies hard).
    pub fn set_fixed(&mut self) {
        self.fixed = true;
        self.hard = true;
    }

    /// Mark the module as hard.
    pub fn set_hard(&mut self) {
        self.hard = true;
    }

    /// The pre-placed rectangles of the module, in input order.
    pub fn rectangles(&self) -> &[Rect] {
        &self.rects
    }

    /// Append a pre-placed rectangle.
    pub fn add_rectangle(&mut self, rect: Rect) -> StrResult<()> {
        if rect.tag.is_blockage() {
            bail!("module {}: rectangles cannot lie in blockages", self.name);
        }
        if (rect.fixed || rect.hard) && !rect.tag.is_ground() {
            bail!(
                "module {}: fixed and hard rectangles must lie on ground",
                self.name
            );
        }
        self.rects.push(rect);
        Ok(())
    }

    /// Replace all pre-placed rectangles.
    pub fn set_rectangles(&mut self, rects: Vec<Rect>) {
        self.rects = rects;
    }

    /// The total area of the pre-placed rectangles.
    pub fn rect_area(&self) -> f64 {
        self.rects.iter().map(|r| r.area()).sum()
    }

    /// The area-weighted center of the pre-placed rectangles.
    pub fn rect_centroid(&self) -> Option<Point> {
        let area = self.rect_area();
        (area > 0.0).then(|| {
            self.rects
                .iter()
                .fold(Point::zero(), |sum, r| sum + r.center * r.area())
                / area
        })
    }

    /// Give a rectangle-less soft module one square rectangle of its ground
    /// area, centered at its center (or the fallback point when unset).
    pub fn ensure_rectangle(&mut self, fallback: Point) {
        if self.rects.is_empty() {
            let center = *self.center.get_or_insert(fallback);
            let side = self.ground_area().sqrt();
            self.rects.push(Rect::new(center, Shape::splat(side)));
        }
    }

    /// Check the module invariants after construction.
    ///
    /// Hard and fixed modules must supply explicit rectangles whose total
    /// area matches the declared area; when they declare no area at all, it
    /// is derived from the rectangles instead.
    pub fn validate(&mut self) -> StrResult<()> {
        if self.is_hard() {
            if self.rects.is_empty() {
                bail!("module {}: hard and fixed modules need rectangles", self.name);
            }
            if self.area.is_empty() {
                for rect in &self.rects {
                    let sum = self.area.entry(rect.tag.clone()).or_insert(0.0);
                    *sum += rect.area();
                }
            } else {
                let declared = self.total_area();
                let actual = self.rect_area();
                if (declared - actual).abs() > 1e-6 * declared.max(1.0) {
                    bail!(
                        "module {}: rectangle area {actual} does not match \
                         declared area {declared}",
                        self.name
                    );
                }
            }
        }

        if self.area.is_empty() {
            bail!("module {}: no area given", self.name);
        }

        // Adopt the rectangle centroid when no center was declared.
        if self.center.is_none() {
            self.center = self.rect_centroid();
        }

        Ok(())
    }
}

impl Debug for Module {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        write!(f, "Module({})", self.name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_module_names_are_identifiers() {
        assert!(Module::new("cpu_0").is_ok());
        assert!(Module::new("0cpu").is_err());
        assert!(Module::new("").is_err());
    }

    #[test]
    fn test_hard_module_area_is_derived_from_rectangles() {
        let mut module = Module::new("mem").unwrap();
        module.set_hard();
        module
            .add_rectangle(Rect::new(Point::new(2.0, 2.0), Shape::new(4.0, 3.0)))
            .unwrap();
        module.validate().unwrap();
        assert_eq!(module.total_area(), 12.0);
        assert_eq!(module.center(), Some(Point::new(2.0, 2.0)));
    }

    #[test]
    fn test_hard_module_without_rectangles_is_rejected() {
        let mut module = Module::soft("mem", 12.0).unwrap();
        module.set_hard();
        assert!(module.validate().is_err());
    }

    #[test]
    fn test_square_synthesis() {
        let mut module = Module::soft("cpu", 16.0).unwrap();
        module.ensure_rectangle(Point::new(5.0, 5.0));
        assert_eq!(module.rectangles().len(), 1);
        assert_eq!(module.rectangles()[0].shape, Shape::splat(4.0));
        assert_eq!(module.center(), Some(Point::new(5.0, 5.0)));
    }
}
