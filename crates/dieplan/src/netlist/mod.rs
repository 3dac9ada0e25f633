//! The netlist model: modules and the weighted hyperedges connecting them.

mod edge;
mod module;
mod yaml;

use ecow::EcoString;
use indexmap::IndexMap;

use crate::diag::{bail, StrResult};
use crate::geom::{Point, Rect};

pub use self::edge::HyperEdge;
pub use self::module::Module;

/// A netlist: an ordered set of modules and the hyperedges over them.
#[derive(Debug, Clone)]
pub struct Netlist {
    modules: IndexMap<EcoString, Module>,
    edges: Vec<HyperEdge>,
}

impl Netlist {
    /// Create a netlist from modules and name-based edges.
    ///
    /// Validates module invariants, rejects duplicate module names, edges
    /// over unknown modules, self-loops and non-positive weights.
    pub fn new(
        modules: Vec<Module>,
        edges: Vec<(Vec<EcoString>, f64)>,
    ) -> StrResult<Self> {
        let mut map = IndexMap::with_capacity(modules.len());
        for mut module in modules {
            module.validate()?;
            let name = module.name().clone();
            if map.insert(name.clone(), module).is_some() {
                bail!("duplicate module name: {name}");
            }
        }

        let mut resolved = Vec::with_capacity(edges.len());
        for (names, weight) in edges {
            if weight <= 0.0 {
                bail!("edge weight must be positive (edge over {names:?})");
            }
            if names.len() < 2 {
                bail!("edges must connect at least two modules (got {names:?})");
            }
            let mut indices = Vec::with_capacity(names.len());
            for name in &names {
                let Some(index) = map.get_index_of(name.as_str()) else {
                    bail!("edge references unknown module {name}");
                };
                if indices.contains(&index) {
                    bail!("edge mentions module {name} twice");
                }
                indices.push(index);
            }
            resolved.push(HyperEdge { modules: indices, weight });
        }

        Ok(Self { modules: map, edges: resolved })
    }

    /// Parse a netlist from its YAML description.
    pub fn from_yaml(src: &str) -> StrResult<Self> {
        yaml::parse_netlist(src)
    }

    /// Serialize the netlist to YAML.
    pub fn to_yaml(&self) -> EcoString {
        yaml::write_netlist(self)
    }

    /// The number of modules.
    pub fn num_modules(&self) -> usize {
        self.modules.len()
    }

    /// Iterate over the modules in insertion order.
    pub fn modules(&self) -> impl ExactSizeIterator<Item = &Module> {
        self.modules.values()
    }

    /// The module at the given index.
    pub fn module(&self, index: usize) -> &Module {
        &self.modules[index]
    }

    /// Mutable access to the module at the given index.
    pub fn module_mut(&mut self, index: usize) -> &mut Module {
        &mut self.modules[index]
    }

    /// The index of the module with the given name.
    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.modules.get_index_of(name)
    }

    /// The module with the given name.
    pub fn by_name(&self, name: &str) -> Option<&Module> {
        self.modules.get(name)
    }

    /// The hyperedges, in declaration order.
    pub fn edges(&self) -> &[HyperEdge] {
        &self.edges
    }

    /// The rectangles of all fixed modules, marked fixed and hard, for
    /// constructing a die.
    pub fn fixed_rectangles(&self) -> Vec<Rect> {
        self.modules
            .values()
            .filter(|module| module.is_fixed())
            .flat_map(|module| module.rectangles())
            .map(|rect| rect.clone().with_fixed(true).with_hard(true))
            .collect()
    }

    /// Give every rectangle-less soft module a synthesized square (see
    /// [`Module::ensure_rectangle`]).
    pub fn create_squares(&mut self, fallback: Point) {
        for module in self.modules.values_mut() {
            if module.is_soft() {
                module.ensure_rectangle(fallback);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geom::{Point, Shape};

    fn simple_modules() -> Vec<Module> {
        vec![Module::soft("a", 4.0).unwrap(), Module::soft("b", 9.0).unwrap()]
    }

    #[test]
    fn test_edges_are_resolved_in_order() {
        let netlist =
            Netlist::new(simple_modules(), vec![(vec!["b".into(), "a".into()], 2.0)])
                .unwrap();
        assert_eq!(netlist.edges(), [HyperEdge { modules: vec![1, 0], weight: 2.0 }]);
    }

    #[test]
    fn test_rejects_bad_edges() {
        let edge = |names: Vec<EcoString>, weight| {
            Netlist::new(simple_modules(), vec![(names, weight)])
        };
        assert!(edge(vec!["a".into(), "c".into()], 1.0).is_err());
        assert!(edge(vec!["a".into(), "a".into()], 1.0).is_err());
        assert!(edge(vec!["a".into()], 1.0).is_err());
        assert!(edge(vec!["a".into(), "b".into()], 0.0).is_err());
    }

    #[test]
    fn test_rejects_duplicate_modules() {
        let modules =
            vec![Module::soft("a", 4.0).unwrap(), Module::soft("a", 9.0).unwrap()];
        assert!(Netlist::new(modules, vec![]).is_err());
    }

    #[test]
    fn test_fixed_rectangles() {
        let mut fixed = Module::new("rom").unwrap();
        fixed.set_fixed();
        fixed
            .add_rectangle(Rect::new(Point::new(2.0, 2.0), Shape::new(4.0, 3.0)))
            .unwrap();
        let netlist = Netlist::new(
            vec![fixed, Module::soft("b", 9.0).unwrap()],
            vec![],
        )
        .unwrap();
        let rects = netlist.fixed_rectangles();
        assert_eq!(rects.len(), 1);
        assert!(rects[0].fixed && rects[0].hard);
    }
}
