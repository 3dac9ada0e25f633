use ecow::EcoString;
use serde_yaml::{Mapping, Value};

use crate::diag::{bail, StrResult};
use crate::geom::{Point, Shape, Tag};
use crate::netlist::{Module, Netlist};
use crate::yaml;

/// Parse a netlist document: a `Modules` mapping and an optional `Nets`
/// list.
pub(super) fn parse_netlist(src: &str) -> StrResult<Netlist> {
    let doc = yaml::parse(src)?;
    let mapping = yaml::expect_mapping(&doc, "netlist")?;

    let mut modules = vec![];
    let mut edges = vec![];

    for (key, value) in mapping {
        match yaml::expect_str(key, "netlist key")? {
            "Modules" => {
                for (name, body) in yaml::expect_mapping(value, "Modules")? {
                    modules.push(parse_module(
                        yaml::expect_str(name, "module name")?,
                        body,
                    )?);
                }
            }
            "Nets" => {
                for row in yaml::expect_sequence(value, "Nets")? {
                    edges.push(parse_edge(row)?);
                }
            }
            other => bail!("unknown netlist key: {other:?}"),
        }
    }

    Netlist::new(modules, edges)
}

/// Parse one module body.
fn parse_module(name: &str, body: &Value) -> StrResult<Module> {
    let mut module = Module::new(name)?;
    let mut fixed = false;
    let mut hard = false;

    for (key, value) in yaml::expect_mapping(body, "module body")? {
        match yaml::expect_str(key, "module key")? {
            "area" => parse_area(&mut module, value)?,
            "center" => {
                let pair = yaml::expect_sequence(value, "module center")?;
                if pair.len() != 2 {
                    bail!("module {name}: center must be [x, y]");
                }
                module.set_center(Point::new(
                    yaml::expect_f64(&pair[0], "center x")?,
                    yaml::expect_f64(&pair[1], "center y")?,
                ));
            }
            "min_shape" => {
                let pair = yaml::expect_sequence(value, "module min_shape")?;
                if pair.len() != 2 {
                    bail!("module {name}: min_shape must be [w, h]");
                }
                module.set_min_shape(Shape::new(
                    yaml::expect_f64(&pair[0], "min_shape width")?,
                    yaml::expect_f64(&pair[1], "min_shape height")?,
                ))?;
            }
            "fixed" => fixed = yaml::expect_bool(value, "fixed")?,
            "hard" => hard = yaml::expect_bool(value, "hard")?,
            "rectangles" => {
                for row in yaml::expect_sequence(value, "module rectangles")? {
                    module.add_rectangle(yaml::expect_rect(row, "module rectangle")?)?;
                }
            }
            other => bail!("module {name}: unknown key {other:?}"),
        }
    }

    if fixed && hard {
        bail!("module {name}: fixed and hard are mutually exclusive (fixed implies hard)");
    }
    if fixed {
        module.set_fixed();
    } else if hard {
        module.set_hard();
    }

    Ok(module)
}

/// Parse an `area` value: a number (ground area) or a tag → number map.
fn parse_area(module: &mut Module, value: &Value) -> StrResult<()> {
    match value {
        Value::Mapping(map) => {
            for (tag, area) in map {
                module.set_area(
                    Tag::parse(yaml::expect_str(tag, "area tag")?)?,
                    yaml::expect_positive(area, "module area")?,
                )?;
            }
            Ok(())
        }
        _ => module.set_area(Tag::Ground, yaml::expect_positive(value, "module area")?),
    }
}

/// Parse one net row: `[m1, ..., mk]` or `[m1, ..., mk, weight]`.
fn parse_edge(row: &Value) -> StrResult<(Vec<EcoString>, f64)> {
    let items = yaml::expect_sequence(row, "net")?;
    let mut names: Vec<EcoString> = vec![];
    let mut weight = 1.0;
    for (i, item) in items.iter().enumerate() {
        match item {
            Value::String(name) => names.push(name.as_str().into()),
            _ if i + 1 == items.len() => {
                weight = yaml::expect_f64(item, "net weight")?;
            }
            _ => bail!("net members must be module names"),
        }
    }
    Ok((names, weight))
}

/// Serialize a netlist following the canonical dump rules: soft modules
/// emit their area, center and minimum shape; hard modules only their flag
/// and rectangles; weights are omitted when they are one.
pub(super) fn write_netlist(netlist: &Netlist) -> EcoString {
    let mut modules = Mapping::new();
    for module in netlist.modules() {
        modules.insert(Value::from(module.name().as_str()), write_module(module));
    }

    let mut nets = vec![];
    for edge in netlist.edges() {
        let mut row: Vec<Value> = edge
            .modules
            .iter()
            .map(|&m| Value::from(netlist.module(m).name().as_str()))
            .collect();
        if edge.weight != 1.0 {
            row.push(Value::from(edge.weight));
        }
        nets.push(Value::from(row));
    }

    let mut doc = Mapping::new();
    doc.insert(Value::from("Modules"), Value::Mapping(modules));
    if !nets.is_empty() {
        doc.insert(Value::from("Nets"), Value::from(nets));
    }
    yaml::write(&Value::Mapping(doc))
}

fn write_module(module: &Module) -> Value {
    let mut body = Mapping::new();

    if !module.is_hard() {
        let area = module.area_map();
        if area.len() == 1 && area.contains_key(&Tag::Ground) {
            body.insert(Value::from("area"), Value::from(module.ground_area()));
        } else {
            let mut map = Mapping::new();
            for (tag, &value) in area {
                map.insert(Value::from(tag.as_str()), Value::from(value));
            }
            body.insert(Value::from("area"), Value::Mapping(map));
        }

        if let Some(center) = module.center() {
            body.insert(
                Value::from("center"),
                Value::from(vec![Value::from(center.x), Value::from(center.y)]),
            );
        }

        if let Some(shape) = module.min_shape() {
            body.insert(
                Value::from("min_shape"),
                Value::from(vec![Value::from(shape.w), Value::from(shape.h)]),
            );
        }
    }

    if module.is_fixed() {
        body.insert(Value::from("fixed"), Value::from(true));
    } else if module.is_hard() {
        body.insert(Value::from("hard"), Value::from(true));
    }

    if !module.rectangles().is_empty() {
        body.insert(
            Value::from("rectangles"),
            Value::from(
                module.rectangles().iter().map(yaml::rect_row).collect::<Vec<_>>(),
            ),
        );
    }

    Value::Mapping(body)
}

#[cfg(test)]
mod tests {
    use super::*;

    const EXAMPLE: &str = "\
Modules:
  cpu:
    area: 16
    center: [3, 3]
  mem:
    area: {ground: 8, io: 4}
  rom:
    fixed: true
    rectangles: [[2, 2, 4, 3]]
Nets:
  - [cpu, mem]
  - [cpu, mem, rom, 2.5]
";

    #[test]
    fn test_parse_netlist() {
        let netlist = Netlist::from_yaml(EXAMPLE).unwrap();
        assert_eq!(netlist.num_modules(), 3);

        let cpu = netlist.by_name("cpu").unwrap();
        assert_eq!(cpu.total_area(), 16.0);
        assert_eq!(cpu.center(), Some(Point::new(3.0, 3.0)));

        let mem = netlist.by_name("mem").unwrap();
        assert_eq!(mem.ground_area(), 8.0);
        assert_eq!(mem.area(&Tag::parse("io").unwrap()), 4.0);
        assert_eq!(mem.total_area(), 12.0);

        let rom = netlist.by_name("rom").unwrap();
        assert!(rom.is_fixed() && rom.is_hard());
        assert_eq!(rom.total_area(), 12.0);

        assert_eq!(netlist.edges().len(), 2);
        assert_eq!(netlist.edges()[0].weight, 1.0);
        assert_eq!(netlist.edges()[1].weight, 2.5);
        assert_eq!(netlist.edges()[1].modules, vec![0, 1, 2]);
    }

    #[test]
    fn test_netlist_roundtrip() {
        let netlist = Netlist::from_yaml(EXAMPLE).unwrap();
        let again = Netlist::from_yaml(&netlist.to_yaml()).unwrap();
        assert_eq!(again.num_modules(), 3);
        assert_eq!(again.by_name("mem").unwrap().total_area(), 12.0);
        assert_eq!(again.edges(), netlist.edges());
    }

    #[test]
    fn test_rejects_unknown_module_keys() {
        assert!(Netlist::from_yaml("Modules:\n  cpu: {area: 16, colour: red}").is_err());
        assert!(Netlist::from_yaml("Modules:\n  cpu: {area: 16, fixed: true, hard: true}")
            .is_err());
        assert!(Netlist::from_yaml("Blocks: {}").is_err());
    }
}
