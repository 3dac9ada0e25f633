use serde_yaml::{Mapping, Value};

use crate::alloc::{Allocation, Cell};
use crate::diag::{bail, StrResult};
use crate::yaml;

/// Parse an allocation document: a list of `[[x, y, w, h], {module:
/// occupancy}, depth]` rows.
pub(super) fn parse_allocation(src: &str) -> StrResult<Allocation> {
    let doc = yaml::parse(src)?;
    let rows = yaml::expect_sequence(&doc, "allocation")?;

    let mut cells = Vec::with_capacity(rows.len());
    for row in rows {
        let parts = yaml::expect_sequence(row, "allocation cell")?;
        if parts.len() != 3 {
            bail!("allocation cell must be [rectangle, occupancies, depth]");
        }

        let rect = yaml::expect_rect(&parts[0], "allocation cell rectangle")?;
        let depth = match parts[2].as_u64() {
            Some(depth) => depth as u32,
            None => bail!("allocation cell depth must be a non-negative integer"),
        };

        let mut cell = Cell::new(rect, depth);
        for (name, ratio) in yaml::expect_mapping(&parts[1], "cell occupancies")? {
            let ratio = yaml::expect_f64(ratio, "occupancy")?;
            if !(0.0..=1.0).contains(&ratio) {
                bail!("occupancy must lie in [0, 1] (got {ratio})");
            }
            cell.set_occupancy(
                yaml::expect_str(name, "occupancy module")?.into(),
                ratio,
            );
        }
        cells.push(cell);
    }

    Ok(Allocation::new(cells))
}

/// Serialize an allocation, one row per cell in emission order.
pub(super) fn write_allocation(allocation: &Allocation) -> ecow::EcoString {
    let rows: Vec<Value> = allocation
        .cells()
        .iter()
        .map(|cell| {
            let mut occupancies = Mapping::new();
            for (name, ratio) in cell.occupancies() {
                occupancies.insert(Value::from(name.as_str()), Value::from(ratio));
            }
            Value::from(vec![
                yaml::rect_row(cell.rect()),
                Value::Mapping(occupancies),
                Value::from(cell.depth()),
            ])
        })
        .collect();
    yaml::write(&Value::from(rows))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_allocation_roundtrip() {
        let src = "\
- [[2, 2, 4, 4], {cpu: 0.5, mem: 0.25}, 0]
- [[6, 2, 4, 4], {cpu: 0.0}, 1]
";
        let alloc = Allocation::from_yaml(src).unwrap();
        assert_eq!(alloc.num_cells(), 2);
        assert_eq!(alloc.cells()[0].occupancy("cpu"), 0.5);
        assert_eq!(alloc.cells()[1].depth(), 1);

        let again = Allocation::from_yaml(&alloc.to_yaml()).unwrap();
        assert_eq!(again.num_cells(), 2);
        assert_eq!(again.cells()[0].occupancy("mem"), 0.25);
        assert_eq!(again.max_depth(), 1);
    }

    #[test]
    fn test_rejects_out_of_range_occupancy() {
        assert!(Allocation::from_yaml("- [[2, 2, 4, 4], {cpu: 1.5}, 0]").is_err());
    }
}
