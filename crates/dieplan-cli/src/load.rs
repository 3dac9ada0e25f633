use std::path::Path;

use dieplan::diag::{bail, StrResult};
use dieplan::die::Die;
use dieplan::geom::Shape;
use dieplan::netlist::Netlist;

/// Read and parse a netlist file.
pub fn read_netlist(path: &Path) -> StrResult<Netlist> {
    Netlist::from_yaml(&read(path)?)
}

/// Resolve a die specification: a bare `WIDTHxHEIGHT`, or the path of a
/// die file. The netlist contributes the fixed rectangles.
pub fn read_die(spec: &str, netlist: &Netlist) -> StrResult<Die> {
    let fixed = netlist.fixed_rectangles();
    match parse_pair(spec) {
        Some((w, h)) => Die::new(Shape::new(w, h), vec![], fixed),
        None => Die::from_yaml(&read(Path::new(spec))?, fixed),
    }
}

/// Parse an `AxB` pair of positive numbers, e.g. a die size or a grid.
pub fn parse_pair(spec: &str) -> Option<(f64, f64)> {
    let (a, b) = spec.split_once(['x', 'X'])?;
    let a: f64 = a.trim().parse().ok()?;
    let b: f64 = b.trim().parse().ok()?;
    (a > 0.0 && b > 0.0).then_some((a, b))
}

/// Read a file into a string.
fn read(path: &Path) -> StrResult<String> {
    match std::fs::read_to_string(path) {
        Ok(src) => Ok(src),
        Err(err) => bail!("failed to read {}: {err}", path.display()),
    }
}

/// Write an output document.
pub fn write(path: &Path, contents: &str) -> StrResult<()> {
    match std::fs::write(path, contents) {
        Ok(()) => Ok(()),
        Err(err) => bail!("failed to write {}: {err}", path.display()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_pair() {
        assert_eq!(parse_pair("30x20"), Some((30.0, 20.0)));
        assert_eq!(parse_pair("2.5X4"), Some((2.5, 4.0)));
        assert_eq!(parse_pair("die.yml"), None);
        assert_eq!(parse_pair("0x4"), None);
        assert_eq!(parse_pair("3x-4"), None);
    }
}
