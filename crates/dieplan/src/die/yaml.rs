use crate::diag::{bail, StrResult};
use crate::geom::{Rect, Shape};
use crate::yaml;

/// Parse the YAML description of a die: its width and height and the list
/// of tagged rectangles (regions and blockages).
pub(super) fn parse_die(src: &str) -> StrResult<(Shape, Vec<Rect>)> {
    let doc = yaml::parse(src)?;
    let mapping = yaml::expect_mapping(&doc, "die description")?;

    let mut width = None;
    let mut height = None;
    let mut rects = vec![];

    for (key, value) in mapping {
        match yaml::expect_str(key, "die key")? {
            "Width" => width = Some(yaml::expect_positive(value, "die width")?),
            "Height" => height = Some(yaml::expect_positive(value, "die height")?),
            "Regions" => {
                for row in yaml::expect_sequence(value, "Regions")? {
                    let rect = yaml::expect_rect(row, "die region")?;
                    if rect.tag.is_ground() {
                        bail!("die region {rect:?} must carry a region tag");
                    }
                    rects.push(rect);
                }
            }
            other => bail!("unknown die key: {other:?}"),
        }
    }

    match (width, height) {
        (Some(w), Some(h)) => Ok((Shape::new(w, h), rects)),
        _ => bail!("die description must specify Width and Height"),
    }
}
