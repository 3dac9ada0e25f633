//! Shared helpers for the YAML documents the tools exchange.

use ecow::EcoString;
use serde_yaml::{Mapping, Value};

use crate::diag::{bail, StrResult};
use crate::geom::{Point, Rect, Shape, Tag};

/// Parse a YAML document into a value.
pub(crate) fn parse(src: &str) -> StrResult<Value> {
    serde_yaml::from_str(src).map_err(|err| crate::diag::error!("invalid YAML: {err}"))
}

/// Serialize a value into a YAML document.
pub(crate) fn write(value: &Value) -> EcoString {
    serde_yaml::to_string(value)
        .expect("YAML serialization cannot fail for value trees")
        .into()
}

/// Expect a mapping.
pub(crate) fn expect_mapping<'a>(value: &'a Value, what: &str) -> StrResult<&'a Mapping> {
    match value.as_mapping() {
        Some(mapping) => Ok(mapping),
        None => bail!("{what} must be a mapping"),
    }
}

/// Expect a sequence.
pub(crate) fn expect_sequence<'a>(value: &'a Value, what: &str) -> StrResult<&'a [Value]> {
    match value.as_sequence() {
        Some(seq) => Ok(seq.as_slice()),
        None => bail!("{what} must be a list"),
    }
}

/// Expect a finite number.
pub(crate) fn expect_f64(value: &Value, what: &str) -> StrResult<f64> {
    match value.as_f64() {
        Some(v) if v.is_finite() => Ok(v),
        _ => bail!("{what} must be a number"),
    }
}

/// Expect a strictly positive number.
pub(crate) fn expect_positive(value: &Value, what: &str) -> StrResult<f64> {
    let v = expect_f64(value, what)?;
    if v <= 0.0 {
        bail!("{what} must be positive");
    }
    Ok(v)
}

/// Expect a boolean.
pub(crate) fn expect_bool(value: &Value, what: &str) -> StrResult<bool> {
    match value.as_bool() {
        Some(b) => Ok(b),
        None => bail!("{what} must be a boolean"),
    }
}

/// Expect a string.
pub(crate) fn expect_str<'a>(value: &'a Value, what: &str) -> StrResult<&'a str> {
    match value.as_str() {
        Some(s) => Ok(s),
        None => bail!("{what} must be a string"),
    }
}

/// Parse a `[x, y, w, h]` or `[x, y, w, h, tag]` rectangle row.
pub(crate) fn expect_rect(value: &Value, what: &str) -> StrResult<Rect> {
    let row = expect_sequence(value, what)?;
    if row.len() < 4 || row.len() > 5 {
        bail!("{what} must be [x, y, w, h] with an optional region tag");
    }
    let x = expect_f64(&row[0], what)?;
    let y = expect_f64(&row[1], what)?;
    if x < 0.0 || y < 0.0 {
        bail!("{what} must have a non-negative center");
    }
    let w = expect_positive(&row[2], what)?;
    let h = expect_positive(&row[3], what)?;
    let mut rect = Rect::new(Point::new(x, y), Shape::new(w, h));
    if let Some(tag) = row.get(4) {
        rect = rect.with_tag(Tag::parse(expect_str(tag, what)?)?);
    }
    Ok(rect)
}

/// Emit a rectangle as a `[x, y, w, h]` row, with the tag appended when it
/// is not ground.
pub(crate) fn rect_row(rect: &Rect) -> Value {
    let mut row = vec![
        Value::from(rect.center.x),
        Value::from(rect.center.y),
        Value::from(rect.shape.w),
        Value::from(rect.shape.h),
    ];
    if !rect.tag.is_ground() {
        row.push(Value::from(rect.tag.as_str()));
    }
    Value::from(row)
}
