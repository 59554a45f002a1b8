//! JSON to CSV conversion.

use std::borrow::Cow;
use std::collections::HashSet;

use serde_json::{Map, Number, Value};

use super::MAX_SAFE_INTEGER;
use crate::error::{ConvertFlowError, Result};

/// Convert a JSON array of objects into CSV text.
///
/// Columns are the union of all keys in first-seen order. Absent and `null`
/// values produce empty cells.
pub fn json_to_csv(input: &str) -> Result<String> {
    let parsed: Value = serde_json::from_str(input)
        .map_err(|e| ConvertFlowError::invalid(format!("Invalid JSON: {}", e)))?;

    let rows = match parsed {
        Value::Array(rows) => rows,
        _ => {
            return Err(ConvertFlowError::invalid(
                "JSON input must be an array of objects",
            ))
        }
    };

    if rows.is_empty() {
        return Err(ConvertFlowError::invalid("JSON array is empty"));
    }

    let objects = rows
        .iter()
        .map(|row| {
            row.as_object()
                .ok_or_else(|| ConvertFlowError::invalid("Each item in the array must be an object"))
        })
        .collect::<Result<Vec<&Map<String, Value>>>>()?;

    let headers = collect_headers(&objects);

    let mut lines = Vec::with_capacity(objects.len() + 1);
    lines.push(
        headers
            .iter()
            .map(|h| escape_cell(h))
            .collect::<Vec<_>>()
            .join(","),
    );

    for object in &objects {
        let line = headers
            .iter()
            .map(|h| object.get(*h).map(render_cell).unwrap_or_default())
            .collect::<Vec<_>>()
            .join(",");
        lines.push(line);
    }

    Ok(lines.join("\n"))
}

fn collect_headers<'a>(objects: &[&'a Map<String, Value>]) -> Vec<&'a str> {
    let mut seen = HashSet::new();
    let mut headers = Vec::new();

    for object in objects {
        for key in object.keys() {
            if seen.insert(key.as_str()) {
                headers.push(key.as_str());
            }
        }
    }

    headers
}

/// Render one JSON value as a CSV cell.
pub fn render_cell(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => format_number(n),
        Value::String(s) => escape_cell(s).into_owned(),
        Value::Array(_) | Value::Object(_) => escape_cell(&value.to_string()).into_owned(),
    }
}

/// Quote a cell iff it contains a comma, a double quote or a newline.
pub fn escape_cell(cell: &str) -> Cow<'_, str> {
    if cell.contains([',', '"', '\n']) {
        Cow::Owned(format!("\"{}\"", cell.replace('"', "\"\"")))
    } else {
        Cow::Borrowed(cell)
    }
}

fn format_number(n: &Number) -> String {
    match n.as_f64() {
        Some(f) if n.is_f64() && f.fract() == 0.0 && f.abs() <= MAX_SAFE_INTEGER => {
            (f as i64).to_string()
        }
        _ => n.to_string(),
    }
}
