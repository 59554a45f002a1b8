//! JSON/CSV format conversion.
//!
//! Everything in this module is pure: no state is kept between calls.

mod csv_to_json;
mod detect;
mod json_to_csv;

use std::borrow::Cow;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use crate::error::{ConvertFlowError, Result};

pub use csv_to_json::{coerce, csv_to_json, csv_to_records, parse_row, CellValue};
pub use detect::{detect_format, DetectedFormat};
pub use json_to_csv::{escape_cell, json_to_csv, render_cell};

/// Largest magnitude at which an integral float is still an exact integer (2^53 - 1).
/// Both directions treat integral floats up to here as integers.
const MAX_SAFE_INTEGER: f64 = 9_007_199_254_740_991.0;

/// Target format of a conversion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Format {
    Csv,
    Json,
}

impl Format {
    pub fn as_str(&self) -> &'static str {
        match self {
            Format::Csv => "csv",
            Format::Json => "json",
        }
    }
}

impl FromStr for Format {
    type Err = ConvertFlowError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "csv" => Ok(Format::Csv),
            "json" => Ok(Format::Json),
            _ => Err(ConvertFlowError::invalid(
                "Missing or invalid 'to' field. Use 'csv' or 'json'.",
            )),
        }
    }
}

impl fmt::Display for Format {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Direction of a conversion, as recorded in the conversion log.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    JsonToCsv,
    CsvToJson,
}

impl From<Format> for Direction {
    fn from(target: Format) -> Self {
        match target {
            Format::Csv => Direction::JsonToCsv,
            Format::Json => Direction::CsvToJson,
        }
    }
}

/// Data handed to the converter.
#[derive(Debug, Clone, PartialEq)]
pub enum Payload {
    /// Raw text: JSON or CSV depending on the target.
    Text(String),
    /// An already-parsed JSON value, only valid when converting to CSV.
    Structured(Value),
}

impl From<Value> for Payload {
    fn from(value: Value) -> Self {
        match value {
            Value::String(s) => Payload::Text(s),
            other => Payload::Structured(other),
        }
    }
}

/// A single conversion job.
#[derive(Debug, Clone, PartialEq)]
pub struct ConversionRequest {
    pub payload: Payload,
    pub target: Format,
}

impl ConversionRequest {
    pub fn new(payload: impl Into<Payload>, target: Format) -> Self {
        Self {
            payload: payload.into(),
            target,
        }
    }

    /// The text the converter will read.
    ///
    /// Structured payloads are serialized for CSV targets and rejected for
    /// JSON targets, which need raw CSV.
    pub fn input_text(&self) -> Result<Cow<'_, str>> {
        match (&self.payload, self.target) {
            (Payload::Text(text), _) => Ok(Cow::Borrowed(text)),
            (Payload::Structured(value), Format::Csv) => Ok(Cow::Owned(value.to_string())),
            (Payload::Structured(_), Format::Json) => Err(ConvertFlowError::invalid(
                "For CSV to JSON conversion, 'data' must be a CSV string.",
            )),
        }
    }

    pub fn direction(&self) -> Direction {
        self.target.into()
    }
}

/// Output of a successful conversion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConversionResult {
    pub format: Format,
    pub output: String,
}

impl ConversionResult {
    /// The result as it appears in an API response: CSV stays a string,
    /// JSON is embedded as structured data.
    pub fn to_wire_value(&self) -> Result<Value> {
        match self.format {
            Format::Csv => Ok(Value::String(self.output.clone())),
            Format::Json => serde_json::from_str(&self.output)
                .map_err(|e| ConvertFlowError::invalid(e.to_string())),
        }
    }
}

/// Run a conversion.
pub fn convert(request: &ConversionRequest) -> Result<ConversionResult> {
    let input = request.input_text()?;

    debug!(
        target_format = %request.target,
        input_len = input.len(),
        "Converting payload"
    );

    let output = match request.target {
        Format::Csv => json_to_csv(&input)?,
        Format::Json => csv_to_json(&input)?,
    };

    Ok(ConversionResult {
        format: request.target,
        output,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_format_parsing() {
        assert_eq!("csv".parse::<Format>().unwrap(), Format::Csv);
        assert_eq!("json".parse::<Format>().unwrap(), Format::Json);
        assert!("xml".parse::<Format>().is_err());
        assert!("CSV".parse::<Format>().is_err());
    }

    #[test]
    fn test_structured_payload_to_csv() {
        let request = ConversionRequest::new(json!([{"a": 1, "b": "x"}]), Format::Csv);
        let result = convert(&request).unwrap();
        assert_eq!(result.format, Format::Csv);
        assert_eq!(result.output, "a,b\n1,x");
    }

    #[test]
    fn test_stringified_payload_to_csv() {
        let request = ConversionRequest::new(json!(r#"[{"a":1}]"#), Format::Csv);
        assert_eq!(convert(&request).unwrap().output, "a\n1");
    }

    #[test]
    fn test_structured_payload_to_json_rejected() {
        let request = ConversionRequest::new(json!([{"a": 1}]), Format::Json);
        let err = convert(&request).unwrap_err();
        assert_eq!(
            err.to_string(),
            "For CSV to JSON conversion, 'data' must be a CSV string."
        );
    }

    #[test]
    fn test_csv_to_json_wire_value() {
        let request = ConversionRequest::new(Payload::Text("a,b\n1,hello".to_string()), Format::Json);
        let result = convert(&request).unwrap();
        assert_eq!(result.to_wire_value().unwrap(), json!([{"a": 1, "b": "hello"}]));
        assert_eq!(request.direction(), Direction::CsvToJson);
    }

    #[test]
    fn test_csv_wire_value_is_string() {
        let result = ConversionResult {
            format: Format::Csv,
            output: "a\n1".to_string(),
        };
        assert_eq!(result.to_wire_value().unwrap(), json!("a\n1"));
    }

    #[test]
    fn test_round_trip_restores_types() {
        let original = json!([
            {"id": 1, "name": "Ada", "active": true, "score": 9.5},
            {"id": 2, "name": "Doe, Jr.", "active": false, "nickname": "\"J\""},
            {"id": 3, "score": null}
        ]);
        let csv = json_to_csv(&original.to_string()).unwrap();
        let back: Value = serde_json::from_str(&csv_to_json(&csv).unwrap()).unwrap();

        assert_eq!(back[0]["id"], json!(1));
        assert_eq!(back[0]["active"], json!(true));
        assert_eq!(back[0]["score"], json!(9.5));
        assert_eq!(back[0]["nickname"], Value::Null);
        assert_eq!(back[1]["name"], json!("Doe, Jr."));
        assert_eq!(back[1]["nickname"], json!("\"J\""));
        assert_eq!(back[2]["name"], Value::Null);
        assert_eq!(back[2]["score"], Value::Null);
    }
}
