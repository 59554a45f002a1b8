//! CSV to JSON conversion.
//!
//! Input is processed one physical line at a time. A quoted field that spans
//! several lines is therefore not reassembled: each line is parsed on its own.

use serde::Serialize;
use serde_json::{Map, Number, Value};

use super::MAX_SAFE_INTEGER;
use crate::error::{ConvertFlowError, Result};

/// Spreadsheet exports often start with a UTF-8 byte order mark.
const BYTE_ORDER_MARK: char = '\u{feff}';

/// A CSV cell after type coercion.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum CellValue {
    Null,
    Bool(bool),
    Number(Number),
    String(String),
}

impl From<CellValue> for Value {
    fn from(cell: CellValue) -> Self {
        match cell {
            CellValue::Null => Value::Null,
            CellValue::Bool(b) => Value::Bool(b),
            CellValue::Number(n) => Value::Number(n),
            CellValue::String(s) => Value::String(s),
        }
    }
}

/// Convert CSV text into a pretty-printed JSON array of objects.
pub fn csv_to_json(input: &str) -> Result<String> {
    let records = csv_to_records(input)?;
    serde_json::to_string_pretty(&records).map_err(|e| ConvertFlowError::invalid(e.to_string()))
}

/// Parse CSV text into one JSON object per data row, keyed by header in header order.
///
/// Rows shorter than the header get `null` for the missing trailing cells;
/// extra cells beyond the header are dropped.
pub fn csv_to_records(input: &str) -> Result<Vec<Map<String, Value>>> {
    let lines: Vec<&str> = input
        .trim_start_matches(BYTE_ORDER_MARK)
        .trim()
        .split('\n')
        .collect();

    if lines.len() < 2 {
        return Err(ConvertFlowError::invalid(
            "CSV must have a header row and at least one data row",
        ));
    }

    let headers = parse_row(lines[0]);

    let records = lines[1..]
        .iter()
        .filter(|line| !line.trim().is_empty())
        .map(|line| {
            let values = parse_row(line);
            headers
                .iter()
                .enumerate()
                .map(|(i, header)| {
                    let raw = values.get(i).map(String::as_str).unwrap_or("");
                    (header.clone(), Value::from(coerce(raw)))
                })
                .collect::<Map<String, Value>>()
        })
        .collect();

    Ok(records)
}

/// Split a single CSV line into trimmed fields.
pub fn parse_row(line: &str) -> Vec<String> {
    let mut fields = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;
    let mut chars = line.chars().peekable();

    while let Some(c) = chars.next() {
        if in_quotes {
            if c == '"' {
                if chars.peek() == Some(&'"') {
                    current.push('"');
                    chars.next();
                } else {
                    in_quotes = false;
                }
            } else {
                current.push(c);
            }
        } else if c == '"' {
            in_quotes = true;
        } else if c == ',' {
            fields.push(current.trim().to_string());
            current.clear();
        } else {
            current.push(c);
        }
    }

    fields.push(current.trim().to_string());
    fields
}

/// Coerce a raw cell: empty is null, `true`/`false` are booleans, finite
/// decimal numbers are numbers, anything else stays a string.
pub fn coerce(raw: &str) -> CellValue {
    match raw {
        "" => CellValue::Null,
        "true" => CellValue::Bool(true),
        "false" => CellValue::Bool(false),
        _ => match parse_number(raw) {
            Some(n) => CellValue::Number(n),
            None => CellValue::String(raw.to_string()),
        },
    }
}

fn parse_number(raw: &str) -> Option<Number> {
    // f64::from_str also accepts "inf" and "NaN"; only plain decimal notation counts here.
    let numeric_chars = raw
        .chars()
        .all(|c| c.is_ascii_digit() || matches!(c, '+' | '-' | '.' | 'e' | 'E'));
    if !numeric_chars || !raw.chars().any(|c| c.is_ascii_digit()) {
        return None;
    }

    if let Ok(i) = raw.parse::<i64>() {
        return Some(Number::from(i));
    }

    let f = raw.parse::<f64>().ok().filter(|f| f.is_finite())?;
    if f.fract() == 0.0 && f.abs() <= MAX_SAFE_INTEGER {
        return Some(Number::from(f as i64));
    }
    Number::from_f64(f)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_simple_numeric_conversion() {
        let out = csv_to_json("a,b\n1,2").unwrap();
        let parsed: Value = serde_json::from_str(&out).unwrap();
        assert_eq!(parsed, json!([{"a": 1, "b": 2}]));
        assert!(parsed[0]["a"].is_number());
    }

    #[test]
    fn test_single_line_rejected() {
        let err = csv_to_json("only one line").unwrap_err();
        assert!(matches!(err, ConvertFlowError::InvalidInput(_)));
    }

    #[test]
    fn test_empty_input_rejected() {
        assert!(csv_to_json("").is_err());
        assert!(csv_to_json("   \n\n  ").is_err());
    }

    #[test]
    fn test_trailing_blank_lines_do_not_count_as_rows() {
        assert!(csv_to_json("a,b\n\n\n").is_err());
    }

    #[test]
    fn test_blank_data_rows_are_skipped() {
        let records = csv_to_records("name\nalice\n   \n\nbob").unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[1]["name"], json!("bob"));
    }

    #[test]
    fn test_coercion_rules() {
        assert_eq!(coerce(""), CellValue::Null);
        assert_eq!(coerce("true"), CellValue::Bool(true));
        assert_eq!(coerce("false"), CellValue::Bool(false));
        assert_eq!(coerce("TRUE"), CellValue::String("TRUE".to_string()));
        assert_eq!(coerce("42"), CellValue::Number(Number::from(42)));
        assert_eq!(coerce("-7"), CellValue::Number(Number::from(-7)));
        assert_eq!(coerce("1.5"), CellValue::Number(Number::from_f64(1.5).unwrap()));
        assert_eq!(coerce("1e3"), CellValue::Number(Number::from(1000)));
        assert_eq!(coerce("2.0"), CellValue::Number(Number::from(2)));
        assert_eq!(coerce("12abc"), CellValue::String("12abc".to_string()));
    }

    #[test]
    fn test_non_finite_and_word_numbers_stay_strings() {
        for raw in ["inf", "Infinity", "NaN", "nan", "1e400", "-", ".", "e5"] {
            assert_eq!(coerce(raw), CellValue::String(raw.to_string()), "{raw}");
        }
    }

    #[test]
    fn test_only_decimal_notation_is_numeric() {
        // Hex, octal and binary literals are kept verbatim.
        for raw in ["0x1F", "0o17", "0b101", "1_000"] {
            assert_eq!(coerce(raw), CellValue::String(raw.to_string()), "{raw}");
        }
    }

    #[test]
    fn test_large_integral_floats_become_integers() {
        assert_eq!(
            coerce("9007199254740991.0"),
            CellValue::Number(Number::from(9_007_199_254_740_991_i64))
        );
        assert!(matches!(coerce("1e300"), CellValue::Number(n) if n.is_f64()));
    }

    #[test]
    fn test_byte_order_mark_is_stripped() {
        let records = csv_to_records("\u{feff}a,b\n1,2").unwrap();
        let keys: Vec<&String> = records[0].keys().collect();
        assert_eq!(keys, vec!["a", "b"]);
        assert_eq!(records[0]["a"], json!(1));
    }

    #[test]
    fn test_parse_row_quoting() {
        assert_eq!(parse_row("a,b,c"), vec!["a", "b", "c"]);
        assert_eq!(parse_row(r#""Doe, Jr.",x"#), vec!["Doe, Jr.", "x"]);
        assert_eq!(parse_row(r#""say ""hi""",y"#), vec![r#"say "hi""#, "y"]);
        assert_eq!(parse_row(" a , b "), vec!["a", "b"]);
        assert_eq!(parse_row("a,"), vec!["a", ""]);
    }

    #[test]
    fn test_unterminated_quote_swallows_rest_of_line() {
        assert_eq!(parse_row(r#""open,still open"#), vec!["open,still open"]);
    }

    #[test]
    fn test_multiline_quoted_field_is_split_per_line() {
        // The scanner only sees one physical line at a time.
        let records = csv_to_records("note,id\n\"first\nsecond\",1").unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0]["note"], json!("first"));
        assert_eq!(records[0]["id"], Value::Null);
        assert_eq!(records[1]["note"], json!("second,1"));
        assert_eq!(records[1]["id"], Value::Null);
    }

    #[test]
    fn test_ragged_rows_fill_with_null() {
        let records = csv_to_records("a,b,c\n1").unwrap();
        assert_eq!(records[0]["a"], json!(1));
        assert_eq!(records[0]["b"], Value::Null);
        assert_eq!(records[0]["c"], Value::Null);
    }

    #[test]
    fn test_extra_cells_dropped() {
        let records = csv_to_records("a\n1,2,3").unwrap();
        assert_eq!(records[0].len(), 1);
    }

    #[test]
    fn test_key_order_follows_header() {
        let records = csv_to_records("z,a,m\n1,2,3").unwrap();
        let keys: Vec<&String> = records[0].keys().collect();
        assert_eq!(keys, vec!["z", "a", "m"]);
    }

    #[test]
    fn test_crlf_line_endings() {
        let records = csv_to_records("a,b\r\n1,x\r\n").unwrap();
        assert_eq!(records[0]["b"], json!("x"));
    }

    #[test]
    fn test_pretty_output_is_two_space_indented() {
        let out = csv_to_json("a\n1").unwrap();
        assert_eq!(out, "[\n  {\n    \"a\": 1\n  }\n]");
    }

    #[test]
    fn test_unicode_passes_through() {
        let records = csv_to_records("city\nZürich\n東京").unwrap();
        assert_eq!(records[0]["city"], json!("Zürich"));
        assert_eq!(records[1]["city"], json!("東京"));
    }
}
