//! Input format sniffing.

use serde::de::IgnoredAny;
use serde::Serialize;

/// Best guess at what a pasted payload contains.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DetectedFormat {
    Json,
    Csv,
    Unknown,
}

/// Guess the format of `input`. Heuristic only; conversion still validates.
pub fn detect_format(input: &str) -> DetectedFormat {
    let trimmed = input.trim();

    if trimmed.starts_with('[') || trimmed.starts_with('{') {
        return match serde_json::from_str::<IgnoredAny>(trimmed) {
            Ok(_) => DetectedFormat::Json,
            Err(_) => DetectedFormat::Unknown,
        };
    }

    if trimmed.contains(',') && trimmed.contains('\n') {
        return DetectedFormat::Csv;
    }

    DetectedFormat::Unknown
}
