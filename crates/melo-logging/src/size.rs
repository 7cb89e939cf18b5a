// File: src/size.rs
// Purpose: Human-readable byte sizes ("10MB" <-> 10485760)

use once_cell::sync::Lazy;
use regex::Regex;
use thiserror::Error;

static SIZE_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^\s*(\d+(?:\.\d+)?)\s*(b|kb|mb|gb|tb)?\s*$").expect("size pattern is valid")
});

const UNITS: [&str; 5] = ["B", "KB", "MB", "GB", "TB"];

/// A size string that does not look like `<number><unit>`
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid size '{0}': expected a number optionally followed by B, KB, MB, GB or TB")]
pub struct SizeParseError(pub String);

/// Parse a size such as `"10MB"`, `"512 kb"` or `"1.5GB"` into bytes.
///
/// Units are binary (1 KB = 1024 B). A bare number is taken as bytes.
pub fn parse_size(input: &str) -> Result<u64, SizeParseError> {
    let caps = SIZE_PATTERN
        .captures(input)
        .ok_or_else(|| SizeParseError(input.to_string()))?;

    let value: f64 = caps[1]
        .parse()
        .map_err(|_| SizeParseError(input.to_string()))?;

    let unit = caps
        .get(2)
        .map(|m| m.as_str().to_ascii_uppercase())
        .unwrap_or_else(|| "B".to_string());

    let exponent = UNITS
        .iter()
        .position(|u| *u == unit)
        .ok_or_else(|| SizeParseError(input.to_string()))?;

    Ok((value * 1024f64.powi(exponent as i32)).floor() as u64)
}

/// Format a byte count for humans, e.g. `1536` -> `"1.5 KB"`.
pub fn format_size(bytes: u64) -> String {
    if bytes == 0 {
        return "0 B".to_string();
    }

    let exponent = ((bytes as f64).ln() / 1024f64.ln()).floor() as usize;
    let exponent = exponent.min(UNITS.len() - 1);
    let value = bytes as f64 / 1024f64.powi(exponent as i32);

    // Two decimals at most, trailing zeros trimmed
    let rounded = (value * 100.0).round() / 100.0;
    format!("{} {}", rounded, UNITS[exponent])
}
