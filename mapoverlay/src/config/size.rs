//! Byte sizes written the way people write them ("12MB", "500 KB").

use thiserror::Error;

const KB: u64 = 1024;
const MB: u64 = KB * 1024;
const GB: u64 = MB * 1024;

/// Recognized suffixes, longest first so "MB" wins over "M" and "B".
const UNITS: [(&str, u64); 7] = [
    ("GB", GB),
    ("MB", MB),
    ("KB", KB),
    ("G", GB),
    ("M", MB),
    ("K", KB),
    ("B", 1),
];

/// Error parsing a size string.
#[derive(Debug, Error, PartialEq, Eq)]
#[error("Invalid size '{0}' - expected a whole number with an optional KB, MB or GB suffix")]
pub struct SizeParseError(String);

/// Parse a size string into bytes.
///
/// Bare numbers are bytes. Suffixes are binary multiples and
/// case-insensitive; whitespace between number and suffix is allowed.
///
/// ```
/// use mapoverlay::config::parse_size;
///
/// assert_eq!(parse_size("12MB").unwrap(), 12 * 1024 * 1024);
/// assert_eq!(parse_size("500 kb").unwrap(), 500 * 1024);
/// assert_eq!(parse_size("0").unwrap(), 0);
/// ```
pub fn parse_size(input: &str) -> Result<usize, SizeParseError> {
    let invalid = || SizeParseError(input.to_string());
    let trimmed = input.trim();
    let upper = trimmed.to_ascii_uppercase();

    let (digits, multiplier) = UNITS
        .iter()
        .find_map(|(suffix, multiplier)| {
            upper
                .strip_suffix(suffix)
                .map(|rest| (rest.trim_end(), *multiplier))
        })
        .unwrap_or((upper.as_str(), 1));

    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return Err(invalid());
    }

    let value: u64 = digits.parse().map_err(|_| invalid())?;
    value
        .checked_mul(multiplier)
        .and_then(|bytes| usize::try_from(bytes).ok())
        .ok_or_else(invalid)
}

/// Format a byte count so [`parse_size`] reads it back unchanged.
///
/// Uses the largest unit that divides the count exactly.
///
/// ```
/// use mapoverlay::config::format_size;
///
/// assert_eq!(format_size(12 * 1024 * 1024), "12MB");
/// assert_eq!(format_size(1000), "1000");
/// ```
pub fn format_size(bytes: usize) -> String {
    let bytes = bytes as u64;
    [(GB, "GB"), (MB, "MB"), (KB, "KB")]
        .iter()
        .find(|(unit, _)| bytes >= *unit && bytes % unit == 0)
        .map(|(unit, suffix)| format!("{}{}", bytes / unit, suffix))
        .unwrap_or_else(|| bytes.to_string())
}

/// Format a byte count for people, rounding to one decimal.
pub fn display_size(bytes: u64) -> String {
    match bytes {
        b if b >= GB => format!("{:.1} GB", b as f64 / GB as f64),
        b if b >= MB => format!("{:.1} MB", b as f64 / MB as f64),
        b if b >= KB => format!("{:.1} KB", b as f64 / KB as f64),
        b => format!("{} B", b),
    }
}
