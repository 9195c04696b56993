use once_cell::sync::Lazy;
use regex::Regex;

use super::Extraction;

static NUMBER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\d+(?:[.,]\d+)?").expect("number pattern compiles"));

static INTEGER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\d[\d,]*").expect("integer pattern compiles"));

pub const MAX_RATING: f64 = 5.0;

/// First number in a free-text rating cell, e.g. `"4.5/5"` or `"Rated 4,2"`.
///
/// Values outside 0..=5 and cells without a number are unrecognized; callers
/// store them as a null rating.
pub fn extract_rating(raw: Option<&str>) -> Extraction<f64> {
    let Some(raw) = raw else {
        return Extraction::Absent;
    };

    let parsed = NUMBER
        .find(raw)
        .and_then(|m| m.as_str().replace(',', ".").parse::<f64>().ok())
        .filter(|v| (0.0..=MAX_RATING).contains(v));

    match parsed {
        Some(value) => Extraction::Parsed(value),
        None => Extraction::unrecognized(raw),
    }
}

/// First integer in a count cell; thousands separators are ignored.
pub fn extract_count(raw: Option<&str>) -> Extraction<i64> {
    let Some(raw) = raw else {
        return Extraction::Absent;
    };

    match INTEGER
        .find(raw)
        .and_then(|m| m.as_str().replace(',', "").parse::<i64>().ok())
    {
        Some(value) => Extraction::Parsed(value),
        None => Extraction::unrecognized(raw),
    }
}
