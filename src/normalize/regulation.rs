use once_cell::sync::Lazy;
use regex::Regex;

use crate::domain::RegulationRecord;

use super::country::country_code;
use super::Extraction;

static REGULATED_BY: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)^\s*regulated\s+by\s*:?\s*").expect("prefix pattern compiles"));

/// `Regulator (Country) trailing text`
static REGULATOR_ITEM: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(?P<regulator>[^()]+?)\s*\((?P<country>[^()]+)\)\s*(?P<rest>.*)$")
        .expect("regulator pattern compiles")
});

static LICENSE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b(?:licen[cs]e|reg(?:istration)?|frn|afsl)\b\s*(?:no\.?|number|#)?\s*:?\s*(?P<id>[A-Za-z0-9][A-Za-z0-9/\-]*)")
        .expect("license pattern compiles")
});

/// Which of the two free-text layouts a regulation cell uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegulationFormat {
    /// `Regulated by FCA (UK), ASIC (Australia)`
    RegulatedBy,
    /// `FCA (UK); CySEC (Cyprus)`
    RegulatorList,
}

pub fn detect_format(raw: &str) -> Option<RegulationFormat> {
    if REGULATED_BY.is_match(raw) {
        Some(RegulationFormat::RegulatedBy)
    } else if split_top_level(raw)
        .iter()
        .any(|item| REGULATOR_ITEM.is_match(item))
    {
        Some(RegulationFormat::RegulatorList)
    } else {
        None
    }
}

/// Regulator rows from a regulation cell. Items that do not look like
/// `Regulator (Country)` are dropped; a cell with no such item is unrecognized.
pub fn extract_regulation(raw: Option<&str>) -> Extraction<Vec<RegulationRecord>> {
    let Some(raw) = raw else {
        return Extraction::Absent;
    };

    let body = match detect_format(raw) {
        Some(RegulationFormat::RegulatedBy) => REGULATED_BY.replace(raw, "").into_owned(),
        Some(RegulationFormat::RegulatorList) => raw.to_string(),
        None => return Extraction::unrecognized(raw),
    };

    let records: Vec<RegulationRecord> = split_top_level(&body)
        .iter()
        .filter_map(|item| parse_item(item))
        .collect();

    if records.is_empty() {
        Extraction::unrecognized(raw)
    } else {
        Extraction::Parsed(records)
    }
}

fn parse_item(item: &str) -> Option<RegulationRecord> {
    let caps = REGULATOR_ITEM.captures(item.trim())?;

    let regulator = caps["regulator"].trim().trim_end_matches([':', '-']).trim();
    if regulator.is_empty() {
        return None;
    }

    // "(UK, Ireland)" keeps the first country
    let country_text = caps["country"].split([',', '/']).next().unwrap_or_default();
    let country = country_code(country_text)?;

    let mut record = RegulationRecord::new(regulator, country);
    record.license_id = LICENSE
        .captures(&caps["rest"])
        .map(|c| c["id"].to_string());
    Some(record)
}

/// Splits on `,` and `;` outside parentheses. The word `and` only separates
/// once the current item already holds a `(Country)` group, so names like
/// "Securities and Investments Commission" stay whole.
fn split_top_level(raw: &str) -> Vec<String> {
    let mut items = Vec::new();
    let mut current = String::new();
    let mut depth = 0usize;
    let lower = raw.to_ascii_lowercase();
    let mut idx = 0;

    while idx < raw.len() {
        let Some(c) = raw[idx..].chars().next() else {
            break;
        };

        match c {
            '(' => depth += 1,
            ')' => depth = depth.saturating_sub(1),
            ',' | ';' if depth == 0 => {
                items.push(std::mem::take(&mut current));
                idx += c.len_utf8();
                continue;
            }
            _ if depth == 0
                && c.is_whitespace()
                && current.contains(')')
                && lower[idx..].starts_with(" and ") =>
            {
                items.push(std::mem::take(&mut current));
                idx += " and ".len();
                continue;
            }
            _ => {}
        }

        current.push(c);
        idx += c.len_utf8();
    }
    items.push(current);

    items
        .into_iter()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}
