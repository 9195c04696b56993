use crate::constants::FEATURE_KEY_GENERIC;
use crate::domain::FeatureRecord;

use super::Extraction;

/// Splits a `;`-delimited list (newlines also separate items), dropping blanks.
pub fn split_list(raw: &str) -> Vec<String> {
    raw.split([';', '\n'])
        .map(|item| item.trim().trim_start_matches('•').trim())
        .filter(|item| !item.is_empty())
        .map(|item| item.to_string())
        .collect()
}

/// `"fast execution; low fees"` becomes one `key` row per item, in order.
pub fn extract_tagged_list(raw: Option<&str>, key: &str) -> Extraction<Vec<FeatureRecord>> {
    let Some(raw) = raw else {
        return Extraction::Absent;
    };

    let items = split_list(raw);
    if items.is_empty() {
        return Extraction::unrecognized(raw);
    }

    Extraction::Parsed(
        items
            .into_iter()
            .map(|value| FeatureRecord::new(key, value))
            .collect(),
    )
}

/// Parses `"Key: value; Other key: value"` into keyed feature rows.
///
/// Items without a usable `key:` prefix are kept whole under the generic
/// key-feature key.
pub fn extract_key_features(raw: Option<&str>) -> Extraction<Vec<FeatureRecord>> {
    let Some(raw) = raw else {
        return Extraction::Absent;
    };

    let items = split_list(raw);
    if items.is_empty() {
        return Extraction::unrecognized(raw);
    }

    let features = items
        .into_iter()
        .map(|item| {
            if let Some((lhs, rhs)) = item.split_once(':') {
                let key = feature_key(lhs);
                let value = rhs.trim();
                if !key.is_empty() && !value.is_empty() {
                    return FeatureRecord::new(key, value);
                }
            }
            FeatureRecord::new(FEATURE_KEY_GENERIC, item)
        })
        .collect();

    Extraction::Parsed(features)
}

/// `"Min. Deposit"` -> `"min_deposit"`
pub fn feature_key(label: &str) -> String {
    label
        .to_lowercase()
        .split(|c: char| !c.is_ascii_alphanumeric())
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join("_")
}
