//! Turns loosely structured CSV rows into broker, feature and regulation records.
//!
//! Each free-text heuristic lives in its own module and reports an
//! [`Extraction`], so a cell that could not be understood shows up as a
//! warning on the entry instead of silently becoming an empty list.

pub mod country;
pub mod features;
pub mod rating;
pub mod regulation;
pub mod slug;

use serde_json::{json, Map, Value};
use tracing::debug;

use crate::constants::*;
use crate::domain::{BrokerRecord, FeatureRecord, NormalizedBroker, RegulationRecord};
use crate::ingestion::RawRow;

pub use slug::slugify;

/// Outcome of one parsing heuristic.
#[derive(Debug, Clone, PartialEq)]
pub enum Extraction<T> {
    Parsed(T),
    /// The cell had text the heuristic could not make sense of
    Unrecognized { raw: String },
    /// The column was missing or blank
    Absent,
}

impl<T> Extraction<T> {
    pub fn unrecognized(raw: &str) -> Self {
        Extraction::Unrecognized {
            raw: raw.to_string(),
        }
    }

    pub fn is_parsed(&self) -> bool {
        matches!(self, Extraction::Parsed(_))
    }

    pub fn parsed(self) -> Option<T> {
        match self {
            Extraction::Parsed(value) => Some(value),
            _ => None,
        }
    }

    /// Returns the parsed value, recording a warning for unrecognized input.
    fn take(self, field: &str, warnings: &mut Vec<String>) -> Option<T> {
        match self {
            Extraction::Parsed(value) => Some(value),
            Extraction::Unrecognized { raw } => {
                warnings.push(format!("{field}: unrecognized value {raw:?}"));
                None
            }
            Extraction::Absent => None,
        }
    }
}

/// Normalizes one CSV row. Returns `None` when the row has no usable broker name.
pub fn normalize_row(row: &RawRow) -> Option<NormalizedBroker> {
    let name = row.get(BROKER_NAME_COLUMNS)?;
    let slug = slugify(name);
    if slug.is_empty() {
        debug!("Skipping row with unsluggable broker name {:?}", name);
        return None;
    }

    let mut warnings = Vec::new();
    let mut broker = BrokerRecord::new(name, slug);

    broker.rating = rating::extract_rating(row.get(RATING_COLUMNS)).take("rating", &mut warnings);
    broker.review_count = rating::extract_count(row.get(REVIEW_COUNT_COLUMNS))
        .take("review_count", &mut warnings)
        .unwrap_or(0);
    broker.logo_url = row.get(LOGO_COLUMNS).map(|s| s.to_string());

    let mut features: Vec<FeatureRecord> = Vec::new();
    for (columns, key) in [(PROS_COLUMNS, FEATURE_KEY_PRO), (CONS_COLUMNS, FEATURE_KEY_CON)] {
        if let Some(rows) =
            features::extract_tagged_list(row.get(columns), key).take(key, &mut warnings)
        {
            features.extend(rows);
        }
    }

    let key_features = features::extract_key_features(row.get(KEY_FEATURES_COLUMNS))
        .take("key_trading_features", &mut warnings)
        .unwrap_or_default();
    features.extend(key_features.iter().cloned());

    let minimum_deposit = row.get(MINIMUM_DEPOSIT_COLUMNS);
    if let Some(deposit) = minimum_deposit {
        features.push(FeatureRecord::new(FEATURE_KEY_MINIMUM_DEPOSIT, deposit));
    }

    let regulation_text = row.get(REGULATION_COLUMNS);
    let regulations = regulation::extract_regulation(regulation_text)
        .take("regulation", &mut warnings)
        .unwrap_or_default();

    broker.features = features_blob(
        minimum_deposit,
        row.get(REVIEW_LINK_COLUMNS),
        &key_features,
    );
    broker.fees = match row.get(FEES_COLUMNS) {
        Some(summary) => json!({ "summary": summary }),
        None => Value::Object(Map::new()),
    };
    broker.regulation = regulation_blob(regulation_text, &regulations);

    if !warnings.is_empty() {
        debug!("{}: {}", broker.slug, warnings.join("; "));
    }

    Some(NormalizedBroker {
        broker,
        features,
        regulations,
        warnings,
        source: None,
    })
}

fn features_blob(
    minimum_deposit: Option<&str>,
    review_link: Option<&str>,
    key_features: &[FeatureRecord],
) -> Value {
    let mut blob = Map::new();
    if let Some(deposit) = minimum_deposit {
        blob.insert("minimum_deposit".into(), json!(deposit));
    }
    if let Some(link) = review_link {
        blob.insert("review_page_link".into(), json!(link));
    }
    if !key_features.is_empty() {
        // Repeated generic items are kept as a list under their key
        let mut keyed = Map::new();
        for feature in key_features {
            match keyed.get_mut(&feature.feature_key) {
                Some(Value::Array(values)) => values.push(json!(feature.feature_value)),
                Some(existing) => {
                    let first = existing.take();
                    *existing = json!([first, feature.feature_value]);
                }
                None => {
                    keyed.insert(feature.feature_key.clone(), json!(feature.feature_value));
                }
            }
        }
        blob.insert("key_trading_features".into(), Value::Object(keyed));
    }
    Value::Object(blob)
}

fn regulation_blob(raw: Option<&str>, regulations: &[RegulationRecord]) -> Value {
    let Some(raw) = raw else {
        return Value::Object(Map::new());
    };
    let regulators: Vec<Value> = regulations
        .iter()
        .map(|r| {
            json!({
                "regulator": r.regulator_name,
                "country": r.country_code,
                "license_id": r.license_id,
            })
        })
        .collect();
    json!({ "raw": raw, "regulators": regulators })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(pairs: &[(&str, &str)]) -> RawRow {
        RawRow::from_pairs(pairs.iter().map(|(k, v)| (*k, v.to_string())))
    }

    #[test]
    fn test_row_without_broker_name_is_skipped() {
        assert!(normalize_row(&row(&[("Rating", "4.5")])).is_none());
        assert!(normalize_row(&row(&[("Broker Name", "   "), ("Rating", "4.5")])).is_none());
        assert!(normalize_row(&row(&[("Broker Name", "???")])).is_none());
    }

    #[test]
    fn test_full_row() {
        let entry = normalize_row(&row(&[
            ("Broker Name", "XTB"),
            ("Overall Rating", "4.6/5"),
            ("Main Pros", "fast execution; low fees"),
            ("Main Cons", "limited products"),
            ("Key Trading Features", "Platforms: xStation 5; Copy trading"),
            ("Country / Regulation info", "Regulated by FCA (UK), CySEC (Cyprus)"),
            ("Minimum Deposit", "$0"),
            ("Review Page Link", "https://example.com/xtb-review"),
        ]))
        .unwrap();

        assert_eq!(entry.slug(), "xtb");
        assert_eq!(entry.broker.name, "XTB");
        assert_eq!(entry.broker.rating, Some(4.6));
        assert_eq!(entry.broker.review_count, 0);
        assert!(entry.broker.is_active);
        assert!(entry.warnings.is_empty());

        let keys: Vec<(&str, &str)> = entry
            .features
            .iter()
            .map(|f| (f.feature_key.as_str(), f.feature_value.as_str()))
            .collect();
        assert_eq!(
            keys,
            vec![
                ("pro", "fast execution"),
                ("pro", "low fees"),
                ("con", "limited products"),
                ("platforms", "xStation 5"),
                ("key_feature", "Copy trading"),
                ("minimum_deposit", "$0"),
            ]
        );

        assert_eq!(entry.regulations.len(), 2);
        assert_eq!(entry.regulations[1].country_code, "CY");
        assert_eq!(entry.broker.features["minimum_deposit"], "$0");
        assert_eq!(
            entry.broker.features["review_page_link"],
            "https://example.com/xtb-review"
        );
        assert_eq!(
            entry.broker.features["key_trading_features"]["platforms"],
            "xStation 5"
        );
        assert_eq!(entry.broker.regulation["regulators"][0]["regulator"], "FCA");
    }

    #[test]
    fn test_not_available_rating_is_null_with_warning() {
        let entry = normalize_row(&row(&[("Broker Name", "eToro"), ("Rating", "N/A")])).unwrap();
        assert_eq!(entry.broker.rating, None);
        assert_eq!(entry.warnings.len(), 1);
        assert!(entry.warnings[0].starts_with("rating"));
    }

    #[test]
    fn test_unrecognized_regulation_is_visible() {
        let entry = normalize_row(&row(&[
            ("Broker Name", "Offshore FX"),
            ("Country / Regulation info", "Unregulated"),
        ]))
        .unwrap();
        assert!(entry.regulations.is_empty());
        assert!(entry.warnings.iter().any(|w| w.starts_with("regulation")));
        assert_eq!(entry.broker.regulation["raw"], "Unregulated");
    }

    #[test]
    fn test_missing_columns_default() {
        let entry = normalize_row(&row(&[("Broker Name", "IG")])).unwrap();
        assert_eq!(entry.broker.rating, None);
        assert!(entry.features.is_empty());
        assert!(entry.regulations.is_empty());
        assert!(entry.warnings.is_empty());
        assert_eq!(entry.broker.fees, json!({}));
    }

    #[test]
    fn test_repeated_generic_key_features_become_a_list() {
        let entry = normalize_row(&row(&[
            ("Broker Name", "Saxo"),
            ("Key Trading Features", "Research tools; Options"),
        ]))
        .unwrap();
        assert_eq!(
            entry.broker.features["key_trading_features"]["key_feature"],
            json!(["Research tools", "Options"])
        );
    }
}
