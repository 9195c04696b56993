use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A broker row. `slug` is the identity; `id` is assigned by the store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BrokerRecord {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<Uuid>,
    pub slug: String,
    pub name: String,
    #[serde(default)]
    pub logo_url: Option<String>,
    /// 0 to 5, `None` when the source had no usable rating
    #[serde(default)]
    pub rating: Option<f64>,
    #[serde(default)]
    pub review_count: i64,
    #[serde(default)]
    pub features: serde_json::Value,
    #[serde(default)]
    pub fees: serde_json::Value,
    #[serde(default)]
    pub regulation: serde_json::Value,
    #[serde(default = "default_active")]
    pub is_active: bool,
}

fn default_active() -> bool {
    true
}

impl BrokerRecord {
    pub fn new(name: impl Into<String>, slug: impl Into<String>) -> Self {
        Self {
            id: None,
            slug: slug.into(),
            name: name.into(),
            logo_url: None,
            rating: None,
            review_count: 0,
            features: serde_json::Value::Object(Default::default()),
            fees: serde_json::Value::Object(Default::default()),
            regulation: serde_json::Value::Object(Default::default()),
            is_active: true,
        }
    }
}

/// One feature row. Unique on (broker, key, value).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureRecord {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub broker_id: Option<Uuid>,
    pub feature_key: String,
    pub feature_value: String,
}

impl FeatureRecord {
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            broker_id: None,
            feature_key: key.into(),
            feature_value: value.into(),
        }
    }

    pub fn conflict_key(&self) -> (Option<Uuid>, &str, &str) {
        (self.broker_id, &self.feature_key, &self.feature_value)
    }
}

/// One regulator entry. Unique on (broker, country, regulator).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegulationRecord {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub broker_id: Option<Uuid>,
    pub country_code: String,
    pub regulator_name: String,
    #[serde(default)]
    pub license_id: Option<String>,
}

impl RegulationRecord {
    pub fn new(regulator: impl Into<String>, country_code: impl Into<String>) -> Self {
        Self {
            broker_id: None,
            country_code: country_code.into(),
            regulator_name: regulator.into(),
            license_id: None,
        }
    }

    pub fn conflict_key(&self) -> (Option<Uuid>, &str, &str) {
        (self.broker_id, &self.country_code, &self.regulator_name)
    }
}

/// Everything the normalizer derived from one CSV row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NormalizedBroker {
    pub broker: BrokerRecord,
    pub features: Vec<FeatureRecord>,
    pub regulations: Vec<RegulationRecord>,
    /// Heuristics that did not recognize their input
    pub warnings: Vec<String>,
    /// Which file and line this entry came from
    pub source: Option<String>,
}

impl NormalizedBroker {
    pub fn slug(&self) -> &str {
        &self.broker.slug
    }
}
