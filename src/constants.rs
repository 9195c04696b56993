/// Column headers and other fixed names shared across the importer.
///
/// Header aliases are matched case-insensitively after trimming, so each list
/// only spells out genuinely different column names.

// Broker identity and scalar columns
pub const BROKER_NAME_COLUMNS: &[&str] = &["Broker Name", "Broker", "Name"];
pub const RATING_COLUMNS: &[&str] = &["Rating", "Overall Rating"];
pub const REVIEW_COUNT_COLUMNS: &[&str] = &["Review Count", "Reviews", "Number of Reviews"];
pub const LOGO_COLUMNS: &[&str] = &["Logo URL", "Logo"];

// Free-text columns fed through the extraction heuristics
pub const PROS_COLUMNS: &[&str] = &["Main Pros", "Pros"];
pub const CONS_COLUMNS: &[&str] = &["Main Cons", "Cons"];
pub const KEY_FEATURES_COLUMNS: &[&str] = &["Key Trading Features", "Key Features"];
pub const REGULATION_COLUMNS: &[&str] = &[
    "Country / Regulation info",
    "Regulation",
    "Regulators",
];
pub const MINIMUM_DEPOSIT_COLUMNS: &[&str] = &["Minimum Deposit", "Min Deposit"];
pub const REVIEW_LINK_COLUMNS: &[&str] = &["Review Page Link", "Review URL"];
pub const FEES_COLUMNS: &[&str] = &["Fees", "Fee Structure"];

// Feature keys written to the features table
pub const FEATURE_KEY_PRO: &str = "pro";
pub const FEATURE_KEY_CON: &str = "con";
pub const FEATURE_KEY_MINIMUM_DEPOSIT: &str = "minimum_deposit";
/// Used for key-trading-feature items that carry no `key:` prefix
pub const FEATURE_KEY_GENERIC: &str = "key_feature";

// Default table names
pub const BROKERS_TABLE: &str = "brokers";
pub const FEATURES_TABLE: &str = "broker_features";
pub const REGULATION_TABLE: &str = "broker_regulation";

// Conflict keys used for PostgREST upserts
pub const BROKERS_CONFLICT_KEY: &str = "slug";
pub const FEATURES_CONFLICT_KEY: &str = "broker_id,feature_key,feature_value";
pub const REGULATION_CONFLICT_KEY: &str = "broker_id,country_code,regulator_name";

pub const DEFAULT_CONFIG_PATH: &str = "importer.toml";
pub const DEFAULT_TIMEOUT_SECONDS: u64 = 30;

pub const LOG_DIR: &str = "logs";
pub const LOG_FILE_NAME: &str = "importer.log";

/// Brokers checked by the verification step when no watch list is configured
pub fn default_watch_list() -> Vec<String> {
    ["XTB", "eToro", "Interactive Brokers", "Plus500", "IG", "Saxo"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}
