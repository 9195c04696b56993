use serde::Deserialize;
use std::fs;
use std::path::Path;
use tracing::debug;

use crate::constants;
use crate::error::{ImportError, Result};

/// Settings read from the optional TOML file. Credentials never live here.
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    pub supabase: SupabaseSettings,
    pub tables: TableNames,
    pub verify: VerifyConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SupabaseSettings {
    pub timeout_seconds: u64,
}

impl Default for SupabaseSettings {
    fn default() -> Self {
        Self {
            timeout_seconds: constants::DEFAULT_TIMEOUT_SECONDS,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct TableNames {
    pub brokers: String,
    pub features: String,
    pub regulation: String,
}

impl Default for TableNames {
    fn default() -> Self {
        Self {
            brokers: constants::BROKERS_TABLE.to_string(),
            features: constants::FEATURES_TABLE.to_string(),
            regulation: constants::REGULATION_TABLE.to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct VerifyConfig {
    pub watch_list: Vec<String>,
}

impl Default for VerifyConfig {
    fn default() -> Self {
        Self {
            watch_list: constants::default_watch_list(),
        }
    }
}

impl Config {
    /// Load from `path`. A missing file means defaults; a malformed one is an error.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            debug!("No config file at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let content = fs::read_to_string(path).map_err(|e| {
            ImportError::Config(format!(
                "Failed to read config file '{}': {}",
                path.display(),
                e
            ))
        })?;

        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: Config = toml::from_str(content)?;
        Ok(config)
    }
}

/// Connection details for the hosted database, taken from the environment.
#[derive(Clone)]
pub struct Credentials {
    pub url: String,
    pub service_role_key: String,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("url", &self.url)
            .field("service_role_key", &"<redacted>")
            .finish()
    }
}

impl Credentials {
    /// Reads `SUPABASE_URL` (or `SUPABASE_PROJECT_REF`) and `SUPABASE_SERVICE_ROLE_KEY`.
    pub fn from_env() -> Result<Self> {
        // Allow either a full URL or a project ref
        let url = match std::env::var("SUPABASE_URL") {
            Ok(u) if !u.trim().is_empty() => u,
            _ => {
                let project_ref = std::env::var("SUPABASE_PROJECT_REF").map_err(|_| {
                    ImportError::Config(
                        "SUPABASE_URL or SUPABASE_PROJECT_REF must be set".to_string(),
                    )
                })?;
                format!("https://{}.supabase.co", project_ref.trim())
            }
        };

        let service_role_key = std::env::var("SUPABASE_SERVICE_ROLE_KEY").map_err(|_| {
            ImportError::Config("SUPABASE_SERVICE_ROLE_KEY must be set".to_string())
        })?;

        Ok(Self {
            url: url.trim().trim_end_matches('/').to_string(),
            service_role_key,
        })
    }
}
