use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_RANGE};
use reqwest::{Method, RequestBuilder, Response};
use std::collections::HashSet;
use std::hash::Hash;
use std::time::Duration;
use tracing::debug;
use uuid::Uuid;

use super::BrokerStore;
use crate::config::{Credentials, TableNames};
use crate::constants::{BROKERS_CONFLICT_KEY, FEATURES_CONFLICT_KEY, REGULATION_CONFLICT_KEY};
use crate::domain::{BrokerRecord, FeatureRecord, RegulationRecord};
use crate::error::{ImportError, Result};

const PREFER_MERGE: &str = "resolution=merge-duplicates,return=representation";
const PREFER_IGNORE: &str = "resolution=ignore-duplicates,return=minimal";
const PREFER_COUNT: &str = "count=exact";

/// Brokers database reached through Supabase's PostgREST endpoint.
pub struct SupabaseStore {
    client: reqwest::Client,
    rest_url: String,
    tables: TableNames,
}

impl std::fmt::Debug for SupabaseStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SupabaseStore")
            .field("rest_url", &self.rest_url)
            .field("tables", &self.tables)
            .finish()
    }
}

impl SupabaseStore {
    pub fn new(credentials: &Credentials, tables: TableNames, timeout: Duration) -> Result<Self> {
        let key = &credentials.service_role_key;
        let mut headers = HeaderMap::new();
        headers.insert("apikey", header_value(key)?);
        headers.insert(AUTHORIZATION, header_value(&format!("Bearer {key}"))?);

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(timeout)
            .build()?;

        Ok(Self {
            client,
            rest_url: rest_url(&credentials.url),
            tables,
        })
    }

    fn request(&self, method: Method, table: &str) -> RequestBuilder {
        self.client
            .request(method, format!("{}/{}", self.rest_url, table))
    }

    async fn count_rows(&self, table: &str, broker_id: Uuid) -> Result<usize> {
        let filter = format!("eq.{broker_id}");
        let resp = self
            .request(Method::GET, table)
            .header("Prefer", PREFER_COUNT)
            .query(&[("select", "broker_id"), ("broker_id", filter.as_str()), ("limit", "1")])
            .send()
            .await?;
        let resp = check(resp).await?;

        resp.headers()
            .get(CONTENT_RANGE)
            .and_then(|v| v.to_str().ok())
            .and_then(parse_content_range)
            .ok_or_else(|| ImportError::MissingField(format!("{table} Content-Range")))
    }
}

fn header_value(value: &str) -> Result<HeaderValue> {
    HeaderValue::from_str(value)
        .map_err(|e| ImportError::Config(format!("invalid header value for credentials: {e}")))
}

/// `https://x.supabase.co/` -> `https://x.supabase.co/rest/v1`
pub fn rest_url(base: &str) -> String {
    let base = base.trim().trim_end_matches('/');
    if base.ends_with("/rest/v1") {
        base.to_string()
    } else {
        format!("{base}/rest/v1")
    }
}

/// Total from a PostgREST `Content-Range` header such as `0-0/42` or `*/0`.
pub fn parse_content_range(value: &str) -> Option<usize> {
    value.rsplit_once('/')?.1.trim().parse().ok()
}

/// Drops rows whose conflict key already appeared earlier in the batch.
///
/// PostgREST rejects a single upsert that hits the same conflict target twice.
pub fn unique_by_key<T, K, F>(rows: &[T], key: F) -> Vec<&T>
where
    K: Eq + Hash,
    F: Fn(&T) -> K,
{
    let mut seen = HashSet::new();
    rows.iter().filter(|row| seen.insert(key(*row))).collect()
}

async fn check(resp: Response) -> Result<Response> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }
    let body = resp.text().await.unwrap_or_default();
    Err(ImportError::Api {
        status: status.as_u16(),
        message: body,
    })
}

#[async_trait]
impl BrokerStore for SupabaseStore {
    async fn upsert_broker(&self, broker: &mut BrokerRecord) -> Result<()> {
        // The row id belongs to the database; matching happens on the slug
        let mut row = broker.clone();
        row.id = None;

        let resp = self
            .request(Method::POST, &self.tables.brokers)
            .query(&[("on_conflict", BROKERS_CONFLICT_KEY)])
            .header("Prefer", PREFER_MERGE)
            .json(&[row])
            .send()
            .await?;
        let stored: Vec<BrokerRecord> = check(resp).await?.json().await?;

        let id = stored
            .first()
            .and_then(|b| b.id)
            .ok_or_else(|| ImportError::MissingField(format!("{} id", self.tables.brokers)))?;
        broker.id = Some(id);

        debug!("Upserted broker {} -> {}", broker.slug, id);
        Ok(())
    }

    async fn upsert_features(&self, features: &[FeatureRecord]) -> Result<usize> {
        if features.iter().any(|f| f.broker_id.is_none()) {
            return Err(ImportError::MissingField("broker_id".to_string()));
        }
        let rows = unique_by_key(features, |f| {
            (f.broker_id, f.feature_key.clone(), f.feature_value.clone())
        });
        if rows.is_empty() {
            return Ok(0);
        }

        let resp = self
            .request(Method::POST, &self.tables.features)
            .query(&[("on_conflict", FEATURES_CONFLICT_KEY)])
            .header("Prefer", PREFER_IGNORE)
            .json(&rows)
            .send()
            .await?;
        check(resp).await?;
        Ok(rows.len())
    }

    async fn upsert_regulations(&self, regulations: &[RegulationRecord]) -> Result<usize> {
        if regulations.iter().any(|r| r.broker_id.is_none()) {
            return Err(ImportError::MissingField("broker_id".to_string()));
        }
        let rows = unique_by_key(regulations, |r| {
            (r.broker_id, r.country_code.clone(), r.regulator_name.clone())
        });
        if rows.is_empty() {
            return Ok(0);
        }

        let resp = self
            .request(Method::POST, &self.tables.regulation)
            .query(&[("on_conflict", REGULATION_CONFLICT_KEY)])
            .header("Prefer", PREFER_IGNORE)
            .json(&rows)
            .send()
            .await?;
        check(resp).await?;
        Ok(rows.len())
    }

    async fn find_brokers_by_name(&self, fragment: &str) -> Result<Vec<BrokerRecord>> {
        // `*` is PostgREST's wildcard; a literal one in the name would widen the match
        let pattern = format!("ilike.*{}*", fragment.replace('*', ""));
        let resp = self
            .request(Method::GET, &self.tables.brokers)
            .query(&[("select", "*"), ("name", pattern.as_str()), ("order", "name.asc")])
            .send()
            .await?;
        Ok(check(resp).await?.json().await?)
    }

    async fn count_features(&self, broker_id: Uuid) -> Result<usize> {
        self.count_rows(&self.tables.features, broker_id).await
    }

    async fn count_regulations(&self, broker_id: Uuid) -> Result<usize> {
        self.count_rows(&self.tables.regulation, broker_id).await
    }
}
