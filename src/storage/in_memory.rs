use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::debug;
use uuid::Uuid;

use super::supabase::unique_by_key;
use super::BrokerStore;
use crate::domain::{BrokerRecord, FeatureRecord, RegulationRecord};
use crate::error::{ImportError, Result};

/// In-memory store used for dry runs and tests.
///
/// Follows the same conflict rules as the hosted tables: brokers keyed by
/// slug keep their id across upserts, and dependent rows must reference a
/// broker that already exists.
#[derive(Clone, Default)]
pub struct InMemoryStore {
    brokers: Arc<Mutex<HashMap<String, BrokerRecord>>>,
    features: Arc<Mutex<Vec<FeatureRecord>>>,
    regulations: Arc<Mutex<Vec<RegulationRecord>>>,
}

fn lock<T>(mutex: &Mutex<T>) -> Result<MutexGuard<'_, T>> {
    mutex
        .lock()
        .map_err(|_| ImportError::storage("in-memory store lock poisoned"))
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// All brokers, sorted by slug
    pub fn brokers(&self) -> Result<Vec<BrokerRecord>> {
        let mut brokers: Vec<BrokerRecord> = lock(&self.brokers)?.values().cloned().collect();
        brokers.sort_by(|a, b| a.slug.cmp(&b.slug));
        Ok(brokers)
    }

    pub fn broker_by_slug(&self, slug: &str) -> Result<Option<BrokerRecord>> {
        Ok(lock(&self.brokers)?.get(slug).cloned())
    }

    pub fn features_for(&self, broker_id: Uuid) -> Result<Vec<FeatureRecord>> {
        Ok(lock(&self.features)?
            .iter()
            .filter(|f| f.broker_id == Some(broker_id))
            .cloned()
            .collect())
    }

    pub fn regulations_for(&self, broker_id: Uuid) -> Result<Vec<RegulationRecord>> {
        Ok(lock(&self.regulations)?
            .iter()
            .filter(|r| r.broker_id == Some(broker_id))
            .cloned()
            .collect())
    }

    fn ensure_broker_exists(&self, broker_id: Option<Uuid>) -> Result<Uuid> {
        let id = broker_id
            .ok_or_else(|| ImportError::MissingField("broker_id".to_string()))?;
        let known = lock(&self.brokers)?.values().any(|b| b.id == Some(id));
        if known {
            Ok(id)
        } else {
            Err(ImportError::storage(format!("broker {id} does not exist")))
        }
    }
}

#[async_trait]
impl BrokerStore for InMemoryStore {
    async fn upsert_broker(&self, broker: &mut BrokerRecord) -> Result<()> {
        let mut brokers = lock(&self.brokers)?;

        let id = brokers
            .get(&broker.slug)
            .and_then(|existing| existing.id)
            .unwrap_or_else(Uuid::new_v4);
        broker.id = Some(id);
        brokers.insert(broker.slug.clone(), broker.clone());

        debug!("Upserted broker: {} with id {}", broker.slug, id);
        Ok(())
    }

    async fn upsert_features(&self, features: &[FeatureRecord]) -> Result<usize> {
        for feature in features {
            self.ensure_broker_exists(feature.broker_id)?;
        }

        let batch = unique_by_key(features, |f| {
            (f.broker_id, f.feature_key.clone(), f.feature_value.clone())
        });
        let mut stored = lock(&self.features)?;
        for feature in &batch {
            if !stored
                .iter()
                .any(|f| f.conflict_key() == feature.conflict_key())
            {
                stored.push((*feature).clone());
            }
        }
        Ok(batch.len())
    }

    async fn upsert_regulations(&self, regulations: &[RegulationRecord]) -> Result<usize> {
        for regulation in regulations {
            self.ensure_broker_exists(regulation.broker_id)?;
        }

        let batch = unique_by_key(regulations, |r| {
            (r.broker_id, r.country_code.clone(), r.regulator_name.clone())
        });
        let mut stored = lock(&self.regulations)?;
        for regulation in &batch {
            if !stored
                .iter()
                .any(|r| r.conflict_key() == regulation.conflict_key())
            {
                stored.push((*regulation).clone());
            }
        }
        Ok(batch.len())
    }

    async fn find_brokers_by_name(&self, fragment: &str) -> Result<Vec<BrokerRecord>> {
        let needle = fragment.to_lowercase();
        let mut found: Vec<BrokerRecord> = lock(&self.brokers)?
            .values()
            .filter(|b| b.name.to_lowercase().contains(&needle))
            .cloned()
            .collect();
        found.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(found)
    }

    async fn count_features(&self, broker_id: Uuid) -> Result<usize> {
        Ok(self.features_for(broker_id)?.len())
    }

    async fn count_regulations(&self, broker_id: Uuid) -> Result<usize> {
        Ok(self.regulations_for(broker_id)?.len())
    }
}
