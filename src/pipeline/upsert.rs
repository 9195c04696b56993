use metrics::counter;
use serde::Serialize;
use std::sync::Arc;
use tracing::{error, info, instrument, warn};

use crate::domain::NormalizedBroker;
use crate::storage::BrokerStore;

/// Per-entity outcome counts for one upsert pass
#[derive(Debug, Default, Clone, Serialize)]
pub struct UpsertReport {
    pub brokers_succeeded: usize,
    pub brokers_failed: usize,
    pub features_written: usize,
    pub feature_batches_failed: usize,
    pub regulations_written: usize,
    pub regulation_batches_failed: usize,
    pub errors: Vec<String>,
}

impl UpsertReport {
    pub fn failure_count(&self) -> usize {
        self.brokers_failed + self.feature_batches_failed + self.regulation_batches_failed
    }
}

/// Writes deduplicated brokers and their dependent rows, one broker at a time.
///
/// Order per broker is broker row, then features, then regulation. A failed
/// broker skips its dependents; a failed dependent batch leaves the broker in
/// place. Nothing is retried.
pub struct Upserter {
    store: Arc<dyn BrokerStore>,
}

impl Upserter {
    pub fn new(store: Arc<dyn BrokerStore>) -> Self {
        Self { store }
    }

    pub async fn upsert_all(&self, entries: &mut [NormalizedBroker]) -> UpsertReport {
        let mut report = UpsertReport::default();
        let total = entries.len();

        for (i, entry) in entries.iter_mut().enumerate() {
            self.upsert_entry(entry, &mut report).await;
            if (i + 1) % 25 == 0 {
                info!("Upserted {}/{} brokers", i + 1, total);
            }
        }

        report
    }

    #[instrument(skip(self, entry, report), fields(slug = %entry.broker.slug))]
    pub async fn upsert_entry(&self, entry: &mut NormalizedBroker, report: &mut UpsertReport) {
        if let Err(e) = self.store.upsert_broker(&mut entry.broker).await {
            error!("Broker upsert failed for {}: {}", entry.broker.name, e);
            println!("   ❌ {} ({}): {}", entry.broker.name, entry.broker.slug, e);
            counter!("importer_brokers_failed_total").increment(1);
            report.brokers_failed += 1;
            report
                .errors
                .push(format!("broker {}: {}", entry.broker.slug, e));
            return;
        }

        let Some(broker_id) = entry.broker.id else {
            error!("Store returned no id for {}", entry.broker.slug);
            println!("   ❌ {} ({}): no id after upsert", entry.broker.name, entry.broker.slug);
            counter!("importer_brokers_failed_total").increment(1);
            report.brokers_failed += 1;
            report
                .errors
                .push(format!("broker {}: no id after upsert", entry.broker.slug));
            return;
        };

        report.brokers_succeeded += 1;
        counter!("importer_brokers_upserted_total").increment(1);
        info!("Upserted broker {} ({})", entry.broker.name, broker_id);
        println!("   ✅ {} ({})", entry.broker.name, entry.broker.slug);

        for feature in entry.features.iter_mut() {
            feature.broker_id = Some(broker_id);
        }
        for regulation in entry.regulations.iter_mut() {
            regulation.broker_id = Some(broker_id);
        }

        if !entry.features.is_empty() {
            match self.store.upsert_features(&entry.features).await {
                Ok(written) => {
                    report.features_written += written;
                    counter!("importer_features_upserted_total").increment(written as u64);
                    println!("      features: {}", written);
                }
                Err(e) => {
                    warn!("Feature upsert failed for {}: {}", entry.broker.slug, e);
                    println!("      ⚠️  features failed: {}", e);
                    counter!("importer_feature_batches_failed_total").increment(1);
                    report.feature_batches_failed += 1;
                    report
                        .errors
                        .push(format!("features for {}: {}", entry.broker.slug, e));
                }
            }
        }

        if !entry.regulations.is_empty() {
            match self.store.upsert_regulations(&entry.regulations).await {
                Ok(written) => {
                    report.regulations_written += written;
                    counter!("importer_regulations_upserted_total").increment(written as u64);
                    println!("      regulation: {}", written);
                }
                Err(e) => {
                    warn!("Regulation upsert failed for {}: {}", entry.broker.slug, e);
                    println!("      ⚠️  regulation failed: {}", e);
                    counter!("importer_regulation_batches_failed_total").increment(1);
                    report.regulation_batches_failed += 1;
                    report
                        .errors
                        .push(format!("regulation for {}: {}", entry.broker.slug, e));
                }
            }
        }
    }
}
