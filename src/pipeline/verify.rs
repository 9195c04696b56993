use serde::Serialize;
use std::sync::Arc;
use tracing::{info, warn};
use uuid::Uuid;

use crate::storage::BrokerStore;

/// A stored broker matched by a watch-list name
#[derive(Debug, Clone, Serialize)]
pub struct VerifiedBroker {
    pub id: Option<Uuid>,
    pub name: String,
    pub slug: String,
    pub rating: Option<f64>,
    /// `None` when the count query itself failed
    pub features: Option<usize>,
    pub regulations: Option<usize>,
}

#[derive(Debug, Clone, Serialize)]
pub enum TargetStatus {
    Found(Vec<VerifiedBroker>),
    Missing,
    QueryFailed(String),
}

#[derive(Debug, Clone, Serialize)]
pub struct TargetResult {
    pub target: String,
    pub status: TargetStatus,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct VerificationReport {
    pub targets: Vec<TargetResult>,
}

impl VerificationReport {
    pub fn found(&self) -> Vec<&str> {
        self.with_status(|s| matches!(s, TargetStatus::Found(_)))
    }

    pub fn missing(&self) -> Vec<&str> {
        self.with_status(|s| matches!(s, TargetStatus::Missing))
    }

    pub fn failed(&self) -> Vec<&str> {
        self.with_status(|s| matches!(s, TargetStatus::QueryFailed(_)))
    }

    fn with_status(&self, pred: impl Fn(&TargetStatus) -> bool) -> Vec<&str> {
        self.targets
            .iter()
            .filter(|t| pred(&t.status))
            .map(|t| t.target.as_str())
            .collect()
    }

    pub fn print(&self) {
        println!("\n🔎 Verification:");
        for target in &self.targets {
            match &target.status {
                TargetStatus::Found(brokers) => {
                    for b in brokers {
                        println!(
                            "   ✅ {} -> {} ({}): rating {}, {} features, {} regulation rows",
                            target.target,
                            b.name,
                            b.slug,
                            b.rating.map_or("n/a".to_string(), |r| r.to_string()),
                            count_label(b.features),
                            count_label(b.regulations),
                        );
                    }
                }
                TargetStatus::Missing => println!("   ❌ {} not found", target.target),
                TargetStatus::QueryFailed(e) => {
                    println!("   ⚠️  {} could not be checked: {}", target.target, e)
                }
            }
        }
        println!(
            "   Found {}/{} watched brokers",
            self.found().len(),
            self.targets.len()
        );
    }
}

fn count_label(count: Option<usize>) -> String {
    count.map_or("?".to_string(), |c| c.to_string())
}

/// Re-reads the store for a fixed list of broker names after an import.
///
/// Observational only: query failures are reported, never raised.
pub struct VerificationReporter {
    store: Arc<dyn BrokerStore>,
    watch_list: Vec<String>,
}

impl VerificationReporter {
    pub fn new(store: Arc<dyn BrokerStore>, watch_list: Vec<String>) -> Self {
        Self { store, watch_list }
    }

    pub async fn run(&self) -> VerificationReport {
        let mut report = VerificationReport::default();

        for target in &self.watch_list {
            let status = match self.store.find_brokers_by_name(target).await {
                Ok(brokers) if brokers.is_empty() => {
                    warn!("Watched broker {} not found", target);
                    TargetStatus::Missing
                }
                Ok(brokers) => {
                    let mut verified = Vec::with_capacity(brokers.len());
                    for broker in brokers {
                        let (features, regulations) = match broker.id {
                            Some(id) => (
                                self.count(self.store.count_features(id).await, target),
                                self.count(self.store.count_regulations(id).await, target),
                            ),
                            None => (None, None),
                        };
                        verified.push(VerifiedBroker {
                            id: broker.id,
                            name: broker.name,
                            slug: broker.slug,
                            rating: broker.rating,
                            features,
                            regulations,
                        });
                    }
                    info!("Watched broker {} matched {} rows", target, verified.len());
                    TargetStatus::Found(verified)
                }
                Err(e) => {
                    warn!("Verification query failed for {}: {}", target, e);
                    TargetStatus::QueryFailed(e.to_string())
                }
            };

            report.targets.push(TargetResult {
                target: target.clone(),
                status,
            });
        }

        report
    }

    fn count(&self, result: crate::error::Result<usize>, target: &str) -> Option<usize> {
        result
            .map_err(|e| warn!("Count query failed for {}: {}", target, e))
            .ok()
    }
}
