pub mod in_memory;
pub mod supabase;

use async_trait::async_trait;
use uuid::Uuid;

use crate::domain::{BrokerRecord, FeatureRecord, RegulationRecord};
use crate::error::Result;

pub use in_memory::InMemoryStore;
pub use supabase::SupabaseStore;

/// Storage trait for the brokers database.
///
/// Passed explicitly into the pipeline so tests can swap in [`InMemoryStore`].
#[async_trait]
pub trait BrokerStore: Send + Sync {
    /// Insert-or-update on `slug`. Sets `broker.id` to the stored row's id.
    async fn upsert_broker(&self, broker: &mut BrokerRecord) -> Result<()>;

    /// Upsert on (broker, key, value); conflicting rows are ignored.
    /// Returns how many rows were sent.
    async fn upsert_features(&self, features: &[FeatureRecord]) -> Result<usize>;

    /// Upsert on (broker, country, regulator); conflicting rows are ignored.
    async fn upsert_regulations(&self, regulations: &[RegulationRecord]) -> Result<usize>;

    /// Brokers whose display name contains `fragment`, ignoring case
    async fn find_brokers_by_name(&self, fragment: &str) -> Result<Vec<BrokerRecord>>;

    async fn count_features(&self, broker_id: Uuid) -> Result<usize>;
    async fn count_regulations(&self, broker_id: Uuid) -> Result<usize>;
}
