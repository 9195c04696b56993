use indexmap::IndexMap;
use tracing::debug;

use crate::domain::NormalizedBroker;

/// Collapses normalized entries to one per slug.
///
/// Last write wins with no field-level merge: a later entry replaces the
/// earlier one wholesale. Output keeps the order in which each slug was first
/// seen.
#[derive(Debug, Default)]
pub struct Deduplicator {
    entries: IndexMap<String, NormalizedBroker>,
    replaced: usize,
}

impl Deduplicator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, entry: NormalizedBroker) {
        let slug = entry.slug().to_string();
        if let Some(previous) = self.entries.insert(slug, entry) {
            self.replaced += 1;
            debug!(
                "Replacing earlier entry for {} ({:?} -> {:?})",
                previous.broker.slug,
                previous.source,
                self.entries
                    .get(&previous.broker.slug)
                    .and_then(|e| e.source.as_deref())
            );
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// How many inserts overwrote an existing slug
    pub fn replaced(&self) -> usize {
        self.replaced
    }

    pub fn into_entries(self) -> Vec<NormalizedBroker> {
        self.entries.into_values().collect()
    }
}

impl Extend<NormalizedBroker> for Deduplicator {
    fn extend<I: IntoIterator<Item = NormalizedBroker>>(&mut self, iter: I) {
        for entry in iter {
            self.insert(entry);
        }
    }
}

/// One entry per slug, last occurrence wins.
pub fn dedupe<I>(entries: I) -> Vec<NormalizedBroker>
where
    I: IntoIterator<Item = NormalizedBroker>,
{
    let mut dedup = Deduplicator::new();
    dedup.extend(entries);
    dedup.into_entries()
}
